//! XBRL instance documents: contexts, units, facts and their binding to
//! one or more discoverable taxonomy sets.

use crate::constants::XBRLI_NS;
use crate::dimensions::MultipleDimensionType;
use crate::taxonomy::{Concept, ConceptId, Dts, Namespace, SchemaId};
use crate::{Error, Result};
use compact_str::CompactString;
use indexmap::IndexMap;

/// A concept reference across the DTS set of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConceptRef {
    pub dts: usize,
    pub concept: ConceptId,
}

/// Reporting period of a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    Duration {
        start: CompactString,
        end: CompactString,
    },
    Instant(CompactString),
    Forever,
}

/// Which context slot dimensional coordinates live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionSlot {
    Scenario,
    Segment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceContext {
    pub id: CompactString,
    pub identifier_scheme: CompactString,
    pub identifier: CompactString,
    pub period: Period,
    pub scenario: Option<MultipleDimensionType>,
    pub segment: Option<MultipleDimensionType>,
}

impl InstanceContext {
    pub fn dimensions(&self, slot: DimensionSlot) -> Option<&MultipleDimensionType> {
        match slot {
            DimensionSlot::Scenario => self.scenario.as_ref(),
            DimensionSlot::Segment => self.segment.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceUnit {
    pub id: CompactString,
    /// Namespace URI the measure prefix resolved to, e.g. the iso4217
    /// namespace for `iso4217:EUR`.
    pub namespace_uri: CompactString,
    pub value: CompactString,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub concept: ConceptRef,
    pub value: String,
    /// Context id within the owning instance.
    pub context: CompactString,
    pub unit: Option<CompactString>,
    pub decimals: Option<CompactString>,
    pub precision: Option<CompactString>,
}

/// An XBRL instance bound to the taxonomy sets its schemaRefs name.
#[derive(Debug)]
pub struct Instance {
    pub file_name: Option<CompactString>,
    namespace: Namespace,
    dts_list: Vec<Dts>,
    additional_namespaces: IndexMap<CompactString, CompactString>,
    schema_locations: IndexMap<CompactString, CompactString>,
    contexts: IndexMap<CompactString, InstanceContext>,
    units: IndexMap<CompactString, InstanceUnit>,
    facts: Vec<Fact>,
}

impl Instance {
    pub fn new(dts_list: Vec<Dts>) -> Self {
        Self {
            file_name: None,
            namespace: Namespace {
                prefix: "xbrli".into(),
                uri: XBRLI_NS.into(),
            },
            dts_list,
            additional_namespaces: IndexMap::new(),
            schema_locations: IndexMap::new(),
            contexts: IndexMap::new(),
            units: IndexMap::new(),
            facts: Vec::new(),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn set_namespace(&mut self, namespace: Namespace) {
        self.namespace = namespace;
    }

    pub fn dts_list(&self) -> &[Dts] {
        &self.dts_list
    }

    pub fn dts(&self, index: usize) -> Option<&Dts> {
        self.dts_list.get(index)
    }

    /// Adds a prefix binding unless its URI is already known.
    pub fn add_namespace(&mut self, prefix: &str, uri: &str) {
        if self.namespace.uri == uri
            || self.additional_namespaces.values().any(|u| u == uri)
        {
            return;
        }
        self.additional_namespaces.insert(prefix.into(), uri.into());
    }

    pub fn additional_namespaces(&self) -> &IndexMap<CompactString, CompactString> {
        &self.additional_namespaces
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        if self.namespace.prefix == prefix {
            return Some(&self.namespace.uri);
        }
        self.additional_namespaces.get(prefix).map(|u| u.as_str())
    }

    pub fn prefix_for_uri(&self, uri: &str) -> Option<&str> {
        if self.namespace.uri == uri {
            return Some(&self.namespace.prefix);
        }
        self.additional_namespaces
            .iter()
            .find(|(_, u)| *u == uri)
            .map(|(p, _)| p.as_str())
    }

    /// The taxonomy schema whose target namespace the prefix resolves to.
    pub fn schema_for_prefix(&self, prefix: &str) -> Option<(usize, SchemaId)> {
        self.namespace_uri(prefix)
            .and_then(|uri| self.schema_for_uri(uri))
    }

    pub fn schema_for_uri(&self, uri: &str) -> Option<(usize, SchemaId)> {
        self.dts_list
            .iter()
            .enumerate()
            .find_map(|(i, dts)| dts.schema_by_namespace_uri(uri).map(|s| (i, s)))
    }

    /// Looks a concept up by name across every referenced DTS.
    pub fn concept_by_name(&self, name: &str) -> Option<ConceptRef> {
        self.dts_list.iter().enumerate().find_map(|(i, dts)| {
            dts.concept_by_name_anywhere(name)
                .map(|concept| ConceptRef { dts: i, concept })
        })
    }

    pub fn concept(&self, concept: ConceptRef) -> Option<&Concept> {
        self.dts_list.get(concept.dts)?.try_concept(concept.concept)
    }

    pub fn add_schema_location(&mut self, uri: &str, schema_name: &str) {
        self.schema_locations.insert(uri.into(), schema_name.into());
    }

    pub fn schema_locations(&self) -> &IndexMap<CompactString, CompactString> {
        &self.schema_locations
    }

    /// Adds a context. Re-adding an identical context is fine; a different
    /// context under the same id is a load error.
    pub fn add_context(&mut self, context: InstanceContext) -> Result<()> {
        test_context(&context)?;
        match self.contexts.get(&context.id) {
            Some(existing) if *existing != context => Err(Error::InstanceLoad(format!(
                "context {} already present with different content",
                context.id
            ))),
            Some(_) => Ok(()),
            None => {
                self.contexts.insert(context.id.clone(), context);
                Ok(())
            }
        }
    }

    /// Adds a unit, with the same duplicate-id rule as contexts.
    pub fn add_unit(&mut self, unit: InstanceUnit) -> Result<()> {
        test_unit(&unit)?;
        match self.units.get(&unit.id) {
            Some(existing) if *existing != unit => Err(Error::InstanceLoad(format!(
                "unit {} already present with different content",
                unit.id
            ))),
            Some(_) => Ok(()),
            None => {
                self.units.insert(unit.id.clone(), unit);
                Ok(())
            }
        }
    }

    pub fn context(&self, id: &str) -> Option<&InstanceContext> {
        self.contexts.get(id)
    }

    pub fn unit(&self, id: &str) -> Option<&InstanceUnit> {
        self.units.get(id)
    }

    pub fn contexts(&self) -> &IndexMap<CompactString, InstanceContext> {
        &self.contexts
    }

    pub fn units(&self) -> &IndexMap<CompactString, InstanceUnit> {
        &self.units
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Adds a fact. The referenced context (and unit, when given) must
    /// already be part of the instance; numeric concepts require a unit.
    /// A fact already reported for the same concept and context has its
    /// value overwritten.
    pub fn add_fact(&mut self, fact: Fact) -> Result<()> {
        if fact.value.is_empty() {
            return Err(Error::InstanceLoad(
                "fact has no value".into(),
            ));
        }
        if !self.contexts.contains_key(&fact.context) {
            return Err(Error::InstanceLoad(format!(
                "fact refers to unknown context {}",
                fact.context
            )));
        }
        if let Some(unit) = &fact.unit {
            if !self.units.contains_key(unit) {
                return Err(Error::InstanceLoad(format!(
                    "fact refers to unknown unit {}",
                    unit
                )));
            }
        }
        let concept = self.concept(fact.concept).ok_or_else(|| {
            Error::InstanceLoad("fact refers to a concept outside the instance DTS set".into())
        })?;
        if concept.is_numeric_item() && fact.unit.is_none() {
            return Err(Error::InstanceLoad(format!(
                "numeric fact {} has no unit",
                concept.name
            )));
        }

        match self
            .facts
            .iter_mut()
            .find(|f| f.concept == fact.concept && f.context == fact.context)
        {
            Some(existing) => {
                existing.value = fact.value;
            }
            None => self.facts.push(fact),
        }
        Ok(())
    }

    /// The fact reported for a concept and context.
    pub fn fact(&self, concept: ConceptRef, context_id: &str) -> Option<&Fact> {
        self.facts
            .iter()
            .find(|f| f.concept == concept && f.context == context_id)
    }

    /// The fact reported for a concept under specific dimensional
    /// coordinates (or with none, when `mdt` is `None`).
    pub fn fact_by_dimensions(
        &self,
        concept: ConceptRef,
        mdt: Option<&MultipleDimensionType>,
        slot: DimensionSlot,
    ) -> Option<&Fact> {
        self.facts.iter().find(|f| {
            f.concept == concept
                && self
                    .context(&f.context)
                    .map(|ctx| ctx.dimensions(slot) == mdt)
                    .unwrap_or(false)
        })
    }

    /// The context carrying specific dimensional coordinates.
    pub fn context_by_dimensions(
        &self,
        mdt: &MultipleDimensionType,
        slot: DimensionSlot,
    ) -> Option<&InstanceContext> {
        self.contexts
            .values()
            .find(|ctx| ctx.dimensions(slot) == Some(mdt))
    }

    pub fn facts_for_context(&self, context_id: &str) -> Vec<&Fact> {
        self.facts
            .iter()
            .filter(|f| f.context == context_id)
            .collect()
    }

    pub fn remove_fact(&mut self, concept: ConceptRef, context_id: &str) {
        self.facts
            .retain(|f| !(f.concept == concept && f.context == context_id));
    }
}

/// A context needs an id, an identifier with scheme, and a period.
fn test_context(context: &InstanceContext) -> Result<()> {
    if context.id.is_empty() {
        return Err(Error::InstanceLoad("context has no id".into()));
    }
    if context.identifier.is_empty() || context.identifier_scheme.is_empty() {
        return Err(Error::InstanceLoad(format!(
            "context {} has no entity identifier",
            context.id
        )));
    }
    match &context.period {
        Period::Instant(value) if value.is_empty() => Err(Error::InstanceLoad(format!(
            "context {} has an empty instant",
            context.id
        ))),
        Period::Duration { start, end } if start.is_empty() || end.is_empty() => {
            Err(Error::InstanceLoad(format!(
                "context {} has an incomplete duration",
                context.id
            )))
        }
        _ => Ok(()),
    }
}

/// A unit needs an id, a namespace URI and a measure value.
fn test_unit(unit: &InstanceUnit) -> Result<()> {
    if unit.id.is_empty() {
        return Err(Error::InstanceLoad("unit has no id".into()));
    }
    if unit.namespace_uri.is_empty() || unit.value.is_empty() {
        return Err(Error::InstanceLoad(format!(
            "unit {} has no measure",
            unit.id
        )));
    }
    Ok(())
}

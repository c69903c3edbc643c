//! Concepts, taxonomy schemas and the discoverable taxonomy set (DTS).
//!
//! All entities live in arenas owned by the [`Dts`]; the rest of the crate
//! refers to them through [`ConceptId`] / [`SchemaId`] indices.

use crate::constants::{SUBST_GROUP_DIMENSION_ITEM, SUBST_GROUP_HYPERCUBE_ITEM};
use crate::definition::DefinitionLinkbase;
use crate::linkbase::{CalculationLinkbase, LabelLinkbase};
use crate::presentation::PresentationLinkbase;
use crate::{Error, Result};
use compact_str::CompactString;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConceptId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodType {
    Instant,
    Duration,
    #[default]
    Unset,
}

impl PeriodType {
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("instant") => PeriodType::Instant,
            Some("duration") => PeriodType::Duration,
            _ => PeriodType::Unset,
        }
    }
}

/// A prefix/URI binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub prefix: CompactString,
    pub uri: CompactString,
}

/// Declaration of one schema element.
#[derive(Debug, Clone)]
pub struct Concept {
    pub name: CompactString,
    pub id: CompactString,
    pub concept_type: Option<CompactString>,
    pub substitution_group: Option<CompactString>,
    pub period_type: PeriodType,
    pub is_abstract: bool,
    pub nillable: bool,
    pub typed_domain_ref: Option<CompactString>,
    pub schema: SchemaId,
    pub namespace: Namespace,
}

impl PartialEq for Concept {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name && self.schema == other.schema
    }
}

impl Eq for Concept {}

/// Local names of the `xbrli` item types whose facts carry numbers.
const NUMERIC_ITEM_TYPES: &[&str] = &[
    "monetaryItemType",
    "decimalItemType",
    "sharesItemType",
    "pureItemType",
    "integerItemType",
    "nonNegativeIntegerItemType",
    "nonPositiveIntegerItemType",
    "positiveIntegerItemType",
    "negativeIntegerItemType",
    "floatItemType",
    "doubleItemType",
    "fractionItemType",
];

fn local_name(qname: &str) -> &str {
    qname.rsplit_once(':').map(|(_, l)| l).unwrap_or(qname)
}

impl Concept {
    fn substitution_group_local(&self) -> Option<&str> {
        self.substitution_group.as_deref().map(local_name)
    }

    pub fn is_dimension_item(&self) -> bool {
        self.substitution_group_local() == Some(SUBST_GROUP_DIMENSION_ITEM)
    }

    pub fn is_hypercube_item(&self) -> bool {
        self.substitution_group_local() == Some(SUBST_GROUP_HYPERCUBE_ITEM)
    }

    /// A typed dimension declares `xbrldt:typedDomainRef`.
    pub fn is_typed_dimension(&self) -> bool {
        self.is_dimension_item() && self.typed_domain_ref.is_some()
    }

    pub fn is_explicit_dimension(&self) -> bool {
        self.is_dimension_item() && self.typed_domain_ref.is_none()
    }

    /// Whether facts of this concept carry numeric values, derived from the
    /// declared item type.
    pub fn is_numeric_item(&self) -> bool {
        self.concept_type
            .as_deref()
            .map(local_name)
            .is_some_and(|t| NUMERIC_ITEM_TYPES.contains(&t))
    }
}

/// One schema file of a DTS.
#[derive(Debug, Clone)]
pub struct TaxonomySchema {
    pub name: CompactString,
    pub namespace: Namespace,
    pub imports: Vec<CompactString>,
    concepts: Vec<ConceptId>,
    by_name: HashMap<CompactString, ConceptId>,
}

impl TaxonomySchema {
    pub fn new(name: CompactString, namespace: Namespace, imports: Vec<CompactString>) -> Self {
        Self {
            name,
            namespace,
            imports,
            concepts: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Concept ids in document order.
    pub fn concepts(&self) -> &[ConceptId] {
        &self.concepts
    }

    pub fn concept_by_name(&self, name: &str) -> Option<ConceptId> {
        self.by_name.get(name).copied()
    }
}

/// A discoverable taxonomy set: the closed set of schemas reachable by
/// import from a root, plus the four linkbases layered on top of them.
#[derive(Debug, Default)]
pub struct Dts {
    schemas: Vec<TaxonomySchema>,
    concepts: Vec<Concept>,
    by_id: HashMap<CompactString, ConceptId>,
    top_schema: Option<SchemaId>,
    pub presentation: PresentationLinkbase,
    pub label: LabelLinkbase,
    pub definition: DefinitionLinkbase,
    pub calculation: CalculationLinkbase,
}

impl Dts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_schema(&mut self, schema: TaxonomySchema) -> SchemaId {
        let id = SchemaId(self.schemas.len() as u32);
        self.schemas.push(schema);
        id
    }

    /// Registers a concept with its owning schema. Duplicate ids across the
    /// DTS and duplicate names within one schema are creation errors.
    pub fn register_concept(&mut self, concept: Concept) -> Result<ConceptId> {
        if self.by_id.contains_key(&concept.id) {
            return Err(Error::TaxonomyCreation(format!(
                "duplicate concept id {}",
                concept.id
            )));
        }
        let schema = concept.schema;
        if self.schemas[schema.0 as usize]
            .by_name
            .contains_key(&concept.name)
        {
            return Err(Error::TaxonomyCreation(format!(
                "duplicate concept name {} in schema {}",
                concept.name, self.schemas[schema.0 as usize].name
            )));
        }
        let id = ConceptId(self.concepts.len() as u32);
        self.by_id.insert(concept.id.clone(), id);
        let schema = &mut self.schemas[schema.0 as usize];
        schema.by_name.insert(concept.name.clone(), id);
        schema.concepts.push(id);
        self.concepts.push(concept);
        Ok(id)
    }

    pub fn concept(&self, id: ConceptId) -> &Concept {
        &self.concepts[id.0 as usize]
    }

    pub fn try_concept(&self, id: ConceptId) -> Option<&Concept> {
        self.concepts.get(id.0 as usize)
    }

    pub fn concept_by_id(&self, id: &str) -> Option<ConceptId> {
        self.by_id.get(id).copied()
    }

    pub fn concept_by_name(&self, schema: SchemaId, name: &str) -> Option<ConceptId> {
        self.schemas[schema.0 as usize].concept_by_name(name)
    }

    /// Looks a concept up by name across every schema of the DTS.
    pub fn concept_by_name_anywhere(&self, name: &str) -> Option<ConceptId> {
        self.schemas.iter().find_map(|s| s.concept_by_name(name))
    }

    /// All concepts whose substitution group matches the given local name
    /// (or prefixed name), in registration order.
    pub fn concepts_by_substitution_group(&self, group: &str) -> Vec<ConceptId> {
        let wanted = local_name(group);
        self.concepts
            .iter()
            .enumerate()
            .filter(|(_, c)| c.substitution_group_local() == Some(wanted))
            .map(|(i, _)| ConceptId(i as u32))
            .collect()
    }

    pub fn concepts(&self) -> impl Iterator<Item = (ConceptId, &Concept)> {
        self.concepts
            .iter()
            .enumerate()
            .map(|(i, c)| (ConceptId(i as u32), c))
    }

    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    pub fn schema(&self, id: SchemaId) -> &TaxonomySchema {
        &self.schemas[id.0 as usize]
    }

    pub fn schemas(&self) -> impl Iterator<Item = (SchemaId, &TaxonomySchema)> {
        self.schemas
            .iter()
            .enumerate()
            .map(|(i, s)| (SchemaId(i as u32), s))
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    pub fn schema_by_name(&self, name: &str) -> Option<SchemaId> {
        self.schemas
            .iter()
            .position(|s| s.name == name)
            .map(|i| SchemaId(i as u32))
    }

    pub fn schema_by_namespace_uri(&self, uri: &str) -> Option<SchemaId> {
        self.schemas
            .iter()
            .position(|s| s.namespace.uri == uri)
            .map(|i| SchemaId(i as u32))
    }

    pub fn set_top_schema(&mut self, id: SchemaId) {
        self.top_schema = Some(id);
    }

    /// The root schema the DTS was discovered from.
    pub fn top_schema(&self) -> Option<&TaxonomySchema> {
        self.top_schema.map(|id| self.schema(id))
    }
}

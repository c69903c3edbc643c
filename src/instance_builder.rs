//! Loads an XBRL instance document: builds the DTS of every schemaRef,
//! then binds units, contexts (including dimensional members) and facts.

use crate::constants::{XBRLDI_NS, XBRLI_NS, XLINK_NS, XSI_NS};
use crate::dimensions::{MemberValue, MultipleDimensionType, SingleDimensionType};
use crate::dts_builder::DtsBuilder;
use crate::instance::{ConceptRef, Fact, Instance, InstanceContext, InstanceUnit, Period};
use crate::taxonomy::Namespace;
use crate::xml::{XmlDocument, XmlElement};
use crate::{Error, Result};
use compact_str::CompactString;
use std::path::Path;
use tracing::info;

/// Caller-scoped loader for instance documents. Referenced schema files
/// resolve relative to the instance file's directory.
#[derive(Debug, Default)]
pub struct InstanceBuilder;

impl InstanceBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build<P: AsRef<Path>>(&self, instance_file: P) -> Result<Instance> {
        let instance_file = instance_file.as_ref();
        let dir = instance_file.parent().unwrap_or(Path::new("."));
        let document = XmlDocument::from_file(instance_file)?;
        let root = &document.root;

        info!(
            "loading instance {}",
            instance_file.file_name().unwrap_or_default().to_string_lossy()
        );

        // One DTS per schemaRef.
        let schema_refs: Vec<&XmlElement> = root
            .children
            .iter()
            .filter(|c| c.local_name == "schemaRef")
            .collect();
        let dts_builder = DtsBuilder::new();
        let mut dts_list = Vec::new();
        for schema_ref in &schema_refs {
            let href = schema_ref.attr_ns(XLINK_NS, "href").ok_or_else(|| {
                Error::InstanceLoad("schemaRef without xlink:href".into())
            })?;
            dts_list.push(dts_builder.build(dir.join(href))?);
        }

        let mut instance = Instance::new(dts_list);
        instance.file_name = instance_file
            .file_name()
            .map(|n| n.to_string_lossy().as_ref().into());
        instance.set_namespace(Namespace {
            prefix: root.prefix.clone().unwrap_or_else(|| "xbrli".into()),
            uri: root
                .namespace
                .clone()
                .unwrap_or_else(|| XBRLI_NS.into()),
        });

        // Namespaces of the root and the schemaRef elements.
        for (prefix, uri) in &root.namespace_decls {
            if !prefix.is_empty() {
                instance.add_namespace(prefix, uri);
            }
        }
        for schema_ref in &schema_refs {
            for (prefix, uri) in &schema_ref.namespace_decls {
                if !prefix.is_empty() {
                    instance.add_namespace(prefix, uri);
                }
            }
        }

        read_schema_locations(&mut instance, root);
        read_units(&mut instance, root)?;
        read_contexts(&mut instance, root)?;
        read_facts(&mut instance, root)?;

        Ok(instance)
    }
}

/// `xsi:schemaLocation` is a whitespace-separated list of URI/file pairs.
fn read_schema_locations(instance: &mut Instance, root: &XmlElement) {
    if let Some(value) = root.attr_ns(XSI_NS, "schemaLocation") {
        let mut parts = value.split_whitespace();
        while let (Some(uri), Some(name)) = (parts.next(), parts.next()) {
            instance.add_schema_location(uri, name);
        }
    }
}

fn read_units(instance: &mut Instance, root: &XmlElement) -> Result<()> {
    let unit_elements: Vec<&XmlElement> = root.children_named(XBRLI_NS, "unit").collect();
    for unit_element in unit_elements {
        let id = unit_element
            .attr("id")
            .ok_or_else(|| Error::InstanceLoad("unit without id".into()))?;
        let measure = unit_element
            .child(XBRLI_NS, "measure")
            .ok_or_else(|| Error::InstanceLoad(format!("unit {} has no measure", id)))?;
        let text = measure.text();
        let (prefix, value) = text.split_once(':').ok_or_else(|| {
            Error::InstanceLoad(format!("unit {} has a measure without prefix: {}", id, text))
        })?;
        let namespace_uri: CompactString = instance
            .namespace_uri(prefix)
            .ok_or_else(|| {
                Error::InstanceLoad(format!("unit {} uses undeclared prefix {}", id, prefix))
            })?
            .into();
        instance.add_unit(InstanceUnit {
            id: id.into(),
            namespace_uri,
            value: value.into(),
        })?;
    }
    Ok(())
}

fn read_contexts(instance: &mut Instance, root: &XmlElement) -> Result<()> {
    let context_elements: Vec<&XmlElement> = root.children_named(XBRLI_NS, "context").collect();
    for context_element in context_elements {
        let id = context_element
            .attr("id")
            .ok_or_else(|| Error::InstanceLoad("context without id".into()))?;

        let entity = context_element
            .child(XBRLI_NS, "entity")
            .ok_or_else(|| Error::InstanceLoad(format!("context {} has no entity", id)))?;
        let identifier = entity
            .child(XBRLI_NS, "identifier")
            .ok_or_else(|| Error::InstanceLoad(format!("context {} has no identifier", id)))?;

        let period = read_period(context_element, id)?;

        let scenario = context_element
            .child(XBRLI_NS, "scenario")
            .map(|e| read_members(instance, e, id))
            .transpose()?
            .flatten();
        let segment = entity
            .child(XBRLI_NS, "segment")
            .map(|e| read_members(instance, e, id))
            .transpose()?
            .flatten();

        instance.add_context(InstanceContext {
            id: id.into(),
            identifier_scheme: identifier.attr("scheme").unwrap_or_default().into(),
            identifier: identifier.text().into(),
            period,
            scenario,
            segment,
        })?;
    }
    Ok(())
}

fn read_period(context_element: &XmlElement, id: &str) -> Result<Period> {
    let period = context_element
        .child(XBRLI_NS, "period")
        .ok_or_else(|| Error::InstanceLoad(format!("context {} has no period", id)))?;
    if period.child(XBRLI_NS, "forever").is_some() {
        return Ok(Period::Forever);
    }
    if let Some(instant) = period.child(XBRLI_NS, "instant") {
        if instant.child(XBRLI_NS, "forever").is_some() {
            return Ok(Period::Forever);
        }
        return Ok(Period::Instant(instant.text().into()));
    }
    match (
        period.child(XBRLI_NS, "startDate"),
        period.child(XBRLI_NS, "endDate"),
    ) {
        (Some(start), Some(end)) => Ok(Period::Duration {
            start: start.text().into(),
            end: end.text().into(),
        }),
        _ => Err(Error::InstanceLoad(format!(
            "context {} has an incomplete period",
            id
        ))),
    }
}

/// Accumulates the explicit and typed members of one scenario or segment
/// element into a coordinate set; the first member becomes current.
fn read_members(
    instance: &Instance,
    container: &XmlElement,
    context_id: &str,
) -> Result<Option<MultipleDimensionType>> {
    let mut mdt: Option<MultipleDimensionType> = None;

    for member in container.children_named(XBRLDI_NS, "explicitMember") {
        let dimension = resolve_dimension(instance, member, context_id)?;
        let value = member.text();
        let member_name = value.rsplit_once(':').map(|(_, n)| n).unwrap_or(value);
        let domain_member = instance.concept_by_name(member_name).ok_or_else(|| {
            Error::InstanceLoad(format!(
                "unresolved domain member {} in context {}",
                value, context_id
            ))
        })?;
        let sdt = SingleDimensionType::new(
            dimension.concept,
            MemberValue::Explicit(domain_member.concept),
        );
        push_member(&mut mdt, sdt);
    }

    for member in container.children_named(XBRLDI_NS, "typedMember") {
        let dimension = resolve_dimension(instance, member, context_id)?;
        let payload = member.children.first().ok_or_else(|| {
            Error::InstanceLoad(format!(
                "typed member without content in context {}",
                context_id
            ))
        })?;
        let sdt = SingleDimensionType::new(
            dimension.concept,
            MemberValue::Typed(payload.to_xml_string()),
        );
        push_member(&mut mdt, sdt);
    }

    Ok(mdt)
}

fn push_member(mdt: &mut Option<MultipleDimensionType>, sdt: SingleDimensionType) {
    match mdt {
        None => *mdt = Some(MultipleDimensionType::new(sdt)),
        Some(existing) => existing.add_predecessor(sdt),
    }
}

/// Resolves a member's `dimension="prefix:LocalName"` attribute to the
/// dimension concept of the schema the prefix names.
fn resolve_dimension(
    instance: &Instance,
    member: &XmlElement,
    context_id: &str,
) -> Result<ConceptRef> {
    let attribute = member.attr("dimension").ok_or_else(|| {
        Error::InstanceLoad(format!(
            "dimensional member without dimension attribute in context {}",
            context_id
        ))
    })?;
    let (prefix, name) = attribute.split_once(':').ok_or_else(|| {
        Error::InstanceLoad(format!(
            "malformed dimension {} in context {}",
            attribute, context_id
        ))
    })?;
    let (dts_index, schema) = instance.schema_for_prefix(prefix).ok_or_else(|| {
        Error::InstanceLoad(format!(
            "unresolved dimension prefix {} in context {}",
            prefix, context_id
        ))
    })?;
    let concept = instance.dts_list()[dts_index]
        .concept_by_name(schema, name)
        .ok_or_else(|| {
            Error::InstanceLoad(format!(
                "unresolved dimension {} in context {}",
                attribute, context_id
            ))
        })?;
    Ok(ConceptRef {
        dts: dts_index,
        concept,
    })
}

/// Every root child that is not a context, schemaRef or unit reports a
/// fact.
fn read_facts(instance: &mut Instance, root: &XmlElement) -> Result<()> {
    let mut facts = Vec::new();
    for element in &root.children {
        if matches!(element.local_name.as_str(), "context" | "schemaRef" | "unit") {
            continue;
        }
        let namespace = element.namespace.as_deref().unwrap_or_default();
        let (dts_index, schema) = instance.schema_for_uri(namespace).ok_or_else(|| {
            Error::InstanceLoad(format!(
                "unknown fact element {} in namespace {}",
                element.local_name, namespace
            ))
        })?;
        let concept = instance.dts_list()[dts_index]
            .concept_by_name(schema, &element.local_name)
            .ok_or_else(|| {
                Error::InstanceLoad(format!("unknown fact element {}", element.local_name))
            })?;
        let context = element.attr("contextRef").ok_or_else(|| {
            Error::InstanceLoad(format!(
                "fact {} has no contextRef",
                element.local_name
            ))
        })?;
        if instance.context(context).is_none() {
            return Err(Error::InstanceLoad(format!(
                "fact {} refers to unknown context {}",
                element.local_name, context
            )));
        }
        facts.push(Fact {
            concept: ConceptRef {
                dts: dts_index,
                concept,
            },
            value: element.text().to_string(),
            context: context.into(),
            unit: element.attr("unitRef").map(Into::into),
            decimals: element.attr("decimals").map(Into::into),
            precision: element.attr("precision").map(Into::into),
        });
    }
    for fact in facts {
        instance.add_fact(fact)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::{MemberValue, SingleDimensionType};
    use crate::dts_builder::fixtures::{write_asset_taxonomy, write_dimensional_taxonomy};
    use crate::instance::DimensionSlot;
    use crate::outputter::InstanceOutputter;
    use crate::validator::InstanceValidator;
    use crate::xlink::ContextElementKind;
    use crate::CalculationError;
    use tempfile::TempDir;

    const INSTANCE_HEADER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
    xmlns:link="http://www.xbrl.org/2003/linkbase"
    xmlns:xlink="http://www.w3.org/1999/xlink"
    xmlns:xbrldi="http://xbrl.org/2006/xbrldi"
    xmlns:iso4217="http://www.xbrl.org/2003/iso4217"
    xmlns:t="http://example.com/taxonomy/t"
    xmlns:d="http://example.com/taxonomy/d">"#;

    const CONTEXT_AND_UNIT: &str = r#"
  <xbrli:context id="c1">
    <xbrli:entity>
      <xbrli:identifier scheme="http://example.com/entities">0001</xbrli:identifier>
    </xbrli:entity>
    <xbrli:period>
      <xbrli:instant>2008-12-31</xbrli:instant>
    </xbrli:period>
  </xbrli:context>
  <xbrli:unit id="u1">
    <xbrli:measure>iso4217:EUR</xbrli:measure>
  </xbrli:unit>"#;

    fn asset_instance(current: &str, include_non_current: bool) -> String {
        let mut body = format!(
            r#"{}
  <link:schemaRef xlink:type="simple" xlink:href="t.xsd"/>{}
  <t:Assets contextRef="c1" unitRef="u1" decimals="0">100</t:Assets>
  <t:AssetsCurrent contextRef="c1" unitRef="u1" decimals="0">{}</t:AssetsCurrent>"#,
            INSTANCE_HEADER, CONTEXT_AND_UNIT, current
        );
        if include_non_current {
            body.push_str(
                r#"
  <t:AssetsNonCurrent contextRef="c1" unitRef="u1" decimals="0">60</t:AssetsNonCurrent>"#,
            );
        }
        body.push_str("\n</xbrli:xbrl>");
        body
    }

    fn load(dir: &std::path::Path, name: &str, content: &str) -> Instance {
        std::fs::write(dir.join(name), content).unwrap();
        InstanceBuilder::new().build(dir.join(name)).unwrap()
    }

    #[test]
    fn instance_binds_facts_contexts_and_units() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());
        let instance = load(dir.path(), "inst.xml", &asset_instance("40", true));

        assert_eq!(instance.facts().len(), 3);
        assert_eq!(instance.contexts().len(), 1);
        let unit = instance.unit("u1").unwrap();
        assert_eq!(unit.value, "EUR");
        assert_eq!(unit.namespace_uri, "http://www.xbrl.org/2003/iso4217");

        let context = instance.context("c1").unwrap();
        assert_eq!(context.identifier, "0001");
        assert_eq!(context.period, Period::Instant("2008-12-31".into()));

        let assets = instance.concept_by_name("Assets").unwrap();
        let fact = instance.fact(assets, "c1").unwrap();
        assert_eq!(fact.value, "100");
        assert_eq!(fact.decimals.as_deref(), Some("0"));
    }

    #[test]
    fn adding_a_fact_twice_overwrites_the_value() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());
        let mut instance = load(dir.path(), "inst.xml", &asset_instance("40", true));

        let assets = instance.concept_by_name("Assets").unwrap();
        let mut replacement = instance.fact(assets, "c1").unwrap().clone();
        replacement.value = "250".into();
        instance.add_fact(replacement).unwrap();

        assert_eq!(instance.facts().len(), 3);
        assert_eq!(instance.fact(assets, "c1").unwrap().value, "250");
    }

    #[test]
    fn calculation_validation_passes_on_consistent_facts() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());
        let instance = load(dir.path(), "inst.xml", &asset_instance("40", true));

        InstanceValidator::new(&instance).validate().unwrap();
    }

    #[test]
    fn calculation_mismatch_reports_both_sides() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());
        let instance = load(dir.path(), "inst.xml", &asset_instance("30", true));

        let err = InstanceValidator::new(&instance).validate().unwrap_err();
        match err {
            crate::Error::Calculation(CalculationError::Mismatch {
                concept,
                expected,
                computed,
                summands,
                ..
            }) => {
                assert_eq!(concept, "Assets");
                assert_eq!(expected.to_string(), "100");
                assert_eq!(computed.to_string(), "90");
                assert!(summands.contains(&"AssetsCurrent".into()));
                assert!(summands.contains(&"AssetsNonCurrent".into()));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn missing_summand_is_reported() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());
        let instance = load(dir.path(), "inst.xml", &asset_instance("40", false));

        let err = InstanceValidator::new(&instance).validate().unwrap_err();
        match err {
            crate::Error::Calculation(CalculationError::MissingValues { concept, dts }) => {
                assert_eq!(concept, "AssetsNonCurrent");
                assert_eq!(dts, "t.xsd");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn numeric_fact_without_unit_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());
        let content = format!(
            r#"{}
  <link:schemaRef xlink:type="simple" xlink:href="t.xsd"/>{}
  <t:Assets contextRef="c1" decimals="0">100</t:Assets>
</xbrli:xbrl>"#,
            INSTANCE_HEADER, CONTEXT_AND_UNIT
        );
        std::fs::write(dir.path().join("inst.xml"), content).unwrap();

        let err = InstanceBuilder::new()
            .build(dir.path().join("inst.xml"))
            .unwrap_err();
        assert!(matches!(err, crate::Error::InstanceLoad(_)));
    }

    #[test]
    fn unknown_fact_element_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());
        let content = format!(
            r#"{}
  <link:schemaRef xlink:type="simple" xlink:href="t.xsd"/>{}
  <t:Liabilities contextRef="c1" unitRef="u1">5</t:Liabilities>
</xbrli:xbrl>"#,
            INSTANCE_HEADER, CONTEXT_AND_UNIT
        );
        std::fs::write(dir.path().join("inst.xml"), content).unwrap();

        let err = InstanceBuilder::new()
            .build(dir.path().join("inst.xml"))
            .unwrap_err();
        assert!(matches!(err, crate::Error::InstanceLoad(_)));
    }

    #[test]
    fn footnote_link_child_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());
        let content = format!(
            r#"{}
  <link:schemaRef xlink:type="simple" xlink:href="t.xsd"/>{}
  <t:Assets contextRef="c1" unitRef="u1" decimals="0">100</t:Assets>
  <link:footnoteLink xlink:type="extended"
      xlink:role="http://www.xbrl.org/2003/role/link"/>
</xbrli:xbrl>"#,
            INSTANCE_HEADER, CONTEXT_AND_UNIT
        );
        std::fs::write(dir.path().join("inst.xml"), content).unwrap();

        let err = InstanceBuilder::new()
            .build(dir.path().join("inst.xml"))
            .unwrap_err();
        match err {
            crate::Error::InstanceLoad(message) => {
                assert!(message.contains("footnoteLink"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn scenario_members_build_dimensional_coordinates() {
        let dir = TempDir::new().unwrap();
        write_dimensional_taxonomy(dir.path());
        let content = format!(
            r#"{}
  <link:schemaRef xlink:type="simple" xlink:href="d.xsd"/>
  <xbrli:context id="c1">
    <xbrli:entity>
      <xbrli:identifier scheme="http://example.com/entities">0001</xbrli:identifier>
    </xbrli:entity>
    <xbrli:period>
      <xbrli:instant>2008-12-31</xbrli:instant>
    </xbrli:period>
    <xbrli:scenario>
      <xbrldi:explicitMember dimension="d:RegionDim">d:North</xbrldi:explicitMember>
    </xbrli:scenario>
  </xbrli:context>
  <xbrli:unit id="u1">
    <xbrli:measure>iso4217:EUR</xbrli:measure>
  </xbrli:unit>
  <d:Product contextRef="c1" unitRef="u1" decimals="0">7</d:Product>
</xbrli:xbrl>"#,
            INSTANCE_HEADER
        );
        let instance = load(dir.path(), "d_inst.xml", &content);

        let dts = &instance.dts_list()[0];
        let dim = dts.concept_by_id("d_RegionDim").unwrap();
        let north = dts.concept_by_id("d_North").unwrap();
        let product = dts.concept_by_id("d_Product").unwrap();

        let context = instance.context("c1").unwrap();
        let mdt = context.dimensions(DimensionSlot::Scenario).unwrap();
        assert_eq!(
            mdt.current(),
            &SingleDimensionType::new(dim, MemberValue::Explicit(north))
        );
        assert!(context.dimensions(DimensionSlot::Segment).is_none());

        // the loaded coordinates satisfy the cube the taxonomy binds
        assert!(dts
            .definition
            .dimension_allowed(dts, product, mdt, ContextElementKind::Scenario));

        // and the fact is reachable through them
        let concept_ref = instance.concept_by_name("Product").unwrap();
        let fact = instance
            .fact_by_dimensions(concept_ref, Some(mdt), DimensionSlot::Scenario)
            .unwrap();
        assert_eq!(fact.value, "7");
    }

    #[test]
    fn outputter_round_trips_the_fact_set() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());
        let instance = load(dir.path(), "inst.xml", &asset_instance("40", true));

        let xml = InstanceOutputter::new(&instance).to_xml().unwrap();
        let reloaded = load(dir.path(), "inst_roundtrip.xml", &xml);

        assert_eq!(instance.facts(), reloaded.facts());
        assert_eq!(instance.contexts(), reloaded.contexts());
        assert_eq!(instance.units(), reloaded.units());
    }
}

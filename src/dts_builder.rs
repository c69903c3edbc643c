//! Builds a [`Dts`] from a root taxonomy schema file: transitive import
//! discovery, concept registration, then the locator/resource and arc
//! passes over every referenced linkbase.

use crate::constants::{
    DEFAULT_LINK_ROLE, LINK_NS, ROLE_CALCULATION_LINKBASE_REF, ROLE_DEFINITION_LINKBASE_REF,
    ROLE_LABEL_LINKBASE_REF, ROLE_PRESENTATION_LINKBASE_REF, XBRLDT_NS, XBRLI_NS, XLINK_NS,
    XML_NS, XSD_NS,
};
use crate::definition::DefinitionLinkbase;
use crate::linkbase::{CalculationLinkbase, LabelLinkbase, Linkbase};
use crate::presentation::PresentationLinkbase;
use crate::taxonomy::{Concept, Dts, Namespace, PeriodType, TaxonomySchema};
use crate::xlink::{
    Arc, ArcUse, ContextElementKind, ExtendedLinkElement, Locator, LocatorTarget, Resource,
};
use crate::xml::{XmlDocument, XmlElement};
use crate::{Error, Result};
use compact_str::CompactString;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Caller-scoped builder for discoverable taxonomy sets. Imports and
/// linkbase hrefs resolve relative to the root schema's directory.
#[derive(Debug, Default)]
pub struct DtsBuilder;

impl DtsBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build<P: AsRef<Path>>(&self, root_file: P) -> Result<Dts> {
        let root_file = root_file.as_ref();
        let dir = root_file.parent().unwrap_or(Path::new(".")).to_path_buf();
        let root_name: CompactString = root_file
            .file_name()
            .ok_or_else(|| Error::TaxonomyCreation("root schema has no file name".into()))?
            .to_string_lossy()
            .as_ref()
            .into();

        info!("processing discoverable taxonomy set {}", root_name);

        // Discover the closed schema set, imports before their importer.
        let mut ordered: Vec<CompactString> = Vec::new();
        let mut documents: HashMap<CompactString, XmlDocument> = HashMap::new();
        collect_imports(&dir, &root_name, &mut ordered, &mut documents)?;

        let mut dts = Dts::new();
        for name in &ordered {
            info!("processing taxonomy schema {}", name);
            let document = &documents[name];
            let schema_id = register_schema(&mut dts, name, document)?;
            if name == &root_name {
                dts.set_top_schema(schema_id);
            }
        }

        let presentation = self.build_linkbase(
            &dts,
            &ordered,
            &documents,
            &dir,
            ROLE_PRESENTATION_LINKBASE_REF,
            "presentationLink",
            "presentationArc",
        )?;
        let label = self.build_linkbase(
            &dts,
            &ordered,
            &documents,
            &dir,
            ROLE_LABEL_LINKBASE_REF,
            "labelLink",
            "labelArc",
        )?;
        let definition = self.build_linkbase(
            &dts,
            &ordered,
            &documents,
            &dir,
            ROLE_DEFINITION_LINKBASE_REF,
            "definitionLink",
            "definitionArc",
        )?;
        let calculation = self.build_linkbase(
            &dts,
            &ordered,
            &documents,
            &dir,
            ROLE_CALCULATION_LINKBASE_REF,
            "calculationLink",
            "calculationArc",
        )?;

        dts.presentation = PresentationLinkbase::build(presentation, &dts);
        dts.definition = DefinitionLinkbase::build(definition, &dts)?;
        dts.label = LabelLinkbase::new(label);
        dts.calculation = CalculationLinkbase::new(calculation);

        Ok(dts)
    }

    /// Builds one linkbase kind over every schema of the set: element pass
    /// first (locators and resources of all files), arc pass second.
    fn build_linkbase(
        &self,
        dts: &Dts,
        ordered: &[CompactString],
        documents: &HashMap<CompactString, XmlDocument>,
        dir: &Path,
        ref_role: &str,
        link_name: &str,
        arc_name: &str,
    ) -> Result<Linkbase> {
        let mut base = Linkbase::new();

        let mut linkbase_documents: Vec<(CompactString, XmlDocument)> = Vec::new();
        for schema_name in ordered {
            let root = &documents[schema_name].root;
            for linkbase_ref in linkbase_refs(root, ref_role) {
                let href = linkbase_ref
                    .attr_ns(XLINK_NS, "href")
                    .ok_or_else(|| Error::TaxonomyCreation("linkbaseRef without href".into()))?;
                debug!("building linkbase document {}", href);
                let document = XmlDocument::from_file(resolve_href(dir, href))?;
                linkbase_documents.push((href.into(), document));
            }
        }

        for (source, document) in &linkbase_documents {
            for link in document.root.children_named(LINK_NS, link_name) {
                let role: CompactString = link
                    .attr_ns(XLINK_NS, "role")
                    .unwrap_or(DEFAULT_LINK_ROLE)
                    .into();
                for child in &link.children {
                    match child.attr_ns(XLINK_NS, "type") {
                        Some("locator") => {
                            let locator =
                                read_locator(dts, &base, child, source, &role)?;
                            base.add_element(ExtendedLinkElement::Locator(locator));
                        }
                        Some("resource") => {
                            let resource = read_resource(child, source, &role)?;
                            base.add_element(ExtendedLinkElement::Resource(resource));
                        }
                        _ => {}
                    }
                }
            }
        }

        for (source, document) in &linkbase_documents {
            for link in document.root.children_named(LINK_NS, link_name) {
                let role: CompactString = link
                    .attr_ns(XLINK_NS, "role")
                    .unwrap_or(DEFAULT_LINK_ROLE)
                    .into();
                for arc_element in link.children_named(LINK_NS, arc_name) {
                    read_arcs(&mut base, arc_element, source, &role)?;
                }
            }
        }

        Ok(base)
    }
}

fn resolve_href(dir: &Path, href: &str) -> PathBuf {
    dir.join(href)
}

/// Parses a schema file and, depth-first, everything it imports. The
/// visited map tolerates import cycles; every file is read once.
fn collect_imports(
    dir: &Path,
    name: &CompactString,
    ordered: &mut Vec<CompactString>,
    documents: &mut HashMap<CompactString, XmlDocument>,
) -> Result<()> {
    if documents.contains_key(name) {
        return Ok(());
    }
    let document = XmlDocument::from_file(dir.join(name.as_str()))?;
    let imports = imported_schema_names(&document.root);
    documents.insert(name.clone(), document);
    for import in imports {
        collect_imports(dir, &import, ordered, documents)?;
    }
    ordered.push(name.clone());
    Ok(())
}

fn imported_schema_names(root: &XmlElement) -> Vec<CompactString> {
    root.children_named(XSD_NS, "import")
        .filter_map(|import| import.attr("schemaLocation"))
        .map(|location| {
            Path::new(location)
                .file_name()
                .map(|n| n.to_string_lossy().as_ref().into())
                .unwrap_or_else(|| location.into())
        })
        .collect()
}

fn register_schema(
    dts: &mut Dts,
    name: &CompactString,
    document: &XmlDocument,
) -> Result<crate::taxonomy::SchemaId> {
    let root = &document.root;
    let target_namespace = root.attr("targetNamespace").ok_or_else(|| {
        Error::TaxonomyCreation(format!("schema {} has no targetNamespace", name))
    })?;
    let namespace = Namespace {
        prefix: namespace_prefix(root, target_namespace),
        uri: target_namespace.into(),
    };

    let schema_id = dts.add_schema(TaxonomySchema::new(
        name.clone(),
        namespace.clone(),
        imported_schema_names(root),
    ));

    for element in root.children_named(XSD_NS, "element") {
        let Some(id) = element.attr("id") else {
            continue;
        };
        let element_name = element.attr("name").ok_or_else(|| {
            Error::TaxonomyCreation(format!("element {} in {} has no name", id, name))
        })?;
        dts.register_concept(Concept {
            name: element_name.into(),
            id: id.into(),
            concept_type: element.attr("type").map(Into::into),
            substitution_group: element.attr("substitutionGroup").map(Into::into),
            period_type: PeriodType::from_attr(element.attr_ns(XBRLI_NS, "periodType")),
            is_abstract: element.attr("abstract") == Some("true"),
            nillable: element.attr("nillable") == Some("true"),
            typed_domain_ref: element.attr_ns(XBRLDT_NS, "typedDomainRef").map(Into::into),
            schema: schema_id,
            namespace: namespace.clone(),
        })?;
    }
    Ok(schema_id)
}

/// The prefix bound to the target namespace on the schema root, or a
/// synthesized `ns_<trailing path segment>` when none is declared.
fn namespace_prefix(root: &XmlElement, target_namespace: &str) -> CompactString {
    root.namespace_decls
        .iter()
        .find(|(prefix, uri)| !prefix.is_empty() && uri == target_namespace)
        .map(|(prefix, _)| prefix.clone())
        .unwrap_or_else(|| {
            let trailing = target_namespace
                .rsplit('/')
                .next()
                .unwrap_or(target_namespace);
            CompactString::from(format!("ns_{}", trailing))
        })
}

fn linkbase_refs<'a>(
    schema_root: &'a XmlElement,
    ref_role: &'a str,
) -> impl Iterator<Item = &'a XmlElement> {
    schema_root
        .children_named(XSD_NS, "annotation")
        .flat_map(|a| a.children_named(XSD_NS, "appinfo"))
        .flat_map(|a| a.children_named(LINK_NS, "linkbaseRef"))
        .filter(move |r| r.attr_ns(XLINK_NS, "role") == Some(ref_role))
}

fn read_locator(
    dts: &Dts,
    base: &Linkbase,
    element: &XmlElement,
    source: &CompactString,
    role: &CompactString,
) -> Result<Locator> {
    let label = element.attr_ns(XLINK_NS, "label").ok_or_else(|| {
        Error::TaxonomyCreation(format!("locator without label in linkbase {}", source))
    })?;
    let href = element.attr_ns(XLINK_NS, "href").ok_or_else(|| {
        Error::TaxonomyCreation(format!("locator without href in linkbase {}", source))
    })?;
    // href has the form file#elementId; only the id resolves the target.
    let target_id = href.rsplit_once('#').map(|(_, id)| id).unwrap_or(href);
    let target = dts
        .concept_by_id(target_id)
        .map(LocatorTarget::Concept)
        .or_else(|| base.resource_by_id(target_id).map(LocatorTarget::Resource))
        .ok_or_else(|| {
            Error::TaxonomyCreation(format!(
                "unresolved locator target {} in linkbase {}",
                target_id, source
            ))
        })?;

    Ok(Locator {
        label: label.into(),
        role: element.attr_ns(XLINK_NS, "role").map(Into::into),
        title: element.attr_ns(XLINK_NS, "title").map(Into::into),
        id: element.attr("id").map(Into::into),
        target,
        usable: true,
        source: source.clone(),
        extended_link_role: role.clone(),
    })
}

fn read_resource(
    element: &XmlElement,
    source: &CompactString,
    role: &CompactString,
) -> Result<Resource> {
    let label = element.attr_ns(XLINK_NS, "label").ok_or_else(|| {
        Error::TaxonomyCreation(format!("resource without label in linkbase {}", source))
    })?;
    Ok(Resource {
        label: label.into(),
        role: element.attr_ns(XLINK_NS, "role").map(Into::into),
        title: element.attr_ns(XLINK_NS, "title").map(Into::into),
        id: element.attr("id").map(Into::into),
        lang: element.attr_ns(XML_NS, "lang").map(Into::into),
        value: element.text().to_string(),
        source: source.clone(),
        extended_link_role: role.clone(),
    })
}

/// Creates the arcs of one arc element. `xlink:from`/`xlink:to` resolve to
/// the elements sharing that label within the link role and source file;
/// one-to-many endpoints produce one arc per pair.
fn read_arcs(
    base: &mut Linkbase,
    arc_element: &XmlElement,
    source: &CompactString,
    role: &CompactString,
) -> Result<()> {
    let from = arc_element.attr_ns(XLINK_NS, "from").ok_or_else(|| {
        Error::TaxonomyCreation(format!("arc without xlink:from in linkbase {}", source))
    })?;
    let to = arc_element.attr_ns(XLINK_NS, "to").ok_or_else(|| {
        Error::TaxonomyCreation(format!("arc without xlink:to in linkbase {}", source))
    })?;
    let from_elements = base.elements_with_label(from, role, source);
    let to_elements = base.elements_with_label(to, role, source);

    let usable_false = arc_element.attr_ns(XBRLDT_NS, "usable") == Some("false");

    for from_id in &from_elements {
        for to_id in &to_elements {
            let mut arc = Arc::new(*from_id, *to_id, role.clone());
            arc.arcrole = arc_element
                .attr_ns(XLINK_NS, "arcrole")
                .unwrap_or_default()
                .into();
            arc.target_role = arc_element.attr_ns(XBRLDT_NS, "targetRole").map(Into::into);
            arc.context_element =
                ContextElementKind::from_attr(arc_element.attr_ns(XBRLDT_NS, "contextElement"));
            arc.arc_use = ArcUse::from_attr(arc_element.attr("use"));
            if let Some(order) = arc_element.attr("order").and_then(|v| v.parse().ok()) {
                arc.order = order;
            }
            if let Some(priority) = arc_element.attr("priority").and_then(|v| v.parse().ok()) {
                arc.priority = priority;
            }
            if let Some(weight) = arc_element.attr("weight").and_then(|v| v.parse().ok()) {
                arc.weight = weight;
            }
            arc.source_file = source.clone();
            arc.attributes = arc_element
                .attributes
                .iter()
                .map(|a| {
                    let name = match &a.prefix {
                        Some(p) => CompactString::from(format!("{}:{}", p, a.local_name)),
                        None => a.local_name.clone(),
                    };
                    (name, CompactString::from(a.value.as_str()))
                })
                .collect();

            if usable_false {
                if let ExtendedLinkElement::Locator(locator) = base.element_mut(*to_id) {
                    locator.usable = false;
                }
            }
            base.add_arc(arc);
        }
    }
    Ok(())
}

/// Fixture taxonomies shared by the end-to-end tests of this module and
/// the instance loader's.
#[cfg(test)]
pub(crate) mod fixtures {
    const SCHEMA_HEADER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:link="http://www.xbrl.org/2003/linkbase"
    xmlns:xlink="http://www.w3.org/1999/xlink"
    xmlns:xbrli="http://www.xbrl.org/2003/instance"
    xmlns:xbrldt="http://xbrl.org/2005/xbrldt""#;

    const T_XSD: &str = r#"
    xmlns:t="http://example.com/taxonomy/t"
    targetNamespace="http://example.com/taxonomy/t">
  <xsd:annotation>
    <xsd:appinfo>
      <link:linkbaseRef xlink:type="simple"
          xlink:role="http://www.xbrl.org/2003/role/presentationLinkbaseRef"
          xlink:href="t_pre.xml"/>
      <link:linkbaseRef xlink:type="simple"
          xlink:role="http://www.xbrl.org/2003/role/labelLinkbaseRef"
          xlink:href="t_lab.xml"/>
      <link:linkbaseRef xlink:type="simple"
          xlink:role="http://www.xbrl.org/2003/role/calculationLinkbaseRef"
          xlink:href="t_cal.xml"/>
    </xsd:appinfo>
  </xsd:annotation>
  <xsd:import namespace="http://example.com/taxonomy/base" schemaLocation="t_base.xsd"/>
  <xsd:element id="t_Assets" name="Assets" type="xbrli:monetaryItemType"
      substitutionGroup="xbrli:item" xbrli:periodType="instant" nillable="true"/>
  <xsd:element id="t_AssetsCurrent" name="AssetsCurrent" type="xbrli:monetaryItemType"
      substitutionGroup="xbrli:item" xbrli:periodType="instant" nillable="true"/>
  <xsd:element id="t_AssetsNonCurrent" name="AssetsNonCurrent" type="xbrli:monetaryItemType"
      substitutionGroup="xbrli:item" xbrli:periodType="instant" nillable="true"/>
</xsd:schema>"#;

    const T_BASE_XSD: &str = r#"
    targetNamespace="http://example.com/taxonomy/base">
  <xsd:element id="base_Notes" name="Notes" type="xbrli:stringItemType"
      substitutionGroup="xbrli:item" xbrli:periodType="duration" nillable="true"/>
</xsd:schema>"#;

    const LINKBASE_HEADER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<link:linkbase xmlns:link="http://www.xbrl.org/2003/linkbase"
    xmlns:xlink="http://www.w3.org/1999/xlink"
    xmlns:xbrldt="http://xbrl.org/2005/xbrldt">"#;

    const T_PRE_XML: &str = r#"
  <link:presentationLink xlink:type="extended"
      xlink:role="http://www.xbrl.org/2003/role/link">
    <link:loc xlink:type="locator" xlink:href="t.xsd#t_Assets" xlink:label="assets"/>
    <link:loc xlink:type="locator" xlink:href="t.xsd#t_AssetsCurrent" xlink:label="current"/>
    <link:loc xlink:type="locator" xlink:href="t.xsd#t_AssetsNonCurrent" xlink:label="nonCurrent"/>
    <link:presentationArc xlink:type="arc"
        xlink:arcrole="http://www.xbrl.org/2003/arcrole/parent-child"
        xlink:from="assets" xlink:to="nonCurrent" order="2.0"/>
    <link:presentationArc xlink:type="arc"
        xlink:arcrole="http://www.xbrl.org/2003/arcrole/parent-child"
        xlink:from="assets" xlink:to="current" order="1.0"/>
  </link:presentationLink>
</link:linkbase>"#;

    const T_LAB_XML: &str = r#"
  <link:labelLink xlink:type="extended"
      xlink:role="http://www.xbrl.org/2003/role/link">
    <link:loc xlink:type="locator" xlink:href="t.xsd#t_Assets" xlink:label="assets"/>
    <link:label xlink:type="resource" xlink:label="assets_lbl"
        xlink:role="http://www.xbrl.org/2003/role/label" xml:lang="en">Total assets</link:label>
    <link:labelArc xlink:type="arc"
        xlink:arcrole="http://www.xbrl.org/2003/arcrole/concept-label"
        xlink:from="assets" xlink:to="assets_lbl"/>
  </link:labelLink>
</link:linkbase>"#;

    const T_CAL_XML: &str = r#"
  <link:calculationLink xlink:type="extended"
      xlink:role="http://www.xbrl.org/2003/role/link">
    <link:loc xlink:type="locator" xlink:href="t.xsd#t_Assets" xlink:label="assets"/>
    <link:loc xlink:type="locator" xlink:href="t.xsd#t_AssetsCurrent" xlink:label="current"/>
    <link:loc xlink:type="locator" xlink:href="t.xsd#t_AssetsNonCurrent" xlink:label="nonCurrent"/>
    <link:calculationArc xlink:type="arc"
        xlink:arcrole="http://www.xbrl.org/2003/arcrole/summation-item"
        xlink:from="assets" xlink:to="current" weight="1.0" order="1.0"/>
    <link:calculationArc xlink:type="arc"
        xlink:arcrole="http://www.xbrl.org/2003/arcrole/summation-item"
        xlink:from="assets" xlink:to="nonCurrent" weight="1.0" order="2.0"/>
  </link:calculationLink>
</link:linkbase>"#;

    const P_XSD: &str = r#"
    xmlns:p="http://example.com/taxonomy/p"
    targetNamespace="http://example.com/taxonomy/p">
  <xsd:annotation>
    <xsd:appinfo>
      <link:linkbaseRef xlink:type="simple"
          xlink:role="http://www.xbrl.org/2003/role/calculationLinkbaseRef"
          xlink:href="p_cal.xml"/>
    </xsd:appinfo>
  </xsd:annotation>
  <xsd:element id="p_Total" name="Total" type="xbrli:monetaryItemType"
      substitutionGroup="xbrli:item" xbrli:periodType="instant" nillable="true"/>
  <xsd:element id="p_Part" name="Part" type="xbrli:monetaryItemType"
      substitutionGroup="xbrli:item" xbrli:periodType="instant" nillable="true"/>
</xsd:schema>"#;

    const P_CAL_XML: &str = r#"
  <link:calculationLink xlink:type="extended"
      xlink:role="http://www.xbrl.org/2003/role/link">
    <link:loc xlink:type="locator" xlink:href="p.xsd#p_Total" xlink:label="total"/>
    <link:loc xlink:type="locator" xlink:href="p.xsd#p_Part" xlink:label="part"/>
    <link:calculationArc xlink:type="arc"
        xlink:arcrole="http://www.xbrl.org/2003/arcrole/summation-item"
        xlink:from="total" xlink:to="part" weight="1.0" order="1.0"/>
    <link:calculationArc xlink:type="arc"
        xlink:arcrole="http://www.xbrl.org/2003/arcrole/summation-item"
        xlink:from="total" xlink:to="part" weight="2.0" priority="1" order="1.0"/>
  </link:calculationLink>
</link:linkbase>"#;

    pub(crate) fn write_asset_taxonomy(dir: &std::path::Path) {
        let files = [
            ("t.xsd", format!("{}{}", SCHEMA_HEADER, T_XSD)),
            ("t_base.xsd", format!("{}{}", SCHEMA_HEADER, T_BASE_XSD)),
            ("t_pre.xml", format!("{}{}", LINKBASE_HEADER, T_PRE_XML)),
            ("t_lab.xml", format!("{}{}", LINKBASE_HEADER, T_LAB_XML)),
            ("t_cal.xml", format!("{}{}", LINKBASE_HEADER, T_CAL_XML)),
        ];
        for (name, content) in files {
            std::fs::write(dir.join(name), content).unwrap();
        }
    }

    pub(crate) fn write_priority_taxonomy(dir: &std::path::Path) {
        std::fs::write(dir.join("p.xsd"), format!("{}{}", SCHEMA_HEADER, P_XSD)).unwrap();
        std::fs::write(
            dir.join("p_cal.xml"),
            format!("{}{}", LINKBASE_HEADER, P_CAL_XML),
        )
        .unwrap();
    }

    pub(crate) fn broken_calculation_linkbase() -> String {
        format!(
            "{}{}",
            LINKBASE_HEADER,
            r#"
  <link:calculationLink xlink:type="extended"
      xlink:role="http://www.xbrl.org/2003/role/link">
    <link:loc xlink:type="locator" xlink:href="t.xsd#t_Missing" xlink:label="missing"/>
  </link:calculationLink>
</link:linkbase>"#
        )
    }

    const D_XSD: &str = r#"
    xmlns:d="http://example.com/taxonomy/d"
    targetNamespace="http://example.com/taxonomy/d">
  <xsd:annotation>
    <xsd:appinfo>
      <link:linkbaseRef xlink:type="simple"
          xlink:role="http://www.xbrl.org/2003/role/definitionLinkbaseRef"
          xlink:href="d_def.xml"/>
    </xsd:appinfo>
  </xsd:annotation>
  <xsd:element id="d_Product" name="Product" type="xbrli:monetaryItemType"
      substitutionGroup="xbrli:item" xbrli:periodType="instant" nillable="true"/>
  <xsd:element id="d_RegionDim" name="RegionDim" abstract="true"
      substitutionGroup="xbrldt:dimensionItem" xbrli:periodType="duration"/>
  <xsd:element id="d_North" name="North" type="xbrli:stringItemType"
      substitutionGroup="xbrli:item" xbrli:periodType="duration" abstract="true"/>
  <xsd:element id="d_South" name="South" type="xbrli:stringItemType"
      substitutionGroup="xbrli:item" xbrli:periodType="duration" abstract="true"/>
  <xsd:element id="d_AllCube" name="AllCube" abstract="true"
      substitutionGroup="xbrldt:hypercubeItem" xbrli:periodType="duration"/>
  <xsd:element id="d_NotAllCube" name="NotAllCube" abstract="true"
      substitutionGroup="xbrldt:hypercubeItem" xbrli:periodType="duration"/>
</xsd:schema>"#;

    const D_DEF_XML: &str = r#"
  <link:definitionLink xlink:type="extended"
      xlink:role="http://example.com/role/allCube">
    <link:loc xlink:type="locator" xlink:href="d.xsd#d_AllCube" xlink:label="cube"/>
    <link:loc xlink:type="locator" xlink:href="d.xsd#d_RegionDim" xlink:label="dim"/>
    <link:loc xlink:type="locator" xlink:href="d.xsd#d_North" xlink:label="north"/>
    <link:definitionArc xlink:type="arc"
        xlink:arcrole="http://xbrl.org/int/dim/arcrole/hypercube-dimension"
        xlink:from="cube" xlink:to="dim"/>
    <link:definitionArc xlink:type="arc"
        xlink:arcrole="http://xbrl.org/int/dim/arcrole/dimension-domain"
        xlink:from="dim" xlink:to="north"/>
  </link:definitionLink>
  <link:definitionLink xlink:type="extended"
      xlink:role="http://example.com/role/notAllCube">
    <link:loc xlink:type="locator" xlink:href="d.xsd#d_NotAllCube" xlink:label="cube"/>
    <link:loc xlink:type="locator" xlink:href="d.xsd#d_RegionDim" xlink:label="dim"/>
    <link:loc xlink:type="locator" xlink:href="d.xsd#d_South" xlink:label="south"/>
    <link:definitionArc xlink:type="arc"
        xlink:arcrole="http://xbrl.org/int/dim/arcrole/hypercube-dimension"
        xlink:from="cube" xlink:to="dim"/>
    <link:definitionArc xlink:type="arc"
        xlink:arcrole="http://xbrl.org/int/dim/arcrole/dimension-domain"
        xlink:from="dim" xlink:to="south"/>
  </link:definitionLink>
  <link:definitionLink xlink:type="extended"
      xlink:role="http://example.com/role/binding">
    <link:loc xlink:type="locator" xlink:href="d.xsd#d_Product" xlink:label="product"/>
    <link:loc xlink:type="locator" xlink:href="d.xsd#d_AllCube" xlink:label="allCube"/>
    <link:loc xlink:type="locator" xlink:href="d.xsd#d_NotAllCube" xlink:label="notAllCube"/>
    <link:definitionArc xlink:type="arc"
        xlink:arcrole="http://xbrl.org/int/dim/arcrole/all"
        xlink:from="product" xlink:to="allCube" xbrldt:contextElement="scenario"/>
    <link:definitionArc xlink:type="arc"
        xlink:arcrole="http://xbrl.org/int/dim/arcrole/notAll"
        xlink:from="product" xlink:to="notAllCube" xbrldt:contextElement="scenario"/>
  </link:definitionLink>
</link:linkbase>"#;

    pub(crate) fn write_dimensional_taxonomy(dir: &std::path::Path) {
        std::fs::write(dir.join("d.xsd"), format!("{}{}", SCHEMA_HEADER, D_XSD)).unwrap();
        std::fs::write(
            dir.join("d_def.xml"),
            format!("{}{}", LINKBASE_HEADER, D_DEF_XML),
        )
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{
        broken_calculation_linkbase, write_asset_taxonomy, write_dimensional_taxonomy,
        write_priority_taxonomy,
    };
    use super::*;
    use crate::constants::{DEFAULT_LINK_ROLE, ROLE_LABEL};
    use crate::dimensions::MultipleDimensionType;
    use tempfile::TempDir;

    #[test]
    fn single_schema_concept_lookup() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());

        let dts = DtsBuilder::new().build(dir.path().join("t.xsd")).unwrap();

        let assets = dts.concept_by_id("t_Assets").unwrap();
        let concept = dts.concept(assets);
        assert_eq!(concept.name, "Assets");
        assert!(concept.is_numeric_item());
        assert_eq!(concept.period_type, PeriodType::Instant);
        assert!(concept.nillable);

        // lookups stay consistent with the registered concept
        let schema = dts.schema(concept.schema);
        assert_eq!(schema.concept_by_name("Assets"), Some(assets));
        assert_eq!(schema.namespace.prefix, "t");
    }

    #[test]
    fn imports_are_discovered_transitively() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());

        let dts = DtsBuilder::new().build(dir.path().join("t.xsd")).unwrap();

        assert_eq!(dts.schema_count(), 2);
        assert!(dts.concept_by_id("base_Notes").is_some());
        assert_eq!(dts.top_schema().unwrap().name, "t.xsd");
        // the import carries no declared prefix, so one is synthesized
        let base = dts.schema_by_name("t_base.xsd").unwrap();
        assert_eq!(dts.schema(base).namespace.prefix, "ns_base");
    }

    #[test]
    fn every_arc_stays_inside_its_link_role() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());

        let dts = DtsBuilder::new().build(dir.path().join("t.xsd")).unwrap();
        for linkbase in [
            dts.presentation.base(),
            dts.label.base(),
            dts.definition.base(),
            dts.calculation.base(),
        ] {
            for arc in linkbase.arcs() {
                assert_eq!(
                    linkbase.element(arc.from).extended_link_role(),
                    arc.extended_link_role.as_str()
                );
                assert_eq!(
                    linkbase.element(arc.to).extended_link_role(),
                    arc.extended_link_role.as_str()
                );
            }
        }
    }

    #[test]
    fn presentation_tree_orders_and_levels() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());

        let dts = DtsBuilder::new().build(dir.path().join("t.xsd")).unwrap();
        let assets = dts.concept_by_id("t_Assets").unwrap();
        let current = dts.concept_by_id("t_AssetsCurrent").unwrap();
        let non_current = dts.concept_by_id("t_AssetsNonCurrent").unwrap();

        let roots = dts.presentation.roots(None);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].concept, assets);
        assert_eq!(roots[0].level, 1);
        // successors are ordered by arc order, not document order
        assert_eq!(roots[0].successors, vec![current, non_current]);
        assert_eq!(roots[0].num_successors_at_deepest_level, 2);

        let elements = dts.presentation.elements_for(&dts, None, None);
        let concepts: Vec<_> = elements.iter().map(|e| e.concept).collect();
        assert_eq!(concepts, vec![assets, current, non_current]);
        for element in &elements {
            match element.parent {
                Some(parent) => {
                    let parent_element = dts.presentation.element(parent, None).unwrap();
                    assert_eq!(element.level, parent_element.level + 1);
                }
                None => assert_eq!(element.level, 1),
            }
        }
        assert_eq!(elements[0].position_deepest_level, Some(0));
        assert_eq!(elements[1].position_deepest_level, Some(1));

        let subtree = dts.presentation.subtree_for(current, None);
        assert_eq!(subtree.len(), 1);
    }

    #[test]
    fn label_lookup_with_fallback() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());

        let dts = DtsBuilder::new().build(dir.path().join("t.xsd")).unwrap();
        let assets = dts.concept_by_id("t_Assets").unwrap();

        assert_eq!(dts.label.label(assets, ROLE_LABEL, "en"), Some("Total assets"));
        // unknown role falls back to the language match
        assert_eq!(
            dts.label
                .label(assets, "http://www.xbrl.org/2003/role/verboseLabel", "en"),
            Some("Total assets")
        );
        assert_eq!(dts.label.label(assets, ROLE_LABEL, "de"), Some("Total assets"));
    }

    #[test]
    fn higher_priority_arc_wins_calculation() {
        let dir = TempDir::new().unwrap();
        write_priority_taxonomy(dir.path());

        let dts = DtsBuilder::new().build(dir.path().join("p.xsd")).unwrap();
        let total = dts.concept_by_id("p_Total").unwrap();
        let part = dts.concept_by_id("p_Part").unwrap();

        let rules = dts.calculation.calculations(total, DEFAULT_LINK_ROLE);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.get(&part), Some(&2.0));
    }

    #[test]
    fn unresolved_locator_href_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_asset_taxonomy(dir.path());
        std::fs::write(dir.path().join("t_cal.xml"), broken_calculation_linkbase()).unwrap();

        let err = DtsBuilder::new()
            .build(dir.path().join("t.xsd"))
            .unwrap_err();
        match err {
            Error::TaxonomyCreation(message) => {
                assert!(message.contains("t_Missing"));
                assert!(message.contains("t_cal.xml"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn hypercubes_carry_their_dimensions() {
        let dir = TempDir::new().unwrap();
        write_dimensional_taxonomy(dir.path());

        let dts = DtsBuilder::new().build(dir.path().join("d.xsd")).unwrap();
        let dim = dts.concept_by_id("d_RegionDim").unwrap();
        let north = dts.concept_by_id("d_North").unwrap();

        for cube in dts.definition.hypercubes() {
            for dimension in cube.dimensions() {
                assert!(dimension.typed || !dimension.members.is_empty());
            }
        }
        let all_cube = dts
            .definition
            .hypercube(dts.concept_by_id("d_AllCube").unwrap())
            .unwrap();
        assert!(all_cube.contains_dimension(dim));
        assert!(all_cube
            .dimension_domain(dim)
            .unwrap()
            .contains_key(&north));
    }

    #[test]
    fn all_cube_admits_not_all_cube_rejects() {
        let dir = TempDir::new().unwrap();
        write_dimensional_taxonomy(dir.path());

        let dts = DtsBuilder::new().build(dir.path().join("d.xsd")).unwrap();
        let product = dts.concept_by_id("d_Product").unwrap();
        let dim = dts.concept_by_id("d_RegionDim").unwrap();
        let north = dts.concept_by_id("d_North").unwrap();
        let south = dts.concept_by_id("d_South").unwrap();

        let north_coordinates = MultipleDimensionType::explicit(dim, north);
        assert!(dts.definition.dimension_allowed(
            &dts,
            product,
            &north_coordinates,
            ContextElementKind::Scenario
        ));

        let south_coordinates = MultipleDimensionType::explicit(dim, south);
        assert!(!dts.definition.dimension_allowed(
            &dts,
            product,
            &south_coordinates,
            ContextElementKind::Scenario
        ));

        // nothing matches in the segment slot
        assert!(!dts.definition.dimension_allowed(
            &dts,
            product,
            &north_coordinates,
            ContextElementKind::Segment
        ));
    }
}

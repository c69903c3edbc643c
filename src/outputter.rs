//! Serializes an [`Instance`] back to XBRL 2.1 instance markup.

use crate::constants::{LINK_NS, XBRLDI_NS, XLINK_NS, XSI_NS};
use crate::dimensions::{MemberValue, MultipleDimensionType, SingleDimensionType};
use crate::instance::{Instance, InstanceContext, Period};
use crate::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

pub struct InstanceOutputter<'a> {
    instance: &'a Instance,
}

impl<'a> InstanceOutputter<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|e| Error::Xbrl(e.to_string()))?;

        let instance = self.instance;
        let prefix = instance.namespace().prefix.as_str();
        let root_name = format!("{}:xbrl", prefix);

        let mut root = BytesStart::new(root_name.as_str());
        root.push_attribute((
            format!("xmlns:{}", prefix).as_str(),
            instance.namespace().uri.as_str(),
        ));
        root.push_attribute(("xmlns:link", LINK_NS));
        root.push_attribute(("xmlns:xlink", XLINK_NS));
        root.push_attribute(("xmlns:xbrldi", XBRLDI_NS));
        for (extra_prefix, uri) in instance.additional_namespaces() {
            if matches!(extra_prefix.as_str(), "link" | "xlink" | "xbrldi" | "xsi") {
                continue;
            }
            root.push_attribute((format!("xmlns:{}", extra_prefix).as_str(), uri.as_str()));
        }
        // Taxonomy namespaces that are not yet declared on the instance.
        for dts in instance.dts_list() {
            for (_, schema) in dts.schemas() {
                if instance.prefix_for_uri(&schema.namespace.uri).is_none() {
                    root.push_attribute((
                        format!("xmlns:{}", schema.namespace.prefix).as_str(),
                        schema.namespace.uri.as_str(),
                    ));
                }
            }
        }
        if !instance.schema_locations().is_empty() {
            root.push_attribute(("xmlns:xsi", XSI_NS));
            let locations: Vec<String> = instance
                .schema_locations()
                .iter()
                .map(|(uri, name)| format!("{} {}", uri, name))
                .collect();
            root.push_attribute(("xsi:schemaLocation", locations.join(" ").as_str()));
        }
        writer
            .write_event(Event::Start(root))
            .map_err(|e| Error::Xbrl(e.to_string()))?;

        for dts in instance.dts_list() {
            if let Some(top) = dts.top_schema() {
                let mut schema_ref = BytesStart::new("link:schemaRef");
                schema_ref.push_attribute(("xlink:type", "simple"));
                schema_ref.push_attribute(("xlink:href", top.name.as_str()));
                writer
                    .write_event(Event::Empty(schema_ref))
                    .map_err(|e| Error::Xbrl(e.to_string()))?;
            }
        }

        for context in instance.contexts().values() {
            self.write_context(&mut writer, prefix, context)?;
        }

        for unit in instance.units().values() {
            let mut unit_start = BytesStart::new(format!("{}:unit", prefix));
            unit_start.push_attribute(("id", unit.id.as_str()));
            write_start(&mut writer, unit_start)?;
            let measure = match instance.prefix_for_uri(&unit.namespace_uri) {
                Some(measure_prefix) => format!("{}:{}", measure_prefix, unit.value),
                None => unit.value.to_string(),
            };
            write_text_element(&mut writer, &format!("{}:measure", prefix), &measure)?;
            write_end(&mut writer, &format!("{}:unit", prefix))?;
        }

        for fact in instance.facts() {
            let Some(concept) = instance.concept(fact.concept) else {
                continue;
            };
            let name = format!("{}:{}", concept.namespace.prefix, concept.name);
            let mut start = BytesStart::new(name.as_str());
            start.push_attribute(("contextRef", fact.context.as_str()));
            if let Some(unit) = &fact.unit {
                start.push_attribute(("unitRef", unit.as_str()));
            }
            if let Some(decimals) = &fact.decimals {
                start.push_attribute(("decimals", decimals.as_str()));
            }
            if let Some(precision) = &fact.precision {
                start.push_attribute(("precision", precision.as_str()));
            }
            write_start(&mut writer, start)?;
            writer
                .write_event(Event::Text(BytesText::new(&fact.value)))
                .map_err(|e| Error::Xbrl(e.to_string()))?;
            write_end(&mut writer, &name)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(root_name.as_str())))
            .map_err(|e| Error::Xbrl(e.to_string()))?;

        String::from_utf8(writer.into_inner()).map_err(|e| Error::Xbrl(e.to_string()))
    }

    fn write_context(
        &self,
        writer: &mut Writer<Vec<u8>>,
        prefix: &str,
        context: &InstanceContext,
    ) -> Result<()> {
        let mut start = BytesStart::new(format!("{}:context", prefix));
        start.push_attribute(("id", context.id.as_str()));
        write_start(writer, start)?;

        write_start(writer, BytesStart::new(format!("{}:entity", prefix)))?;
        let mut identifier = BytesStart::new(format!("{}:identifier", prefix));
        identifier.push_attribute(("scheme", context.identifier_scheme.as_str()));
        write_start(writer, identifier)?;
        writer
            .write_event(Event::Text(BytesText::new(&context.identifier)))
            .map_err(|e| Error::Xbrl(e.to_string()))?;
        write_end(writer, &format!("{}:identifier", prefix))?;
        if let Some(segment) = &context.segment {
            write_start(writer, BytesStart::new(format!("{}:segment", prefix)))?;
            self.write_members(writer, segment)?;
            write_end(writer, &format!("{}:segment", prefix))?;
        }
        write_end(writer, &format!("{}:entity", prefix))?;

        write_start(writer, BytesStart::new(format!("{}:period", prefix)))?;
        match &context.period {
            Period::Duration { start, end } => {
                write_text_element(writer, &format!("{}:startDate", prefix), start)?;
                write_text_element(writer, &format!("{}:endDate", prefix), end)?;
            }
            Period::Instant(value) => {
                write_text_element(writer, &format!("{}:instant", prefix), value)?;
            }
            Period::Forever => {
                writer
                    .write_event(Event::Empty(BytesStart::new(
                        format!("{}:forever", prefix).as_str(),
                    )))
                    .map_err(|e| Error::Xbrl(e.to_string()))?;
            }
        }
        write_end(writer, &format!("{}:period", prefix))?;

        if let Some(scenario) = &context.scenario {
            write_start(
                writer,
                BytesStart::new(format!("{}:scenario", prefix)),
            )?;
            self.write_members(writer, scenario)?;
            write_end(writer, &format!("{}:scenario", prefix))?;
        }

        write_end(writer, &format!("{}:context", prefix))
    }

    /// Members are written current first, so a re-parse seeds the same
    /// current combination.
    fn write_members(
        &self,
        writer: &mut Writer<Vec<u8>>,
        mdt: &MultipleDimensionType,
    ) -> Result<()> {
        self.write_member(writer, mdt.current())?;
        for sdt in mdt.previous() {
            self.write_member(writer, sdt)?;
        }
        Ok(())
    }

    fn write_member(
        &self,
        writer: &mut Writer<Vec<u8>>,
        sdt: &SingleDimensionType,
    ) -> Result<()> {
        let instance = self.instance;
        let dimension = instance
            .dts_list()
            .iter()
            .find_map(|dts| dts.try_concept(sdt.dimension))
            .ok_or_else(|| Error::Xbrl("dimension concept outside the DTS set".into()))?;
        let dimension_name = format!("{}:{}", dimension.namespace.prefix, dimension.name);
        match &sdt.member {
            MemberValue::Explicit(member_id) => {
                let member = instance
                    .dts_list()
                    .iter()
                    .find_map(|dts| dts.try_concept(*member_id))
                    .ok_or_else(|| Error::Xbrl("domain member outside the DTS set".into()))?;
                let mut start = BytesStart::new("xbrldi:explicitMember");
                start.push_attribute(("dimension", dimension_name.as_str()));
                write_start(writer, start)?;
                writer
                    .write_event(Event::Text(BytesText::new(&format!(
                        "{}:{}",
                        member.namespace.prefix, member.name
                    ))))
                    .map_err(|e| Error::Xbrl(e.to_string()))?;
                write_end(writer, "xbrldi:explicitMember")
            }
            MemberValue::Typed(payload) => {
                let mut start = BytesStart::new("xbrldi:typedMember");
                start.push_attribute(("dimension", dimension_name.as_str()));
                write_start(writer, start)?;
                writer
                    .write_event(Event::Text(BytesText::from_escaped(payload.as_str())))
                    .map_err(|e| Error::Xbrl(e.to_string()))?;
                write_end(writer, "xbrldi:typedMember")
            }
        }
    }
}

fn write_start(writer: &mut Writer<Vec<u8>>, start: BytesStart<'_>) -> Result<()> {
    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::Xbrl(e.to_string()))
}

fn write_end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| Error::Xbrl(e.to_string()))
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    write_start(writer, BytesStart::new(name))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(|e| Error::Xbrl(e.to_string()))?;
    write_end(writer, name)
}

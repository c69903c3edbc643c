//! Instance validation against the calculation linkbases of the
//! referenced taxonomy sets, plus the pluggable XML-Schema hook.

use crate::instance::{ConceptRef, Fact, Instance};
use crate::outputter::InstanceOutputter;
use crate::taxonomy::Dts;
use crate::{CalculationError, Error, Result};
use compact_str::CompactString;
use rust_decimal::Decimal;
use tracing::debug;

/// External XML-Schema validation collaborator. The validator assembles
/// the schema-location string; performing the actual schema check is the
/// implementor's business.
pub trait XmlSchemaValidator {
    fn validate(&self, xml: &str, schema_location: &str) -> Result<()>;
}

pub struct InstanceValidator<'a> {
    instance: &'a Instance,
    schema_validator: Option<Box<dyn XmlSchemaValidator + 'a>>,
}

impl<'a> InstanceValidator<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            schema_validator: None,
        }
    }

    pub fn with_schema_validator(
        mut self,
        schema_validator: Box<dyn XmlSchemaValidator + 'a>,
    ) -> Self {
        self.schema_validator = Some(schema_validator);
        self
    }

    /// The `"<namespace> <schemaFile> …"` pairs handed to the external
    /// schema validator, instance namespace first.
    pub fn schema_location(&self) -> String {
        let instance = self.instance;
        let mut parts = Vec::new();
        if let Some((dts_index, schema)) = instance.schema_for_uri(&instance.namespace().uri) {
            let name = &instance.dts_list()[dts_index].schema(schema).name;
            parts.push(format!("{} {}", instance.namespace().uri, name));
        }
        for (_, uri) in instance.additional_namespaces() {
            if let Some((dts_index, schema)) = instance.schema_for_uri(uri) {
                let name = &instance.dts_list()[dts_index].schema(schema).name;
                parts.push(format!("{} {}", uri, name));
            }
        }
        parts.join(" ")
    }

    /// Runs the external XML-Schema validation, when a collaborator is
    /// configured. Serializes the instance and passes the assembled
    /// schema-location string along.
    pub fn schema_validation(&self) -> Result<()> {
        let Some(schema_validator) = &self.schema_validator else {
            return Ok(());
        };
        let xml = InstanceOutputter::new(self.instance).to_xml()?;
        schema_validator.validate(&xml, &self.schema_location())
    }

    /// Validates every fact against the calculation linkbases, stopping at
    /// the first failure.
    pub fn validate(&self) -> Result<()> {
        for fact in self.instance.facts() {
            self.validate_calculation(fact)?;
        }
        Ok(())
    }

    /// Validates one fact: in every extended link role that defines
    /// summation rules for its concept, the weighted sum of the summand
    /// facts of the same context must equal the reported value.
    pub fn validate_calculation(&self, fact: &Fact) -> Result<()> {
        let dts = self.instance.dts(fact.concept.dts).ok_or_else(|| {
            Error::InstanceValidation(format!(
                "no taxonomy schema found for fact in context {}",
                fact.context
            ))
        })?;
        let concept = dts.try_concept(fact.concept.concept).ok_or_else(|| {
            Error::InstanceValidation(format!(
                "fact in context {} refers to a concept not found in any DTS",
                fact.context
            ))
        })?;

        let calculation = &dts.calculation;
        if calculation.base().is_empty() {
            return Ok(());
        }

        let roles: Vec<CompactString> = calculation
            .base()
            .extended_link_roles()
            .map(CompactString::from)
            .collect();
        for role in &roles {
            let rules = calculation.calculations(fact.concept.concept, role);
            if rules.is_empty() {
                continue;
            }
            debug!(
                concept = concept.name.as_str(),
                role = role.as_str(),
                summands = rules.len(),
                "checking calculation"
            );

            let expected = parse_decimal(&fact.value)?;
            let mut computed = Decimal::ZERO;
            for (summand, weight) in &rules {
                let summand_ref = ConceptRef {
                    dts: fact.concept.dts,
                    concept: *summand,
                };
                let summand_fact =
                    self.instance.fact(summand_ref, &fact.context).ok_or_else(|| {
                        CalculationError::MissingValues {
                            concept: dts.concept(*summand).name.clone(),
                            dts: dts_name(dts),
                        }
                    })?;
                computed += parse_decimal(&summand_fact.value)? * decimal_weight(*weight)?;
            }

            if computed != expected {
                return Err(CalculationError::Mismatch {
                    concept: concept.name.clone(),
                    expected,
                    computed,
                    summands: rules
                        .keys()
                        .map(|s| dts.concept(*s).name.clone())
                        .collect(),
                    extended_link_role: role.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn dts_name(dts: &Dts) -> CompactString {
    dts.top_schema()
        .map(|s| s.name.clone())
        .unwrap_or_default()
}

/// Parses a fact value as an exact decimal, normalizing the decimal comma.
fn parse_decimal(value: &str) -> Result<Decimal> {
    value
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| Error::Xbrl(format!("not a decimal value: {}", value)))
}

fn decimal_weight(weight: f64) -> Result<Decimal> {
    Decimal::try_from(weight).map_err(|_| Error::Xbrl(format!("invalid arc weight {}", weight)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_comma_is_normalized() {
        assert_eq!(parse_decimal("1,5").unwrap(), Decimal::new(15, 1));
        assert_eq!(parse_decimal(" 100 ").unwrap(), Decimal::new(100, 0));
        assert!(parse_decimal("n/a").is_err());
    }

    #[test]
    fn weights_convert_exactly() {
        assert_eq!(decimal_weight(1.0).unwrap(), Decimal::ONE);
        assert_eq!(decimal_weight(-1.0).unwrap(), -Decimal::ONE);
        assert_eq!(decimal_weight(0.5).unwrap(), Decimal::new(5, 1));
    }
}

//! xbrldts - XBRL discoverable taxonomy set engine and instance validator
//!
//! Licensed under AGPL-3.0

pub mod constants;
pub mod definition;
pub mod dimensions;
pub mod dts_builder;
pub mod instance;
pub mod instance_builder;
pub mod linkbase;
pub mod outputter;
pub mod presentation;
pub mod taxonomy;
pub mod validator;
pub mod xlink;
pub mod xml;

pub use dts_builder::DtsBuilder;
pub use instance::{Fact, Instance, InstanceContext, InstanceUnit};
pub use instance_builder::InstanceBuilder;
pub use outputter::InstanceOutputter;
pub use taxonomy::{Concept, ConceptId, Dts, SchemaId, TaxonomySchema};
pub use validator::InstanceValidator;

use compact_str::CompactString;
use rust_decimal::Decimal;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("taxonomy creation error: {0}")]
    TaxonomyCreation(String),

    #[error("instance load error: {0}")]
    InstanceLoad(String),

    #[error("instance validation error: {0}")]
    InstanceValidation(String),

    #[error(transparent)]
    Calculation(#[from] CalculationError),

    #[error("XBRL error: {0}")]
    Xbrl(String),
}

/// Failures of the calculation linkbase validation.
#[derive(Debug, thiserror::Error)]
pub enum CalculationError {
    #[error("missing value for summand concept {concept} of taxonomy {dts}")]
    MissingValues {
        concept: CompactString,
        dts: CompactString,
    },

    #[error(
        "calculated {computed} does not match reported {expected} for {concept} \
         in extended link role {extended_link_role}"
    )]
    Mismatch {
        concept: CompactString,
        expected: Decimal,
        computed: Decimal,
        summands: Vec<CompactString>,
        extended_link_role: CompactString,
    },
}

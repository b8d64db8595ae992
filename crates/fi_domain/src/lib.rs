//! Domain types shared by the FileImporter-RS crates: namespaces and page
//! references, page-name normalization, the conversion ruleset built from a
//! CommonsHelper page, and the localizable message contract for errors.

pub mod conversions;
pub mod message;
pub mod page_name;
pub mod types;

pub use conversions::{
    ConversionsConfig, ConversionsError, ConversionsStats, ParameterKey, ParameterRule, ParameterRuleConfig,
    SourceParameters, TemplateParameter, TemplateTransformation, TransformationConfig,
    WikitextConversions,
};
pub use message::LocalizedMessage;
pub use types::{Namespace, PageRef};

//! Checks the templates and categories used on a file description page
//! against the ruleset. Validation never touches the wikitext.

use fi_domain::{LocalizedMessage, PageRef, WikitextConversions};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("the file description page contains the template \"{template}\", which blocks the import")]
    BlockedTemplate { template: String },
    #[error("the file description page does not contain any of the required templates")]
    MissingRequiredTemplate,
    #[error("the file description page is in the category \"{category}\", which blocks the import")]
    BlockedCategory { category: String },
}

impl LocalizedMessage for ValidationError {
    fn key(&self) -> &'static str {
        match self {
            Self::BlockedTemplate { .. } => "fileimporter-file-contains-blocked-category-template",
            Self::MissingRequiredTemplate => "fileimporter-file-missing-required-template",
            Self::BlockedCategory { .. } => "fileimporter-file-contains-blocked-category",
        }
    }

    fn params(&self) -> Vec<String> {
        match self {
            Self::BlockedTemplate { template } => vec![template.clone()],
            Self::MissingRequiredTemplate => Vec::new(),
            Self::BlockedCategory { category } => vec![category.clone()],
        }
    }
}

pub struct WikitextContentValidator {
    conversions: Arc<WikitextConversions>,
}

impl WikitextContentValidator {
    pub fn new(conversions: Arc<WikitextConversions>) -> Self {
        Self { conversions }
    }

    /// Fails on the first forbidden template, then requires at least one of
    /// the good templates if any are configured.
    pub fn validate_templates(&self, templates: &[PageRef]) -> Result<(), ValidationError> {
        if let Some(bad) = templates
            .iter()
            .find(|t| self.conversions.is_template_bad(&t.title))
        {
            return Err(ValidationError::BlockedTemplate {
                template: bad.title.clone(),
            });
        }
        self.has_required_template(templates)
    }

    pub fn has_required_template(&self, templates: &[PageRef]) -> Result<(), ValidationError> {
        if !self.conversions.has_good_templates()
            || templates
                .iter()
                .any(|t| self.conversions.is_template_good(&t.title))
        {
            return Ok(());
        }
        Err(ValidationError::MissingRequiredTemplate)
    }

    pub fn validate_categories(&self, categories: &[PageRef]) -> Result<(), ValidationError> {
        match categories
            .iter()
            .find(|c| self.conversions.is_category_bad(&c.title))
        {
            Some(bad) => Err(ValidationError::BlockedCategory {
                category: bad.title.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Validates the "templates used" and "categories used" lists of a file
/// description page.
pub struct FileDescriptionPageValidator {
    content: WikitextContentValidator,
}

impl FileDescriptionPageValidator {
    pub fn new(conversions: Arc<WikitextConversions>) -> Self {
        Self {
            content: WikitextContentValidator::new(conversions),
        }
    }

    pub fn validate(&self, templates: &[PageRef], categories: &[PageRef]) -> Result<(), ValidationError> {
        let result = self
            .content
            .validate_templates(templates)
            .and_then(|()| self.content.validate_categories(categories));
        match &result {
            Ok(()) => tracing::debug!(
                templates = templates.len(),
                categories = categories.len(),
                "file description page passed validation"
            ),
            Err(e) => tracing::info!(key = e.key(), error = %e, "file description page rejected"),
        }
        result
    }
}

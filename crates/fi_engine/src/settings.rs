use crate::namespace_util::{NamespaceTable, TitleParser, normalize_prefix};
use fi_domain::Namespace;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::warn;

/// Per-target-wiki settings for one source wiki.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImporterSettings {
    /// Content language of the source wiki.
    #[serde(default = "default_language")]
    pub source_language: String,
    /// Interwiki prefix on the target wiki that points back to the source
    /// wiki, e.g. `de` or `w:de`. Empty disables link prefixing.
    #[serde(default)]
    pub interwiki_prefix: String,
    /// Language template wrapped around transferred free-text values.
    #[serde(default)]
    pub language_template: Option<String>,
    /// Interwiki prefixes the target wiki knows about.
    #[serde(default)]
    pub known_interwikis: Vec<String>,
    /// Additional source wiki namespace names, e.g. from siteinfo.
    #[serde(default)]
    pub extra_namespace_names: IndexMap<String, i32>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for ImporterSettings {
    fn default() -> Self {
        Self {
            source_language: default_language(),
            interwiki_prefix: String::new(),
            language_template: None,
            known_interwikis: Vec::new(),
            extra_namespace_names: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("source_language must not be empty")]
    EmptyLanguage,
    #[error("interwiki_prefix {0:?} contains whitespace or link syntax")]
    InvalidInterwikiPrefix(String),
    #[error("language_template {0:?} contains template syntax")]
    InvalidLanguageTemplate(String),
    #[error("TOML parse error: {0}")]
    ParseError(String),
}

impl ImporterSettings {
    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, SettingsError> {
        toml::from_str(s).map_err(|e| SettingsError::ParseError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.source_language.trim().is_empty() {
            return Err(SettingsError::EmptyLanguage);
        }
        if self
            .interwiki_prefix
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '[' | ']' | '{' | '}' | '|'))
        {
            return Err(SettingsError::InvalidInterwikiPrefix(
                self.interwiki_prefix.clone(),
            ));
        }
        if let Some(template) = &self.language_template {
            if template.contains(['{', '}', '|']) {
                return Err(SettingsError::InvalidLanguageTemplate(template.clone()));
            }
        }
        Ok(())
    }

    pub fn is_english_source(&self) -> bool {
        self.source_language.trim().eq_ignore_ascii_case("en")
    }

    /// Namespace names of the source wiki.
    pub fn source_namespaces(&self) -> NamespaceTable {
        let builtin = NamespaceTable::for_language(self.source_language.trim());
        if builtin.is_empty() {
            warn!(
                language = self.source_language.trim(),
                "no built-in namespace names for source language"
            );
        }
        builtin.with_names(
            self.extra_namespace_names
                .iter()
                .map(|(name, id)| (name.as_str(), Namespace(*id))),
        )
    }

    /// Title parser of the target wiki. The first label of the interwiki
    /// prefix always counts as a known interwiki.
    pub fn target_title_parser(&self) -> TitleParser {
        let own_prefix = self
            .interwiki_prefix
            .split(':')
            .next()
            .map(normalize_prefix)
            .unwrap_or_default();
        let interwikis = self
            .known_interwikis
            .iter()
            .cloned()
            .chain(std::iter::once(own_prefix));
        TitleParser::new(NamespaceTable::canonical(), interwikis)
    }
}

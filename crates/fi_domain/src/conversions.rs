//! The validation and replacement ruleset applied to an imported file
//! description page.
//!
//! A [`WikitextConversions`] is built once per source wiki from a
//! [`ConversionsConfig`] (usually produced by the CommonsHelper parser) and
//! is read-only afterwards, so it can be shared between imports.

use crate::page_name::{normalize, normalize_without_namespace};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionsError {
    #[error("transfer rule for template \"{template}\" has no target template")]
    MissingTargetTemplate { template: String },
    #[error("transfer rule for template \"{template}\" has no parameter list")]
    MissingParameters { template: String },
    #[error(
        "parameter \"{parameter}\" of template \"{template}\" is both add-if-missing and renamed from source parameters"
    )]
    ConflictingParameterRule { template: String, parameter: String },
    #[error("add-if-missing parameter \"{parameter}\" of template \"{template}\" has no value")]
    MissingValue { template: String, parameter: String },
    #[error("config parse error: {0}")]
    ParseError(String),
}

/// Structured input for [`WikitextConversions::new`].
///
/// Field names follow the camelCase keys used by the FileImporter data
/// format, so the same document can be read from JSON or TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConversionsConfig {
    #[serde(default)]
    pub required_templates: Vec<String>,
    #[serde(default)]
    pub forbidden_templates: Vec<String>,
    #[serde(default)]
    pub forbidden_categories: Vec<String>,
    #[serde(default)]
    pub obsolete_templates: Vec<String>,
    /// Source template name → transfer rule.
    #[serde(default)]
    pub template_transformations: IndexMap<String, TransformationConfig>,
    /// Exact heading text → replacement heading text.
    #[serde(default)]
    pub heading_replacements: IndexMap<String, String>,
}

impl ConversionsConfig {
    pub fn from_json(s: &str) -> Result<Self, ConversionsError> {
        serde_json::from_str(s).map_err(|e| ConversionsError::ParseError(e.to_string()))
    }

    pub fn from_toml(s: &str) -> Result<Self, ConversionsError> {
        toml::from_str(s).map_err(|e| ConversionsError::ParseError(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransformationConfig {
    #[serde(default)]
    pub target_template: String,
    /// Target parameter name → rule. Must be present, even if empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<IndexMap<String, ParameterRuleConfig>>,
}

/// Loosely-typed parameter rule as written in a config document. Turned into
/// a [`ParameterRule`] during construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParameterRuleConfig {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub add_if_missing: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub add_language_template: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_parameters: Option<SourceParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A parameter is addressed by name or by its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterKey {
    Position(u32),
    Name(String),
}

impl ParameterKey {
    fn into_key(self) -> String {
        match self {
            Self::Position(n) => n.to_string(),
            Self::Name(name) => name.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceParameters {
    One(ParameterKey),
    Many(Vec<ParameterKey>),
}

impl SourceParameters {
    fn into_keys(self) -> Vec<String> {
        match self {
            Self::One(key) => vec![key.into_key()],
            Self::Many(keys) => keys.into_iter().map(ParameterKey::into_key).collect(),
        }
    }
}

/// What to do with one target parameter of a transferred template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterRule {
    /// Any of `sources` (names or positions) is renamed to the target name.
    Rename {
        sources: Vec<String>,
        add_language_template: bool,
    },
    /// The target parameter is inserted with `value` if the invocation
    /// doesn't already have it.
    AddIfMissing { value: String },
}

impl ParameterRule {
    fn from_config(
        template: &str,
        parameter: &str,
        config: ParameterRuleConfig,
    ) -> Result<Self, ConversionsError> {
        if config.add_if_missing {
            if config.source_parameters.is_some() {
                return Err(ConversionsError::ConflictingParameterRule {
                    template: template.to_string(),
                    parameter: parameter.to_string(),
                });
            }
            let value = config.value.ok_or_else(|| ConversionsError::MissingValue {
                template: template.to_string(),
                parameter: parameter.to_string(),
            })?;
            return Ok(Self::AddIfMissing { value });
        }
        Ok(Self::Rename {
            sources: config
                .source_parameters
                .map(SourceParameters::into_keys)
                .unwrap_or_default(),
            add_language_template: config.add_language_template,
        })
    }
}

/// Where a source parameter ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParameter {
    pub target: String,
    pub add_language_template: bool,
}

#[derive(Debug, Clone)]
pub struct TemplateTransformation {
    pub target_template: String,
    /// Source name/position → target, fanned out from the rename rules.
    sources: IndexMap<String, TemplateParameter>,
    /// Target name → literal value, from the add-if-missing rules.
    required: IndexMap<String, String>,
}

impl TemplateTransformation {
    fn from_config(template: &str, config: TransformationConfig) -> Result<Self, ConversionsError> {
        let target_template = config.target_template.trim().to_string();
        if target_template.is_empty() {
            return Err(ConversionsError::MissingTargetTemplate {
                template: template.to_string(),
            });
        }
        let raw_parameters = config
            .parameters
            .ok_or_else(|| ConversionsError::MissingParameters {
                template: template.to_string(),
            })?;

        let mut sources = IndexMap::new();
        let mut required = IndexMap::new();
        for (target, raw) in raw_parameters {
            let target = target.trim().to_string();
            match ParameterRule::from_config(template, &target, raw)? {
                ParameterRule::Rename {
                    sources: names,
                    add_language_template,
                } => {
                    for source in names {
                        sources.insert(
                            source,
                            TemplateParameter {
                                target: target.clone(),
                                add_language_template,
                            },
                        );
                    }
                }
                ParameterRule::AddIfMissing { value } => {
                    required.insert(target, value);
                }
            }
        }

        Ok(Self {
            target_template,
            sources,
            required,
        })
    }
}

/// Counts of each rule family, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionsStats {
    pub required_templates: usize,
    pub forbidden_templates: usize,
    pub forbidden_categories: usize,
    pub obsolete_templates: usize,
    pub template_transformations: usize,
    pub heading_replacements: usize,
}

#[derive(Debug, Clone, Default)]
pub struct WikitextConversions {
    required_templates: HashSet<String>,
    forbidden_templates: HashSet<String>,
    forbidden_categories: HashSet<String>,
    obsolete_templates: HashSet<String>,
    template_transformations: HashMap<String, TemplateTransformation>,
    heading_replacements: HashMap<String, String>,
}

impl WikitextConversions {
    /// Build the ruleset, validating every transfer rule up front.
    pub fn new(config: ConversionsConfig) -> Result<Self, ConversionsError> {
        let template_transformations = config
            .template_transformations
            .into_iter()
            .map(|(source, raw)| -> Result<_, ConversionsError> {
                let transformation = TemplateTransformation::from_config(&source, raw)?;
                Ok((normalize(&source), transformation))
            })
            .collect::<Result<HashMap<_, _>, ConversionsError>>()?;

        Ok(Self {
            required_templates: normalize_all(&config.required_templates),
            forbidden_templates: normalize_all(&config.forbidden_templates),
            forbidden_categories: normalize_all(&config.forbidden_categories),
            obsolete_templates: normalize_all(&config.obsolete_templates),
            template_transformations,
            heading_replacements: config.heading_replacements.into_iter().collect(),
        })
    }

    pub fn has_good_templates(&self) -> bool {
        !self.required_templates.is_empty()
    }

    pub fn is_template_good(&self, template: &str) -> bool {
        self.required_templates
            .contains(&normalize_without_namespace(template))
    }

    pub fn is_template_bad(&self, template: &str) -> bool {
        self.forbidden_templates
            .contains(&normalize_without_namespace(template))
    }

    pub fn is_category_bad(&self, category: &str) -> bool {
        self.forbidden_categories
            .contains(&normalize_without_namespace(category))
    }

    /// Unlike the good/bad checks, a namespace prefix is part of the key here.
    pub fn is_obsolete_template(&self, template: &str) -> bool {
        self.obsolete_templates.contains(&normalize(template))
    }

    /// The replacement name for a template with a transfer rule.
    pub fn swap_template(&self, template: &str) -> Option<&str> {
        self.transformation(template)
            .map(|t| t.target_template.as_str())
    }

    pub fn transformation(&self, template: &str) -> Option<&TemplateTransformation> {
        self.template_transformations.get(&normalize(template))
    }

    /// Source parameter name or position → target, for every rename rule of
    /// the template.
    pub fn template_parameters(&self, template: &str) -> Option<&IndexMap<String, TemplateParameter>> {
        self.transformation(template)
            .map(|t| &t.sources)
            .filter(|sources| !sources.is_empty())
    }

    /// Target parameter → literal value, for every add-if-missing rule.
    pub fn required_template_parameters(&self, template: &str) -> Option<&IndexMap<String, String>> {
        self.transformation(template)
            .map(|t| &t.required)
            .filter(|required| !required.is_empty())
    }

    /// Exact-match heading replacement; the input is returned when no rule
    /// applies.
    pub fn swap_heading<'a>(&'a self, heading: &'a str) -> &'a str {
        self.heading_replacements
            .get(heading)
            .map(String::as_str)
            .unwrap_or(heading)
    }

    pub fn is_empty(&self) -> bool {
        self.stats() == ConversionsStats::default()
    }

    pub fn stats(&self) -> ConversionsStats {
        ConversionsStats {
            required_templates: self.required_templates.len(),
            forbidden_templates: self.forbidden_templates.len(),
            forbidden_categories: self.forbidden_categories.len(),
            obsolete_templates: self.obsolete_templates.len(),
            template_transformations: self.template_transformations.len(),
            heading_replacements: self.heading_replacements.len(),
        }
    }
}

fn normalize_all(names: &[String]) -> HashSet<String> {
    names.iter().map(|name| normalize(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rename(sources: &[&str], add_language_template: bool) -> ParameterRuleConfig {
        ParameterRuleConfig {
            add_language_template,
            source_parameters: Some(SourceParameters::Many(
                sources
                    .iter()
                    .map(|s| ParameterKey::Name(s.to_string()))
                    .collect(),
            )),
            ..Default::default()
        }
    }

    fn add_if_missing(value: &str) -> ParameterRuleConfig {
        ParameterRuleConfig {
            add_if_missing: true,
            value: Some(value.to_string()),
            ..Default::default()
        }
    }

    fn transfer(
        target: &str,
        parameters: Vec<(&str, ParameterRuleConfig)>,
    ) -> TransformationConfig {
        TransformationConfig {
            target_template: target.to_string(),
            parameters: Some(
                parameters
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            ),
        }
    }

    fn conversions_with_transfer(source: &str, config: TransformationConfig) -> WikitextConversions {
        let mut cfg = ConversionsConfig::default();
        cfg.template_transformations.insert(source.to_string(), config);
        WikitextConversions::new(cfg).unwrap()
    }

    #[test]
    fn test_good_template_case_insensitive() {
        let conversions = WikitextConversions::new(ConversionsConfig {
            required_templates: vec!["Info".to_string()],
            ..Default::default()
        })
        .unwrap();
        assert!(conversions.has_good_templates());
        assert!(conversions.is_template_good("Info"));
        assert!(conversions.is_template_good("info"));
        assert!(conversions.is_template_good("INFO"));
        assert!(!conversions.is_template_good("Information"));
    }

    #[test]
    fn test_bad_template_namespace_prefix_equivalence() {
        let conversions = WikitextConversions::new(ConversionsConfig {
            forbidden_templates: vec!["Bad".to_string()],
            ..Default::default()
        })
        .unwrap();
        assert!(conversions.is_template_bad("Bad"));
        assert!(conversions.is_template_bad("Vorlage:Bad"));
        assert!(conversions.is_template_bad("Template:bad"));
        assert!(!conversions.is_template_good("Bad"));
        assert!(!conversions.has_good_templates());
    }

    #[test]
    fn test_bad_category_underscores() {
        let conversions = WikitextConversions::new(ConversionsConfig {
            forbidden_categories: vec!["Fair use images".to_string()],
            ..Default::default()
        })
        .unwrap();
        assert!(conversions.is_category_bad("Kategorie:Fair_use_images"));
        assert!(conversions.is_category_bad("fair use images"));
        assert!(!conversions.is_category_bad("Fair use"));
    }

    #[test]
    fn test_obsolete_template_keeps_prefix() {
        let conversions = WikitextConversions::new(ConversionsConfig {
            obsolete_templates: vec!["MoveToCommons".to_string()],
            ..Default::default()
        })
        .unwrap();
        assert!(conversions.is_obsolete_template("movetocommons"));
        assert!(conversions.is_obsolete_template(" MOVETOCOMMONS "));
        assert!(!conversions.is_obsolete_template("Vorlage:MoveToCommons"));
    }

    #[test]
    fn test_swap_template() {
        let conversions = conversions_with_transfer("Info", transfer("Information", vec![]));
        assert_eq!(conversions.swap_template("info"), Some("Information"));
        assert_eq!(conversions.swap_template("Template:Info"), None);
        assert_eq!(conversions.swap_template("Other"), None);
    }

    #[test]
    fn test_template_parameters_fan_out() {
        let conversions = conversions_with_transfer(
            "Info",
            transfer(
                "Information",
                vec![
                    ("description", rename(&["Beschreibung", "1"], true)),
                    ("source", rename(&["Quelle"], false)),
                ],
            ),
        );
        let params = conversions.template_parameters("Info").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(
            params["Beschreibung"],
            TemplateParameter {
                target: "description".to_string(),
                add_language_template: true,
            }
        );
        assert_eq!(params["1"].target, "description");
        assert!(!params["Quelle"].add_language_template);
        assert!(conversions.required_template_parameters("Info").is_none());
    }

    #[test]
    fn test_required_template_parameters() {
        let conversions = conversions_with_transfer(
            "Bild-GFDL-Neu",
            transfer("GFDL", vec![("migration", add_if_missing("not-eligible"))]),
        );
        let required = conversions
            .required_template_parameters("bild-gfdl-neu")
            .unwrap();
        assert_eq!(required.get("migration").map(String::as_str), Some("not-eligible"));
        assert!(conversions.template_parameters("Bild-GFDL-Neu").is_none());
    }

    #[test]
    fn test_missing_target_template_fails_construction() {
        let mut cfg = ConversionsConfig::default();
        cfg.template_transformations
            .insert("Info".to_string(), transfer("  ", vec![]));
        assert_eq!(
            WikitextConversions::new(cfg).unwrap_err(),
            ConversionsError::MissingTargetTemplate {
                template: "Info".to_string()
            }
        );
    }

    #[test]
    fn test_missing_parameters_fails_construction() {
        let mut cfg = ConversionsConfig::default();
        cfg.template_transformations.insert(
            "Info".to_string(),
            TransformationConfig {
                target_template: "Information".to_string(),
                parameters: None,
            },
        );
        assert!(matches!(
            WikitextConversions::new(cfg),
            Err(ConversionsError::MissingParameters { .. })
        ));
    }

    #[test]
    fn test_conflicting_parameter_rule_rejected() {
        let mut conflicting = rename(&["x"], false);
        conflicting.add_if_missing = true;
        conflicting.value = Some("v".to_string());
        let mut cfg = ConversionsConfig::default();
        cfg.template_transformations.insert(
            "Info".to_string(),
            transfer("Information", vec![("param", conflicting)]),
        );
        assert!(matches!(
            WikitextConversions::new(cfg),
            Err(ConversionsError::ConflictingParameterRule { .. })
        ));
    }

    #[test]
    fn test_add_if_missing_without_value_rejected() {
        let mut cfg = ConversionsConfig::default();
        cfg.template_transformations.insert(
            "Info".to_string(),
            transfer(
                "Information",
                vec![(
                    "param",
                    ParameterRuleConfig {
                        add_if_missing: true,
                        ..Default::default()
                    },
                )],
            ),
        );
        assert!(matches!(
            WikitextConversions::new(cfg),
            Err(ConversionsError::MissingValue { .. })
        ));
    }

    #[test]
    fn test_swap_heading_exact() {
        let mut cfg = ConversionsConfig::default();
        cfg.heading_replacements
            .insert("Beschreibung".to_string(), "{{int:filedesc}}".to_string());
        let conversions = WikitextConversions::new(cfg).unwrap();
        assert_eq!(conversions.swap_heading("Beschreibung"), "{{int:filedesc}}");
        assert_eq!(conversions.swap_heading("beschreibung"), "beschreibung");
        assert_eq!(conversions.swap_heading(" Beschreibung"), " Beschreibung");
    }

    #[test]
    fn test_from_json_mixed_source_parameters() {
        let json = r#"{
            "requiredTemplates": ["Information"],
            "templateTransformations": {
                "Info": {
                    "targetTemplate": "Information",
                    "parameters": {
                        "description": { "sourceParameters": ["desc", 1], "addLanguageTemplate": true },
                        "author": { "sourceParameters": "Urheber" },
                        "date": { "sourceParameters": 2 },
                        "migration": { "addIfMissing": true, "value": "relicense" }
                    }
                }
            }
        }"#;
        let conversions = WikitextConversions::new(ConversionsConfig::from_json(json).unwrap()).unwrap();
        let params = conversions.template_parameters("Info").unwrap();
        assert_eq!(params["desc"].target, "description");
        assert_eq!(params["1"].target, "description");
        assert_eq!(params["Urheber"].target, "author");
        assert_eq!(params["2"].target, "date");
        assert_eq!(
            conversions.stats(),
            ConversionsStats {
                required_templates: 1,
                template_transformations: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
obsoleteTemplates = ["NowCommons"]

[templateTransformations.Info]
targetTemplate = "Information"

[templateTransformations.Info.parameters.source]
sourceParameters = "Quelle"
"#;
        let conversions = WikitextConversions::new(ConversionsConfig::from_toml(toml).unwrap()).unwrap();
        assert!(conversions.is_obsolete_template("nowcommons"));
        assert_eq!(conversions.template_parameters("Info").unwrap()["Quelle"].target, "source");
    }

    #[test]
    fn test_from_json_unknown_field_rejected() {
        assert!(matches!(
            ConversionsConfig::from_json(r#"{"bogus": []}"#),
            Err(ConversionsError::ParseError(_))
        ));
    }

    #[test]
    fn test_empty_conversions() {
        let conversions = WikitextConversions::new(ConversionsConfig::default()).unwrap();
        assert!(conversions.is_empty());
        assert!(!conversions.has_good_templates());
        assert_eq!(conversions.swap_heading("Anything"), "Anything");
    }
}

//! Reads the import ruleset from a CommonsHelper configuration page.
//!
//! The page is plain wikitext authored by humans, split into fixed
//! sections:
//!
//! ```text
//! == Categories ==
//! === Bad ===
//! == Templates ==
//! === Good === / === Bad === / === Remove === / === Transfer ===
//! == Information ==
//! === Description === / === Licensing ===
//! ```
//!
//! Every section must be present, even if empty.

use fi_domain::{
    ConversionsConfig, ConversionsError, LocalizedMessage, ParameterKey, ParameterRuleConfig,
    SourceParameters, TransformationConfig, WikitextConversions,
};
use indexmap::IndexMap;
use std::sync::OnceLock;
use url::Url;

const DESCRIPTION_HEADING: &str = "{{int:filedesc}}";
const LICENSING_HEADING: &str = "{{int:license-header}}";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigParseError {
    #[error("failed to parse the CommonsHelper configuration at {url}: section \"{section}\" is missing")]
    MissingSection { url: String, section: String },
    #[error("cannot derive a CommonsHelper configuration page from {0}")]
    InvalidSourceUrl(String),
    #[error(transparent)]
    Conversions(#[from] ConversionsError),
}

impl LocalizedMessage for ConfigParseError {
    fn key(&self) -> &'static str {
        match self {
            Self::MissingSection { .. } => "fileimporter-commonshelper-parsing-failed",
            Self::InvalidSourceUrl(_) => "fileimporter-cantparseurl",
            Self::Conversions(_) => "fileimporter-commonshelper-invalid-rule",
        }
    }

    fn params(&self) -> Vec<String> {
        match self {
            Self::MissingSection { url, section } => vec![url.clone(), section.clone()],
            Self::InvalidSourceUrl(url) => vec![url.clone()],
            Self::Conversions(e) => vec![e.to_string()],
        }
    }
}

/// Title of the CommonsHelper data page for a source wiki, e.g.
/// `https://de.m.wikipedia.org/wiki/Datei:X.jpg` →
/// `Extension:FileImporter/Data/de.wikipedia`.
pub fn config_page_title(source: &Url) -> Result<String, ConfigParseError> {
    let invalid = || ConfigParseError::InvalidSourceUrl(source.to_string());
    let host = source.host_str().ok_or_else(invalid)?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut labels: Vec<&str> = host.split('.').filter(|label| !label.is_empty()).collect();
    // Mobile hosts carry an extra `m` label before the domain.
    if labels.len() > 2 {
        if let Some(pos) = labels[..labels.len() - 2].iter().rposition(|l| *l == "m") {
            labels.remove(pos);
        }
    } else if labels.first() == Some(&"m") {
        labels.remove(0);
    }
    if labels.len() < 2 {
        return Err(invalid());
    }
    labels.pop();
    Ok(format!("Extension:FileImporter/Data/{}", labels.join(".")))
}

pub struct CommonsHelperConfigParser {
    config_url: String,
    wikitext: String,
}

impl CommonsHelperConfigParser {
    /// `config_url` only names the page in error messages.
    pub fn new(config_url: impl Into<String>, wikitext: &str) -> Self {
        Self {
            config_url: config_url.into(),
            wikitext: strip_comments(&wikitext.replace("\r\n", "\n")),
        }
    }

    pub fn parse(&self) -> Result<WikitextConversions, ConfigParseError> {
        let config = self.parse_config()?;
        let conversions = WikitextConversions::new(config)?;
        tracing::info!(
            url = %self.config_url,
            stats = ?conversions.stats(),
            "parsed CommonsHelper configuration"
        );
        Ok(conversions)
    }

    /// Extract the raw rules without validating the transfer rules.
    pub fn parse_config(&self) -> Result<ConversionsConfig, ConfigParseError> {
        let categories = self.section(&self.wikitext, "Categories", 2)?;
        let bad_categories = self.section(categories, "Bad", 3)?;

        let templates = self.section(&self.wikitext, "Templates", 2)?;
        let good_templates = self.section(templates, "Good", 3)?;
        let bad_templates = self.section(templates, "Bad", 3)?;
        let obsolete_templates = self.section(templates, "Remove", 3)?;
        let transfers = self.section(templates, "Transfer", 3)?;

        let information = self.section(&self.wikitext, "Information", 2)?;
        let description = self.section(information, "Description", 3)?;
        let licensing = self.section(information, "Licensing", 3)?;

        let mut heading_replacements = IndexMap::new();
        for heading in list_items(description) {
            heading_replacements.insert(heading, DESCRIPTION_HEADING.to_string());
        }
        for heading in list_items(licensing) {
            heading_replacements.insert(heading, LICENSING_HEADING.to_string());
        }

        Ok(ConversionsConfig {
            required_templates: list_items(good_templates),
            forbidden_templates: list_items(bad_templates),
            forbidden_categories: list_items(bad_categories),
            obsolete_templates: list_items(obsolete_templates),
            template_transformations: parse_transfers(transfers),
            heading_replacements,
        })
    }

    fn section<'t>(&self, text: &'t str, name: &str, level: usize) -> Result<&'t str, ConfigParseError> {
        find_section(text, name, level).ok_or_else(|| ConfigParseError::MissingSection {
            url: self.config_url.clone(),
            section: name.to_string(),
        })
    }
}

/// Remove `<!-- ... -->`; an unclosed comment runs to the end of the text.
fn strip_comments(text: &str) -> String {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = RE.get_or_init(|| regex::Regex::new(r"(?s)<!--.*?(?:-->|\z)").expect("known-valid regex"));
    re.replace_all(text, "").into_owned()
}

/// Level and text of a heading line such as `== Foo ==`.
fn heading(line: &str) -> Option<(usize, &str)> {
    let line = line.trim_end_matches([' ', '\t']);
    let inner = line.trim_start_matches('=');
    let open = line.len() - inner.len();
    let inner = inner.trim_end_matches('=');
    let close = line.len() - open - inner.len();
    (open > 0 && open == close).then(|| (open, inner.trim_matches([' ', '\t'])))
}

fn leading_equals(line: &str) -> usize {
    line.len() - line.trim_start_matches('=').len()
}

/// Body of the first section with the given heading text and level, ending
/// at the next heading of the same or a higher level.
fn find_section<'t>(text: &'t str, name: &str, level: usize) -> Option<&'t str> {
    let mut body_start = None;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches('\n');
        match body_start {
            None if heading(content) == Some((level, name)) => {
                body_start = Some(offset + line.len());
            }
            None => {}
            Some(start) => {
                if (1..=level).contains(&leading_equals(content)) {
                    return Some(&text[start..offset]);
                }
            }
        }
        offset += line.len();
    }
    body_start.map(|start| &text[start..])
}

/// `* item` lines, trimmed. Items starting with a list or definition marker
/// are sub-items and ignored.
fn list_items(section: &str) -> Vec<String> {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        regex::Regex::new(r"(?m)^\*[ \t]*([^\s*#:;].*?)[ \t]*$").expect("known-valid regex")
    });
    re.captures_iter(section)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parse the definition list of the `Transfer` section:
///
/// ```text
/// ;Source template
/// :Target template|target=source|+added=value
/// |@wrapped=source
/// ```
fn parse_transfers(section: &str) -> IndexMap<String, TransformationConfig> {
    let mut transfers = IndexMap::new();
    let mut source: Option<String> = None;
    let mut current: Option<(String, String, String)> = None;

    let mut flush = |current: &mut Option<(String, String, String)>| {
        if let Some((source, target, parameters)) = current.take() {
            let config = TransformationConfig {
                target_template: target,
                parameters: Some(parse_transfer_parameters(&source, &parameters)),
            };
            if transfers.insert(source.clone(), config).is_some() {
                tracing::warn!(template = %source, "duplicate transfer rule, the later one wins");
            }
        }
    };

    for line in section.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(';') {
            flush(&mut current);
            match rest.split_once(':') {
                Some((name, target_line)) => {
                    current = Some(split_target_line(name, target_line));
                    source = None;
                }
                None => source = Some(rest.trim().to_string()),
            }
        } else if let Some(rest) = line.strip_prefix(':') {
            flush(&mut current);
            if let Some(name) = source.take() {
                current = Some(split_target_line(&name, rest));
            }
        } else if line.starts_with('|') {
            match current.as_mut() {
                Some((_, _, parameters)) => parameters.push_str(line),
                None => tracing::debug!(line, "parameter line outside of a transfer rule"),
            }
        } else if !line.is_empty() {
            flush(&mut current);
            source = None;
        }
    }
    flush(&mut current);
    transfers
}

fn split_target_line(source: &str, target_line: &str) -> (String, String, String) {
    let (target, parameters) = match target_line.find('|') {
        Some(pos) => target_line.split_at(pos),
        None => (target_line, ""),
    };
    (
        source.trim().to_string(),
        target.trim().to_string(),
        parameters.to_string(),
    )
}

/// Parse `|target=source|+target=value|@target=source` fragments. A fragment
/// without `=` keeps its name.
fn parse_transfer_parameters(template: &str, fragments: &str) -> IndexMap<String, ParameterRuleConfig> {
    let mut parameters: IndexMap<String, ParameterRuleConfig> = IndexMap::new();
    for fragment in fragments.split('|').map(str::trim).filter(|f| !f.is_empty()) {
        let name_start = fragment.trim_start_matches(['+', '@', ' ', '\t']);
        let flags = &fragment[..fragment.len() - name_start.len()];
        let (target, source) = match name_start.split_once('=') {
            Some((target, source)) => (target.trim(), source.trim()),
            None => (name_start.trim(), name_start.trim()),
        };
        if target.is_empty() {
            continue;
        }
        if source.contains('%') {
            tracing::debug!(template, parameter = target, source, "skipping magic word");
            continue;
        }

        let rule = parameters.entry(target.to_string()).or_default();
        if flags.contains('@') {
            rule.add_language_template = true;
        }
        if flags.contains('+') {
            rule.add_if_missing = true;
            rule.value = Some(source.to_string());
            continue;
        }
        let key = match source.parse::<u32>() {
            Ok(position) => ParameterKey::Position(position),
            Err(_) => ParameterKey::Name(source.to_string()),
        };
        rule.source_parameters = Some(match rule.source_parameters.take() {
            None => SourceParameters::One(key),
            Some(SourceParameters::One(first)) => SourceParameters::Many(vec![first, key]),
            Some(SourceParameters::Many(mut keys)) => {
                keys.push(key);
                SourceParameters::Many(keys)
            }
        });
    }
    parameters
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "\
== Categories ==
=== Bad ===
* Unknown license
* Copyvio <!-- speedy deletion -->

== Templates ==
=== Good ===
* Information
=== Bad ===
* Löschantrag
=== Remove ===
* MoveToCommons
** not an item
* NowCommons
=== Transfer ===
;Bild-GFDL-Neu
:GFDL|+migration=not-eligible
;Information
:Information
|@description=Beschreibung
|source=Quelle
|date=Datum|author=Urheber|author=Fotograf
|permission=%PERMISSION%
;Self:Self|1|2

== Information ==
=== Description ===
* Beschreibung
=== Licensing ===
* Lizenz
";

    fn parser(text: &str) -> CommonsHelperConfigParser {
        CommonsHelperConfigParser::new("https://www.mediawiki.org/wiki/Extension:FileImporter/Data/de.wikipedia", text)
    }

    #[test]
    fn test_parse_lists() {
        let config = parser(CONFIG).parse_config().unwrap();
        assert_eq!(config.forbidden_categories, vec!["Unknown license", "Copyvio"]);
        assert_eq!(config.required_templates, vec!["Information"]);
        assert_eq!(config.forbidden_templates, vec!["Löschantrag"]);
        assert_eq!(config.obsolete_templates, vec!["MoveToCommons", "NowCommons"]);
    }

    #[test]
    fn test_parse_headings() {
        let config = parser(CONFIG).parse_config().unwrap();
        assert_eq!(config.heading_replacements["Beschreibung"], "{{int:filedesc}}");
        assert_eq!(config.heading_replacements["Lizenz"], "{{int:license-header}}");
    }

    #[test]
    fn test_parse_transfer_rules() {
        let conversions = parser(CONFIG).parse().unwrap();
        assert_eq!(conversions.swap_template("Bild-GFDL-Neu"), Some("GFDL"));
        assert_eq!(conversions.swap_template("Self"), Some("Self"));

        let required = conversions.required_template_parameters("Bild-GFDL-Neu").unwrap();
        assert_eq!(required["migration"], "not-eligible");

        let params = conversions.template_parameters("Information").unwrap();
        assert_eq!(params["Beschreibung"].target, "description");
        assert!(params["Beschreibung"].add_language_template);
        assert_eq!(params["Quelle"].target, "source");
        assert!(!params["Quelle"].add_language_template);
        assert_eq!(params["Urheber"].target, "author");
        assert_eq!(params["Fotograf"].target, "author");
        assert!(!params.values().any(|p| p.target == "permission"));

        let positional = conversions.template_parameters("Self").unwrap();
        assert_eq!(positional["1"].target, "1");
        assert_eq!(positional["2"].target, "2");
    }

    #[test]
    fn test_transfer_without_parameters() {
        let transfers = parse_transfers(";Foo\n:Bar\n");
        assert_eq!(transfers["Foo"].target_template, "Bar");
        assert!(transfers["Foo"].parameters.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_transfer_later_wins() {
        let transfers = parse_transfers(";Foo\n:Bar\n;Foo\n:Baz\n");
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers["Foo"].target_template, "Baz");
    }

    #[test]
    fn test_source_without_target_is_ignored() {
        let transfers = parse_transfers(";Foo\nsome text\n:Bar\n");
        assert!(transfers.is_empty());
    }

    #[test]
    fn test_conflicting_parameter_rule_fails() {
        let text = CONFIG.replace(":GFDL|+migration=not-eligible", ":GFDL|+migration=x|migration=old");
        let err = parser(&text).parse().unwrap_err();
        assert!(matches!(
            err,
            ConfigParseError::Conversions(ConversionsError::ConflictingParameterRule { .. })
        ));
        assert_eq!(err.key(), "fileimporter-commonshelper-invalid-rule");
    }

    #[test]
    fn test_missing_section() {
        let text = CONFIG.replace("=== Remove ===", "=== Removed ===");
        let err = parser(&text).parse().unwrap_err();
        assert_eq!(
            err,
            ConfigParseError::MissingSection {
                url: "https://www.mediawiki.org/wiki/Extension:FileImporter/Data/de.wikipedia".to_string(),
                section: "Remove".to_string(),
            }
        );
        assert_eq!(err.key(), "fileimporter-commonshelper-parsing-failed");
        assert_eq!(err.params()[1], "Remove");
    }

    #[test]
    fn test_section_level_is_exact() {
        let text = CONFIG.replace("== Information ==", "=== Information ===");
        assert!(matches!(
            parser(&text).parse_config(),
            Err(ConfigParseError::MissingSection { section, .. }) if section == "Information"
        ));
    }

    #[test]
    fn test_commented_out_section_is_missing() {
        let text = CONFIG.replace("=== Good ===", "<!-- === Good === -->");
        assert!(matches!(
            parser(&text).parse_config(),
            Err(ConfigParseError::MissingSection { section, .. }) if section == "Good"
        ));
    }

    #[test]
    fn test_headers_without_spaces() {
        let text = CONFIG.replace("== Templates ==", "==Templates==").replace("=== Good ===", "===Good===");
        let config = parser(&text).parse_config().unwrap();
        assert_eq!(config.required_templates, vec!["Information"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let config = parser(&CONFIG.replace('\n', "\r\n")).parse_config().unwrap();
        assert_eq!(config.obsolete_templates, vec!["MoveToCommons", "NowCommons"]);
        assert_eq!(config.template_transformations["Information"].target_template, "Information");
    }

    #[test]
    fn test_section_ends_at_higher_level() {
        let text = "== A ==\n=== B ===\n* one\n== C ==\n* two\n";
        assert_eq!(find_section(text, "B", 3), Some("* one\n"));
        assert_eq!(find_section(text, "A", 2), Some("=== B ===\n* one\n"));
        assert_eq!(find_section(text, "C", 2), Some("* two\n"));
        assert_eq!(find_section(text, "B", 2), None);
    }

    #[test]
    fn test_heading_line() {
        assert_eq!(heading("== Foo =="), Some((2, "Foo")));
        assert_eq!(heading("===Foo===  "), Some((3, "Foo")));
        assert_eq!(heading("== Foo ==="), None);
        assert_eq!(heading("Foo"), None);
    }

    #[test]
    fn test_config_page_title() {
        let title = |url: &str| config_page_title(&Url::parse(url).unwrap());
        assert_eq!(
            title("https://de.wikipedia.org/wiki/Datei:X.jpg").unwrap(),
            "Extension:FileImporter/Data/de.wikipedia"
        );
        assert_eq!(
            title("https://de.m.wikipedia.org/wiki/Datei:X.jpg").unwrap(),
            "Extension:FileImporter/Data/de.wikipedia"
        );
        assert_eq!(
            title("https://www.Example.com/File:X.jpg").unwrap(),
            "Extension:FileImporter/Data/example"
        );
        assert!(matches!(
            title("http://localhost/File:X.jpg"),
            Err(ConfigParseError::InvalidSourceUrl(_))
        ));
        assert!(matches!(
            title("data:text/plain,x"),
            Err(ConfigParseError::InvalidSourceUrl(_))
        ));
    }
}

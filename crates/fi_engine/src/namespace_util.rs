//! Namespace names and title parsing for link rewriting.
//!
//! Handles:
//! - Language-specific namespace name tables (localized names and aliases).
//! - Underscore/space normalization (MediaWiki treats them identically).
//! - Parsing link targets into interwiki prefix, namespace and page name.
//!
//! The built-in tables cover the languages most files are imported from; a
//! production setup extends them with the names reported by siteinfo.

use fi_domain::Namespace;
use std::collections::{HashMap, HashSet};

/// Canonical names plus the aliases every wiki understands.
const CANONICAL_NAMES: &[(&str, Namespace)] = &[
    ("media", Namespace::MEDIA),
    ("special", Namespace::SPECIAL),
    ("talk", Namespace::TALK),
    ("user", Namespace::USER),
    ("user talk", Namespace::USER_TALK),
    ("project", Namespace::PROJECT),
    ("project talk", Namespace::PROJECT_TALK),
    ("file", Namespace::FILE),
    ("image", Namespace::FILE), // alias
    ("file talk", Namespace::FILE_TALK),
    ("image talk", Namespace::FILE_TALK), // alias
    ("mediawiki", Namespace::MEDIAWIKI),
    ("mediawiki talk", Namespace::MEDIAWIKI_TALK),
    ("template", Namespace::TEMPLATE),
    ("template talk", Namespace::TEMPLATE_TALK),
    ("help", Namespace::HELP),
    ("help talk", Namespace::HELP_TALK),
    ("category", Namespace::CATEGORY),
    ("category talk", Namespace::CATEGORY_TALK),
];

const ENGLISH_NAMES: &[(&str, Namespace)] = &[
    ("wikipedia", Namespace::PROJECT),
    ("wikipedia talk", Namespace::PROJECT_TALK),
];

const GERMAN_NAMES: &[(&str, Namespace)] = &[
    ("medium", Namespace::MEDIA),
    ("spezial", Namespace::SPECIAL),
    ("diskussion", Namespace::TALK),
    ("benutzer", Namespace::USER),
    ("benutzerin", Namespace::USER), // alias
    ("benutzer diskussion", Namespace::USER_TALK),
    ("benutzerin diskussion", Namespace::USER_TALK), // alias
    ("wikipedia", Namespace::PROJECT),
    ("wikipedia diskussion", Namespace::PROJECT_TALK),
    ("datei", Namespace::FILE),
    ("bild", Namespace::FILE), // alias
    ("datei diskussion", Namespace::FILE_TALK),
    ("bild diskussion", Namespace::FILE_TALK), // alias
    ("mediawiki diskussion", Namespace::MEDIAWIKI_TALK),
    ("vorlage", Namespace::TEMPLATE),
    ("vorlage diskussion", Namespace::TEMPLATE_TALK),
    ("hilfe", Namespace::HELP),
    ("hilfe diskussion", Namespace::HELP_TALK),
    ("kategorie", Namespace::CATEGORY),
    ("kategorie diskussion", Namespace::CATEGORY_TALK),
];

const FRENCH_NAMES: &[(&str, Namespace)] = &[
    ("média", Namespace::MEDIA),
    ("spécial", Namespace::SPECIAL),
    ("discussion", Namespace::TALK),
    ("utilisateur", Namespace::USER),
    ("utilisatrice", Namespace::USER), // alias
    ("discussion utilisateur", Namespace::USER_TALK),
    ("discussion utilisatrice", Namespace::USER_TALK), // alias
    ("wikipédia", Namespace::PROJECT),
    ("discussion wikipédia", Namespace::PROJECT_TALK),
    ("fichier", Namespace::FILE),
    ("discussion fichier", Namespace::FILE_TALK),
    ("discussion mediawiki", Namespace::MEDIAWIKI_TALK),
    ("modèle", Namespace::TEMPLATE),
    ("discussion modèle", Namespace::TEMPLATE_TALK),
    ("aide", Namespace::HELP),
    ("discussion aide", Namespace::HELP_TALK),
    ("catégorie", Namespace::CATEGORY),
    ("discussion catégorie", Namespace::CATEGORY_TALK),
];

/// Normalize a namespace or interwiki prefix: underscores and runs of
/// whitespace become single spaces, surrounding whitespace is dropped and the
/// result is lowercased.
pub fn normalize_prefix(prefix: &str) -> String {
    prefix
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lookup from namespace names (any case, spaces or underscores) to ids.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    names: HashMap<String, Namespace>,
}

impl NamespaceTable {
    /// The canonical English names every wiki accepts.
    pub fn canonical() -> Self {
        Self::default().with_static(CANONICAL_NAMES)
    }

    /// Localized names and aliases of a content language. Canonical names
    /// are not included unless the language is English.
    pub fn for_language(code: &str) -> Self {
        let table = Self::default();
        match code.to_ascii_lowercase().as_str() {
            "en" => table.with_static(CANONICAL_NAMES).with_static(ENGLISH_NAMES),
            "de" => table.with_static(GERMAN_NAMES),
            "fr" => table.with_static(FRENCH_NAMES),
            other => {
                tracing::debug!(language = other, "no built-in namespace names");
                table
            }
        }
    }

    pub fn with_names<S: AsRef<str>>(mut self, names: impl IntoIterator<Item = (S, Namespace)>) -> Self {
        for (name, ns) in names {
            self.names.insert(normalize_prefix(name.as_ref()), ns);
        }
        self
    }

    fn with_static(self, names: &[(&str, Namespace)]) -> Self {
        self.with_names(names.iter().copied())
    }

    pub fn namespace_id(&self, name: &str) -> Option<Namespace> {
        self.names.get(&normalize_prefix(name)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedTitle {
    #[error("title is empty")]
    Empty,
    #[error("title contains illegal character {0:?}")]
    IllegalCharacter(char),
    #[error("title has a prefix but no page name")]
    EmptyName,
}

/// A parsed and normalized link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTitle {
    /// Lowercased interwiki prefix, if the title points to another wiki.
    pub interwiki: Option<String>,
    pub namespace: Namespace,
    pub name: String,
}

/// Parses link targets the way the target wiki would.
#[derive(Debug, Clone, Default)]
pub struct TitleParser {
    namespaces: NamespaceTable,
    interwikis: HashSet<String>,
}

impl TitleParser {
    pub fn new<S: AsRef<str>>(namespaces: NamespaceTable, interwikis: impl IntoIterator<Item = S>) -> Self {
        Self {
            namespaces,
            interwikis: interwikis
                .into_iter()
                .map(|prefix| normalize_prefix(prefix.as_ref()))
                .filter(|prefix| !prefix.is_empty())
                .collect(),
        }
    }

    /// Parse a link target.
    ///
    /// - A single leading colon is ignored.
    /// - Anything after `#` is a fragment and ignored.
    /// - The first recognized prefix decides: a known interwiki ends parsing
    ///   (the rest belongs to the other wiki), a known namespace is resolved.
    /// - Unknown prefixes stay part of a main-namespace name.
    pub fn parse(&self, raw: &str) -> Result<ParsedTitle, MalformedTitle> {
        let normalized = raw.replace('_', " ");
        let mut text = normalized.trim();
        if let Some(rest) = text.strip_prefix(':') {
            text = rest.trim_start();
        }
        if text.is_empty() {
            return Err(MalformedTitle::Empty);
        }
        if let Some(c) = text
            .chars()
            .find(|c| matches!(c, '[' | ']' | '{' | '}' | '<' | '>' | '|') || c.is_control())
        {
            return Err(MalformedTitle::IllegalCharacter(c));
        }
        let text = match text.split_once('#') {
            Some((title, _fragment)) => title.trim(),
            None => text,
        };

        if let Some((prefix, rest)) = text.split_once(':') {
            let prefix = normalize_prefix(prefix);
            if self.interwikis.contains(&prefix) {
                return Ok(ParsedTitle {
                    interwiki: Some(prefix),
                    namespace: Namespace::MAIN,
                    name: rest.trim().to_string(),
                });
            }
            if let Some(namespace) = self.namespaces.namespace_id(&prefix) {
                let rest = rest.trim();
                if rest.is_empty() {
                    return Err(MalformedTitle::EmptyName);
                }
                return Ok(ParsedTitle {
                    interwiki: None,
                    namespace,
                    name: normalize_first_letter(rest),
                });
            }
        }

        if text.is_empty() {
            return Err(MalformedTitle::EmptyName);
        }
        Ok(ParsedTitle {
            interwiki: None,
            namespace: Namespace::MAIN,
            name: normalize_first_letter(text),
        })
    }
}

/// Uppercase the first letter of a title (MediaWiki convention).
fn normalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            let mut result = String::with_capacity(s.len());
            result.extend(first.to_uppercase());
            result.extend(chars);
            result
        }
    }
}

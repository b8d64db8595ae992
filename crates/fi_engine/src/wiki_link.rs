//! Rewrites the targets of `[[...]]` links through a pipeline of cleaners.
//!
//! Only the link target (the text between `[[` and the first `|` or `]]`)
//! is handed to the cleaners; display text is never touched.

use crate::namespace_util::{NamespaceTable, TitleParser, normalize_prefix};
use crate::settings::ImporterSettings;
use fi_domain::Namespace;
use std::borrow::Cow;
use std::sync::OnceLock;

pub trait WikiLinkCleaner: Send + Sync {
    fn id(&self) -> &str;
    /// Return the (possibly unchanged) link target.
    fn process<'a>(&self, link: &'a str) -> Cow<'a, str>;
}

/// Ordered pipeline of [`WikiLinkCleaner`]s.
#[derive(Default)]
pub struct WikiLinkParser {
    cleaners: Vec<Box<dyn WikiLinkCleaner>>,
}

impl WikiLinkParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pipeline used for imports: namespace unlocalization (skipped for
    /// English source wikis) followed by interwiki prefixing.
    pub fn from_settings(settings: &ImporterSettings) -> Self {
        let mut parser = Self::new();
        if !settings.is_english_source() {
            parser.register(Box::new(NamespaceUnlocalizer::new(
                settings.source_namespaces(),
            )));
        }
        parser.register(Box::new(WikiLinkPrefixer::new(
            settings.interwiki_prefix.clone(),
            settings.target_title_parser(),
        )));
        parser
    }

    pub fn register(&mut self, cleaner: Box<dyn WikiLinkCleaner>) {
        self.cleaners.push(cleaner);
    }

    pub fn cleaners(&self) -> &[Box<dyn WikiLinkCleaner>] {
        &self.cleaners
    }

    pub fn parse(&self, wikitext: &str) -> String {
        self.parse_counting(wikitext).0
    }

    /// Like [`parse`](Self::parse), also returning how many link targets
    /// changed.
    pub fn parse_counting(&self, wikitext: &str) -> (String, usize) {
        static RE: OnceLock<regex::Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            regex::Regex::new(r"\[\[([^\[\]|\n\r\x0B\x0C\x{85}\x{2028}\x{2029}]+)(?:\||\]\])")
                .expect("known-valid regex")
        });

        if self.cleaners.is_empty() {
            return (wikitext.to_string(), 0);
        }

        let mut result = String::with_capacity(wikitext.len());
        let mut last_end = 0;
        let mut changed = 0;
        for caps in re.captures_iter(wikitext) {
            let Some(target) = caps.get(1) else { continue };
            let mut link = Cow::Borrowed(target.as_str());
            for cleaner in &self.cleaners {
                link = match link {
                    Cow::Borrowed(s) => cleaner.process(s),
                    Cow::Owned(s) => Cow::Owned(cleaner.process(&s).into_owned()),
                };
            }
            if link != target.as_str() {
                tracing::debug!(from = target.as_str(), to = %link, "rewrote link target");
                changed += 1;
            }
            result.push_str(&wikitext[last_end..target.start()]);
            result.push_str(&link);
            last_end = target.end();
        }
        result.push_str(&wikitext[last_end..]);
        (result, changed)
    }
}

/// Replaces a localized namespace prefix with the canonical English name,
/// e.g. `Kategorie:Foo` → `Category:Foo`.
pub struct NamespaceUnlocalizer {
    namespaces: NamespaceTable,
}

impl NamespaceUnlocalizer {
    pub fn new(namespaces: NamespaceTable) -> Self {
        Self { namespaces }
    }
}

impl WikiLinkCleaner for NamespaceUnlocalizer {
    fn id(&self) -> &str {
        "namespace_unlocalizer"
    }

    fn process<'a>(&self, link: &'a str) -> Cow<'a, str> {
        static RE: OnceLock<regex::Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            regex::Regex::new(r"^(\s*:?\s*)([^:]+?)(\s*:)").expect("known-valid regex")
        });

        let Some(caps) = re.captures(link) else {
            return Cow::Borrowed(link);
        };
        let (Some(start), Some(name), Some(end)) = (caps.get(1), caps.get(2), caps.get(3)) else {
            return Cow::Borrowed(link);
        };
        let canonical = match self.namespaces.namespace_id(name.as_str()) {
            // Project namespace names differ between wikis, they can't be
            // translated by name.
            Some(Namespace::MAIN | Namespace::PROJECT | Namespace::PROJECT_TALK) | None => {
                return Cow::Borrowed(link);
            }
            Some(ns) => match ns.canonical_name() {
                Some(canonical) => canonical,
                None => return Cow::Borrowed(link),
            },
        };
        Cow::Owned(format!(
            "{}{}{}{}",
            start.as_str(),
            canonical,
            end.as_str(),
            &link[end.end()..]
        ))
    }
}

/// Turns links into interwiki links back to the source wiki, unless they
/// point to a file, category or media page or already carry the prefix.
pub struct WikiLinkPrefixer {
    interwiki_prefix: String,
    parser: TitleParser,
}

impl WikiLinkPrefixer {
    pub fn new(interwiki_prefix: impl Into<String>, parser: TitleParser) -> Self {
        Self {
            interwiki_prefix: interwiki_prefix.into().trim().to_string(),
            parser,
        }
    }

    fn has_interwiki_prefix(&self, link: &str) -> bool {
        let rest = link.trim_start();
        let rest = rest.strip_prefix(':').unwrap_or(rest).trim_start();
        let Some(candidate) = rest.get(..self.interwiki_prefix.len()) else {
            return false;
        };
        candidate.eq_ignore_ascii_case(&self.interwiki_prefix)
            && rest[self.interwiki_prefix.len()..].trim_start().starts_with(':')
    }
}

impl WikiLinkCleaner for WikiLinkPrefixer {
    fn id(&self) -> &str {
        "wiki_link_prefixer"
    }

    fn process<'a>(&self, link: &'a str) -> Cow<'a, str> {
        if self.interwiki_prefix.is_empty() || self.has_interwiki_prefix(link) {
            return Cow::Borrowed(link);
        }

        let title = match self.parser.parse(link) {
            Ok(title) => title,
            Err(e) => {
                tracing::warn!(link, error = %e, "malformed link target left unchanged");
                return Cow::Borrowed(link);
            }
        };
        if matches!(
            title.namespace,
            Namespace::FILE | Namespace::CATEGORY | Namespace::MEDIA
        ) {
            return Cow::Borrowed(link);
        }
        if title.interwiki.as_deref() == Some(normalize_prefix(&self.interwiki_prefix).as_str()) {
            return Cow::Borrowed(link);
        }

        let link = link.strip_prefix(':').unwrap_or(link);
        Cow::Owned(format!(":{}:{}", self.interwiki_prefix, link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlocalizing_parser(language: &str) -> WikiLinkParser {
        let mut parser = WikiLinkParser::new();
        parser.register(Box::new(NamespaceUnlocalizer::new(
            NamespaceTable::for_language(language),
        )));
        parser
    }

    fn prefixer(prefix: &str) -> WikiLinkPrefixer {
        WikiLinkPrefixer::new(prefix, TitleParser::new(NamespaceTable::canonical(), ["de", "en"]))
    }

    struct Upper;
    impl WikiLinkCleaner for Upper {
        fn id(&self) -> &str {
            "upper"
        }
        fn process<'a>(&self, link: &'a str) -> Cow<'a, str> {
            Cow::Owned(link.to_uppercase())
        }
    }

    struct Suffix;
    impl WikiLinkCleaner for Suffix {
        fn id(&self) -> &str {
            "suffix"
        }
        fn process<'a>(&self, link: &'a str) -> Cow<'a, str> {
            Cow::Owned(format!("{link}_x"))
        }
    }

    #[test]
    fn test_parser_only_touches_link_target() {
        let mut parser = WikiLinkParser::new();
        parser.register(Box::new(Upper));
        assert_eq!(
            parser.parse("a [[foo|bar]] b [[baz]] c [[x\ny]]"),
            "a [[FOO|bar]] b [[BAZ]] c [[x\ny]]"
        );
    }

    #[test]
    fn test_parser_pipeline_order() {
        let mut parser = WikiLinkParser::new();
        parser.register(Box::new(Suffix));
        parser.register(Box::new(Upper));
        assert_eq!(parser.parse("[[a]]"), "[[A_X]]");
        assert_eq!(parser.cleaners().len(), 2);
    }

    #[test]
    fn test_parser_without_cleaners() {
        let (text, changed) = WikiLinkParser::new().parse_counting("[[a]]");
        assert_eq!(text, "[[a]]");
        assert_eq!(changed, 0);
    }

    #[test]
    fn test_parser_skips_external_links_and_templates() {
        let mut parser = WikiLinkParser::new();
        parser.register(Box::new(Upper));
        assert_eq!(
            parser.parse("[http://x.org y] {{tpl|a}} [[[z]]]"),
            "[http://x.org y] {{tpl|a}} [[[Z]]]"
        );
    }

    #[test]
    fn test_unlocalize_german_category() {
        let parser = unlocalizing_parser("de");
        assert_eq!(parser.parse("[[Kategorie:foo]]"), "[[Category:foo]]");
        assert_eq!(parser.parse("[[de:Kategorie:foo]]"), "[[de:Kategorie:foo]]");
    }

    #[test]
    fn test_unlocalize_keeps_formatting() {
        let parser = unlocalizing_parser("de");
        assert_eq!(
            parser.parse("[[ :Benutzer_Diskussion :Foo|talk]]"),
            "[[ :User talk :Foo|talk]]"
        );
        assert_eq!(parser.parse("[[Bild:X.jpg|thumb]]"), "[[File:X.jpg|thumb]]");
    }

    #[test]
    fn test_unlocalize_ignores_main_and_project() {
        let parser = unlocalizing_parser("de");
        assert_eq!(parser.parse("[[Wikipedia:Hauptseite]]"), "[[Wikipedia:Hauptseite]]");
        assert_eq!(parser.parse("[[Berlin]]"), "[[Berlin]]");
        assert_eq!(parser.parse("[[Foo: Bar]]"), "[[Foo: Bar]]");
    }

    #[test]
    fn test_unlocalize_counts_changes() {
        let parser = unlocalizing_parser("de");
        let (text, changed) = parser.parse_counting("[[Kategorie:A]] [[B]] [[Vorlage:C]]");
        assert_eq!(text, "[[Category:A]] [[B]] [[Template:C]]");
        assert_eq!(changed, 2);
    }

    #[test]
    fn test_prefixer_prefixes_main_links() {
        let p = prefixer("de");
        assert_eq!(p.process("Berlin"), ":de:Berlin");
        assert_eq!(p.process(":Berlin"), ":de:Berlin");
        assert_eq!(p.process("User:Foo"), ":de:User:Foo");
    }

    #[test]
    fn test_prefixer_skips_file_category_media() {
        let p = prefixer("de");
        assert_eq!(p.process("File:X.jpg"), "File:X.jpg");
        assert_eq!(p.process(":Category:Foo"), ":Category:Foo");
        assert_eq!(p.process("Media:X.jpg"), "Media:X.jpg");
    }

    #[test]
    fn test_prefixer_skips_already_prefixed() {
        let p = prefixer("de");
        assert_eq!(p.process(":de:Berlin"), ":de:Berlin");
        assert_eq!(p.process("DE : Berlin"), "DE : Berlin");
    }

    #[test]
    fn test_prefixer_chains_other_interwikis() {
        let p = prefixer("de");
        assert_eq!(p.process("en:London"), ":de:en:London");
    }

    #[test]
    fn test_prefixer_fails_open_on_malformed_titles() {
        let p = prefixer("de");
        assert_eq!(p.process("a<b"), "a<b");
        assert_eq!(p.process("#Abschnitt"), "#Abschnitt");
    }

    #[test]
    fn test_prefixer_disabled_without_prefix() {
        let p = prefixer("");
        assert_eq!(p.process("Berlin"), "Berlin");
    }

    #[test]
    fn test_from_settings_english_source_skips_unlocalizer() {
        let settings = ImporterSettings {
            interwiki_prefix: "en".to_string(),
            ..Default::default()
        };
        let parser = WikiLinkParser::from_settings(&settings);
        let ids: Vec<&str> = parser.cleaners().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["wiki_link_prefixer"]);
        assert_eq!(parser.parse("[[Category:Foo]] [[London]]"), "[[Category:Foo]] [[:en:London]]");
    }

    #[test]
    fn test_from_settings_german_source() {
        let settings = ImporterSettings {
            source_language: "de".to_string(),
            interwiki_prefix: "de".to_string(),
            ..Default::default()
        };
        let parser = WikiLinkParser::from_settings(&settings);
        let ids: Vec<&str> = parser.cleaners().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["namespace_unlocalizer", "wiki_link_prefixer"]);
        assert_eq!(
            parser.parse("[[Kategorie:Foo]] [[Benutzer:Bar|Bar]] [[Berlin]]"),
            "[[Category:Foo]] [[:de:User:Bar|Bar]] [[:de:Berlin]]"
        );
    }
}

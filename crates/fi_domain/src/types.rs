use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace(pub i32);

impl Namespace {
    pub const MEDIA: Self = Self(-2);
    pub const SPECIAL: Self = Self(-1);
    pub const MAIN: Self = Self(0);
    pub const TALK: Self = Self(1);
    pub const USER: Self = Self(2);
    pub const USER_TALK: Self = Self(3);
    pub const PROJECT: Self = Self(4);
    pub const PROJECT_TALK: Self = Self(5);
    pub const FILE: Self = Self(6);
    pub const FILE_TALK: Self = Self(7);
    pub const MEDIAWIKI: Self = Self(8);
    pub const MEDIAWIKI_TALK: Self = Self(9);
    pub const TEMPLATE: Self = Self(10);
    pub const TEMPLATE_TALK: Self = Self(11);
    pub const HELP: Self = Self(12);
    pub const HELP_TALK: Self = Self(13);
    pub const CATEGORY: Self = Self(14);
    pub const CATEGORY_TALK: Self = Self(15);

    /// Canonical (English, language-independent) name, `None` for the main
    /// namespace and unknown ids.
    pub fn canonical_name(self) -> Option<&'static str> {
        let name = match self.0 {
            -2 => "Media",
            -1 => "Special",
            1 => "Talk",
            2 => "User",
            3 => "User talk",
            4 => "Project",
            5 => "Project talk",
            6 => "File",
            7 => "File talk",
            8 => "MediaWiki",
            9 => "MediaWiki talk",
            10 => "Template",
            11 => "Template talk",
            12 => "Help",
            13 => "Help talk",
            14 => "Category",
            15 => "Category talk",
            _ => return None,
        };
        Some(name)
    }
}

/// One entry of a "templates used" or "categories used" list as returned by
/// the MediaWiki parse API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    pub title: String,
    pub ns: Namespace,
}

impl PageRef {
    pub fn new(ns: Namespace, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ns,
        }
    }
}

impl std::fmt::Display for PageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

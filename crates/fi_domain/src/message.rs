/// An error or notice that can be rendered in the user's language.
///
/// `key` is a MediaWiki-style message key and `params` are its positional
/// `$1`, `$2`, ... arguments. `Display` on implementors gives the English
/// rendering.
pub trait LocalizedMessage {
    fn key(&self) -> &'static str;
    fn params(&self) -> Vec<String>;
}

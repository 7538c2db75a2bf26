use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"<.*?>").expect("valid tag regex");
    static ref URL_RE: Regex = Regex::new(r"http\S+").expect("valid url regex");
    static ref NON_ALPHA_RE: Regex = Regex::new(r"[^a-zA-Z\s]").expect("valid alpha regex");
    static ref SPACE_RE: Regex = Regex::new(r"\s+").expect("valid whitespace regex");
}

/// Normalises raw review text before tokenization.
///
/// Lowercases, drops tag markers and URL-like tokens, keeps only basic Latin
/// letters and whitespace, then collapses whitespace runs and trims.
/// Cleaning an already cleaned string returns it unchanged.
pub fn clean_text(text: &str) -> String {
    let text = text.to_lowercase();
    let text = TAG_RE.replace_all(&text, "");
    let text = URL_RE.replace_all(&text, "");
    let text = NON_ALPHA_RE.replace_all(&text, "");
    // removing punctuation can glue a new "http..." token together
    let text = URL_RE.replace_all(&text, "");
    let text = SPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Missing input degrades to the empty string.
pub fn clean_optional(text: Option<&str>) -> String {
    text.map(clean_text).unwrap_or_default()
}

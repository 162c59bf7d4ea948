//! Slug normalisation for books and retailers.
use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lower-case, collapse every run of non-alphanumeric characters to one `-`,
/// then trim leading/trailing hyphens. May return an empty string.
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let collapsed = NON_ALNUM_RUN.replace_all(&lowered, "-");
    collapsed.trim_matches('-').to_string()
}

/// Slug for an admin submission: the explicit slug when it normalises to
/// something, otherwise one derived from `fallback` (the title or name).
pub fn resolve(explicit: Option<&str>, fallback: &str) -> String {
    explicit
        .map(slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| slugify(fallback))
}

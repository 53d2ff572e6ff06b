use once_cell::sync::Lazy;
use regex::Regex;

// [label](@ref), [label](@ref target), [label](@id target)
static CROSS_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]+?)\]\(@(?:ref|ref [^)]*?|id [^)]*?)\)")
        .expect("valid cross-reference regex")
});

/// Reduce documentation-tool cross references to their label text.
pub(super) fn strip(content: &str) -> String {
    CROSS_REFERENCE.replace_all(content, "$1").into_owned()
}

//! Target-dependent rewriting of raw source text, run before chunking.
//!
//! Every rule is a whole-document text rewrite applied once, in a fixed
//! order. All directive tags are consumed by the first pass, so filtering
//! the output again for the same target changes nothing.

mod crossref;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

use crate::Target;
use crate::config::{Config, UNKNOWN};

/// A line-level tag from the directive vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// `#-`
    Split,
    /// `#+`
    SplitContinued,
    /// `#md`, `#nb`, `#jl`
    Only(Target),
    /// `#!md`, `#!nb`, `#!jl`
    Not(Target),
    /// `#src`
    Strip,
}

impl Directive {
    /// Tags that select or exclude a line, longest spellings first so that a
    /// suffix match on `#!md` is never mistaken for `#md`.
    const LINE_TAGS: [(&'static str, Directive); 7] = [
        ("#!md", Directive::Not(Target::Markdown)),
        ("#!nb", Directive::Not(Target::Notebook)),
        ("#!jl", Directive::Not(Target::Script)),
        ("#src", Directive::Strip),
        ("#md", Directive::Only(Target::Markdown)),
        ("#nb", Directive::Only(Target::Notebook)),
        ("#jl", Directive::Only(Target::Script)),
    ];

    /// Parse a bare tag such as `#!nb`.
    pub fn parse(tag: &str) -> Option<Directive> {
        match tag {
            "#-" => Some(Directive::Split),
            "#+" => Some(Directive::SplitContinued),
            _ => Self::LINE_TAGS
                .iter()
                .find(|(spelling, _)| *spelling == tag)
                .map(|(_, d)| *d),
        }
    }

    /// Whether a line carrying this tag survives for `target`.
    pub fn admits(self, target: Target) -> bool {
        match self {
            Directive::Only(t) => t == target,
            Directive::Not(t) => t != target,
            Directive::Strip => false,
            Directive::Split | Directive::SplitContinued => true,
        }
    }
}

/// Rewrite `text` for `target`.
pub fn filter(text: &str, target: Target, config: &Config) -> String {
    let content = text.replace("\r\n", "\n");
    let content = expand_block_comments(content);
    let content = apply_line_directives(&content, target);
    let content = rewrite_math(content, target, config);
    let content = substitute_placeholders(content, config);
    if config.documenter && target != Target::Markdown {
        crossref::strip(&content)
    } else {
        content
    }
}

// ---------------------------------------------------------------------------
// Block comments
// ---------------------------------------------------------------------------

static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^#=+\n(.*?)\n=+#$").expect("valid block comment regex"));

/// Turn `#=` ... `=#` blocks into runs of `# ` prose lines, one block at a
/// time until none is left.
fn expand_block_comments(mut content: String) -> String {
    while BLOCK_COMMENT.is_match(&content) {
        content = BLOCK_COMMENT
            .replacen(&content, 1, |caps: &Captures| {
                caps[1]
                    .split('\n')
                    .map(|line| format!("# {}", line))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .into_owned();
    }
    content
}

// ---------------------------------------------------------------------------
// Line tags
// ---------------------------------------------------------------------------

fn apply_line_directives(content: &str, target: Target) -> String {
    let mut out = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        if let Some(kept) = rewrite_line(body, target) {
            out.push_str(&kept);
            out.push_str(newline);
        }
    }
    out
}

/// Peel leading `#tag ` and trailing ` #tag` markers off one line. Returns
/// `None` when a tag excludes the line for `target`.
fn rewrite_line(line: &str, target: Target) -> Option<String> {
    if line.starts_with("#src") || line.ends_with("#src") {
        return None;
    }

    let mut rest = line;
    loop {
        if let Some((directive, after)) = leading_tag(rest) {
            if !directive.admits(target) {
                return None;
            }
            match after {
                Some(after) => rest = after,
                None => break,
            }
            continue;
        }
        if let Some((before, directive)) = trailing_tag(rest) {
            if !directive.admits(target) {
                return None;
            }
            match before {
                Some(before) => rest = before,
                None => break,
            }
            continue;
        }
        break;
    }
    Some(rest.to_string())
}

/// A tag at the very start of the line. The remainder is `Some` only when
/// the tag is strippable: followed by one space, or the whole line.
fn leading_tag(line: &str) -> Option<(Directive, Option<&str>)> {
    Directive::LINE_TAGS.iter().find_map(|(spelling, directive)| {
        let after = line.strip_prefix(spelling)?;
        let remainder = if after.is_empty() {
            Some(after)
        } else {
            after.strip_prefix(' ')
        };
        Some((*directive, remainder))
    })
}

/// A tag at the very end of the line. The remainder is `Some` only when the
/// tag is preceded by a space or is the whole line.
fn trailing_tag(line: &str) -> Option<(Option<&str>, Directive)> {
    Directive::LINE_TAGS.iter().find_map(|(spelling, directive)| {
        let before = line.strip_suffix(spelling)?;
        let remainder = if before.is_empty() {
            Some(before)
        } else {
            before.strip_suffix(' ')
        };
        Some((remainder, *directive))
    })
}

// ---------------------------------------------------------------------------
// Math, placeholders
// ---------------------------------------------------------------------------

static FENCED_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```math(.*?)```").expect("valid math fence regex"));
static DISPLAY_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\$(.*?)\$\$").expect("valid display math regex"));

fn rewrite_math(content: String, target: Target, config: &Config) -> String {
    match target {
        Target::Notebook => FENCED_MATH
            .replace_all(&content, |caps: &Captures| format!("$${}$$", &caps[1]))
            .into_owned(),
        Target::Markdown if config.documenter => DISPLAY_MATH
            .replace_all(&content, |caps: &Captures| format!("```math{}```", &caps[1]))
            .into_owned(),
        _ => content,
    }
}

fn substitute_placeholders(mut content: String, config: &Config) -> String {
    let placeholders = [
        ("@__NAME__", config.name.as_deref()),
        ("@__REPO_ROOT_URL__", config.repo_root_url.as_deref()),
        ("@__NBVIEWER_ROOT_URL__", config.nbviewer_root_url.as_deref()),
        ("@__BINDER_ROOT_URL__", config.binder_root_url.as_deref()),
    ];
    for (placeholder, value) in placeholders {
        if !content.contains(placeholder) {
            continue;
        }
        let value = value.unwrap_or_else(|| {
            warn!("no value configured for {}, using {}", placeholder, UNKNOWN);
            UNKNOWN
        });
        content = content.replace(placeholder, value);
    }
    content
}

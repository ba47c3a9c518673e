//! Post-processing: strip the code fence a model sometimes wraps its answer in.
//!
//! The transcription prompt says not to fence the output, but vision models
//! still return ` ```markdown … ``` ` now and then. Only an *outer* wrapper
//! tagged with the requested language is removed; fenced blocks inside the
//! page (a Python listing, say) are content and stay verbatim.

use once_cell::sync::Lazy;
use regex::Regex;

/// Fence language stripped by [`clean_fragment`].
pub const DEFAULT_FENCE_LANGUAGE: &str = "markdown";

static RE_MARKDOWN_WRAP: Lazy<Regex> =
    Lazy::new(|| wrap_regex(DEFAULT_FENCE_LANGUAGE).unwrap());

/// Opening fence with the language (case-insensitive), then the body, then a
/// closing fence at the very end. `.*` is greedy so the match spans from the
/// first line to the last fence, leaving interior fences intact.
fn wrap_regex(language: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?is)\A```{}[ \t]*\r?\n(.*)```\z",
        regex::escape(language)
    ))
}

/// Remove an outer ` ```<language> ` wrapper from `text`.
///
/// Empty input is returned as-is. Otherwise the text is trimmed; if it is
/// wrapped in a fence tagged `language`, the fence lines are removed and the
/// interior is trimmed of surrounding blank lines. Applying the function
/// twice gives the same result as applying it once.
pub fn remove_markdown_wrap(text: &str, language: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let owned;
    let re: &Regex = if language.eq_ignore_ascii_case(DEFAULT_FENCE_LANGUAGE) {
        &*RE_MARKDOWN_WRAP
    } else {
        match wrap_regex(language) {
            Ok(r) => {
                owned = r;
                &owned
            }
            Err(_) => return text.trim().to_string(),
        }
    };

    let mut current = text.trim();
    // A model can double-wrap; peel until stable.
    while let Some(inner) = re.captures(current).and_then(|c| c.get(1)) {
        let next = inner.as_str().trim();
        if next.len() == current.len() {
            break;
        }
        current = next;
    }
    current.to_string()
}

/// Post-process one page fragment with the default `markdown` fence tag.
pub fn clean_fragment(text: &str) -> String {
    remove_markdown_wrap(text, DEFAULT_FENCE_LANGUAGE)
}

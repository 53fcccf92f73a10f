//! Text passes used by the prompt rewriter.
//!
//! Each pass is a pure function. The string passes run before and after
//! segmentation; the tag passes operate on the ordered tag list in between.

use std::sync::LazyLock;

use regex::Regex;

/// Runs of line breaks, tabs, form feeds and vertical tabs.
static LINE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\n\r\f\v]+").expect("valid whitespace pattern"));

/// Two or more literal spaces.
static REPEATED_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("valid spaces pattern"));

/// Non-greedy, single-line `<...>` annotation block.
static ANNOTATION_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*?>").expect("valid annotation pattern"));

/// An all-caps run, optionally wrapped in `.`, `-`, `_` or `'`.
static META_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[.\-_']*[A-Z]+[.\-_']*[A-Z]*[.\-_']*\b").expect("valid meta keyword pattern")
});

/// Returns whether a trimmed tag is an annotation block.
pub(crate) fn is_annotation(tag: &str) -> bool {
    tag.starts_with('<') && tag.ends_with('>')
}

/// Turns line-level whitespace into spaces, then collapses space runs.
pub(crate) fn flatten_whitespace(prompt: &str) -> String {
    let flattened = LINE_WHITESPACE.replace_all(prompt, " ");
    collapse_spaces(&flattened)
}

pub(crate) fn collapse_spaces(text: &str) -> String {
    REPEATED_SPACES.replace_all(text, " ").into_owned()
}

/// Splits on commas, trims, and drops empty pieces.
fn split_commas(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Isolates every annotation block as its own segment and splits the rest on commas.
pub(crate) fn segment_blocks(prompt: &str) -> Vec<String> {
    let fenced = ANNOTATION_BLOCK.replace_all(prompt, ",${0},");
    split_commas(&fenced).collect()
}

/// Splits all-caps meta keywords out of every segment that is not an annotation block.
pub(crate) fn isolate_meta_keywords(segments: Vec<String>) -> Vec<String> {
    let mut tags = Vec::with_capacity(segments.len());
    for segment in segments {
        if is_annotation(&segment) {
            tags.push(segment);
        } else {
            let fenced = META_KEYWORD.replace_all(&segment, ",${0},");
            tags.extend(split_commas(&fenced));
        }
    }
    tags
}

/// Replaces spaces with `word_separator` in every tag that is not an annotation block.
pub(crate) fn substitute_word_separator(tags: Vec<String>, word_separator: &str) -> Vec<String> {
    tags.into_iter()
        .map(|tag| {
            if is_annotation(&tag) {
                tag
            } else {
                tag.replace(' ', word_separator)
            }
        })
        .collect()
}

/// Joins tags and tidies whitespace introduced by the separators.
pub(crate) fn join_tags(tags: &[String], tag_separator: &str) -> String {
    let joined = tags.join(tag_separator);
    collapse_spaces(&joined).trim().to_string()
}

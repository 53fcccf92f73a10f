//! Best-effort reversal of a rewritten prompt back to comma-space tags.
//!
//! A rewrite cannot always be undone: a separator literal that already appeared
//! in the original text is turned back into a space or a tag boundary as well,
//! and the `Empty` word separator leaves nothing to split on.

use crate::rewriter::is_annotation;
use crate::separator::{DEFAULT_TAG_SEPARATOR, DEFAULT_WORD_SEPARATOR, Separator, SeparatorRole};

/// Converts text produced with the given separators back to `", "`-joined tags
/// with space-separated words.
///
/// Annotation blocks are left untouched.
///
/// # Examples
///
/// ```
/// use tagsep::{restore_prompt, Separator};
///
/// assert_eq!(
///     restore_prompt("long-hair BREAK blue-eyes", Separator::Break, Separator::Dash),
///     "long hair, blue eyes"
/// );
/// ```
pub fn restore_prompt(text: &str, tag_separator: Separator, word_separator: Separator) -> String {
    let tag_literal = tag_separator.resolve(SeparatorRole::Tag);
    let word_literal = word_separator.resolve(SeparatorRole::Word);

    if text.is_empty() {
        tracing::debug!("no input text, skipping restore");
        return String::new();
    }
    if tag_literal == DEFAULT_TAG_SEPARATOR && word_literal == DEFAULT_WORD_SEPARATOR {
        tracing::debug!("default separators, nothing to restore");
        return text.to_string();
    }

    let mut tags: Vec<String> = if tag_literal == DEFAULT_TAG_SEPARATOR {
        text.split(DEFAULT_TAG_SEPARATOR).map(String::from).collect()
    } else {
        text.split(tag_literal)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(String::from)
            .collect()
    };

    if word_literal == DEFAULT_WORD_SEPARATOR || word_literal.is_empty() {
        tracing::debug!(%word_separator, "word separator cannot be reversed, keeping words");
    } else {
        for tag in tags.iter_mut().filter(|tag| !is_annotation(tag)) {
            *tag = tag.replace(word_literal, " ");
        }
    }

    tags.join(DEFAULT_TAG_SEPARATOR)
}

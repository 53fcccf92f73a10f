//! Prompt rewriting: turns a free-form, comma-separated prompt into a canonical
//! tag list joined by configurable separators.
//!
//! The rewrite runs as a fixed sequence of passes:
//!
//! 1. line whitespace becomes spaces and space runs collapse
//! 2. annotation blocks (`<...>`) are isolated and the prompt is split on commas
//! 3. all-caps meta keywords are split into their own tags (optional)
//! 4. spaces inside ordinary tags become the word separator
//! 5. tags are joined with the tag separator and leftover space runs collapse
//!
//! # Examples
//!
//! ```
//! use tagsep::{rewrite_prompt, RewriteOptions, Separator};
//!
//! let options = RewriteOptions::new(Separator::Comma, Separator::Dash, true)?;
//! assert_eq!(
//!     rewrite_prompt("a cat, BLUE sky, <lora:foo:0.8>", &options),
//!     "a-cat,BLUE,sky,<lora:foo:0.8>"
//! );
//! # Ok::<(), tagsep::SeparatorError>(())
//! ```

mod stages;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::separator::{Separator, SeparatorError, SeparatorRole};

pub(crate) use stages::is_annotation;

/// Validated separator configuration for a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "UncheckedOptions")]
pub struct RewriteOptions {
    tag_separator: Separator,
    word_separator: Separator,
    ignore_meta_keywords: bool,
}

impl RewriteOptions {
    /// Creates options after checking that each separator is allowed in its role.
    ///
    /// # Errors
    ///
    /// Returns `SeparatorError::NotAllowed` if `Empty` is used as the tag separator
    /// or `BREAK` as the word separator.
    pub fn new(
        tag_separator: Separator,
        word_separator: Separator,
        ignore_meta_keywords: bool,
    ) -> Result<Self, SeparatorError> {
        Ok(Self {
            tag_separator: tag_separator.validate_for(SeparatorRole::Tag)?,
            word_separator: word_separator.validate_for(SeparatorRole::Word)?,
            ignore_meta_keywords,
        })
    }

    pub fn tag_separator(&self) -> Separator {
        self.tag_separator
    }

    pub fn word_separator(&self) -> Separator {
        self.word_separator
    }

    /// Whether all-caps meta keywords are split into their own tags.
    pub fn ignore_meta_keywords(&self) -> bool {
        self.ignore_meta_keywords
    }

    /// Text used to join tags.
    pub fn tag_literal(&self) -> &'static str {
        self.tag_separator.resolve(SeparatorRole::Tag)
    }

    /// Text substituted for spaces inside a tag.
    pub fn word_literal(&self) -> &'static str {
        self.word_separator.resolve(SeparatorRole::Word)
    }

    /// Returns true when both separators resolve to the same text.
    ///
    /// The output is still produced, but it can no longer be split back into
    /// tags unambiguously.
    pub fn separators_collide(&self) -> bool {
        self.tag_literal() == self.word_literal()
    }
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            tag_separator: Separator::Unmodified,
            word_separator: Separator::Unmodified,
            ignore_meta_keywords: true,
        }
    }
}

/// Wire form of [`RewriteOptions`]; validated on the way in.
#[derive(Deserialize)]
#[serde(default)]
struct UncheckedOptions {
    tag_separator: Separator,
    word_separator: Separator,
    ignore_meta_keywords: bool,
}

impl Default for UncheckedOptions {
    fn default() -> Self {
        let defaults = RewriteOptions::default();
        Self {
            tag_separator: defaults.tag_separator,
            word_separator: defaults.word_separator,
            ignore_meta_keywords: defaults.ignore_meta_keywords,
        }
    }
}

impl TryFrom<UncheckedOptions> for RewriteOptions {
    type Error = SeparatorError;

    fn try_from(raw: UncheckedOptions) -> Result<Self, Self::Error> {
        Self::new(raw.tag_separator, raw.word_separator, raw.ignore_meta_keywords)
    }
}

/// A pass over the segmented tag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagStage {
    IsolateMetaKeywords,
    SubstituteWords(&'static str),
}

impl TagStage {
    fn apply(self, tags: Vec<String>) -> Vec<String> {
        match self {
            Self::IsolateMetaKeywords => stages::isolate_meta_keywords(tags),
            Self::SubstituteWords(word) => stages::substitute_word_separator(tags, word),
        }
    }
}

/// Result of rewriting a positive prompt and an optional negative prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewrittenPair {
    pub positive: String,
    pub negative: Option<String>,
}

/// Rewrites prompts with a fixed configuration.
///
/// Construction is cheap and the rewriter holds no mutable state, so a single
/// instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct PromptRewriter {
    options: RewriteOptions,
    segmenting: Vec<TagStage>,
}

impl PromptRewriter {
    /// Creates a rewriter for `options`.
    ///
    /// Logs a warning when both separators resolve to the same text.
    pub fn new(options: RewriteOptions) -> Self {
        if options.separators_collide() {
            tracing::warn!(
                tag_separator = %options.tag_separator(),
                word_separator = %options.word_separator(),
                "using the same text for word and tag separators is not recommended"
            );
        }

        let mut segmenting = Vec::with_capacity(1);
        if options.ignore_meta_keywords() {
            segmenting.push(TagStage::IsolateMetaKeywords);
        }

        Self {
            options,
            segmenting,
        }
    }

    pub fn options(&self) -> &RewriteOptions {
        &self.options
    }

    /// Splits `prompt` into tags without substituting or joining anything.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagsep::{PromptRewriter, RewriteOptions};
    ///
    /// let rewriter = PromptRewriter::new(RewriteOptions::default());
    /// assert_eq!(rewriter.tags("red  car,,\nBLUE"), vec!["red car", "BLUE"]);
    /// ```
    pub fn tags(&self, prompt: &str) -> Vec<String> {
        if prompt.is_empty() {
            return Vec::new();
        }
        let flattened = stages::flatten_whitespace(prompt);
        self.segmenting
            .iter()
            .fold(stages::segment_blocks(&flattened), |tags, stage| {
                stage.apply(tags)
            })
    }

    /// Rewrites a single prompt. Empty input gives empty output.
    pub fn rewrite(&self, prompt: &str) -> String {
        if prompt.is_empty() {
            return String::new();
        }
        let tags = TagStage::SubstituteWords(self.options.word_literal()).apply(self.tags(prompt));
        stages::join_tags(&tags, self.options.tag_literal())
    }

    /// Rewrites a positive prompt and, if present, a negative prompt.
    pub fn rewrite_pair(&self, positive: &str, negative: Option<&str>) -> RewrittenPair {
        RewrittenPair {
            positive: self.rewrite(positive),
            negative: negative.map(|n| self.rewrite(n)),
        }
    }
}

/// Rewrites `prompt` with `options`.
///
/// Convenience wrapper around [`PromptRewriter`] for one-off calls.
pub fn rewrite_prompt(prompt: &str, options: &RewriteOptions) -> String {
    PromptRewriter::new(*options).rewrite(prompt)
}

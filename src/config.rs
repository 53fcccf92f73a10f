//! Rewriter configuration sourced from builder values and the environment.
//!
//! Each setting is resolved in order: an explicit builder value, then the
//! matching environment variable, then the default.

use thiserror::Error;

use crate::rewriter::RewriteOptions;
use crate::separator::{Separator, SeparatorError};

/// Environment variable naming the tag separator.
pub const TAG_SEPARATOR_ENV: &str = "TAGSEP_TAG_SEPARATOR";
/// Environment variable naming the word separator.
pub const WORD_SEPARATOR_ENV: &str = "TAGSEP_WORD_SEPARATOR";
/// Environment variable toggling meta keyword splitting.
pub const IGNORE_META_ENV: &str = "TAGSEP_IGNORE_META";

/// Errors that can occur while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be parsed.
    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    /// The resolved separators are not valid for their roles.
    #[error(transparent)]
    Separator(#[from] SeparatorError),
}

/// Builder for [`RewriteOptions`] with environment fallbacks.
///
/// # Examples
///
/// ```
/// use tagsep::{RewriterConfigBuilder, Separator};
///
/// let options = RewriterConfigBuilder::new()
///     .tag_separator(Separator::Comma)
///     .word_separator(Separator::Underscore)
///     .ignore_meta_keywords(false)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(options.tag_literal(), ",");
/// ```
#[derive(Debug, Default, Clone)]
pub struct RewriterConfigBuilder {
    tag_separator: Option<Separator>,
    word_separator: Option<Separator>,
    ignore_meta_keywords: Option<bool>,
}

impl RewriterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag_separator(mut self, separator: Separator) -> Self {
        self.tag_separator = Some(separator);
        self
    }

    pub fn word_separator(mut self, separator: Separator) -> Self {
        self.word_separator = Some(separator);
        self
    }

    pub fn ignore_meta_keywords(mut self, ignore: bool) -> Self {
        self.ignore_meta_keywords = Some(ignore);
        self
    }

    /// Builds validated options, reading unset values from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `TAGSEP_TAG_SEPARATOR`: separator name, defaults to `Unmodified`
    /// - `TAGSEP_WORD_SEPARATOR`: separator name, defaults to `Unmodified`
    /// - `TAGSEP_IGNORE_META`: boolean, defaults to `true`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment value cannot be parsed or a
    /// separator is not allowed in its role.
    pub fn build(self) -> Result<RewriteOptions, ConfigError> {
        self.build_with(|var| std::env::var(var).ok())
    }

    fn build_with(
        self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<RewriteOptions, ConfigError> {
        let defaults = RewriteOptions::default();

        let tag_separator = match self.tag_separator {
            Some(sep) => sep,
            None => env_separator(&lookup, TAG_SEPARATOR_ENV)?.unwrap_or(defaults.tag_separator()),
        };

        let word_separator = match self.word_separator {
            Some(sep) => sep,
            None => {
                env_separator(&lookup, WORD_SEPARATOR_ENV)?.unwrap_or(defaults.word_separator())
            }
        };

        let ignore_meta_keywords = match self.ignore_meta_keywords {
            Some(flag) => flag,
            None => match lookup(IGNORE_META_ENV) {
                Some(value) => parse_flag(&value).ok_or(ConfigError::InvalidEnv {
                    var: IGNORE_META_ENV,
                    value,
                })?,
                None => defaults.ignore_meta_keywords(),
            },
        };

        Ok(RewriteOptions::new(
            tag_separator,
            word_separator,
            ignore_meta_keywords,
        )?)
    }
}

fn env_separator(
    lookup: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Separator>, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        None => Ok(None),
    }
}

/// Parses the boolean spellings accepted in the environment.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "enable" => Some(true),
        "false" | "0" | "no" | "disable" => Some(false),
        _ => None,
    }
}

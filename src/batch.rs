//! Rewriting every prompt of a generation job.
//!
//! A job carries its prompts as parallel arrays, one entry per image, laid out
//! iteration by iteration. Hires-fix variants, when present, mirror the
//! positive/negative pair.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rewriter::{PromptRewriter, RewriteOptions};

/// Metadata key holding the first positive prompt before rewriting.
pub const ORIGINAL_PROMPT_KEY: &str = "original prompt";

/// Metadata key holding the first negative prompt before rewriting.
pub const ORIGINAL_NEGATIVE_PROMPT_KEY: &str = "original negative prompt";

/// Errors raised when a batch cannot be read or does not match its layout.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{field} holds {actual} prompts but the layout needs {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("layout of {iterations} x {batch_size} prompts is too large")]
    LayoutOverflow { iterations: usize, batch_size: usize },

    #[error("a batch needs at least one iteration")]
    NoIterations,

    #[error("{prompts} prompts cannot be split evenly into {iterations} iterations")]
    UnevenLayout { prompts: usize, iterations: usize },

    #[error("Malformed batch JSON: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Shape of a generation job: `iterations` rounds of `batch_size` images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLayout {
    pub iterations: usize,
    pub batch_size: usize,
}

impl BatchLayout {
    pub fn new(iterations: usize, batch_size: usize) -> Self {
        Self {
            iterations,
            batch_size,
        }
    }

    /// A single round covering `len` images.
    pub fn single(len: usize) -> Self {
        Self::new(1, len)
    }

    /// Splits `prompts` prompts into `iterations` equal rounds.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::NoIterations` for zero iterations and
    /// `BatchError::UnevenLayout` when the prompts do not divide evenly.
    pub fn covering(prompts: usize, iterations: usize) -> Result<Self, BatchError> {
        if iterations == 0 {
            return Err(BatchError::NoIterations);
        }
        if prompts % iterations != 0 {
            return Err(BatchError::UnevenLayout {
                prompts,
                iterations,
            });
        }
        Ok(Self::new(iterations, prompts / iterations))
    }

    /// Total number of prompts the layout addresses.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::LayoutOverflow` if the count does not fit in `usize`.
    pub fn len(&self) -> Result<usize, BatchError> {
        self.iterations
            .checked_mul(self.batch_size)
            .ok_or(BatchError::LayoutOverflow {
                iterations: self.iterations,
                batch_size: self.batch_size,
            })
    }

    /// Iterates over `(iteration, offset, index)` for every image.
    ///
    /// Indices stay below [`BatchLayout::len`], so callers check that first.
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        (0..self.iterations).flat_map(move |iteration| {
            (0..self.batch_size)
                .map(move |offset| (iteration, offset, iteration * self.batch_size + offset))
        })
    }
}

impl PromptBatch {
    /// Parses a batch from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Parse` if the text is not a valid batch.
    pub fn from_json(text: &str) -> Result<Self, BatchError> {
        serde_json::from_str(text).map_err(BatchError::Parse)
    }
}

/// Prompts of a generation job, one entry per image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBatch {
    pub prompts: Vec<String>,
    #[serde(default)]
    pub negative_prompts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr_prompts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr_negative_prompts: Option<Vec<String>>,
}

/// How a batch should be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub enabled: bool,
    pub rewrite_negative: bool,
    pub rewrite: RewriteOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            rewrite_negative: true,
            rewrite: RewriteOptions::default(),
        }
    }
}

/// A rewritten batch plus the original prompt text worth keeping alongside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub batch: PromptBatch,
    pub metadata: BTreeMap<String, String>,
}

fn check_len(field: &'static str, prompts: &[String], expected: usize) -> Result<(), BatchError> {
    if prompts.len() < expected {
        return Err(BatchError::LengthMismatch {
            field,
            expected,
            actual: prompts.len(),
        });
    }
    Ok(())
}

/// Rewrites the prompts of `batch` addressed by `layout`.
///
/// Entries beyond `layout.len()` are left as they are. Negative prompts are only
/// checked and rewritten when `options.rewrite_negative` is set.
///
/// # Errors
///
/// Returns `BatchError::LayoutOverflow` if the layout size overflows and
/// `BatchError::LengthMismatch` if an array that will be rewritten is shorter
/// than the layout.
///
/// # Examples
///
/// ```
/// use tagsep::{rewrite_batch, BatchLayout, BatchOptions, PromptBatch, RewriteOptions, Separator};
///
/// let batch = PromptBatch {
///     prompts: vec!["red car, blue sky".into()],
///     negative_prompts: vec!["blurry photo".into()],
///     ..Default::default()
/// };
/// let options = BatchOptions {
///     rewrite: RewriteOptions::new(Separator::Comma, Separator::Underscore, true)?,
///     ..Default::default()
/// };
///
/// let outcome = rewrite_batch(batch, BatchLayout::single(1), &options)?;
/// assert_eq!(outcome.batch.prompts[0], "red_car,blue_sky");
/// assert_eq!(outcome.metadata["original prompt"], "red car, blue sky");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn rewrite_batch(
    mut batch: PromptBatch,
    layout: BatchLayout,
    options: &BatchOptions,
) -> Result<BatchOutcome, BatchError> {
    if !options.enabled {
        return Ok(BatchOutcome {
            batch,
            metadata: BTreeMap::new(),
        });
    }

    let expected = layout.len()?;
    check_len("prompts", &batch.prompts, expected)?;
    if options.rewrite_negative {
        check_len("negative_prompts", &batch.negative_prompts, expected)?;
    }
    if let Some(hr) = &batch.hr_prompts {
        check_len("hr_prompts", hr, expected)?;
    }
    if options.rewrite_negative
        && let Some(hr_neg) = &batch.hr_negative_prompts
    {
        check_len("hr_negative_prompts", hr_neg, expected)?;
    }

    let rewriter = PromptRewriter::new(options.rewrite);
    let mut metadata = BTreeMap::new();

    for (iteration, offset, index) in layout.positions() {
        let original = std::mem::take(&mut batch.prompts[index]);
        let prompt = rewriter.rewrite(&original);
        tracing::debug!("[B{iteration:02}][I{offset:02}] prompt: {prompt}");
        if index == 0 && prompt != original {
            metadata.insert(ORIGINAL_PROMPT_KEY.to_string(), original);
        }

        let mut negative = None;
        if options.rewrite_negative {
            let original = std::mem::take(&mut batch.negative_prompts[index]);
            let rewritten = rewriter.rewrite(&original);
            tracing::debug!("[B{iteration:02}][I{offset:02}] neg prompt: {rewritten}");
            if index == 0 && rewritten != original {
                metadata.insert(ORIGINAL_NEGATIVE_PROMPT_KEY.to_string(), original);
            }
            batch.negative_prompts[index] = rewritten.clone();
            negative = Some(rewritten);
        }

        if let Some(hr_prompts) = batch.hr_prompts.as_mut() {
            let hr_prompt = rewriter.rewrite(&hr_prompts[index]);
            if hr_prompt != prompt {
                tracing::debug!("[B{iteration:02}][I{offset:02}] HR prompt: {hr_prompt}");
            }
            hr_prompts[index] = hr_prompt;
        }

        if let Some(negative) = negative
            && let Some(hr_negatives) = batch.hr_negative_prompts.as_mut()
        {
            let hr_negative = rewriter.rewrite(&hr_negatives[index]);
            if hr_negative != negative {
                tracing::debug!("[B{iteration:02}][I{offset:02}] HR neg prompt: {hr_negative}");
            }
            hr_negatives[index] = hr_negative;
        }

        batch.prompts[index] = prompt;
    }

    tracing::info!(prompts = expected, "tag separator processing done");

    Ok(BatchOutcome { batch, metadata })
}

pub mod batch;
pub mod config;
pub mod restore;
pub mod rewriter;
pub mod separator;

pub use batch::{
    BatchError, BatchLayout, BatchOptions, BatchOutcome, ORIGINAL_NEGATIVE_PROMPT_KEY,
    ORIGINAL_PROMPT_KEY, PromptBatch, rewrite_batch,
};
pub use config::{ConfigError, RewriterConfigBuilder};
pub use restore::restore_prompt;
pub use rewriter::{PromptRewriter, RewriteOptions, RewrittenPair, rewrite_prompt};
pub use separator::{Separator, SeparatorError, SeparatorInfo, SeparatorRole};

//! Library integration tests.
//!
//! These use only types exported from the `tagsep` crate root, the same surface
//! a node-graph or pipeline adapter would call into. None of the CLI types
//! (clap parsers, subcommands) are reachable from here.

use anyhow::Result;
use tagsep::{
    BatchLayout, BatchOptions, ORIGINAL_NEGATIVE_PROMPT_KEY, ORIGINAL_PROMPT_KEY, PromptBatch,
    PromptRewriter, RewriteOptions, RewriterConfigBuilder, Separator, SeparatorRole,
    restore_prompt, rewrite_batch, rewrite_prompt,
};

fn options(tag: Separator, word: Separator, ignore_meta: bool) -> RewriteOptions {
    RewriteOptions::new(tag, word, ignore_meta).expect("valid options")
}

#[test]
fn node_style_call_returns_positive_and_negative() -> Result<()> {
    let rewriter = PromptRewriter::new(options(Separator::Comma, Separator::Underscore, true));

    let pair = rewriter.rewrite_pair("photo of a cat, HDR", Some("low quality, blurry"));

    assert_eq!(pair.positive, "photo_of_a_cat,HDR");
    assert_eq!(pair.negative.as_deref(), Some("low_quality,blurry"));
    Ok(())
}

#[test]
fn rewriter_is_shareable_across_threads() {
    let rewriter = PromptRewriter::new(options(Separator::Comma, Separator::Dash, false));
    let prompts: Vec<String> = (0..16).map(|i| format!("tag {i}, other tag")).collect();

    let rewriter = &rewriter;
    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = prompts
            .iter()
            .map(|prompt| scope.spawn(move || rewriter.rewrite(prompt)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rewrite thread panicked"))
            .collect()
    });

    for (i, output) in outputs.iter().enumerate() {
        assert_eq!(output, &format!("tag-{i},other-tag"));
    }
}

#[test]
fn rewrite_then_restore_recovers_simple_prompts() {
    let prompt = "long hair, blue eyes, school uniform";
    for (tag, word) in [
        (Separator::Comma, Separator::Underscore),
        (Separator::Break, Separator::Dash),
        (Separator::Slash, Separator::Plus),
    ] {
        let rewritten = rewrite_prompt(prompt, &options(tag, word, false));
        assert_eq!(restore_prompt(&rewritten, tag, word), prompt, "{tag}/{word}");
    }
}

#[test]
fn every_palette_combination_rewrites_without_panicking() {
    let prompt = "  a <b c:1>, DEF g\th,\n<unterminated, 'QUOTED' x ";
    for tag in Separator::for_role(SeparatorRole::Tag) {
        for word in Separator::for_role(SeparatorRole::Word) {
            for ignore_meta in [true, false] {
                let output = rewrite_prompt(prompt, &options(tag, word, ignore_meta));
                assert!(output.contains("<b c:1>"));
                assert_eq!(output.trim(), output);
            }
        }
    }
}

#[test]
fn batch_fan_out_with_hires_prompts() -> Result<()> {
    let batch = PromptBatch {
        prompts: vec!["a b".into(), "c d".into(), "e f".into(), "g h".into()],
        negative_prompts: vec!["n m".into(); 4],
        hr_prompts: Some(vec!["a b".into(), "c d".into(), "e f".into(), "g h".into()]),
        hr_negative_prompts: Some(vec!["n m".into(); 4]),
    };
    let batch_options = BatchOptions {
        enabled: true,
        rewrite_negative: true,
        rewrite: options(Separator::Comma, Separator::Underscore, true),
    };

    let outcome = rewrite_batch(batch, BatchLayout::new(2, 2), &batch_options)?;

    assert_eq!(outcome.batch.prompts, vec!["a_b", "c_d", "e_f", "g_h"]);
    assert_eq!(outcome.batch.hr_prompts, Some(outcome.batch.prompts.clone()));
    assert_eq!(outcome.batch.negative_prompts, vec!["n_m"; 4]);
    assert_eq!(outcome.metadata[ORIGINAL_PROMPT_KEY], "a b");
    assert_eq!(outcome.metadata[ORIGINAL_NEGATIVE_PROMPT_KEY], "n m");
    Ok(())
}

#[test]
fn config_builder_produces_validated_options() {
    let result = RewriterConfigBuilder::new()
        .tag_separator(Separator::Empty)
        .word_separator(Separator::Dash)
        .ignore_meta_keywords(true)
        .build();
    assert!(result.is_err());

    let options = RewriterConfigBuilder::new()
        .tag_separator(Separator::Break)
        .word_separator(Separator::Empty)
        .ignore_meta_keywords(false)
        .build()
        .expect("BREAK and Empty are valid in their roles");
    assert_eq!(options.tag_literal(), " BREAK ");
    assert_eq!(options.word_literal(), "");
}

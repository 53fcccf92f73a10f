use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

fn rewriter(tag: Separator, word: Separator, ignore_meta: bool) -> PromptRewriter {
    PromptRewriter::new(RewriteOptions::new(tag, word, ignore_meta).expect("valid options"))
}

const MIXED: &str = "a cat, BLUE sky, <lora:foo:0.8>";

#[test]
fn splits_meta_keywords_when_enabled() {
    let r = rewriter(Separator::Comma, Separator::Dash, true);
    assert_eq!(r.tags(MIXED), vec!["a cat", "BLUE", "sky", "<lora:foo:0.8>"]);
    assert_eq!(r.rewrite(MIXED), "a-cat,BLUE,sky,<lora:foo:0.8>");
}

#[test]
fn keeps_meta_keywords_inline_when_disabled() {
    let r = rewriter(Separator::Comma, Separator::Dash, false);
    assert_eq!(r.tags(MIXED), vec!["a cat", "BLUE sky", "<lora:foo:0.8>"]);
    assert_eq!(r.rewrite(MIXED), "a-cat,BLUE-sky,<lora:foo:0.8>");
}

#[test]
fn space_tag_separator_with_unmodified_words() {
    let r = rewriter(Separator::Space, Separator::Unmodified, true);
    assert_eq!(r.rewrite("  red   car ,,  fast "), "red car fast");
}

#[test]
fn empty_input_gives_empty_output() {
    for tag in Separator::for_role(SeparatorRole::Tag) {
        for word in Separator::for_role(SeparatorRole::Word) {
            for ignore_meta in [true, false] {
                assert_eq!(rewriter(tag, word, ignore_meta).rewrite(""), "");
            }
        }
    }
}

#[test]
fn break_tag_separator_stands_alone() {
    let r = rewriter(Separator::Break, Separator::Dash, true);
    assert_eq!(r.rewrite("a b, c d"), "a-b BREAK c-d");
}

#[test]
fn whitespace_only_prompt_gives_empty_output() {
    let r = rewriter(Separator::Comma, Separator::Dash, true);
    assert_eq!(r.rewrite(" \n\t ,  , "), "");
}

#[test]
fn multiline_prompt_is_flattened() {
    let r = rewriter(Separator::CommaSpace, Separator::Underscore, false);
    assert_eq!(
        r.rewrite("long hair,\nblue   eyes,\r\n\tsmiling"),
        "long_hair, blue_eyes, smiling"
    );
}

#[test]
fn annotation_block_spacing_survives_word_substitution() {
    let r = rewriter(Separator::Comma, Separator::Empty, true);
    assert_eq!(
        r.rewrite("soft light <lyco:my style:0.5> film grain"),
        "softlight,<lyco:my style:0.5>,filmgrain"
    );
}

#[test]
fn all_caps_annotation_is_not_a_meta_keyword() {
    let r = rewriter(Separator::Comma, Separator::Dash, true);
    assert_eq!(r.tags("<LORA:FOO:1> BAR"), vec!["<LORA:FOO:1>", "BAR"]);
}

#[test]
fn meta_keyword_between_words_becomes_its_own_tag() {
    let r = rewriter(Separator::CommaSpace, Separator::Unmodified, true);
    assert_eq!(
        r.rewrite("red dress BREAK blue sky AND green grass"),
        "red dress, BREAK, blue sky, AND, green grass"
    );
}

#[test]
fn unterminated_bracket_is_plain_text() {
    let r = rewriter(Separator::Comma, Separator::Dash, false);
    assert_eq!(r.rewrite("a <b c, d"), "a-<b-c,d");
}

#[test]
fn tags_are_never_reordered_or_deduplicated() {
    let r = rewriter(Separator::Comma, Separator::Unmodified, false);
    assert_eq!(r.rewrite("b, a, b, a"), "b,a,b,a");
}

#[test]
fn colliding_separators_still_rewrite() {
    let options = RewriteOptions::new(Separator::Dash, Separator::Dash, false).unwrap();
    assert!(options.separators_collide());
    assert_eq!(rewrite_prompt("a b, c", &options), "a-b-c");
}

#[test]
fn space_tag_separator_collides_with_unmodified_words() {
    let options = RewriteOptions::new(Separator::Space, Separator::Unmodified, true).unwrap();
    assert!(options.separators_collide());

    let options = RewriteOptions::default();
    assert!(!options.separators_collide());
}

#[test]
fn break_keywords_survive_break_separator() {
    let r = rewriter(Separator::Break, Separator::Space, true);
    assert_eq!(r.rewrite("a, BREAK, b"), "a BREAK BREAK BREAK b");
}

#[test]
fn rewrite_is_idempotent_for_comma_separators() {
    let prompts = [
        MIXED,
        "  red   car ,,  fast ",
        "masterpiece, ADDROW\nportrait <lora:x:1>   photo",
    ];
    for tag in [Separator::Comma, Separator::CommaSpace] {
        let r = rewriter(tag, Separator::Unmodified, true);
        for prompt in prompts {
            let once = r.rewrite(prompt);
            assert_eq!(r.rewrite(&once), once, "not idempotent for {prompt:?}");
        }
    }
}

#[test]
fn annotation_blocks_only_lose_repeated_spaces() {
    let prompt = "x, <hypernet:a  b:0.3>, y";
    for word in Separator::for_role(SeparatorRole::Word) {
        let out = rewriter(Separator::Comma, word, true).rewrite(prompt);
        assert!(
            out.contains("<hypernet:a b:0.3>"),
            "block changed with {word}: {out}"
        );
    }
}

#[test]
fn tag_count_matches_segments() {
    let r = rewriter(Separator::Comma, Separator::Unmodified, true);
    let prompt = "one, two three,, FOUR five, <six:1>";
    let tags = r.tags(prompt);
    assert_eq!(tags, vec!["one", "two three", "FOUR", "five", "<six:1>"]);
    assert_eq!(r.rewrite(prompt).split(',').count(), tags.len());
}

#[test]
fn rewrite_pair_handles_missing_negative() {
    let r = rewriter(Separator::Comma, Separator::Underscore, false);
    let pair = r.rewrite_pair("a b, c", None);
    assert_eq!(pair.positive, "a_b,c");
    assert_eq!(pair.negative, None);

    let pair = r.rewrite_pair("a b", Some("bad hands, blurry photo"));
    assert_eq!(pair.negative.as_deref(), Some("bad_hands,blurry_photo"));
}

#[test]
fn options_reject_role_violations() {
    assert!(RewriteOptions::new(Separator::Empty, Separator::Dash, true).is_err());
    assert!(RewriteOptions::new(Separator::Comma, Separator::Break, true).is_err());
    assert!(RewriteOptions::new(Separator::Break, Separator::Empty, true).is_ok());
}

#[test]
fn options_deserialize_with_validation() {
    let options: RewriteOptions = serde_json::from_str(
        r#"{"tag_separator":"Comma","word_separator":"Dash","ignore_meta_keywords":false}"#,
    )
    .unwrap();
    assert_eq!(options.tag_separator(), Separator::Comma);
    assert!(!options.ignore_meta_keywords());

    let defaults: RewriteOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(defaults, RewriteOptions::default());

    let invalid: Result<RewriteOptions, _> =
        serde_json::from_str(r#"{"tag_separator":"Empty"}"#);
    assert!(invalid.is_err());
}

struct WarnCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn warnings_while(f: impl FnOnce()) -> usize {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&count)));
    tracing::subscriber::with_default(subscriber, f);
    count.load(Ordering::SeqCst)
}

#[test]
fn same_word_and_tag_separator_logs_a_warning() {
    let warnings = warnings_while(|| {
        let _ = rewriter(Separator::Dash, Separator::Dash, false);
    });
    assert_eq!(warnings, 1);

    let warnings = warnings_while(|| {
        let _ = PromptRewriter::new(RewriteOptions::default());
        let _ = rewriter(Separator::Comma, Separator::Dash, true);
    });
    assert_eq!(warnings, 0);
}

use super::*;
use crate::llm::{LanguageModel, SamplingParams};
use async_trait::async_trait;

/// Tokenizer where one token is one byte, so budgets are easy to reason
/// about in tests. Completion is canned.
struct ByteTokenizer;

#[async_trait]
impl LanguageModel for ByteTokenizer {
    async fn tokenize(&self, text: &str) -> crate::Result<Vec<i32>> {
        Ok(text.bytes().map(i32::from).collect())
    }

    async fn detokenize(&self, tokens: &[i32]) -> crate::Result<String> {
        let bytes: Vec<u8> = tokens.iter().map(|t| *t as u8).collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn complete(&self, _prompt: &str, _params: &SamplingParams) -> crate::Result<String> {
        Ok("answer".to_string())
    }
}

fn budget(context_window: u32, reserved_output: u32, safety_margin: u32) -> TokenBudget {
    TokenBudget {
        context_window,
        reserved_output,
        safety_margin,
    }
}

#[test]
fn max_prompt_tokens_subtracts_reservations() {
    assert_eq!(
        budget(4096, 512, 50)
            .max_prompt_tokens()
            .expect("budget is positive"),
        3534
    );
}

#[test]
fn exhausted_budget_is_context_overflow() {
    let err = budget(100, 90, 10)
        .max_prompt_tokens()
        .expect_err("zero budget must fail");
    assert!(matches!(err, crate::RagError::ContextOverflow(_)));

    let err = budget(100, 90, 20)
        .max_prompt_tokens()
        .expect_err("negative budget must fail");
    assert!(matches!(err, crate::RagError::ContextOverflow(_)));
}

#[tokio::test]
async fn short_context_passes_through_unchanged() {
    let texts = vec!["first passage".to_string(), "second passage".to_string()];
    let context = build_context(&ByteTokenizer, &texts, &budget(1000, 100, 50))
        .await
        .expect("should build context");
    assert_eq!(context, "first passage\nsecond passage");
}

#[tokio::test]
async fn empty_input_yields_empty_context() {
    let context = build_context(&ByteTokenizer, &[], &budget(1000, 100, 50))
        .await
        .expect("should build context");
    assert!(context.is_empty());
}

#[tokio::test]
async fn oversized_context_is_trimmed_to_exact_budget() {
    // 200 tokens of input against a budget of 100 - 60 - 10 = 30
    let texts = vec!["a".repeat(200)];
    let context = build_context(&ByteTokenizer, &texts, &budget(100, 60, 10))
        .await
        .expect("should build context");

    let tokens = ByteTokenizer
        .tokenize(&context)
        .await
        .expect("should tokenize");
    assert_eq!(tokens.len(), 30);
}

#[tokio::test]
async fn single_passage_larger_than_whole_budget() {
    let texts = vec!["x".repeat(10_000)];
    let b = budget(100, 60, 10);
    let context = build_context(&ByteTokenizer, &texts, &b)
        .await
        .expect("should build context");

    let tokens = ByteTokenizer
        .tokenize(&context)
        .await
        .expect("should tokenize");
    assert!(tokens.len() <= b.max_prompt_tokens().expect("budget is positive"));
}

#[tokio::test]
async fn trimming_drops_trailing_texts_first() {
    // "best" fits entirely within the 30-token budget; the lower-ranked
    // filler is what gets cut
    let texts = vec!["best match content".to_string(), "z".repeat(500)];
    let context = build_context(&ByteTokenizer, &texts, &budget(100, 60, 10))
        .await
        .expect("should build context");
    assert!(context.starts_with("best match content"));
    assert!(context.len() < 500);
}

#[tokio::test]
async fn trimming_is_deterministic() {
    let texts = vec!["lorem ipsum dolor sit amet ".repeat(20)];
    let b = budget(128, 64, 14);

    let first = build_context(&ByteTokenizer, &texts, &b)
        .await
        .expect("should build context");
    let second = build_context(&ByteTokenizer, &texts, &b)
        .await
        .expect("should build context");
    assert_eq!(first, second);
}

#[tokio::test]
async fn never_exceeds_budget_across_input_sizes() {
    let b = budget(256, 128, 28);
    let max = b.max_prompt_tokens().expect("budget is positive");

    for size in [0usize, 1, 50, 99, 100, 101, 1000, 5000] {
        let texts = vec!["w".repeat(size)];
        let context = build_context(&ByteTokenizer, &texts, &b)
            .await
            .expect("should build context");
        let tokens = ByteTokenizer
            .tokenize(&context)
            .await
            .expect("should tokenize");
        assert!(
            tokens.len() <= max,
            "context of {} tokens exceeds budget {} for input size {}",
            tokens.len(),
            max,
            size
        );
    }
}

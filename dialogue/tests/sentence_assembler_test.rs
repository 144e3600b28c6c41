//! Integration tests for [`dialogue::assemble`]: token streams in, sentence streams out.

use dialogue::assemble;
use futures::stream::{self, StreamExt, TryStreamExt};

async fn sentences(tokens: &[&str]) -> Vec<String> {
    let tokens: Vec<Result<String, String>> = tokens.iter().map(|t| Ok(t.to_string())).collect();
    assemble(stream::iter(tokens)).try_collect().await.unwrap()
}

/// **Test: Tokens up to a terminal punctuation mark form one sentence**
#[tokio::test]
async fn test_single_sentence() {
    assert_eq!(sentences(&["Hello", " ", "world", "."]).await, vec!["Hello world."]);
}

/// **Test: Several sentences come out in order, trimmed**
#[tokio::test]
async fn test_sentences_in_order() {
    assert_eq!(
        sentences(&["First", ".", " Second", "!"]).await,
        vec!["First.", "Second!"]
    );
}

/// **Test: Empty input yields no sentence and completes**
#[tokio::test]
async fn test_empty_input() {
    assert!(sentences(&[]).await.is_empty());
}

/// **Test: Trailing text without punctuation is flushed at the end**
#[tokio::test]
async fn test_remainder_flushed() {
    assert_eq!(
        sentences(&["Really", "?", " I", " think", " so"]).await,
        vec!["Really?", "I think so"]
    );
}

/// **Test: Korean declarative endings close a sentence**
#[tokio::test]
async fn test_korean_ending() {
    assert_eq!(
        sentences(&["좋", "습니다.", " 감사합니다", "!"]).await,
        vec!["좋습니다.", "감사합니다!"]
    );
}

/// **Test: Whitespace-only segments are dropped**
#[tokio::test]
async fn test_blank_sentences_skipped() {
    assert_eq!(sentences(&["Hi.", "  ", "\n"]).await, vec!["Hi."]);
}

/// **Test: An error ends the stream after the sentences before it**
#[tokio::test]
async fn test_error_ends_stream() {
    let tokens = vec![
        Ok("One.".to_string()),
        Ok(" Two".to_string()),
        Err("broken"),
        Ok(" Three.".to_string()),
    ];
    let items: Vec<Result<String, &str>> = assemble(stream::iter(tokens)).collect().await;
    assert_eq!(items, vec![Ok("One.".to_string()), Err("broken")]);
}

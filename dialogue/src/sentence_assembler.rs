//! Groups streamed LLM tokens into sentences.

use futures::stream::{self, BoxStream, Stream, StreamExt};

/// A token ending (after trimming) with one of these closes a sentence.
const SENTENCE_ENDINGS: [&str; 4] = [".", "!", "?", "다."];

pub fn is_sentence_end(token: &str) -> bool {
    let trimmed = token.trim();
    !trimmed.is_empty() && SENTENCE_ENDINGS.iter().any(|end| trimmed.ends_with(end))
}

/// Incremental assembler: feed tokens with [`push`](Self::push), flush with [`finish`](Self::finish).
///
/// Sentences are the concatenated tokens, trimmed. Blank sentences are never returned.
#[derive(Debug, Default)]
pub struct SentenceAssembler {
    buffer: String,
}

impl SentenceAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a sentence when `token` ends one.
    pub fn push(&mut self, token: &str) -> Option<String> {
        self.buffer.push_str(token);
        if is_sentence_end(token) {
            self.take()
        } else {
            None
        }
    }

    /// Whatever is buffered once the token stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        let sentence = self.buffer.trim().to_string();
        self.buffer.clear();
        (!sentence.is_empty()).then_some(sentence)
    }
}

/// Maps a token stream onto a sentence stream. The first error is passed through and ends the stream.
pub fn assemble<S, E>(tokens: S) -> BoxStream<'static, Result<String, E>>
where
    S: Stream<Item = Result<String, E>> + Send + 'static,
    E: Send + 'static,
{
    let state = (tokens.boxed(), SentenceAssembler::new(), false);
    stream::unfold(state, |(mut tokens, mut assembler, done)| async move {
        if done {
            return None;
        }
        loop {
            match tokens.next().await {
                Some(Ok(token)) => {
                    if let Some(sentence) = assembler.push(&token) {
                        return Some((Ok(sentence), (tokens, assembler, false)));
                    }
                }
                Some(Err(e)) => return Some((Err(e), (tokens, assembler, true))),
                None => {
                    return assembler
                        .finish()
                        .map(|sentence| (Ok(sentence), (tokens, assembler, true)));
                }
            }
        }
    })
    .boxed()
}

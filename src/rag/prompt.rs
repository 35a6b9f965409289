//! Prompt assembly and input-budget truncation.

use std::path::Path;
use std::sync::Arc;

use tokenizers::Tokenizer;

use super::RetrievedSet;

/// Joins document texts with a single space, in retrieval order.
///
/// An empty set yields the empty string, which the pipeline treats as
/// "no usable context".
pub fn assemble(docs: &RetrievedSet) -> String {
    docs.documents()
        .iter()
        .map(|hit| hit.document.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cuts prompts down to the model's input budget, keeping the earliest tokens.
#[derive(Clone)]
pub struct PromptTruncator {
    max_tokens: usize,
    tokenizer: Option<Arc<Tokenizer>>,
}

impl PromptTruncator {
    /// Counts whitespace-delimited words as tokens.
    pub fn words(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            tokenizer: None,
        }
    }

    /// Counts tokens with a HuggingFace `tokenizer.json`.
    pub fn from_tokenizer_file(path: &Path, max_tokens: usize) -> Result<Self, String> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| format!("failed to load tokenizer {}: {}", path.display(), e))?;
        Ok(Self {
            max_tokens,
            tokenizer: Some(Arc::new(tokenizer)),
        })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Longest prefix of `prompt` holding at most `max_tokens` tokens.
    ///
    /// When the tokenizer cannot encode the prompt, words are counted against
    /// a reduced budget, since one word usually spans several tokens.
    pub fn truncate<'a>(&self, prompt: &'a str) -> &'a str {
        let Some(tokenizer) = &self.tokenizer else {
            return word_prefix(prompt, self.max_tokens);
        };

        match tokenizer_prefix(tokenizer, prompt, self.max_tokens) {
            Some(prefix) => prefix,
            None => {
                let max_words = fallback_word_budget(self.max_tokens);
                tracing::warn!(
                    max_tokens = self.max_tokens,
                    max_words,
                    "Tokenizer could not encode prompt; counting words instead"
                );
                word_prefix(prompt, max_words)
            }
        }
    }
}

/// Half the token budget, but at least one word for a non-zero budget.
fn fallback_word_budget(max_tokens: usize) -> usize {
    match max_tokens {
        0 => 0,
        n => (n / 2).max(1),
    }
}

fn tokenizer_prefix<'a>(tokenizer: &Tokenizer, text: &'a str, max_tokens: usize) -> Option<&'a str> {
    let encoding = tokenizer.encode(text, false).ok()?;
    let offsets = encoding.get_offsets();
    if offsets.len() <= max_tokens {
        return Some(text);
    }
    if max_tokens == 0 {
        return Some("");
    }
    let (_, end) = offsets[max_tokens - 1];
    text.get(..end)
}

fn word_prefix(text: &str, max_tokens: usize) -> &str {
    if max_tokens == 0 {
        return "";
    }

    let mut words = 0;
    let mut in_word = false;
    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if in_word && words == max_tokens {
                return &text[..idx];
            }
            in_word = false;
        } else if !in_word {
            in_word = true;
            words += 1;
        }
    }
    text
}

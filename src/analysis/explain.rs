//! Word-level explainability
//!
//! Ranks the words the model reported as influential and locates them in
//! the analyzed text.

use regex::Regex;
use serde::Serialize;

use super::types::{confidence_level, Sentiment};
use crate::client::ExplainResponse;

/// One influential word and its importance score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordImportance {
    pub word: String,
    pub importance: f64,
}

/// A classification together with its ranked influential words
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub text: String,
    pub sentiment: Sentiment,
    pub probability: f64,
    pub confidence: String,
    /// Sorted by importance, highest first
    pub words: Vec<WordImportance>,
}

impl Explanation {
    /// Build from an API response, dropping entries without a word
    pub fn from_response(response: ExplainResponse, fallback_text: &str) -> Self {
        let mut words: Vec<WordImportance> = response
            .words
            .into_iter()
            .filter_map(|entry| match entry.word {
                Some(word) if !word.trim().is_empty() => Some(WordImportance {
                    word,
                    importance: entry.importance,
                }),
                _ => {
                    tracing::warn!(
                        importance = entry.importance,
                        "Skipping incomplete word entry"
                    );
                    None
                }
            })
            .collect();

        words.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        let text = if response.text.trim().is_empty() {
            fallback_text.to_string()
        } else {
            response.text
        };

        Self {
            text,
            sentiment: response.sentiment,
            probability: response.probability,
            confidence: response
                .confidence
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| confidence_level(response.probability).to_string()),
            words,
        }
    }

    /// Split the analyzed text into plain and highlighted spans
    pub fn spans(&self) -> Vec<TextSpan> {
        highlight_spans(&self.text, &self.words)
    }
}

/// A piece of the analyzed text; `importance` is set on highlighted words
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSpan {
    pub text: String,
    pub importance: Option<f64>,
}

impl TextSpan {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            importance: None,
        }
    }

    fn highlighted(text: &str, importance: f64) -> Self {
        Self {
            text: text.to_string(),
            importance: Some(importance),
        }
    }

    pub fn is_highlighted(&self) -> bool {
        self.importance.is_some()
    }
}

/// Mark whole-word, case-insensitive occurrences of each word in `text`
///
/// Words are applied in the given order; a later word never overlaps a
/// span already claimed by an earlier one.
pub fn highlight_spans(text: &str, words: &[WordImportance]) -> Vec<TextSpan> {
    let mut marks: Vec<(usize, usize, f64)> = Vec::new();

    for word in words {
        let term = word.word.trim();
        if term.is_empty() {
            continue;
        }

        let re = match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))) {
            Ok(re) => re,
            Err(e) => {
                tracing::debug!(word = %term, error = %e, "Cannot build highlight pattern");
                continue;
            }
        };

        for m in re.find_iter(text) {
            let overlaps = marks
                .iter()
                .any(|(start, end, _)| m.start() < *end && *start < m.end());
            if !overlaps {
                marks.push((m.start(), m.end(), word.importance));
            }
        }
    }

    marks.sort_by_key(|(start, _, _)| *start);

    let mut spans = Vec::with_capacity(marks.len() * 2 + 1);
    let mut cursor = 0;
    for (start, end, importance) in marks {
        if start > cursor {
            spans.push(TextSpan::plain(&text[cursor..start]));
        }
        spans.push(TextSpan::highlighted(&text[start..end], importance));
        cursor = end;
    }
    if cursor < text.len() {
        spans.push(TextSpan::plain(&text[cursor..]));
    }

    spans
}

/// Display form of an importance score: ten times the raw value, one decimal
pub fn importance_percent(importance: f64) -> String {
    format!("{:.1}%", importance * 10.0)
}

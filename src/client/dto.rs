//! Request/response bodies of the sentiment API
//!
//! Field names follow the service's Spanish wire format; the Rust side
//! uses English names with serde renames.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::analysis::Sentiment;

// ============================================
// Requests
// ============================================

/// Body of `POST /sentiment`
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    pub text: String,
    #[serde(rename = "idioma")]
    pub language: String,
    pub threshold: f64,
}

/// Body of `POST /sentiment/explain`
#[derive(Debug, Clone, Serialize)]
pub struct ExplainRequest {
    pub text: String,
    #[serde(rename = "idioma")]
    pub language: String,
    #[serde(rename = "topN")]
    pub top_n: usize,
}

/// Body of `POST /sentiment/batch`
#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest {
    #[serde(rename = "textos")]
    pub texts: Vec<String>,
    #[serde(rename = "idioma")]
    pub language: String,
}

// ============================================
// Responses
// ============================================

/// Response of `POST /sentiment`
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(rename = "texto", default)]
    pub text: String,
    #[serde(rename = "prevision")]
    pub sentiment: Sentiment,
    #[serde(rename = "probabilidad")]
    pub probability: f64,
    #[serde(rename = "confianza", default)]
    pub confidence: Option<String>,
    #[serde(rename = "idiomaDetectado", alias = "idioma_detectado", default)]
    pub detected_language: Option<String>,
}

/// Response of `POST /sentiment/explain`
#[derive(Debug, Clone, Deserialize)]
pub struct ExplainResponse {
    #[serde(rename = "texto", default)]
    pub text: String,
    #[serde(rename = "prevision", alias = "sentimiento")]
    pub sentiment: Sentiment,
    #[serde(rename = "probabilidad")]
    pub probability: f64,
    #[serde(rename = "confianza", default)]
    pub confidence: Option<String>,
    /// Sent either as an array or as a map keyed by position
    #[serde(
        rename = "palabrasImportantes",
        alias = "palabras_importantes",
        default,
        deserialize_with = "deserialize_words"
    )]
    pub words: Vec<ImportantWord>,
}

/// One entry of `palabrasImportantes`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportantWord {
    pub word: Option<String>,
    /// `importancia`, else `peso`, else `0`
    pub importance: f64,
}

#[derive(Debug, Deserialize)]
struct RawWord {
    #[serde(rename = "palabra", default)]
    word: Option<String>,
    #[serde(rename = "importancia", default)]
    importance: Option<f64>,
    #[serde(rename = "peso", default)]
    weight: Option<f64>,
}

impl From<RawWord> for ImportantWord {
    fn from(raw: RawWord) -> Self {
        Self {
            word: raw.word,
            importance: raw.importance.or(raw.weight).unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WordsShape {
    List(Vec<RawWord>),
    Keyed(BTreeMap<String, RawWord>),
}

fn deserialize_words<'de, D>(deserializer: D) -> Result<Vec<ImportantWord>, D::Error>
where
    D: Deserializer<'de>,
{
    let words = match Option::<WordsShape>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(WordsShape::List(list)) => list.into_iter().map(ImportantWord::from).collect(),
        Some(WordsShape::Keyed(map)) => {
            // positional keys ("0", "1", ..., "10") in numeric order
            let mut entries: Vec<(String, RawWord)> = map.into_iter().collect();
            entries.sort_by_key(|(key, _)| key.parse::<u64>().unwrap_or(u64::MAX));
            entries
                .into_iter()
                .map(|(_, raw)| ImportantWord::from(raw))
                .collect()
        }
    };
    Ok(words)
}

/// Response of `POST /sentiment/batch`
///
/// Aggregate fields are optional; missing ones are derived from `resultados`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(rename = "positivos", default)]
    pub positives: Option<usize>,
    #[serde(rename = "negativos", default)]
    pub negatives: Option<usize>,
    #[serde(rename = "porcentajePositivos", default)]
    pub positive_percent: Option<f64>,
    #[serde(rename = "resultados", default)]
    pub results: Vec<BatchItemResponse>,
}

/// One element of `resultados`
#[derive(Debug, Clone, Deserialize)]
pub struct BatchItemResponse {
    #[serde(rename = "texto", default)]
    pub text: String,
    #[serde(rename = "prevision")]
    pub sentiment: Sentiment,
    #[serde(rename = "probabilidad")]
    pub probability: f64,
    #[serde(rename = "confianza", default)]
    pub confidence: Option<String>,
}

/// Body of a non-2xx response
///
/// `/sentiment` and `/sentiment/batch` use `message`; `/sentiment/explain`
/// uses `detail`, which may also be a structured validation report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// The most useful message in the body, if any
    pub fn into_message(self) -> Option<String> {
        let message = self.message.filter(|m| !m.trim().is_empty());
        message.or_else(|| match self.detail {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(serde_json::Value::Null) | None => None,
            Some(serde_json::Value::String(_)) => None,
            Some(other) => Some(other.to_string()),
        })
    }
}

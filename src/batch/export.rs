//! Batch result exports
//!
//! - CSV: `numero,texto,sentimiento,probabilidad,confianza`
//! - JSON: timestamped envelope with aggregate counts and per-item rows
//!
//! Probabilities are written as two-decimal percentages in both formats.

use chrono::{DateTime, SecondsFormat, Utc};
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;

use super::result::BatchResult;
use crate::analysis::format_percent;
use crate::error::{Error, Result, ValidationError};

/// Header line of the CSV export
pub const CSV_HEADER: &str = "numero,texto,sentimiento,probabilidad,confianza";

/// Format as CSV
///
/// Non-numeric fields are quoted, embedded quotes doubled.
pub fn to_csv(result: &BatchResult) -> Result<String> {
    if result.is_empty() {
        return Err(ValidationError::NothingToExport.into());
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(Vec::new());

    for (index, item) in result.items.iter().enumerate() {
        writer
            .write_record([
                (index + 1).to_string(),
                item.text.clone(),
                item.sentiment.wire_label().to_string(),
                format_percent(item.probability),
                item.confidence.clone(),
            ])
            .map_err(|e| Error::Export(e.to_string()))?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))?;
    let body = String::from_utf8(body).map_err(|e| Error::Export(e.to_string()))?;

    let mut csv = String::with_capacity(CSV_HEADER.len() + 1 + body.len());
    csv.push_str(CSV_HEADER);
    csv.push('\n');
    csv.push_str(&body);
    Ok(csv)
}

#[derive(Serialize)]
struct JsonExport<'a> {
    #[serde(rename = "fecha")]
    generated_at: String,
    total: usize,
    #[serde(rename = "positivos")]
    positives: usize,
    #[serde(rename = "negativos")]
    negatives: usize,
    #[serde(rename = "resultados")]
    results: Vec<JsonExportRow<'a>>,
}

#[derive(Serialize)]
struct JsonExportRow<'a> {
    #[serde(rename = "numero")]
    number: usize,
    #[serde(rename = "texto")]
    text: &'a str,
    #[serde(rename = "sentimiento")]
    sentiment: &'static str,
    #[serde(rename = "probabilidad")]
    probability: String,
    #[serde(rename = "confianza")]
    confidence: &'a str,
}

/// Format as pretty-printed JSON
///
/// Counts in the envelope are taken from the exported rows.
pub fn to_json(result: &BatchResult, generated_at: DateTime<Utc>) -> Result<String> {
    if result.is_empty() {
        return Err(ValidationError::NothingToExport.into());
    }

    let positives = result
        .items
        .iter()
        .filter(|item| item.sentiment.is_positive())
        .count();

    let export = JsonExport {
        generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        total: result.items.len(),
        positives,
        negatives: result.items.len() - positives,
        results: result
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| JsonExportRow {
                number: index + 1,
                text: &item.text,
                sentiment: item.sentiment.wire_label(),
                probability: format_percent(item.probability),
                confidence: &item.confidence,
            })
            .collect(),
    };

    serde_json::to_string_pretty(&export).map_err(|e| Error::Export(e.to_string()))
}

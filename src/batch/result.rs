//! Batch results

use serde::Serialize;

use crate::analysis::{confidence_level, Sentiment};
use crate::client::BatchResponse;

/// Classification of one text of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub text: String,
    pub sentiment: Sentiment,
    pub probability: f64,
    pub confidence: String,
}

/// Aggregate and per-item outcome of one batch run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    /// Share of positive texts, `0..=100`
    pub positive_percent: f64,
    /// In submission order
    pub items: Vec<BatchItem>,
}

/// `positives / total * 100`, or `0` for an empty batch
pub fn positive_percent(positives: usize, total: usize) -> f64 {
    if total > 0 {
        positives as f64 * 100.0 / total as f64
    } else {
        0.0
    }
}

impl BatchResult {
    /// Build from the service response
    ///
    /// Aggregates the server omitted are derived from the items, and a
    /// missing `porcentajePositivos` is recomputed from the counts shown.
    pub fn from_response(response: BatchResponse) -> Self {
        let items: Vec<BatchItem> = response
            .results
            .into_iter()
            .map(|item| BatchItem {
                confidence: item
                    .confidence
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| confidence_level(item.probability).to_string()),
                text: item.text,
                sentiment: item.sentiment,
                probability: item.probability,
            })
            .collect();

        let counted_positive = items.iter().filter(|i| i.sentiment.is_positive()).count();

        let total = response.total.unwrap_or(items.len());
        let positive = response.positives.unwrap_or(counted_positive);
        let negative = response
            .negatives
            .unwrap_or_else(|| total.saturating_sub(positive));
        let positive_percent = response
            .positive_percent
            .unwrap_or_else(|| positive_percent(positive, total));

        Self {
            total,
            positive,
            negative,
            positive_percent,
            items,
        }
    }

    /// Share of negative texts, `0..=100`
    pub fn negative_percent(&self) -> f64 {
        if self.total > 0 {
            100.0 - self.positive_percent
        } else {
            0.0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

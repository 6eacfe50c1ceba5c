//! Core analysis types

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thresholds used by the comparator, in display order
pub const COMPARISON_THRESHOLDS: [f64; 3] = [0.3, 0.5, 0.7];

/// Binary sentiment label
///
/// The API answers with `"Positivo"` or `"Negativo"`. Anything that is not
/// recognisably positive is treated as negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sentiment {
    Positive,
    Negative,
}

impl Sentiment {
    /// Label as used on the wire and in exports
    pub fn wire_label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positivo",
            Sentiment::Negative => "Negativo",
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Sentiment::Positive)
    }
}

impl From<String> for Sentiment {
    fn from(label: String) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("positivo") || label.eq_ignore_ascii_case("positive") {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        }
    }
}

impl From<Sentiment> for String {
    fn from(sentiment: Sentiment) -> Self {
        sentiment.wire_label().to_string()
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "Positive"),
            Sentiment::Negative => write!(f, "Negative"),
        }
    }
}

/// Confidence bucket derived from a probability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    VeryHigh,
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Bucket a probability. Total over `[0, 1]`; NaN lands in `Low`.
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.90 {
            ConfidenceLevel::VeryHigh
        } else if probability >= 0.75 {
            ConfidenceLevel::High
        } else if probability >= 0.60 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "Very High",
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence label for a probability
pub fn confidence_level(probability: f64) -> &'static str {
    ConfidenceLevel::from_probability(probability).as_str()
}

/// Format a probability in `[0, 1]` as a two-decimal percentage (`"85.00%"`)
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Input configuration used to produce an analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSettings {
    /// Language code sent to the API (`"auto"`, `"es"`, `"en"`, ...)
    pub language: String,
    /// Classification threshold in `[0, 1]`
    pub threshold: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            language: "auto".to_string(),
            threshold: 0.5,
        }
    }
}

/// One successful single-text analysis, as kept in the session history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    /// Creation timestamp in milliseconds, unique within a session
    pub id: i64,
    pub text: String,
    pub sentiment: Sentiment,
    pub probability: f64,
    /// Server-supplied confidence label, or the locally derived one
    pub confidence: String,
    pub language: String,
    pub threshold: f64,
    /// Local creation time, human readable
    pub created_at: String,
}

impl AnalysisRecord {
    /// Build a record stamped with the current time
    pub fn new(
        text: impl Into<String>,
        sentiment: Sentiment,
        probability: f64,
        confidence: Option<String>,
        settings: &AnalysisSettings,
    ) -> Self {
        let now = Local::now();
        Self {
            id: now.timestamp_millis(),
            text: text.into(),
            sentiment,
            probability,
            confidence: confidence
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| confidence_level(probability).to_string()),
            language: settings.language.clone(),
            threshold: settings.threshold,
            created_at: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Settings this record was produced with
    pub fn settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            language: self.language.clone(),
            threshold: self.threshold,
        }
    }
}

/// Classification of the same text at one comparator threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub threshold: f64,
    pub sentiment: Sentiment,
    pub probability: f64,
    pub confidence: String,
}

/// Result of the three-threshold comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub text: String,
    pub language: String,
    pub results: Vec<ThresholdResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_boundaries() {
        assert_eq!(confidence_level(0.90), "Very High");
        assert_eq!(confidence_level(0.8999), "High");
        assert_eq!(confidence_level(0.75), "High");
        assert_eq!(confidence_level(0.6), "Medium");
        assert_eq!(confidence_level(0.59), "Low");
        assert_eq!(confidence_level(0.0), "Low");
        assert_eq!(confidence_level(1.0), "Very High");
    }

    #[test]
    fn test_sentiment_from_wire() {
        let positive: Sentiment = serde_json::from_str("\"Positivo\"").unwrap();
        let negative: Sentiment = serde_json::from_str("\"Negativo\"").unwrap();
        let neutral: Sentiment = serde_json::from_str("\"Neutral\"").unwrap();

        assert_eq!(positive, Sentiment::Positive);
        assert_eq!(negative, Sentiment::Negative);
        assert_eq!(neutral, Sentiment::Negative);
        assert_eq!(serde_json::to_string(&positive).unwrap(), "\"Positivo\"");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.8567), "85.67%");
        assert_eq!(format_percent(1.0), "100.00%");
        assert_eq!(format_percent(0.0), "0.00%");
    }

    #[test]
    fn test_record_derives_missing_confidence() {
        let settings = AnalysisSettings::default();
        let record = AnalysisRecord::new("great", Sentiment::Positive, 0.8, None, &settings);
        assert_eq!(record.confidence, "High");

        let record = AnalysisRecord::new(
            "great",
            Sentiment::Positive,
            0.8,
            Some("Alta".to_string()),
            &settings,
        );
        assert_eq!(record.confidence, "Alta");
        assert_eq!(record.language, "auto");
        assert_eq!(record.threshold, 0.5);
    }
}

//! Result Presenter
//!
//! Maps analysis, comparison, explanation and batch results into
//! display-ready view models. Views serialize to JSON for `--format json`
//! and implement `Display` as plain-text tables for terminal output.

use serde::Serialize;
use std::fmt;

use crate::analysis::{
    format_percent, importance_percent, AnalysisRecord, Comparison, Explanation, Sentiment,
    TextSpan,
};
use crate::batch::BatchResult;
use crate::session::SessionStatistics;

/// Binary display classification; anything not positive is negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Negative,
}

impl Tone {
    pub fn emoji(&self) -> &'static str {
        match self {
            Tone::Positive => "😊",
            Tone::Negative => "😔",
        }
    }
}

impl From<Sentiment> for Tone {
    fn from(sentiment: Sentiment) -> Self {
        if sentiment.is_positive() {
            Tone::Positive
        } else {
            Tone::Negative
        }
    }
}

/// Fields shared by every classified item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub label: String,
    pub tone: Tone,
    pub emoji: &'static str,
    /// Two-decimal percentage, e.g. `"85.00%"`
    pub probability: String,
    pub confidence: String,
}

impl Verdict {
    pub fn new(sentiment: Sentiment, probability: f64, confidence: &str) -> Self {
        let tone = Tone::from(sentiment);
        Self {
            label: sentiment.to_string(),
            tone,
            emoji: tone.emoji(),
            probability: format_percent(probability),
            confidence: confidence.to_string(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, confidence {})",
            self.emoji, self.label, self.probability, self.confidence
        )
    }
}

// ============================================
// Single analysis
// ============================================

/// A recorded analysis together with its input configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisView {
    pub id: i64,
    pub text: String,
    #[serde(flatten)]
    pub verdict: Verdict,
    pub language: String,
    /// Two decimals, e.g. `"0.50"`
    pub threshold: String,
    pub created_at: String,
}

impl From<&AnalysisRecord> for AnalysisView {
    fn from(record: &AnalysisRecord) -> Self {
        Self {
            id: record.id,
            text: record.text.clone(),
            verdict: Verdict::new(record.sentiment, record.probability, &record.confidence),
            language: record.language.clone(),
            threshold: format!("{:.2}", record.threshold),
            created_at: record.created_at.clone(),
        }
    }
}

impl fmt::Display for AnalysisView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.verdict)?;
        writeln!(f, "  Text:      {}", self.text)?;
        writeln!(f, "  Language:  {}", self.language)?;
        writeln!(f, "  Threshold: {}", self.threshold)?;
        write!(f, "  Id:        {} ({})", self.id, self.created_at)
    }
}

/// History listing, most recent first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryView {
    pub entries: Vec<AnalysisView>,
}

impl HistoryView {
    pub fn new(records: &[AnalysisRecord]) -> Self {
        Self {
            entries: records.iter().map(AnalysisView::from).collect(),
        }
    }
}

impl fmt::Display for HistoryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "No analyses yet");
        }

        writeln!(
            f,
            "{:<15} {:<3} {:<9} {:>8}  {:<19}  {}",
            "Id", "", "Sentiment", "Prob.", "Date", "Text"
        )?;
        write!(f, "{}", "-".repeat(80))?;
        for entry in &self.entries {
            write!(
                f,
                "\n{:<15} {:<3} {:<9} {:>8}  {:<19}  {}",
                entry.id,
                entry.verdict.emoji,
                entry.verdict.label,
                entry.verdict.probability,
                entry.created_at,
                truncate(&entry.text, 40)
            )?;
        }
        Ok(())
    }
}

/// Session statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsView {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    /// Two-decimal percentage, e.g. `"81.25%"`
    pub average_confidence: String,
}

impl From<&SessionStatistics> for StatisticsView {
    fn from(stats: &SessionStatistics) -> Self {
        Self {
            total: stats.total,
            positive: stats.positive,
            negative: stats.negative,
            average_confidence: format!("{:.2}%", stats.average_confidence_percent),
        }
    }
}

impl fmt::Display for StatisticsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total analyses:     {}", self.total)?;
        writeln!(f, "Positive:           {}", self.positive)?;
        writeln!(f, "Negative:           {}", self.negative)?;
        write!(f, "Average confidence: {}", self.average_confidence)
    }
}

// ============================================
// Comparison
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdView {
    /// Two decimals, e.g. `"0.30"`
    pub threshold: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonView {
    pub text: String,
    pub language: String,
    pub results: Vec<ThresholdView>,
}

impl From<&Comparison> for ComparisonView {
    fn from(comparison: &Comparison) -> Self {
        Self {
            text: comparison.text.clone(),
            language: comparison.language.clone(),
            results: comparison
                .results
                .iter()
                .map(|result| ThresholdView {
                    threshold: format!("{:.2}", result.threshold),
                    verdict: Verdict::new(result.sentiment, result.probability, &result.confidence),
                })
                .collect(),
        }
    }
}

impl fmt::Display for ComparisonView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Text: {}", self.text)?;
        writeln!(
            f,
            "{:<10} {:<3} {:<9} {:>8}  {}",
            "Threshold", "", "Sentiment", "Prob.", "Confidence"
        )?;
        write!(f, "{}", "-".repeat(48))?;
        for row in &self.results {
            write!(
                f,
                "\n{:<10} {:<3} {:<9} {:>8}  {}",
                row.threshold,
                row.verdict.emoji,
                row.verdict.label,
                row.verdict.probability,
                row.verdict.confidence
            )?;
        }
        Ok(())
    }
}

// ============================================
// Explanation
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedWord {
    pub rank: usize,
    pub word: String,
    /// `importance * 10` with one decimal, e.g. `"8.5%"`
    pub importance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationView {
    #[serde(flatten)]
    pub verdict: Verdict,
    pub spans: Vec<TextSpan>,
    pub words: Vec<RankedWord>,
}

impl From<&Explanation> for ExplanationView {
    fn from(explanation: &Explanation) -> Self {
        Self {
            verdict: Verdict::new(
                explanation.sentiment,
                explanation.probability,
                &explanation.confidence,
            ),
            spans: explanation.spans(),
            words: explanation
                .words
                .iter()
                .enumerate()
                .map(|(index, word)| RankedWord {
                    rank: index + 1,
                    word: word.word.clone(),
                    importance: importance_percent(word.importance),
                })
                .collect(),
        }
    }
}

impl ExplanationView {
    /// The analyzed text with influential words wrapped in `[...]`
    pub fn marked_text(&self) -> String {
        self.spans
            .iter()
            .map(|span| {
                if span.is_highlighted() {
                    format!("[{}]", span.text)
                } else {
                    span.text.clone()
                }
            })
            .collect()
    }
}

impl fmt::Display for ExplanationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.verdict)?;
        writeln!(f, "  {}", self.marked_text())?;
        if self.words.is_empty() {
            return write!(f, "No influential words reported");
        }
        write!(f, "Most influential words:")?;
        for word in &self.words {
            write!(f, "\n  #{:<3} {:<20} {:>7}", word.rank, word.word, word.importance)?;
        }
        Ok(())
    }
}

// ============================================
// Batch
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    pub number: usize,
    pub text: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchView {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    /// Two-decimal percentages
    pub positive_percent: String,
    pub negative_percent: String,
    pub summary: String,
    pub rows: Vec<BatchRow>,
}

impl From<&BatchResult> for BatchView {
    fn from(result: &BatchResult) -> Self {
        let positive_percent = format!("{:.2}%", result.positive_percent);
        let negative_percent = format!("{:.2}%", result.negative_percent());
        let summary = format!(
            "Processed {} texts: {} positive ({} texts) and {} negative ({} texts)",
            result.total, positive_percent, result.positive, negative_percent, result.negative
        );

        Self {
            total: result.total,
            positive: result.positive,
            negative: result.negative,
            positive_percent,
            negative_percent,
            summary,
            rows: result
                .items
                .iter()
                .enumerate()
                .map(|(index, item)| BatchRow {
                    number: index + 1,
                    text: item.text.clone(),
                    verdict: Verdict::new(item.sentiment, item.probability, &item.confidence),
                })
                .collect(),
        }
    }
}

impl fmt::Display for BatchView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:>5} {:<3} {:<9} {:>8}  {:<10} {}",
            "#", "", "Sentiment", "Prob.", "Confidence", "Text"
        )?;
        write!(f, "{}", "-".repeat(80))?;
        for row in &self.rows {
            write!(
                f,
                "\n{:>5} {:<3} {:<9} {:>8}  {:<10} {}",
                row.number,
                row.verdict.emoji,
                row.verdict.label,
                row.verdict.probability,
                row.verdict.confidence,
                truncate(&row.text, 40)
            )?;
        }
        Ok(())
    }
}

/// Shorten to at most `max` characters, marking the cut with `...`
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

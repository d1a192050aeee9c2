//! Structured chart payloads carried inside tool output text.
//!
//! A tool result is a chart only if its text parses against this schema.
//! Text that merely mentions `"type"` or `"datasets"` is not a chart.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartPayload {
    /// Parse `text` as a chart, tolerating surrounding whitespace and a
    /// markdown code fence. Returns the payload and the bare JSON text.
    pub fn detect(text: &str) -> Option<(ChartPayload, &str)> {
        let body = strip_code_fence(text);
        if !body.starts_with('{') {
            return None;
        }
        serde_json::from_str::<ChartPayload>(body).ok().map(|chart| (chart, body))
    }
}

/// Remove a surrounding ```` ``` ```` or ```` ```json ```` fence, then trim.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"type": "line", "title": "Quarterly Revenue Growth", "labels": ["Q1", "Q2", "Q3", "Q4"], "datasets": [{"label": "Revenue (M$)", "data": [12, 19, 15, 25]}]}"#;

    #[test]
    fn detects_plain_chart() {
        let (chart, body) = ChartPayload::detect(SAMPLE).unwrap();
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.labels.len(), 4);
        assert_eq!(chart.datasets[0].data, vec![12.0, 19.0, 15.0, 25.0]);
        assert_eq!(body, SAMPLE);
    }

    #[test]
    fn detects_fenced_chart() {
        let fenced = format!("```json\n{SAMPLE}\n```\n");
        let (_, body) = ChartPayload::detect(&fenced).unwrap();
        assert_eq!(body, SAMPLE);
    }

    #[test]
    fn marker_substrings_alone_are_not_a_chart() {
        let text = r#"The config uses "type": "x" and "datasets": [] somewhere in prose."#;
        assert!(ChartPayload::detect(text).is_none());
    }

    #[test]
    fn unknown_chart_kind_rejected() {
        let text = r#"{"type": "scatter", "title": "t", "labels": [], "datasets": []}"#;
        assert!(ChartPayload::detect(text).is_none());
    }

    #[test]
    fn missing_datasets_rejected() {
        let text = r#"{"type": "bar", "title": "t", "labels": ["a"]}"#;
        assert!(ChartPayload::detect(text).is_none());
    }

    #[test]
    fn strip_fence_without_language() {
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  plain  "), "plain");
    }
}

//! Visualization demo tool: returns a fixed sample line chart.

use async_trait::async_trait;
use capstone_core::error::ToolError;
use capstone_core::tool::Tool;

/// The sample chart payload, exactly as returned to the model.
pub const SAMPLE_CHART: &str = r#"{"type": "line", "title": "Quarterly Revenue Growth", "labels": ["Q1", "Q2", "Q3", "Q4"], "datasets": [{"label": "Revenue (M$)", "data": [12, 19, 15, 25]}]}"#;

pub struct VisualizationDemoTool;

#[async_trait]
impl Tool for VisualizationDemoTool {
    fn name(&self) -> &str {
        "visualization_demo"
    }

    fn description(&self) -> &str {
        "Return a sample chart to demonstrate chart rendering. Use when the user asks for a demo chart."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<String, ToolError> {
        Ok(SAMPLE_CHART.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstone_core::chart::{ChartKind, ChartPayload};

    #[tokio::test]
    async fn sample_is_a_line_chart() {
        let out = VisualizationDemoTool.execute(serde_json::json!({})).await.unwrap();
        let (chart, _) = ChartPayload::detect(&out).unwrap();
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.title, "Quarterly Revenue Growth");
        assert_eq!(chart.datasets[0].data, vec![12.0, 19.0, 15.0, 25.0]);
    }
}

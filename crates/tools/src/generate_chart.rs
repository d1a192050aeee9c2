//! Chart generation tool.
//!
//! Asks the model to turn a free-form data description into chart JSON,
//! then validates the reply against the chart schema. Only a reply that
//! parses is returned, so downstream chart detection never sees prose.

use async_trait::async_trait;
use capstone_core::chart::ChartPayload;
use capstone_core::error::ToolError;
use capstone_core::tool::Tool;
use capstone_providers::ModelGateway;

const CHART_PROMPT: &str = r#"You are a data visualization assistant. Convert the data description below into a chart definition.
Respond with ONLY a JSON object, no prose, matching this schema:
{
  "type": "bar" | "line" | "pie",
  "title": "Chart title",
  "labels": ["Label 1", "Label 2"],
  "datasets": [{"label": "Series name", "data": [1, 2]}]
}
Every dataset must have exactly one number per label.

Data description:
"#;

pub struct GenerateChartTool {
    gateway: ModelGateway,
}

impl GenerateChartTool {
    pub fn new(gateway: ModelGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for GenerateChartTool {
    fn name(&self) -> &str {
        "generate_chart"
    }

    fn description(&self) -> &str {
        "Generate a chart (bar, line or pie) from a description of the data. \
         Always use this when the user asks for a chart or graph."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "data_description": {
                    "type": "string",
                    "description": "The data to plot and the kind of chart wanted"
                }
            },
            "required": ["data_description"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let description = arguments["data_description"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'data_description' argument".into()))?;

        let reply = self.gateway.generate(&format!("{CHART_PROMPT}{description}")).await?;

        match ChartPayload::detect(&reply) {
            Some((_, body)) => Ok(body.to_string()),
            None => Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: "model reply is not a valid chart definition".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;

    const BAR: &str = r#"{"type": "bar", "title": "Sales", "labels": ["A", "B"], "datasets": [{"label": "Units", "data": [3, 5]}]}"#;

    #[tokio::test]
    async fn strips_fence_from_reply() {
        let fenced = format!("```json\n{BAR}\n```");
        let tool = GenerateChartTool::new(ScriptedModel::gateway(vec![fenced.as_str()]));
        let out = tool
            .execute(serde_json::json!({"data_description": "units sold: A 3, B 5"}))
            .await
            .unwrap();
        assert_eq!(out, BAR);
    }

    #[tokio::test]
    async fn prompt_carries_description() {
        let model = ScriptedModel::new(vec![Ok(BAR.into())]);
        let tool = GenerateChartTool::new(ModelGateway::new(model.clone(), "m"));
        tool.execute(serde_json::json!({"data_description": "units sold"}))
            .await
            .unwrap();
        let prompt = model.last_prompt();
        assert!(prompt.starts_with("You are a data visualization assistant."));
        assert!(prompt.ends_with("Data description:\nunits sold"));
    }

    #[tokio::test]
    async fn prose_reply_fails() {
        let tool = GenerateChartTool::new(ScriptedModel::gateway(vec!["Sorry, I can't draw that."]));
        let err = tool
            .execute(serde_json::json!({"data_description": "anything"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}

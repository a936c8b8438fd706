use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolGroup, ToolInputSchema, ToolResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Maximum number of reports returned per lookup
const REPORT_LIMIT: usize = 5;

const NO_REPORTS: &str =
    "No past reports found. This is ok, it means that you're thinking about a new operation.";

/// Retrieves past operation reports relevant to a question
pub struct GetPastReportsTool {
    definition: ToolDefinition,
}

impl GetPastReportsTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "question".to_string(),
            PropertySchema::new(
                "string",
                "What you want to know about past operations, e.g. 'past EURC purchases'.",
            ),
        );

        GetPastReportsTool {
            definition: ToolDefinition {
                name: "get_past_reports".to_string(),
                description: "A tool that returns the past reports that contain information about previously executed operations.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["question".to_string()],
                },
                group: ToolGroup::Read,
            },
        }
    }
}

impl Default for GetPastReportsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct PastReportsParams {
    question: String,
}

#[async_trait]
impl Tool for GetPastReportsTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: PastReportsParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };

        let memory = match &context.memory {
            Some(m) => m,
            None => return ToolResult::error("Report store is not available"),
        };

        let reports = match memory.retrieve_reports(&params.question, REPORT_LIMIT) {
            Ok(r) => r,
            Err(e) => return ToolResult::error(format!("Failed to retrieve reports: {}", e)),
        };

        log::info!(
            "[get_past_reports] {} report(s) for question '{}'",
            reports.len(),
            params.question
        );

        if reports.is_empty() {
            return ToolResult::success(NO_REPORTS);
        }

        let content = reports
            .iter()
            .map(|r| {
                format!(
                    "Report containing the operations done the {}:\n{}",
                    r.created_at, r.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        ToolResult::success(content).with_metadata(json!({
            "report_ids": reports.iter().map(|r| r.id).collect::<Vec<_>>(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::memory::AgentMemory;
    use crate::orchestration::AgentName;
    use std::sync::Arc;

    fn context_with_db() -> (ToolContext, Arc<Database>) {
        let db = Arc::new(Database::new(":memory:").unwrap());
        let ctx = ToolContext::new(AgentName::Observer).with_memory(db.clone());
        (ctx, db)
    }

    #[tokio::test]
    async fn test_empty_store_is_not_an_error() {
        let (ctx, _db) = context_with_db();
        let result = GetPastReportsTool::new()
            .execute(json!({"question": "eurc swaps"}), &ctx)
            .await;
        assert!(result.success);
        assert_eq!(result.content, NO_REPORTS);
    }

    #[tokio::test]
    async fn test_formats_matching_reports() {
        let (ctx, db) = context_with_db();
        db.store_report("Bought 100 EURC with USDC").unwrap();
        db.store_report("Sent 0.1 ETH to the treasury").unwrap();

        let result = GetPastReportsTool::new()
            .execute(json!({"question": "EURC purchases"}), &ctx)
            .await;
        assert!(result.success);
        assert!(result.content.starts_with("Report containing the operations done the "));
        assert!(result.content.contains("Bought 100 EURC"));
        assert!(!result.content.contains("treasury"));
    }

    #[tokio::test]
    async fn test_requires_memory() {
        let ctx = ToolContext::new(AgentName::Observer);
        let result = GetPastReportsTool::new()
            .execute(json!({"question": "anything"}), &ctx)
            .await;
        assert!(!result.success);
    }
}

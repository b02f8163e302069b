use anyhow::Result;
use serde_json::Value;
use tracing::info;

use crate::conversation::{CommandInterpreter, Interpretation};
use crate::tools::ToolRegistry;

/// The agent shell: interprets an operator message, dispatches the matching
/// pipeline tool, and renders the reply. Interpretation is deterministic;
/// the registry decides what the agent can actually do.
pub struct AgentRuntime {
    registry: ToolRegistry,
    interpreter: CommandInterpreter,
}

impl AgentRuntime {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry, interpreter: CommandInterpreter::new() }
    }

    pub async fn handle_message(&self, text: &str) -> Result<String> {
        match self.interpreter.interpret(text) {
            Interpretation::Help => Ok(self.render_help()),
            Interpretation::Clarify { prompt } => Ok(prompt),
            Interpretation::Invoke { tool_name } => {
                info!(
                    event_name = "agent.tool.invoked",
                    tool_name,
                    "dispatching tool from operator message"
                );
                let result = self.registry.dispatch(tool_name, Value::Null).await?;
                Ok(result
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| result.to_string()))
            }
        }
    }

    fn render_help(&self) -> String {
        let mut lines = vec!["Available commands:".to_string()];
        for (name, description) in self.registry.describe() {
            lines.push(format!("- {name}: {description}"));
        }
        lines.push("Type 'quit' to exit.".to_string());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use riskline_core::underwriting::{underwriter_for, RuleSet};
    use riskline_db::repositories::{
        InMemoryDecisionRepository, InMemoryPolicyRepository, InMemoryStagingRepository,
    };
    use riskline_source::StaticPolicySource;

    use crate::pipeline::{IngestService, PromotionService, SummaryService, UnderwritingService};
    use crate::tools::{
        FetchPoliciesTool, PromotePoliciesTool, ToolRegistry, UnderwriteAllTool,
        UnderwritingSummaryTool,
    };

    use super::AgentRuntime;

    fn runtime() -> AgentRuntime {
        let source = Arc::new(StaticPolicySource::new(vec![
            json!({
                "id": "P-1",
                "tiv": 20_000_000,
                "total_premium": 100_000,
                "line_of_business": "Commercial Property",
                "construction_type": "steel",
                "primary_risk_state": "OH",
                "oldest_building": 2015,
                "winnability": 88,
                "renewal_or_new_business": "NEW BUSINESS",
                "loss_value": 0,
            }),
            json!({
                "id": "P-2",
                "tiv": 60_000_000,
                "total_premium": 90_000,
                "line_of_business": "Commercial Property",
                "construction_type": "masonry",
                "primary_risk_state": "PA",
                "oldest_building": 2008,
                "winnability": 72,
                "renewal_or_new_business": "RENEWAL",
                "loss_value": 0,
            }),
        ]));
        let staging = Arc::new(InMemoryStagingRepository::default());
        let policies = Arc::new(InMemoryPolicyRepository::default());
        let decisions = Arc::new(InMemoryDecisionRepository::default());

        let mut registry = ToolRegistry::default();
        registry.register(FetchPoliciesTool::new(IngestService::new(source, staging.clone())));
        registry
            .register(PromotePoliciesTool::new(PromotionService::new(staging, policies.clone())));
        registry.register(UnderwriteAllTool::new(UnderwritingService::new(
            policies,
            decisions.clone(),
            Arc::from(underwriter_for(RuleSet::HardGate)),
            "v1.0",
        )));
        registry.register(UnderwritingSummaryTool::new(SummaryService::new(decisions)));

        AgentRuntime::new(registry)
    }

    #[tokio::test]
    async fn full_conversation_drives_the_pipeline_end_to_end() {
        let runtime = runtime();

        let fetched = runtime.handle_message("fetch the policies").await.expect("fetch");
        assert!(fetched.contains("staged 2"));

        let promoted =
            runtime.handle_message("migrate policies to the relational store").await.expect("promote");
        assert!(promoted.contains("Promoted 2"));

        let underwritten =
            runtime.handle_message("underwrite all policies automatically").await.expect("underwrite");
        assert!(underwritten.contains("Total policies processed: 2"));
        assert!(underwritten.contains("SAFE: 1"));

        let summary = runtime.handle_message("show underwriting summary").await.expect("summary");
        assert!(summary.contains("UNDERWRITING SUMMARY"));
        assert!(summary.contains("- P-2 [NOT SAFE]:"));
    }

    #[tokio::test]
    async fn help_lists_registered_tools() {
        let runtime = runtime();
        let help = runtime.handle_message("help").await.expect("help");
        assert!(help.contains("fetch_policies"));
        assert!(help.contains("underwrite_all"));
        assert!(help.contains("underwriting_summary"));
    }

    #[tokio::test]
    async fn ambiguous_message_asks_for_clarification() {
        let runtime = runtime();
        let reply = runtime.handle_message("hmm").await.expect("reply");
        assert!(reply.contains("Which would you like?"));
    }
}

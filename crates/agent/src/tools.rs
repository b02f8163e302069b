use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::pipeline::{IngestService, PromotionService, SummaryService, UnderwritingService};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<Value>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn describe(&self) -> Vec<(&'static str, &'static str)> {
        let mut descriptions: Vec<(&'static str, &'static str)> =
            self.tools.values().map(|tool| (tool.name(), tool.description())).collect();
        descriptions.sort_unstable_by_key(|(name, _)| *name);
        descriptions
    }

    pub async fn dispatch(&self, name: &str, input: Value) -> Result<Value> {
        let Some(tool) = self.tools.get(name) else {
            bail!("unknown tool `{name}`");
        };
        tool.execute(input).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub struct FetchPoliciesTool {
    service: IngestService,
}

impl FetchPoliciesTool {
    pub fn new(service: IngestService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for FetchPoliciesTool {
    fn name(&self) -> &'static str {
        "fetch_policies"
    }

    fn description(&self) -> &'static str {
        "Fetch all policies from the source API and stage the raw documents"
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        let report = self.service.run().await?;
        Ok(json!({
            "fetched": report.fetched,
            "staged": report.staged,
            "errors": report.errors,
            "message": report.render(),
        }))
    }
}

pub struct PromotePoliciesTool {
    service: PromotionService,
}

impl PromotePoliciesTool {
    pub fn new(service: PromotionService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for PromotePoliciesTool {
    fn name(&self) -> &'static str {
        "promote_policies"
    }

    fn description(&self) -> &'static str {
        "Normalize staged policy documents into the relational policy store"
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        let report = self.service.run().await?;
        Ok(json!({
            "promoted": report.promoted,
            "validation_warnings": report.validation_warnings,
            "errors": report.errors,
            "message": report.render(),
        }))
    }
}

pub struct UnderwriteAllTool {
    service: UnderwritingService,
}

impl UnderwriteAllTool {
    pub fn new(service: UnderwritingService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for UnderwriteAllTool {
    fn name(&self) -> &'static str {
        "underwrite_all"
    }

    fn description(&self) -> &'static str {
        "Underwrite every stored policy and persist SAFE/NOT SAFE decisions"
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        let summary = self.service.run().await?;
        Ok(json!({
            "total_processed": summary.total_processed,
            "safe_count": summary.safe_count,
            "not_safe_count": summary.not_safe_count,
            "errors": summary.errors,
            "message": summary.render(),
        }))
    }
}

pub struct UnderwritingSummaryTool {
    service: SummaryService,
}

impl UnderwritingSummaryTool {
    pub fn new(service: SummaryService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for UnderwritingSummaryTool {
    fn name(&self) -> &'static str {
        "underwriting_summary"
    }

    fn description(&self) -> &'static str {
        "Summarize stored underwriting decisions with counts and samples"
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        let rendered = self.service.render().await?;
        Ok(json!({"message": rendered}))
    }
}

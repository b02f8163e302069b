use std::sync::Arc;

use crate::commands::CommandResult;
use riskline_agent::pipeline::UnderwritingService;
use riskline_core::config::{AppConfig, LoadOptions};
use riskline_core::underwriting::{underwriter_for, RuleSet};
use riskline_db::repositories::{SqlDecisionRepository, SqlPolicyRepository};
use riskline_db::{connect_with_settings, migrations};

pub fn run(rule_set_override: Option<&str>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "underwrite",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let rule_set = match rule_set_override {
        Some(raw) => match raw.parse::<RuleSet>() {
            Ok(rule_set) => rule_set,
            Err(error) => {
                return CommandResult::failure("underwrite", "rule_set", error.to_string(), 2);
            }
        },
        None => config.underwriting.rule_set,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "underwrite",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let service = UnderwritingService::new(
            Arc::new(SqlPolicyRepository::new(pool.clone())),
            Arc::new(SqlDecisionRepository::new(pool.clone())),
            Arc::from(underwriter_for(rule_set)),
            config.underwriting.rules_version.clone(),
        );

        let summary =
            service.run().await.map_err(|error| ("underwriting", error.to_string(), 6u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(summary)
    });

    match result {
        Ok(summary) => CommandResult::success(
            "underwrite",
            format!("rule set: {}\n{}", rule_set, summary.render()),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("underwrite", error_class, message, exit_code)
        }
    }
}

use std::sync::Arc;

use crate::commands::CommandResult;
use riskline_agent::pipeline::PromotionService;
use riskline_core::config::{AppConfig, LoadOptions};
use riskline_db::repositories::{SqlPolicyRepository, SqlStagingRepository};
use riskline_db::{connect_with_settings, migrations};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "promote",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "promote",
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

        let service = PromotionService::new(
            Arc::new(SqlStagingRepository::new(pool.clone())),
            Arc::new(SqlPolicyRepository::new(pool.clone())),
        );

        let report =
            service.run().await.map_err(|error| ("promotion", error.to_string(), 6u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(report)
    });

    match result {
        Ok(report) => CommandResult::success("promote", report.render()),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("promote", error_class, message, exit_code)
        }
    }
}

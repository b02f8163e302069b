use std::sync::Arc;

use crate::commands::CommandResult;
use riskline_agent::pipeline::IngestService;
use riskline_core::config::{AppConfig, LoadOptions};
use riskline_db::repositories::SqlStagingRepository;
use riskline_db::{connect_with_settings, migrations};
use riskline_source::HttpPolicySource;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "fetch",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    if !config.source_ready() {
        return CommandResult::failure(
            "fetch",
            "source_credentials",
            "source API credentials are not configured; set the RISKLINE_SOURCE_* variables",
            2,
        );
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "fetch",
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

        let source = HttpPolicySource::new(config.source.clone())
            .map_err(|error| ("source_client", error.to_string(), 6u8))?;
        let service = IngestService::new(
            Arc::new(source),
            Arc::new(SqlStagingRepository::new(pool.clone())),
        );

        let report =
            service.run().await.map_err(|error| ("ingest", error.to_string(), 6u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(report)
    });

    match result {
        Ok(report) => CommandResult::success("fetch", report.render()),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("fetch", error_class, message, exit_code)
        }
    }
}

use std::sync::Arc;

use crate::commands::CommandResult;
use riskline_agent::pipeline::SummaryService;
use riskline_core::config::{AppConfig, LoadOptions};
use riskline_db::repositories::SqlDecisionRepository;
use riskline_db::{connect_with_settings, migrations};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "summary",
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
                "summary",
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

        let service = SummaryService::new(Arc::new(SqlDecisionRepository::new(pool.clone())));
        let rendered =
            service.render().await.map_err(|error| ("summary", error.to_string(), 6u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(rendered)
    });

    match result {
        Ok(rendered) => CommandResult::success("summary", rendered),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("summary", error_class, message, exit_code)
        }
    }
}

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::commands::CommandResult;
use riskline_agent::pipeline::{
    IngestService, PromotionService, SummaryService, UnderwritingService,
};
use riskline_agent::tools::{
    FetchPoliciesTool, PromotePoliciesTool, ToolRegistry, UnderwriteAllTool,
    UnderwritingSummaryTool,
};
use riskline_agent::AgentRuntime;
use riskline_core::config::{AppConfig, LoadOptions, LogFormat};
use riskline_core::underwriting::underwriter_for;
use riskline_db::repositories::{
    SqlDecisionRepository, SqlPolicyRepository, SqlStagingRepository,
};
use riskline_db::{connect_with_settings, migrations};
use riskline_source::HttpPolicySource;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "agent",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "agent",
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

        let staging = Arc::new(SqlStagingRepository::new(pool.clone()));
        let policies = Arc::new(SqlPolicyRepository::new(pool.clone()));
        let decisions = Arc::new(SqlDecisionRepository::new(pool.clone()));

        let mut registry = ToolRegistry::default();
        registry.register(FetchPoliciesTool::new(IngestService::new(
            Arc::new(source),
            staging.clone(),
        )));
        registry.register(PromotePoliciesTool::new(PromotionService::new(
            staging,
            policies.clone(),
        )));
        registry.register(UnderwriteAllTool::new(UnderwritingService::new(
            policies,
            decisions.clone(),
            Arc::from(underwriter_for(config.underwriting.rule_set)),
            config.underwriting.rules_version.clone(),
        )));
        registry.register(UnderwritingSummaryTool::new(SummaryService::new(decisions)));

        let agent = AgentRuntime::new(registry);

        println!("Riskline underwriting agent ready (rule set: {}).", config.underwriting.rule_set);
        println!(
            "Try: 'fetch policies', 'promote policies', 'underwrite all policies', \
             'show underwriting summary'."
        );
        println!("Type 'quit' to exit.");

        let stdin = io::stdin();
        let mut input = String::new();
        loop {
            print!("riskline> ");
            let _ = io::stdout().flush();

            input.clear();
            let bytes_read = stdin
                .lock()
                .read_line(&mut input)
                .map_err(|error| ("stdin", error.to_string(), 6u8))?;
            if bytes_read == 0 {
                break;
            }

            let message = input.trim();
            if message.is_empty() {
                continue;
            }
            if matches!(message.to_ascii_lowercase().as_str(), "quit" | "exit" | "q") {
                break;
            }

            match agent.handle_message(message).await {
                Ok(reply) => println!("{reply}"),
                Err(error) => eprintln!("error: {error}"),
            }
        }

        pool.close().await;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(()) => CommandResult::success("agent", "agent session ended"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("agent", error_class, message, exit_code)
        }
    }
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    // Ignore re-initialization: the agent command may run after another
    // subscriber was installed in the same process (tests).
    let result = match config.logging.format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .compact()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .pretty()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .json()
            .try_init(),
    };
    let _ = result;
}

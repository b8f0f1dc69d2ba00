//! CLI application for the medical repasse automation.

use clap::{Parser, Subcommand};
use repasse_db::{OracleClient, RepasseStore};
use repasse_notify::{CliqNotifier, Details};
use repasse_telemetry::{init_logging, Metrics};
use repasse_workflow::{Config, RepasseProcessor, RunMode, RunSummary};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "repasse-medico")]
#[command(about = "Sends released medical repasse e-mails through Tasy")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Environment file loaded before reading the configuration
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Import released titles and send the pending repasses (default)
    Run,
    /// Only import released titles into HOS_REPASSE_MEDICO
    Import,
}

impl Commands {
    fn mode(self) -> RunMode {
        match self {
            Commands::Run => RunMode::Full,
            Commands::Import => RunMode::ImportOnly,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let config = Config::from_env()?;
    let _guard = init_logging(cli.log_level.as_deref(), &config.log_dir)?;
    let mode = cli.command.unwrap_or(Commands::Run).mode();

    info!("Iniciando automação de repasse...");
    let store = connect_store(&config).await;
    let metrics = Metrics::new()?;
    let notifier = build_notifier(&config);

    let mut processor = RepasseProcessor::new(
        config.clone(),
        store,
        Box::new(config.browser.clone()),
        metrics,
    );

    let result = processor.execute(mode).await;
    match &result {
        Ok(()) => info!("✅ Automação concluída com sucesso."),
        Err(e) => error!("❌ Erro na execução da automação: {:#}", e),
    }

    let failure = result.as_ref().err().map(|e| format!("{:#}", e));
    processor.finalize(failure.as_deref()).await;

    if let Some(notifier) = notifier {
        notify(&notifier, processor.summary(), failure.as_deref()).await;
    }

    result
}

/// Connect to Oracle; without a connection the run continues and stops at
/// the first step that needs the database.
async fn connect_store(config: &Config) -> Option<Arc<dyn RepasseStore>> {
    match OracleClient::connect(&config.db).await {
        Ok(client) => {
            info!("Conexão com o banco estabelecida.");
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!("Falha ao conectar ao banco de dados: {}", e);
            None
        }
    }
}

fn build_notifier(config: &Config) -> Option<CliqNotifier> {
    let url = config.cliq_webhook_url.as_deref()?;
    match CliqNotifier::new(url) {
        Ok(notifier) => Some(notifier),
        Err(e) => {
            warn!("Cliq notifications disabled: {}", e);
            None
        }
    }
}

/// Run counters, plus the failure reason when the run failed.
fn notification_details(summary: &RunSummary, failure: Option<&str>) -> Details {
    let mut fields = summary.details();
    if let Some(reason) = failure {
        fields.push(("Erro".to_string(), reason.to_string()));
    }
    Details::Fields(fields)
}

async fn notify(notifier: &CliqNotifier, summary: &RunSummary, failure: Option<&str>) {
    let details = notification_details(summary, failure);
    let sent = match failure {
        Some(_) => {
            notifier
                .notify_error("Falha na automação de repasse médico", Some(&details))
                .await
        }
        None => {
            notifier
                .notify_success("Automação de repasse médico concluída", Some(&details))
                .await
        }
    };
    if let Err(e) = sent {
        warn!("Failed to send Cliq notification: {}", e);
    }
}

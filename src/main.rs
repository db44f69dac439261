use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use open_bot::bot::report::{JsonReporter, Reporter, TracingReporter};
use open_bot::bot::target::{resolve_targets, Target};
use open_bot::bot::Bot;
use open_bot::config::AppConfig;
use open_bot::engine::LoggingEngine;
use open_bot::forge::github::GitHubForge;
use open_bot::forge::Forge;
use open_bot::server::{create_router, shutdown_signal, AppState};
use open_bot::settings::ConfigLoader;

#[derive(Parser)]
#[command(name = "open-bot", about = "Apply repository rules to GitHub issues and pull requests")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every open issue of the given orgs, repositories or issues
    Run {
        /// `org`, `owner/repo` or `owner/repo#number`
        #[arg(required = true)]
        targets: Vec<Target>,
        /// Evaluate rules without writing to GitHub
        #[arg(long)]
        simulate: bool,
        /// Print progress events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Process a single issue
    Issue {
        /// `owner/repo#number`
        target: Target,
        #[arg(long)]
        simulate: bool,
    },
    /// Receive GitHub webhooks and process the issues they mention
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    let forge: Arc<dyn Forge> = Arc::new(GitHubForge::new(&config.github)?);
    let loader = ConfigLoader::new(Arc::clone(&forge), Arc::new(LoggingEngine))
        .with_override(config.override_settings()?);
    let bot = Bot::new(Arc::clone(&forge), loader, config.github.user.clone());

    match cli.command {
        Command::Run {
            targets,
            simulate,
            json,
        } => {
            let reporter: Arc<dyn Reporter> = if json {
                Arc::new(JsonReporter)
            } else {
                Arc::new(TracingReporter)
            };
            let items = resolve_targets(forge.as_ref(), &targets).await?;
            tracing::info!(items = items.len(), user = %config.github.user, "Starting batch");
            bot.process(items, reporter, simulate || config.bot.simulate)
                .await?;
            tracing::info!("Batch complete");
        }
        Command::Issue { target, simulate } => {
            let (owner, repo, number) = match target {
                Target::Issue {
                    owner,
                    repo,
                    number,
                } => (owner, repo, number),
                other => anyhow::bail!("expected owner/repo#number, got {other:?}"),
            };
            bot.process_issue(
                &owner,
                &repo,
                number,
                Arc::new(TracingReporter),
                simulate || config.bot.simulate,
            )
            .await?;
        }
        Command::Serve => {
            if config.webhook_secret().is_none() {
                tracing::warn!("No webhook secret configured; accepting unsigned webhooks");
            }

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let state = Arc::new(AppState::new(config, bot));
            let app = create_router(state);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on {}", listener.local_addr()?);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            tracing::info!("Server stopped");
        }
    }

    Ok(())
}

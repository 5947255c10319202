//! Command definitions and handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use wildid_client::{ApiClient, ClientConfig, IdentificationService};
use wildid_core::config::ReviewConfig;
use wildid_core::types::AnnotationId;
use wildid_review::{
    AnnotationCache, FileCache, LoadOutcome, MemoryCache, RetrainActions, ReviewController,
    ReviewError,
};

use crate::output;

#[derive(Parser)]
#[command(name = "wildid")]
#[command(about = "Review wildlife identification results")]
#[command(version)]
pub struct Cli {
    /// Identification service base URL
    #[arg(long, env = "WILDID_API_URL", global = true)]
    api_url: Option<String>,

    /// Session to operate on
    #[arg(short, long, env = "WILDID_SESSION", global = true)]
    session: Option<String>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Manage the images uploaded to a session
    Images {
        #[command(subcommand)]
        command: ImageCommands,
    },

    /// Compute predictions for the session and show the identity summary
    Predict,

    /// Re-read stored annotations and show the identity summary
    Refresh,

    /// Show the identity summary
    Summary,

    /// List annotations in review order
    Review {
        /// Only show open annotations below the confidence threshold
        #[arg(long)]
        pending: bool,

        /// Only show one identity
        #[arg(long)]
        name: Option<String>,
    },

    /// Accept predictions
    Accept {
        /// Annotation IDs
        #[arg(required = true)]
        ids: Vec<AnnotationId>,
    },

    /// Ignore annotations
    Ignore {
        /// Annotation IDs
        #[arg(required = true)]
        ids: Vec<AnnotationId>,
    },

    /// Submit an edited annotation JSON document
    Correct {
        /// Annotation ID being corrected
        id: AnnotationId,
        /// File holding the edited JSON ("-" reads stdin)
        file: PathBuf,
    },

    /// Drive model retraining
    Retrain {
        #[command(subcommand)]
        command: RetrainCommands,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List sessions
    List,
    /// Create a session
    Create {
        /// Session display name
        name: String,
    },
}

#[derive(Subcommand)]
enum ImageCommands {
    /// List uploaded images
    List,
    /// Delete images by file name
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand)]
enum RetrainCommands {
    /// Start retraining on accepted annotations
    Start,
    /// Show the job status
    Status,
    /// Abort the running job
    Abort,
    /// Delete the finished job
    Clear,
    /// Print the job log
    Logs,
    /// Follow the job until it finishes
    Watch,
}

/// Shared handles built once per invocation.
struct AppContext {
    client: Arc<ApiClient>,
    review_config: ReviewConfig,
    json: bool,
    session: Option<String>,
}

impl AppContext {
    fn session(&self) -> anyhow::Result<&str> {
        match self.session.as_deref() {
            Some(id) => Ok(id),
            None => bail!("No session given; pass --session or set WILDID_SESSION"),
        }
    }

    fn cache(&self) -> Arc<dyn AnnotationCache> {
        match &self.review_config.cache_dir {
            Some(dir) => Arc::new(FileCache::new(dir.clone())),
            None => Arc::new(MemoryCache::new()),
        }
    }

    fn service(&self) -> Arc<dyn IdentificationService> {
        self.client.clone()
    }

    /// Open the session and bring the store up to date.
    ///
    /// With `always_refresh` unset, a cached copy is used as is. A failed
    /// refresh falls back to the cached copy when there is one.
    async fn controller(&self, always_refresh: bool) -> anyhow::Result<ReviewController> {
        let session_id = self.session()?;
        let controller =
            ReviewController::new(self.service(), self.cache(), self.review_config.clone());
        let cached = controller.open_session(session_id).await;
        if cached > 0 && !always_refresh {
            return Ok(controller);
        }

        match controller.refresh().await {
            Ok(_) => {}
            Err(e @ (ReviewError::Network(_) | ReviewError::MalformedResponse(_))) if cached > 0 => {
                tracing::warn!(session_id, cached, error = %e, "Refresh failed, using cached annotations");
            }
            Err(e) => return Err(e).context("Failed to load annotations"),
        }
        Ok(controller)
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut client_config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        client_config.api_url = url.trim_end_matches('/').to_string();
    }
    let review_config = ReviewConfig::from_env().context("Invalid review configuration")?;
    let client = ApiClient::from_config(&client_config).context("Failed to build HTTP client")?;

    tracing::debug!(api_url = %client_config.api_url, "Using identification service");

    let ctx = AppContext {
        client: Arc::new(client),
        review_config,
        json: cli.json,
        session: cli.session,
    };

    match cli.command {
        Commands::Sessions { command } => cmd_sessions(&ctx, command).await,
        Commands::Images { command } => cmd_images(&ctx, command).await,
        Commands::Predict => cmd_predict(&ctx).await,
        Commands::Refresh => cmd_summary(&ctx, true).await,
        Commands::Summary => cmd_summary(&ctx, false).await,
        Commands::Review { pending, name } => cmd_review(&ctx, pending, name).await,
        Commands::Accept { ids } => cmd_mark(&ctx, &ids, Mark::Accept).await,
        Commands::Ignore { ids } => cmd_mark(&ctx, &ids, Mark::Ignore).await,
        Commands::Correct { id, file } => cmd_correct(&ctx, id, &file).await,
        Commands::Retrain { command } => cmd_retrain(&ctx, command).await,
    }
}

// ---------------------------------------------------------------------------
// Sessions and images
// ---------------------------------------------------------------------------

async fn cmd_sessions(ctx: &AppContext, command: SessionCommands) -> anyhow::Result<()> {
    match command {
        SessionCommands::List => {
            let sessions = ctx.client.list_sessions().await?;
            if ctx.json {
                return output::print_json(&sessions);
            }
            if sessions.is_empty() {
                println!("No sessions");
            }
            for session in &sessions {
                println!("{}", output::session_line(session));
            }
        }
        SessionCommands::Create { name } => {
            let session = ctx.client.create_session(&name).await?;
            if ctx.json {
                return output::print_json(&session);
            }
            println!("Created {}", output::session_line(&session));
        }
    }
    Ok(())
}

async fn cmd_images(ctx: &AppContext, command: ImageCommands) -> anyhow::Result<()> {
    let session_id = ctx.session()?;
    match command {
        ImageCommands::List => {
            let images = ctx.client.list_images(session_id).await?;
            if ctx.json {
                return output::print_json(&images);
            }
            for image in &images {
                println!("{image}");
            }
        }
        ImageCommands::Delete { names } => {
            ctx.client.delete_images(session_id, &names).await?;
            println!("Deleted {} image(s)", names.len());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

async fn print_summary(ctx: &AppContext, controller: &ReviewController) -> anyhow::Result<()> {
    let summary = controller.summary().await;
    if ctx.json {
        return output::print_json(&summary);
    }
    print!("{}", output::summary_table(&summary));
    if let Some(undetected) = controller.groups().await.undetected() {
        println!("{} annotation(s) with no identity", undetected.len());
    }
    let pending = controller.needs_review().await.len();
    if pending > 0 {
        println!(
            "{pending} annotation(s) below {:.2} confidence need review",
            ctx.review_config.confidence_threshold
        );
    }
    Ok(())
}

async fn cmd_predict(ctx: &AppContext) -> anyhow::Result<()> {
    let session_id = ctx.session()?;
    let controller =
        ReviewController::new(ctx.service(), ctx.cache(), ctx.review_config.clone());
    controller.open_session(session_id).await;

    eprintln!("Computing predictions for {session_id}...");
    match controller
        .compute_results()
        .await
        .context("Failed to compute predictions")?
    {
        LoadOutcome::Applied(count) => eprintln!("{count} annotation(s) loaded"),
        LoadOutcome::Superseded => bail!("Prediction request was superseded"),
    }
    print_summary(ctx, &controller).await
}

async fn cmd_summary(ctx: &AppContext, always_refresh: bool) -> anyhow::Result<()> {
    let controller = ctx.controller(always_refresh).await?;
    print_summary(ctx, &controller).await
}

async fn cmd_review(ctx: &AppContext, pending: bool, name: Option<String>) -> anyhow::Result<()> {
    let controller = ctx.controller(true).await?;
    let annotations = if pending {
        controller.needs_review().await
    } else {
        controller.annotations().await
    };

    let groups = wildid_core::ordering::group_by_identity(&annotations);
    let mut shown = Vec::new();
    for group in groups.detail_order() {
        if name.as_deref().is_some_and(|n| n != group.name) {
            continue;
        }
        shown.push((group.name.clone(), group.ordered_for_review()));
    }

    if ctx.json {
        let flat: Vec<_> = shown.iter().flat_map(|(_, members)| members).collect();
        return output::print_json(&flat);
    }
    if shown.is_empty() {
        println!("Nothing to review");
    }
    for (group_name, members) in &shown {
        println!("== {group_name} ({})", members.len());
        for annotation in members {
            println!("{}", output::annotation_line(annotation));
        }
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Mark {
    Accept,
    Ignore,
}

async fn cmd_mark(ctx: &AppContext, ids: &[AnnotationId], mark: Mark) -> anyhow::Result<()> {
    let controller = ctx.controller(true).await?;
    let mut failed = 0usize;

    for &id in ids {
        let result = match mark {
            Mark::Accept => controller.accept(id).await,
            Mark::Ignore => controller.ignore(id).await,
        };
        match result {
            Ok(updated) => println!("{}", output::annotation_line(&updated)),
            Err(e) => {
                failed += 1;
                eprintln!("Annotation {id}: {e}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} update(s) failed", ids.len());
    }
    Ok(())
}

async fn cmd_correct(ctx: &AppContext, id: AnnotationId, file: &Path) -> anyhow::Result<()> {
    let json = if file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?
    };

    let controller = ctx.controller(true).await?;
    let updated = controller.correct(id, &json).await?;
    if ctx.json {
        return output::print_json(&updated);
    }
    println!("{}", output::annotation_line(&updated));
    Ok(())
}

// ---------------------------------------------------------------------------
// Retraining
// ---------------------------------------------------------------------------

async fn cmd_retrain(ctx: &AppContext, command: RetrainCommands) -> anyhow::Result<()> {
    let session_id = ctx.session()?;
    let actions = RetrainActions::new(ctx.service());

    match command {
        RetrainCommands::Start => {
            let controller = ctx.controller(true).await?;
            let candidates = controller.retrain_candidates().await.len();
            if candidates == 0 {
                bail!("No accepted annotations with crops to retrain on");
            }
            actions.start(session_id).await?;
            println!("Retraining started with {candidates} accepted annotation(s)");
        }
        RetrainCommands::Status => {
            let job = actions.job(session_id).await?;
            if ctx.json {
                return output::print_json(&job);
            }
            println!("{}", output::job_line(job.as_ref()));
        }
        RetrainCommands::Abort => {
            actions.abort(session_id).await?;
            println!("Retraining aborted");
        }
        RetrainCommands::Clear => {
            actions.clear(session_id).await?;
            println!("Retraining job cleared");
        }
        RetrainCommands::Logs => {
            let logs = actions.logs(session_id).await?;
            if ctx.json {
                return output::print_json(&logs);
            }
            for log in &logs {
                println!("{}", output::log_line(log));
            }
        }
        RetrainCommands::Watch => watch(ctx, &actions, session_id).await?,
    }
    Ok(())
}

async fn watch(ctx: &AppContext, actions: &RetrainActions, session_id: &str) -> anyhow::Result<()> {
    let (monitor, mut snapshots) =
        actions.monitor(session_id, ctx.review_config.retrain_poll_interval);
    let mut printed_logs = 0usize;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                monitor.stop();
                break;
            }
            received = snapshots.recv() => {
                let snapshot = match received {
                    Ok(snapshot) => snapshot,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Watcher fell behind");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                for log in snapshot.logs.iter().skip(printed_logs) {
                    println!("{}", output::log_line(log));
                }
                printed_logs = printed_logs.max(snapshot.logs.len());
                println!("{}", output::job_line(snapshot.job.as_ref()));
                if snapshot.is_terminal() {
                    break;
                }
            }
        }
    }

    monitor.join().await;
    Ok(())
}

//! `wildid` -- command-line reviewer for wildlife identification sessions.
//!
//! Talks to the identification service to list sessions, compute
//! predictions, accept/ignore/correct annotations and drive retraining.
//!
//! # Environment variables
//!
//! | Variable                      | Required | Default                 | Description                         |
//! |-------------------------------|----------|-------------------------|-------------------------------------|
//! | `WILDID_API_URL`              | no       | `http://localhost:5000` | Identification service base URL     |
//! | `WILDID_SESSION`              | no       | --                      | Session used when `--session` is omitted |
//! | `REQUEST_TIMEOUT_SECS`        | no       | no timeout              | Per-request timeout                 |
//! | `REVIEW_CONFIDENCE_THRESHOLD` | no       | `0.89`                  | Below this, open annotations need review |
//! | `RETRAIN_POLL_INTERVAL_SECS`  | no       | `5`                     | Seconds between retraining polls    |
//! | `ANNOTATION_CACHE_DIR`        | no       | in-memory only          | Directory for cached annotation sets |
//! | `RUST_LOG`                    | no       | `wildid=info`           | Log filter                          |

mod commands;
mod output;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wildid=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = commands::Cli::parse();
    commands::run(cli).await
}

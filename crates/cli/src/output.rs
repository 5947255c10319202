//! Plain-text rendering for terminal output.

use serde::Serialize;
use wildid_core::ordering::IdentitySummary;
use wildid_core::retrain::{RetrainEventLog, RetrainJob};
use wildid_core::session::Session;
use wildid_core::types::epoch_to_timestamp;
use wildid_core::Annotation;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn format_epoch(seconds: f64) -> String {
    epoch_to_timestamp(seconds)
        .map(|ts| ts.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn review_label(annotation: &Annotation) -> &'static str {
    if annotation.is_ignored() {
        "ignored"
    } else if annotation.is_accepted() {
        "accepted"
    } else {
        "open"
    }
}

pub fn annotation_line(annotation: &Annotation) -> String {
    format!(
        "{:>6}  {:<16} {:<24} {:>5.2}  {:<8}  {}",
        annotation.id,
        annotation.predicted_name,
        annotation.display_species(),
        annotation.species_confidence,
        review_label(annotation),
        annotation.file_name,
    )
}

pub fn summary_table(rows: &[IdentitySummary]) -> String {
    let mut out = format!(
        "{:>3}  {:<16} {:<24} {:>11} {:>8}\n",
        "#", "Name", "Species", "Appearances", "Reviewed"
    );
    for row in rows {
        out.push_str(&format!(
            "{:>3}  {:<16} {:<24} {:>11} {:>8}\n",
            row.index, row.name, row.species, row.appearances, row.reviewed
        ));
    }
    out
}

pub fn session_line(session: &Session) -> String {
    format!("{:<24} {}", session.id, session.name)
}

pub fn job_line(job: Option<&RetrainJob>) -> String {
    match job {
        Some(job) => format!(
            "Retraining {} (created {})",
            job.status,
            format_epoch(job.created_at)
        ),
        None => "No retraining job".to_string(),
    }
}

pub fn log_line(log: &RetrainEventLog) -> String {
    format!("[{}] {}", format_epoch(log.created_at), log.message)
}

//! `listcast` -- headless listing-to-social publishing run.
//!
//! Selects a property, generates drafts for every configured language and
//! channel, marks them ready and publishes (or schedules) them through the
//! backend. Failures surface as notifications in the log.
//!
//! # Environment variables
//!
//! See [`RunSettings::from_env`], `ClientConfig::from_env` and
//! `WorkflowConfig::from_env` for the full tables.

use std::sync::Arc;

use listcast_cli::RunSettings;
use listcast_client::{BackendApi, ClientConfig};
use listcast_events::{EventBus, Notification, NotificationFeed, NotificationLevel};
use listcast_workflow::{PublishReport, PublishingSession, Services, WorkflowConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listcast_cli=info,listcast_workflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = RunSettings::from_env()?;
    let client_config = ClientConfig::from_env()?;
    let workflow_config = WorkflowConfig::from_env()?;

    tracing::info!(
        property_id = %settings.property_id,
        languages = settings.languages.len(),
        channels = settings.channels.len(),
        scheduled = settings.schedule_at.is_some(),
        "Starting listcast",
    );

    let api = Arc::new(BackendApi::new(&client_config)?);
    let bus = Arc::new(EventBus::default());

    let (tx, rx) = mpsc::unbounded_channel();
    let feed = tokio::spawn(NotificationFeed::new(tx).run(bus.subscribe()));
    let printer = tokio::spawn(print_notifications(rx));

    let session = PublishingSession::new(Services::shared(api), Arc::clone(&bus), workflow_config);
    let result = run(&session, &settings).await;

    // Closing the bus stops the feed, which in turn ends the printer.
    drop(session);
    drop(bus);
    let _ = feed.await;
    let _ = printer.await;

    result
}

async fn run(session: &PublishingSession, settings: &RunSettings) -> anyhow::Result<()> {
    session.select_property(settings.property_id.as_str()).await?;
    session.set_channels(settings.channels.iter().copied()).await;

    let generations = settings
        .languages
        .iter()
        .map(|language| async move { (language, session.add_language(language.clone()).await) });
    for (language, outcome) in futures::future::join_all(generations).await {
        if let Err(e) = outcome {
            tracing::warn!(%language, error = %e, "Generation failed, continuing without it");
        }
    }

    let ready = session.mark_all_ready().await;
    session.flush_autosaves().await;
    tracing::info!(count = ready.len(), "Drafts marked ready");

    if let Some(dir) = &settings.export_dir {
        let path = session.export_ready_to(dir, settings.export_format).await?;
        tracing::info!(path = %path.display(), "Exported ready drafts");
    }

    let report = match settings.schedule_at {
        Some(at) => session.schedule_ready(at).await?,
        None => session.publish_ready().await?,
    };
    log_report(&report);

    let Some(job_id) = report.job_id.as_deref() else {
        return Ok(());
    };
    if settings.schedule_at.is_some() || report.pending.is_empty() {
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, no longer waiting for publish results");
            on_signal.cancel();
        }
    });

    let progress = session.await_job(job_id, &cancel).await?;
    tracing::info!(
        job_id,
        published = progress.published.len(),
        failed = progress.failed.len(),
        pending = progress.pending.len(),
        "Publish job finished",
    );
    Ok(())
}

fn log_report(report: &PublishReport) {
    tracing::info!(
        batch_id = %report.batch_id,
        job_id = report.job_id.as_deref().unwrap_or("-"),
        submitted = report.submitted.len(),
        rejected = report.rejected.len(),
        published = report.published.len(),
        failed = report.failed.len(),
        pending = report.pending.len(),
        "{}",
        report.message,
    );
    for rejection in &report.rejected {
        tracing::warn!(draft = %rejection.draft, error = %rejection.error, "Draft left out of batch");
    }
}

async fn print_notifications(mut rx: mpsc::UnboundedReceiver<Notification>) {
    while let Some(n) = rx.recv().await {
        match n.level {
            NotificationLevel::Error => {
                tracing::error!(retryable = n.retryable, "{}: {}", n.title, n.message)
            }
            NotificationLevel::Warning => tracing::warn!("{}: {}", n.title, n.message),
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!("{}: {}", n.title, n.message)
            }
        }
    }
}

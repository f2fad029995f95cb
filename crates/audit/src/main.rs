use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zenpro_core::risk::RiskPolicy;
use zenpro_core::storage::{open_source, BrokerSource};

mod report;

#[derive(Debug, Parser)]
#[command(name = "zenpro_audit")]
struct Args {
    /// Maximum number of risky brokers listed in the report.
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Exit with an error when any blob column fails to decode.
    #[arg(long)]
    fail_on_malformed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = zenpro_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let source: Arc<dyn BrokerSource> = open_source(&settings)
        .await
        .context("audit needs a broker source")?;

    // The API degrades to empty on fetch errors; the audit should not.
    let records = source
        .fetch_all()
        .await
        .with_context(|| format!("fetch brokers from {} failed", source.source_name()))?;
    let brokers = zenpro_core::normalize::normalize_all(records);

    let report = report::AuditReport::build(&brokers, &RiskPolicy::from_env(), args.limit);
    for diag in &report.diagnostics {
        tracing::warn!(code = %diag.code, field = diag.field, detail = %diag.detail, "malformed blob");
    }

    tracing::info!(
        source = source.source_name(),
        total = report.total_brokers,
        risky = report.risky_total,
        malformed = report.diagnostics.len(),
        "audit finished"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    if args.fail_on_malformed && !report.diagnostics.is_empty() {
        let err = anyhow::anyhow!(
            "{} malformed blob field(s) found",
            report.diagnostics.len()
        );
        sentry_anyhow::capture_anyhow(&err);
        return Err(err);
    }

    Ok(())
}

fn init_sentry(settings: &zenpro_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

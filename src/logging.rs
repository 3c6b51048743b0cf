use std::io;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: a terse console layer on stderr (stdout
/// carries the report JSON) and a verbose daily log file under `logs/`.
/// `RUST_LOG` overrides the console filter.
pub fn configure_logging() {
    // Console log configuration
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "info,llm_request=warn,cluster_validation=info,story_batch=info,report_analysis=info,dataset=info,pipeline=info",
        )
    });
    let console_log = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(console_filter);

    // File log configuration
    let file_appender = rolling::daily("logs", "dossier.log");
    let file_log = fmt::layer()
        .with_ansi(false)
        .with_writer(file_appender)
        .with_filter(EnvFilter::new("info,llm_request=debug,report_analysis=debug"));

    tracing_subscriber::Registry::default()
        .with(console_log)
        .with(file_log)
        .init();
}

use anyhow::Result;
use cookbook_core::settings::api_server::LogFormat;
use tracing::{info, Subscriber};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan, Layer};
use tracing_subscriber::{registry, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=info";

pub fn build_logger_text<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if cfg!(debug_assertions) {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_line_number(false)
                .with_thread_names(false)
                .with_timer(tracing_subscriber::fmt::time::SystemTime)
                .with_target(true)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE)
                .event_format(tracing_subscriber::fmt::format().compact()),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_timer(tracing_subscriber::fmt::time::SystemTime)
                .with_target(true),
        )
    }
}

pub fn build_logger_json<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    Box::new(
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true),
    )
}

pub fn build_loglevel_filter_layer() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

pub fn init_tracing(format: LogFormat) -> Result<()> {
    let logger = match format {
        LogFormat::Text => build_logger_text(),
        LogFormat::Json => build_logger_json(),
    };

    let subscriber = registry()
        .with(build_loglevel_filter_layer())
        .with(logger);
    tracing::subscriber::set_global_default(subscriber)?;

    info!(?format, "Logging initialized");
    Ok(())
}

use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::application::render::METRIC_RENDER_TOTAL;
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the process-wide subscriber: `RUST_LOG` directives over the
/// configured level, span traces for errors, and one line per event on stderr.
///
/// Stdout is left alone so `render` output can be piped.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(render_filter(logging.level, directives.as_deref()))
        .with(ErrorLayer::default())
        .with(stderr_layer(logging.format))
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("tracing subscriber already set: {err}")))
}

/// Explicit directives win; the configured level applies to everything else.
fn render_filter(level: LevelFilter, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives.unwrap_or_default())
}

fn stderr_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer().with_target(true).with_writer(std::io::stderr);
    match format {
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_RENDER_TOTAL,
            Unit::Count,
            "Renders by delivery mode; outcome is body, started, response, error or failed."
        );
    });
}

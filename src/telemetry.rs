use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::Tracer;
use secrecy::ExposeSecret;
use tokio::task::JoinHandle;
use tonic::metadata::MetadataMap;
use tracing::subscriber::set_global_default;
use tracing::Span;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::configuration::TelemetrySettings;

pub fn init_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
    settings: &TelemetrySettings,
) where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    LogTracer::init().expect("Failed to set logger");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    let registry = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    match otlp_tracer(settings) {
        Some(tracer) => {
            let registry = registry.with(tracing_opentelemetry::layer().with_tracer(tracer));
            set_global_default(registry).expect("Failed to set subscriber");
        }
        None => {
            set_global_default(registry).expect("Failed to set subscriber");
        }
    }
}

fn otlp_tracer(settings: &TelemetrySettings) -> Option<Tracer> {
    if !settings.enabled {
        return None;
    }
    let mut metadata = MetadataMap::new();
    metadata.insert(
        "x-honeycomb-team",
        settings
            .api_key
            .expose_secret()
            .parse()
            .expect("Failed to parse the telemetry api key"),
    );
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_metadata(metadata)
                .with_endpoint(&settings.endpoint)
                .with_tls_config(Default::default()),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .expect("Failed to install the otlp tracing pipeline");
    Some(tracer)
}

pub fn spawn_blocking_with_tracing<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let current_span = Span::current();
    tokio::task::spawn_blocking(move || current_span.in_scope(f))
}

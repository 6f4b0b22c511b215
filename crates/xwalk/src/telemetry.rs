//! Logging and optional OpenTelemetry export for the controller.
//!
//! Console logging is always on. When an OTLP endpoint is configured,
//! traces, logs and metrics are exported to it as well.

use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry::metrics::Counter;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use xwalkconf::TelemetryConfig;

/// Timeout for OTLP exports - prevents blocking on unavailable endpoints
const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

const SERVICE_NAME: &str = "xwalk";

/// Keeps exporters alive; flushes them on [`TelemetryGuard::shutdown`].
#[derive(Default)]
pub struct TelemetryGuard {
    providers: Option<(SdkTracerProvider, SdkLoggerProvider, SdkMeterProvider)>,
}

impl TelemetryGuard {
    pub fn exporting(&self) -> bool {
        self.providers.is_some()
    }

    pub fn shutdown(self) {
        let Some((tracer, logger, meter)) = self.providers else {
            return;
        };
        tracing::info!("Flushing OpenTelemetry exporters");
        if let Err(e) = tracer.shutdown() {
            eprintln!("trace exporter shutdown: {e:?}");
        }
        if let Err(e) = meter.shutdown() {
            eprintln!("metric exporter shutdown: {e:?}");
        }
        if let Err(e) = logger.shutdown() {
            eprintln!("log exporter shutdown: {e:?}");
        }
    }
}

/// Controller counters. Recording is a no-op until a meter provider is
/// installed by [`init`].
#[derive(Clone)]
pub struct Metrics {
    selections: Counter<u64>,
    exhausted: Counter<u64>,
    dropped_events: Counter<u64>,
    dropped_commands: Counter<u64>,
}

impl Default for Metrics {
    fn default() -> Self {
        let meter = global::meter(SERVICE_NAME);
        Self {
            selections: meter
                .u64_counter("xwalk.selections")
                .with_description("Walks selected, by category")
                .build(),
            exhausted: meter
                .u64_counter("xwalk.exhausted")
                .with_description("Triggers with no eligible walk")
                .build(),
            dropped_events: meter
                .u64_counter("xwalk.events.dropped")
                .with_description("Inbound events dropped after an error")
                .build(),
            dropped_commands: meter
                .u64_counter("xwalk.commands.dropped")
                .with_description("Control commands that failed to publish")
                .build(),
        }
    }
}

impl Metrics {
    pub fn selection(&self, category: &str) {
        self.selections
            .add(1, &[KeyValue::new("category", category.to_string())]);
    }

    pub fn exhausted(&self) {
        self.exhausted.add(1, &[]);
    }

    pub fn dropped_event(&self, reason: &'static str) {
        self.dropped_events.add(1, &[KeyValue::new("reason", reason)]);
    }

    pub fn dropped_command(&self) {
        self.dropped_commands.add(1, &[]);
    }
}

/// `RUST_LOG` wins; otherwise the configured level.
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

pub fn init(config: &TelemetryConfig) -> Result<TelemetryGuard> {
    match config.otlp() {
        Some(endpoint) => init_otlp(endpoint, &config.log_level),
        None => {
            tracing_subscriber::registry()
                .with(env_filter(&config.log_level))
                .with(tracing_subscriber::fmt::layer())
                .try_init()
                .context("Failed to install tracing subscriber")?;
            Ok(TelemetryGuard::default())
        }
    }
}

fn init_otlp(otlp_endpoint: &str, log_level: &str) -> Result<TelemetryGuard> {
    let resource = Resource::builder_empty()
        .with_service_name(SERVICE_NAME)
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let endpoint = if otlp_endpoint.starts_with("http") {
        otlp_endpoint.to_string()
    } else {
        format!("http://{}", otlp_endpoint)
    };

    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to create OTLP span exporter")?;

    let batch_span_processor =
        opentelemetry_sdk::trace::BatchSpanProcessor::builder(trace_exporter).build();

    let tracer_provider = SdkTracerProvider::builder()
        .with_span_processor(batch_span_processor)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource.clone())
        .build();

    let tracer = tracer_provider.tracer(SERVICE_NAME);
    global::set_tracer_provider(tracer_provider.clone());

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to create OTLP log exporter")?;

    let log_processor =
        opentelemetry_sdk::logs::BatchLogProcessor::builder(log_exporter).build();

    let logger_provider = SdkLoggerProvider::builder()
        .with_log_processor(log_processor)
        .with_resource(resource.clone())
        .build();

    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("Failed to create OTLP metric exporter")?;

    let metric_reader =
        opentelemetry_sdk::metrics::PeriodicReader::builder(metric_exporter).build();

    let meter_provider = SdkMeterProvider::builder()
        .with_reader(metric_reader)
        .with_resource(resource)
        .build();

    global::set_meter_provider(meter_provider.clone());

    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    let log_appender =
        opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(&logger_provider);

    tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .with(log_appender)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(endpoint = %otlp_endpoint, "OpenTelemetry export enabled");

    Ok(TelemetryGuard {
        providers: Some((tracer_provider, logger_provider, meter_provider)),
    })
}

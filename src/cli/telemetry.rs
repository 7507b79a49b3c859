//! Log subscriber setup with optional OTLP span export over gRPC.

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine};
use once_cell::sync::OnceCell;
use opentelemetry::{
    global,
    propagation::TextMapCompositePropagator,
    trace::TracerProvider as _,
    KeyValue,
};
use opentelemetry_otlp::{Compression, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
    Resource,
};
use std::{env::var, time::Duration};
use tonic::{
    metadata::{Ascii, Binary, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use ulid::Ulid;
use url::Url;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Appended after `RUST_LOG` so dependencies stay quiet at debug verbosity.
const QUIET_TARGETS: [&str; 4] = [
    "hyper=error",
    "tokio=error",
    "sqlx=warn",
    "opentelemetry_sdk=warn",
];

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Where and how spans are exported, read from the `OTEL_*` variables.
#[derive(Debug, PartialEq, Eq)]
struct OtlpSettings {
    endpoint: String,
    /// Set for https endpoints only.
    tls_domain: Option<String>,
    headers: Vec<(String, String)>,
    instance_id: String,
}

impl OtlpSettings {
    fn from_env() -> Option<Self> {
        Self::from_lookup(|name| var(name).ok())
    }

    /// `None` unless `OTEL_EXPORTER_OTLP_ENDPOINT` is set and non-blank.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
            .map(|raw| with_scheme(&raw))
            .filter(|endpoint| !endpoint.is_empty())?;
        let tls_domain = Url::parse(&endpoint)
            .ok()
            .filter(|url| url.scheme() == "https")
            .and_then(|url| url.host_str().map(str::to_string));

        Some(Self {
            tls_domain,
            headers: lookup("OTEL_EXPORTER_OTLP_HEADERS")
                .map(|raw| header_pairs(&raw))
                .unwrap_or_default(),
            instance_id: lookup("OTEL_SERVICE_INSTANCE_ID")
                .unwrap_or_else(|| Ulid::new().to_string()),
            endpoint,
        })
    }

    /// gRPC metadata for the exporter. Keys ending in `-bin` carry base64.
    fn metadata(&self) -> Result<MetadataMap> {
        let mut metadata = MetadataMap::with_capacity(self.headers.len());
        for (key, value) in &self.headers {
            if key.ends_with("-bin") {
                let bytes = general_purpose::STANDARD
                    .decode(value)
                    .map_err(|e| anyhow!("header {key} is not valid base64: {e}"))?;
                let name = MetadataKey::<Binary>::from_bytes(key.as_bytes())
                    .map_err(|e| anyhow!("invalid header name {key}: {e}"))?;
                metadata.insert_bin(name, MetadataValue::from_bytes(&bytes));
            } else {
                let name = MetadataKey::<Ascii>::from_bytes(key.as_bytes())
                    .map_err(|e| anyhow!("invalid header name {key}: {e}"))?;
                let value: MetadataValue<Ascii> = value
                    .parse()
                    .map_err(|e| anyhow!("invalid value for header {key}: {e}"))?;
                metadata.insert(name, value);
            }
        }
        Ok(metadata)
    }

    fn exporter(&self) -> Result<SpanExporter> {
        let mut builder = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&self.endpoint)
            .with_compression(Compression::Gzip)
            .with_timeout(EXPORT_TIMEOUT);

        if let Some(domain) = &self.tls_domain {
            builder = builder.with_tls_config(
                ClientTlsConfig::new()
                    .domain_name(domain.clone())
                    .with_native_roots(),
            );
        }
        if !self.headers.is_empty() {
            builder = builder.with_metadata(self.metadata()?);
        }

        Ok(builder.build()?)
    }

    fn resource(&self) -> Resource {
        Resource::builder_empty()
            .with_attributes([
                KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                KeyValue::new("service.instance.id", self.instance_id.clone()),
            ])
            .build()
    }
}

/// Bare `host:port` endpoints are assumed to be TLS.
fn with_scheme(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw.trim_end_matches('/'))
    }
}

/// `k1=v1,k2=v2` into lowercase keys; pairs without a key or `=` are dropped.
fn header_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn install_tracer(settings: &OtlpSettings) -> Result<Tracer> {
    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(settings.exporter()?)
        .with_resource(settings.resource())
        .build();

    if TRACER_PROVIDER.set(provider.clone()).is_err() {
        debug!("tracer provider already installed");
    }
    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

fn env_filter(default: Level) -> Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();
    for directive in QUIET_TARGETS {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Install the global subscriber. Spans are exported when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set. `RUST_LOG` overrides `verbosity_level`.
///
/// # Errors
///
/// Returns an error if the exporter or subscriber cannot be installed.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let otel_layer = OtlpSettings::from_env()
        .map(|settings| install_tracer(&settings))
        .transpose()?
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let subscriber = Registry::default()
        .with(fmt_layer)
        .with(otel_layer)
        .with(env_filter(verbosity_level.unwrap_or(Level::ERROR))?);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Flush pending spans. Does nothing when export was never enabled.
pub fn shutdown_tracer() {
    let Some(provider) = TRACER_PROVIDER.get() else {
        return;
    };
    if let Err(err) = provider.shutdown() {
        debug!("tracer provider shutdown failed: {err}");
    }
}

//! Observability wiring for the back-office service.
//!
//! # Purpose
//! Installs the tracing subscriber (with an optional OTLP layer), the W3C
//! trace-context propagator, and the Prometheus recorder behind `/metrics`.
//!
//! # Notes
//! Initialization is guarded by `OnceLock` so repeated calls in tests are no-ops.
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use metrics_exporter_prometheus::PrometheusHandle;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static TRACING_INIT: OnceLock<()> = OnceLock::new();
static PROPAGATOR_INIT: OnceLock<()> = OnceLock::new();

/// Install tracing and the metrics recorder, returning the scrape handle.
///
/// # Errors
/// Fails only when another metrics recorder was installed outside this module.
pub fn init_observability(service_name: &str) -> anyhow::Result<PrometheusHandle> {
    TRACING_INIT.get_or_init(|| {
        install_propagator();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer());
        match otlp_tracer_provider(service_name) {
            Some(provider) => {
                let tracer = provider.tracer(service_name.to_string());
                global::set_tracer_provider(provider);
                let _ = registry
                    .with(tracing_opentelemetry::layer().with_tracer(tracer))
                    .try_init();
            }
            None => {
                let _ = registry.try_init();
            }
        }
    });
    install_metrics_recorder()
}

fn install_propagator() {
    PROPAGATOR_INIT.get_or_init(|| {
        global::set_text_map_propagator(
            opentelemetry_sdk::propagation::TraceContextPropagator::new(),
        );
    });
}

fn otel_disabled() -> bool {
    std::env::var("OTEL_SDK_DISABLED")
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn otlp_tracer_provider(service_name: &str) -> Option<SdkTracerProvider> {
    if otel_disabled() {
        return None;
    }
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .ok()?;
    let resource = Resource::builder_empty()
        .with_attributes(resource_attributes(service_name))
        .build();
    Some(
        SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build(),
    )
}

fn resource_attributes(service_name: &str) -> Vec<KeyValue> {
    let mut attrs = vec![KeyValue::new("service.name", service_name.to_string())];
    if let Ok(value) =
        std::env::var("REALTY_SERVICE_INSTANCE_ID").or_else(|_| std::env::var("HOSTNAME"))
    {
        attrs.push(KeyValue::new("service.instance.id", value));
    }
    if let Ok(value) = std::env::var("DEPLOYMENT_ENVIRONMENT") {
        attrs.push(KeyValue::new("deployment.environment", value));
    }
    attrs
}

/// Extract the caller's W3C trace context so request spans join its trace.
pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    install_propagator();
    global::get_text_map_propagator(|prop| prop.extract(&HeaderMapExtractor(headers)))
}

struct HeaderMapExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderMapExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

pub async fn serve_metrics(handle: PrometheusHandle, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics listening");
    serve_metrics_with_listener(handle, listener, std::future::pending()).await
}

async fn serve_metrics_with_listener<F>(
    handle: PrometheusHandle,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    );
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

fn install_metrics_recorder() -> anyhow::Result<PrometheusHandle> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("install metrics recorder")?;
    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{TraceContextExt, TraceId};
    use serial_test::serial;
    use std::time::Duration;
    use tokio::sync::oneshot;

    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::set_var(key, value);
            }
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::remove_var(key);
            }
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(value) => unsafe {
                    std::env::set_var(self.key, value);
                },
                None => unsafe {
                    std::env::remove_var(self.key);
                },
            }
        }
    }

    fn attribute(attrs: &[KeyValue], key: &str) -> Option<String> {
        attrs
            .iter()
            .find(|attr| attr.key.as_str() == key)
            .map(|attr| attr.value.to_string())
    }

    #[test]
    #[serial]
    fn resource_attributes_prefer_instance_id_over_hostname() {
        let _instance = EnvGuard::set("REALTY_SERVICE_INSTANCE_ID", "backoffice-1");
        let _host = EnvGuard::set("HOSTNAME", "host-1");
        let _env = EnvGuard::set("DEPLOYMENT_ENVIRONMENT", "staging");

        let attrs = resource_attributes("realty-backoffice");
        assert_eq!(
            attribute(&attrs, "service.name").as_deref(),
            Some("realty-backoffice")
        );
        assert_eq!(
            attribute(&attrs, "service.instance.id").as_deref(),
            Some("backoffice-1")
        );
        assert_eq!(
            attribute(&attrs, "deployment.environment").as_deref(),
            Some("staging")
        );
    }

    #[test]
    #[serial]
    fn resource_attributes_fall_back_to_hostname() {
        let _instance = EnvGuard::unset("REALTY_SERVICE_INSTANCE_ID");
        let _host = EnvGuard::set("HOSTNAME", "host-1");
        let attrs = resource_attributes("realty-backoffice");
        assert_eq!(
            attribute(&attrs, "service.instance.id").as_deref(),
            Some("host-1")
        );
    }

    #[test]
    #[serial]
    fn otel_can_be_disabled_from_env() {
        let _guard = EnvGuard::set("OTEL_SDK_DISABLED", "TRUE");
        assert!(otel_disabled());
        assert!(otlp_tracer_provider("realty-backoffice").is_none());
    }

    #[test]
    fn header_extractor_skips_non_utf8_values() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("tracestate", "congo=t61rcWkgMzE".parse().unwrap());
        headers.insert(
            "traceparent",
            axum::http::HeaderValue::from_bytes(b"\xFF").unwrap(),
        );
        let extractor = HeaderMapExtractor(&headers);
        assert!(extractor.get("traceparent").is_none());
        assert_eq!(extractor.get("tracestate"), Some("congo=t61rcWkgMzE"));
        assert_eq!(extractor.keys().len(), 2);
    }

    #[test]
    fn trace_context_joins_incoming_trace() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
                .parse()
                .unwrap(),
        );
        let context = trace_context_from_headers(&headers);
        let span = context.span();
        let span_ctx = span.span_context();
        assert!(span_ctx.is_valid());
        assert_eq!(
            span_ctx.trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
        );
    }

    #[test]
    fn trace_context_without_headers_is_empty() {
        let context = trace_context_from_headers(&axum::http::HeaderMap::new());
        assert!(!context.span().span_context().is_valid());
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn metrics_endpoint_renders_recorded_counters() {
        let _otel = EnvGuard::set("OTEL_SDK_DISABLED", "true");
        let handle = init_observability("realty-backoffice-test").expect("observability");
        let again = init_observability("realty-backoffice-test").expect("idempotent");
        metrics::counter!("realty_observability_probe_total").increment(1);
        let _ = again.render();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_metrics_with_listener(handle, listener, async move {
            let _ = shutdown_rx.await;
        }));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .no_proxy()
            .build()
            .expect("client");
        let body = client
            .get(format!("http://{addr}/metrics"))
            .send()
            .await
            .expect("GET /metrics")
            .error_for_status()
            .expect("metrics status")
            .text()
            .await
            .expect("body");
        assert!(body.contains("realty_observability_probe_total"));

        let _ = shutdown_tx.send(());
        let _ = tokio::time::timeout(Duration::from_secs(1), server)
            .await
            .expect("server shutdown");
    }
}

//! Scrape endpoint.
//!
//! A hyper HTTP/1 server with four routes:
//!
//! | Path | Response |
//! |---|---|
//! | telemetry path (default `/metrics`) | pf families, then the exporter's own metrics |
//! | `/` | HTML landing page linking to the telemetry path |
//! | `/healthz` | `OK` |
//! | anything else | 404 |
//!
//! Each scrape gathers the prometheus [`Registry`] on the blocking pool,
//! since the pf read is a synchronous syscall.
//!
//! # Usage
//!
//! ```ignore
//! let self_metrics = install_self_metrics()?;
//! let state = ScrapeState::new(collector, "/metrics", Some(self_metrics))?;
//! MetricsServer::bind(addr, state).await?.serve(shutdown).await?;
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use prometheus::Registry;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use pf_exporter_core::PfCollector;
use pf_exporter_core::error::ExpositionError;
use pf_exporter_core::exposition::{TEXT_CONTENT_TYPE, encode_text};
use pf_exporter_core::metrics as m;

/// Install the global `metrics` recorder for the exporter's own metrics.
///
/// No listener is started; the returned handle is rendered into every
/// scrape instead. Call once per process.
pub fn install_self_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(m::COLLECT_DURATION_SECONDS.to_owned()),
            &m::COLLECT_DURATION_BUCKETS,
        )
        .map_err(|e| anyhow::anyhow!("invalid histogram buckets: {}", e))?
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    m::describe_all();
    metrics::gauge!(m::BUILD_INFO, m::LABEL_VERSION => env!("CARGO_PKG_VERSION")).set(1.0);

    debug!("exporter self-metrics recorder installed");
    Ok(handle)
}

/// Everything a request handler needs.
pub struct ScrapeState {
    registry: Registry,
    telemetry_path: String,
    self_metrics: Option<PrometheusHandle>,
}

impl ScrapeState {
    /// Registers `collector` in a fresh registry.
    pub fn new(
        collector: Arc<PfCollector>,
        telemetry_path: impl Into<String>,
        self_metrics: Option<PrometheusHandle>,
    ) -> Result<Self> {
        let registry = Registry::new();
        registry
            .register(Box::new(SharedCollector(collector)))
            .map_err(|e| anyhow::anyhow!("failed to register pf collector: {}", e))?;
        Ok(Self {
            registry,
            telemetry_path: telemetry_path.into(),
            self_metrics,
        })
    }

    pub fn telemetry_path(&self) -> &str {
        &self.telemetry_path
    }

    /// Runs one gather and renders the scrape body. Blocks on the pf read.
    pub fn render(&self) -> Result<String, ExpositionError> {
        let mut body = encode_text(&self.registry.gather())?;
        if let Some(handle) = &self.self_metrics {
            body.push_str(&handle.render());
        }
        Ok(body)
    }

    fn landing_page(&self) -> String {
        format!(
            "<html>\n<head><title>pf Exporter</title></head>\n<body>\n<h1>pf Exporter</h1>\n\
             <p><a href='{}'>Metrics</a></p>\n</body>\n</html>\n",
            self.telemetry_path
        )
    }
}

/// Lets the registry own a reference to a collector the daemon also uses.
struct SharedCollector(Arc<PfCollector>);

impl Collector for SharedCollector {
    fn desc(&self) -> Vec<&Desc> {
        Collector::desc(&*self.0)
    }

    fn collect(&self) -> Vec<MetricFamily> {
        Collector::collect(&*self.0)
    }
}

/// A bound, not yet serving, scrape endpoint.
pub struct MetricsServer {
    listener: TcpListener,
    state: Arc<ScrapeState>,
}

impl MetricsServer {
    pub async fn bind(addr: SocketAddr, state: ScrapeState) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", addr, e))?;

        if addr.ip().is_unspecified() {
            warn!(
                listen_addr = %addr,
                "metrics endpoint is exposed on all interfaces; restrict web.listen_address in untrusted networks"
            );
        }

        Ok(Self {
            listener,
            state: Arc::new(state),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Connections already accepted finish on their own tasks.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let addr = self.local_addr()?;
        info!(
            listen_addr = %addr,
            telemetry_path = %self.state.telemetry_path,
            "serving pf metrics"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, remote_addr)) => {
                            let state = Arc::clone(&self.state);
                            tokio::spawn(async move {
                                let service = service_fn(move |req| {
                                    let state = Arc::clone(&state);
                                    async move { handle_request(req, state).await }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(TokioIo::new(stream), service)
                                    .await
                                {
                                    debug!(%remote_addr, error = %e, "connection error");
                                }
                            });
                        }
                        Err(e) => error!(error = %e, "accept error"),
                    }
                }
                () = &mut shutdown => {
                    info!("metrics server shutting down");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ScrapeState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return Ok(response(
            StatusCode::METHOD_NOT_ALLOWED,
            "text/plain",
            "Method Not Allowed",
        ));
    }

    let path = req.uri().path().to_owned();
    if path == state.telemetry_path {
        Ok(scrape(state).await)
    } else if path == "/" {
        Ok(response(StatusCode::OK, "text/html", state.landing_page()))
    } else if path == "/healthz" {
        Ok(response(StatusCode::OK, "text/plain", "OK"))
    } else {
        Ok(response(StatusCode::NOT_FOUND, "text/plain", "Not Found"))
    }
}

async fn scrape(state: Arc<ScrapeState>) -> Response<Full<Bytes>> {
    match tokio::task::spawn_blocking(move || state.render()).await {
        Ok(Ok(body)) => response(StatusCode::OK, TEXT_CONTENT_TYPE, body),
        Ok(Err(e)) => {
            error!(error = %e, "failed to encode metrics");
            response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                format!("failed to encode metrics: {e}"),
            )
        }
        Err(e) => {
            error!(error = %e, "scrape task failed");
            response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                "scrape task failed",
            )
        }
    }
}

fn response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

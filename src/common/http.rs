//! Hyper-based [`Transport`]: TLS, proxy tunnelling, streaming bodies.

use std::future::Future;
use std::io;
use std::ops::ControlFlow;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::SinkExt;
use futures::StreamExt;
use futures::channel::mpsc;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::{HeaderMap, Response, Uri, header};
use hyper_rustls::builderstates::WantsSchemes;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::connect::proxy::Tunnel;
use hyper_util::client::legacy::{Builder, Client, ResponseFuture};
use hyper_util::rt::TokioExecutor;
use rustls::RootCertStore;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use crate::common::compression::{decompress_stream, detect_encodings};
use crate::webdav::config::Config;
use crate::webdav::error::TransportCode;
use crate::webdav::request::{Exchange, RequestBody, Transport, TransportReply};
use crate::webdav::types::{ProgressFn, TransferProgress};

/// Request body type used by the Hyper clients.
pub type OutgoingBody = UnsyncBoxBody<Bytes, io::Error>;

const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(20);
const CHUNK_SIZE: usize = 64 * 1024;
const UPLOAD_QUEUE: usize = 4;

static CRYPTO_PROVIDER: Once = Once::new();

/// Install the process-wide rustls crypto provider.
///
/// Runs at most once per process no matter how many clients are built
/// concurrently. The provider lives until the process exits.
pub fn init_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        if rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .is_err()
        {
            debug!("a rustls crypto provider was already installed");
        }
    });
}

/// Hyper client, either connecting directly or through an HTTP `CONNECT` proxy.
#[derive(Clone)]
pub enum HyperClient {
    Direct(Client<HttpsConnector<HttpConnector>, OutgoingBody>),
    Tunneled(Client<HttpsConnector<Tunnel<HttpConnector>>, OutgoingBody>),
}

impl HyperClient {
    fn request(&self, req: hyper::Request<OutgoingBody>) -> ResponseFuture {
        match self {
            HyperClient::Direct(client) => client.request(req),
            HyperClient::Tunneled(client) => client.request(req),
        }
    }
}

/// Build a Hyper client configured with HTTP/2, connection pooling, and a TLS connector.
///
/// Without a client certificate the connector prefers native roots and falls back to
/// the bundled WebPKI store. With `cert_path` set, the WebPKI store is used and the
/// certificate is presented to the server. A configured proxy is reached with
/// `CONNECT` tunnelling.
pub fn build_hyper_client(config: &Config) -> Result<HyperClient> {
    init_crypto_provider();

    let https_builder = tls_builder(config)?
        .https_or_http()
        .enable_http1()
        .enable_http2();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    if config.proxy_enabled() {
        let proxy = proxy_uri(&config.proxy_hostname)?;
        let mut tunnel = Tunnel::new(proxy, http);
        if let Some(auth) = config.proxy_auth() {
            tunnel = tunnel.with_auth(auth);
        }
        let https = https_builder.wrap_connector(tunnel);
        return Ok(HyperClient::Tunneled(
            pool_builder().build::<_, OutgoingBody>(https),
        ));
    }

    let https = https_builder.wrap_connector(http);
    Ok(HyperClient::Direct(
        pool_builder().build::<_, OutgoingBody>(https),
    ))
}

fn pool_builder() -> Builder {
    let mut builder = Client::builder(TokioExecutor::new());
    builder
        .http2_adaptive_window(true)
        .pool_max_idle_per_host(128);
    builder
}

fn tls_builder(config: &Config) -> Result<HttpsConnectorBuilder<WantsSchemes>> {
    if config.cert_required() {
        return Ok(HttpsConnectorBuilder::new().with_tls_config(client_auth_tls(config)?));
    }

    Ok(HttpsConnectorBuilder::new()
        .with_native_roots()
        .unwrap_or_else(|err| {
            warn!(error = %err, "native roots unavailable, falling back to webpki roots");
            HttpsConnectorBuilder::new().with_webpki_roots()
        }))
}

fn client_auth_tls(config: &Config) -> Result<rustls::ClientConfig> {
    let certs = CertificateDer::pem_file_iter(&config.cert_path)
        .with_context(|| format!("cannot open client certificate {}", config.cert_path))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid client certificate {}", config.cert_path))?;

    let key_path = if config.key_path.is_empty() {
        &config.cert_path
    } else {
        &config.key_path
    };
    let key = PrivateKeyDer::from_pem_file(key_path)
        .with_context(|| format!("cannot load client key {}", key_path))?;

    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(certs, key)
        .context("client certificate rejected by TLS configuration")
}

fn proxy_uri(raw: &str) -> Result<Uri> {
    let raw = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };
    raw.parse()
        .with_context(|| format!("invalid proxy address {}", raw))
}

/// Production [`Transport`] on top of hyper.
///
/// Cloning is cheap and reuses the same connection pool.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    response_timeout: Option<Duration>,
}

impl HyperTransport {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_hyper_client(config)?,
            response_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
        })
    }

    /// Limit the wait for response headers (not applied to streamed uploads).
    /// `None` waits indefinitely.
    pub fn with_response_timeout(mut self, limit: Option<Duration>) -> Self {
        self.response_timeout = limit;
        self
    }

    async fn run(&self, exchange: Exchange<'_>) -> TransportReply {
        let Exchange {
            method,
            uri,
            mut headers,
            body,
            sink,
            progress,
        } = exchange;
        let tracker = ProgressTracker::new(progress);

        if let Some(length) = body.length() {
            headers.insert(header::CONTENT_LENGTH, header::HeaderValue::from(length));
            tracker.set_upload_total(length);
        }

        let (outgoing, source) = match body {
            RequestBody::Empty => (empty_body(), None),
            RequestBody::Bytes(bytes) => (full_body(bytes), None),
            RequestBody::Reader { reader, .. } => {
                let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(UPLOAD_QUEUE);
                let stream = rx.map(|chunk| chunk.map(Frame::data));
                (StreamBody::new(stream).boxed_unsync(), Some((reader, tx)))
            }
        };

        let mut req_builder = hyper::Request::builder().method(method).uri(uri);
        for (k, v) in headers.iter() {
            req_builder = req_builder.header(k, v);
        }
        let req = match req_builder.body(outgoing) {
            Ok(req) => req,
            Err(err) => {
                debug!(error = %err, "cannot assemble request");
                return TransportReply::failed(TransportCode::MalformedUrl);
            }
        };

        let fut = self.client.request(req);
        let (result, pumped) = match source {
            Some((reader, tx)) => {
                let pump = pump_body(reader, tx, &tracker);
                send_while_pumping(fut, pump).await
            }
            None => match self.response_timeout {
                Some(limit) => match timeout(limit, fut).await {
                    Ok(result) => (result, None),
                    Err(_) => return TransportReply::failed(TransportCode::Timeout),
                },
                None => (fut.await, None),
            },
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                let code = match pumped {
                    Some(Err(code)) => code,
                    _ if tracker.aborted() => TransportCode::Aborted,
                    _ if err.is_connect() => TransportCode::Connect,
                    _ => TransportCode::Other,
                };
                debug!(error = %err, transport = %code, "request failed");
                return TransportReply::failed(code);
            }
        };

        if tracker.upload_total() > 0 {
            tracker.uploaded_all();
        }

        let status = response.status().as_u16();
        let code = match sink {
            Some(sink) => receive_body(response, sink, &tracker).await,
            None => TransportCode::Ok,
        };
        TransportReply::new(code, status)
    }
}

impl Transport for HyperTransport {
    fn perform<'a>(
        &'a self,
        exchange: Exchange<'a>,
    ) -> impl Future<Output = TransportReply> + Send + 'a {
        self.run(exchange)
    }
}

fn empty_body() -> OutgoingBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

fn full_body(bytes: Bytes) -> OutgoingBody {
    Full::new(bytes).map_err(|never| match never {}).boxed_unsync()
}

type SendResult = Result<Response<Incoming>, hyper_util::client::legacy::Error>;

/// Await the response while feeding the request body; the pump is dropped as soon
/// as the response arrives.
async fn send_while_pumping<P>(
    fut: ResponseFuture,
    pump: P,
) -> (SendResult, Option<Result<(), TransportCode>>)
where
    P: Future<Output = Result<(), TransportCode>>,
{
    tokio::pin!(fut);
    tokio::pin!(pump);
    let mut pumped = None;
    let result = loop {
        tokio::select! {
            result = &mut fut => break result,
            done = &mut pump, if pumped.is_none() => pumped = Some(done),
        }
    };
    (result, pumped)
}

async fn pump_body(
    reader: &mut (dyn AsyncRead + Send + Unpin),
    mut tx: mpsc::Sender<io::Result<Bytes>>,
    tracker: &ProgressTracker,
) -> Result<(), TransportCode> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(err) => {
                debug!(error = %err, "upload source failed");
                let _ = tx.send(Err(err)).await;
                return Err(TransportCode::Read);
            }
        };
        if tracker.uploaded(n as u64).is_break() {
            let _ = tx
                .send(Err(io::Error::other("transfer aborted by progress callback")))
                .await;
            return Err(TransportCode::Aborted);
        }
        if tx
            .send(Ok(Bytes::copy_from_slice(&buf[..n])))
            .await
            .is_err()
        {
            // The connection dropped the body; the response future reports why.
            return Ok(());
        }
    }
}

async fn receive_body(
    response: Response<Incoming>,
    sink: &mut (dyn AsyncWrite + Send + Unpin),
    tracker: &ProgressTracker,
) -> TransportCode {
    let encodings = detect_encodings(response.headers());
    if encodings.is_empty() {
        tracker.set_download_total(content_length(response.headers()));
    }
    let reader = decompress_stream(response.into_body(), &encodings);
    copy_body(reader, sink, tracker).await
}

async fn copy_body(
    mut reader: Box<dyn AsyncBufRead + Unpin + Send>,
    sink: &mut (dyn AsyncWrite + Send + Unpin),
    tracker: &ProgressTracker,
) -> TransportCode {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                debug!(error = %err, "response body failed");
                return TransportCode::Other;
            }
        };
        if let Err(err) = sink.write_all(&buf[..n]).await {
            debug!(error = %err, "response sink failed");
            return TransportCode::Write;
        }
        if tracker.downloaded(n as u64).is_break() {
            return TransportCode::Aborted;
        }
    }
    match sink.flush().await {
        Ok(()) => TransportCode::Ok,
        Err(err) => {
            debug!(error = %err, "response sink flush failed");
            TransportCode::Write
        }
    }
}

fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Byte counters shared by the upload pump and the download loop.
struct ProgressTracker {
    hook: Option<ProgressFn>,
    download_total: AtomicU64,
    download_now: AtomicU64,
    upload_total: AtomicU64,
    upload_now: AtomicU64,
    aborted: AtomicBool,
}

impl ProgressTracker {
    fn new(hook: Option<ProgressFn>) -> Self {
        Self {
            hook,
            download_total: AtomicU64::new(0),
            download_now: AtomicU64::new(0),
            upload_total: AtomicU64::new(0),
            upload_now: AtomicU64::new(0),
            aborted: AtomicBool::new(false),
        }
    }

    fn set_download_total(&self, total: u64) {
        self.download_total.store(total, Ordering::Relaxed);
    }

    fn set_upload_total(&self, total: u64) {
        self.upload_total.store(total, Ordering::Relaxed);
    }

    fn upload_total(&self) -> u64 {
        self.upload_total.load(Ordering::Relaxed)
    }

    fn uploaded(&self, n: u64) -> ControlFlow<()> {
        self.upload_now.fetch_add(n, Ordering::Relaxed);
        self.report()
    }

    /// In-memory bodies are handed to hyper whole; report them once complete.
    fn uploaded_all(&self) {
        let total = self.upload_total();
        if self.upload_now.swap(total, Ordering::Relaxed) != total {
            let _ = self.report();
        }
    }

    fn downloaded(&self, n: u64) -> ControlFlow<()> {
        self.download_now.fetch_add(n, Ordering::Relaxed);
        self.report()
    }

    fn aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }

    fn report(&self) -> ControlFlow<()> {
        let Some(hook) = &self.hook else {
            return ControlFlow::Continue(());
        };
        let flow = hook(TransferProgress {
            download_total: self.download_total.load(Ordering::Relaxed),
            download_now: self.download_now.load(Ordering::Relaxed),
            upload_total: self.upload_total.load(Ordering::Relaxed),
            upload_now: self.upload_now.load(Ordering::Relaxed),
        });
        if flow.is_break() {
            self.aborted.store(true, Ordering::Relaxed);
        }
        flow
    }
}

//! One outbound WebDAV request, from configuration to [`RequestOutcome`].
//!
//! A [`Request`] owns a pending exchange (its "handle") until it is executed or
//! moved out with [`Request::take`]. Configuring or executing an invalidated
//! request never panics: `configure` reports `false` and `execute` reports
//! [`AppStatus::MissingHandle`].

use std::future::Future;

use bytes::Bytes;
use hyper::{HeaderMap, Method, Uri, header};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

use crate::webdav::config::Config;
use crate::webdav::error::{AppStatus, RequestOutcome, TransportCode};
use crate::webdav::types::ProgressFn;

/// Where the request body comes from.
#[derive(Default)]
pub enum RequestBody<'a> {
    #[default]
    Empty,
    /// In-memory payload, sent without copying.
    Bytes(Bytes),
    /// Streamed payload of a length known up front.
    Reader {
        reader: &'a mut (dyn AsyncRead + Send + Unpin),
        length: u64,
    },
}

impl RequestBody<'_> {
    /// Declared length, `None` for an empty body.
    pub fn length(&self) -> Option<u64> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Bytes(bytes) => Some(bytes.len() as u64),
            RequestBody::Reader { length, .. } => Some(*length),
        }
    }
}

/// Destination of the response body.
pub type ResponseSink<'a> = &'a mut (dyn AsyncWrite + Send + Unpin);

/// A single request parameter.
pub enum RequestOption<'a> {
    /// HTTP or WebDAV method name, e.g. `PROPFIND`.
    Method(&'a str),
    /// Absolute target URL.
    Url(String),
    /// Extra headers, merged into those already configured.
    Headers(HeaderMap),
    Body(RequestBody<'a>),
    Sink(ResponseSink<'a>),
    Progress(ProgressFn),
}

/// Fully resolved exchange handed to a [`Transport`].
pub struct Exchange<'a> {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: RequestBody<'a>,
    pub sink: Option<ResponseSink<'a>>,
    pub progress: Option<ProgressFn>,
}

/// What the transport observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportReply {
    pub code: TransportCode,
    /// `0` when no response was received.
    pub status: u16,
}

impl TransportReply {
    pub fn new(code: TransportCode, status: u16) -> Self {
        Self { code, status }
    }

    pub fn failed(code: TransportCode) -> Self {
        Self { code, status: 0 }
    }
}

/// The network side of a request.
///
/// Implementations write the response body into `exchange.sink` (when present),
/// read the request body exactly once and call the progress hook only while
/// `perform` is running.
pub trait Transport: Send + Sync + 'static {
    fn perform<'a>(
        &'a self,
        exchange: Exchange<'a>,
    ) -> impl Future<Output = TransportReply> + Send + 'a;
}

#[derive(Default)]
struct Handle<'a> {
    method: Option<&'a str>,
    url: Option<String>,
    headers: HeaderMap,
    body: RequestBody<'a>,
    sink: Option<ResponseSink<'a>>,
    progress: Option<ProgressFn>,
}

/// A configurable, single-use request.
pub struct Request<'a, T: Transport> {
    config: &'a Config,
    transport: &'a T,
    handle: Option<Handle<'a>>,
}

impl<'a, T: Transport> Request<'a, T> {
    pub fn new(config: &'a Config, transport: &'a T) -> Self {
        Self {
            config,
            transport,
            handle: Some(Handle::default()),
        }
    }

    /// Whether the request can still be configured and executed.
    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    /// Set one parameter. Returns `false` when the request was invalidated.
    pub fn configure(&mut self, option: RequestOption<'a>) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };
        match option {
            RequestOption::Method(method) => handle.method = Some(method),
            RequestOption::Url(url) => handle.url = Some(url),
            RequestOption::Headers(headers) => handle.headers.extend(headers),
            RequestOption::Body(body) => handle.body = body,
            RequestOption::Sink(sink) => handle.sink = Some(sink),
            RequestOption::Progress(progress) => handle.progress = Some(progress),
        }
        true
    }

    /// Move the pending exchange into a new request, invalidating this one.
    pub fn take(&mut self) -> Self {
        Self {
            config: self.config,
            transport: self.transport,
            handle: self.handle.take(),
        }
    }

    /// Run the exchange. The request is invalidated afterwards.
    pub async fn execute(&mut self) -> RequestOutcome {
        let Some(handle) = self.handle.take() else {
            return RequestOutcome::rejected(AppStatus::MissingHandle);
        };
        let Some(url) = handle.url else {
            return RequestOutcome::rejected(AppStatus::MissingTarget);
        };

        let method_name = handle.method.unwrap_or("GET");
        let Ok(method) = Method::from_bytes(method_name.as_bytes()) else {
            debug!(method = method_name, "invalid request method");
            return RequestOutcome::new(TransportCode::MalformedUrl, 0, AppStatus::Ok);
        };
        let uri: Uri = match url.parse() {
            Ok(uri) => uri,
            Err(err) => {
                debug!(url = %url, error = %err, "invalid request url");
                return RequestOutcome::new(TransportCode::MalformedUrl, 0, AppStatus::Ok);
            }
        };

        let mut headers = handle.headers;
        if !headers.contains_key(header::AUTHORIZATION)
            && let Some(auth) = self.config.basic_auth()
        {
            headers.insert(header::AUTHORIZATION, auth);
        }

        trace!(%method, %uri, "executing request");
        let exchange = Exchange {
            method: method.clone(),
            uri: uri.clone(),
            headers,
            body: handle.body,
            sink: handle.sink,
            progress: handle.progress,
        };
        let reply = self.transport.perform(exchange).await;
        debug!(%method, %uri, status = reply.status, transport = %reply.code, "request finished");

        RequestOutcome::new(reply.code, reply.status, AppStatus::Ok)
    }
}

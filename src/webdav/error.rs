//! Outcome of an executed request and its classification.
//!
//! A request can fail in three independent layers: the transport (no HTTP response
//! at all), the application (the request object itself was unusable) and HTTP (the
//! server answered outside `2xx`). [`classify`] is the one place that decides which
//! of them is reported.

use std::fmt;

/// Status reported by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportCode {
    Ok,
    /// The URL or method could not be turned into a request.
    MalformedUrl,
    /// No connection could be established (DNS, TCP, TLS handshake, proxy tunnel).
    Connect,
    /// No response within the configured timeout.
    Timeout,
    /// Reading the request body source failed.
    Read,
    /// Writing the response body into the sink failed.
    Write,
    /// The progress callback asked to stop the transfer.
    Aborted,
    /// Any other failure while exchanging bytes with the server.
    Other,
}

impl TransportCode {
    pub fn is_ok(self) -> bool {
        self == TransportCode::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportCode::Ok => "ok",
            TransportCode::MalformedUrl => "malformed url",
            TransportCode::Connect => "connection failed",
            TransportCode::Timeout => "timed out",
            TransportCode::Read => "body source read failed",
            TransportCode::Write => "response sink write failed",
            TransportCode::Aborted => "aborted by progress callback",
            TransportCode::Other => "transfer failed",
        }
    }
}

impl fmt::Display for TransportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of the request object itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppStatus {
    Ok,
    /// The request was already executed or moved out of.
    MissingHandle,
    /// The request was executed without a target URL.
    MissingTarget,
}

impl AppStatus {
    pub fn is_ok(self) -> bool {
        self == AppStatus::Ok
    }
}

/// Classified request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("transport error: {code}")]
    Transport { code: TransportCode },
    #[error("HTTP error: status {code}")]
    Http { code: u16 },
    #[error("unspecified request error")]
    Unspecified,
}

/// Three-layer result of one executed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOutcome {
    pub transport: TransportCode,
    /// `0` when no response was received.
    pub http_status: u16,
    pub app: AppStatus,
}

impl RequestOutcome {
    pub fn new(transport: TransportCode, http_status: u16, app: AppStatus) -> Self {
        Self {
            transport,
            http_status,
            app,
        }
    }

    /// Outcome of a request that never reached the transport.
    pub fn rejected(app: AppStatus) -> Self {
        Self::new(TransportCode::Ok, 0, app)
    }

    pub fn is_success(&self) -> bool {
        self.transport.is_ok() && is_success_status(self.http_status) && self.app.is_ok()
    }

    pub fn to_error(&self) -> Option<Error> {
        classify(self)
    }

    pub fn into_result(self) -> Result<(), Error> {
        match classify(&self) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn is_success_status(code: u16) -> bool {
    (200..300).contains(&code)
}

/// Reduce an outcome to at most one error.
///
/// Priority: transport, then application, then HTTP status. A transport failure
/// is never reported as an HTTP failure even when a status code is present.
pub fn classify(outcome: &RequestOutcome) -> Option<Error> {
    if !outcome.transport.is_ok() {
        return Some(Error::Transport {
            code: outcome.transport,
        });
    }
    if !outcome.app.is_ok() {
        return Some(Error::Unspecified);
    }
    if !is_success_status(outcome.http_status) {
        return Some(Error::Http {
            code: outcome.http_status,
        });
    }
    None
}

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Mutex;

use fast_webdav_client::{
    Config, Exchange, RequestBody, TransferProgress, Transport, TransportCode, TransportReply,
    WebDavClient,
};
use hyper::HeaderMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// One request as the transport saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub declared_length: Option<u64>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone)]
struct Reply {
    code: TransportCode,
    status: u16,
    body: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Rule {
    method: &'static str,
    path: Option<String>,
    reply: Reply,
}

/// In-memory transport answering from a list of rules.
///
/// The first rule matching method and path wins; unmatched requests get `404`.
#[derive(Default)]
pub struct MockTransport {
    rules: Vec<Rule>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: &'static str, path: &str, status: u16) -> Self {
        self.on_with_body(method, path, status, Vec::new())
    }

    pub fn on_with_body(
        mut self,
        method: &'static str,
        path: &str,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.rules.push(Rule {
            method,
            path: Some(path.to_string()),
            reply: Reply {
                code: TransportCode::Ok,
                status,
                body: body.into(),
            },
        });
        self
    }

    /// Answer every `method` request, whatever the path.
    pub fn on_any(mut self, method: &'static str, status: u16) -> Self {
        self.rules.push(Rule {
            method,
            path: None,
            reply: Reply {
                code: TransportCode::Ok,
                status,
                body: Vec::new(),
            },
        });
        self
    }

    pub fn fail(mut self, method: &'static str, path: &str, code: TransportCode) -> Self {
        self.rules.push(Rule {
            method,
            path: Some(path.to_string()),
            reply: Reply {
                code,
                status: 0,
                body: Vec::new(),
            },
        });
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `(method, path)` of every request, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.requests()
            .into_iter()
            .map(|r| (r.method, r.path))
            .collect()
    }

    pub fn calls_with_method(&self, method: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .map(|r| r.path)
            .collect()
    }

    fn reply_for(&self, method: &str, path: &str) -> Reply {
        self.rules
            .iter()
            .find(|rule| {
                rule.method == method && rule.path.as_deref().is_none_or(|p| p == path)
            })
            .map(|rule| rule.reply.clone())
            .unwrap_or(Reply {
                code: TransportCode::Ok,
                status: 404,
                body: Vec::new(),
            })
    }
}

impl Transport for MockTransport {
    fn perform<'a>(
        &'a self,
        exchange: Exchange<'a>,
    ) -> impl Future<Output = TransportReply> + Send + 'a {
        async move {
            let Exchange {
                method,
                uri,
                headers,
                body,
                sink,
                progress,
            } = exchange;

            let declared_length = body.length();
            let sent = match body {
                RequestBody::Empty => Vec::new(),
                RequestBody::Bytes(bytes) => bytes.to_vec(),
                RequestBody::Reader { reader, .. } => {
                    let mut data = Vec::new();
                    if reader.read_to_end(&mut data).await.is_err() {
                        return TransportReply::failed(TransportCode::Read);
                    }
                    data
                }
            };

            let path = uri.path().to_string();
            self.requests.lock().unwrap().push(RecordedRequest {
                method: method.to_string(),
                uri: uri.to_string(),
                path: path.clone(),
                headers,
                body: sent,
                declared_length,
            });

            let reply = self.reply_for(method.as_str(), &path);
            if !reply.code.is_ok() {
                return TransportReply::failed(reply.code);
            }

            if let Some(sink) = sink {
                if sink.write_all(&reply.body).await.is_err() || sink.flush().await.is_err() {
                    return TransportReply::failed(TransportCode::Write);
                }
                if let Some(progress) = progress {
                    let total = reply.body.len() as u64;
                    let flow = progress(TransferProgress {
                        download_total: total,
                        download_now: total,
                        upload_total: declared_length.unwrap_or(0),
                        upload_now: declared_length.unwrap_or(0),
                    });
                    if let ControlFlow::Break(()) = flow {
                        return TransportReply::failed(TransportCode::Aborted);
                    }
                }
            }

            TransportReply::new(TransportCode::Ok, reply.status)
        }
    }
}

pub fn test_config() -> Config {
    Config {
        webdav_hostname: "https://dav.example.com".into(),
        webdav_root: "/dav/".into(),
        webdav_username: "user".into(),
        webdav_password: "pass".into(),
        ..Config::default()
    }
}

pub fn mock_client(transport: MockTransport) -> WebDavClient<MockTransport> {
    WebDavClient::with_transport(test_config(), transport)
}

/// A `207` body with one entry per `(href, props)`; `props` is raw inner XML of `<d:prop>`.
pub fn multistatus(entries: &[(&str, &str)]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><d:multistatus xmlns:d="DAV:">"#);
    for (href, props) in entries {
        xml.push_str("<d:response><d:href>");
        xml.push_str(href);
        xml.push_str("</d:href><d:propstat><d:prop>");
        xml.push_str(props);
        xml.push_str("</d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>");
    }
    xml.push_str("</d:multistatus>");
    xml
}

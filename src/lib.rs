//! Fast WebDAV client library for Rust.
//!
//! This library provides an asynchronous WebDAV client built on modern Rust
//! ecosystem components including hyper 1.x, rustls, and tokio.
//!
//! # Features
//!
//! - HTTP/2 multiplexing and connection pooling
//! - Automatic response decompression (br/zstd/gzip)
//! - Streaming uploads and downloads with progress reporting and cancellation
//! - Basic authentication, client certificates and HTTP proxies
//! - Streaming XML parsing of `207 Multi-Status` responses
//!
//! Every operation reports success as a `bool` (or an `Option` for queries) and
//! never panics on network or server failures. Failures are classified into
//! [`Error`] and logged through `tracing`.
//!
//! # Examples
//!
//! ## Browsing a server
//!
//! ```no_run
//! use fast_webdav_client::WebDavClient;
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = WebDavClient::from_options([
//!         ("webdav_hostname", "https://webdav.example.com"),
//!         ("webdav_root", "/remote.php/webdav/"),
//!         ("webdav_username", "user01"),
//!         ("webdav_password", "secret"),
//!     ])?;
//!
//!     if !client.check("/documents").await {
//!         client.mkdir("/documents/2024/reports", true).await;
//!     }
//!
//!     for resource in client.list("/documents").await.unwrap_or_default() {
//!         let kind = if resource.is_collection() { "dir " } else { "file" };
//!         println!("{kind} {} {:?}", resource.href, resource.size);
//!     }
//!
//!     println!("free: {} bytes", client.free_size().await);
//!     Ok(())
//! }
//! ```
//!
//! ## Transfers with progress
//!
//! ```no_run
//! use std::ops::ControlFlow;
//!
//! use bytes::Bytes;
//! use fast_webdav_client::{Config, WebDavClient, progress_fn};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = WebDavClient::new(Config::from_env())?;
//!
//!     let progress = progress_fn(|p| {
//!         println!("{}/{} bytes", p.download_now, p.download_total);
//!         ControlFlow::Continue(())
//!     });
//!     client
//!         .download("/documents/report.pdf", "/tmp/report.pdf", Some(progress))
//!         .await;
//!
//!     let mut buffer = Vec::new();
//!     if client.download_to("/notes.txt", &mut buffer, None).await {
//!         println!("{}", String::from_utf8_lossy(&buffer));
//!     }
//!
//!     client
//!         .upload_from("/notes-copy.txt", Bytes::from(buffer), None)
//!         .await;
//!     client.copy("/notes-copy.txt", "/archive/notes.txt").await;
//!     client.delete("/notes-copy.txt").await;
//!     Ok(())
//! }
//! ```
//!
//! ## Custom requests
//!
//! [`Request`] is the building block every operation uses and can run any
//! method against the configured server:
//!
//! ```no_run
//! use fast_webdav_client::{RequestOption, WebDavClient};
//!
//! # async fn example(client: WebDavClient) {
//! let target = client.resolve("/documents/");
//! let mut body = Vec::new();
//! let mut request = client.request();
//! request.configure(RequestOption::Method("OPTIONS"));
//! request.configure(RequestOption::Url(client.url_for(&target)));
//! request.configure(RequestOption::Sink(&mut body));
//! let outcome = request.execute().await;
//! if let Err(err) = outcome.into_result() {
//!     eprintln!("OPTIONS failed: {err}");
//! }
//! # }
//! ```
pub mod common;
pub mod webdav;

pub use common::compression::{
    ContentEncoding, add_accept_encoding, decompress_stream, detect_encodings,
};
pub use common::http::{HyperTransport, init_crypto_provider};
pub use webdav::{
    AppStatus, Config, Depth, Error, Exchange, OPTION_KEYS, ProgressFn, PropValues, RemotePath,
    Request, RequestBody, RequestOption, RequestOutcome, Resource, ResponseNode, ResponseSink,
    TransferProgress, Transport, TransportCode, TransportReply, WebDavClient, build_propfind_body,
    classify, is_success_status, parse_http_date, parse_multistatus, progress_fn,
};

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use hyper::{HeaderMap, header};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, AsyncWrite};
use tracing::{debug, trace, warn};

use crate::common::compression::add_accept_encoding;
use crate::common::http::HyperTransport;
use crate::webdav::config::Config;
use crate::webdav::error::{Error, RequestOutcome};
use crate::webdav::path::RemotePath;
use crate::webdav::request::{Request, RequestBody, RequestOption, Transport};
use crate::webdav::resource::Resource;
use crate::webdav::streaming::{ResponseNode, parse_multistatus};
use crate::webdav::types::{Depth, ProgressFn};
use crate::webdav::xml::build_propfind_body;

/// WebDAV client built on **hyper 1.x** + **rustls** by default.
///
/// Every operation resolves its path against `webdav_root`, runs one or more
/// [`Request`]s through the transport and reduces the result to a `bool`,
/// an `Option` or a number. Failures are classified with [`Error`] and logged
/// through `tracing`; they never surface as `Err`.
///
/// Operations that need the target to exist (or not) first issue a separate
/// existence check. The check and the mutation are two round-trips, so a
/// concurrent change on the server between them is not detected.
///
/// Cloning is cheap: the configuration and the transport (with its connection
/// pool) are shared.
pub struct WebDavClient<T: Transport = HyperTransport> {
    config: Arc<Config>,
    transport: Arc<T>,
    root: RemotePath,
}

impl<T: Transport> Clone for WebDavClient<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: self.transport.clone(),
            root: self.root.clone(),
        }
    }
}

impl WebDavClient<HyperTransport> {
    /// Create a client talking to `config.webdav_hostname` over hyper.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the client certificate or key cannot be loaded
    /// - the proxy address is not a valid URI
    /// - TLS configuration fails
    ///
    /// # Example
    /// ```no_run
    /// use fast_webdav_client::{Config, WebDavClient};
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = WebDavClient::new(Config {
    ///     webdav_hostname: "https://dav.example.com".into(),
    ///     webdav_root: "/remote.php/webdav/".into(),
    ///     webdav_username: "user01".into(),
    ///     webdav_password: "secret".into(),
    ///     ..Config::default()
    /// })?;
    /// for resource in client.list("/").await.unwrap_or_default() {
    ///     println!("{} {:?}", resource.href, resource.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: Config) -> Result<Self> {
        let transport = HyperTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client from `webdav_hostname`, `webdav_root`, ... key/value pairs.
    pub fn from_options<I, K, V>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self::new(Config::from_options(options))
    }
}

impl<T: Transport> WebDavClient<T> {
    /// Create a client on top of an existing transport.
    pub fn with_transport(config: Config, transport: T) -> Self {
        let root = RemotePath::new(&config.webdav_root, true);
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            root,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Absolute remote path of `path`, relative to the configured root.
    pub fn resolve(&self, path: &str) -> RemotePath {
        self.root.join(path)
    }

    /// URL of a resolved path: hostname followed by the percent-encoded path.
    pub fn url_for(&self, target: &RemotePath) -> String {
        format!(
            "{}{}",
            self.config.webdav_hostname.trim_end_matches('/'),
            target.encoded()
        )
    }

    /// A fresh request bound to this client's configuration and transport.
    pub fn request(&self) -> Request<'_, T> {
        Request::new(&self.config, &self.transport)
    }

    // ----------- Queries -----------

    /// `true` when `path` exists (`PROPFIND`, `Depth: 1`, success status).
    pub async fn check(&self, path: &str) -> bool {
        self.exists(&self.resolve(path)).await
    }

    /// Properties of `path`, or `None` when the request fails or no entry of the
    /// response matches the requested path.
    pub async fn info(&self, path: &str) -> Option<Resource> {
        let target = self.resolve(path);
        let nodes = self.propfind_nodes(&target, Depth::Zero).await?;
        nodes
            .iter()
            .filter_map(Resource::from_node)
            .find(|resource| resource.path().segments() == target.segments())
    }

    /// `true` when `path` exists and is a collection.
    pub async fn is_directory(&self, path: &str) -> bool {
        self.info(path)
            .await
            .is_some_and(|resource| resource.is_collection())
    }

    /// Every entry of a `Depth: 1` listing, in server order. The directory itself
    /// is usually the first entry.
    pub async fn list(&self, path: &str) -> Option<Vec<Resource>> {
        let target = self.resolve(path).as_directory();
        let nodes = self.propfind_nodes(&target, Depth::One).await?;
        Some(nodes.iter().filter_map(Resource::from_node).collect())
    }

    /// Available bytes reported by `quota-available-bytes` on the root, `0` when the
    /// request fails or the value is missing or not a number.
    pub async fn free_size(&self) -> u64 {
        let target = self.root.clone();
        let body = build_propfind_body(&["quota-available-bytes", "quota-used-bytes"]);

        let mut h = dav_headers();
        h.insert("Depth", header::HeaderValue::from_static(Depth::Zero.as_str()));
        h.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("text/xml"),
        );
        add_accept_encoding(&mut h);

        let mut data = Vec::new();
        let mut request = self.request();
        request.configure(RequestOption::Method("PROPFIND"));
        request.configure(RequestOption::Url(self.url_for(&target)));
        request.configure(RequestOption::Headers(h));
        request.configure(RequestOption::Body(RequestBody::Bytes(Bytes::from(body))));
        request.configure(RequestOption::Sink(&mut data));
        let outcome = request.execute().await;
        if !report("free_size", &target, &outcome) {
            return 0;
        }

        let Some(nodes) = scan("free_size", &target, &data) else {
            return 0;
        };
        nodes
            .first()
            .and_then(|node| node.props.quota_available_bytes.as_deref())
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0)
    }

    // ----------- Mutations -----------

    /// Create the collection `path`.
    ///
    /// An existing collection counts as success without sending `MKCOL`. With
    /// `recursive`, missing ancestors are created first, from the top down; the
    /// first failing `MKCOL` stops the walk. Reaching the root without finding an
    /// existing ancestor is a failure.
    pub async fn mkdir(&self, path: &str, recursive: bool) -> bool {
        let relative = RemotePath::new(path, true);
        if self.exists(&self.root.concat(&relative)).await {
            return true;
        }

        let mut missing = vec![relative];
        if recursive {
            loop {
                let Some(current) = missing.last() else {
                    break;
                };
                let parent = current.parent();
                if &parent == current {
                    debug!(path = %self.root.concat(current), "no existing ancestor to create from");
                    return false;
                }
                if self.exists(&self.root.concat(&parent)).await {
                    break;
                }
                missing.push(parent);
            }
        }

        for relative in missing.iter().rev() {
            let target = self.root.concat(relative);
            let mut h = dav_headers();
            h.insert(
                header::CONNECTION,
                header::HeaderValue::from_static("Keep-Alive"),
            );
            let outcome = self.perform("MKCOL", &target, h).await;
            if !report("mkdir", &target, &outcome) {
                return false;
            }
        }
        true
    }

    /// Move `src` to `dst`; `false` when `src` does not exist.
    pub async fn r#move(&self, src: &str, dst: &str) -> bool {
        self.transfer("MOVE", src, dst).await
    }

    /// Copy `src` to `dst`; `false` when `src` does not exist.
    pub async fn copy(&self, src: &str, dst: &str) -> bool {
        self.transfer("COPY", src, dst).await
    }

    /// Delete `path`. A resource that does not exist counts as deleted and no
    /// `DELETE` is sent.
    pub async fn delete(&self, path: &str) -> bool {
        let target = self.resolve(path);
        if !self.exists(&target).await {
            return true;
        }

        let mut h = dav_headers();
        h.insert(
            header::CONNECTION,
            header::HeaderValue::from_static("Keep-Alive"),
        );
        let outcome = self.perform("DELETE", &target, h).await;
        report("delete", &target, &outcome)
    }

    // ----------- Downloads -----------

    /// Download `remote` into the local file `local`, creating or truncating it.
    pub async fn download(
        &self,
        remote: &str,
        local: impl AsRef<Path>,
        progress: Option<ProgressFn>,
    ) -> bool {
        if !self.check(remote).await {
            return false;
        }
        let local = local.as_ref();
        let mut file = match File::create(local).await {
            Ok(file) => file,
            Err(err) => {
                warn!(path = %local.display(), error = %err, "cannot create download target");
                return false;
            }
        };
        let target = self.resolve(remote);
        let outcome = self.fetch(&target, &mut file, progress).await;
        report("download", &target, &outcome)
    }

    /// Download `remote` into `buffer`, replacing its content. The buffer is left
    /// untouched when the download fails.
    pub async fn download_to(
        &self,
        remote: &str,
        buffer: &mut Vec<u8>,
        progress: Option<ProgressFn>,
    ) -> bool {
        if !self.check(remote).await {
            return false;
        }
        let target = self.resolve(remote);
        let mut data = Vec::new();
        let outcome = self.fetch(&target, &mut data, progress).await;
        if !report("download", &target, &outcome) {
            return false;
        }
        *buffer = data;
        true
    }

    /// Download `remote` into any async writer.
    pub async fn download_to_stream<W>(
        &self,
        remote: &str,
        stream: &mut W,
        progress: Option<ProgressFn>,
    ) -> bool
    where
        W: AsyncWrite + Send + Unpin,
    {
        if !self.check(remote).await {
            return false;
        }
        let target = self.resolve(remote);
        let outcome = self.fetch(&target, stream, progress).await;
        report("download", &target, &outcome)
    }

    // ----------- Uploads -----------

    /// Upload the local file `local` to `remote`; `false` when the file cannot be read.
    pub async fn upload(
        &self,
        remote: &str,
        local: impl AsRef<Path>,
        progress: Option<ProgressFn>,
    ) -> bool {
        let local = local.as_ref();
        let mut file = match File::open(local).await {
            Ok(file) => file,
            Err(err) => {
                debug!(path = %local.display(), error = %err, "upload source missing");
                return false;
            }
        };
        let length = match file.metadata().await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                debug!(path = %local.display(), "upload source is not a file");
                return false;
            }
            Err(err) => {
                debug!(path = %local.display(), error = %err, "cannot stat upload source");
                return false;
            }
        };

        let target = self.resolve(remote);
        let body = RequestBody::Reader {
            reader: &mut file,
            length,
        };
        let outcome = self.put(&target, body, progress).await;
        report("upload", &target, &outcome)
    }

    /// Upload an in-memory buffer to `remote`.
    pub async fn upload_from(
        &self,
        remote: &str,
        data: Bytes,
        progress: Option<ProgressFn>,
    ) -> bool {
        let target = self.resolve(remote);
        let outcome = self.put(&target, RequestBody::Bytes(data), progress).await;
        report("upload", &target, &outcome)
    }

    /// Upload everything from the stream's current position to its end.
    ///
    /// The length is measured up front by seeking to the end and back.
    pub async fn upload_from_stream<R>(
        &self,
        remote: &str,
        stream: &mut R,
        progress: Option<ProgressFn>,
    ) -> bool
    where
        R: AsyncRead + AsyncSeek + Send + Unpin,
    {
        let length = match stream_length(stream).await {
            Ok(length) => length,
            Err(err) => {
                warn!(error = %err, "cannot measure upload stream");
                return false;
            }
        };

        let target = self.resolve(remote);
        let body = RequestBody::Reader {
            reader: stream,
            length,
        };
        let outcome = self.put(&target, body, progress).await;
        report("upload", &target, &outcome)
    }

    // ----------- Detached variants -----------

    /// Run [`download`](Self::download) as a detached tokio task and hand its
    /// result to `callback`.
    ///
    /// There is no handle: the transfer cannot be joined or cancelled except by
    /// the progress hook returning `Break`, transfers started this way are not
    /// ordered relative to each other, and `callback` never runs if the runtime
    /// shuts down first.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn async_download<F>(
        &self,
        remote: &str,
        local: impl Into<PathBuf>,
        callback: F,
        progress: Option<ProgressFn>,
    ) where
        F: FnOnce(bool) + Send + 'static,
    {
        let this = self.clone();
        let remote = remote.to_owned();
        let local = local.into();
        tokio::spawn(async move {
            let done = this.download(&remote, &local, progress).await;
            callback(done);
        });
    }

    /// Run [`upload`](Self::upload) as a detached tokio task and hand its result
    /// to `callback`. Same guarantees (none) as [`async_download`](Self::async_download).
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn async_upload<F>(
        &self,
        remote: &str,
        local: impl Into<PathBuf>,
        callback: F,
        progress: Option<ProgressFn>,
    ) where
        F: FnOnce(bool) + Send + 'static,
    {
        let this = self.clone();
        let remote = remote.to_owned();
        let local = local.into();
        tokio::spawn(async move {
            let done = this.upload(&remote, &local, progress).await;
            callback(done);
        });
    }

    // ----------- Request plumbing -----------

    async fn exists(&self, target: &RemotePath) -> bool {
        let mut h = dav_headers();
        h.insert("Depth", header::HeaderValue::from_static(Depth::One.as_str()));
        add_accept_encoding(&mut h);

        let mut discard = tokio::io::sink();
        let mut request = self.request();
        request.configure(RequestOption::Method("PROPFIND"));
        request.configure(RequestOption::Url(self.url_for(target)));
        request.configure(RequestOption::Headers(h));
        request.configure(RequestOption::Sink(&mut discard));
        let outcome = request.execute().await;
        report("check", target, &outcome)
    }

    async fn propfind_nodes(&self, target: &RemotePath, depth: Depth) -> Option<Vec<ResponseNode>> {
        let mut h = dav_headers();
        h.insert("Depth", header::HeaderValue::from_static(depth.as_str()));
        add_accept_encoding(&mut h);

        let mut data = Vec::new();
        let mut request = self.request();
        request.configure(RequestOption::Method("PROPFIND"));
        request.configure(RequestOption::Url(self.url_for(target)));
        request.configure(RequestOption::Headers(h));
        request.configure(RequestOption::Sink(&mut data));
        let outcome = request.execute().await;
        if !report("propfind", target, &outcome) {
            return None;
        }
        scan("propfind", target, &data)
    }

    async fn perform(&self, method: &'static str, target: &RemotePath, h: HeaderMap) -> RequestOutcome {
        let mut request = self.request();
        request.configure(RequestOption::Method(method));
        request.configure(RequestOption::Url(self.url_for(target)));
        request.configure(RequestOption::Headers(h));
        request.execute().await
    }

    async fn transfer(&self, method: &'static str, src: &str, dst: &str) -> bool {
        let source = self.resolve(src);
        if !self.exists(&source).await {
            return false;
        }

        let destination = self.resolve(dst);
        let Ok(value) = header::HeaderValue::from_str(&destination.encoded()) else {
            warn!(destination = %destination, "destination cannot be sent as a header");
            return false;
        };
        let mut h = dav_headers();
        h.insert("Destination", value);

        let outcome = self.perform(method, &source, h).await;
        report(method, &source, &outcome)
    }

    async fn fetch<'a>(
        &'a self,
        target: &RemotePath,
        sink: &'a mut (dyn AsyncWrite + Send + Unpin),
        progress: Option<ProgressFn>,
    ) -> RequestOutcome {
        let mut request = self.request();
        request.configure(RequestOption::Method("GET"));
        request.configure(RequestOption::Url(self.url_for(target)));
        request.configure(RequestOption::Sink(sink));
        if let Some(progress) = progress {
            request.configure(RequestOption::Progress(progress));
        }
        request.execute().await
    }

    async fn put<'a>(
        &'a self,
        target: &RemotePath,
        body: RequestBody<'a>,
        progress: Option<ProgressFn>,
    ) -> RequestOutcome {
        let mut request = self.request();
        request.configure(RequestOption::Method("PUT"));
        request.configure(RequestOption::Url(self.url_for(target)));
        request.configure(RequestOption::Body(body));
        if let Some(progress) = progress {
            request.configure(RequestOption::Progress(progress));
        }
        request.execute().await
    }
}

fn dav_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));
    h
}

/// Log a failed outcome with its classified error; returns `is_success()`.
fn report(operation: &str, target: &RemotePath, outcome: &RequestOutcome) -> bool {
    match outcome.to_error() {
        None => true,
        Some(err @ Error::Transport { .. }) => {
            warn!(operation, path = %target, error = %err, "request failed");
            false
        }
        Some(err) => {
            debug!(operation, path = %target, error = %err, "request failed");
            false
        }
    }
}

fn scan(operation: &str, target: &RemotePath, data: &[u8]) -> Option<Vec<ResponseNode>> {
    trace!(operation, path = %target, body = %String::from_utf8_lossy(data), "multistatus response");
    match parse_multistatus(data) {
        Ok(nodes) => Some(nodes),
        Err(err) => {
            warn!(operation, path = %target, error = %err, "unreadable multistatus response");
            None
        }
    }
}

async fn stream_length<R>(stream: &mut R) -> std::io::Result<u64>
where
    R: AsyncSeek + Unpin,
{
    let start = stream.stream_position().await?;
    let end = stream.seek(SeekFrom::End(0)).await?;
    stream.seek(SeekFrom::Start(start)).await?;
    Ok(end.saturating_sub(start))
}

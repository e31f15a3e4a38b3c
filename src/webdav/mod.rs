pub mod client;
pub mod config;
pub mod date;
pub mod error;
pub mod path;
pub mod request;
pub mod resource;
pub mod streaming;
pub mod types;
pub mod xml;

pub use client::WebDavClient;
pub use config::{Config, OPTION_KEYS};
pub use date::parse_http_date;
pub use error::{AppStatus, Error, RequestOutcome, TransportCode, classify, is_success_status};
pub use path::RemotePath;
pub use request::{
    Exchange, Request, RequestBody, RequestOption, ResponseSink, Transport, TransportReply,
};
pub use resource::Resource;
pub use streaming::{PropValues, ResponseNode, parse_multistatus};
pub use types::{Depth, ProgressFn, TransferProgress, progress_fn};
pub use xml::build_propfind_body;

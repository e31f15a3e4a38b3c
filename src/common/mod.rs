pub mod compression;
pub mod http;

pub use compression::{ContentEncoding, add_accept_encoding, decompress_stream, detect_encodings};
pub use http::{HyperClient, HyperTransport, OutgoingBody, build_hyper_client, init_crypto_provider};

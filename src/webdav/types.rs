use std::ops::ControlFlow;
use std::sync::Arc;

/// WebDAV Depth
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}
impl Depth {
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
    }
}

/// Byte counters reported while a transfer is running.
///
/// Totals are `0` while unknown (e.g. a compressed or chunked response).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferProgress {
    pub download_total: u64,
    pub download_now: u64,
    pub upload_total: u64,
    pub upload_now: u64,
}

/// Progress hook. Returning [`ControlFlow::Break`] aborts the transfer.
pub type ProgressFn = Arc<dyn Fn(TransferProgress) -> ControlFlow<()> + Send + Sync>;

/// Wrap a closure as a [`ProgressFn`].
pub fn progress_fn<F>(f: F) -> ProgressFn
where
    F: Fn(TransferProgress) -> ControlFlow<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

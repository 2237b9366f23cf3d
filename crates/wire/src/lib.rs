use std::future::Future;
use std::pin::Pin;

mod client;
mod error;
mod framing;
mod types;

pub use client::WireClient;
pub use error::{WireError, WireResult};
pub use framing::{DATA_PREFIX, FrameLine, RecordStream, SseLineDecoder, classify_line, decode_records};
pub use types::{
    DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_STREAM_PATH,
    DEFAULT_SUGGESTIONS_PATH, DEFAULT_SYNC_PATH, HistoryEntry, HistoryRole, StreamRequest,
    Suggestion, SyncRequest, SyncResponse, WireConfig,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outbound half of the conversation runtime.
///
/// `open_stream` resolves once the server has accepted the request; any error
/// from it, or any `Err` item on the returned stream, is a transport failure
/// that the caller answers with `send_sync`.
pub trait AdvisorTransport: Send + Sync {
    fn open_stream<'a>(&'a self, request: StreamRequest) -> BoxFuture<'a, WireResult<RecordStream>>;
    fn send_sync<'a>(&'a self, request: SyncRequest) -> BoxFuture<'a, WireResult<SyncResponse>>;
    fn fetch_suggestions<'a>(&'a self) -> BoxFuture<'a, WireResult<Vec<Suggestion>>>;
}

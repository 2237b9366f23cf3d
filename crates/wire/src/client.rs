use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response};
use snafu::ResultExt;

use super::error::{
    BuildHttpClientSnafu, DecodeResponseSnafu, ReadChunkSnafu, SendRequestSnafu,
    UnexpectedStatusSnafu, WireResult,
};
use super::framing::{RecordStream, decode_records};
use super::types::{StreamRequest, Suggestion, SyncRequest, SyncResponse, WireConfig};
use super::{AdvisorTransport, BoxFuture};

const EVENT_STREAM: &str = "text/event-stream";

#[derive(Debug, Clone)]
pub struct WireClient {
    http: reqwest::Client,
    config: WireConfig,
}

impl WireClient {
    pub fn new(config: WireConfig) -> WireResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .context(BuildHttpClientSnafu {
                stage: "build-http-client",
            })?;

        Ok(Self { http, config })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(api_key) => builder.bearer_auth(api_key),
            None => builder,
        }
    }

    async fn ensure_success(
        response: Response,
        url: &str,
        stage: &'static str,
    ) -> WireResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        UnexpectedStatusSnafu {
            stage,
            url,
            status: status.as_u16(),
            body,
        }
        .fail()
    }

    pub async fn start_stream(&self, request: &StreamRequest) -> WireResult<RecordStream> {
        let url = self.config.endpoint(&self.config.stream_path);
        tracing::debug!(
            url = %url,
            session_id = %request.session_id,
            history_len = request.conversation_history.len(),
            has_profile = request.intent_profile.is_some(),
            "opening advisory stream"
        );

        let response = self
            .authorize(self.http.post(&url))
            .header(ACCEPT, EVENT_STREAM)
            .json(request)
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-stream-request",
                url: url.clone(),
            })?;
        let response = Self::ensure_success(response, &url, "stream-http-status").await?;

        let chunks = response.bytes_stream().map(|chunk| {
            chunk.context(ReadChunkSnafu {
                stage: "read-stream-chunk",
            })
        });
        Ok(decode_records(chunks))
    }

    pub async fn request_sync(&self, request: &SyncRequest) -> WireResult<SyncResponse> {
        let url = self.config.endpoint(&self.config.sync_path);
        tracing::debug!(url = %url, session_id = %request.session_id, "sending fallback request");

        let response = self
            .authorize(self.http.post(&url))
            .timeout(self.config.request_timeout)
            .json(request)
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-sync-request",
                url: url.clone(),
            })?;
        let response = Self::ensure_success(response, &url, "sync-http-status").await?;

        response.json().await.context(DecodeResponseSnafu {
            stage: "decode-sync-response",
        })
    }

    pub async fn list_suggestions(&self) -> WireResult<Vec<Suggestion>> {
        let url = self.config.endpoint(&self.config.suggestions_path);

        let response = self
            .authorize(self.http.get(&url))
            .timeout(self.config.request_timeout)
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-suggestions-request",
                url: url.clone(),
            })?;
        let response = Self::ensure_success(response, &url, "suggestions-http-status").await?;

        response.json().await.context(DecodeResponseSnafu {
            stage: "decode-suggestions-response",
        })
    }
}

impl AdvisorTransport for WireClient {
    fn open_stream<'a>(&'a self, request: StreamRequest) -> BoxFuture<'a, WireResult<RecordStream>> {
        Box::pin(async move { self.start_stream(&request).await })
    }

    fn send_sync<'a>(&'a self, request: SyncRequest) -> BoxFuture<'a, WireResult<SyncResponse>> {
        Box::pin(async move { self.request_sync(&request).await })
    }

    fn fetch_suggestions<'a>(&'a self) -> BoxFuture<'a, WireResult<Vec<Suggestion>>> {
        Box::pin(async move { self.list_suggestions().await })
    }
}

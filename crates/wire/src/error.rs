use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum WireError {
    #[snafu(display("failed to build HTTP client on `{stage}`: {source}"))]
    BuildHttpClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {url} failed on `{stage}`: {source}"))]
    SendRequest {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("{url} returned status {status} on `{stage}`: {body}"))]
    UnexpectedStatus {
        stage: &'static str,
        url: String,
        status: u16,
        body: String,
    },
    #[snafu(display("stream transport failed on `{stage}`: {source}"))]
    ReadChunk {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("failed to decode response body on `{stage}`: {source}"))]
    DecodeResponse {
        stage: &'static str,
        source: reqwest::Error,
    },
}

impl WireError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::BuildHttpClient { stage, .. }
            | Self::SendRequest { stage, .. }
            | Self::UnexpectedStatus { stage, .. }
            | Self::ReadChunk { stage, .. }
            | Self::DecodeResponse { stage, .. } => stage,
        }
    }

    /// HTTP status of the failed response, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type WireResult<T> = Result<T, WireError>;

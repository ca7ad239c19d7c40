use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("connect timeout fetching {url}")]
    ConnectTimeout { url: String },

    #[error("request timeout fetching {url}")]
    RequestTimeout { url: String },

    #[error("http error {status} fetching {url}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("body too large ({0} bytes)")]
    BodyTooLarge(u64),

    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

impl FetchError {
    pub fn from_reqwest_error(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            if err.is_connect() {
                Self::ConnectTimeout { url }
            } else {
                Self::RequestTimeout { url }
            }
        } else if let Some(status) = err.status() {
            Self::Http { status, url }
        } else {
            // DNS, TCP, TLS and body decoding failures
            Self::Transport { url, source: err }
        }
    }

    /// HTTP status reported by the source, if the failure was a status failure.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

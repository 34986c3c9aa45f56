use thiserror::Error;

#[derive(Debug, Error)]
pub enum BulbError {
    #[error("no bridge configured (run `bulbswap login` or pass --host and --username)")]
    NotConfigured,

    #[error("invalid light selection: {0}")]
    InvalidSelection(String),

    #[error("light {0} not found on the bridge")]
    LightNotFound(String),

    #[error("malformed bridge response: {0}")]
    Malformed(String),

    #[error("access forbidden (HTTP 403) for {0}; check the API username")]
    Forbidden(String),

    #[error("resource not found (HTTP 404): {0}")]
    NotFound(String),

    #[error("bridge returned HTTP {status} for {url}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },

    #[error("bridge rejected request to {address}: {description}")]
    Rejected { address: String, description: String },

    #[error("cannot reach bridge at {host}: {reason}")]
    Unreachable { host: String, reason: String },

    #[error("request to {host} timed out")]
    Timeout { host: String },

    #[error(
        "TLS certificate of {host} is not trusted ({reason}); pass --insecure to accept the bridge's self-signed certificate"
    )]
    UntrustedCertificate { host: String, reason: String },

    #[error("locked by another process: {0}")]
    Locked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BulbError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::InvalidSelection(_) => "invalid_selection",
            Self::LightNotFound(_) => "light_not_found",
            Self::Malformed(_) => "malformed_response",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Status { .. } => "http_status",
            Self::Rejected { .. } => "rejected",
            Self::Unreachable { .. } => "unreachable",
            Self::Timeout { .. } => "timeout",
            Self::UntrustedCertificate { .. } => "untrusted_certificate",
            Self::Locked(_) => "locked",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Http(_) => "http_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, BulbError>;

use {http::StatusCode, thiserror::Error};

/// Every way a forwarding request can be rejected or fail.
///
/// Each variant maps to exactly one caller-visible status via [`Error::status`].
#[derive(Debug, Error)]
pub enum Error {
    /// The request path carried no target URL at all.
    #[error("no target URL in request path")]
    NoTarget,

    #[error("invalid target URL {0:?}: expected a full http:// or https:// URL")]
    MalformedTarget(String),

    #[error("URL parse failed: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("host not allowed: {0}")]
    DisallowedHost(String),

    #[error("redirect to unsupported domain: {0}")]
    RedirectBlocked(String),

    #[error("too many redirects (max {0})")]
    TooManyRedirects(usize),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("file size {} MB exceeds limit {} MB", .size / MIB, .limit / MIB)]
    TooLarge { size: u64, limit: u64 },

    #[error("{0}")]
    InvalidLink(String),
}

const MIB: u64 = 1024 * 1024;

impl Error {
    /// The HTTP status reported to the caller for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoTarget
            | Self::MalformedTarget(_)
            | Self::InvalidUrl(_)
            | Self::UnsupportedScheme(_)
            | Self::InvalidLink(_) => StatusCode::BAD_REQUEST,
            Self::DisallowedHost(_) | Self::RedirectBlocked(_) => StatusCode::FORBIDDEN,
            Self::TooManyRedirects(_) | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Short machine-friendly label, used for log fields and metric labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoTarget => "no_target",
            Self::MalformedTarget(_) => "malformed_target",
            Self::InvalidUrl(_) => "invalid_url",
            Self::UnsupportedScheme(_) => "unsupported_scheme",
            Self::DisallowedHost(_) => "disallowed_host",
            Self::RedirectBlocked(_) => "redirect_blocked",
            Self::TooManyRedirects(_) => "too_many_redirects",
            Self::Upstream(_) => "upstream",
            Self::TooLarge { .. } => "too_large",
            Self::InvalidLink(_) => "invalid_link",
        }
    }

    #[must_use]
    pub fn invalid_link(msg: impl Into<String>) -> Self {
        Self::InvalidLink(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Error kinds observed by the protocol front-end.
///
/// Each variant maps to one of the error kinds named in the design: some are
/// terminal for a single connection, some degrade a response, and
/// `ConfigInvalid` is fatal at startup.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("malformed frame")]
    MalformedFrame,

    #[error("peer closed the connection")]
    PeerClosed,

    #[error("backend unreachable")]
    BackendUnreachable,

    #[error("backend status fetch failed")]
    BackendStatusFetchFailed,

    #[error("whitelist load failed: {0}")]
    WhitelistLoadFailed(String),

    #[error("icon load failed: {0}")]
    IconLoadFailed(String),

    #[error("player not whitelisted")]
    WhitelistDenied,

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ProxyResult<T> = Result<T, ProxyError>;

use std::{io, net::SocketAddr};

use thiserror::Error;

pub type Result<T, E = ProxyError> = std::result::Result<T, E>;

/// Everything that can end a proxy transaction, plus the fatal bind error.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to bind listener to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    /// The client went away before sending a request line.
    #[error("client closed the connection before sending a request")]
    ClientEof,

    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("method {0} is not supported")]
    UnsupportedMethod(String),

    #[error("no host in request target {0:?}")]
    MalformedUri(String),

    #[error("invalid port in request target {0:?}")]
    InvalidPort(String),

    #[error("failed to connect to upstream {authority}: {source}")]
    UpstreamConnect {
        authority: String,
        #[source]
        source: io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ProxyError {
    /// Errors that are part of normal client behaviour and not worth a warning.
    pub fn is_silent(&self) -> bool {
        matches!(self, ProxyError::ClientEof)
    }
}

//! A forwarding HTTP proxy for plain `GET` requests.
//!
//! A client sends an absolute-form request (`GET http://host:port/path HTTP/1.1`).
//! The proxy rewrites it into an origin-form HTTP/1.0 request, opens a fresh
//! connection to the origin and copies the response back until the origin closes.

pub mod config;
pub mod error;
pub mod http;
pub mod relay;
pub mod server;

pub use config::{HeaderPolicy, ProxyConfig};
pub use error::{ProxyError, Result};
pub use http::{OutboundRequest, ParsedTarget, RequestLine};
pub use server::Server;

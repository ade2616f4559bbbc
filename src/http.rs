use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    config::HeaderPolicy,
    error::{ProxyError, Result},
};

pub const DEFAULT_HTTP_PORT: u16 = 80;

const MAX_DRAINED_HEADERS: usize = 64;

fn head_complete(buffer: &BytesMut) -> bool {
    buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.windows(2).any(|w| w == b"\n\n")
}

/// Reads the client's request head: the request line plus every header up to
/// the blank line.
///
/// A client that closes after sending only part of the head still gets its
/// request served as long as it sent at least one byte, even a request line
/// with no line terminator.
pub async fn read_request_head<R>(reader: &mut R, max_head_size: usize) -> Result<BytesMut>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(1024);

    loop {
        if head_complete(&buffer) {
            return Ok(buffer);
        }
        if buffer.len() >= max_head_size {
            return Err(ProxyError::HeadTooLarge {
                limit: max_head_size,
            });
        }

        if 0 == reader.read_buf(&mut buffer).await? {
            if buffer.is_empty() {
                return Err(ProxyError::ClientEof);
            }
            tracing::debug!(bytes = buffer.len(), "client closed mid-head");
            return Ok(buffer);
        }
    }
}

/// The request line split into its three tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub uri: String,
    pub version: String,
}

impl RequestLine {
    pub fn parse(line: &str) -> Result<Self> {
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        match tokens.as_slice() {
            [method, uri, version] => Ok(Self {
                method: method.to_string(),
                uri: uri.to_string(),
                version: version.to_string(),
            }),
            _ => Err(ProxyError::MalformedRequestLine(line.trim_end().to_string())),
        }
    }

    /// Only `GET` is proxied. The method comparison ignores case.
    pub fn ensure_get(&self) -> Result<()> {
        if self.method.eq_ignore_ascii_case("GET") {
            Ok(())
        } else {
            Err(ProxyError::UnsupportedMethod(self.method.clone()))
        }
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.uri, self.version)
    }
}

/// A parsed client request head. The client's headers are counted, then dropped.
#[derive(Debug)]
pub struct RequestHead {
    pub request_line: RequestLine,
    pub discarded_headers: usize,
}

impl RequestHead {
    pub fn parse(head: &[u8]) -> Result<Self> {
        let (line, rest) = match head.iter().position(|b| *b == b'\n') {
            Some(end) => head.split_at(end + 1),
            None => (head, &[][..]),
        };
        let request_line = RequestLine::parse(&String::from_utf8_lossy(line))?;

        let mut parsed_headers = [httparse::EMPTY_HEADER; MAX_DRAINED_HEADERS];
        let discarded_headers = match httparse::parse_headers(rest, &mut parsed_headers) {
            Ok(httparse::Status::Complete((_, headers))) => {
                for header in headers.iter() {
                    tracing::trace!(name = header.name, "discarding client header");
                }
                headers.len()
            }
            Ok(httparse::Status::Partial) => 0,
            Err(e) => {
                tracing::trace!(error = ?e, "client header block left unparsed");
                0
            }
        };

        Ok(Self {
            request_line,
            discarded_headers,
        })
    }
}

/// Where an absolute-form request points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTarget {
    pub host: String,
    pub port: u16,
    /// Always starts with `/`.
    pub path: String,
}

impl ParsedTarget {
    /// Splits a request URI into host, port and path.
    ///
    /// Anything up to and including the first `//` is skipped. After that, a
    /// `:` ahead of the first `/` introduces a port, otherwise the first `/`
    /// starts the path, otherwise the whole remainder is the host. Host
    /// characters, percent-encoding and query strings are left untouched.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = match uri.find("//") {
            Some(start) => &uri[start + 2..],
            None => uri,
        };
        let slash = rest.find('/');
        let colon = rest
            .find(':')
            .filter(|colon| slash.map_or(true, |slash| *colon < slash));

        if let Some(colon) = colon {
            let host = require_host(&rest[..colon], uri)?;
            let after = &rest[colon + 1..];
            let digits = after
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after.len());
            let port = after[..digits]
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| ProxyError::InvalidPort(uri.to_string()))?;

            Ok(Self {
                host,
                port,
                path: normalize_path(&after[digits..]),
            })
        } else if let Some(slash) = slash {
            Ok(Self {
                host: require_host(&rest[..slash], uri)?,
                port: DEFAULT_HTTP_PORT,
                path: rest[slash..].to_string(),
            })
        } else {
            Ok(Self {
                host: require_host(rest, uri)?,
                port: DEFAULT_HTTP_PORT,
                path: "/".to_string(),
            })
        }
    }

    /// `host:port`, suitable for resolving and connecting.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn require_host(host: &str, uri: &str) -> Result<String> {
    if host.is_empty() {
        Err(ProxyError::MalformedUri(uri.to_string()))
    } else {
        Ok(host.to_string())
    }
}

fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// The request actually sent to the origin server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    request_line: String,
    headers: Vec<(String, String)>,
}

fn write_crlf(target: &mut BytesMut) {
    target.put_slice(b"\r\n");
}

impl OutboundRequest {
    /// Always HTTP/1.0, whatever the client spoke, with headers in a fixed order.
    pub fn build(target: &ParsedTarget, policy: &HeaderPolicy) -> Self {
        let headers = vec![
            ("Host".to_string(), target.host.clone()),
            ("User-Agent".to_string(), policy.user_agent.clone()),
            ("Connection".to_string(), policy.connection.clone()),
            ("Proxy-Connection".to_string(), policy.proxy_connection.clone()),
        ];

        Self {
            request_line: format!("GET {} HTTP/1.0", target.path),
            headers,
        }
    }

    pub fn request_line(&self) -> &str {
        &self.request_line
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buff = BytesMut::new();

        buff.put_slice(self.request_line.as_bytes());
        write_crlf(&mut buff);

        for (name, value) in &self.headers {
            buff.put_slice(name.as_bytes());
            buff.put_slice(b": ");
            buff.put_slice(value.as_bytes());
            write_crlf(&mut buff);
        }
        write_crlf(&mut buff);

        buff.freeze()
    }
}

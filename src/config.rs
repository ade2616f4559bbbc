use std::net::{Ipv4Addr, SocketAddr};

/// User-Agent sent upstream regardless of what the client announced.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BUFFER_SIZE: usize = 8192;
pub const DEFAULT_MAX_HEAD_SIZE: usize = 8192;

/// Header values forced onto every outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPolicy {
    pub user_agent: String,
    pub connection: String,
    pub proxy_connection: String,
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connection: "close".to_string(),
            proxy_connection: "close".to_string(),
        }
    }
}

impl HeaderPolicy {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address the listener binds to.
    pub listen_addr: SocketAddr,
    pub headers: HeaderPolicy,
    /// Size of the buffer used to copy the upstream response.
    pub relay_buffer_size: usize,
    /// Upper bound on the client's request line plus headers.
    pub max_head_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            headers: HeaderPolicy::default(),
            relay_buffer_size: DEFAULT_BUFFER_SIZE,
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
        }
    }
}

impl ProxyConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_headers(mut self, headers: HeaderPolicy) -> Self {
        self.headers = headers;
        self
    }

    /// A zero-sized buffer would never make progress, so it is clamped to one byte.
    pub fn with_relay_buffer_size(mut self, size: usize) -> Self {
        self.relay_buffer_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_force_close() {
        let policy = HeaderPolicy::default();
        assert_eq!(policy.connection, "close");
        assert_eq!(policy.proxy_connection, "close");
        assert!(policy.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn user_agent_override_keeps_connection_policy() {
        let policy = HeaderPolicy::default().with_user_agent("curl/8.0");
        assert_eq!(policy.user_agent, "curl/8.0");
        assert_eq!(policy.connection, "close");
    }

    #[test]
    fn buffer_size_is_never_zero() {
        let config = ProxyConfig::default().with_relay_buffer_size(0);
        assert_eq!(config.relay_buffer_size, 1);
    }

    #[test]
    fn new_only_changes_listen_addr() {
        let addr: SocketAddr = "127.0.0.1:3128".parse().unwrap();
        let config = ProxyConfig::new(addr);
        assert_eq!(config.listen_addr, addr);
        assert_eq!(config.max_head_size, DEFAULT_MAX_HEAD_SIZE);
    }
}

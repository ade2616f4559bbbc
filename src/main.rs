//! A forward proxy for plain HTTP GET requests.
//! Use:
//! ```bash
//! cargo run -- 2233
//! curl -x http://127.0.0.1:2233 http://example.com/
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webproxy::{
    config::{DEFAULT_BUFFER_SIZE, DEFAULT_USER_AGENT},
    HeaderPolicy, ProxyConfig, Server,
};

#[derive(Parser, Debug)]
#[command(name = "webproxy", version, about = "Forwarding HTTP proxy for GET requests")]
struct Cli {
    /// Port to listen on
    port: u16,

    /// Address to bind the listener to
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// User-Agent sent to origin servers
    #[arg(long, env = "WEBPROXY_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Buffer size used when copying responses back to clients
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,
}

impl Cli {
    fn into_config(self) -> ProxyConfig {
        ProxyConfig::new(SocketAddr::new(self.bind, self.port))
            .with_headers(HeaderPolicy::default().with_user_agent(self.user_agent))
            .with_relay_buffer_size(self.buffer_size)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webproxy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.into_config();
    tracing::info!(
        listen = %config.listen_addr,
        buffer_size = config.relay_buffer_size,
        "starting proxy"
    );

    let server = Server::bind(config).await?;
    server.run().await?;

    Ok(())
}

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
};

use crate::{
    config::ProxyConfig,
    error::{ProxyError, Result},
    http::{read_request_head, OutboundRequest, ParsedTarget, RequestHead},
    relay::{connect_upstream, relay},
};

/// Pause between a failed accept and the next attempt.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts clients and hands each one to its own task.
pub struct Server {
    listener: TcpListener,
    config: Arc<ProxyConfig>,
}

impl Server {
    pub async fn bind(config: ProxyConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|source| ProxyError::Bind {
                addr: config.listen_addr,
                source,
            })?;

        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the accept loop forever. Failures inside a transaction, or while
    /// accepting, are logged and never stop the loop.
    pub async fn run(self) -> Result<()> {
        tracing::info!(address = %self.local_addr()?, "proxy listening");

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    back_off_after_accept_error(e).await;
                    continue;
                }
            };
            tracing::info!(%peer, "accepted connection");

            let config = Arc::clone(&self.config);
            tokio::spawn(async move {
                match serve_transaction(stream, &config).await {
                    Ok(bytes) => tracing::debug!(%peer, bytes, "transaction complete"),
                    Err(e) if e.is_silent() => tracing::debug!(%peer, error = %e, "transaction ended"),
                    Err(e) => tracing::warn!(%peer, error = %e, "transaction dropped"),
                }
            });
        }
    }
}

async fn back_off_after_accept_error(e: io::Error) {
    tracing::warn!(error = %ProxyError::Accept(e), "accept failed, backing off");
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

/// Runs one parse-forward-relay transaction on `client`.
///
/// Nothing is ever written to the client except bytes relayed from the
/// origin. Both sockets are closed when this returns, on every path.
pub async fn serve_transaction<C>(mut client: C, config: &ProxyConfig) -> Result<u64>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let head = read_request_head(&mut client, config.max_head_size).await?;
    let head = RequestHead::parse(&head)?;
    tracing::debug!(
        request = %head.request_line,
        discarded_headers = head.discarded_headers,
        "request received"
    );

    head.request_line.ensure_get()?;
    let target = ParsedTarget::parse(&head.request_line.uri)?;
    let request = OutboundRequest::build(&target, &config.headers);

    let mut upstream = connect_upstream(&target.host, target.port).await?;
    tracing::info!(
        authority = %target.authority(),
        path = %target.path,
        "forwarding request"
    );

    relay(
        &mut client,
        &mut upstream,
        &request,
        config.relay_buffer_size,
    )
    .await
}

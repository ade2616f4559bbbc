use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};

use crate::{
    error::{ProxyError, Result},
    http::OutboundRequest,
};

/// Opens a fresh connection to the origin server.
pub async fn connect_upstream(host: &str, port: u16) -> Result<TcpStream> {
    TcpStream::connect((host, port))
        .await
        .map_err(|source| ProxyError::UpstreamConnect {
            authority: format!("{}:{}", host, port),
            source,
        })
}

/// Sends `request` upstream, then copies the response to the client verbatim
/// until the upstream closes. Returns the number of response bytes relayed.
///
/// Headers and body are not told apart; the response is copied in blocks of at
/// most `buffer_size` bytes.
pub async fn relay<C, U>(
    client: &mut C,
    upstream: &mut U,
    request: &OutboundRequest,
    buffer_size: usize,
) -> Result<u64>
where
    C: AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    upstream.write_all(&request.to_bytes()).await?;
    upstream.flush().await?;

    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        let n = upstream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        tracing::trace!(bytes = n, "relaying chunk");
        client.write_all(&buf[..n]).await?;
        total += n as u64;
    }

    client.flush().await?;
    // The response is complete at this point, so a failed shutdown is not a transaction error.
    if let Err(e) = client.shutdown().await {
        tracing::debug!(error = %e, "client shutdown after relay failed");
    }
    Ok(total)
}

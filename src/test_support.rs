//! Helpers shared by the HTTP client tests.

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Start a server on a free local port that accepts one connection, reports
/// the request head it received, and never answers.
///
/// # Returns
///
/// The base URL (`http://127.0.0.1:<port>`) and a receiver that yields the
/// raw request line and headers once they have arrived.
pub(crate) async fn silent_server() -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let mut head = Vec::new();
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());

        // Hold the connection until the client hangs up.
        while socket.read(&mut buf).await.unwrap_or(0) > 0 {}
    });

    (format!("http://{addr}"), rx)
}

/// A local address with nothing listening on it.
pub(crate) fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

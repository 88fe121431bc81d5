//! Byte-exact HTTP responders for cases mockito cannot express
//!
//! mockito always sends a correct `Content-Length`, so truncated bodies and
//! malformed headers need a hand-written response on a plain socket.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A one-shot server that answers the first connection with fixed bytes
pub struct RawResponder {
    addr: SocketAddr,
    handle: JoinHandle<Vec<u8>>,
}

impl RawResponder {
    /// Listens on an ephemeral local port and replies once with `response`
    ///
    /// The request head is read up to the blank line, the bytes are written
    /// as-is and the write half is shut down.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub fn serve_once(response: impl Into<Vec<u8>>) -> Self {
        Self::spawn(response.into(), Vec::new(), Duration::ZERO)
    }

    /// Sends `head` at once, then `body` one byte per `interval`
    ///
    /// Dripping stops early when the client goes away.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub fn serve_slowly(head: impl Into<Vec<u8>>, body: impl Into<Vec<u8>>, interval: Duration) -> Self {
        Self::spawn(head.into(), body.into(), interval)
    }

    fn spawn(response: Vec<u8>, drip: Vec<u8>, interval: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind raw responder");
        let addr = listener.local_addr().expect("Failed to read responder address");

        let handle = thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return Vec::new();
            };

            let mut head = Vec::new();
            let mut byte = [0u8; 1];
            while !head.ends_with(b"\r\n\r\n") {
                match stream.read(&mut byte) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => head.push(byte[0]),
                }
            }

            let _ = stream.write_all(&response);
            let _ = stream.flush();
            for byte in &drip {
                thread::sleep(interval);
                if stream.write_all(std::slice::from_ref(byte)).is_err() || stream.flush().is_err() {
                    break;
                }
            }
            let _ = stream.shutdown(Shutdown::Write);
            // Drain until the client hangs up so it sees a clean EOF
            let _ = std::io::copy(&mut stream, &mut std::io::sink());
            head
        });

        Self { addr, handle }
    }

    /// Absolute URL for `path` on this responder
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Waits for the exchange and returns the raw request head
    ///
    /// # Panics
    ///
    /// Panics if the responder thread panicked.
    pub fn request_head(self) -> String {
        let head = self.handle.join().expect("Raw responder thread panicked");
        String::from_utf8_lossy(&head).into_owned()
    }
}

/// URL on a local port nothing is listening on
///
/// # Panics
///
/// Panics if no local port can be bound.
pub fn refused_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind loopback listener");
    let addr = listener.local_addr().expect("Failed to read loopback address");
    drop(listener);
    format!("http://{}{}", addr, path)
}

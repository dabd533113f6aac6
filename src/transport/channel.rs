//! One blocking TCP stream with acknowledged messages.
//!
//! A message is one or more writes followed by a single acknowledgement
//! byte travelling the other way; `0` means accepted. The receiving side
//! reads the full payload before acknowledging.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};

use super::ConnectPolicy;
use crate::error::ClientError;
use crate::transport::wire::ACK_OK;

/// Connected stream to one server port.
#[derive(Debug)]
pub struct Channel {
    stream: TcpStream,
    addr: String,
}

impl Channel {
    /// Connect to `host:port`, retrying while the server is still starting.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectFailed`] once the policy's attempts are
    /// exhausted.
    pub fn connect(
        host: &str,
        port: u16,
        policy: &ConnectPolicy,
    ) -> Result<Self, ClientError> {
        let addr = format!("{host}:{port}");
        let mut attempt = 0_u32;
        let stream = loop {
            attempt += 1;
            match TcpStream::connect((host, port)) {
                Ok(stream) => break stream,
                Err(e) => {
                    if policy.attempts != 0 && attempt >= policy.attempts {
                        return Err(ClientError::ConnectFailed {
                            addr,
                            source: e,
                        });
                    }
                    log::info!(
                        "Waiting for render server at {addr} (attempt \
                         {attempt}): {e}"
                    );
                    std::thread::sleep(policy.retry_interval);
                }
            }
        };

        let configure = |stream: &TcpStream| -> std::io::Result<()> {
            stream.set_nodelay(true)?;
            stream.set_read_timeout(policy.io_timeout)?;
            stream.set_write_timeout(policy.io_timeout)
        };
        configure(&stream).map_err(|source| ClientError::ConnectFailed {
            addr: addr.clone(),
            source,
        })?;

        log::debug!("Connected to {addr}");
        Ok(Self { stream, addr })
    }

    /// `host:port` this channel is connected to.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Write `parts` back to back, then wait for one acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TransportCallFailed`] on I/O failure or a
    /// non-zero acknowledgement.
    pub fn send(
        &mut self,
        call: &'static str,
        parts: &[&[u8]],
    ) -> Result<(), ClientError> {
        for part in parts {
            self.stream
                .write_all(part)
                .map_err(|e| ClientError::call(call, &e))?;
        }
        self.stream.flush().map_err(|e| ClientError::call(call, &e))?;

        let mut ack = [0_u8; 1];
        self.stream
            .read_exact(&mut ack)
            .map_err(|e| ClientError::call(call, &e))?;
        if ack[0] != ACK_OK {
            return Err(ClientError::TransportCallFailed {
                call,
                reason: format!("server rejected message (ack {})", ack[0]),
            });
        }
        Ok(())
    }

    /// Fill `buf` completely, then acknowledge it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TransportCallFailed`] on I/O failure,
    /// including a server that closes mid-message.
    pub fn recv(
        &mut self,
        call: &'static str,
        buf: &mut [u8],
    ) -> Result<(), ClientError> {
        self.stream
            .read_exact(buf)
            .map_err(|e| ClientError::call(call, &e))?;
        self.stream
            .write_all(&[ACK_OK])
            .map_err(|e| ClientError::call(call, &e))
    }

    /// Close both directions. Errors are ignored; the peer may be gone.
    pub fn close(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::TcpListener;

    use web_time::Duration;

    use super::*;

    fn quick_policy(attempts: u32) -> ConnectPolicy {
        ConnectPolicy {
            attempts,
            retry_interval: Duration::from_millis(10),
            io_timeout: Some(Duration::from_secs(5)),
        }
    }

    #[test]
    fn send_waits_for_ack_and_recv_acks() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            let mut payload = [0_u8; 6];
            peer.read_exact(&mut payload).unwrap();
            peer.write_all(&[ACK_OK]).unwrap();
            peer.write_all(b"pong").unwrap();
            let mut ack = [9_u8; 1];
            peer.read_exact(&mut ack).unwrap();
            let mut rejected = [0_u8; 1];
            peer.read_exact(&mut rejected).unwrap();
            peer.write_all(&[3]).unwrap();
            (payload, ack[0])
        });

        let mut channel =
            Channel::connect("127.0.0.1", port, &quick_policy(3)).unwrap();
        channel.send("ping", &[b"pi", b"ngpi"]).unwrap();
        let mut reply = [0_u8; 4];
        channel.recv("pong", &mut reply).unwrap();
        assert_eq!(&reply, b"pong");

        // A non-zero acknowledgement is a failed call.
        let err = channel.send("rejected", &[b"x"]).unwrap_err();
        assert!(matches!(
            err,
            ClientError::TransportCallFailed {
                call: "rejected",
                ..
            }
        ));

        let (payload, ack) = server.join().unwrap();
        assert_eq!(&payload, b"pingpi");
        assert_eq!(ack, ACK_OK);
    }

    #[test]
    fn connect_gives_up_after_attempts() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err =
            Channel::connect("127.0.0.1", port, &quick_policy(2)).unwrap_err();
        assert!(matches!(err, ClientError::ConnectFailed { .. }));
    }

    #[test]
    fn recv_fails_when_peer_closes_early() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            peer.write_all(b"ab").unwrap();
        });
        let mut channel =
            Channel::connect("127.0.0.1", port, &quick_policy(3)).unwrap();
        server.join().unwrap();
        let mut buf = [0_u8; 8];
        assert!(channel.recv("pixels", &mut buf).is_err());
    }
}

//! Per-connection echo handler

use crate::error::MonitorError;
use crate::protocol::{self, LineRead};
use crate::shutdown::ShutdownSignal;
use std::io::{BufReader, ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

/// Serves one accepted connection until the peer leaves or the responder stops
pub(crate) struct EchoConnection {
    stream: TcpStream,
    peer: SocketAddr,
    shutdown: ShutdownSignal,
}

impl EchoConnection {
    /// `stream` must already carry a read timeout so the loop can observe
    /// the shutdown signal between lines.
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr, shutdown: ShutdownSignal) -> Self {
        Self {
            stream,
            peer,
            shutdown,
        }
    }

    pub(crate) fn run(self) {
        tracing::debug!("Echo connection from {} opened", self.peer);

        let reader = match self.stream.try_clone() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Cannot clone stream for {}: {}", self.peer, e);
                return;
            }
        };
        let mut reader = BufReader::new(reader);
        let mut writer = &self.stream;
        // Partial line survives read timeouts
        let mut line = Vec::with_capacity(protocol::MAX_LINE_LEN);

        while self.shutdown.is_running() {
            match protocol::read_line(&mut reader, &mut line) {
                Ok(LineRead::Complete) => {
                    if protocol::is_sentinel(&line) {
                        tracing::debug!("Sentinel from {}, closing", self.peer);
                        break;
                    }
                    if let Err(e) = writer.write_all(&line) {
                        tracing::debug!("Echo to {} failed: {}", self.peer, e);
                        break;
                    }
                    line.clear();
                }
                Ok(LineRead::Eof) => {
                    tracing::debug!("Peer {} closed the connection", self.peer);
                    break;
                }
                Err(MonitorError::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    continue;
                }
                Err(e) => {
                    tracing::debug!("Echo connection from {} failed: {}", self.peer, e);
                    break;
                }
            }
        }

        let _ = self.stream.shutdown(Shutdown::Both);
        tracing::debug!("Echo connection from {} closed", self.peer);
    }
}

//! Echo responder
//!
//! The server half of every node. Accepts TCP connections from peer probes
//! and echoes each received line back unchanged, so the probe can time the
//! round trip. A sentinel line (`STOP` or `QUIT`) closes the connection
//! without a reply.
//!
//! # Threads
//!
//! - `echo-accept`: blocks in `accept` so a connecting peer is served at
//!   once. `stop` wakes it with a throwaway loopback connection.
//! - `echo-<peer>`: one per accepted connection, reading with a short socket
//!   timeout so it re-checks the shutdown signal between lines.
//!
//! Binding happens in [`EchoResponder::bind`], before any thread starts.
//! A bind failure is fatal to the monitor.

mod connection;

use crate::config::ResponderSettings;
use crate::error::{MonitorError, Result};
use crate::shutdown::ShutdownSignal;
use crate::types::Endpoint;
use connection::EchoConnection;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

/// Upper bound on the connect that wakes a blocked accept
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// TCP echo server bound to the local node address
pub struct EchoResponder {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    settings: ResponderSettings,
    shutdown: ShutdownSignal,
    handle: Option<JoinHandle<()>>,
}

impl EchoResponder {
    /// Bind the listening socket. Nothing is accepted until [`start`](Self::start).
    pub fn bind(endpoint: &Endpoint, settings: ResponderSettings) -> Result<Self> {
        let addrs = endpoint.resolve()?;
        let listener = TcpListener::bind(&addrs[..]).map_err(|e| MonitorError::Bind {
            address: endpoint.to_string(),
            source: e,
        })?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Echo responder bound to {}", local_addr);

        Ok(Self {
            listener: Some(listener),
            local_addr,
            settings,
            shutdown: ShutdownSignal::new(),
            handle: None,
        })
    }

    /// Address actually bound (useful when binding port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.shutdown.is_running()
    }

    /// Spawn the accept loop
    pub fn start(&mut self) -> Result<()> {
        let Some(listener) = self.listener.take() else {
            tracing::warn!("Echo responder on {} already started", self.local_addr);
            return Ok(());
        };
        let worker = AcceptLoop {
            listener,
            settings: self.settings.clone(),
            shutdown: self.shutdown.clone(),
            connections: Vec::new(),
        };
        let handle = std::thread::Builder::new()
            .name("echo-accept".to_string())
            .spawn(move || worker.run())
            .map_err(|e| MonitorError::Thread(format!("Failed to spawn accept thread: {}", e)))?;
        self.handle = Some(handle);

        tracing::info!("Echo responder listening on {}", self.local_addr);
        Ok(())
    }

    /// Stop accepting, close every open connection and join all threads.
    /// Idempotent.
    pub fn stop(&mut self) {
        self.shutdown.trigger();
        // Never started: dropping the listener closes the socket
        self.listener.take();
        if let Some(handle) = self.handle.take() {
            tracing::info!("Stopping echo responder on {}", self.local_addr);
            self.wake_accept();
            if handle.join().is_err() {
                tracing::error!("Echo accept thread panicked");
            }
            tracing::info!("Echo responder stopped");
        }
    }
}

impl EchoResponder {
    /// Unblock the accept loop after the signal was triggered
    fn wake_accept(&self) {
        let mut target = self.local_addr;
        if target.ip().is_unspecified() {
            let loopback = match target.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            };
            target.set_ip(loopback);
        }
        if let Err(e) = TcpStream::connect_timeout(&target, WAKE_TIMEOUT) {
            tracing::warn!("Failed to wake echo accept loop on {}: {}", target, e);
        }
    }
}

impl std::fmt::Debug for EchoResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoResponder")
            .field("local_addr", &self.local_addr)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for EchoResponder {
    fn drop(&mut self) {
        self.stop();
    }
}

struct AcceptLoop {
    listener: TcpListener,
    settings: ResponderSettings,
    shutdown: ShutdownSignal,
    connections: Vec<JoinHandle<()>>,
}

impl AcceptLoop {
    fn run(mut self) {
        tracing::debug!("Echo accept loop started");

        while self.shutdown.is_running() {
            match self.listener.accept() {
                // The wake-up connection from `stop` lands here too
                Ok(_) if !self.shutdown.is_running() => break,
                Ok((stream, peer)) => {
                    self.reap();
                    self.serve(stream, peer);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    self.shutdown.sleep(self.settings.accept_retry());
                }
            }
        }

        drop(self.listener);
        let open = self.connections.len();
        for handle in self.connections {
            let _ = handle.join();
        }
        tracing::debug!("Echo accept loop stopped ({} connections joined)", open);
    }

    fn serve(&mut self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = self.configure(&stream) {
            tracing::warn!("Cannot configure connection from {}: {}", peer, e);
            return;
        }

        let connection = EchoConnection::new(stream, peer, self.shutdown.clone());
        match std::thread::Builder::new()
            .name(format!("echo-{}", peer))
            .spawn(move || connection.run())
        {
            Ok(handle) => self.connections.push(handle),
            Err(e) => tracing::error!("Failed to spawn handler for {}: {}", peer, e),
        }
    }

    fn configure(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.settings.connection_poll()))?;
        stream.set_write_timeout(Some(self.settings.connection_poll()))?;
        Ok(())
    }

    /// Drop handles of connections that already finished
    fn reap(&mut self) {
        self.connections.retain(|h| !h.is_finished());
    }
}

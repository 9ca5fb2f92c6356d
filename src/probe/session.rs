//! One connected probe session and its latency window

use crate::config::ProbeSettings;
use crate::error::{MonitorError, Result};
use crate::protocol::{self, LineRead};
use crate::types::{Endpoint, StatEvent};
use chrono::{DateTime, Utc};
use std::io::{BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::time::{Duration, Instant};

/// An open connection to one peer's echo responder.
///
/// Owned by the probe thread only. The socket is shut down when the
/// session is dropped, whichever way the session ends.
pub struct ProbeSession {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    peer: Endpoint,
    line: Vec<u8>,
}

impl ProbeSession {
    /// Connect to `peer`, trying each resolved address in turn
    pub fn connect(peer: &Endpoint, settings: &ProbeSettings) -> Result<Self> {
        let addrs = peer.resolve()?;
        let stream = match settings.connect_timeout() {
            None => TcpStream::connect(&addrs[..])?,
            Some(timeout) => {
                let mut last_err = None;
                let mut connected = None;
                for addr in &addrs {
                    match TcpStream::connect_timeout(addr, timeout) {
                        Ok(s) => {
                            connected = Some(s);
                            break;
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
                match (connected, last_err) {
                    (Some(s), _) => s,
                    (None, Some(e)) => return Err(e.into()),
                    (None, None) => {
                        return Err(MonitorError::address(peer.to_string(), "no address to connect to"))
                    }
                }
            }
        };

        stream.set_nodelay(true)?;
        stream.set_read_timeout(settings.read_timeout())?;
        let reader = BufReader::new(stream.try_clone()?);

        Ok(Self {
            stream,
            reader,
            peer: peer.clone(),
            line: Vec::with_capacity(protocol::PROBE_PAYLOAD.len()),
        })
    }

    pub fn peer(&self) -> &Endpoint {
        &self.peer
    }

    /// Send one probe line and wait for its echo. Returns the round trip.
    pub fn round_trip(&mut self) -> Result<Duration> {
        let start = Instant::now();
        self.stream.write_all(protocol::PROBE_PAYLOAD)?;

        self.line.clear();
        if protocol::read_line(&mut self.reader, &mut self.line)? == LineRead::Eof {
            return Err(MonitorError::ConnectionClosed);
        }
        let rtt = start.elapsed();

        if self.line != protocol::PROBE_PAYLOAD {
            return Err(MonitorError::Protocol(format!(
                "unexpected echo {:?}",
                String::from_utf8_lossy(&self.line)
            )));
        }
        Ok(rtt)
    }

    /// Tell the responder we are leaving. Best effort.
    pub fn send_sentinel(&mut self) {
        if let Err(e) = self.stream.write_all(protocol::STOP_SENTINEL) {
            tracing::debug!("Failed to send stop sentinel to {}: {}", self.peer, e);
        }
    }
}

impl Drop for ProbeSession {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Aggregates the round trips of one window into a single timer event
#[derive(Debug, Default, Clone)]
pub struct LatencyWindow {
    max_rtt: Option<Duration>,
    last_sent: Option<DateTime<Utc>>,
    samples: u32,
}

impl LatencyWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a round trip that was sent at `sent_at`
    pub fn record(&mut self, rtt: Duration, sent_at: DateTime<Utc>) {
        self.max_rtt = Some(self.max_rtt.map_or(rtt, |m| m.max(rtt)));
        self.last_sent = Some(sent_at);
        self.samples += 1;
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn max_rtt(&self) -> Option<Duration> {
        self.max_rtt
    }

    /// Timer event for the window: worst round trip in milliseconds,
    /// stamped with the send time of the last probe. None if empty.
    pub fn finish(self, peer: &Endpoint) -> Option<StatEvent> {
        let rtt = self.max_rtt?;
        let sent = self.last_sent?;
        Some(StatEvent::timer(peer.clone(), rtt.as_secs_f64() * 1000.0, sent))
    }
}

//! Fake reporters and fake peers

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tcp_beep::{Endpoint, Measurement, Reporter, StatEvent, StatKind};

/// Reporter that keeps every event it sees in shared memory
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<StatEvent>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: StatKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    pub fn timer_values(&self) -> Vec<f64> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e.measurement {
                Measurement::Timer { rtt_ms } => Some(rtt_ms),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn write(&mut self, event: &StatEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Echo server that sleeps `delay_for(n)` before answering the n-th line
/// (counted from 1 per connection). Records when each connection arrived.
pub struct FakeEchoServer {
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    accepted: Arc<Mutex<Vec<Instant>>>,
    handle: Option<JoinHandle<()>>,
}

impl FakeEchoServer {
    pub fn start(delay_for: fn(usize) -> Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let accepted = Arc::new(Mutex::new(Vec::new()));

        let flag = running.clone();
        let log = accepted.clone();
        let handle = thread::spawn(move || {
            while flag.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        log.lock().unwrap().push(Instant::now());
                        stream.set_nonblocking(false).unwrap();
                        thread::spawn(move || {
                            let mut writer = stream.try_clone().unwrap();
                            for (n, line) in BufReader::new(stream).lines().enumerate() {
                                let Ok(line) = line else { break };
                                if line == "STOP" {
                                    break;
                                }
                                thread::sleep(delay_for(n + 1));
                                if writer.write_all(format!("{}\n", line).as_bytes()).is_err() {
                                    break;
                                }
                            }
                        });
                    }
                    Err(_) => thread::sleep(Duration::from_millis(5)),
                }
            }
        });

        Self {
            addr,
            running,
            accepted,
            handle: Some(handle),
        }
    }

    /// Plain echo, no delay
    pub fn echo() -> Self {
        Self::start(|_| Duration::ZERO)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::from(self.addr)
    }

    pub fn accepted_at(&self) -> Vec<Instant> {
        self.accepted.lock().unwrap().clone()
    }
}

impl Drop for FakeEchoServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

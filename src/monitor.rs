//! Node orchestration
//!
//! A [`Monitor`] is one node of the mesh: an echo responder for the peers'
//! probes, a probe pool for every other peer, and the event pipeline that
//! carries measurements to the reporters.
//!
//! Construction does all the fallible setup (config validation, stats
//! directory, listener bind) so a bad node fails before any thread starts.
//! `start` brings the pipeline up first so no early measurement is lost;
//! `stop` tears down in reverse data-flow order: probes, responder, then
//! the pipeline, which drains before returning.

use crate::config::MonitorConfig;
use crate::error::{Result, ResultExt};
use crate::pipeline::EventPipeline;
use crate::probe::ProbePool;
use crate::reporting::ReporterRegistry;
use crate::responder::EchoResponder;
use crate::types::Endpoint;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One running node
pub struct Monitor {
    local: Endpoint,
    pipeline: EventPipeline,
    responder: EchoResponder,
    pool: ProbePool,
    started: bool,
}

impl Monitor {
    /// Validate `config`, build the reporters, bind the responder on
    /// `local` and prepare one probe per other peer.
    pub fn new(config: MonitorConfig, local: Endpoint) -> Result<Self> {
        config.validate()?;

        let registry = ReporterRegistry::from_config(&config.reporting, &local)
            .context("Failed to set up stat reporters")?;
        let pipeline = EventPipeline::new(registry, config.pipeline.clone());

        let responder = EchoResponder::bind(&local, config.responder.clone())?;

        let peers = config.peers_excluding(&local);
        tracing::info!("Node {} will probe {} peers", local, peers.len());
        let pool = ProbePool::new(peers, config.probe.clone(), pipeline.publisher());

        Ok(Self {
            local,
            pipeline,
            responder,
            pool,
            started: false,
        })
    }

    pub fn local(&self) -> &Endpoint {
        &self.local
    }

    /// Address the responder is actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.responder.local_addr()
    }

    pub fn peers(&self) -> Vec<Endpoint> {
        self.pool.peers()
    }

    pub fn pool(&self) -> &ProbePool {
        &self.pool
    }

    /// Events published but not yet seen by every reporter
    pub fn pending_events(&self) -> usize {
        self.pipeline.pending()
    }

    /// Start pipeline, responder and probes, in that order
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            tracing::warn!("Monitor {} already started", self.local);
            return Ok(());
        }
        self.started = true;

        tracing::info!("Starting monitor on {}", self.local);
        self.pipeline.start()?;
        self.responder.start()?;
        self.pool.start()?;
        tracing::info!("Monitor on {} running", self.local);
        Ok(())
    }

    /// Stop probes, then the responder, then drain the pipeline. Idempotent.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;

        tracing::info!("Stopping monitor on {}", self.local);
        self.pool.stop();
        self.responder.stop();
        self.pipeline.stop();
        tracing::info!("Monitor on {} stopped", self.local);
    }

    /// Start, block until `stop_flag` is raised, then stop
    pub fn run_until(&mut self, stop_flag: &Arc<AtomicBool>, poll: Duration) -> Result<()> {
        self.start()?;
        while !stop_flag.load(Ordering::SeqCst) {
            std::thread::sleep(poll);
        }
        tracing::info!("Shutdown requested");
        self.stop();
        Ok(())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Stat event pipeline.
//!
//! Decouples event production (many probe threads) from event consumption
//! (reporters doing blocking file or network I/O). Probes enqueue through an
//! [`EventPublisher`]; one drain thread dispatches each event to every
//! reporter, strictly in enqueue order.
//!
//! # Architecture
//!
//! ```text
//! [Probe] ──┐
//! [Probe] ──┼──► unbounded channel ──► [stats-drain] ──► [StatsFileReporter]
//! [Probe] ──┘                                       └──► [StatsdReporter]
//! ```
//!
//! # Design
//!
//! - **Never blocks producers**: the channel is unbounded; probe volume is
//!   bounded by peer count and window size.
//! - **No loss on graceful stop**: an outstanding counter tracks events
//!   until every reporter has seen them, and `stop` waits for it to reach
//!   zero before joining the worker.
//! - **Owned by the monitor**: no globals; the monitor constructs the
//!   pipeline and hands publishers to the probes.

pub mod executor;
pub mod publisher;

pub use executor::EventPipeline;
pub use publisher::EventPublisher;

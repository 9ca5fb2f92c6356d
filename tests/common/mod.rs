//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use std::net::TcpListener;
use std::time::{Duration, Instant};
use tcp_beep::Endpoint;

/// Loopback endpoint on a port that was free a moment ago
pub fn free_endpoint() -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    Endpoint::from(listener.local_addr().expect("local addr"))
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

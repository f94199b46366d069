use std::time::{Duration, Instant};

pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Liveness of one console connection. A console that stops answering pings
/// (closed laptop lid, dead projector tab) is dropped once `timeout` passes.
pub struct HeartbeatState {
    last_pong: Instant,
    timeout: Duration,
}

impl HeartbeatState {
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_pong: Instant::now(),
            timeout,
        }
    }

    pub fn record_pong(&mut self) {
        self.last_pong = Instant::now();
    }

    pub fn is_alive(&self) -> bool {
        self.last_pong.elapsed() < self.timeout
    }
}

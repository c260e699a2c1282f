use remoteview_common::Timestamp;
use remoteview_protocol::Timestamps;
use serde::Serialize;

/// Timing of one server round trip, as reported by an inbound frame header
/// plus the local arrival time.
///
/// Client and server clocks are not synchronized, so cross-clock
/// differences can be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencySample {
    /// Our last input timestamp as echoed by the server (0 before any input).
    pub client_send_echo: Timestamp,
    pub server_recv: Timestamp,
    pub server_send: Timestamp,
    pub client_recv: Timestamp,
}

impl LatencySample {
    pub fn new(timestamps: Timestamps, client_recv: Timestamp) -> Self {
        Self {
            client_send_echo: timestamps.client_send_echo,
            server_recv: timestamps.server_recv,
            server_send: timestamps.server_send,
            client_recv,
        }
    }

    /// Client → server network latency.
    pub fn network_out(&self) -> i64 {
        diff(self.server_recv, self.client_send_echo)
    }

    /// Time the server spent between receiving input and sending this frame.
    pub fn server_processing(&self) -> i64 {
        diff(self.server_send, self.server_recv)
    }

    /// Input-to-frame-arrival latency.
    pub fn round_trip(&self) -> i64 {
        diff(self.client_recv, self.client_send_echo)
    }

    /// Input-to-display latency, given when the frame was drawn.
    pub fn render_latency(&self, rendered_at: Timestamp) -> i64 {
        diff(rendered_at, self.client_send_echo)
    }
}

fn diff(later: Timestamp, earlier: Timestamp) -> i64 {
    later.wrapping_sub(earlier) as i64
}

/// Rolling window of round-trip latencies plus the most recent sample.
#[derive(Debug)]
pub struct LatencyTracker {
    history: Vec<i64>,
    capacity: usize,
    index: usize,
    filled: bool,
    last: Option<LatencySample>,
    /// Set when a sample arrives, cleared by the next completed draw.
    render_pending: bool,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(120)
    }
}

impl LatencyTracker {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        Self {
            history: vec![0; capacity],
            capacity,
            index: 0,
            filled: false,
            last: None,
            render_pending: false,
        }
    }

    pub fn record(&mut self, sample: LatencySample) {
        self.history[self.index] = sample.round_trip();
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
        self.last = Some(sample);
        self.render_pending = true;
    }

    pub fn last(&self) -> Option<&LatencySample> {
        self.last.as_ref()
    }

    /// Report that a frame was drawn at `now`. Returns the render latency of
    /// the newest sample the first time it is drawn, `None` afterwards.
    pub fn mark_rendered(&mut self, now: Timestamp) -> Option<i64> {
        if !self.render_pending {
            return None;
        }
        self.render_pending = false;
        self.last.map(|s| s.render_latency(now))
    }

    fn window(&self) -> &[i64] {
        let count = if self.filled { self.capacity } else { self.index };
        &self.history[..count]
    }

    /// Mean round trip over the window, or 0 when empty.
    pub fn average(&self) -> i64 {
        let window = self.window();
        if window.is_empty() {
            return 0;
        }
        window.iter().sum::<i64>() / window.len() as i64
    }

    pub fn max(&self) -> i64 {
        self.window().iter().copied().max().unwrap_or(0)
    }

    pub fn min(&self) -> i64 {
        self.window().iter().copied().min().unwrap_or(0)
    }

    pub fn count(&self) -> usize {
        self.window().len()
    }
}

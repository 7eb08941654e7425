//! Rate limiting for NCBI E-utilities compliance
//!
//! NCBI allows 3 requests per second without an API key and 10 with one.
//! Violations can result in IP blocking.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, instrument};

const WINDOW: Duration = Duration::from_secs(1);

/// Sliding-window rate gate shared by all requests of one client.
///
/// Keeps the timestamps of recent calls and blocks a caller only while more
/// than `limit` calls landed within the last second. A call is recorded after
/// its response arrives, not when it is admitted, so a burst of calls started
/// in the same instant can overshoot the nominal ceiling by one. A soft
/// limiter, not a token bucket.
#[derive(Clone)]
pub struct RateGate {
    window: Arc<Mutex<Vec<Instant>>>,
    limit: usize,
}

impl RateGate {
    /// Create a new rate gate allowing `limit` calls per rolling second
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_query::RateGate;
    ///
    /// // NCBI rate limit without API key
    /// let gate = RateGate::new(3);
    /// ```
    pub fn new(limit: usize) -> Self {
        Self {
            window: Arc::new(Mutex::new(Vec::new())),
            limit,
        }
    }

    /// Prune timestamps older than one second, then report whether the
    /// window currently holds more recent calls than the configured limit.
    pub async fn exceeded(&self) -> bool {
        let mut window = self.window.lock().await;
        let now = Instant::now();
        window.retain(|&made| now.duration_since(made) < WINDOW);
        window.len() > self.limit
    }

    /// Wait until the rate window has room, re-checking once per second.
    #[instrument(skip(self))]
    pub async fn acquire(&self) {
        while self.exceeded().await {
            debug!(limit = self.limit, "rate window full, backing off");
            sleep(WINDOW).await;
        }
    }

    /// Record a completed call. Called after the response is received, so
    /// failed calls never count against the window.
    pub async fn record(&self) {
        let mut window = self.window.lock().await;
        window.push(Instant::now());
        debug!(recent_calls = window.len(), "recorded API call");
    }

    /// The configured calls-per-second ceiling
    pub fn limit(&self) -> usize {
        self.limit
    }
}

use std::time::{Duration, Instant};

/// Tracks request timing for a single host
///
/// The fetcher keeps one of these per host to space requests at least
/// `download-delay-ms` apart, or further if robots.txt asks for a larger
/// crawl-delay.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of requests made to this host
    pub request_count: u32,

    /// When the most recent request was (or is scheduled to be) sent
    pub last_request_time: Option<Instant>,

    /// Crawl-delay advertised by the host's robots.txt
    pub crawl_delay: Option<Duration>,
}

impl HostState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The delay that applies to this host: the larger of the configured
    /// delay and the robots.txt crawl-delay
    pub fn effective_delay(&self, configured: Duration) -> Duration {
        match self.crawl_delay {
            Some(robots_delay) => robots_delay.max(configured),
            None => configured,
        }
    }

    /// Checks if a request can be made to this host now
    pub fn can_request(&self, configured: Duration, now: Instant) -> bool {
        self.time_until_next_request(configured, now).is_none()
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, configured: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let next_allowed = last + self.effective_delay(configured);

        if next_allowed > now {
            Some(next_allowed - now)
        } else {
            None
        }
    }

    /// Records a request sent (or scheduled) at `at`
    pub fn record_request(&mut self, at: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(at);
    }

    /// Reserves the next request slot and returns how long the caller must wait
    ///
    /// Concurrent callers each get a distinct slot, spaced by the effective
    /// delay.
    pub fn reserve_slot(&mut self, configured: Duration, now: Instant) -> Duration {
        let wait = self
            .time_until_next_request(configured, now)
            .unwrap_or_default();
        self.record_request(now + wait);
        wait
    }
}

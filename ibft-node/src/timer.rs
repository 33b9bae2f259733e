use std::future::pending;

use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

/// Round timer with interval semantics.
///
/// `start_at`/`restart` replace a running deadline and `stop` on an idle timer
/// is a no-op, so decide/timeout races cannot leave two deadlines behind.
#[derive(Debug)]
pub struct RoundTimer {
    period: Duration,
    deadline: Option<Instant>,
}

impl RoundTimer {
    pub fn new(period: Duration) -> Self {
        Self { period, deadline: None }
    }

    pub fn start_at(&mut self, at: Instant) {
        self.deadline = Some(at);
    }

    /// Next expiry one full period from now.
    pub fn restart(&mut self) {
        self.start_at(Instant::now() + self.period);
    }

    pub fn stop(&mut self) {
        if self.deadline.take().is_none() {
            debug!("Tentativa de parar timer não iniciado");
        }
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves at the deadline and re-arms one period later. Never resolves
    /// while stopped. Dropping the future before it resolves changes nothing.
    pub async fn expired(&mut self) {
        let Some(at) = self.deadline else {
            return pending().await;
        };
        sleep_until(at).await;
        self.deadline = Some(at + self.period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_and_rearms() {
        let mut timer = RoundTimer::new(Duration::from_secs(3));
        let t0 = Instant::now();
        timer.start_at(t0 + Duration::from_secs(5));

        timer.expired().await;
        assert_eq!(Instant::now() - t0, Duration::from_secs(5));
        assert_eq!(timer.deadline(), Some(t0 + Duration::from_secs(8)));

        timer.expired().await;
        assert_eq!(Instant::now() - t0, Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_deadline() {
        let mut timer = RoundTimer::new(Duration::from_secs(2));
        timer.start_at(Instant::now() + Duration::from_secs(60));
        timer.restart();
        let t0 = Instant::now();
        timer.expired().await;
        assert_eq!(Instant::now() - t0, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_timer_never_fires() {
        let mut timer = RoundTimer::new(Duration::from_secs(1));
        timer.stop();
        timer.restart();
        timer.stop();
        timer.stop();
        assert!(!timer.is_running());

        let fired = tokio::time::timeout(Duration::from_secs(10), timer.expired()).await;
        assert!(fired.is_err());
    }
}

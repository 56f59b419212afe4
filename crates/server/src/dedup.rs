use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

/// Remembers delivery keys for a fixed window so Slack retries of the same
/// event are acknowledged without running the pipeline again.
#[derive(Debug)]
pub struct DeliveryGuard {
    ttl: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl DeliveryGuard {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, seen: Mutex::new(HashMap::new()) }
    }

    /// Returns `true` the first time `key` is offered within the window.
    pub async fn claim(&self, key: &str) -> bool {
        self.claim_at(key, Instant::now()).await
    }

    pub async fn claim_at(&self, key: &str, now: Instant) -> bool {
        let mut seen = self.seen.lock().await;
        seen.retain(|_, claimed_at| now.saturating_duration_since(*claimed_at) < self.ttl);

        if seen.contains_key(key) {
            return false;
        }
        seen.insert(key.to_owned(), now);
        true
    }

    /// Drops a claim so a retry of a failed delivery is processed again.
    pub async fn release(&self, key: &str) {
        self.seen.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::DeliveryGuard;

    #[tokio::test]
    async fn second_claim_within_window_is_rejected() {
        let guard = DeliveryGuard::new(Duration::from_secs(600));
        let now = Instant::now();

        assert!(guard.claim_at("event:Ev1", now).await);
        assert!(!guard.claim_at("event:Ev1", now + Duration::from_secs(599)).await);
        assert!(guard.claim_at("event:Ev2", now).await);
    }

    #[tokio::test]
    async fn claims_expire_after_ttl() {
        let guard = DeliveryGuard::new(Duration::from_secs(10));
        let now = Instant::now();

        assert!(guard.claim_at("event:Ev1", now).await);
        assert!(guard.claim_at("event:Ev1", now + Duration::from_secs(10)).await);
        assert!(!guard.claim_at("event:Ev1", now + Duration::from_secs(11)).await);
    }

    #[tokio::test]
    async fn released_keys_can_be_claimed_again() {
        let guard = DeliveryGuard::new(Duration::from_secs(600));

        assert!(guard.claim("trigger:T1").await);
        guard.release("trigger:T1").await;
        assert!(guard.claim("trigger:T1").await);
    }
}

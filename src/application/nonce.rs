//! Time-bound request nonces.

use std::time::Duration;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

const NONCE_HEX_LEN: usize = 24;

/// Issues and verifies nonces bound to an `(action, actor)` pair.
///
/// Time is cut into ticks of half the lifetime. A nonce issued in tick `t`
/// verifies during ticks `t` and `t + 1`.
#[derive(Clone)]
pub struct NonceService {
    secret: Vec<u8>,
    tick_secs: i64,
}

impl std::fmt::Debug for NonceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceService")
            .field("tick_secs", &self.tick_secs)
            .finish_non_exhaustive()
    }
}

impl NonceService {
    pub fn new(secret: impl Into<Vec<u8>>, lifetime: Duration) -> Self {
        let tick_secs = i64::try_from(lifetime.as_secs() / 2)
            .unwrap_or(i64::MAX)
            .max(1);
        Self {
            secret: secret.into(),
            tick_secs,
        }
    }

    pub fn issue(&self, action: &str, actor: &str) -> String {
        self.issue_at(action, actor, OffsetDateTime::now_utc())
    }

    pub fn verify(&self, nonce: &str, action: &str, actor: &str) -> bool {
        self.verify_at(nonce, action, actor, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, action: &str, actor: &str, at: OffsetDateTime) -> String {
        self.digest(self.tick(at), action, actor)
    }

    pub fn verify_at(&self, nonce: &str, action: &str, actor: &str, at: OffsetDateTime) -> bool {
        if nonce.len() != NONCE_HEX_LEN {
            return false;
        }
        let tick = self.tick(at);
        [tick, tick - 1].into_iter().any(|candidate| {
            let expected = self.digest(candidate, action, actor);
            bool::from(expected.as_bytes().ct_eq(nonce.as_bytes()))
        })
    }

    fn tick(&self, at: OffsetDateTime) -> i64 {
        at.unix_timestamp().div_euclid(self.tick_secs)
    }

    fn digest(&self, tick: i64, action: &str, actor: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(b"|");
        hasher.update(tick.to_be_bytes());
        hasher.update(b"|");
        hasher.update(action.as_bytes());
        hasher.update(b"|");
        hasher.update(actor.as_bytes());
        let mut encoded = hex::encode(hasher.finalize());
        encoded.truncate(NONCE_HEX_LEN);
        encoded
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn service() -> NonceService {
        NonceService::new("secret", Duration::from_secs(86_400))
    }

    #[test]
    fn nonce_verifies_within_current_and_next_tick() {
        let service = service();
        let issued = datetime!(2024-05-01 00:00:00 UTC);
        let nonce = service.issue_at("post_sort", "alice", issued);

        assert!(service.verify_at(&nonce, "post_sort", "alice", issued));
        assert!(service.verify_at(
            &nonce,
            "post_sort",
            "alice",
            datetime!(2024-05-01 23:59:59 UTC)
        ));
        assert!(!service.verify_at(
            &nonce,
            "post_sort",
            "alice",
            datetime!(2024-05-02 00:00:00 UTC)
        ));
    }

    #[test]
    fn nonce_is_bound_to_action_and_actor() {
        let service = service();
        let at = datetime!(2024-05-01 10:00:00 UTC);
        let nonce = service.issue_at("post_sort", "alice", at);

        assert!(!service.verify_at(&nonce, "other", "alice", at));
        assert!(!service.verify_at(&nonce, "post_sort", "bob", at));
        assert!(!service.verify_at("", "post_sort", "alice", at));
    }

    #[test]
    fn different_secrets_disagree() {
        let at = datetime!(2024-05-01 10:00:00 UTC);
        let nonce = service().issue_at("post_sort", "alice", at);
        let other = NonceService::new("other", Duration::from_secs(86_400));
        assert!(!other.verify_at(&nonce, "post_sort", "alice", at));
    }
}

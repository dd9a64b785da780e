use std::time::Duration;

use tokio::time::Instant;

/// Token bucket: bounded burst capacity, continuous refill at
/// `capacity / 60` tokens per second. `acquire` suspends until a token is
/// available; it never drops requests.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: tokio::sync::Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// `calls_per_minute` is both the burst capacity and the sustained rate.
    pub fn per_minute(calls_per_minute: u32) -> Self {
        let capacity = f64::from(calls_per_minute.max(1));
        Self {
            capacity,
            refill_per_sec: capacity / 60.0,
            state: tokio::sync::Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token, waiting for refill when the bucket is empty.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                let deficit = 1.0 - state.tokens;
                Duration::from_secs_f64(deficit / self.refill_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available (after refill accounting).
    pub async fn available(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
    }
}

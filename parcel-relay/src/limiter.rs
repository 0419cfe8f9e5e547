use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Continuous-refill token bucket: `capacity` tokens per `period`, starting full.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    per_sec: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    refreshed: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, period: Duration) -> Self {
        let capacity = f64::from(capacity.max(1));
        let secs = period.as_secs_f64().max(f64::EPSILON);
        Self {
            capacity,
            per_sec: capacity / secs,
            state: Mutex::new(BucketState {
                tokens: capacity,
                refreshed: Instant::now(),
            }),
        }
    }

    /// 30 messages per second.
    pub fn messages() -> Self {
        Self::new(30, Duration::from_secs(1))
    }

    /// 20 uploads per minute.
    pub fn media() -> Self {
        Self::new(20, Duration::from_secs(60))
    }

    /// Takes a token if one is available; otherwise reports how long until one
    /// will be.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let mut st = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(st.refreshed).as_secs_f64();
        st.tokens = (st.tokens + elapsed * self.per_sec).min(self.capacity);
        st.refreshed = now;
        if st.tokens >= 1.0 {
            st.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - st.tokens) / self.per_sec))
        }
    }

    /// Suspends until a token is available, then takes it.
    pub async fn acquire(&self) {
        while let Err(wait) = self.try_acquire() {
            sleep(wait.max(Duration::from_millis(1))).await;
        }
    }
}

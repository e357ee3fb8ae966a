//! Backoff schedule for registry requests.
//!
//! The registry answers an exhausted quota with a JSON `message` starting
//! with "API rate limit" instead of results. Those answers, transport failures
//! and unreadable bodies are all retried, waiting longer as attempts pile up.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Total number of attempts made for one registry request.
pub const MAX_ATTEMPTS: usize = 10;

const RATE_LIMIT_PREFIX: &str = "API rate limit";

/// Delay after the failed attempt number `attempt` (0-based).
pub fn backoff_delay(attempt: usize) -> Duration {
    let ms = match attempt {
        0..=2 => 200,
        3..=4 => 1000,
        5..=6 => 2500,
        7..=8 => 5000,
        _ => 10000,
    };
    Duration::from_millis(ms)
}

/// The rate-limit message carried by `body`, if it is a rate-limit answer.
pub fn rate_limit_message(body: &Value) -> Option<&str> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|message| message.starts_with(RATE_LIMIT_PREFIX))
}

/// Blocking pause between attempts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backoff_schedule() {
        let expected = [200, 200, 200, 1000, 1000, 2500, 2500, 5000, 5000, 10000, 10000, 10000];
        for (attempt, ms) in expected.iter().enumerate() {
            assert_eq!(backoff_delay(attempt), Duration::from_millis(*ms), "attempt {attempt}");
        }
    }

    #[test]
    fn test_rate_limit_message() {
        let limited = json!({"message": "API rate limit exceeded for 1.2.3.4.", "documentation_url": "x"});
        assert_eq!(
            rate_limit_message(&limited),
            Some("API rate limit exceeded for 1.2.3.4.")
        );

        assert_eq!(rate_limit_message(&json!({"message": "Not Found"})), None);
        assert_eq!(rate_limit_message(&json!({"items": []})), None);
        assert_eq!(rate_limit_message(&json!([{"name": "1.0.0"}])), None);
        assert_eq!(rate_limit_message(&json!({"message": 3})), None);
    }

    #[tokio::test]
    async fn test_tokio_sleeper_waits() {
        let start = std::time::Instant::now();
        TokioSleeper.sleep(Duration::from_millis(5)).await;
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}

use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;

/// Delay before retry number `attempt + 1`: `initial * 2^attempt`, capped at
/// `max`, plus up to 25% random jitter.
pub fn backoff_delay(attempt: u32, initial: Duration, max: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    let base = initial.saturating_mul(factor).min(max);
    let jitter_cap = base.as_millis() as u64 / 4;
    let jitter = if jitter_cap == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_cap)
    };
    base + Duration::from_millis(jitter)
}

/// Resolves once the batch is cancelled. If the sender is gone the batch can
/// no longer be cancelled, so this never resolves.
pub async fn wait_for_cancel(cancel: &mut watch::Receiver<bool>) {
    let closed = cancel.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        futures::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let initial = Duration::from_millis(100);
        let max = Duration::from_millis(1_000);
        for attempt in 0..3 {
            let base = 100u64 * 2u64.pow(attempt);
            let delay = backoff_delay(attempt, initial, max).as_millis() as u64;
            assert!(delay >= base && delay <= base + base / 4, "attempt {} gave {}", attempt, delay);
        }
        let capped = backoff_delay(30, initial, max).as_millis() as u64;
        assert!((1_000..=1_250).contains(&capped));
    }

    #[tokio::test]
    async fn test_wait_for_cancel() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        wait_for_cancel(&mut rx).await;

        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let waited =
            tokio::time::timeout(Duration::from_millis(20), wait_for_cancel(&mut rx)).await;
        assert!(waited.is_err());
    }
}

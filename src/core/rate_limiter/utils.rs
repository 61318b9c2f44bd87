//! Background maintenance for rate limiters

use super::RateLimiter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Run `sweep` on a fixed interval until the task is aborted.
///
/// `sweep` reports how many entries it removed.
pub fn start_cleanup_task<F, Fut>(every: Duration, sweep: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = usize> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = sweep().await;
            if removed > 0 {
                debug!(removed, "Background sweep removed expired entries");
            }
        }
    })
}

/// Sweep every limiter in `limiters`, returning the total removed
pub async fn cleanup_all(limiters: &[Arc<dyn RateLimiter>]) -> usize {
    let mut removed = 0;
    for limiter in limiters {
        removed += limiter.cleanup().await;
    }
    removed
}

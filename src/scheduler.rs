// src/scheduler.rs

//! Periodic execution of scrape runs.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use crate::models::ScheduleConfig;

/// Pick the schedule to use: the command line wins over the config file.
pub fn effective_schedule(
    cli: Option<ScheduleConfig>,
    config: Option<ScheduleConfig>,
) -> Option<ScheduleConfig> {
    cli.or(config)
}

/// Run `job` immediately and then once per `period`, forever.
///
/// A run that takes longer than `period` delays the next one instead of
/// triggering a burst of catch-up runs.
pub async fn run_every<F, Fut>(period: Duration, job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    run_ticks(period, None, job).await;
}

async fn run_ticks<F, Fut>(period: Duration, limit: Option<usize>, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut runs = 0;
    loop {
        interval.tick().await;
        job().await;
        runs += 1;

        if limit.is_some_and(|limit| runs >= limit) {
            break;
        }
        log::info!("Next run in {:?}", period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScheduleUnit;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn test_cli_schedule_wins() {
        let cli = ScheduleConfig {
            every: 5,
            units: ScheduleUnit::Seconds,
        };
        let file = ScheduleConfig {
            every: 1,
            units: ScheduleUnit::Hours,
        };
        assert_eq!(effective_schedule(Some(cli), Some(file)), Some(cli));
        assert_eq!(effective_schedule(None, Some(file)), Some(file));
        assert_eq!(effective_schedule(None, None), None);
    }

    #[tokio::test]
    async fn test_first_run_is_immediate_then_periodic() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let start = Instant::now();

        run_ticks(Duration::from_millis(20), Some(3), || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}

//! Scheduler cadence, isolation and lifecycle, on a paused clock

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use pawnshop_server::error::EngineError;
    use pawnshop_server::jobs::{job_fn, Job, Schedule, Scheduler};

    fn every(secs: u64) -> Schedule {
        Schedule::every(Duration::from_secs(secs)).unwrap()
    }

    fn counting_job(counter: Arc<AtomicUsize>) -> Arc<dyn Job> {
        job_fn(move |_ctx| {
            let counter = counter.clone();
            async move {
                let runs = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(json!({ "runs": runs }))
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_runs_once_per_interval_after_start() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler
            .register("tick", every(10), counting_job(runs.clone()), true)
            .await
            .unwrap();
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0, "first run waits a full interval");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_job_never_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler
            .register("daily-interest", every(1), counting_job(runs.clone()), false)
            .await
            .unwrap();
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(60)).await;
        scheduler.stop().await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        let info = scheduler.status_board().get("daily-interest").await.unwrap();
        assert!(!info.enabled);
        assert_eq!(info.runs, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_job_keeps_its_schedule() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let mut scheduler = Scheduler::new();
        scheduler
            .register(
                "flaky",
                every(10),
                job_fn(move |_ctx| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err(EngineError::DatabaseError("connection reset".to_string()))
                    }
                }),
                true,
            )
            .await
            .unwrap();
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(35)).await;
        scheduler.stop().await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        let info = scheduler.status_board().get("flaky").await.unwrap();
        assert_eq!(info.runs, 3);
        assert_eq!(info.failures, 3);
        assert!(info.last_error.unwrap().contains("connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_job_does_not_kill_its_timer_or_others() {
        let panics = Arc::new(AtomicUsize::new(0));
        let healthy = Arc::new(AtomicUsize::new(0));
        let counter = panics.clone();

        let mut scheduler = Scheduler::new();
        scheduler
            .register(
                "explodes",
                every(10),
                job_fn(move |_ctx| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        let parsed: Option<Value> = None;
                        Ok(parsed.expect("bad data"))
                    }
                }),
                true,
            )
            .await
            .unwrap();
        scheduler
            .register("healthy", every(10), counting_job(healthy.clone()), true)
            .await
            .unwrap();
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(35)).await;
        scheduler.stop().await;

        assert_eq!(panics.load(Ordering::SeqCst), 3);
        assert_eq!(healthy.load(Ordering::SeqCst), 3);
        let info = scheduler.status_board().get("explodes").await.unwrap();
        assert_eq!(info.failures, 3);
        assert!(info.last_error.unwrap().contains("panicked"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_job_does_not_delay_other_jobs() {
        let fast = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler
            .register(
                "slow",
                every(5),
                job_fn(|ctx| async move {
                    tokio::select! {
                        _ = ctx.cancelled() => {}
                        _ = tokio::time::sleep(Duration::from_secs(3600)) => {}
                    }
                    Ok(json!({}))
                }),
                true,
            )
            .await
            .unwrap();
        scheduler
            .register("fast", every(10), counting_job(fast.clone()), true)
            .await
            .unwrap();
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(55)).await;

        assert_eq!(fast.load(Ordering::SeqCst), 5);
        let slow = scheduler.status_board().get("slow").await.unwrap();
        assert!(slow.running);
        assert_eq!(slow.runs, 0);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_of_one_job_never_overlap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));
        let (flight, max, count) = (in_flight.clone(), max_seen.clone(), runs.clone());

        let mut scheduler = Scheduler::new();
        scheduler
            .register(
                "long",
                every(10),
                job_fn(move |_ctx| {
                    let (flight, max, count) = (flight.clone(), max.clone(), count.clone());
                    async move {
                        let now = flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(25)).await;
                        flight.fetch_sub(1, Ordering::SeqCst);
                        count.fetch_add(1, Ordering::SeqCst);
                        Ok(json!({}))
                    }
                }),
                true,
            )
            .await
            .unwrap();
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(120)).await;
        scheduler.stop().await;

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(runs.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_duplicate_names_are_rejected() {
        let mut scheduler = Scheduler::new();
        let job = counting_job(Arc::new(AtomicUsize::new(0)));

        scheduler
            .register("loan-maintenance", every(60), job.clone(), true)
            .await
            .unwrap();
        let err = scheduler
            .register("loan-maintenance", every(30), job, true)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::DuplicateJob(name) if name == "loan-maintenance"));
        assert_eq!(scheduler.jobs().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_closes_after_start() {
        let mut scheduler = Scheduler::new();
        scheduler.start();
        assert!(scheduler.is_running());

        let result = scheduler
            .register("late", every(10), counting_job(Arc::new(AtomicUsize::new(0))), true)
            .await;
        assert!(result.is_err());

        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_in_flight_run_and_halts_timers() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let mut scheduler = Scheduler::new();
        scheduler
            .register(
                "waits-for-shutdown",
                every(10),
                job_fn(move |ctx| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        ctx.cancelled().await;
                        Ok(json!({ "cancelled": ctx.is_cancelled() }))
                    }
                }),
                true,
            )
            .await
            .unwrap();
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        scheduler.stop().await;
        let info = scheduler.status_board().get("waits-for-shutdown").await.unwrap();
        assert!(!info.running);
        assert_eq!(info.runs, 1);
        assert_eq!(info.last_output, Some(json!({ "cancelled": true })));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}

//! Worker pool integration tests
//!
//! Timing-sensitive tests shrink the control interval and window through the
//! config builders and assert with wide tolerances.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use paceline::{MemorySink, PoolConfig, PoolError, ScaleStrategy, Severity, WorkerPool};

fn noop_pool(config: PoolConfig) -> WorkerPool<u32> {
    WorkerPool::new(|_task: u32| async { anyhow::Ok(()) }, config)
}

/// Poll until the live worker count settles at `desired`.
async fn settle(pool: &WorkerPool<u32>, desired: i64) {
    for _ in 0..200 {
        if pool.worker_count() == desired {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "worker count did not settle at {desired}, got {}",
        pool.worker_count()
    );
}

#[tokio::test]
async fn scale_worker_reaches_desired_count() {
    let pool = noop_pool(PoolConfig::new(8));

    pool.scale_worker(4);
    // Counted from the start call, before the workers run
    assert_eq!(pool.worker_count(), 4);

    pool.scale_worker(1);
    settle(&pool, 1).await;

    pool.scale_worker(0);
    settle(&pool, 0).await;

    pool.shutdown().await.unwrap();
}

#[tokio::test]
async fn scale_worker_same_count_is_a_noop() {
    let sink = Arc::new(MemorySink::new());
    let pool = WorkerPool::with_event_sink(
        |_task: u32| async { anyhow::Ok(()) },
        PoolConfig::new(8),
        sink.clone(),
    );

    pool.scale_worker(3);
    assert_eq!(sink.events_for("start_worker").len(), 3);

    pool.scale_worker(3);
    // Zero additional start or stop operations
    assert_eq!(sink.events_for("start_worker").len(), 3);
    assert!(sink.events_for("stop_worker").is_empty());

    pool.shutdown().await.unwrap();
}

#[tokio::test]
async fn stop_worker_on_empty_pool_is_clamped() {
    let sink = Arc::new(MemorySink::new());
    let pool = WorkerPool::with_event_sink(
        |_task: u32| async { anyhow::Ok(()) },
        PoolConfig::new(8),
        sink.clone(),
    );

    pool.stop_worker();
    assert_eq!(pool.worker_count(), 0);

    let events = sink.events_for("stop_worker");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity, Severity::Warn);
}

#[tokio::test]
async fn negative_scale_clamps_to_zero() {
    let pool = noop_pool(PoolConfig::new(8));
    pool.scale_worker(2);
    pool.scale_worker(-5);
    settle(&pool, 0).await;
}

#[tokio::test]
async fn full_queue_blocks_the_producer() {
    let pool = noop_pool(PoolConfig::new(1));

    // No workers: the single slot fills and stays full
    pool.add_task(1).await.unwrap();
    assert_eq!(pool.queue_length(), 1);

    let blocked = tokio::time::timeout(Duration::from_millis(100), pool.add_task(2)).await;
    assert!(blocked.is_err(), "add_task should block, not fail");
}

#[tokio::test]
async fn handler_errors_are_forwarded_and_the_pool_continues() {
    let executed = Arc::new(AtomicUsize::new(0));
    let tally = Arc::clone(&executed);

    let pool = WorkerPool::new(
        move |task: u32| {
            let tally = Arc::clone(&tally);
            async move {
                tally.fetch_add(1, Ordering::SeqCst);
                if task % 2 == 0 {
                    Err(anyhow::anyhow!("task {task} failed"))
                } else {
                    Ok(())
                }
            }
        },
        PoolConfig::new(16),
    );
    let mut errors = pool.take_errors().expect("error channel");

    pool.start_worker();
    for task in 0..4u32 {
        pool.add_task(task).await.unwrap();
    }

    let first = tokio::time::timeout(Duration::from_secs(1), errors.recv())
        .await
        .expect("error within deadline")
        .expect("channel open");
    assert!(first.to_string().contains("failed"));

    let second = tokio::time::timeout(Duration::from_secs(1), errors.recv())
        .await
        .expect("error within deadline")
        .expect("channel open");
    assert!(second.to_string().contains("failed"));

    // Failed tasks did not stall the worker
    for _ in 0..200 {
        if executed.load(Ordering::SeqCst) == 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(executed.load(Ordering::SeqCst), 4);

    let stats = pool.stats(Duration::from_secs(10)).unwrap();
    assert_eq!(stats.errors.count, 2);
    assert_eq!(stats.new_tasks.count, 4);
    assert_eq!(stats.task_duration.count, 4);
    assert_eq!(stats.worker_count, 1);

    pool.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_joins_workers_and_closes_the_queue() {
    let pool = noop_pool(PoolConfig::new(8));
    pool.scale_worker(3);

    pool.shutdown().await.unwrap();
    assert_eq!(pool.worker_count(), 0);

    let err = pool.add_task(1).await.unwrap_err();
    assert!(matches!(err, PoolError::QueueClosed));
}

#[tokio::test]
async fn converges_to_target_throughput() {
    let completed = Arc::new(AtomicUsize::new(0));
    let tally = Arc::clone(&completed);

    let config = PoolConfig::new(64)
        .with_control_interval(Duration::from_millis(100))
        .with_control_window(Duration::from_secs(2));

    let pool = WorkerPool::new(
        move |_task: u32| {
            let tally = Arc::clone(&tally);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                tally.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        },
        config,
    );

    // 20 completions per 2s window with ~50ms tasks: one worker, ~50ms pacing
    pool.scale_tasks_per(Duration::from_secs(2), 20);
    assert_eq!(pool.strategy(), ScaleStrategy::TargetThroughput);

    // Offer tasks faster than the target consumes them
    let feeder = {
        let pool = pool.clone();
        tokio::spawn(async move {
            for task in 0..u32::MAX {
                if pool.add_task(task).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
    };

    // Let the controller replace the 1s no-data fallback with measurements
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(pool.worker_count(), 1, "avg 50ms fits one worker");
    let delay = pool.per_task_delay();
    assert!(
        delay >= Duration::from_millis(30) && delay <= Duration::from_millis(70),
        "expected ~50ms pacing, got {delay:?}"
    );

    // Observed completion rate near 10/s (20 per 2s window)
    let before = completed.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let rate = completed.load(Ordering::SeqCst) - before;
    assert!(
        (5..=16).contains(&rate),
        "expected ~10 completions/s, got {rate}"
    );

    feeder.abort();
    pool.shutdown().await.unwrap();
}

#[tokio::test]
async fn retargeting_updates_without_a_second_controller() {
    let sink = Arc::new(MemorySink::new());
    let config = PoolConfig::new(16)
        .with_control_interval(Duration::from_millis(50))
        .with_control_window(Duration::from_secs(1));

    let pool = WorkerPool::with_event_sink(
        |_task: u32| async { anyhow::Ok(()) },
        config,
        sink.clone(),
    );

    pool.scale_tasks_per(Duration::from_secs(1), 2);
    tokio::time::sleep(Duration::from_millis(120)).await;
    // No measurements: fallback 1s average, 2 tasks/s needs 2 workers
    assert_eq!(pool.worker_count(), 2);

    pool.scale_tasks_per(Duration::from_secs(1), 4);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(pool.worker_count(), 4);

    assert_eq!(sink.events_for("scale_tasks_per").len(), 2);

    pool.shutdown().await.unwrap();
}

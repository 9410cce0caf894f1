//! Dispatch worker tests
//!
//! Events submitted from many tasks must still be dispatched one at a time,
//! in submission order per caller, on the dedicated thread.

use test_utils::{alert_event, TestHarness};

use pushgate_core::{
    DispatchOutcome, DispatchWorker, Envelope, InboundEvent, ListenerVerdict, PushError,
    PushListener,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records how many dispatches overlap and the thread they ran on
struct OverlapProbe {
    active: AtomicUsize,
    max_active: AtomicUsize,
    threads: Mutex<Vec<String>>,
}

impl PushListener for OverlapProbe {
    fn on_message(&self, _envelope: &Envelope) -> ListenerVerdict {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.threads.lock().unwrap().push(
            std::thread::current()
                .name()
                .unwrap_or_default()
                .to_string(),
        );
        std::thread::sleep(Duration::from_millis(2));
        self.active.fetch_sub(1, Ordering::SeqCst);
        ListenerVerdict::Claim
    }
}

#[tokio::test]
async fn test_dispatch_through_worker() {
    let harness = TestHarness::new(false);
    let worker = DispatchWorker::spawn(harness.dispatcher.clone(), &harness.config.worker).unwrap();

    let outcome = worker.dispatch(alert_event("Hello")).await.unwrap();
    assert!(outcome.is_unhandled());

    let dropped = worker.dispatch(InboundEvent::default()).await.unwrap();
    assert_eq!(dropped, DispatchOutcome::Dropped);

    worker.shutdown().await.unwrap();
    assert_eq!(harness.pending.len(), 1);
    assert_eq!(harness.store_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_run_serially_on_worker_thread() {
    let harness = TestHarness::new(true);
    let probe = Arc::new(OverlapProbe {
        active: AtomicUsize::new(0),
        max_active: AtomicUsize::new(0),
        threads: Mutex::new(Vec::new()),
    });
    harness.chain.register(0, probe.clone());

    let worker = DispatchWorker::spawn(harness.dispatcher.clone(), &harness.config.worker).unwrap();
    let mut tasks = Vec::new();
    for i in 0..16 {
        let handle = worker.handle();
        tasks.push(tokio::spawn(async move {
            handle.dispatch(alert_event(&format!("m{}", i))).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), DispatchOutcome::Handled);
    }
    worker.shutdown().await.unwrap();

    assert_eq!(probe.max_active.load(Ordering::SeqCst), 1);
    let threads = probe.threads.lock().unwrap();
    assert_eq!(threads.len(), 16);
    assert!(threads.iter().all(|name| name == "push-dispatch-test"));
}

#[tokio::test]
async fn test_errors_are_returned_to_the_caller() {
    let harness = TestHarness::new(true);
    harness.classifier.set_failing(true);
    let worker = DispatchWorker::spawn(harness.dispatcher.clone(), &harness.config.worker).unwrap();

    let err = worker.dispatch(alert_event("Hello")).await.unwrap_err();
    assert!(err.is_transport());

    // The worker keeps serving after a failed dispatch
    harness.classifier.set_failing(false);
    assert!(worker.dispatch(alert_event("Again")).await.is_ok());
    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dispatch_after_shutdown_fails() {
    let harness = TestHarness::new(true);
    let worker = DispatchWorker::spawn(harness.dispatcher.clone(), &harness.config.worker).unwrap();
    let handle = worker.handle();
    worker.shutdown().await.unwrap();

    let err = handle.dispatch(alert_event("late")).await.unwrap_err();
    assert!(matches!(err, PushError::Channel { .. }));
}

#[test]
fn test_blocking_dispatch_from_plain_thread() {
    let harness = TestHarness::new(false);
    let worker = DispatchWorker::spawn(harness.dispatcher.clone(), &harness.config.worker).unwrap();
    let handle = worker.handle();

    let outcome = std::thread::spawn(move || handle.blocking_dispatch(alert_event("Hello")))
        .join()
        .unwrap()
        .unwrap();
    assert!(outcome.is_unhandled());

    drop(worker);
    assert_eq!(harness.notifications.count(), 1);
}

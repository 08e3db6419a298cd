use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::oneshot;

use orderkit_core::{DomainError, UserId};
use orderkit_infra::{CoalesceKey, MutationCoalescer};

#[tokio::test]
async fn concurrent_calls_share_one_execution() {
    let coalescer = MutationCoalescer::new();
    let key = CoalesceKey::new(UserId::new(), "order/42");
    let runs = Arc::new(AtomicUsize::new(0));
    let (release, gate) = oneshot::channel::<()>();

    let first = {
        let runs = runs.clone();
        coalescer.coalesce(key.clone(), async move {
            let run = runs.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = gate.await;
            run
        })
    };
    let second = {
        let runs = runs.clone();
        coalescer.coalesce(key.clone(), async move { runs.fetch_add(1, Ordering::SeqCst) + 100 })
    };
    assert_eq!(coalescer.in_flight(), 1);

    let _ = release.send(());
    let (a, b) = tokio::join!(first, second);

    assert_eq!((a, b), (1, 1));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(coalescer.in_flight(), 0);

    let later = coalescer.coalesce(key, async { 7 }).await;
    assert_eq!(later, 7);
}

#[tokio::test]
async fn failed_operations_are_not_retained() {
    let coalescer: MutationCoalescer<Result<u32, DomainError>> = MutationCoalescer::new();
    let key = CoalesceKey::new(UserId::new(), "order/7");

    let failed = coalescer
        .coalesce(key.clone(), async { Err(DomainError::persistence("write failed")) })
        .await;
    assert!(failed.is_err());
    assert_eq!(coalescer.in_flight(), 0);

    let ok = coalescer.coalesce(key, async { Ok(3) }).await;
    assert_eq!(ok, Ok(3));
}

#[tokio::test]
async fn different_actors_do_not_share() {
    let coalescer = MutationCoalescer::new();
    let a = coalescer.coalesce(CoalesceKey::new(UserId::new(), "order/1"), async { 1 });
    let b = coalescer.coalesce(CoalesceKey::new(UserId::new(), "order/1"), async { 2 });
    assert_eq!(coalescer.in_flight(), 2);
    assert_eq!(tokio::join!(a, b), (1, 2));
}

use super::*;
use crate::{CancellationToken, Runtime};
use pretty_assertions::assert_eq;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Barrier};

#[test]
fn computes_once_across_threads() {
    let runtime = Runtime::new(CancellationToken::new());
    let once: Once<Arc<str>> = Once::new();
    let calls = AtomicUsize::new(0);
    let barrier = Barrier::new(8);

    let results: Vec<Arc<str>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    let task = runtime.new_task();
                    barrier.wait();
                    once.resolve(&task, "local.x", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        Arc::from("hello")
                    })
                    .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let first = &results[0];
    assert!(results.iter().all(|r| Arc::ptr_eq(r, first)));
    assert_eq!(once.get().as_deref(), Some("hello"));
}

#[test]
fn later_calls_do_not_recompute() {
    let runtime = Runtime::new(CancellationToken::new());
    let task = runtime.new_task();
    let once = Once::new();
    assert_eq!(once.resolve(&task, "a", || 1), Ok(1));
    assert_eq!(once.resolve(&task, "a", || 2), Ok(1));
}

#[test]
fn self_reference_is_a_cycle() {
    let runtime = Runtime::new(CancellationToken::new());
    let task = runtime.new_task();
    let a: Once<u32> = Once::new();
    let b: Once<u32> = Once::new();

    let inner = std::cell::RefCell::new(None);
    let result = a.resolve(&task, "local.a", || {
        let b_result = b.resolve(&task, "local.b", || {
            let err = a.resolve(&task, "local.a", || 99).unwrap_err();
            *inner.borrow_mut() = Some(err);
            0
        });
        b_result.unwrap() + 1
    });

    assert_eq!(result, Ok(1));
    assert_eq!(
        inner.into_inner(),
        Some(PromiseError::Cycle(vec![
            "local.a".to_owned(),
            "local.b".to_owned(),
            "local.a".to_owned(),
        ]))
    );
}

#[test]
fn cross_thread_cycle_terminates() {
    let runtime = Runtime::new(CancellationToken::new());
    let a: Once<Result<u32, PromiseError>> = Once::new();
    let b: Once<Result<u32, PromiseError>> = Once::new();
    let barrier = Barrier::new(2);

    let (ra, rb) = std::thread::scope(|s| {
        let ha = s.spawn(|| {
            let task = runtime.new_task();
            a.resolve(&task, "local.a", || {
                barrier.wait();
                b.resolve(&task, "local.b", || Ok(0)).and_then(|r| r)
            })
        });
        let hb = s.spawn(|| {
            let task = runtime.new_task();
            b.resolve(&task, "local.b", || {
                barrier.wait();
                a.resolve(&task, "local.a", || Ok(0)).and_then(|r| r)
            })
        });
        (ha.join().unwrap(), hb.join().unwrap())
    });

    let cycle = PromiseError::Cycle(vec![
        "local.a".to_owned(),
        "local.b".to_owned(),
        "local.a".to_owned(),
    ]);
    // Exactly one side detects the cycle; the other observes that result.
    assert_eq!(ra.unwrap(), Err(cycle.clone()));
    assert_eq!(rb.unwrap(), Err(cycle));
}

#[test]
fn cancellation_before_claim() {
    let token = CancellationToken::new();
    let runtime = Runtime::new(token.clone());
    let task = runtime.new_task();
    let once: Once<u32> = Once::new();
    token.cancel();
    assert_eq!(once.resolve(&task, "a", || 1), Err(PromiseError::Cancelled));
    assert_eq!(once.get(), None);
}

#[test]
fn cancellation_during_compute_releases_waiters() {
    let token = CancellationToken::new();
    let runtime = Runtime::new(token.clone());
    let once: Once<u32> = Once::new();
    let started = Barrier::new(2);

    let (owner, waiter) = std::thread::scope(|s| {
        let owner = s.spawn(|| {
            let task = runtime.new_task();
            once.resolve(&task, "slow", || {
                started.wait();
                std::thread::sleep(Duration::from_millis(100));
                token.cancel();
                7
            })
        });
        let waiter = s.spawn(|| {
            let task = runtime.new_task();
            started.wait();
            once.resolve(&task, "slow", || 8)
        });
        (owner.join().unwrap(), waiter.join().unwrap())
    });

    assert_eq!(owner, Err(PromiseError::Cancelled));
    assert_eq!(waiter, Err(PromiseError::Cancelled));
    assert_eq!(once.get(), None, "cancelled cells are left empty");
}

#[test]
fn panicking_compute_leaves_cell_unresolved() {
    let runtime = Runtime::new(CancellationToken::new());
    let once: Arc<Once<u32>> = Arc::new(Once::new());

    let cell = Arc::clone(&once);
    let rt = Arc::clone(&runtime);
    let joined = std::thread::spawn(move || {
        let task = rt.new_task();
        cell.resolve(&task, "boom", || panic!("provider exploded"))
    })
    .join();
    assert!(joined.is_err());

    let task = runtime.new_task();
    assert_eq!(once.resolve(&task, "boom", || 1), Err(PromiseError::Unresolved));
}

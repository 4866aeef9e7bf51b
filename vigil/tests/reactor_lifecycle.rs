use vigil::reactor::{self, ReactorBuilder};

use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_concurrent_start_spawns_one_reactor() {
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                reactor::ensure_running().unwrap().thread_id()
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(ids.windows(2).all(|w| w[0] == w[1]), "all callers must see one reactor");
    assert!(reactor::is_running());
    assert_eq!(reactor::current().unwrap().thread_id(), ids[0]);
}

#[test]
fn test_builder_returns_running_reactor() {
    let first = reactor::ensure_running().unwrap().thread_id();
    let second = ReactorBuilder::new()
        .thread_name("ignored-once-running")
        .start()
        .unwrap()
        .thread_id();

    assert_eq!(first, second);
}

#[test]
#[should_panic(expected = "thread_name must not be empty")]
fn test_empty_thread_name_panics() {
    let _ = ReactorBuilder::new().thread_name("");
}

#[test]
fn test_jobs_run_on_reactor_thread() {
    let reactor = reactor::ensure_running().unwrap();
    let (tx, rx) = mpsc::channel();

    let handle = reactor.clone();
    reactor
        .schedule(move || {
            let _ = tx.send((thread::current().id(), handle.is_reactor_thread()));
        })
        .unwrap();

    let (id, on_reactor) = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(id, reactor.thread_id());
    assert!(on_reactor);
    assert!(!reactor.is_reactor_thread());
}

#[test]
fn test_timers_fire_in_deadline_order() {
    let reactor = reactor::ensure_running().unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = mpsc::channel();

    for (label, millis) in [("c", 60), ("a", 20), ("b", 40)] {
        let order = order.clone();
        let tx = tx.clone();
        reactor
            .add_timer(Duration::from_millis(millis), move || {
                order.lock().unwrap().push(label);
                let _ = tx.send(());
            })
            .unwrap();
    }

    for _ in 0..3 {
        rx.recv_timeout(Duration::from_secs(1)).unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn test_timer_waits_at_least_its_duration() {
    let reactor = reactor::ensure_running().unwrap();
    let (tx, rx) = mpsc::channel();

    let start = Instant::now();
    reactor
        .add_timer(Duration::from_millis(50), move || {
            let _ = tx.send(Instant::now());
        })
        .unwrap();

    let fired = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!(
        fired - start >= Duration::from_millis(50),
        "Timer should wait at least the specified duration"
    );
}

#[test]
fn test_huge_timer_is_accepted() {
    let reactor = reactor::ensure_running().unwrap();

    assert!(reactor.add_timer(Duration::MAX, || {}).is_ok());
}

use interlock::Shared;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_n_clones_give_count_n_plus_one() {
    let shared = Shared::new(String::from("payload"));

    let clones: Vec<_> = (0..7).map(|_| shared.clone()).collect();
    assert_eq!(shared.handles(), 8);

    drop(clones);
    assert_eq!(shared.handles(), 1);
}

#[test]
fn test_value_freed_exactly_once_across_threads() {
    let drops = Arc::new(AtomicUsize::new(0));
    let shared = Shared::new(DropCounter(Arc::clone(&drops)));

    // Hand a clone to each thread; every thread touches the value, then
    // releases its handle on exit.
    let (tx, rx) = mpsc::channel();
    let mut workers = vec![];
    for _ in 0..8 {
        let shared = shared.clone();
        let tx = tx.clone();
        workers.push(thread::spawn(move || {
            let guard = shared.lock();
            tx.send(guard.with(|c| c.0.load(Ordering::SeqCst))).unwrap();
        }));
    }

    for _ in 0..8 {
        // No thread may observe the value already dropped
        assert_eq!(rx.recv().unwrap(), 0);
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(drops.load(Ordering::SeqCst), 0);
    drop(shared);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_assign_detaches_from_shared_family() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut a = Shared::new(DropCounter(Arc::clone(&drops)));
    let b = a.clone();

    a.assign(DropCounter(Arc::clone(&drops)));

    // The old family still has b; nothing freed yet
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    assert_eq!(a.handles(), 1);
    assert_eq!(b.handles(), 1);
    assert_ne!(a.id(), b.id());

    drop(b);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    drop(a);
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}

#[test]
fn test_try_unwrap_after_workers_release() {
    let shared = Shared::new(vec![0u32; 4]);

    let mut workers = vec![];
    for i in 0..4 {
        let shared = shared.clone();
        workers.push(thread::spawn(move || {
            shared.lock().with_mut(|v| v[i] = i as u32 + 1);
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    let value = shared.try_unwrap().expect("all clones released");
    assert_eq!(value, vec![1, 2, 3, 4]);
}

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

#[allow(dead_code)]
pub const TEST_DEADLINE: Duration = Duration::from_secs(10);

/// Run `f` on a worker thread and panic if it has not finished within
/// `timeout`. A hang here almost always means a locking protocol
/// deadlocked, so the message says so instead of letting the test
/// runner's own timeout fire.
#[allow(dead_code)]
pub fn with_deadline<F>(timeout: Duration, f: F)
where
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        f();
        let _ = tx.send(());
    });

    match rx.recv_timeout(timeout) {
        Ok(()) => {
            handle.join().expect("test thread panicked after completing");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            // Thread died without reporting success; surface its panic
            match handle.join() {
                Ok(()) => panic!("test thread exited without completing"),
                Err(payload) => std::panic::resume_unwind(payload),
            }
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test did not complete within {timeout:?} (possible deadlock)")
        }
    }
}

use interlock::{Shared, get_current_thread_id, synchronized};
use std::thread;

mod common;
use common::{TEST_DEADLINE, with_deadline};

struct Employee {
    id: String,
    lunch_partners: Vec<String>,
}

impl Employee {
    fn new(id: &str) -> Self {
        Employee {
            id: id.to_string(),
            lunch_partners: Vec::new(),
        }
    }
}

// The demonstration scenario end to end: 16 threads push their id into a
// shared vector, then jointly update three employees' partner lists
// through a multi-lock section guarding two of the three handles.
#[test]
fn test_sixteen_worker_scenario() {
    with_deadline(TEST_DEADLINE, || {
        const WORKERS: usize = 16;

        let ids: Shared<Vec<i64>> = Shared::default();
        let mat = Shared::new(Employee::new("mat"));
        let mel = Shared::new(Employee::new("mel"));
        let bob = Shared::new(Employee::new("bob"));

        let workers: Vec<_> = (0..WORKERS)
            .map(|_| {
                let ids = ids.clone();
                let mat = mat.clone();
                let mel = mel.clone();
                let bob = bob.clone();
                thread::spawn(move || {
                    ids.lock().get_mut().push(get_current_thread_id() as i64);

                    synchronized(&[mel.raw_lock(), bob.raw_lock()], || {
                        let mat_id = mat.lock().with(|m| m.id.clone());
                        let mel_id = mel.lock().with(|m| m.id.clone());
                        let bob_id = bob.lock().with(|b| b.id.clone());

                        mel.lock().get_mut().lunch_partners.push(mat_id);
                        mat.lock().get_mut().lunch_partners.push(bob_id);
                        bob.lock().get_mut().lunch_partners.push(mel_id);
                    });
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        // One entry per worker in the id vector
        let pushed = ids.lock().with(|v| v.clone());
        assert_eq!(pushed.len(), WORKERS);
        let mut unique = pushed.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), WORKERS);

        // Each worker wrote one partner into each list
        assert_eq!(mel.lock().with(|m| m.lunch_partners.len()), WORKERS);
        assert_eq!(mat.lock().with(|m| m.lunch_partners.len()), WORKERS);
        assert_eq!(bob.lock().with(|b| b.lunch_partners.len()), WORKERS);

        assert!(mel.lock().with(|m| m.lunch_partners.iter().all(|p| p == "mat")));
        assert!(mat.lock().with(|m| m.lunch_partners.iter().all(|p| p == "bob")));
        assert!(bob.lock().with(|b| b.lunch_partners.iter().all(|p| p == "mel")));
    });
}

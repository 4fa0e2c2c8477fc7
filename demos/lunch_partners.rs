//! The lunch-partners demonstration: 16 worker threads each record their
//! id in a shared vector, then update three employees' lunch-partner
//! lists inside a multi-lock critical section guarding two of the three.

use interlock::{Shared, get_current_thread_id, synchronized};
use std::thread;

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

fn main() {
    let vec: Shared<Vec<i64>> = Shared::default();
    let mat = Shared::new(Employee::new("mat"));
    let mel = Shared::new(Employee::new("mel"));
    let bob = Shared::new(Employee::new("bob"));

    let workers: Vec<_> = (0..16)
        .map(|_| {
            let vec = vec.clone();
            let mat = mat.clone();
            let mel = mel.clone();
            let bob = bob.clone();
            thread::spawn(move || {
                vec.lock().get_mut().push(get_current_thread_id() as i64);

                synchronized(&[mel.raw_lock(), bob.raw_lock()], || {
                    let mat_id = mat.lock().with(|m| m.id.clone());
                    let mel_id = mel.lock().with(|m| m.id.clone());
                    let bob_id = bob.lock().with(|b| b.id.clone());

                    mel.lock().get_mut().lunch_partners.push(mat_id);
                    // mat is not part of the lock set; its own lock is
                    // only ever taken inside mel+bob critical sections
                    mat.lock().get_mut().lunch_partners.push(bob_id);
                    bob.lock().get_mut().lunch_partners.push(mel_id);
                });
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    println!(
        "{}: {}: {}: {}",
        vec.lock().with(|v| v.len()),
        mel.lock().with(|m| m.lunch_partners.len()),
        mat.lock().with(|m| m.lunch_partners.len()),
        bob.lock().with(|b| b.lunch_partners.len()),
    );
}

use std::error::Error;
use std::sync::{Arc, Barrier};
use std::thread;

use vigil::results::{classify, RobustnessRecord};
use vigil::store::ResultStore;

fn batch(property_id: u32, len: usize) -> Vec<RobustnessRecord> {
    let robustness: Vec<_> = (0..len).map(|i| (i as f64, 3.0 - i as f64)).collect();
    classify(&robustness, property_id, 1)
}

#[test]
fn merge_append_keeps_existing_records() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let store = ResultStore::new(dir.path().join("stl_results.json"));
    let first = batch(0, 5);
    let second = batch(1, 3);

    assert_eq!(store.append(&first)?, 5);
    assert_eq!(store.append(&second)?, 8);

    let stored = store.load()?;

    assert_eq!(&stored[..5], &first[..]);
    assert_eq!(&stored[5..], &second[..]);

    Ok(())
}

#[test]
fn concurrent_writers_lose_nothing() -> Result<(), Box<dyn Error>> {
    const WRITERS: u32 = 8;
    const ROUNDS: usize = 5;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("shared.json");
    let barrier = Arc::new(Barrier::new(WRITERS as usize));

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let store = ResultStore::new(&path);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ROUNDS {
                    store.append(&batch(writer, 2)).expect("append succeeds");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let stored = ResultStore::new(&path).load()?;

    assert_eq!(stored.len(), WRITERS as usize * ROUNDS * 2);
    for writer in 0..WRITERS {
        assert_eq!(stored.iter().filter(|r| r.stl_spec_id == writer).count(), ROUNDS * 2);
    }
    assert!(!dir.path().join("shared.json.lock").exists());

    Ok(())
}

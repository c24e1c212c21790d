//! Registry pointer file must never be observed half-written.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use pinsync_core::Cid;
use pinsync_sync::{FilePublisher, RegistryPublisher};

#[test]
fn concurrent_reader_sees_only_complete_values() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("registry.cid");
    let short = Cid::from("bafyshortshort01");
    let long = Cid::from(format!("bafy{}", "l".repeat(180)));

    let publisher = FilePublisher::new(&path);
    publisher.publish(&short).expect("seed pointer");

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let done = done.clone();
        let (short, long) = (short.clone(), long.clone());
        thread::spawn(move || {
            for round in 0..500 {
                let next = if round % 2 == 0 { &long } else { &short };
                publisher.publish(next).expect("publish");
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let expected = [format!("{short}\n"), format!("{long}\n")];
    let mut reads = 0usize;
    while !done.load(Ordering::SeqCst) || reads == 0 {
        let raw = std::fs::read_to_string(&path).expect("pointer always present");
        assert!(
            expected.contains(&raw),
            "observed partial pointer ({} bytes): {raw:?}",
            raw.len()
        );
        reads += 1;
    }

    writer.join().expect("writer thread");
    assert!(reads > 0);
}

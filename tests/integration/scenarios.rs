//! End-to-end scenarios through the public engine surface

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use vanityhunt::engine::{ResultRecord, ResultSink, SearchCoordinator, SearchEvent};

use super::util::{accept_all_request, conditional_request, fast_config, DeterministicGenerator};

/// Scenario A: accept-all, target 3, single thread, deterministic
/// generator. Exactly three results in generation order, one flushed
/// batch of three, grand total >= 3, run completes.
#[test]
fn accept_all_single_thread_completes() {
    let config = fast_config();
    let mut sink = ResultSink::new(&config);
    let batches: Arc<Mutex<Vec<Vec<ResultRecord>>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = batches.clone();
    sink.set_save_callback(Arc::new(move |records| {
        seen.lock().push(records.to_vec());
        Ok(())
    }));

    let handle = SearchCoordinator::start(
        accept_all_request(3),
        config,
        Arc::new(DeterministicGenerator::new(1)),
        sink,
    );

    let mut matched = Vec::new();
    for event in handle.events().iter() {
        if let SearchEvent::Match { record } = event {
            matched.push(record.address);
        }
    }
    let summary = handle.join().unwrap();

    assert!(summary.completed);
    assert_eq!(summary.matches_found, 3);
    assert!(summary.total_generated >= 3);
    assert_eq!(matched, vec!["1t0", "1t1", "1t2"]);

    let batches = batches.lock();
    assert_eq!(batches.len(), 1, "one force-flushed batch at completion");
    assert_eq!(batches[0].len(), 3);
}

/// Scenario B: accept-none across 4 threads, interrupted after a bounded
/// run. No results, growing totals from all four workers, incomplete
/// outcome, and no durable write because the buffer stayed empty.
#[test]
fn accept_none_interrupt_reports_incomplete() {
    let config = fast_config();
    let mut sink = ResultSink::new(&config);
    let writes = Arc::new(Mutex::new(0usize));
    let seen = writes.clone();
    sink.set_save_callback(Arc::new(move |_| {
        *seen.lock() += 1;
        Ok(())
    }));

    let handle = SearchCoordinator::start(
        conditional_request(1, 4),
        config,
        Arc::new(DeterministicGenerator::new(0)),
        sink,
    );

    std::thread::sleep(Duration::from_millis(120));
    handle.interrupt();

    let mut worker_ids = HashSet::new();
    let mut match_count = 0;
    for event in handle.events().iter() {
        match event {
            SearchEvent::Progress { worker_id, .. } => {
                worker_ids.insert(worker_id);
            }
            SearchEvent::Match { .. } => match_count += 1,
        }
    }
    let summary = handle.join().unwrap();

    assert_eq!(match_count, 0);
    assert!(!summary.completed);
    assert_eq!(summary.matches_found, 0);
    assert!(summary.total_generated > 0);
    assert_eq!(worker_ids.len(), 4, "all four workers reported progress");
    assert_eq!(*writes.lock(), 0, "empty buffer never reaches the disk");
}

/// The accepted set and the persisted set are identical on a normal
/// completion: cardinality equals the target, nothing lost, nothing
/// duplicated, even with several workers racing.
#[test]
fn persisted_set_equals_accepted_set() {
    let config = fast_config();
    let mut sink = ResultSink::new(&config);
    let persisted: Arc<Mutex<Vec<ResultRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = persisted.clone();
    sink.set_save_callback(Arc::new(move |records| {
        seen.lock().extend_from_slice(records);
        Ok(())
    }));

    let handle = SearchCoordinator::start(
        conditional_request(5, 2),
        config,
        Arc::new(DeterministicGenerator::new(3)),
        sink,
    );

    let mut accepted = Vec::new();
    for event in handle.events().iter() {
        if let SearchEvent::Match { record } = event {
            accepted.push(record);
        }
    }
    let summary = handle.join().unwrap();

    assert!(summary.completed);
    assert_eq!(accepted.len(), 5);

    let persisted = persisted.lock();
    assert_eq!(persisted.len(), 5);
    let accepted_set: HashSet<&str> = accepted.iter().map(|r| r.address.as_str()).collect();
    let persisted_set: HashSet<&str> = persisted.iter().map(|r| r.address.as_str()).collect();
    assert_eq!(accepted_set, persisted_set);
    // Persistence order is coordinator acceptance order.
    let accepted_order: Vec<&str> = accepted.iter().map(|r| r.address.as_str()).collect();
    let persisted_order: Vec<&str> = persisted.iter().map(|r| r.address.as_str()).collect();
    assert_eq!(accepted_order, persisted_order);
}

/// Grand totals exposed through progress events never move backwards.
#[test]
fn grand_total_is_monotonic() {
    let config = fast_config();
    let sink = ResultSink::new(&config);

    let handle = SearchCoordinator::start(
        conditional_request(1, 2),
        config,
        Arc::new(DeterministicGenerator::new(0)),
        sink,
    );

    std::thread::sleep(Duration::from_millis(100));
    handle.interrupt();

    let mut last_total = 0;
    for event in handle.events().iter() {
        if let SearchEvent::Progress { total, .. } = event {
            assert!(total >= last_total, "total regressed: {total} < {last_total}");
            last_total = total;
        }
    }
    let summary = handle.join().unwrap();
    assert!(summary.total_generated >= last_total);
}

use std::sync::Arc;
use std::thread;

use chrono::Utc;
use futures::future::join_all;

use turnstile::admission::{AdmissionController, CleanupPolicy, EngineConfig};

fn count_admitted(decisions: impl IntoIterator<Item = bool>) -> (usize, usize) {
    decisions
        .into_iter()
        .fold((0, 0), |(admitted, rejected), ok| {
            if ok {
                (admitted + 1, rejected)
            } else {
                (admitted, rejected + 1)
            }
        })
}

#[test]
fn test_threads_hitting_one_key_admit_exactly_limit() {
    const CALLERS: usize = 400;
    const LIMIT: u64 = 150;

    let controller = Arc::new(AdmissionController::new(
        EngineConfig::new(LIMIT, 3600).unwrap(),
    ));
    let now = Utc::now();

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let controller = controller.clone();
            thread::spawn(move || controller.check_at("shared", now).admitted)
        })
        .collect();

    let (admitted, rejected) = count_admitted(handles.into_iter().map(|h| h.join().unwrap()));

    assert_eq!(admitted, LIMIT as usize);
    assert_eq!(rejected, CALLERS - LIMIT as usize);
    assert_eq!(controller.usage("shared"), CALLERS as u64);
}

#[test]
fn test_fewer_callers_than_limit_are_all_admitted() {
    let controller = Arc::new(AdmissionController::new(
        EngineConfig::new(1000, 3600).unwrap(),
    ));

    let handles: Vec<_> = (0..250)
        .map(|_| {
            let controller = controller.clone();
            thread::spawn(move || controller.check("shared").admitted)
        })
        .collect();

    let (admitted, rejected) = count_admitted(handles.into_iter().map(|h| h.join().unwrap()));

    assert_eq!(admitted, 250);
    assert_eq!(rejected, 0);
    assert_eq!(controller.usage("shared"), 250);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_tasks_across_many_keys_do_not_lose_counts() {
    const KEYS: usize = 20;
    const PER_KEY: usize = 50;

    let config = EngineConfig::new(10, 3600)
        .unwrap()
        .with_cleanup(CleanupPolicy::Lazy);
    let controller = Arc::new(AdmissionController::new(config));

    let tasks = (0..KEYS * PER_KEY).map(|i| {
        let controller = controller.clone();
        tokio::spawn(async move {
            let key = format!("client-{}", i % KEYS);
            (key.clone(), controller.check(&key).admitted)
        })
    });

    let results: Vec<(String, bool)> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    for k in 0..KEYS {
        let key = format!("client-{}", k);
        let (admitted, rejected) =
            count_admitted(results.iter().filter(|(rk, _)| *rk == key).map(|(_, ok)| *ok));
        assert_eq!(admitted, 10, "key {}", key);
        assert_eq!(rejected, PER_KEY - 10, "key {}", key);
        assert_eq!(controller.usage(&key), PER_KEY as u64);
    }

    assert_eq!(controller.stats().active_keys, KEYS);
}

#[test]
fn test_purging_concurrently_with_checks_keeps_counts() {
    let controller = Arc::new(AdmissionController::new(
        EngineConfig::new(500, 3600).unwrap(),
    ));

    let checkers: Vec<_> = (0..8)
        .map(|_| {
            let controller = controller.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    controller.check("shared");
                }
            })
        })
        .collect();
    let purger = {
        let controller = controller.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                controller.purge_now();
                controller.stats();
            }
        })
    };

    for handle in checkers {
        handle.join().unwrap();
    }
    purger.join().unwrap();

    assert_eq!(controller.usage("shared"), 400);
}

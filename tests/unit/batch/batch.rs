use std::sync::atomic::AtomicUsize;

use super::*;

fn paths(n: usize) -> Vec<PathBuf> {
    (0..n).map(|i| PathBuf::from(format!("s{i}.json"))).collect()
}

#[test]
fn sequential_batch_isolates_failures() {
    let never = AtomicBool::new(false);
    let out = run_batch(&paths(3), BatchThreading::default(), &never, |p| {
        if p.ends_with("s1.json") {
            Err(LimboError::decode("corrupt"))
        } else {
            Ok(p.clone())
        }
    })
    .unwrap();
    assert_eq!(out.len(), 3);
    assert!(matches!(out[0].1, Step::Done(_)));
    assert!(matches!(out[1].1, Step::Failed(LimboError::Decode(_))));
    assert!(matches!(out[2].1, Step::Done(_)));
}

#[test]
fn interrupt_stops_before_the_next_sample() {
    let flag = AtomicBool::new(false);
    let seen = AtomicUsize::new(0);
    let out = run_batch(&paths(5), BatchThreading::default(), &flag, |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 1 {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(())
    })
    .unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(out.len(), 3);
    assert!(matches!(out[2].1, Step::Interrupted));
}

#[test]
fn parallel_batch_keeps_input_order() {
    let never = AtomicBool::new(false);
    let threading = BatchThreading {
        parallel: true,
        threads: Some(2),
    };
    let out = run_batch(&paths(16), threading, &never, |p| Ok(p.clone())).unwrap();
    let done = out
        .into_iter()
        .map(|(p, step)| match step {
            Step::Done(v) => {
                assert_eq!(p, v);
                v
            }
            other => panic!("unexpected {other:?}"),
        })
        .collect::<Vec<_>>();
    assert_eq!(done, paths(16));
}

#[test]
fn zero_threads_is_rejected() {
    let never = AtomicBool::new(false);
    let threading = BatchThreading {
        parallel: true,
        threads: Some(0),
    };
    let err = run_batch(&paths(1), threading, &never, |_| Ok(())).unwrap_err();
    assert!(matches!(err, LimboError::Validation(_)));
}

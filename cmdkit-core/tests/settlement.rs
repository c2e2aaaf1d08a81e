use cmdkit_core::{Deferred, EventChannel};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

#[test]
fn concurrent_settlers_produce_single_outcome() {
    let deferred: Deferred<String> = Deferred::new();
    let channel: Arc<EventChannel<Result<(), String>>> = Arc::new(EventChannel::new());
    let events = Arc::new(AtomicUsize::new(0));
    {
        let events = events.clone();
        channel.listen(move |_| {
            events.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        // 落定时向通道广播一次结果
        let channel = channel.clone();
        deferred.on_settled(move |outcome| channel.trigger(outcome));
    }

    let barrier = Arc::new(Barrier::new(8));
    let threads: Vec<_> = (0..8)
        .map(|i| {
            let deferred = deferred.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                if i % 2 == 0 {
                    deferred.resolve()
                } else {
                    deferred.reject(format!("settler-{i}"))
                }
            })
        })
        .collect();

    let winners = threads
        .into_iter()
        .map(|t| t.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(events.load(Ordering::SeqCst), 1);
    assert!(deferred.is_settled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn many_waiters_observe_the_same_rejection() -> anyhow::Result<()> {
    let deferred: Deferred<String> = Deferred::new();

    let mut waiters = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let deferred = deferred.clone();
        waiters.spawn(async move { deferred.settled().await });
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    deferred.reject("fatal".into());
    deferred.resolve();

    while let Some(res) = waiters.join_next().await {
        assert_eq!(res?, Err("fatal".to_string()));
    }
    Ok(())
}

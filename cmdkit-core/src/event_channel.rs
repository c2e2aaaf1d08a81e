//! 事件通道（EventChannel）
//!
//! 每个命令实例持有一个事件通道，用于向零个或多个订阅者广播事件：
//! - `listen`：注册同步监听器，`trigger` 时按注册顺序在触发线程上调用；
//! - `subscribe`：返回 `'static` 生命周期的事件流，便于在 `tokio::spawn` 中消费；
//! - `trigger`：即发即弃，不阻塞；无订阅者时广播被忽略。
//!
use crate::error::EventError;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

const DEFAULT_CAPACITY: usize = 16;

pub struct EventChannel<E> {
    listeners: Mutex<Vec<Listener<E>>>,
    tx: broadcast::Sender<E>,
}

impl<E> Default for EventChannel<E>
where
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventChannel<E>
where
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` 为异步订阅者的广播缓冲区容量
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            listeners: Mutex::new(Vec::new()),
            tx,
        }
    }

    pub fn listen<F>(&self, f: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.lock().push(Arc::new(f));
    }

    pub fn subscribe(&self) -> BoxStream<'static, Result<E, EventError>> {
        let stream = BroadcastStream::new(self.tx.subscribe()).map(|r| {
            r.map_err(|e| match e {
                tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n) => {
                    EventError::Lagged(n)
                }
            })
        });
        Box::pin(stream)
    }

    pub fn trigger(&self, event: E) {
        // 复制一份监听器列表，允许监听器在回调中继续 listen
        let listeners: Vec<Listener<E>> = self.lock().clone();
        for listener in &listeners {
            listener(&event);
        }

        // 若当前无订阅者，broadcast 的 send 会返回错误，这里视为非致命并忽略
        let _ = self.tx.send(event);
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len() + self.tx.receiver_count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Listener<E>>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn listeners_run_in_registration_order() {
        let channel: EventChannel<u32> = EventChannel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = seen.clone();
            channel.listen(move |v: &u32| {
                seen.lock().unwrap().push(format!("{tag}{v}"));
            });
        }

        channel.trigger(1);
        channel.trigger(2);

        assert_eq!(*seen.lock().unwrap(), vec!["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn trigger_without_subscribers_is_ignored() {
        let channel: EventChannel<&'static str> = EventChannel::new();
        assert_eq!(channel.listener_count(), 0);
        channel.trigger("nobody listens");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stream_subscribers_receive_events() {
        let channel: EventChannel<u32> = EventChannel::new();
        let mut stream = channel.subscribe();
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let counter = counter.clone();
            channel.listen(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(channel.listener_count(), 2);

        channel.trigger(7);

        let got = stream.next().await.expect("stream open").expect("no lag");
        assert_eq!(got, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_subscriber_reports_lag() {
        let channel: EventChannel<u32> = EventChannel::with_capacity(1);
        let mut stream = channel.subscribe();

        channel.trigger(1);
        channel.trigger(2);

        match stream.next().await {
            Some(Err(EventError::Lagged(n))) => assert_eq!(n, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }
}

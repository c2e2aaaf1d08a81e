//! 延迟结果（Deferred）
//!
//! 一次性的待定结果原语：
//! - `resolve` / `reject`：仅第一次调用生效，后续调用为无操作并返回 `false`；
//! - `then` / `on_settled`：注册续体，在结果落定时于落定线程上恰好调用一次，
//!   若已落定则立即调用；某个续体 panic 不影响其余续体，
//!   全部续体执行完毕后再将首个 panic 重新抛给落定方；
//! - `settled`：异步等待结果落定（基于 `Notify`，不轮询）。
//!
//! 克隆的 `Deferred` 共享同一状态，可分别交给生产方与消费方。
//!
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

type Continuation<E> = Box<dyn FnOnce(Result<(), E>) + Send + 'static>;

enum State<E> {
    Pending(Vec<Continuation<E>>),
    Settled(Result<(), E>),
}

struct Inner<E> {
    state: Mutex<State<E>>,
    notify: Notify,
}

pub struct Deferred<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for Deferred<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> std::fmt::Debug for Deferred<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

impl<E> Default for Deferred<E>
where
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Deferred<E>
where
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Pending(Vec::new())),
                notify: Notify::new(),
            }),
        }
    }

    /// 以成功落定；返回本次调用是否真正落定了结果
    pub fn resolve(&self) -> bool {
        self.settle(Ok(()))
    }

    /// 以失败落定；已落定时为无操作
    pub fn reject(&self, err: E) -> bool {
        self.settle(Err(err))
    }

    pub fn is_settled(&self) -> bool {
        matches!(&*self.lock(), State::Settled(_))
    }

    /// 非阻塞查看当前结果
    pub fn outcome(&self) -> Option<Result<(), E>> {
        match &*self.lock() {
            State::Settled(outcome) => Some(outcome.clone()),
            State::Pending(_) => None,
        }
    }

    /// 分别注册成功与失败续体
    pub fn then<S, F>(&self, on_resolved: S, on_rejected: F)
    where
        S: FnOnce() + Send + 'static,
        F: FnOnce(E) + Send + 'static,
    {
        self.on_settled(move |outcome| match outcome {
            Ok(()) => on_resolved(),
            Err(err) => on_rejected(err),
        });
    }

    /// 注册一个接收完整结果的续体
    pub fn on_settled<F>(&self, f: F)
    where
        F: FnOnce(Result<(), E>) + Send + 'static,
    {
        let outcome = {
            let mut state = self.lock();
            match &mut *state {
                State::Pending(continuations) => {
                    continuations.push(Box::new(f));
                    return;
                }
                State::Settled(outcome) => outcome.clone(),
            }
        };
        f(outcome);
    }

    /// 等待结果落定
    pub async fn settled(&self) -> Result<(), E> {
        loop {
            // 先创建 Notified 再检查状态，保证不会错过 notify_waiters
            let notified = self.inner.notify.notified();
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            notified.await;
        }
    }

    fn settle(&self, outcome: Result<(), E>) -> bool {
        let continuations = {
            let mut state = self.lock();
            match &mut *state {
                State::Settled(_) => return false,
                State::Pending(continuations) => {
                    let continuations = std::mem::take(continuations);
                    *state = State::Settled(outcome.clone());
                    continuations
                }
            }
        };

        // 先唤醒等待方，续体 panic 也不会使其悬挂
        self.inner.notify.notify_waiters();

        // 续体在锁外执行，允许其再次访问本 Deferred
        let mut first_panic = None;
        for f in continuations {
            let outcome = outcome.clone();
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || f(outcome))) {
                first_panic.get_or_insert(payload);
            }
        }
        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, State<E>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn first_settlement_wins() {
        let d: Deferred<String> = Deferred::new();
        assert!(d.reject("boom".into()));
        assert!(!d.resolve());
        assert!(!d.reject("again".into()));
        assert_eq!(d.outcome(), Some(Err("boom".to_string())));
    }

    #[test]
    fn continuations_run_exactly_once() {
        let d: Deferred<String> = Deferred::new();
        let ok = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        {
            let ok = ok.clone();
            let failed = failed.clone();
            d.then(
                move || {
                    ok.fetch_add(1, Ordering::SeqCst);
                },
                move |_| {
                    failed.fetch_add(1, Ordering::SeqCst);
                },
            );
        }

        d.resolve();
        d.reject("late".into());

        assert_eq!(ok.load(Ordering::SeqCst), 1);
        assert_eq!(failed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn continuation_registered_after_settlement_runs_immediately() {
        let d: Deferred<String> = Deferred::new();
        d.reject("gone".into());

        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        d.on_settled(move |outcome| {
            *sink.lock().unwrap() = Some(outcome);
        });

        assert_eq!(*seen.lock().unwrap(), Some(Err("gone".to_string())));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_continuation_does_not_strand_others() {
        let d: Deferred<String> = Deferred::new();
        let ran = Arc::new(AtomicUsize::new(0));

        d.then(|| panic!("continuation blew up"), |_| {});
        {
            let ran = ran.clone();
            d.then(
                move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                },
                |_| {},
            );
        }

        let waiter = {
            let d = d.clone();
            tokio::spawn(async move { d.settled().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let producer = d.clone();
        let settled = std::thread::spawn(move || producer.resolve()).join();
        assert!(settled.is_err(), "first panic is re-raised to the settler");

        let outcome = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert_eq!(outcome, Ok(()));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(!d.resolve());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn settled_wakes_async_waiter() {
        let d: Deferred<String> = Deferred::new();
        let producer = d.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.resolve();
        });

        let outcome = tokio::time::timeout(Duration::from_secs(2), d.settled())
            .await
            .expect("deferred should settle");
        assert_eq!(outcome, Ok(()));
        assert!(d.is_settled());
    }
}

//! 落定闩（SettleLatch）
//!
//! 每次分发独占一个实例，保证“落定动作”至多执行一次：
//! - 首次 `enter` 在锁内将状态置为已落定并执行动作；
//! - 之后的 `enter` 直接返回 `AlreadySettled`，不执行动作；
//! - 动作中的 panic 被捕获并转换为错误，锁总会被释放。
//!
use crate::error::{CommandError, CommandResult};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

/// 动作在持锁期间执行，须保持短小且不可阻塞
#[derive(Debug, Default)]
pub(crate) struct SettleLatch {
    settled: Mutex<bool>,
}

impl SettleLatch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter<F>(&self, action: F) -> CommandResult<()>
    where
        F: FnOnce() -> CommandResult<()>,
    {
        let mut settled = self.settled.lock().unwrap_or_else(PoisonError::into_inner);
        if *settled {
            return Err(CommandError::AlreadySettled);
        }
        *settled = true;

        panic::catch_unwind(AssertUnwindSafe(action))
            .unwrap_or_else(|payload| Err(CommandError::from_panic(payload)))
    }

    #[cfg(test)]
    pub(crate) fn is_settled(&self) -> bool {
        *self.settled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

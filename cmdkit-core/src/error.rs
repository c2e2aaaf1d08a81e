//! 基础构件统一错误定义
//!
//! 仅覆盖依赖注册表与事件通道两类协作方的最小必要错误，
//! 上层（命令分发）可通过 `#[from]` 将其并入自身的错误类型。
//!
use thiserror::Error;

/// 依赖注册表错误
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unbound dependency: {type_name}")]
    Unbound { type_name: &'static str },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("factory failed: type={type_name}, reason={reason}")]
    Factory {
        type_name: &'static str,
        reason: String,
    },
}

/// 事件通道错误
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// 订阅者消费过慢，广播缓冲区覆盖了 `n` 条事件
    #[error("event subscriber lagged: skipped={0}")]
    Lagged(u64),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

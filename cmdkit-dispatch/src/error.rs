use cmdkit_core::error::RegistryError;
use std::any::Any;
use std::time::Duration;

/// 错误大类：用于在不关心具体变体时做粗粒度匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 无法找到可执行的处理器（空命令或未注册）
    NoHandler,
    /// 处理器或分发过程异常（空处理器、重复落定、超时、panic 等）
    BadHandler,
    /// 依赖绑定失败
    Binding,
    /// 处理器自身返回的业务错误
    Handler,
}

#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("no command handler for nil")]
    NilCommand,

    #[error("no command handler found for type: {command}")]
    NoHandler { command: &'static str },

    #[error("nil is not a valid command handler")]
    NilHandler,

    #[error("unable to lock command for update: already settled")]
    AlreadySettled,

    #[error("timeout after {} ms running command {command}", .after.as_millis())]
    Timeout {
        command: &'static str,
        after: Duration,
    },

    #[error("unknown failure to execute task: {message}")]
    Panicked { message: String },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("no tokio runtime available to drive commands")]
    NoRuntime,

    #[error("binding: {0}")]
    Binding(#[from] RegistryError),

    #[error("validation: {0}")]
    Validation(String),

    #[error("authorization: {0}")]
    Authorization(String),

    #[error("infra: {0}")]
    Infra(String),

    #[error("handler failed: handler={handler}, reason={reason}")]
    Handler {
        handler: &'static str,
        reason: String,
    },
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NilCommand | Self::NoHandler { .. } => ErrorKind::NoHandler,
            Self::NilHandler
            | Self::AlreadySettled
            | Self::Timeout { .. }
            | Self::Panicked { .. }
            | Self::TypeMismatch { .. }
            | Self::NoRuntime => ErrorKind::BadHandler,
            Self::Binding(_) => ErrorKind::Binding,
            Self::Validation(_)
            | Self::Authorization(_)
            | Self::Infra(_)
            | Self::Handler { .. } => ErrorKind::Handler,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// 将 panic 负载转换为错误：
    /// 负载本身是 `CommandError` 时原样返回，字符串负载包装为 `Panicked`。
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<CommandError>() {
            Ok(err) => return *err,
            Err(other) => other,
        };

        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };

        Self::Panicked { message }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

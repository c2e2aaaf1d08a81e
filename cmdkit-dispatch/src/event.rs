use crate::command::Command;
use crate::error::CommandError;
use std::fmt;
use std::sync::Arc;

/// 命令执行结束事件
///
/// 在命令自身的事件通道上恰好触发一次：成功时 `error` 为空，
/// 失败（处理器错误或超时）时携带对应错误。
pub struct CommandCompleted<C> {
    command: Arc<C>,
    error: Option<CommandError>,
}

impl<C: Command> CommandCompleted<C> {
    pub(crate) fn new(command: Arc<C>, error: Option<CommandError>) -> Self {
        Self { command, error }
    }

    pub fn command(&self) -> &Arc<C> {
        &self.command
    }

    pub fn error(&self) -> Option<&CommandError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn command_name(&self) -> &'static str {
        C::NAME
    }
}

impl<C> Clone for CommandCompleted<C> {
    fn clone(&self) -> Self {
        Self {
            command: self.command.clone(),
            error: self.error.clone(),
        }
    }
}

impl<C: Command> fmt::Debug for CommandCompleted<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCompleted")
            .field("command", &C::NAME)
            .field("error", &self.error)
            .finish()
    }
}

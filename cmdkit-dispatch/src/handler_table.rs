//! 处理器表
//!
//! 以命令的 `NAME` 为键保存类型擦除后的处理器，注册期写入、分发期并发读取。
//! 条目只会被整体替换，从不原地修改。
//!
use crate::command::Command;
use crate::command_handler::CommandHandler;
use crate::error::{CommandError, CommandResult};
use dashmap::DashMap;
use std::any::{Any, type_name};
use std::sync::Arc;

pub(crate) type DynHandler<C> = Arc<dyn CommandHandler<Command = C>>;

struct Entry {
    command_type: &'static str,
    // 实际类型为 DynHandler<C>，C 与 command_type 对应
    handler: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub(crate) struct HandlerTable {
    handlers: DashMap<&'static str, Entry>,
}

impl HandlerTable {
    /// 插入或覆盖，返回是否替换了旧处理器
    pub(crate) fn insert<H>(&self, handler: H) -> bool
    where
        H: CommandHandler,
    {
        let handler: DynHandler<H::Command> = Arc::new(handler);
        let entry = Entry {
            command_type: type_name::<H::Command>(),
            handler: Arc::new(handler),
        };
        self.handlers
            .insert(<H::Command as Command>::NAME, entry)
            .is_some()
    }

    pub(crate) fn get<C: Command>(&self) -> CommandResult<DynHandler<C>> {
        let entry = self
            .handlers
            .get(C::NAME)
            .ok_or(CommandError::NoHandler { command: C::NAME })?;

        // 两个命令类型共用同一 NAME 时会走到这里
        entry
            .handler
            .downcast_ref::<DynHandler<C>>()
            .cloned()
            .ok_or(CommandError::TypeMismatch {
                expected: type_name::<C>(),
                found: entry.command_type,
            })
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub(crate) fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.iter().map(|e| *e.key()).collect();
        names.sort_unstable();
        names
    }
}

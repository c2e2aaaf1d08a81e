//! 命令分发引擎（cmdkit-dispatch）
//!
//! 以命令类型的稳定名称路由到唯一的处理器，执行前后调用命令的可选钩子，
//! 并在处理器结果与超时计时器之间竞争，保证结果恰好落定一次。
//!
pub mod command;
pub mod command_bus;
pub mod command_handler;
pub mod config;
pub mod error;
pub mod event;
pub mod inmemory_command_bus;

mod handler_table;
mod latch;

pub use command::{Command, TimeoutPolicy};
pub use command_bus::CommandBus;
pub use command_handler::CommandHandler;
pub use error::{CommandError, CommandResult, ErrorKind};
pub use event::CommandCompleted;
pub use inmemory_command_bus::InMemoryCommandBus;

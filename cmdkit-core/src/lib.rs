//! 命令分发基础构件（cmdkit-core）
//!
//! 提供命令分发引擎所依赖的协作方原语：
//! - 延迟结果（`deferred`）：一次性落定的待定结果，支持续体与异步等待；
//! - 事件通道（`event_channel`）：每个命令持有的即发即弃广播通道；
//! - 依赖注册表（`registry`）：命令处理器注册时的依赖解析；
//! - 错误（`error`）：上述构件的最小错误集合。
//!
//! 本 crate 不关心命令如何路由与执行，仅定义上层可组合的窄接口。
//!
pub mod deferred;
pub mod error;
pub mod event_channel;
pub mod registry;

pub use deferred::Deferred;
pub use event_channel::EventChannel;
pub use registry::{Registry, RegistryExt, ServiceRegistry};

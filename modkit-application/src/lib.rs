//! 应用层基础库（modkit-application）
//!
//! 提供模块化应用的命令/查询/事件调度能力：
//! - 命令总线（`command_bus` / `inmemory_command_bus`）：同步分发、
//!   异步分发与失败命令的有界重试；
//! - 查询总线（`query_bus` / `inmemory_query_bus`）：同步问答式调度；
//! - 日志接口（`logger`）：注入式日志能力，默认由 tracing 实现；
//! - 事件发布协议（`event_bus`）与通用代理消费者（`consumer`）。
//!
//! 总线只依赖名称到处理器的注册表与日志接口，不依赖任何传输实现；
//! 周边的 Kernel/HTTP 层通过构造注入的方式组合使用。
//!
pub mod command;
pub mod command_bus;
pub mod command_handler;
pub mod consumer;
pub mod context;
pub mod dto;
pub mod error;
pub mod event_bus;
pub mod inmemory_command_bus;
pub mod inmemory_query_bus;
pub mod logger;
pub mod query;
pub mod query_bus;
pub mod query_handler;

mod panic;

pub use inmemory_command_bus::{BusHandle, CommandBusConfig, InMemoryCommandBus};
pub use inmemory_query_bus::InMemoryQueryBus;
pub use logger::{Logger, NoopLogger, TracingLogger};

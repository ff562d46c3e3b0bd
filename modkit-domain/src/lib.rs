//! 领域层基础库（modkit-domain）
//!
//! 提供模块化应用所需的领域层最小抽象：
//! - 领域事件（`domain_event`）与业务上下文（`business_context`）
//! - 聚合根与事件记录器（`aggregate`）
//! - 消息代理协议（`broker`）与事件处理器（`event_handler`）
//!
//! 本 crate 只定义协议与最小必要的错误类型，不绑定任何传输或存储实现；
//! NATS、Redis Streams 等适配器在基础设施层按这些协议实现。
//!
pub mod aggregate;
pub mod broker;
pub mod business_context;
pub mod domain_event;
pub mod error;
pub mod event_handler;

pub use aggregate::{AggregateRoot, EventRecorder};
pub use broker::Broker;
pub use business_context::BusinessContext;
pub use domain_event::DomainEvent;
pub use error::{DomainError, DomainResult};
pub use event_handler::EventHandler;

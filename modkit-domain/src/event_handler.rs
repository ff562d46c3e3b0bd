//! 事件处理器（EventHandler）
//!
//! 定义消费某一类型领域事件的处理逻辑与元信息（名称用于失败标记与审计）。
//!
use crate::domain_event::DomainEvent;
use crate::error::DomainResult;
use async_trait::async_trait;

/// 事件处理器：处理某一类型的事件
#[async_trait]
pub trait EventHandler<E: DomainEvent>: Send + Sync {
    /// 处理器名称（用于失败标记与审计）
    fn handler_name(&self) -> &str;

    /// 处理事件
    async fn handle(&self, event: &E) -> DomainResult<()>;
}

//! 事件发布协议（EventBus）
//!
//! 应用层向外发布领域事件的统一抽象；NATS、Redis Streams 等
//! 适配器在基础设施层实现本协议。
//!
use crate::{context::AppContext, error::AppError};
use async_trait::async_trait;
use modkit_domain::DomainEvent;

/// 事件总线：发布领域事件
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, ctx: &AppContext, event: &dyn DomainEvent) -> Result<(), AppError>;
}

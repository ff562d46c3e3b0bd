//! 消息代理协议（Broker）
//!
//! 定义从消息系统拉取原始消息的最小接口；NATS、Redis Streams 等
//! 适配器在基础设施层实现本协议，消费端只依赖该抽象。
//!
use crate::error::DomainResult;
use async_trait::async_trait;

/// 消息代理：按拉取模式获取原始消息字节
#[async_trait]
pub trait Broker: Send + Sync {
    /// 拉取下一条消息（无消息时由实现决定阻塞或返回错误）
    async fn fetch_message(&self) -> DomainResult<Vec<u8>>;

    /// 关闭底层连接
    async fn close(&self) -> DomainResult<()>;
}

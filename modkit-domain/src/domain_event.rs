//! 领域事件（DomainEvent）
//!
//! 定义事件对外暴露的通用元信息：事件名、聚合标识、发生时间、
//! 版本与关联 ID。载荷以 `serde_json::Value` 表达，便于在总线与
//! 代理之间以 JSON 传输；经由代理消费的事件类型另行实现
//! `serde::de::DeserializeOwned`。
//!
use chrono::{DateTime, Utc};
use std::fmt;

/// 领域事件：描述聚合内已发生的事实
pub trait DomainEvent: fmt::Debug + Send + Sync {
    /// 事件所属聚合的标识
    fn aggregate_id(&self) -> &str;

    /// 事件发生时间
    fn occurred_on(&self) -> DateTime<Utc>;

    /// 事件名称（形如 `user.created`，跨进程保持稳定）
    fn event_name(&self) -> &str;

    /// 事件载荷（序列化友好，面向总线/代理传输）
    fn payload(&self) -> serde_json::Value;

    /// 事件载荷版本（用于消费端的版本兼容）
    fn version(&self) -> usize;

    /// 关联 ID（链路追踪）
    fn correlation_id(&self) -> &str;
}

//! 聚合根（AggregateRoot）与事件记录器（EventRecorder）
//!
//! 聚合在处理命令时把产生的领域事件记录在自身，随后由应用层
//! 一次性取出并发布；`pull_domain_events` 取出后即清空，避免重复发布。
//!
use crate::domain_event::DomainEvent;

/// 聚合根：具备标识与领域事件收集能力
pub trait AggregateRoot: Send + Sync {
    /// 聚合唯一标识
    fn id(&self) -> &str;

    /// 记录一条领域事件
    fn record(&mut self, event: Box<dyn DomainEvent>);

    /// 取出并清空已记录的领域事件
    fn pull_domain_events(&mut self) -> Vec<Box<dyn DomainEvent>>;
}

/// 事件记录器：聚合内嵌的默认事件存储
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Vec<Box<dyn DomainEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条领域事件
    pub fn record(&mut self, event: Box<dyn DomainEvent>) {
        self.events.push(event);
    }

    /// 取出并清空全部已记录事件
    pub fn pull(&mut self) -> Vec<Box<dyn DomainEvent>> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

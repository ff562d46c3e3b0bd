use crate::{command::Command, context::AppContext, error::AppError};
use async_trait::async_trait;

/// 命令总线（Command Bus）
///
/// - 负责根据命令的身份名称路由到对应的处理器；
/// - 同步分发阻塞等待处理结果，异步分发在处理器解析成功后立即返回；
/// - 框架可提供不同实现（如进程内、消息队列等）；
/// - 该 trait 带有泛型方法，通常以具体实现类型注入使用。
#[async_trait]
pub trait CommandBus: Send + Sync {
    /// 同步分发命令到对应处理器，调用方观察到执行完成后才返回
    ///
    /// - `ctx`：应用上下文（链路追踪、幂等键等）
    /// - `cmd`：具体命令实例
    async fn dispatch<C>(&self, ctx: &AppContext, cmd: C) -> Result<(), AppError>
    where
        C: Command;

    /// 异步分发命令：处理器解析成功后立即返回，执行结果对调用方不可见
    ///
    /// 执行失败只会通过日志与有界重试路径体现；队列满时快速失败，
    /// 不会无限阻塞调用方。
    async fn dispatch_async<C>(&self, ctx: &AppContext, cmd: C) -> Result<(), AppError>
    where
        C: Command;
}

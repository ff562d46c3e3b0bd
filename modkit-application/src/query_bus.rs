use crate::{context::AppContext, error::AppError, query::Query};
use async_trait::async_trait;

/// 查询总线（Query Bus）
///
/// - 负责根据查询的身份名称路由到对应的处理器；
/// - 同步应答：调用方阻塞等待处理结果，结果与错误原样返回；
/// - 失败不产生日志副作用，由调用方自行处理。
#[async_trait]
pub trait QueryBus: Send + Sync {
    /// 分发查询到对应处理器，返回该查询声明的 DTO
    async fn ask<Q>(&self, ctx: &AppContext, q: Q) -> Result<Q::Dto, AppError>
    where
        Q: Query;
}

//! 基于内存的查询总线实现
//!
//! - 注册表：以查询的稳定名称为键，值为类型擦除后的处理器闭包；
//! - 调度：同步问答，结果跨擦除边界装箱并在调用端还原；
//! - 查询假定无副作用，失败直接外抛，无重试与日志副作用。
//!
use crate::{
    context::AppContext, error::AppError, query::Query, query_bus::QueryBus,
    query_handler::QueryHandler,
};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::any::{Any, type_name};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type BoxAnySend = Box<dyn Any + Send>;

type QueryHandlerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<BoxAnySend, AppError>> + Send + 'a>>;

type QueryHandlerFn =
    Arc<dyn for<'a> Fn(BoxAnySend, &'a AppContext) -> QueryHandlerFuture<'a> + Send + Sync>;

/// 基于内存的 QueryBus 实现
pub struct InMemoryQueryBus {
    handlers: DashMap<&'static str, QueryHandlerFn>,
}

impl Default for InMemoryQueryBus {
    fn default() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }
}

impl InMemoryQueryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册查询处理器
    ///
    /// 同名查询重复注册返回 `AlreadyRegistered`，首次绑定保持不变；
    /// 空白名称返回 `NotValid`。
    pub fn register<Q, H>(&self, handler: Arc<H>) -> Result<(), AppError>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let name = Q::NAME;
        if name.trim().is_empty() {
            return Err(AppError::NotValid {
                reason: format!("query name must not be blank: {}", type_name::<Q>()),
            });
        }

        let f: QueryHandlerFn = {
            let handler = handler.clone();

            Arc::new(move |boxed_q, ctx| {
                let handler = handler.clone();

                Box::pin(async move {
                    match boxed_q.downcast::<Q>() {
                        Ok(q) => {
                            let dto = handler.handle(ctx, *q).await?;
                            Ok(Box::new(dto) as BoxAnySend)
                        }
                        Err(_) => Err(AppError::TypeMismatch {
                            expected: Q::NAME,
                            found: "unknown",
                        }),
                    }
                })
            })
        };

        match self.handlers.entry(name) {
            Entry::Occupied(_) => Err(AppError::AlreadyRegistered { name }),
            Entry::Vacant(v) => {
                v.insert(f);
                Ok(())
            }
        }
    }

    /// 获取已注册的查询名称列表（只读视图）
    pub fn registered_queries(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|e| *e.key()).collect()
    }
}

#[async_trait]
impl QueryBus for InMemoryQueryBus {
    async fn ask<Q: Query>(&self, ctx: &AppContext, q: Q) -> Result<Q::Dto, AppError> {
        let Some(f) = self.handlers.get(Q::NAME).map(|h| h.clone()) else {
            return Err(AppError::NotRegistered { name: Q::NAME });
        };

        let out = (f)(Box::new(q), ctx).await?;

        match out.downcast::<Q::Dto>() {
            Ok(dto) => Ok(*dto),
            Err(_) => Err(AppError::TypeMismatch {
                expected: type_name::<Q::Dto>(),
                found: "unknown",
            }),
        }
    }
}

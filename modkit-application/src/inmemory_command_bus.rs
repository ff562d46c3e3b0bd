//! 基于内存的命令总线实现
//!
//! - 注册表：以命令的稳定名称为键，值为类型擦除后的处理器闭包；
//! - 同步分发：调用方阻塞等待处理器执行完成，错误原样返回；
//! - 异步分发：任务进入有界队列，由固定数量的 worker 执行；
//!   队列满时快速失败，绝不无限阻塞调用方；
//! - 失败恢复：异步执行失败的命令进入有界失败队列，由单一恢复循环
//!   做至多一次的自动重试，重试仍失败仅记录告警。
//!
use crate::{
    command::Command, command_bus::CommandBus, command_handler::CommandHandler,
    context::AppContext, error::AppError, logger::Logger, panic::panic_message,
};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 失败命令的丢弃阈值：attempts 达到该值后不再重试
const MAX_ATTEMPTS: usize = 3;

type BoxedCommand = Arc<dyn Any + Send + Sync>;

type CmdHandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>>;

type CmdHandlerFn =
    Arc<dyn for<'a> Fn(BoxedCommand, &'a AppContext) -> CmdHandlerFuture<'a> + Send + Sync>;

/// 异步分发的执行任务
struct AsyncCommand {
    name: &'static str,
    command: BoxedCommand,
    handler: CmdHandlerFn,
    ctx: AppContext,
}

/// 失败命令记录：原始命令值、绑定的处理器与重试计数
struct FailedCommand {
    name: &'static str,
    command: BoxedCommand,
    handler: CmdHandlerFn,
    ctx: AppContext,
    attempts: usize,
}

/// 命令总线配置
#[derive(Clone, Copy, Debug)]
pub struct CommandBusConfig {
    /// 异步执行的 worker 数量
    pub workers: usize,
    /// 异步任务队列容量（满则 `dispatch_async` 以 `QueueFull` 快速失败）
    pub queue_capacity: usize,
    /// 失败队列容量（满则丢弃并记录错误日志）
    pub retry_queue_capacity: usize,
}

impl Default for CommandBusConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
            retry_queue_capacity: 256,
        }
    }
}

/// 基于内存的 CommandBus 实现
pub struct InMemoryCommandBus {
    handlers: DashMap<&'static str, CmdHandlerFn>,
    jobs_tx: mpsc::Sender<AsyncCommand>,
    jobs_rx: Arc<Mutex<mpsc::Receiver<AsyncCommand>>>,
    failed_tx: mpsc::Sender<FailedCommand>,
    // 恢复循环独占的接收端，首次 process_failed 时取走
    failed_rx: Mutex<Option<mpsc::Receiver<FailedCommand>>>,
    logger: Arc<dyn Logger>,
    config: CommandBusConfig,
}

impl InMemoryCommandBus {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self::with_config(logger, CommandBusConfig::default())
    }

    pub fn with_config(logger: Arc<dyn Logger>, config: CommandBusConfig) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (failed_tx, failed_rx) = mpsc::channel(config.retry_queue_capacity.max(1));

        Self {
            handlers: DashMap::new(),
            jobs_tx,
            jobs_rx: Arc::new(Mutex::new(jobs_rx)),
            failed_tx,
            failed_rx: Mutex::new(Some(failed_rx)),
            logger,
            config,
        }
    }

    /// 注册命令处理器
    ///
    /// - 同名命令重复注册返回 `AlreadyRegistered`，首次绑定保持不变；
    /// - 空白名称返回 `NotValid`；
    /// - 检查与写入经由注册表的 entry 原子完成，并发注册只有一个成功。
    pub fn register<C, H>(&self, handler: Arc<H>) -> Result<(), AppError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let name = C::NAME;
        if name.trim().is_empty() {
            return Err(AppError::NotValid {
                reason: format!("command name must not be blank: {}", std::any::type_name::<C>()),
            });
        }

        let f: CmdHandlerFn = {
            let handler = handler.clone();

            Arc::new(move |boxed_cmd, ctx| {
                let handler = handler.clone();

                Box::pin(async move {
                    // 正常情况下这里的 downcast 永远不会失败（键与闭包同一泛型 C）
                    match boxed_cmd.downcast::<C>() {
                        Ok(cmd) => handler.handle(ctx, (*cmd).clone()).await,
                        Err(_) => Err(AppError::TypeMismatch {
                            expected: C::NAME,
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

    /// 启动异步执行 worker 与失败恢复循环，返回可关闭/等待的句柄
    ///
    /// 每个总线实例预期只启动一次；关闭时先停止异步分发再取消句柄。
    pub fn start(self: Arc<Self>) -> BusHandle {
        let token = CancellationToken::new();
        let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(self.config.workers + 1);

        for _ in 0..self.config.workers {
            let bus = self.clone();
            let token = token.clone();
            tasks.push(tokio::spawn(async move { bus.worker_loop(token).await }));
        }

        {
            let bus = self.clone();
            let token = token.clone();
            tasks.push(tokio::spawn(async move { bus.process_failed(token).await }));
        }

        BusHandle { token, tasks }
    }

    /// 失败恢复循环：失败队列的唯一消费者
    ///
    /// 取出的失败命令若 attempts 已达 3 则直接丢弃；否则计数加一并在
    /// 循环内同步重试一次，重试仍失败记录告警且不再入队——每条失败
    /// 至多触发一次自动重试，计数保留用于观测与丢弃阈值。
    /// 取消令牌触发后关闭队列，积压条目逐条留下告警日志后返回。
    pub async fn process_failed(&self, token: CancellationToken) {
        let Some(mut failed) = self.failed_rx.lock().await.take() else {
            self.logger.warn("failed commands consumer already running", &[]);
            return;
        };

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    failed.close();
                    while let Ok(fc) = failed.try_recv() {
                        self.logger.warn(
                            "discarding failed command at shutdown",
                            &[
                                ("command", fc.name.to_string()),
                                ("attempts", fc.attempts.to_string()),
                            ],
                        );
                    }
                    self.logger.warn("exiting safely failed commands consumer", &[]);
                    return;
                }
                maybe_failed = failed.recv() => {
                    let Some(mut fc) = maybe_failed else { return };

                    if fc.attempts >= MAX_ATTEMPTS {
                        continue;
                    }

                    fc.attempts += 1;
                    if let Err(err) = invoke(&fc.handler, fc.command.clone(), &fc.ctx).await {
                        self.logger.warn(
                            "failing processing command",
                            &[
                                ("command", fc.name.to_string()),
                                ("attempts", fc.attempts.to_string()),
                                ("error", err.to_string()),
                            ],
                        );
                    }
                }
            }
        }
    }

    async fn worker_loop(&self, token: CancellationToken) {
        loop {
            let job = tokio::select! {
                _ = token.cancelled() => {
                    // 关闭任务队列，使后续 dispatch_async 得到 QueueClosed；
                    // 已受理未执行的任务逐条留下告警日志后丢弃，不做无声丢失
                    let mut jobs = self.jobs_rx.lock().await;
                    jobs.close();
                    while let Ok(job) = jobs.try_recv() {
                        self.logger.warn(
                            "discarding queued command at shutdown",
                            &[("command", job.name.to_string())],
                        );
                    }
                    return;
                }
                job = async { self.jobs_rx.lock().await.recv().await } => job,
            };

            match job {
                None => return,
                Some(job) => self.run_job(job).await,
            }
        }
    }

    /// 执行异步任务：失败记录错误日志并进入失败队列（attempts = 1）
    async fn run_job(&self, job: AsyncCommand) {
        let AsyncCommand {
            name,
            command,
            handler,
            ctx,
        } = job;

        if let Err(err) = invoke(&handler, command.clone(), &ctx).await {
            self.logger.error(
                "error processing command",
                &[("command", name.to_string()), ("error", err.to_string())],
            );

            let fc = FailedCommand {
                name,
                command,
                handler,
                ctx,
                attempts: 1,
            };
            if self.failed_tx.try_send(fc).is_err() {
                self.logger.error(
                    "retry queue unavailable, dropping failed command",
                    &[("command", name.to_string())],
                );
            }
        }
    }
}

#[async_trait]
impl CommandBus for InMemoryCommandBus {
    async fn dispatch<C: Command>(&self, ctx: &AppContext, cmd: C) -> Result<(), AppError> {
        let Some(f) = self.handlers.get(C::NAME).map(|h| h.clone()) else {
            return Err(AppError::NotRegistered { name: C::NAME });
        };

        (f)(Arc::new(cmd), ctx).await
    }

    async fn dispatch_async<C: Command>(&self, ctx: &AppContext, cmd: C) -> Result<(), AppError> {
        let Some(f) = self.handlers.get(C::NAME).map(|h| h.clone()) else {
            return Err(AppError::NotRegistered { name: C::NAME });
        };

        let job = AsyncCommand {
            name: C::NAME,
            command: Arc::new(cmd),
            handler: f,
            ctx: ctx.clone(),
        };

        match self.jobs_tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(AppError::QueueFull { name: C::NAME }),
            Err(TrySendError::Closed(_)) => Err(AppError::QueueClosed { name: C::NAME }),
        }
    }
}

/// 调用处理器并收容 panic：运行时故障转化为错误而非终止进程
async fn invoke(f: &CmdHandlerFn, command: BoxedCommand, ctx: &AppContext) -> Result<(), AppError> {
    match AssertUnwindSafe((f)(command, ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(AppError::Infra(format!(
            "command handler panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

/// 总线运行句柄：用于优雅关闭与等待任务结束
pub struct BusHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl BusHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for t in tasks {
            let _ = t.await;
        }
    }
}

impl Drop for BusHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

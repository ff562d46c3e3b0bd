//! 通用代理消费者（EventConsumer）
//!
//! 从消息代理拉取原始消息，serde 反序列化为领域事件后交给处理器；
//! 每一步的失败都会记录日志并推送到有界错误通道，处理器 panic 被
//! 收容为错误而非终止进程。循环经由取消令牌协作退出。
//!
use crate::{error::AppError, logger::Logger, panic::panic_message};
use futures_util::FutureExt;
use modkit_domain::{Broker, DomainEvent, EventHandler};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 错误及其关联的原始消息
#[derive(Debug)]
pub struct ErrorMessage {
    pub error: AppError,
    pub message: Option<Vec<u8>>,
}

/// 通用消费者：按消息名称消费某一类领域事件
pub struct EventConsumer<E, H, B>
where
    E: DomainEvent + DeserializeOwned,
    H: EventHandler<E>,
    B: Broker,
{
    broker: Arc<B>,
    handler: Arc<H>,
    message_name: String,
    errors_tx: mpsc::Sender<ErrorMessage>,
    logger: Arc<dyn Logger>,
    _marker: PhantomData<E>,
}

impl<E, H, B> EventConsumer<E, H, B>
where
    E: DomainEvent + DeserializeOwned,
    H: EventHandler<E>,
    B: Broker,
{
    pub fn new(
        broker: Arc<B>,
        handler: Arc<H>,
        message_name: impl Into<String>,
        errors_tx: mpsc::Sender<ErrorMessage>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            broker,
            handler,
            message_name: message_name.into(),
            errors_tx,
            logger,
            _marker: PhantomData,
        }
    }

    /// 启动消费循环，直到取消令牌触发
    pub async fn run(&self, token: CancellationToken) {
        self.logger.info(
            "starting consumer",
            &[("message", self.message_name.clone())],
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    self.logger.info(
                        "stopping consumer",
                        &[("message", self.message_name.clone())],
                    );
                    return;
                }
                fetched = self.broker.fetch_message() => {
                    match fetched {
                        Ok(raw) => self.process(raw).await,
                        Err(err) => self.report(AppError::from(err), None).await,
                    }
                }
            }
        }
    }

    async fn process(&self, raw: Vec<u8>) {
        let event: E = match serde_json::from_slice(&raw) {
            Ok(event) => event,
            Err(err) => {
                self.report(AppError::Domain(err.into()), Some(raw)).await;
                return;
            }
        };

        match AssertUnwindSafe(self.handler.handle(&event)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.report(AppError::Domain(err), Some(raw)).await,
            Err(payload) => {
                self.report(
                    AppError::Infra(format!(
                        "event handler {} panicked: {}",
                        self.handler.handler_name(),
                        panic_message(payload.as_ref())
                    )),
                    Some(raw),
                )
                .await;
            }
        }
    }

    /// 记录错误并推送到错误通道；通道满时丢弃并留下日志
    async fn report(&self, error: AppError, message: Option<Vec<u8>>) {
        self.logger.error(
            "error processing message",
            &[
                ("message", self.message_name.clone()),
                ("error", error.to_string()),
            ],
        );

        if self.errors_tx.try_send(ErrorMessage { error, message }).is_err() {
            self.logger.error(
                "error channel unavailable, dropping error",
                &[("message", self.message_name.clone())],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NoopLogger;
    use chrono::{DateTime, Utc};
    use modkit_domain::{DomainError, DomainResult};
    use serde::{Deserialize, Serialize};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct UserCreated {
        aggregate_id: String,
        occurred_on: DateTime<Utc>,
        correlation_id: String,
    }

    impl DomainEvent for UserCreated {
        fn aggregate_id(&self) -> &str {
            &self.aggregate_id
        }
        fn occurred_on(&self) -> DateTime<Utc> {
            self.occurred_on
        }
        fn event_name(&self) -> &str {
            "user.created"
        }
        fn payload(&self) -> serde_json::Value {
            serde_json::json!({ "aggregate_id": self.aggregate_id })
        }
        fn version(&self) -> usize {
            1
        }
        fn correlation_id(&self) -> &str {
            &self.correlation_id
        }
    }

    /// 预置消息脚本的代理：消息耗尽后挂起
    struct ScriptedBroker {
        messages: StdMutex<VecDeque<Vec<u8>>>,
    }

    #[async_trait::async_trait]
    impl Broker for ScriptedBroker {
        async fn fetch_message(&self) -> DomainResult<Vec<u8>> {
            let next = self.messages.lock().unwrap().pop_front();
            match next {
                Some(raw) => Ok(raw),
                None => std::future::pending().await,
            }
        }

        async fn close(&self) -> DomainResult<()> {
            Ok(())
        }
    }

    struct CountingHandler {
        handled: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl EventHandler<UserCreated> for CountingHandler {
        fn handler_name(&self) -> &str {
            "counting"
        }

        async fn handle(&self, _event: &UserCreated) -> DomainResult<()> {
            if self.fail {
                return Err(DomainError::EventHandler {
                    handler: "counting".into(),
                    reason: "fail requested".into(),
                });
            }
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn event_bytes(id: &str) -> Vec<u8> {
        serde_json::to_vec(&UserCreated {
            aggregate_id: id.into(),
            occurred_on: Utc::now(),
            correlation_id: format!("cor-{id}"),
        })
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn consumes_valid_messages_and_reports_malformed_ones() {
        let broker = Arc::new(ScriptedBroker {
            messages: StdMutex::new(VecDeque::from(vec![
                event_bytes("u-1"),
                b"not json".to_vec(),
                event_bytes("u-2"),
            ])),
        });
        let handled = Arc::new(AtomicUsize::new(0));
        let (errors_tx, mut errors_rx) = mpsc::channel(8);

        let consumer = EventConsumer::new(
            broker,
            Arc::new(CountingHandler {
                handled: handled.clone(),
                fail: false,
            }),
            "user.created",
            errors_tx,
            Arc::new(NoopLogger),
        );

        let token = CancellationToken::new();
        let task = {
            let token = token.clone();
            tokio::spawn(async move { consumer.run(token).await })
        };

        // 两条合法消息被消费，畸形消息走错误通道
        let err = tokio::time::timeout(Duration::from_secs(2), errors_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(err.error, AppError::Domain(_)));
        assert_eq!(err.message.as_deref(), Some(b"not json".as_slice()));

        tokio::time::timeout(Duration::from_secs(2), async {
            while handled.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn handler_failure_goes_to_error_channel() {
        let broker = Arc::new(ScriptedBroker {
            messages: StdMutex::new(VecDeque::from(vec![event_bytes("u-1")])),
        });
        let (errors_tx, mut errors_rx) = mpsc::channel(8);

        let consumer = EventConsumer::new(
            broker,
            Arc::new(CountingHandler {
                handled: Arc::new(AtomicUsize::new(0)),
                fail: true,
            }),
            "user.created",
            errors_tx,
            Arc::new(NoopLogger),
        );

        let token = CancellationToken::new();
        let task = {
            let token = token.clone();
            tokio::spawn(async move { consumer.run(token).await })
        };

        let err = tokio::time::timeout(Duration::from_secs(2), errors_rx.recv())
            .await
            .unwrap()
            .unwrap();
        match err.error {
            AppError::Domain(DomainError::EventHandler { handler, .. }) => {
                assert_eq!(handler, "counting");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        token.cancel();
        task.await.unwrap();
    }
}

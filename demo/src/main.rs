use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modkit_application::command_bus::CommandBus;
use modkit_application::command_handler::CommandHandler;
use modkit_application::context::AppContext;
use modkit_application::error::AppError;
use modkit_application::query_bus::QueryBus;
use modkit_application::query_handler::QueryHandler;
use modkit_application::{InMemoryCommandBus, InMemoryQueryBus, TracingLogger};
use modkit_domain::{AggregateRoot, BusinessContext, DomainEvent, EventRecorder};
use modkit_macros::{Command, Dto, Query};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Command, Clone, Debug)]
#[command(name = "user.create")]
struct CreateUser {
    id: String,
    name: String,
}

#[derive(Command, Clone, Debug)]
#[command(name = "user.send_welcome_mail")]
struct SendWelcomeMail {
    user_id: String,
}

#[derive(Dto, Serialize, Debug)]
struct UserDto {
    id: String,
    name: String,
}

#[derive(Query, Debug)]
#[query(dto = UserDto, name = "user.find")]
struct FindUser {
    id: String,
}

#[derive(Debug, Clone, Serialize)]
struct UserCreated {
    user_id: String,
    occurred_on: DateTime<Utc>,
    correlation_id: String,
}

impl DomainEvent for UserCreated {
    fn aggregate_id(&self) -> &str {
        &self.user_id
    }
    fn occurred_on(&self) -> DateTime<Utc> {
        self.occurred_on
    }
    fn event_name(&self) -> &str {
        "user.created"
    }
    fn payload(&self) -> serde_json::Value {
        serde_json::json!({ "user_id": self.user_id })
    }
    fn version(&self) -> usize {
        1
    }
    fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// 用户聚合：创建时记录领域事件，事后由应用层统一取出发布
struct User {
    id: String,
    name: String,
    recorder: EventRecorder,
}

impl User {
    fn create(id: String, name: String, correlation_id: String) -> Self {
        let mut user = Self {
            id: id.clone(),
            name,
            recorder: EventRecorder::new(),
        };
        user.record(Box::new(UserCreated {
            user_id: id,
            occurred_on: Utc::now(),
            correlation_id,
        }));
        user
    }
}

impl AggregateRoot for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn record(&mut self, event: Box<dyn DomainEvent>) {
        self.recorder.record(event);
    }

    fn pull_domain_events(&mut self) -> Vec<Box<dyn DomainEvent>> {
        self.recorder.pull()
    }
}

type UserStore = Arc<Mutex<HashMap<String, String>>>;

struct CreateUserHandler {
    store: UserStore,
}

#[async_trait]
impl CommandHandler<CreateUser> for CreateUserHandler {
    async fn handle(&self, ctx: &AppContext, cmd: CreateUser) -> Result<(), AppError> {
        let correlation_id = ctx.biz.correlation_id().unwrap_or("-").to_string();
        let mut user = User::create(cmd.id, cmd.name, correlation_id);
        self.store
            .lock()
            .unwrap()
            .insert(user.id().to_string(), user.name.clone());

        // 实际应用中这里会把事件交给 EventBus 适配器发布
        for event in user.pull_domain_events() {
            println!(
                "domain event: name={}, aggregate={}",
                event.event_name(),
                event.aggregate_id()
            );
        }
        Ok(())
    }
}

/// 首次投递失败，演示异步分发的失败重试路径
struct SendWelcomeMailHandler {
    attempts: AtomicUsize,
}

#[async_trait]
impl CommandHandler<SendWelcomeMail> for SendWelcomeMailHandler {
    async fn handle(&self, _ctx: &AppContext, cmd: SendWelcomeMail) -> Result<(), AppError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == 1 {
            return Err(AppError::Infra("smtp unreachable".into()));
        }
        println!("welcome mail sent: user={} (attempt {attempt})", cmd.user_id);
        Ok(())
    }
}

struct FindUserHandler {
    store: UserStore,
}

#[async_trait]
impl QueryHandler<FindUser> for FindUserHandler {
    async fn handle(&self, _ctx: &AppContext, q: FindUser) -> Result<UserDto, AppError> {
        let store = self.store.lock().unwrap();
        let Some(name) = store.get(&q.id) else {
            return Err(AppError::Validation(format!("user not found: {}", q.id)));
        };
        Ok(UserDto {
            id: q.id.clone(),
            name: name.clone(),
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let store: UserStore = Arc::new(Mutex::new(HashMap::new()));

    // 组装总线（Kernel 层以构造注入方式组合，无全局状态）
    let command_bus = Arc::new(InMemoryCommandBus::new(Arc::new(TracingLogger)));
    let query_bus = InMemoryQueryBus::new();

    command_bus
        .register::<CreateUser, _>(Arc::new(CreateUserHandler {
            store: store.clone(),
        }))
        .unwrap();
    command_bus
        .register::<SendWelcomeMail, _>(Arc::new(SendWelcomeMailHandler {
            attempts: AtomicUsize::new(0),
        }))
        .unwrap();
    query_bus
        .register::<FindUser, _>(Arc::new(FindUserHandler {
            store: store.clone(),
        }))
        .unwrap();

    let handle = command_bus.clone().start();

    let ctx = AppContext {
        biz: BusinessContext::builder()
            .maybe_correlation_id(Some("cor-demo".into()))
            .maybe_actor_type(Some("user".into()))
            .maybe_actor_id(Some("u-1".into()))
            .build(),
        idempotency_key: None,
    };

    // 同步分发命令
    command_bus
        .dispatch(
            &ctx,
            CreateUser {
                id: "u-1".into(),
                name: "Alice".into(),
            },
        )
        .await
        .unwrap();

    // 异步分发：立即返回，首次失败由恢复循环重试
    command_bus
        .dispatch_async(&ctx, SendWelcomeMail { user_id: "u-1".into() })
        .await
        .unwrap();

    // 同步查询
    let user = query_bus.ask(&ctx, FindUser { id: "u-1".into() }).await.unwrap();
    println!("found user: id={}, name={}", user.id, user.name);
    println!("registered queries: {:?}", query_bus.registered_queries());

    tokio::time::sleep(Duration::from_millis(300)).await;

    handle.shutdown();
    handle.join().await;
}

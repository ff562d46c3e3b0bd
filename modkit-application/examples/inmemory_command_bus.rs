use async_trait::async_trait;
use modkit_application::InMemoryCommandBus;
use modkit_application::TracingLogger;
use modkit_application::command::Command;
use modkit_application::command_bus::CommandBus;
use modkit_application::command_handler::CommandHandler;
use modkit_application::context::AppContext;
use modkit_application::error::AppError;
use modkit_domain::BusinessContext;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
struct CreateUser {
    name: String,
}

impl Command for CreateUser {
    const NAME: &'static str = "user.create";
}

struct CreateUserHandler;

#[async_trait]
impl CommandHandler<CreateUser> for CreateUserHandler {
    async fn handle(&self, _ctx: &AppContext, cmd: CreateUser) -> Result<(), AppError> {
        println!("CreateUser: name={}", cmd.name);
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct SendWelcomeMail {
    to: String,
}

impl Command for SendWelcomeMail {
    const NAME: &'static str = "user.send_welcome_mail";
}

/// 首次执行失败，演示异步分发的失败重试路径
struct SendWelcomeMailHandler {
    attempts: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl CommandHandler<SendWelcomeMail> for SendWelcomeMailHandler {
    async fn handle(&self, _ctx: &AppContext, cmd: SendWelcomeMail) -> Result<(), AppError> {
        let attempt = self
            .attempts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        if attempt == 1 {
            return Err(AppError::Infra("smtp unreachable".into()));
        }
        println!("SendWelcomeMail: to={} (attempt {attempt})", cmd.to);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bus = Arc::new(InMemoryCommandBus::new(Arc::new(TracingLogger)));
    bus.register::<CreateUser, _>(Arc::new(CreateUserHandler))?;
    bus.register::<SendWelcomeMail, _>(Arc::new(SendWelcomeMailHandler {
        attempts: std::sync::atomic::AtomicUsize::new(0),
    }))?;

    let handle = bus.clone().start();

    let ctx = AppContext {
        biz: BusinessContext::builder()
            .maybe_correlation_id(Some("cor-1".into()))
            .maybe_actor_type(Some("user".into()))
            .maybe_actor_id(Some("u-1".into()))
            .build(),
        idempotency_key: Some("idem-1".into()),
    };

    // 同步分发：阻塞等待结果
    bus.dispatch(&ctx, CreateUser { name: "Alice".into() }).await?;

    // 异步分发：立即返回，失败由恢复循环重试
    bus.dispatch_async(&ctx, SendWelcomeMail { to: "alice@example.com".into() })
        .await?;

    tokio::time::sleep(Duration::from_millis(200)).await;

    handle.shutdown();
    handle.join().await;

    Ok(())
}

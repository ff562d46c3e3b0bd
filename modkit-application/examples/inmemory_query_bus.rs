use async_trait::async_trait;
use modkit_application::InMemoryQueryBus;
use modkit_application::context::AppContext;
use modkit_application::dto::Dto;
use modkit_application::error::AppError;
use modkit_application::query::Query;
use modkit_application::query_bus::QueryBus;
use modkit_application::query_handler::QueryHandler;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug)]
struct GetUser {
    id: u32,
}

impl Query for GetUser {
    const NAME: &'static str = "user.get";
    type Dto = UserDto;
}

#[derive(Debug, Serialize)]
struct UserDto {
    id: u32,
    name: String,
}

impl Dto for UserDto {}

struct GetUserHandler;

#[async_trait]
impl QueryHandler<GetUser> for GetUserHandler {
    async fn handle(&self, _ctx: &AppContext, q: GetUser) -> Result<UserDto, AppError> {
        Ok(UserDto {
            id: q.id,
            name: "Alice".to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bus = InMemoryQueryBus::new();
    bus.register::<GetUser, _>(Arc::new(GetUserHandler))?;

    let ctx = AppContext::default();
    let user = bus.ask(&ctx, GetUser { id: 7 }).await?;
    println!("user: id={}, name={}", user.id, user.name);
    println!("registered queries: {:?}", bus.registered_queries());

    Ok(())
}

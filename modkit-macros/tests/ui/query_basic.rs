use modkit_application::query::Query as _;
use modkit_macros::{Dto, Query};
use serde::Serialize;

#[derive(Dto, Serialize, Debug)]
struct UserDto {
    id: u32,
    name: String,
}

#[derive(Query, Debug)]
#[query(dto = UserDto, name = "user.get")]
struct GetUser {
    id: u32,
}

fn main() {
    assert_eq!(GetUser::NAME, "user.get");
    let _ = GetUser { id: 1 };
}

use modkit_application::command::Command as _;
use modkit_macros::Command;

#[derive(Command, Clone, Debug)]
#[command(name = "user.create")]
struct CreateUser {
    name: String,
}

#[derive(Command, Clone, Debug)]
struct DeleteUser;

fn main() {
    assert_eq!(CreateUser::NAME, "user.create");
    assert_eq!(DeleteUser::NAME, "DeleteUser");
    let _ = CreateUser { name: "a".into() };
}

use std::time::Duration;

use bot_tester::{Address, BotTester, Identity, LocalHost, Message, Result};
use serde_json::json;

// A small greeter: asks for a name on the first turn, remembers it, and
// greets the user by name afterwards.
fn greeter() -> LocalHost {
    LocalHost::new(|mut session| async move {
        let known = session.user_data().get("name").cloned();
        match known {
            None if session.conversation_data().contains_key("asked") => {
                let name = session.text().to_string();
                session.user_data_mut().insert("name".into(), json!(name));
                session.save().await;
            }
            None => {
                session.conversation_data_mut().insert("asked".into(), json!(true));
                session.save().await;
                session.send_typing();
                session.send("Hi! What's your name?");
            }
            Some(name) => {
                let name = name.as_str().unwrap_or("stranger");
                session.send(format!("Welcome back, {name}!"));
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let ada = Address::builder()
        .channel("console")
        .user(Identity::new("ada", "Ada"))
        .conversation("adaConversation")
        .build();

    BotTester::new(greeter())
        .ignore_typing_event()
        .set_timeout(Duration::from_secs(1))
        .send_message_to_bot("hello", ["Hi! What's your name?"])
        .send_message_to_bot_and_expect_save_with_no_response("Grace")
        .check_session(|state| assert_eq!(state.user_data["name"], "Grace"))
        .send_message_to_bot("hello again", ["Welcome back, Grace!"])
        .send_message_to_bot(Message::text("hi").with_address(ada), ["Hi! What's your name?"])
        .run_test()
        .await?;

    println!("greeter conversation passed");
    Ok(())
}

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use bot_tester::{
    Address, Attachment, BotTester, Config, Error, Expectation, Identity, LocalHost, Message,
    Session,
};
use rand::seq::SliceRandom;
use regex::Regex;
use serde_json::{Value, json};

const COLORS: [&str; 10] = [
    "red", "green", "blue", "grey", "gray", "purple", "magenta", "cheese", "orange", "hazelnut",
];

fn echo() -> LocalHost {
    LocalHost::new(|session| async move {
        let text = session.text().to_string();
        session.send(text);
    })
}

fn replies(texts: &'static [&'static str]) -> LocalHost {
    LocalHost::new(move |session| async move {
        for text in texts {
            session.send(*text);
        }
    })
}

fn adaptive_card(title: &str) -> Attachment {
    Attachment::new(
        "application/vnd.microsoft.card.adaptive",
        json!({
            "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
            "type": "AdaptiveCard",
            "version": "1.0",
            "body": [
                { "type": "TextBlock", "text": "Meeting Title", "weight": "bolder" },
                { "type": "TextBlock", "text": "Conference Room 112/3377 (10)", "isSubtle": true }
            ],
            "actions": [{ "type": "Action.Submit", "title": title }]
        }),
    )
}

fn custom_address(user: &str, name: &str, bot: &str, bot_name: &str) -> Address {
    Address::builder()
        .channel("console")
        .user(Identity::new(user, name))
        .bot(Identity::new(bot, bot_name))
        .conversation(format!("{user}Conversation"))
        .build()
}

fn step_counter(session: &Session) -> u64 {
    session
        .conversation_data()
        .get("step")
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

#[tokio::test]
async fn single_response() {
    BotTester::new(replies(&["hello!"]))
        .send_message_to_bot("Hola!", ["hello!"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn unbounded_timeout() {
    BotTester::new(replies(&["hello!"]))
        .set_timeout(Duration::MAX)
        .send_message_to_bot("Hola!", ["hello!"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn multiple_responses_in_order() {
    BotTester::new(replies(&["hello!", "how are you doing?"]))
        .send_message_to_bot("Hola!", ["hello!", "how are you doing?"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn multiple_responses_in_the_wrong_order_fail() {
    let err = BotTester::new(replies(&["hello!", "how are you doing?"]))
        .send_message_to_bot("Hola!", ["how are you doing?", "hello!"])
        .run_test()
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(0));
    assert!(matches!(err.cause(), Error::Mismatch { index: 0, .. }));
}

#[tokio::test]
async fn random_response_from_a_set() {
    let host = LocalHost::new(|session| async move {
        let color = COLORS.choose(&mut rand::thread_rng()).copied().unwrap_or("red");
        session.send(color);
    });

    for _ in 0..5 {
        BotTester::new(host.clone())
            .send_message_to_bot("tell me a color!", [COLORS.to_vec()])
            .run_test()
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn prompts_across_turns() {
    let host = LocalHost::new(|mut session| async move {
        let step = step_counter(&session);
        session
            .conversation_data_mut()
            .insert("step".into(), json!(step + 1));
        session.save().await;

        match step {
            0 => session.send("Hi there! Tell me something you like"),
            1 => {
                session.send(format!("{} is pretty cool.", session.text()));
                session.send("Why do you like it?");
            }
            _ => session.send("Interesting. Well, that's all I have for now"),
        }
    });

    BotTester::new(host)
        .send_message_to_bot("Hola!", ["Hi there! Tell me something you like"])
        .send_message_to_bot("The sky", ["The sky is pretty cool.", "Why do you like it?"])
        .send_message_to_bot("It's blue", ["Interesting. Well, that's all I have for now"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn adaptive_cards() {
    let card_message = || Message::new().with_attachment(adaptive_card("OK"));
    let host = LocalHost::new(move |session| async move {
        session.send(card_message());
    });

    BotTester::new(host)
        .send_message_to_bot("anything", [card_message()])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn adaptive_cards_regardless_of_order() {
    let host = LocalHost::new(|session| async move {
        session.send(
            Message::new()
                .with_attachment(adaptive_card("OK"))
                .with_attachment(adaptive_card("Cancel")),
        );
    });

    let reversed = Message::new()
        .with_attachment(adaptive_card("Cancel"))
        .with_attachment(adaptive_card("OK"));
    let wrong_title = Message::new().with_attachment(adaptive_card("this is not the correct title"));

    BotTester::new(host.clone())
        .send_message_to_bot("anything", [reversed])
        .run_test()
        .await
        .unwrap();

    let err = BotTester::new(host)
        .send_message_to_bot("anything", [wrong_title])
        .run_test()
        .await
        .unwrap_err();
    assert!(matches!(err.cause(), Error::Mismatch { .. }));
}

#[tokio::test]
async fn save_without_response_then_inspect_session() {
    let host = LocalHost::new(|mut session| async move {
        if step_counter(&session) == 0 {
            session.conversation_data_mut().insert("step".into(), json!(1));
            session.save().await;
            session.send("What would you like to set data to?");
        } else {
            let data = session.text().to_string();
            session.user_data_mut().insert("data".into(), json!(data));
            session.save().await;
        }
    });

    BotTester::new(host)
        .send_message_to_bot("Start this thing!", ["What would you like to set data to?"])
        .send_message_to_bot_and_expect_save_with_no_response("This is data!")
        .check_session(|state| {
            assert_eq!(state.user_data.get("data"), Some(&json!("This is data!")));
        })
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn check_session_for_reads_each_users_own_state() {
    let host = LocalHost::new(|mut session| async move {
        let data = session.text().to_string();
        session.user_data_mut().insert("data".into(), json!(data));
        session.save().await;
    });
    let user2 = custom_address("user2", "B", "bot", "Bot");

    BotTester::new(host)
        .send_message_to_bot_and_expect_save_with_no_response("default data")
        .send_message_to_bot_and_expect_save_with_no_response(
            Message::text("user2 data").with_address(user2.clone()),
        )
        .check_session_for(user2, |state| {
            assert_eq!(state.user_data.get("data"), Some(&json!("user2 data")));
        })
        .check_session(|state| {
            assert_eq!(state.user_data.get("data"), Some(&json!("default data")));
        })
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn save_step_fails_when_the_bot_replies() {
    let host = LocalHost::new(|session| async move {
        session.send("I should have stayed quiet");
        session.save().await;
    });

    let err = BotTester::new(host)
        .send_message_to_bot_and_expect_save_with_no_response("shh")
        .run_test()
        .await
        .unwrap_err();

    match err.cause() {
        Error::UnexpectedResponse { message, .. } => {
            assert_eq!(message.text.as_deref(), Some("I should have stayed quiet"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn check_session_returning_an_error_fails_the_run() {
    let err = BotTester::new(echo())
        .check_session(|state| {
            if state.user_data.contains_key("data") {
                Ok(())
            } else {
                Err("no data saved")
            }
        })
        .run_test()
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(0));
    assert!(matches!(err.cause(), Error::Callback(e) if e.to_string() == "no data saved"));
}

#[tokio::test]
async fn custom_message_types_and_fields() {
    let custom = Message::text("this is text")
        .with_kind("newType")
        .with_field("someField", json!({ "a": 1 }));
    let reply = custom.clone();
    let host = LocalHost::new(move |session| {
        let reply = reply.clone();
        async move { session.send(reply) }
    });

    let matching = Message::text("this is text").with_kind("newType");

    BotTester::new(host)
        .send_message_to_bot("anything", [custom])
        .send_message_to_bot("anything", [matching])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn multiple_users_with_a_custom_default_address() {
    let default = custom_address("customUser1", "A", "customBot1", "Bot1");
    let user2 = custom_address("user2", "B", "bot", "Bot");

    let host = LocalHost::new(|session| async move {
        let name = session
            .address()
            .user
            .as_ref()
            .and_then(|u| u.name.clone())
            .unwrap_or_default();
        session.send(name);
    });

    let ask = |address: &Address| Message::text("What is my name?").with_address(address.clone());
    let answer = |name: &str, address: &Address| Message::text(name).with_address(address.clone());

    BotTester::with_config(host, Config::default().with_default_address(default.clone()))
        .send_message_to_bot(ask(&default), ["A"])
        .send_message_to_bot("What is my name?", [answer("A", &default)])
        .send_message_to_bot(ask(&default), [answer("A", &default)])
        .send_message_to_bot(ask(&user2), [answer("B", &user2)])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn partial_address_in_expectation() {
    let host = LocalHost::new(|session| async move {
        let name = session
            .address()
            .user
            .as_ref()
            .and_then(|u| u.name.clone())
            .unwrap_or_default();
        session.send(name);
    });

    let default = Address::default_console();
    let ask = Message::text("What is my name?").with_address(default.clone());
    let full = Message::new().with_address(default.clone());
    let partial = Message::new().with_address(Address::builder().user(Identity::with_id("user1")).build());
    let stranger = Message::new().with_address(Address::builder().user(Identity::with_id("u2")).build());

    BotTester::new(host.clone())
        .send_message_to_bot(ask.clone(), [full])
        .send_message_to_bot(ask.clone(), [partial])
        .run_test()
        .await
        .unwrap();

    let err = BotTester::new(host)
        .send_message_to_bot(ask, [stranger])
        .run_test()
        .await
        .unwrap_err();
    assert!(matches!(err.cause(), Error::Mismatch { .. }));
}

#[tokio::test]
async fn interleaved_users_do_not_see_each_others_replies() {
    let user2 = custom_address("user2", "B", "bot", "Bot");
    let host = LocalHost::new(|session| async move {
        let delay = if session.text() == "slow" { 100 } else { 0 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        session.send(format!("re: {}", session.text()));
    });

    BotTester::new(host)
        .send_message_to_bot("slow", None::<&str>)
        .send_message_to_bot(Message::text("fast").with_address(user2.clone()), ["re: fast"])
        .send_message_to_bot_ignoring_response_order("again", ["re: slow", "re: again"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn batch_responses() {
    let customer = custom_address("userId1", "user1", "bot", "Bot");
    let outgoing = customer.clone();
    let host = LocalHost::new(move |session| {
        let address = outgoing.clone();
        async move {
            session.send_batch([
                Message::text("hello").with_address(address.clone()),
                Message::text("there").with_address(address),
            ]);
        }
    });

    BotTester::with_config(host, Config::default().with_default_address(customer))
        .send_message_to_bot("anything", ["hello", "there"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn regex_expectations() {
    let number = Regex::new(r"^\d+").unwrap();

    BotTester::new(echo())
        .send_message_to_bot("1", [&number])
        .send_message_to_bot("3156", [&number])
        .send_message_to_bot("8675309", [&number])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn mixed_expectation_kinds() {
    let host = LocalHost::new(|session| async move {
        let text = session.text().to_string();
        session.send(text.clone());
        session.send(text);
    });

    BotTester::new(host)
        .send_message_to_bot(
            "123",
            [
                Expectation::from(Regex::new(r"^\d+").unwrap()),
                Expectation::from("123"),
            ],
        )
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn arbitrary_work_between_steps() {
    let response = Arc::new(Mutex::new(String::from("goodbye")));
    let current = response.clone();
    let host = LocalHost::new(move |session| {
        let text = current.lock().map(|r| r.clone()).unwrap_or_default();
        async move { session.send(text) }
    });

    BotTester::new(host)
        .send_message_to_bot("you say", ["goodbye"])
        .then(move || *response.lock().unwrap() = "hello".into())
        .send_message_to_bot("and i say", ["hello"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn async_work_between_steps() {
    let host = echo();
    let proactive = host.clone();

    BotTester::new(host)
        .then_async(move || async move {
            proactive
                .send(Message::text("ping").with_address(Address::default_console()))
                .await
        })
        .send_message_to_bot("pong", ["ping", "pong"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn wait_between_steps() {
    let delay = Duration::from_millis(300);
    let before = Arc::new(Mutex::new(None::<Instant>));
    let after = Arc::new(Mutex::new(None::<Instant>));

    let (b, a) = (before.clone(), after.clone());
    let host = LocalHost::new(move |session| {
        let waited = match (*b.lock().unwrap(), *a.lock().unwrap()) {
            (Some(b), Some(a)) => a.duration_since(b) >= delay,
            _ => false,
        };
        async move {
            if waited {
                session.send("i waited some time");
            }
        }
    });

    BotTester::new(host)
        .then(move || *before.lock().unwrap() = Some(Instant::now()))
        .wait(delay)
        .then(move || *after.lock().unwrap() = Some(Instant::now()))
        .send_message_to_bot("have you waited ?", ["i waited some time"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn responses_ignoring_order() {
    BotTester::new(replies(&["hi", "there", "how are you?"]))
        .send_message_to_bot_ignoring_response_order("anything", ["how are you?", "hi", "there"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn unordered_step_reports_every_unmatched_expectation() {
    let err = BotTester::new(replies(&["hi", "there", "how are you?"]))
        .send_message_to_bot_ignoring_response_order("anything", ["hello", "hi", "bye"])
        .run_test()
        .await
        .unwrap_err();

    match err.cause() {
        Error::UnmatchedSet { unmatched, .. } => assert_eq!(unmatched.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn message_filters_from_config() {
    let config = Config::default()
        .with_message_filter(|m: &Message| !m.text_or_empty().contains("how"))
        .with_message_filter(|m: &Message| !m.text_or_empty().contains("are"));

    BotTester::with_config(replies(&["hello", "how", "are", "you?"]), config)
        .send_message_to_bot("intro", ["hello", "you?"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn message_filters_added_in_the_chain() {
    BotTester::new(replies(&["hello", "there", "green"]))
        .add_message_filter(|m: &Message| !m.text_or_empty().contains("hello"))
        .add_message_filter(|m: &Message| !m.text_or_empty().contains("there"))
        .send_message_to_bot("hey", ["green"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn shorter_timeout_rejects_late_reply() {
    let timeout = Duration::from_millis(750);
    let host = LocalHost::new(move |session| async move {
        tokio::time::sleep(timeout * 2).await;
        session.send("hi there");
    });

    let err = BotTester::new(host)
        .set_timeout(timeout)
        .send_message_to_bot("hey", ["hi there"])
        .run_test()
        .await
        .unwrap_err();

    match err.cause() {
        Error::Timeout {
            timeout: waited,
            received,
            ..
        } => {
            assert_eq!(*waited, timeout);
            assert!(received.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn ignore_typing_events() {
    let host = LocalHost::new(|session| async move {
        session.send("hello");
        session.send_typing();
        session.send("goodbye");
    });

    BotTester::new(host)
        .ignore_typing_event()
        .send_message_to_bot("hey", ["hello", "goodbye"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn typing_events_count_unless_ignored() {
    let host = LocalHost::new(|session| async move {
        session.send_typing();
        session.send("hello");
    });

    let err = BotTester::new(host)
        .send_message_to_bot("hey", ["hello"])
        .run_test()
        .await
        .unwrap_err();
    assert!(matches!(err.cause(), Error::Mismatch { .. }));
}

#[tokio::test]
async fn ignore_end_of_conversation_events() {
    let host = LocalHost::new(|session| async move {
        session.send("bye");
        session.end_conversation();
    });

    BotTester::new(host)
        .ignore_end_of_conversation_event()
        .send_message_to_bot("that's all", ["bye"])
        .send_message_to_bot("hello again", ["bye"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn no_expectations_then_next_step() {
    BotTester::new(replies(&["hello"]))
        .send_message_to_bot("this IS another thing", None::<&str>)
        .send_message_to_bot("this could be anything!", ["hello"])
        .run_test()
        .await
        .unwrap();
}

#[tokio::test]
async fn plain_text_without_default_address_is_rejected_before_sending() {
    let sent = Arc::new(Mutex::new(0));
    let counter = sent.clone();
    let host = LocalHost::new(move |session| {
        if let Ok(mut n) = counter.lock() {
            *n += 1;
        }
        async move { session.send("hello") }
    });

    let err = BotTester::with_config(host, Config::default().without_default_address())
        .send_message_to_bot(
            Message::text("hi").with_address(Address::default_console()),
            ["hello"],
        )
        .send_message_to_bot("hi", ["hello"])
        .run_test()
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(1));
    assert!(matches!(err.cause(), Error::Configuration(_)));
    assert_eq!(*sent.lock().unwrap(), 0);
}

#[tokio::test]
async fn failing_step_stops_the_run() {
    let ran = Arc::new(Mutex::new(false));
    let witness = ran.clone();

    let err = BotTester::new(replies(&["hello"]))
        .set_timeout(Duration::from_millis(200))
        .send_message_to_bot("hi", ["goodbye"])
        .then(move || *witness.lock().unwrap() = true)
        .run_test()
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(0));
    assert!(!*ran.lock().unwrap());
}

#[tokio::test]
async fn config_loaded_from_json() {
    let config = Config::from_json_str(
        r#"{
            "timeout": 500,
            "ignoreTypingEvent": true,
            "defaultAddress": {
                "channelId": "console",
                "user": { "id": "customUser1", "name": "A" },
                "conversation": { "id": "customUser1Conversation" }
            }
        }"#,
    )
    .unwrap();

    let host = LocalHost::new(|session| async move {
        session.send_typing();
        let id = session.address().user_id().unwrap_or_default().to_string();
        session.send(id);
    });

    BotTester::with_config(host, config)
        .send_message_to_bot("who am i?", ["customUser1"])
        .run_test()
        .await
        .unwrap();
}

//! Room integration tests.
//!
//! These drive a served room through its public API and check the exact
//! lines each member's screen receives.

mod common;

use std::collections::HashMap;

use common::{start_room, TestClient, DEFAULT_TIMEOUT};
use roomcast::config::RoomConfig;
use roomcast::{parse_input, Identity, Message, Room, RoomError, UserConfig, NEWLINE};

#[tokio::test]
async fn test_room_join_announces_to_everyone() {
    let (room, _serve) = start_room(RoomConfig::default());

    let mut foo = TestClient::join(&room, "foo").await;
    foo.expect(&format!(" * foo joined. (Connected: 1){NEWLINE}"))
        .await;

    let mut bar = TestClient::join(&room, "bar").await;
    foo.expect(" * bar joined. (Connected: 2)\r\n").await;
    bar.expect(" * bar joined. (Connected: 2)\r\n").await;

    room.close();
}

#[tokio::test]
async fn test_room_system_and_emote() {
    let (room, _serve) = start_room(RoomConfig::default());
    let mut foo = TestClient::join(&room, "foo").await;
    foo.expect(" * foo joined. (Connected: 1)\r\n").await;

    room.send(Message::system("hello", "foo")).await.unwrap();
    foo.expect("-> hello\r\n").await;

    room.dispatch(parse_input("/me says hello.", "foo").unwrap())
        .await
        .unwrap();
    foo.expect("** foo says hello.\r\n").await;

    room.close();
}

#[tokio::test]
async fn test_join_name_taken() {
    let (room, _serve) = start_room(RoomConfig::default());
    let _foo = TestClient::join(&room, "foo").await;

    let identity = Identity::new("Foo").unwrap();
    let result = room.join(identity, tokio::io::sink()).await;
    assert!(matches!(result, Err(RoomError::NameTaken(name)) if name == "Foo"));
    assert_eq!(room.names().await.unwrap(), vec!["foo"]);

    room.close();
}

#[tokio::test]
async fn test_join_name_too_long() {
    let config = RoomConfig {
        max_name_length: 4,
        ..RoomConfig::default()
    };
    let (room, _serve) = start_room(config);

    let identity = Identity::new("toolong").unwrap();
    let result = room.join(identity, tokio::io::sink()).await;
    assert!(matches!(result, Err(RoomError::InvalidName)));

    room.close();
}

#[tokio::test]
async fn test_command_errors_reach_author_only() {
    let (room, _serve) = start_room(RoomConfig::default());
    let mut foo = TestClient::join(&room, "foo").await;
    foo.expect(" * foo joined. (Connected: 1)\r\n").await;
    let mut bar = TestClient::join(&room, "bar").await;
    foo.expect(" * bar joined. (Connected: 2)\r\n").await;
    bar.expect(" * bar joined. (Connected: 2)\r\n").await;

    room.send_input("foo", "/ignore baz").await.unwrap();
    foo.expect("-> Err: user not found: baz\r\n").await;

    room.send_input("foo", "/bogus").await.unwrap();
    foo.expect("-> Err: unknown command: bogus\r\n").await;

    // bar's next line is the chat that follows, so it saw neither error.
    room.send_input("foo", "ping").await.unwrap();
    foo.expect("foo: ping\r\n").await;
    bar.expect("foo: ping\r\n").await;

    room.close();
}

#[tokio::test]
async fn test_ignore() {
    let (room, _serve) = start_room(RoomConfig::default());

    let mut users = Vec::new();
    for i in 0..3 {
        users.push(TestClient::join(&room, &format!("user{i}")).await);
    }
    // Clear the join announcements.
    for (i, user) in users.iter_mut().enumerate() {
        for _ in i..3 {
            user.read_line().await;
        }
    }
    let mut other = users.pop().unwrap();
    let mut ignored = users.pop().unwrap();
    let mut ignorer = users.pop().unwrap();

    room.send_input("user0", "/ignore test").await.unwrap();
    ignorer.expect("-> Err: user not found: test\r\n").await;

    room.send_input("user0", "/ignore user1").await.unwrap();
    ignorer.expect("-> Ignoring: user1\r\n").await;

    room.send_input("user0", "/ignore user1").await.unwrap();
    ignorer
        .expect("-> Err: user already ignored: user1\r\n")
        .await;

    // Messages from the ignored user still reach everyone else.
    room.send_input("user1", "hello").await.unwrap();
    other.expect("user1: hello\r\n").await;
    ignored.expect("user1: hello\r\n").await;

    room.send_input("user1", "/me waves").await.unwrap();
    other.expect("** user1 waves\r\n").await;

    // The ignorer's next line is the listing, not the hello or the emote.
    room.send_input("user0", "/ignore").await.unwrap();
    ignorer.expect("-> 1 ignored: user1\r\n").await;

    room.send_input("user0", "/unignore user1").await.unwrap();
    ignorer.expect("-> No longer ignoring: user1\r\n").await;

    room.send_input("user0", "/ignore").await.unwrap();
    ignorer.expect("-> 0 users ignored.\r\n").await;

    room.send_input("user1", "hello again!").await.unwrap();
    ignorer.expect("user1: hello again!\r\n").await;

    room.close();
}

#[tokio::test]
async fn test_quiet_toggle_display_state() {
    let (room, _serve) = start_room(RoomConfig::default());
    let mut foo = TestClient::join(&room, "foo").await;
    foo.expect(" * foo joined. (Connected: 1)\r\n").await;

    room.send_input("foo", "/quiet").await.unwrap();
    foo.expect("-> Quiet mode is toggled ON\r\n").await;

    // Quiet mutes announcements but not chat.
    let mut bar = TestClient::join(&room, "bar").await;
    bar.expect(" * bar joined. (Connected: 2)\r\n").await;
    room.send_input("bar", "hi").await.unwrap();
    foo.expect("bar: hi\r\n").await;

    room.send_input("foo", "/quiet").await.unwrap();
    foo.expect("-> Quiet mode is toggled OFF\r\n").await;

    room.close();
}

#[tokio::test]
async fn test_set_config_quiet() {
    let (room, _serve) = start_room(RoomConfig::default());
    let mut foo =
        TestClient::join_with_config(&room, "foo", UserConfig { quiet: true }).await;

    room.set_config("foo", UserConfig { quiet: false })
        .await
        .unwrap();
    room.send(Message::announce("heard")).await.unwrap();
    foo.expect(" * heard\r\n").await;

    room.set_config("foo", UserConfig { quiet: true })
        .await
        .unwrap();
    room.send(Message::announce("muted")).await.unwrap();
    room.send(Message::system("hello", "foo")).await.unwrap();
    foo.expect("-> hello\r\n").await;

    let result = room.set_config("ghost", UserConfig::default()).await;
    assert!(matches!(result, Err(RoomError::UserNotFound(_))));

    room.close();
}

#[tokio::test]
async fn test_room_names() {
    let (room, _serve) = start_room(RoomConfig::default());
    let mut foo = TestClient::join(&room, "foo").await;
    foo.expect(" * foo joined. (Connected: 1)\r\n").await;

    room.send_input("foo", "/names").await.unwrap();
    foo.expect("-> 1 connected: foo\r\n").await;

    let _bar = TestClient::join(&room, "Bar").await;
    foo.expect(" * Bar joined. (Connected: 2)\r\n").await;
    room.send_input("foo", "/names").await.unwrap();
    foo.expect("-> 2 connected: Bar, foo\r\n").await;

    room.close();
}

#[tokio::test]
async fn test_private_message() {
    let (room, _serve) = start_room(RoomConfig::default());
    let mut foo = TestClient::join(&room, "foo").await;
    foo.expect(" * foo joined. (Connected: 1)\r\n").await;
    let mut bar = TestClient::join(&room, "bar").await;
    foo.expect(" * bar joined. (Connected: 2)\r\n").await;
    bar.expect(" * bar joined. (Connected: 2)\r\n").await;
    let mut baz = TestClient::join(&room, "baz").await;
    foo.expect(" * baz joined. (Connected: 3)\r\n").await;
    bar.expect(" * baz joined. (Connected: 3)\r\n").await;
    baz.expect(" * baz joined. (Connected: 3)\r\n").await;

    room.send_input("foo", "/msg bar meet at noon").await.unwrap();
    foo.expect("[PM to bar] meet at noon\r\n").await;
    bar.expect("[PM from foo] meet at noon\r\n").await;

    room.send_input("foo", "done").await.unwrap();
    baz.expect("foo: done\r\n").await;

    room.close();
}

#[tokio::test]
async fn test_leave_announces_and_closes_screen() {
    let (room, _serve) = start_room(RoomConfig::default());
    let mut foo = TestClient::join(&room, "foo").await;
    foo.expect(" * foo joined. (Connected: 1)\r\n").await;
    let mut bar = TestClient::join(&room, "bar").await;
    foo.expect(" * bar joined. (Connected: 2)\r\n").await;
    bar.expect(" * bar joined. (Connected: 2)\r\n").await;

    room.leave("bar").await.unwrap();
    foo.expect(" * bar left.\r\n").await;
    bar.expect_closed().await;

    let result = room.leave("bar").await;
    assert!(matches!(result, Err(RoomError::UserNotFound(_))));

    // The name is free again.
    let mut bar = TestClient::join(&room, "bar").await;
    foo.expect(" * bar joined. (Connected: 2)\r\n").await;
    bar.expect(" * bar joined. (Connected: 2)\r\n").await;

    room.close();
}

#[tokio::test]
async fn test_close_stops_serving_and_closes_screens() {
    let (room, serve) = start_room(RoomConfig::default());
    let mut foo = TestClient::join(&room, "foo").await;
    foo.expect(" * foo joined. (Connected: 1)\r\n").await;

    room.close();
    tokio::time::timeout(DEFAULT_TIMEOUT, serve)
        .await
        .expect("serve did not return")
        .unwrap()
        .unwrap();
    foo.expect_closed().await;

    let result = room.send(Message::announce("late")).await;
    assert!(matches!(result, Err(RoomError::RoomClosed)));
    let result = room.send_input("foo", "hello?").await;
    assert!(matches!(result, Err(RoomError::RoomClosed)));
    let result = room.join(Identity::new("bar").unwrap(), tokio::io::sink()).await;
    assert!(matches!(result, Err(RoomError::RoomClosed)));
}

#[tokio::test]
async fn test_close_unblocks_pending_send() {
    let config = RoomConfig {
        intake_capacity: 1,
        ..RoomConfig::default()
    };
    // Not served, so the intake queue fills up.
    let room = Room::new(config);
    room.send(Message::announce("first")).await.unwrap();

    let sender = room.clone();
    let pending = tokio::spawn(async move { sender.send(Message::announce("second")).await });
    tokio::task::yield_now().await;

    room.close();
    let result = tokio::time::timeout(DEFAULT_TIMEOUT, pending)
        .await
        .expect("send stayed blocked")
        .unwrap();
    assert!(matches!(result, Err(RoomError::RoomClosed)));
}

#[tokio::test]
async fn test_concurrent_senders_keep_order() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 50;

    let config = RoomConfig {
        mailbox_capacity: PRODUCERS * PER_PRODUCER + 8,
        ..RoomConfig::default()
    };
    let (room, _serve) = start_room(config);
    let mut watcher = TestClient::join(&room, "watcher").await;
    watcher
        .expect(" * watcher joined. (Connected: 1)\r\n")
        .await;

    let mut handles = Vec::new();
    for p in 0..PRODUCERS {
        let room = room.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..PER_PRODUCER {
                room.send(Message::public(i.to_string(), format!("p{p}")))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut next: HashMap<String, usize> = HashMap::new();
    for _ in 0..PRODUCERS * PER_PRODUCER {
        let line = watcher.read_line().await;
        let (from, body) = line
            .trim_end()
            .split_once(": ")
            .expect("public message line");
        let expected = next.entry(from.to_string()).or_insert(0);
        assert_eq!(body, expected.to_string(), "out of order from {from}");
        *expected += 1;
    }
    assert!(next.values().all(|&count| count == PER_PRODUCER));

    room.close();
}

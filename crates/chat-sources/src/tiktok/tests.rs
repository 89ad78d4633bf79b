use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chat_bus::EventBus;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_util::sync::CancellationToken;

use super::connection::{FrameAction, handle_frame, run_session};
use super::*;
use crate::{Phase, SessionContext};

fn context(bus: &EventBus) -> SessionContext {
    SessionContext::new(Platform::TikTok, bus.publisher(), CancellationToken::new())
}

fn comment_dispatcher(bus: &EventBus) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher.on(EVENT_COMMENT, CommentSink::new(bus.publisher()));
    dispatcher
}

#[test]
fn comment_is_published() {
    let bus = EventBus::new();
    let dispatcher = comment_dispatcher(&bus);
    let data = json!({"user": {"nickname": "Carol", "uniqueId": "carol99"}, "comment": "nice stream"});

    assert_eq!(dispatcher.dispatch(EVENT_COMMENT, &data), 1);
    let events = bus.drain_all();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].platform(), Platform::TikTok);
    assert_eq!(events[0].author(), "Carol");
    assert_eq!(events[0].text(), "nice stream");
}

#[test]
fn comment_without_nickname_is_dropped() {
    let bus = EventBus::new();
    let dispatcher = comment_dispatcher(&bus);

    for data in [
        json!({"user": {}, "comment": "hi"}),
        json!({"comment": "hi"}),
        json!({"user": {"nickname": 42}, "comment": "hi"}),
        json!({"user": {"nickname": "dave"}}),
        json!(null),
    ] {
        assert_eq!(dispatcher.dispatch(EVENT_COMMENT, &data), 0);
    }
    assert!(bus.is_empty());
    assert!(matches!(
        parse_comment(&json!({"comment": "hi"})),
        Err(SourceError::Malformed(_))
    ));
}

#[test]
fn panicking_handler_does_not_stop_dispatch() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut dispatcher = Dispatcher::new();
    dispatcher
        .on(EVENT_COMMENT, |_: &Value| -> Result<(), SourceError> {
            panic!("handler bug")
        })
        .on(EVENT_COMMENT, CommentSink::new(bus.publisher()))
        .on(EVENT_COMMENT, move |_: &Value| -> Result<(), SourceError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

    let data = json!({"user": {"nickname": "erin"}, "comment": "first"});
    assert_eq!(dispatcher.dispatch(EVENT_COMMENT, &data), 2);
    let data = json!({"user": {"nickname": "erin"}, "comment": "second"});
    assert_eq!(dispatcher.dispatch(EVENT_COMMENT, &data), 2);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(bus.drain_all().len(), 2);
}

#[test]
fn unregistered_event_is_ignored() {
    let bus = EventBus::new();
    let dispatcher = comment_dispatcher(&bus);
    assert_eq!(dispatcher.dispatch("gift", &json!({"giftId": 5655})), 0);
    assert!(!dispatcher.handles("gift"));
}

#[test]
fn frames_drive_phase_and_stream_end() {
    let bus = EventBus::new();
    let dispatcher = comment_dispatcher(&bus);
    let mut ctx = context(&bus);

    assert!(matches!(
        handle_frame("{not json", &dispatcher, &mut ctx),
        FrameAction::Continue
    ));
    assert_eq!(ctx.phase(), Phase::Connecting);

    handle_frame(r#"{"event":"connected","data":{"roomId":"7"}}"#, &dispatcher, &mut ctx);
    assert_eq!(ctx.phase(), Phase::Streaming);

    handle_frame(
        r#"{"event":"comment","data":{"user":{"nickname":"frank"},"comment":"yo"}}"#,
        &dispatcher,
        &mut ctx,
    );
    assert_eq!(bus.drain_all().len(), 1);

    assert!(matches!(
        handle_frame(r#"{"event":"streamEnd"}"#, &dispatcher, &mut ctx),
        FrameAction::End(_)
    ));
}

#[test]
fn connect_url_carries_unique_id() {
    let config = WebcastConfig {
        relay_url: "ws://127.0.0.1:8081/webcast".into(),
        unique_id: "@some_creator".into(),
    };
    assert_eq!(
        config.connect_url().unwrap(),
        "ws://127.0.0.1:8081/webcast?uniqueId=some_creator"
    );

    let missing = WebcastConfig {
        relay_url: "ws://127.0.0.1:8081/webcast".into(),
        unique_id: " ".into(),
    };
    assert!(missing.connect_url().unwrap_err().is_auth_error());
}

#[tokio::test]
async fn session_answers_ping_and_publishes_comments() {
    let (client_io, server_io) = tokio::io::duplex(8192);
    let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
    let mut server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;

    let bus = EventBus::new();
    let dispatcher = comment_dispatcher(&bus);
    let shutdown = CancellationToken::new();
    let mut ctx = SessionContext::new(Platform::TikTok, bus.publisher(), shutdown.clone());
    let task = tokio::spawn(async move { run_session(client, &dispatcher, &mut ctx).await });

    server
        .send(Message::text(r#"{"event":"connected"}"#))
        .await
        .unwrap();
    server
        .send(Message::text(
            r#"{"event":"comment","data":{"user":{"nickname":"gina"},"comment":"hello: there"}}"#,
        ))
        .await
        .unwrap();
    server
        .send(Message::Ping(b"keepalive".to_vec().into()))
        .await
        .unwrap();

    let reply = server.next().await.unwrap().unwrap();
    assert_eq!(reply, Message::Pong(b"keepalive".to_vec().into()));
    let events = bus.drain_all();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].text(), "hello: there");

    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn stream_end_closes_session() {
    let (client_io, server_io) = tokio::io::duplex(8192);
    let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
    let mut server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;

    let bus = EventBus::new();
    let dispatcher = comment_dispatcher(&bus);
    let mut ctx = context(&bus);
    let task = tokio::spawn(async move { run_session(client, &dispatcher, &mut ctx).await });

    server
        .send(Message::text(r#"{"event":"streamEnd"}"#))
        .await
        .unwrap();
    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, SourceError::Closed(_)));
    assert!(!err.is_auth_error());
}

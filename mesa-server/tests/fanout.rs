//! 广播通道端到端测试：HTTP 接口 → 消息总线 → 观察端
//!
//! 覆盖进程内订阅 (broadcast receiver) 和 TCP 观察端两条路径。

use axum::body::Body;
use axum::{Router, middleware};
use http::{Request, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tower::ServiceExt;

use mesa_server::auth::identity_middleware;
use mesa_server::core::build_app;
use mesa_server::message::{BusMessage, EventType};
use mesa_server::{Config, ServerState};
use shared::message::{
    HandshakePayload, PROTOCOL_VERSION, ResponsePayload, TableAction, TableEventPayload,
};

async fn test_state() -> ServerState {
    let config = Config::with_overrides("/tmp/mesa-test", 0, 0);
    ServerState::initialize_in_memory(&config)
        .await
        .expect("in-memory state")
}

fn app(state: ServerState) -> Router {
    build_app()
        .layer(middleware::from_fn(identity_middleware))
        .with_state(state)
}

fn create_body(table_no: u32) -> Body {
    Body::from(
        serde_json::json!({
            "table_no": table_no,
            "capacity": 4,
            "cost_person": 100,
            "restaurant": "restaurant:r1",
            "floor_type": "indoor",
            "position": { "x": 1, "y": 1, "align": "horizontal" }
        })
        .to_string(),
    )
}

fn post_create(table_no: u32, with_user: bool) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri("/api/tables")
        .header("content-type", "application/json");
    let builder = if with_user {
        builder
            .header("x-user-id", "u1")
            .header("x-user-name", "Ada")
    } else {
        builder
    };
    builder.body(create_body(table_no)).unwrap()
}

#[tokio::test]
async fn create_endpoint_emits_add_event_with_actor() {
    let state = test_state().await;
    let mut rx = state.message_bus.subscribe();
    let app = app(state);

    let response = app.oneshot(post_create(5, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let msg = rx.recv().await.unwrap();
    assert_eq!(msg.event_type, EventType::TableEvent);
    let payload: TableEventPayload = msg.parse_payload().unwrap();
    assert_eq!(payload.action, TableAction::Add);
    assert_eq!(payload.actor, "Ada");
    assert_eq!(payload.resource, "dining_table");
    assert_eq!(payload.version, 1);
    assert!(payload.id.is_some());
    assert_eq!(payload.data.as_ref().unwrap()["table_no"], 5);
}

#[tokio::test]
async fn anonymous_request_emits_empty_actor() {
    let state = test_state().await;
    let mut rx = state.message_bus.subscribe();
    let app = app(state);

    let response = app.oneshot(post_create(5, false)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload: TableEventPayload = rx.recv().await.unwrap().parse_payload().unwrap();
    assert_eq!(payload.actor, "");
}

#[tokio::test]
async fn read_endpoints_emit_events_too() {
    let state = test_state().await;
    let app = app(state.clone());

    let response = app
        .clone()
        .oneshot(post_create(5, true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut rx = state.message_bus.subscribe();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/tables?page=1&limit=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload: TableEventPayload = rx.recv().await.unwrap().parse_payload().unwrap();
    assert_eq!(payload.action, TableAction::GetAll);
    // 版本号跨操作单调递增
    assert_eq!(payload.version, 2);
}

#[tokio::test]
async fn responses_are_identical_with_or_without_observers() {
    let state = test_state().await;
    let app = app(state);

    // 没有任何观察端连接：发布是空操作，请求照常成功
    let response = app.clone().oneshot(post_create(5, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let table: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(table["table_no"], 5);
    assert_eq!(table["booking_status"], false);
}

#[tokio::test]
async fn duplicate_create_maps_to_conflict_status() {
    let state = test_state().await;
    let app = app(state);

    let first = app.clone().oneshot(post_create(5, true)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(post_create(5, true)).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = axum::body::to_bytes(second.into_body(), usize::MAX)
        .await
        .unwrap();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["code"], "E0004");
}

#[tokio::test]
async fn delete_unknown_table_returns_404_without_event() {
    let state = test_state().await;
    let mut rx = state.message_bus.subscribe();
    let app = app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/tables/dining_table:missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // 失败的删除不产生事件
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn invalid_payload_is_rejected_before_the_store() {
    let state = test_state().await;
    let app = app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tables")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "table_no": 5,
                        "capacity": 0,
                        "cost_person": 100,
                        "restaurant": "restaurant:r1",
                        "floor_type": "indoor"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== TCP 观察端 ==========

async fn write_frame(stream: &mut TcpStream, msg: &BusMessage) {
    let bytes = msg.to_bytes().unwrap();
    stream
        .write_all(&(bytes.len() as u32).to_be_bytes())
        .await
        .unwrap();
    stream.write_all(&bytes).await.unwrap();
    stream.flush().await.unwrap();
}

async fn read_frame(stream: &mut TcpStream) -> BusMessage {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.unwrap();
    let mut buf = vec![0u8; u32::from_be_bytes(len_buf) as usize];
    stream.read_exact(&mut buf).await.unwrap();
    BusMessage::from_bytes(&buf).unwrap()
}

#[tokio::test]
async fn tcp_observer_handshakes_and_receives_events() {
    let port = 20000 + (rand::random::<u16>() % 20000);
    let config = Config::with_overrides("/tmp/mesa-test", 0, port);
    let state = ServerState::initialize_in_memory(&config).await.unwrap();

    state.start_background_tasks();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

    // 握手
    write_frame(
        &mut stream,
        &BusMessage::handshake(&HandshakePayload {
            version: PROTOCOL_VERSION,
            client_name: Some("test-observer".to_string()),
            client_id: Some("obs-1".to_string()),
        }),
    )
    .await;

    let reply = read_frame(&mut stream).await;
    assert_eq!(reply.event_type, EventType::Response);
    let ack: ResponsePayload = reply.parse_payload().unwrap();
    assert!(ack.success);

    // 等 forwarder 订阅完毕再广播
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(state.message_bus.get_connected_clients().len(), 1);

    state.broadcast_table_event(
        "Ada".to_string(),
        TableAction::Add,
        Some("dining_table:t1".to_string()),
        Some(&serde_json::json!({ "table_no": 5 })),
    );

    let msg = read_frame(&mut stream).await;
    assert_eq!(msg.event_type, EventType::TableEvent);
    let payload: TableEventPayload = msg.parse_payload().unwrap();
    assert_eq!(payload.action, TableAction::Add);
    assert_eq!(payload.actor, "Ada");

    state.message_bus.shutdown();
}

#[tokio::test]
async fn tcp_observer_with_wrong_version_is_rejected() {
    let port = 20000 + (rand::random::<u16>() % 20000);
    let config = Config::with_overrides("/tmp/mesa-test", 0, port);
    let state = ServerState::initialize_in_memory(&config).await.unwrap();

    state.start_background_tasks();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    write_frame(
        &mut stream,
        &BusMessage::handshake(&HandshakePayload {
            version: PROTOCOL_VERSION + 1,
            client_name: None,
            client_id: None,
        }),
    )
    .await;

    let reply = read_frame(&mut stream).await;
    let ack: ResponsePayload = reply.parse_payload().unwrap();
    assert!(!ack.success);

    state.message_bus.shutdown();
}

//! TCP 服务器实现
//!
//! 负责处理 TCP 观察端连接，包括：
//! - 监听连接
//! - 协议握手验证
//! - 事件转发 (含落后重同步)
//!
//! 观察端是只读的：除握手外的任何入站消息都会被丢弃。

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use shared::message::{
    BusMessage, EventType, HandshakePayload, NotificationPayload, PROTOCOL_VERSION, ResponsePayload,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::bus::MessageBus;
use super::transport::{TcpTransport, Transport};
use crate::utils::AppError;

impl MessageBus {
    /// Start the TCP server for network observers
    ///
    /// 1. Accepts connections
    /// 2. Performs the protocol handshake
    /// 3. Forwards every broadcast message to the observer
    /// 4. Gracefully shuts down on cancellation signal
    pub async fn start_tcp_server(&self) -> Result<(), AppError> {
        let listener = TcpListener::bind(&self.config.tcp_listen_addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind: {}", e)))?;

        tracing::info!(
            "Message bus TCP server listening on {}",
            self.config.tcp_listen_addr
        );

        self.accept_loop(listener).await
    }

    /// Main accept loop
    async fn accept_loop(&self, listener: TcpListener) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = self.shutdown_token().cancelled() => {
                    tracing::info!("Message bus TCP server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Observer connected: {}", addr);
                            self.spawn_observer_handler(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Spawn a new task to handle an observer connection
    fn spawn_observer_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let server_tx = self.sender().clone();
        let shutdown_token = self.shutdown_token().clone();
        let clients = self.clients.clone();

        tokio::spawn(async move {
            if let Err(e) =
                handle_observer_connection(stream, addr, server_tx, shutdown_token, clients).await
            {
                tracing::debug!("Observer {} handler finished: {}", addr, e);
            }
        });
    }
}

/// Handle a single observer connection
async fn handle_observer_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: broadcast::Sender<BusMessage>,
    shutdown_token: CancellationToken,
    clients: Arc<DashMap<String, Arc<dyn Transport>>>,
) -> Result<(), AppError> {
    let transport: Arc<dyn Transport> = Arc::new(TcpTransport::from_stream(stream));

    // Protocol handshake
    let client_id = perform_handshake(&transport, addr).await?;

    // Register observer
    clients.insert(client_id.clone(), transport.clone());
    tracing::debug!("Observer registered: {}", client_id);

    // 断开检测 token：读循环发现断开后通知 forwarder 停止
    let disconnect_token = CancellationToken::new();

    let forward_handle = spawn_forwarder(
        transport.clone(),
        server_tx.subscribe(),
        shutdown_token.clone(),
        client_id.clone(),
        disconnect_token.clone(),
    );

    // 读循环只为检测断开；观察端是只读的，入站消息一律丢弃
    drain_observer_messages(&transport, &shutdown_token, &client_id, disconnect_token).await;

    // Cleanup
    drop(forward_handle);
    let _ = transport.close().await;
    clients.remove(&client_id);
    tracing::debug!(client_id = %client_id, "Observer removed from registry");

    Ok(())
}

/// Perform protocol handshake with the observer
async fn perform_handshake(
    transport: &Arc<dyn Transport>,
    addr: SocketAddr,
) -> Result<String, AppError> {
    tracing::debug!("Waiting for handshake from {}", addr);

    let msg = transport.read_message().await.map_err(|e| {
        tracing::warn!("Observer {} handshake error: {}", addr, e);
        e
    })?;

    if msg.event_type != EventType::Handshake {
        tracing::warn!(
            "Observer {} failed to handshake: expected Handshake, got {}",
            addr,
            msg.event_type
        );
        return Err(AppError::invalid("Expected Handshake message"));
    }

    let payload: HandshakePayload = msg.parse_payload().map_err(|e| {
        tracing::warn!("Observer {} sent invalid handshake payload: {}", addr, e);
        AppError::invalid(format!("Invalid handshake payload: {}", e))
    })?;

    // Version check
    if payload.version != PROTOCOL_VERSION {
        tracing::warn!(
            "Observer {} protocol version mismatch: expected {}, got {}",
            addr,
            PROTOCOL_VERSION,
            payload.version
        );

        send_handshake_error(
            transport,
            &msg,
            &format!(
                "Protocol version mismatch: server={}, client={}. Please update your client.",
                PROTOCOL_VERSION, payload.version
            ),
        )
        .await;

        return Err(AppError::invalid("Protocol version mismatch"));
    }

    let client_id = payload
        .client_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::debug!(
        "Observer {} handshake success (v{}, client: {:?}, id: {})",
        addr,
        payload.version,
        payload.client_name,
        client_id
    );

    // 发送握手响应 (correlation_id 关联观察端的 request_id)
    let response_payload = ResponsePayload::success(format!("Connected as observer: {client_id}"));
    let response = BusMessage::response(&response_payload).with_correlation_id(msg.request_id);
    if let Err(e) = transport.write_message(&response).await {
        tracing::warn!("Failed to send handshake response: {}", e);
    }

    Ok(client_id)
}

/// Delay before closing the connection after sending an error
/// (allows the observer to receive the message)
const HANDSHAKE_ERROR_DELAY_MS: u64 = 100;

/// Send a handshake error to the observer
async fn send_handshake_error(transport: &Arc<dyn Transport>, msg: &BusMessage, message: &str) {
    let response_payload = ResponsePayload::error(message, None);
    let response = BusMessage::response(&response_payload).with_correlation_id(msg.request_id);

    if let Err(e) = transport.write_message(&response).await {
        tracing::error!("Failed to send handshake error: {}", e);
    }

    tokio::time::sleep(tokio::time::Duration::from_millis(HANDSHAKE_ERROR_DELAY_MS)).await;
}

/// Spawn the task that forwards broadcast messages to one observer
fn spawn_forwarder(
    transport: Arc<dyn Transport>,
    mut rx: broadcast::Receiver<BusMessage>,
    shutdown_token: CancellationToken,
    client_id: String,
    disconnect_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    tracing::debug!("Observer {} forwarder shutting down", client_id);
                    break;
                }
                _ = disconnect_token.cancelled() => {
                    tracing::debug!(client_id = %client_id, "Observer disconnected, forwarder stopping");
                    break;
                }
                msg_result = rx.recv() => {
                    match msg_result {
                        Ok(msg) => {
                            // Unicast filtering: only send if target matches or no target
                            if msg.target.as_ref().is_some_and(|target| target != &client_id) {
                                continue;
                            }

                            if let Err(e) = transport.write_message(&msg).await {
                                tracing::debug!(client_id = %client_id, "Observer write failed: {}", e);
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // 观察端掉队：发重同步提示，不断开连接
                            tracing::warn!(
                                client_id = %client_id,
                                dropped_messages = n,
                                "Observer lagged behind, sending resync notification"
                            );

                            let payload = NotificationPayload::warning(
                                "resync",
                                "Events were dropped, refresh your table view",
                            )
                            .with_data(serde_json::json!({ "dropped_messages": n }));
                            let resync = BusMessage::notification(&payload)
                                .with_target(&client_id);

                            if let Err(e) = transport.write_message(&resync).await {
                                tracing::debug!(client_id = %client_id, "Failed to send resync notification: {}", e);
                                break;
                            }

                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::debug!(client_id = %client_id, "Broadcast channel closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::debug!(client_id = %client_id, "Observer forwarder stopped");
    })
}

/// Read from the observer until it disconnects, dropping anything it sends
async fn drain_observer_messages(
    transport: &Arc<dyn Transport>,
    shutdown_token: &CancellationToken,
    client_id: &str,
    disconnect_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                break;
            }

            read_result = transport.read_message() => {
                match read_result {
                    Ok(msg) => {
                        // 只读通道：观察端不应该发业务消息
                        tracing::debug!(
                            client_id = %client_id,
                            event_type = %msg.event_type,
                            "Observer sent a message on a listen-only channel, dropping"
                        );
                    }
                    Err(_) => {
                        tracing::debug!(client_id = %client_id, "Observer disconnected");
                        disconnect_token.cancel();
                        break;
                    }
                }
            }
        }
    }
}

//! Transport layer abstraction for the message bus
//!
//! 帧格式：4 字节大端长度 + JSON 编码的 [`BusMessage`]。

use async_trait::async_trait;
use shared::message::BusMessage;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, broadcast};

use crate::utils::AppError;

/// 单帧最大字节数，防御坏长度字段
const MAX_FRAME_BYTES: u32 = 1024 * 1024;

// ========== Transport Trait ==========

#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn read_message(&self) -> Result<BusMessage, AppError>;
    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError>;
    async fn close(&self) -> Result<(), AppError>;

    /// 对端地址 (网络传输才有)
    fn peer_addr(&self) -> Option<String> {
        None
    }
}

// ========== Framing helpers ==========

async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<BusMessage, AppError> {
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| AppError::internal(format!("Connection closed: {e}")))?;

    let len = u32::from_be_bytes(len_buf);
    if len == 0 || len > MAX_FRAME_BYTES {
        return Err(AppError::invalid(format!("Invalid frame length: {len}")));
    }

    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| AppError::internal(format!("Read frame failed: {e}")))?;

    BusMessage::from_bytes(&buf).map_err(|e| AppError::invalid(format!("Malformed frame: {e}")))
}

async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), AppError> {
    let bytes = msg
        .to_bytes()
        .map_err(|e| AppError::internal(format!("Serialize frame failed: {e}")))?;
    let len = bytes.len() as u32;
    if len > MAX_FRAME_BYTES {
        return Err(AppError::invalid(format!("Frame too large: {len}")));
    }

    writer
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| AppError::internal(format!("Write frame failed: {e}")))?;
    writer
        .write_all(&bytes)
        .await
        .map_err(|e| AppError::internal(format!("Write frame failed: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| AppError::internal(format!("Flush failed: {e}")))?;
    Ok(())
}

// ========== TCP Transport ==========

/// TCP 明文传输 (网络观察端)
#[derive(Debug)]
pub struct TcpTransport {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    peer: Option<String>,
}

impl TcpTransport {
    pub fn from_stream(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok().map(|a| a.to_string());
        let (reader, writer) = stream.into_split();
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            peer,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read_message(&self) -> Result<BusMessage, AppError> {
        let mut reader = self.reader.lock().await;
        read_frame(&mut *reader).await
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, msg).await
    }

    async fn close(&self) -> Result<(), AppError> {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
        Ok(())
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer.clone()
    }
}

// ========== Memory Transport ==========

/// 同进程内存传输 (测试或进程内观察端)
///
/// 读取直接挂在广播通道上，写入等价于向总线发布。
#[derive(Debug)]
pub struct MemoryTransport {
    rx: Mutex<broadcast::Receiver<BusMessage>>,
    tx: broadcast::Sender<BusMessage>,
}

impl MemoryTransport {
    pub(crate) fn new(tx: &broadcast::Sender<BusMessage>) -> Self {
        Self {
            rx: Mutex::new(tx.subscribe()),
            tx: tx.clone(),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<BusMessage, AppError> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .map_err(|e| AppError::internal(format!("Broadcast channel error: {e}")))
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError> {
        self.tx
            .send(msg.clone())
            .map(|_| ())
            .map_err(|e| AppError::internal(format!("Broadcast send failed: {e}")))
    }

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }
}

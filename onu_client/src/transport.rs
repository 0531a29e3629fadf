use std::collections::VecDeque;

use anyhow::{anyhow, bail, Context};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use onu_core::{AckId, ChannelError, ClientCall, ClientEmit, Inbound, Remote};

use crate::socketio::{self, Frame, Handshake, Packet};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 把配置里的地址换成 Socket.IO 的 WebSocket 入口
pub fn endpoint(base: &Url) -> anyhow::Result<Url> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => bail!("unsupported url scheme `{}`", other),
    };
    let mut url = base.clone();
    url.set_scheme(scheme).map_err(|_| anyhow!("cannot use scheme `{}` for {}", scheme, base))?;
    url.set_path(&format!("{}/socket.io/", base.path().trim_end_matches('/')));
    url.set_query(Some("EIO=4&transport=websocket"));
    url.set_fragment(None);
    Ok(url)
}

/// Socket.IO 连接。
///
/// 读写各由一个后台任务负责：读任务自己回应心跳，
/// 因此分发循环阻塞在玩家输入上时连接也不会超时。
pub struct SocketIo {
    outbound: mpsc::Sender<Frame>,
    inbound: mpsc::UnboundedReceiver<Packet>,
    // 等待应答期间收到的推送事件
    queued: VecDeque<Inbound>,
    next_ack: AckId,
}

impl SocketIo {
    pub async fn connect(base: &Url) -> anyhow::Result<SocketIo> {
        let url = endpoint(base)?;
        info!("正在连接到: {}", url);
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("could not connect to {}", url))?;
        let (mut write, mut read) = ws_stream.split();

        let handshake: Handshake = loop {
            match next_frame(&mut read).await? {
                Frame::Open(handshake) => break handshake,
                other => debug!("握手前忽略帧: {:?}", other),
            }
        };
        debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "Engine.IO 握手完成");

        send_frame(&mut write, &Frame::Message(Packet::Connect(None))).await?;
        loop {
            match next_frame(&mut read).await? {
                Frame::Message(Packet::Connect(_)) => break,
                Frame::Message(Packet::ConnectError(reason)) => {
                    bail!("server refused the connection: {}", reason)
                }
                Frame::Ping(data) => send_frame(&mut write, &Frame::Pong(data)).await?,
                other => debug!("等待连接确认时忽略帧: {:?}", other),
            }
        }
        info!("连接成功!");

        let (out_tx, out_rx) = mpsc::channel::<Frame>(64);
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Packet>();
        tokio::spawn(write_loop(write, out_rx));
        tokio::spawn(read_loop(read, in_tx, out_tx.clone()));

        Ok(SocketIo::from_channels(out_tx, in_rx))
    }

    fn from_channels(outbound: mpsc::Sender<Frame>, inbound: mpsc::UnboundedReceiver<Packet>) -> SocketIo {
        SocketIo { outbound, inbound, queued: VecDeque::new(), next_ack: 0 }
    }

    async fn send(&self, packet: Packet) -> Result<(), ChannelError> {
        self.outbound.send(Frame::Message(packet)).await.map_err(|_| ChannelError::Closed)
    }
}

impl Remote for SocketIo {
    async fn next_event(&mut self) -> Result<Option<Inbound>, ChannelError> {
        if let Some(inbound) = self.queued.pop_front() {
            return Ok(Some(inbound));
        }
        while let Some(packet) = self.inbound.recv().await {
            match packet {
                Packet::Event { id, name, args } => return Ok(Some(Inbound { name, args, ack: id })),
                Packet::Ack { id, .. } => warn!("丢弃没有对应请求的应答 {}", id),
                Packet::ConnectError(reason) => return Err(ChannelError::Transport(reason.to_string())),
                other => debug!("忽略包: {:?}", other),
            }
        }
        Ok(None)
    }

    async fn call(&mut self, call: &ClientCall) -> Result<Vec<Value>, ChannelError> {
        let id = self.next_ack;
        self.next_ack += 1;
        debug!(call = call.name(), id, "发出请求");
        self.send(Packet::Event { id: Some(id), name: call.name().to_string(), args: call.args() }).await?;

        while let Some(packet) = self.inbound.recv().await {
            match packet {
                Packet::Ack { id: got, args } if got == id => return Ok(args),
                Packet::Ack { id: got, .. } => warn!("丢弃没有对应请求的应答 {}", got),
                Packet::Event { id, name, args } => self.queued.push_back(Inbound { name, args, ack: id }),
                Packet::ConnectError(reason) => return Err(ChannelError::Transport(reason.to_string())),
                other => debug!("忽略包: {:?}", other),
            }
        }
        Err(ChannelError::Closed)
    }

    async fn emit(&mut self, emit: ClientEmit) -> Result<(), ChannelError> {
        debug!(emit = emit.name(), "发出消息");
        self.send(Packet::Event { id: None, name: emit.name().to_string(), args: vec![] }).await
    }

    async fn acknowledge(&mut self, ack: AckId) -> Result<(), ChannelError> {
        self.send(Packet::Ack { id: ack, args: vec![] }).await
    }
}

/// 握手阶段读取下一个文本帧
async fn next_frame(read: &mut SplitStream<WsStream>) -> anyhow::Result<Frame> {
    while let Some(msg) = read.next().await {
        match msg.context("websocket error during handshake")? {
            Message::Text(text) => return Ok(socketio::decode(text.as_str())?),
            Message::Close(_) => break,
            _ => {}
        }
    }
    bail!("connection closed during handshake")
}

async fn send_frame(write: &mut SplitSink<WsStream, Message>, frame: &Frame) -> anyhow::Result<()> {
    write.send(Message::Text(frame.encode().into())).await.context("failed to send frame")
}

/// 读任务：回应心跳，其余的包交给分发一侧
async fn read_loop(
    mut read: SplitStream<WsStream>,
    inbound: mpsc::UnboundedSender<Packet>,
    outbound: mpsc::Sender<Frame>,
) {
    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("接收消息时出错: {}", e);
                break;
            }
        };
        match socketio::decode(text.as_str()) {
            Ok(Frame::Ping(data)) => {
                if outbound.send(Frame::Pong(data)).await.is_err() {
                    break;
                }
            }
            Ok(Frame::Close) | Ok(Frame::Message(Packet::Disconnect)) => break,
            Ok(Frame::Message(Packet::Unsupported(raw))) => debug!("忽略不支持的包: {}", raw),
            Ok(Frame::Message(packet)) => {
                if inbound.send(packet).is_err() {
                    break;
                }
            }
            Ok(other) => debug!("忽略帧: {:?}", other),
            Err(e) => warn!("解析服务器消息失败: {}", e),
        }
    }
    info!("服务器连接已关闭");
}

/// 写任务：把通道里的帧依次写入 WebSocket
async fn write_loop(mut write: SplitSink<WsStream, Message>, mut outbound: mpsc::Receiver<Frame>) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = write.send(Message::Text(frame.encode().into())).await {
            // 发送失败，说明连接已断开，退出任务
            warn!("发送消息失败: {}", e);
            break;
        }
    }
    let _ = write.close().await;
}

//! 与服务器之间的事件通道约定。
//!
//! 具体传输（WebSocket、握手、心跳）由上层实现，这里只规定两种交互方式：
//! - 推送事件：服务器主动下发，按到达顺序逐个交给分发循环；
//! - 关联请求：客户端发出请求，恰好收到一次与之匹配的应答。
//!
//! 请求等待应答期间到达的推送事件由实现方缓存，之后按原顺序从
//! [`Remote::next_event`] 返回。实现方不做重连，也不做自动重试。

use crate::error::ChannelError;
use crate::message::{AckId, ClientCall, ClientEmit};
use serde_json::Value;

/// 一条尚未解析的推送事件
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub name: String,
    pub args: Vec<Value>,
    /// 服务器要求确认时带上的编号
    pub ack: Option<AckId>,
}

impl Inbound {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Inbound {
        Inbound { name: name.into(), args, ack: None }
    }

    pub fn with_ack(mut self, ack: AckId) -> Inbound {
        self.ack = Some(ack);
        self
    }
}

#[allow(async_fn_in_trait)]
pub trait Remote {
    /// 下一条推送事件；连接关闭时返回 `None`
    async fn next_event(&mut self) -> Result<Option<Inbound>, ChannelError>;

    /// 发出关联请求并等待唯一的应答，返回应答参数。
    /// 没有内置超时，需要超时的调用方自行包装。
    async fn call(&mut self, call: &ClientCall) -> Result<Vec<Value>, ChannelError>;

    async fn emit(&mut self, emit: ClientEmit) -> Result<(), ChannelError>;

    /// 应答服务器发起的确认请求
    async fn acknowledge(&mut self, ack: AckId) -> Result<(), ChannelError>;
}

//! # Onu 客户端核心库
//!
//! 这个 `core` crate 包含客户端一侧的会话状态机、出牌回合协议、
//! 卡牌的展示排序，以及与服务器通信的消息定义。
//! 网络传输和终端界面通过 [`Remote`]、[`Presenter`]、[`Prompter`]
//! 三个 trait 接入，与具体实现解耦，便于单独测试。

mod card;
mod channel;
mod error;
mod logic;
mod message;
mod state;
mod view;

pub use card::*;

pub use channel::*;

pub use error::*;

pub use logic::*;

pub use message::*;

pub use state::*;

pub use view::*;

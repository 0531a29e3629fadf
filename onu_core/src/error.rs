use thiserror::Error;

/// 载荷或响应的形状与约定不符
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("event `{event}` carries no payload")]
    MissingPayload { event: &'static str },
    #[error("event `{event}` has a malformed payload: {source}")]
    BadPayload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{call}` returned an unexpected response: {detail}")]
    BadResponse { call: &'static str, detail: String },
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection closed")]
    Closed,
    #[error("`{call}` failed: {reason}")]
    Remote { call: &'static str, reason: String },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChannelError {
    /// 连接层面的错误，分发循环无法继续
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChannelError::Closed | ChannelError::Transport(_))
    }
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt interrupted")]
    Interrupted,
    #[error("choice {0} is out of range")]
    InvalidChoice(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("There was an error joining the lobby: {0}")]
    JoinRejected(String),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

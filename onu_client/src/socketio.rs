//! Engine.IO v4 / Socket.IO v5 文本帧的编解码，只支持默认命名空间。
//!
//! 一帧 Engine.IO 数据以一位类型数字开头，`4`(message) 的内容是一个 Socket.IO 包：
//! `<类型>[<附件数>-][<命名空间>,][<应答编号>][JSON]`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty frame")]
    Empty,
    #[error("unknown packet type `{0}`")]
    UnknownType(char),
    #[error("malformed packet `{raw}`: {detail}")]
    Malformed { raw: String, detail: String },
}

/// 服务器在 open 包中下发的握手参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// Engine.IO 层的帧
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(Packet),
    Upgrade,
    Noop,
}

/// Socket.IO 层的包
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Connect(Option<Value>),
    Disconnect,
    Event { id: Option<u64>, name: String, args: Vec<Value> },
    Ack { id: u64, args: Vec<Value> },
    ConnectError(Value),
    /// 其他命名空间或带二进制附件的包，原样保留以便记录
    Unsupported(String),
}

pub fn decode(text: &str) -> Result<Frame, CodecError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let body = chars.as_str();
    let frame = match kind {
        '0' => Frame::Open(serde_json::from_str(body).map_err(|e| malformed(text, e))?),
        '1' => Frame::Close,
        '2' => Frame::Ping(body.to_string()),
        '3' => Frame::Pong(body.to_string()),
        '4' => Frame::Message(decode_packet(body)?),
        '5' => Frame::Upgrade,
        '6' => Frame::Noop,
        other => return Err(CodecError::UnknownType(other)),
    };
    Ok(frame)
}

fn decode_packet(text: &str) -> Result<Packet, CodecError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    if matches!(kind, '5' | '6') {
        return Ok(Packet::Unsupported(text.to_string()));
    }
    let mut rest = chars.as_str();

    if rest.starts_with('/') {
        let (namespace, tail) = rest.split_once(',').unwrap_or((rest, ""));
        if namespace != "/" {
            return Ok(Packet::Unsupported(text.to_string()));
        }
        rest = tail;
    }

    let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let id = match &rest[..digits] {
        "" => None,
        n => Some(n.parse::<u64>().map_err(|e| malformed(text, e))?),
    };
    let payload = &rest[digits..];
    let data = if payload.is_empty() {
        None
    } else {
        Some(serde_json::from_str::<Value>(payload).map_err(|e| malformed(text, e))?)
    };

    let packet = match kind {
        '0' => Packet::Connect(data),
        '1' => Packet::Disconnect,
        '2' => {
            let mut items = match data {
                Some(Value::Array(items)) => items.into_iter(),
                _ => return Err(malformed(text, "event payload must be an array")),
            };
            let name = match items.next() {
                Some(Value::String(name)) => name,
                _ => return Err(malformed(text, "event name must be a string")),
            };
            Packet::Event { id, name, args: items.collect() }
        }
        '3' => {
            let id = id.ok_or_else(|| malformed(text, "ack without id"))?;
            let args = match data {
                Some(Value::Array(items)) => items,
                None => Vec::new(),
                _ => return Err(malformed(text, "ack payload must be an array")),
            };
            Packet::Ack { id, args }
        }
        '4' => Packet::ConnectError(data.unwrap_or(Value::Null)),
        other => return Err(CodecError::UnknownType(other)),
    };
    Ok(packet)
}

fn malformed(raw: &str, detail: impl ToString) -> CodecError {
    CodecError::Malformed { raw: raw.to_string(), detail: detail.to_string() }
}

impl Frame {
    pub fn encode(&self) -> String {
        match self {
            // 只有服务器会发 open，这里为了完整照样编码
            Frame::Open(handshake) => format!("0{}", serde_json::to_string(handshake).unwrap_or_default()),
            Frame::Close => "1".to_string(),
            Frame::Ping(data) => format!("2{}", data),
            Frame::Pong(data) => format!("3{}", data),
            Frame::Message(packet) => format!("4{}", packet.encode()),
            Frame::Upgrade => "5".to_string(),
            Frame::Noop => "6".to_string(),
        }
    }
}

impl Packet {
    pub fn encode(&self) -> String {
        match self {
            Packet::Connect(None) => "0".to_string(),
            Packet::Connect(Some(data)) => format!("0{}", data),
            Packet::Disconnect => "1".to_string(),
            Packet::Event { id, name, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                let id = id.map(|id| id.to_string()).unwrap_or_default();
                format!("2{}{}", id, Value::Array(items))
            }
            Packet::Ack { id, args } => format!("3{}{}", id, Value::Array(args.clone())),
            Packet::ConnectError(data) => format!("4{}", data),
            Packet::Unsupported(raw) => raw.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_open() {
        let frame = decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#).unwrap();
        assert_eq!(
            frame,
            Frame::Open(Handshake { sid: "abc".into(), ping_interval: 25000, ping_timeout: 20000 })
        );
    }

    #[test]
    fn test_decode_heartbeat_and_control() {
        assert_eq!(decode("2").unwrap(), Frame::Ping(String::new()));
        assert_eq!(decode("3probe").unwrap(), Frame::Pong("probe".into()));
        assert_eq!(decode("1").unwrap(), Frame::Close);
        assert_eq!(decode("6").unwrap(), Frame::Noop);
        assert!(matches!(decode(""), Err(CodecError::Empty)));
        assert!(matches!(decode("9"), Err(CodecError::UnknownType('9'))));
    }

    #[test]
    fn test_decode_connect() {
        assert_eq!(
            decode(r#"40{"sid":"xyz"}"#).unwrap(),
            Frame::Message(Packet::Connect(Some(json!({"sid": "xyz"}))))
        );
        assert_eq!(
            decode(r#"44{"message":"Not authorized"}"#).unwrap(),
            Frame::Message(Packet::ConnectError(json!({"message": "Not authorized"})))
        );
    }

    #[test]
    fn test_decode_events() {
        assert_eq!(
            decode(r#"42["yourTurn",2]"#).unwrap(),
            Frame::Message(Packet::Event { id: None, name: "yourTurn".into(), args: vec![json!(2)] })
        );
        assert_eq!(
            decode(r#"4217["clearCards"]"#).unwrap(),
            Frame::Message(Packet::Event { id: Some(17), name: "clearCards".into(), args: vec![] })
        );
        assert_eq!(
            decode(r#"42/,3["admin"]"#).unwrap(),
            Frame::Message(Packet::Event { id: Some(3), name: "admin".into(), args: vec![] })
        );
    }

    #[test]
    fn test_decode_acks() {
        assert_eq!(
            decode("435[true]").unwrap(),
            Frame::Message(Packet::Ack { id: 5, args: vec![json!(true)] })
        );
        assert_eq!(decode("430[]").unwrap(), Frame::Message(Packet::Ack { id: 0, args: vec![] }));
        assert!(decode("43[true]").is_err());
    }

    #[test]
    fn test_unsupported_packets_are_kept_raw() {
        assert_eq!(
            decode(r#"42/admin,["hello"]"#).unwrap(),
            Frame::Message(Packet::Unsupported(r#"2/admin,["hello"]"#.into()))
        );
        assert!(matches!(decode(r#"451-["upload",{"_placeholder":true,"num":0}]"#).unwrap(), Frame::Message(Packet::Unsupported(_))));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode(r#"42{"not":"array"}"#), Err(CodecError::Malformed { .. })));
        assert!(matches!(decode("42[1,2]"), Err(CodecError::Malformed { .. })));
        assert!(matches!(decode("42[oops"), Err(CodecError::Malformed { .. })));
    }

    #[test]
    fn test_encode_client_frames() {
        assert_eq!(Frame::Message(Packet::Connect(None)).encode(), "40");
        assert_eq!(Frame::Pong(String::new()).encode(), "3");
        let join = Packet::Event {
            id: Some(0),
            name: "joinLobby".into(),
            args: vec![json!("abc"), json!("alice")],
        };
        assert_eq!(Frame::Message(join).encode(), r#"420["joinLobby","abc","alice"]"#);
        let draw = Packet::Event { id: None, name: "cardRequest".into(), args: vec![] };
        assert_eq!(Frame::Message(draw).encode(), r#"42["cardRequest"]"#);
        assert_eq!(Frame::Message(Packet::Ack { id: 17, args: vec![] }).encode(), "4317[]");
    }
}

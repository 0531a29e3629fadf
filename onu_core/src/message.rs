use crate::card::{Card, CardKey, Color};
use crate::error::{ChannelError, ProtocolError};
use crate::state::Player;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// 服务器发起的确认请求编号
pub type AckId = u64;

// --- 服务器 -> 客户端 的推送事件 ---

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// 大厅玩家列表快照
    LobbySnapshot { players: Vec<Player>, me: Option<Player> },
    PlayerJoined(Player),
    PlayerLeft(Player),
    /// 一局结束，回到大厅
    RoundEnded,
    /// 成为房主
    AdminGranted,
    /// 开局，手牌和顶牌需要另行请求
    GameStarted,
    TopCardChanged(Card),
    /// 摸到的牌，单张和多张统一成序列
    HandCardsAdded(Vec<Card>),
    /// 清空手牌，服务器等待确认
    HandCleared,
    ColorWishRequested,
    /// 轮到自己出牌
    TurnGranted { pending_draw_count: u32 },
}

#[derive(Deserialize)]
struct LobbyPayload {
    #[serde(default)]
    players: Vec<Player>,
    #[serde(default)]
    me: Option<Player>,
}

impl ServerEvent {
    /// 按线上事件名和参数解析。解析失败时不产生任何事件。
    pub fn parse(name: &str, args: &[Value]) -> Result<ServerEvent, ProtocolError> {
        let event = match name {
            "openLobby" => {
                let lobby: LobbyPayload = payload("openLobby", args)?;
                ServerEvent::LobbySnapshot { players: lobby.players, me: lobby.me }
            }
            "playerJoin" => ServerEvent::PlayerJoined(payload("playerJoin", args)?),
            "playerLeave" => ServerEvent::PlayerLeft(payload("playerLeave", args)?),
            "gameEnded" => ServerEvent::RoundEnded,
            "admin" => ServerEvent::AdminGranted,
            "starting" => ServerEvent::GameStarted,
            "addStackCard" => ServerEvent::TopCardChanged(payload("addStackCard", args)?),
            "addDeckCard" => {
                let cards = match args.first() {
                    Some(Value::Array(_)) => payload::<Vec<Card>>("addDeckCard", args)?,
                    _ => vec![payload::<Card>("addDeckCard", args)?],
                };
                ServerEvent::HandCardsAdded(cards)
            }
            "clearCards" => ServerEvent::HandCleared,
            "wishColor" => ServerEvent::ColorWishRequested,
            "yourTurn" => {
                let amount = match args.first() {
                    None | Some(Value::Null) => 0,
                    Some(value) => value
                        .as_i64()
                        .or_else(|| value.as_f64().map(|f| f as i64))
                        .ok_or_else(|| bad_payload("yourTurn", value))?,
                };
                ServerEvent::TurnGranted { pending_draw_count: amount.clamp(0, u32::MAX as i64) as u32 }
            }
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        };
        Ok(event)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::LobbySnapshot { .. } => "openLobby",
            ServerEvent::PlayerJoined(_) => "playerJoin",
            ServerEvent::PlayerLeft(_) => "playerLeave",
            ServerEvent::RoundEnded => "gameEnded",
            ServerEvent::AdminGranted => "admin",
            ServerEvent::GameStarted => "starting",
            ServerEvent::TopCardChanged(_) => "addStackCard",
            ServerEvent::HandCardsAdded(_) => "addDeckCard",
            ServerEvent::HandCleared => "clearCards",
            ServerEvent::ColorWishRequested => "wishColor",
            ServerEvent::TurnGranted { .. } => "yourTurn",
        }
    }
}

fn payload<T: DeserializeOwned>(event: &'static str, args: &[Value]) -> Result<T, ProtocolError> {
    let value = args.first().ok_or(ProtocolError::MissingPayload { event })?;
    T::deserialize(value).map_err(|source| ProtocolError::BadPayload { event, source })
}

fn bad_payload(event: &'static str, value: &Value) -> ProtocolError {
    let source = <serde_json::Error as serde::de::Error>::custom(format!("expected a number, got {}", value));
    ProtocolError::BadPayload { event, source }
}

// --- 客户端 -> 服务器 的消息 ---

/// 需要服务器逐一应答的请求
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    JoinLobby { lobby_code: String, username: String },
    RequestInitialCards,
    RequestInitialStack,
    PlayCard(CardKey),
    WishColor(Color),
}

impl ClientCall {
    pub fn name(&self) -> &'static str {
        match self {
            ClientCall::JoinLobby { .. } => "joinLobby",
            ClientCall::RequestInitialCards => "requestInitialCards",
            ClientCall::RequestInitialStack => "requestInitialStack",
            ClientCall::PlayCard(_) => "playCard",
            ClientCall::WishColor(_) => "wishColor",
        }
    }

    pub fn args(&self) -> Vec<Value> {
        match self {
            ClientCall::JoinLobby { lobby_code, username } => {
                vec![Value::String(lobby_code.clone()), Value::String(username.clone())]
            }
            ClientCall::RequestInitialCards | ClientCall::RequestInitialStack => vec![],
            ClientCall::PlayCard(key) => vec![key.as_value().clone()],
            ClientCall::WishColor(color) => vec![Value::String(color.code().to_string())],
        }
    }
}

/// 发出即可、不等待应答的消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEmit {
    /// 开始游戏 (仅房主)
    StartGame,
    /// 摸牌
    CardRequest,
}

impl ClientEmit {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEmit::StartGame => "startGame",
            ClientEmit::CardRequest => "cardRequest",
        }
    }
}

// --- 响应解码 ---

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn reason_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 加入大厅的应答：没有参数或参数为假值表示成功，否则是错误原因
pub fn join_outcome(args: &[Value]) -> Result<(), String> {
    match args.first() {
        Some(err) if is_truthy(err) => Err(reason_text(err)),
        _ => Ok(()),
    }
}

/// 普通请求的应答：对象里带 `error` 字段表示失败，否则按期望类型解析
pub fn decode_reply<T: DeserializeOwned>(call: &'static str, args: &[Value]) -> Result<T, ChannelError> {
    let value = args.first().unwrap_or(&Value::Null);
    if let Some(err) = value.get("error").filter(|e| is_truthy(e)) {
        return Err(ChannelError::Remote { call, reason: reason_text(err) });
    }
    T::deserialize(value)
        .map_err(|e| ProtocolError::BadResponse { call, detail: e.to_string() }.into())
}

/// 出牌的裁决
pub fn play_verdict(args: &[Value]) -> Result<bool, ProtocolError> {
    match args.first() {
        Some(Value::Bool(accepted)) => Ok(*accepted),
        other => Err(ProtocolError::BadResponse {
            call: "playCard",
            detail: format!("expected a boolean, got {}", other.unwrap_or(&Value::Null)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardKind;
    use serde_json::json;

    #[test]
    fn test_parse_lobby_snapshot() {
        let event = ServerEvent::parse(
            "openLobby",
            &[json!({"players": [{"username": "A", "id": 3}, {"username": "B"}], "me": {"username": "A"}})],
        )
        .unwrap();
        assert_eq!(
            event,
            ServerEvent::LobbySnapshot {
                players: vec![Player::new("A"), Player::new("B")],
                me: Some(Player::new("A")),
            }
        );
    }

    #[test]
    fn test_parse_cards_added_single_or_many() {
        let single = ServerEvent::parse("addDeckCard", &[json!({"color": "r", "type": "5", "key": "k1"})]).unwrap();
        assert_eq!(single, ServerEvent::HandCardsAdded(vec![Card::new(Color::Red, CardKind::Number(5), "k1")]));

        let many = ServerEvent::parse(
            "addDeckCard",
            &[json!([{"color": "g", "type": "o", "key": "k2"}, {"color": "", "type": "wish", "key": "k3"}])],
        )
        .unwrap();
        match many {
            ServerEvent::HandCardsAdded(cards) => assert_eq!(cards.len(), 2),
            other => panic!("unexpected event {:?}", other),
        }

        let empty = ServerEvent::parse("addDeckCard", &[json!([])]).unwrap();
        assert_eq!(empty, ServerEvent::HandCardsAdded(vec![]));
    }

    #[test]
    fn test_parse_turn_amount() {
        let parse = |args: &[Value]| ServerEvent::parse("yourTurn", args).unwrap();
        assert_eq!(parse(&[json!(2)]), ServerEvent::TurnGranted { pending_draw_count: 2 });
        assert_eq!(parse(&[json!(-1)]), ServerEvent::TurnGranted { pending_draw_count: 0 });
        assert_eq!(parse(&[]), ServerEvent::TurnGranted { pending_draw_count: 0 });
        assert!(ServerEvent::parse("yourTurn", &[json!("two")]).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(matches!(
            ServerEvent::parse("playerJoin", &[]),
            Err(ProtocolError::MissingPayload { event: "playerJoin" })
        ));
        assert!(matches!(
            ServerEvent::parse("addStackCard", &[json!({"color": "r"})]),
            Err(ProtocolError::BadPayload { event: "addStackCard", .. })
        ));
        assert!(matches!(ServerEvent::parse("confetti", &[]), Err(ProtocolError::UnknownEvent(_))));
    }

    #[test]
    fn test_event_names_round_trip() {
        for name in ["gameEnded", "admin", "starting", "clearCards", "wishColor"] {
            assert_eq!(ServerEvent::parse(name, &[]).unwrap().name(), name);
        }
    }

    #[test]
    fn test_call_arguments() {
        let join = ClientCall::JoinLobby { lobby_code: "abc".into(), username: "alice".into() };
        assert_eq!(join.args(), vec![json!("abc"), json!("alice")]);
        assert_eq!(ClientCall::PlayCard(CardKey::new(json!(7))).args(), vec![json!(7)]);
        assert_eq!(ClientCall::WishColor(Color::Yellow).args(), vec![json!("y")]);
        assert!(ClientCall::RequestInitialCards.args().is_empty());
    }

    #[test]
    fn test_join_outcome() {
        assert_eq!(join_outcome(&[]), Ok(()));
        assert_eq!(join_outcome(&[Value::Null]), Ok(()));
        assert_eq!(join_outcome(&[json!(false)]), Ok(()));
        assert_eq!(join_outcome(&[json!("Lobby is full")]), Err("Lobby is full".to_string()));
    }

    #[test]
    fn test_decode_reply() {
        let cards: Vec<Card> = decode_reply("requestInitialCards", &[json!([{"color": "b", "type": "s", "key": "k"}])]).unwrap();
        assert_eq!(cards, vec![Card::new(Color::Blue, CardKind::Reverse, "k")]);

        let err = decode_reply::<Card>("requestInitialStack", &[json!({"error": "Not in game"})]).unwrap_err();
        assert!(matches!(err, ChannelError::Remote { reason, .. } if reason == "Not in game"));

        let err = decode_reply::<Card>("requestInitialStack", &[json!(12)]).unwrap_err();
        assert!(matches!(err, ChannelError::Protocol(ProtocolError::BadResponse { .. })));
    }

    #[test]
    fn test_play_verdict() {
        assert!(play_verdict(&[json!(true)]).unwrap());
        assert!(!play_verdict(&[json!(false)]).unwrap());
        assert!(play_verdict(&[]).is_err());
        assert!(play_verdict(&[json!("yes")]).is_err());
    }
}

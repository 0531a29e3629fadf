use crate::card::{canonical_order, Card, CardKey};
use serde::{Deserialize, Serialize};

/// 会话阶段
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// 尚未加入大厅
    #[default]
    Start,
    /// 已加入，等待开局
    Lobby,
    /// 对局进行中
    InGame,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
}

impl Player {
    pub fn new(username: impl Into<String>) -> Player {
        Player { username: username.into() }
    }
}

/// 客户端本地的会话镜像。
///
/// 只由分发循环持有和修改。下面每个状态转换方法都先检查前置阶段，
/// 不满足时返回 `false` 且不做任何修改。
#[derive(Debug, Default, Clone)]
pub struct Session {
    pub phase: Phase,
    pub lobby_id: String,
    pub local_player_name: String,
    // 按到达顺序保存，用户名唯一
    pub roster: Vec<Player>,
    /// 大厅快照里服务器告知的“自己”
    pub me: Option<Player>,
    // 顺序没有意义，展示时用 canonical_order
    pub hand: Vec<Card>,
    pub top_card: Option<Card>,
    pub pending_draw_count: u32,
    pub is_admin: bool,
}

impl Session {
    pub fn new(local_player_name: impl Into<String>) -> Session {
        Session { local_player_name: local_player_name.into(), ..Session::default() }
    }

    fn joined(&self) -> bool {
        matches!(self.phase, Phase::Lobby | Phase::InGame)
    }

    /// 加入大厅成功
    pub fn enter_lobby(&mut self, lobby_id: impl Into<String>) -> bool {
        if self.phase != Phase::Start {
            return false;
        }
        self.lobby_id = lobby_id.into();
        self.phase = Phase::Lobby;
        true
    }

    /// 用快照整体替换玩家列表
    pub fn replace_roster(&mut self, players: Vec<Player>, me: Option<Player>) -> bool {
        if self.phase != Phase::Lobby {
            return false;
        }
        let mut roster: Vec<Player> = Vec::with_capacity(players.len());
        for player in players {
            if !roster.iter().any(|p| p.username == player.username) {
                roster.push(player);
            }
        }
        self.roster = roster;
        if me.is_some() {
            self.me = me;
        }
        true
    }

    pub fn add_player(&mut self, player: Player) -> bool {
        if !self.joined() {
            return false;
        }
        if !self.roster.iter().any(|p| p.username == player.username) {
            self.roster.push(player);
        }
        true
    }

    pub fn remove_player(&mut self, username: &str) -> bool {
        if !self.joined() {
            return false;
        }
        self.roster.retain(|p| p.username != username);
        true
    }

    /// 单向授予，会话内不会撤销
    pub fn grant_admin(&mut self) {
        self.is_admin = true;
    }

    /// 开局：手牌和顶牌由调用方事先通过请求取回，这里一次性写入
    pub fn start_round(&mut self, hand: Vec<Card>, top_card: Option<Card>) -> bool {
        if self.phase != Phase::Lobby {
            return false;
        }
        self.phase = Phase::InGame;
        self.hand = Vec::new();
        self.add_cards(hand);
        self.top_card = top_card;
        self.pending_draw_count = 0;
        true
    }

    pub fn end_round(&mut self) -> bool {
        if self.phase != Phase::InGame {
            return false;
        }
        self.phase = Phase::Lobby;
        true
    }

    pub fn set_top_card(&mut self, card: Card) -> bool {
        if !self.joined() {
            return false;
        }
        self.top_card = Some(card);
        true
    }

    /// 加入手牌。key 已存在的牌用新值替换，保证手牌内 key 唯一。
    pub fn add_cards(&mut self, cards: Vec<Card>) -> bool {
        if !self.joined() {
            return false;
        }
        for card in cards {
            match self.hand.iter_mut().find(|c| c.key == card.key) {
                Some(existing) => *existing = card,
                None => self.hand.push(card),
            }
        }
        true
    }

    pub fn clear_hand(&mut self) -> bool {
        if !self.joined() {
            return false;
        }
        self.hand.clear();
        true
    }

    /// 轮到自己；欠摸牌数只在这里设置
    pub fn grant_turn(&mut self, pending_draw_count: u32) -> bool {
        if self.phase != Phase::InGame {
            return false;
        }
        self.pending_draw_count = pending_draw_count;
        true
    }

    /// 服务器确认出牌后移除对应的牌，只移除 key 匹配的那一张
    pub fn remove_card(&mut self, key: &CardKey) -> Option<Card> {
        let idx = self.hand.iter().position(|c| &c.key == key)?;
        Some(self.hand.remove(idx))
    }

    pub fn sorted_hand(&self) -> Vec<&Card> {
        canonical_order(&self.hand)
    }

    /// 本地玩家是否排在玩家列表第一位（第一个出牌）
    pub fn plays_first(&self) -> bool {
        self.roster.first().is_some_and(|p| p.username == self.local_player_name)
    }
}

use crate::card::{Card, WISH_COLORS};
use crate::channel::{Inbound, Remote};
use crate::error::{ChannelError, ClientError, PromptError};
use crate::message::{decode_reply, join_outcome, play_verdict, ClientCall, ClientEmit, ServerEvent};
use crate::state::{Phase, Session};
use crate::view::{turn_options, Notice, Presenter, Prompter, TurnOption};
use std::time::Duration;
use tracing::{debug, error, warn};

/// 许愿颜色没有约定的应答，等待这么久后视为已送达
pub const WISH_ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// 客户端会话：持有会话状态、事件通道和前端，
/// 由分发循环逐个处理推送事件。
///
/// 每个事件处理函数都执行完毕后才会处理下一个事件，
/// 处理过程中到达的事件由通道排队。
pub struct Client<R, F> {
    session: Session,
    remote: R,
    frontend: F,
    // 房主在大厅时需要询问是否开局
    start_offer_armed: bool,
}

impl<R, F> Client<R, F>
where
    R: Remote,
    F: Presenter + Prompter,
{
    pub fn new(remote: R, frontend: F, username: impl Into<String>) -> Self {
        Client { session: Session::new(username), remote, frontend, start_offer_armed: false }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    // --- 入口 ---

    /// 加入大厅。服务器拒绝时返回 [`ClientError::JoinRejected`]，调用方应当退出进程。
    pub async fn join(&mut self, lobby_code: &str) -> Result<(), ClientError> {
        let call = ClientCall::JoinLobby {
            lobby_code: lobby_code.to_string(),
            username: self.session.local_player_name.clone(),
        };
        let args = self.remote.call(&call).await?;
        join_outcome(&args).map_err(ClientError::JoinRejected)?;

        if self.session.enter_lobby(lobby_code) {
            self.frontend.show_notice(&Notice::Joined { lobby_id: lobby_code.to_string() });
        }
        Ok(())
    }

    /// 分发循环，直到连接关闭
    pub async fn run(&mut self) -> Result<(), ClientError> {
        while let Some(inbound) = self.remote.next_event().await? {
            self.dispatch(inbound).await?;
            self.offer_start().await?;
        }
        self.frontend.show_notice(&Notice::Disconnected);
        Ok(())
    }

    /// 处理一条推送事件。
    ///
    /// 载荷解析失败的事件直接丢弃，不修改会话；
    /// 只有连接层面的错误和输入中断会返回 `Err`。
    pub async fn dispatch(&mut self, inbound: Inbound) -> Result<(), ClientError> {
        let event = match ServerEvent::parse(&inbound.name, &inbound.args) {
            Ok(event) => event,
            Err(e) => {
                warn!("忽略事件 {}: {}", inbound.name, e);
                return Ok(());
            }
        };
        debug!(event = event.name(), phase = ?self.session.phase, "分发事件");

        match event {
            ServerEvent::LobbySnapshot { players, me } => {
                if !self.session.replace_roster(players, me) {
                    warn!("不在大厅中，忽略玩家列表快照");
                }
            }
            ServerEvent::PlayerJoined(player) => {
                let name = player.username.clone();
                if self.session.add_player(player) {
                    self.frontend.show_notice(&Notice::PlayerJoined(name));
                }
            }
            ServerEvent::PlayerLeft(player) => {
                if self.session.remove_player(&player.username) {
                    self.frontend.show_notice(&Notice::PlayerLeft(player.username));
                }
            }
            ServerEvent::RoundEnded => {
                if self.session.end_round() {
                    self.start_offer_armed = self.session.is_admin;
                    self.frontend.show_notice(&Notice::RoundEnded);
                }
            }
            ServerEvent::AdminGranted => {
                self.session.grant_admin();
                self.start_offer_armed = true;
            }
            ServerEvent::GameStarted => self.start_round().await?,
            ServerEvent::TopCardChanged(card) => {
                if self.session.set_top_card(card.clone()) {
                    self.frontend.show_notice(&Notice::TopCardChanged(card));
                }
            }
            ServerEvent::HandCardsAdded(cards) => {
                if self.session.add_cards(cards) {
                    self.frontend.show_deck(&self.session);
                }
            }
            ServerEvent::HandCleared => {
                self.frontend.show_notice(&Notice::ClearingCards);
                self.session.clear_hand();
            }
            ServerEvent::ColorWishRequested => self.wish_color().await?,
            ServerEvent::TurnGranted { pending_draw_count } => {
                if self.session.grant_turn(pending_draw_count) {
                    self.take_turn().await?;
                } else {
                    warn!("不在对局中，忽略出牌回合");
                }
            }
        }

        if let Some(ack) = inbound.ack {
            self.remote.acknowledge(ack).await?;
        }
        Ok(())
    }

    // --- 事件处理 ---

    /// 开局：先取回手牌和顶牌，再一次性切换到对局阶段
    async fn start_round(&mut self) -> Result<(), ClientError> {
        if self.session.phase != Phase::Lobby {
            warn!("当前阶段 {:?} 不能开局，忽略", self.session.phase);
            return Ok(());
        }

        let hand = match self.remote.call(&ClientCall::RequestInitialCards).await {
            Ok(args) => decode_reply::<Vec<Card>>("requestInitialCards", &args),
            Err(e) => Err(e),
        };
        let hand = recover(hand, "初始手牌")?.unwrap_or_default();

        let top_card = match self.remote.call(&ClientCall::RequestInitialStack).await {
            Ok(args) => decode_reply::<Card>("requestInitialStack", &args),
            Err(e) => Err(e),
        };
        let top_card = recover(top_card, "初始顶牌")?;

        self.session.start_round(hand, top_card);
        if !self.session.plays_first() {
            self.frontend.show_deck(&self.session);
        }
        Ok(())
    }

    async fn wish_color(&mut self) -> Result<(), ClientError> {
        let colors = WISH_COLORS;
        let picked = self.frontend.choose_wish_color(&colors).await?;
        let color = colors.get(picked).cloned().ok_or(PromptError::InvalidChoice(picked))?;

        let call = ClientCall::WishColor(color);
        match tokio::time::timeout(WISH_ACK_TIMEOUT, self.remote.call(&call)).await {
            Ok(Ok(_)) => debug!("许愿颜色已确认"),
            Ok(Err(e)) if e.is_fatal() => return Err(e.into()),
            Ok(Err(e)) => warn!("许愿颜色失败: {}", e),
            Err(_) => debug!("许愿颜色未收到应答，视为已送达"),
        }
        Ok(())
    }

    /// 房主回到大厅后询问是否开局
    async fn offer_start(&mut self) -> Result<(), ClientError> {
        if !self.start_offer_armed || !self.session.is_admin || self.session.phase != Phase::Lobby {
            return Ok(());
        }
        self.start_offer_armed = false;
        self.frontend.confirm_start().await?;
        self.remote.emit(ClientEmit::StartGame).await?;
        Ok(())
    }

    // --- 出牌回合 ---

    /// 出牌回合，每次只做一个决定：摸牌，或打出某张牌。
    ///
    /// - 摸牌直接发出请求，不改动本地状态，摸到的牌之后以推送事件到达；
    /// - 出牌先提交给服务器，只有服务器接受后才从手牌中移除；
    /// - 被拒绝时手牌保持不变，按当前手牌重新构建选项并再次询问。
    async fn take_turn(&mut self) -> Result<(), ClientError> {
        loop {
            let options = turn_options(&self.session);
            let picked = self.frontend.choose_turn(&self.session, &options).await?;
            let option = options.get(picked).ok_or(PromptError::InvalidChoice(picked))?;

            let card = match option {
                TurnOption::Draw { .. } => {
                    self.remote.emit(ClientEmit::CardRequest).await?;
                    return Ok(());
                }
                TurnOption::Play(card) => card,
            };

            let accepted = match self.remote.call(&ClientCall::PlayCard(card.key.clone())).await {
                Ok(args) => play_verdict(&args).unwrap_or_else(|e| {
                    warn!("{}，按拒绝处理", e);
                    false
                }),
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!("出牌请求失败: {}，按拒绝处理", e);
                    false
                }
            };

            if !accepted {
                debug!(key = %card.key, "出牌被拒绝，重新选择");
                self.frontend.show_notice(&Notice::PlayRejected(card.clone()));
                continue;
            }

            self.session.remove_card(&card.key);
            self.frontend.show_deck(&self.session);
            return Ok(());
        }
    }
}

/// 连接错误向上传递；服务器给出的错误和格式错误只记录，返回 `None`
fn recover<T>(result: Result<T, ChannelError>, what: &str) -> Result<Option<T>, ChannelError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            error!("获取{}失败: {}", what, e);
            Ok(None)
        }
    }
}

// --- 单元测试 ---

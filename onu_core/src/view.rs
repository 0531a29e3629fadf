use crate::card::{Card, Color};
use crate::error::PromptError;
use crate::state::Session;

/// 出牌提示中的一个选项
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOption {
    Draw { pending_draw_count: u32 },
    Play(Card),
}

impl TurnOption {
    pub fn label(&self) -> String {
        match self {
            TurnOption::Draw { pending_draw_count } => {
                format!("Draw Card/s (Draw Amount: {})", pending_draw_count)
            }
            TurnOption::Play(card) => card.label(),
        }
    }
}

/// 构建本回合的选项：摸牌在最前，其后是按展示顺序排列的手牌
pub fn turn_options(session: &Session) -> Vec<TurnOption> {
    let mut options = Vec::with_capacity(session.hand.len() + 1);
    options.push(TurnOption::Draw { pending_draw_count: session.pending_draw_count });
    options.extend(session.sorted_hand().into_iter().cloned().map(TurnOption::Play));
    options
}

/// 需要告知玩家的一次性消息
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Joined { lobby_id: String },
    PlayerJoined(String),
    PlayerLeft(String),
    TopCardChanged(Card),
    ClearingCards,
    PlayRejected(Card),
    RoundEnded,
    Disconnected,
}

/// 只读地把会话渲染出来，不得影响游戏状态
pub trait Presenter {
    fn show_deck(&mut self, session: &Session);
    fn show_notice(&mut self, notice: &Notice);
}

/// 等待玩家做出决定。提示一旦开始就会一直等到有完整的选择。
#[allow(async_fn_in_trait)]
pub trait Prompter {
    /// 返回所选选项的下标
    async fn choose_turn(&mut self, session: &Session, options: &[TurnOption]) -> Result<usize, PromptError>;
    async fn choose_wish_color(&mut self, colors: &[Color]) -> Result<usize, PromptError>;
    async fn confirm_start(&mut self) -> Result<(), PromptError>;
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

// --- 核心数据结构定义 ---

/// 颜色 (Color)
///
/// 变体的声明顺序就是手牌分组展示的优先级，`Ord` 直接派生：
/// 已知颜色在前，服务器新增的未知颜色（按编码）随后，无色牌（万能牌）最后。
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Color {
    Red,
    Green,
    Turquoise,
    Blue,
    Purple,
    Yellow,
    /// 无法识别的颜色编码，原样保留
    Other(String),
    /// 无色 (万能牌)
    #[default]
    Colorless,
}

/// 可以许愿的颜色
pub const WISH_COLORS: [Color; 4] = [Color::Red, Color::Green, Color::Blue, Color::Yellow];

impl Color {
    pub fn from_code(code: &str) -> Color {
        match code {
            "r" => Color::Red,
            "g" => Color::Green,
            "t" => Color::Turquoise,
            "b" => Color::Blue,
            "l" => Color::Purple,
            "y" => Color::Yellow,
            "" => Color::Colorless,
            other => Color::Other(other.to_string()),
        }
    }

    /// 线上传输用的编码
    pub fn code(&self) -> &str {
        match self {
            Color::Red => "r",
            Color::Green => "g",
            Color::Turquoise => "t",
            Color::Blue => "b",
            Color::Purple => "l",
            Color::Yellow => "y",
            Color::Colorless => "",
            Color::Other(code) => code,
        }
    }

    /// 展示用的名称，无色牌为空串
    pub fn name(&self) -> &str {
        match self {
            Color::Red => "Red",
            Color::Green => "Green",
            Color::Turquoise => "Turquoise",
            Color::Blue => "Blue",
            Color::Purple => "Purple",
            Color::Yellow => "Yellow",
            Color::Colorless => "",
            Color::Other(code) => code,
        }
    }
}

impl From<String> for Color {
    fn from(code: String) -> Self {
        Color::from_code(&code)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.code().to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 牌面类型 (CardKind)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CardKind {
    Number(u8),
    DrawTwo,
    Reverse,
    Skip,
    Cycle,
    Random,
    Wish,
    DrawFourWish,
    /// 无法识别的类型编码，原样保留
    Other(String),
}

impl CardKind {
    pub fn from_code(code: &str) -> CardKind {
        match code {
            "p2" => CardKind::DrawTwo,
            "s" => CardKind::Reverse,
            "o" => CardKind::Skip,
            "cycle" => CardKind::Cycle,
            "rand" => CardKind::Random,
            "wish" => CardKind::Wish,
            "p4wish" => CardKind::DrawFourWish,
            other => match other.parse::<u8>() {
                // "05" 之类无法无损还原的编码按未知类型处理
                Ok(n) if n.to_string() == other => CardKind::Number(n),
                _ => CardKind::Other(other.to_string()),
            },
        }
    }

    pub fn code(&self) -> String {
        match self {
            CardKind::Number(n) => n.to_string(),
            CardKind::DrawTwo => "p2".to_string(),
            CardKind::Reverse => "s".to_string(),
            CardKind::Skip => "o".to_string(),
            CardKind::Cycle => "cycle".to_string(),
            CardKind::Random => "rand".to_string(),
            CardKind::Wish => "wish".to_string(),
            CardKind::DrawFourWish => "p4wish".to_string(),
            CardKind::Other(code) => code.clone(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            CardKind::Number(n) => n.to_string(),
            CardKind::DrawTwo => "+2".to_string(),
            CardKind::Reverse => "Reverse".to_string(),
            CardKind::Skip => "Skip".to_string(),
            CardKind::Cycle => "Cycle".to_string(),
            CardKind::Random => "Random".to_string(),
            CardKind::Wish => "Wish".to_string(),
            CardKind::DrawFourWish => "+4 Wish".to_string(),
            CardKind::Other(code) => code.clone(),
        }
    }
}

impl From<String> for CardKind {
    fn from(code: String) -> Self {
        CardKind::from_code(&code)
    }
}

impl From<CardKind> for String {
    fn from(kind: CardKind) -> Self {
        kind.code()
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 服务器分配的卡牌标识。
/// 内容对客户端不透明，出牌时按收到时的 JSON 原样发回。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardKey(Value);

impl CardKey {
    pub fn new(value: Value) -> CardKey {
        CardKey(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<&str> for CardKey {
    fn from(key: &str) -> Self {
        CardKey(Value::String(key.to_string()))
    }
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0 {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other),
        }
    }
}

/// 单张牌 (Card)
///
/// 不可变的值对象：颜色、类型或 key 任何一项变化都视为另一张牌。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default)]
    pub color: Color,
    #[serde(rename = "type")]
    pub kind: CardKind,
    pub key: CardKey,
}

impl Card {
    pub fn new(color: Color, kind: CardKind, key: impl Into<CardKey>) -> Card {
        Card { color, kind, key: key.into() }
    }

    /// 展示文本，例如 `Red Skip`；无色牌只显示类型。
    /// 只由颜色和类型决定，不包含 key。
    pub fn label(&self) -> String {
        format!("{} {}", self.color.name(), self.kind.name()).trim().to_string()
    }

    /// 展示顺序：先按颜色分组，组内按类型编码，最后按 key 保证全序
    pub fn canonical_cmp(&self, other: &Card) -> Ordering {
        self.color
            .cmp(&other.color)
            .then_with(|| self.kind.code().cmp(&other.kind.code()))
            .then_with(|| self.key.0.to_string().cmp(&other.key.0.to_string()))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 把一组牌整理成确定的展示顺序。
/// 只用于展示，与出牌是否合法无关。
pub fn canonical_order<'a, I>(cards: I) -> Vec<&'a Card>
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut sorted: Vec<&Card> = cards.into_iter().collect();
    sorted.sort_by(|a, b| a.canonical_cmp(b));
    sorted
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn card(color: &str, kind: &str, key: &str) -> Card {
        Card::new(Color::from_code(color), CardKind::from_code(kind), key)
    }

    fn keys(cards: &[&Card]) -> Vec<String> {
        cards.iter().map(|c| c.key.to_string()).collect()
    }

    #[test]
    fn test_label_colored_and_colorless() {
        assert_eq!(card("r", "5", "a").label(), "Red 5");
        assert_eq!(card("l", "p2", "b").label(), "Purple +2");
        assert_eq!(card("t", "o", "c").label(), "Turquoise Skip");
        assert_eq!(card("", "p4wish", "d").label(), "+4 Wish");
        assert_eq!(card("", "wish", "e").label(), "Wish");
    }

    #[test]
    fn test_label_falls_back_to_raw_codes() {
        assert_eq!(card("x", "zap", "a").label(), "x zap");
        assert_eq!(card("", "zap", "b").label(), "zap");
        assert_eq!(card("g", "05", "c").kind, CardKind::Other("05".to_string()));
    }

    #[test]
    fn test_label_ignores_key() {
        assert_eq!(card("b", "s", "k1").label(), card("b", "s", "k2").label());
    }

    #[test]
    fn test_red_groups_before_green() {
        let hand = vec![card("g", "o", "k2"), card("r", "5", "k1")];
        assert_eq!(keys(&canonical_order(&hand)), ["k1", "k2"]);
    }

    #[test]
    fn test_group_priority() {
        let hand = vec![
            card("", "wish", "wild"),
            card("y", "1", "yellow"),
            card("q", "1", "unknown"),
            card("l", "1", "purple"),
            card("b", "1", "blue"),
            card("t", "1", "turquoise"),
            card("g", "1", "green"),
            card("r", "1", "red"),
        ];
        assert_eq!(
            keys(&canonical_order(&hand)),
            ["red", "green", "turquoise", "blue", "purple", "yellow", "unknown", "wild"]
        );
    }

    #[test]
    fn test_sorted_by_type_within_group() {
        let hand = vec![
            card("r", "s", "reverse"),
            card("r", "p2", "draw2"),
            card("r", "7", "seven"),
            card("r", "0", "zero"),
            card("r", "o", "skip"),
        ];
        assert_eq!(keys(&canonical_order(&hand)), ["zero", "seven", "skip", "draw2", "reverse"]);
    }

    #[test]
    fn test_canonical_order_is_idempotent() {
        let hand = vec![card("y", "3", "a"), card("", "rand", "b"), card("r", "cycle", "c"), card("r", "3", "d")];
        let once = canonical_order(&hand);
        let twice = canonical_order(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_card_wire_format() {
        let parsed: Card = serde_json::from_value(json!({"color": "r", "type": "p2", "key": "k1"})).unwrap();
        assert_eq!(parsed, card("r", "p2", "k1"));

        let numeric_key: Card = serde_json::from_value(json!({"color": "", "type": "wish", "key": 17})).unwrap();
        assert_eq!(numeric_key.key.as_value(), &json!(17));
        assert_eq!(numeric_key.color, Color::Colorless);

        let no_color: Card = serde_json::from_value(json!({"type": "wish", "key": "w"})).unwrap();
        assert_eq!(no_color.color, Color::Colorless);

        let back = serde_json::to_value(&numeric_key).unwrap();
        assert_eq!(back, json!({"color": "", "type": "wish", "key": 17}));
    }

    const COLOR_CODES: [&str; 8] = ["r", "g", "t", "b", "l", "y", "", "x"];
    const KIND_CODES: [&str; 10] = ["0", "5", "9", "p2", "s", "o", "cycle", "rand", "wish", "p4wish"];

    fn arb_hand() -> impl Strategy<Value = Vec<Card>> {
        prop::collection::vec((0..COLOR_CODES.len(), 0..KIND_CODES.len()), 0..24).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (c, k))| card(COLOR_CODES[c], KIND_CODES[k], &format!("k{}", i)))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_canonical_order_ignores_input_order(
            (hand, shuffled) in arb_hand().prop_flat_map(|h| (Just(h.clone()), Just(h).prop_shuffle()))
        ) {
            prop_assert_eq!(canonical_order(&hand), canonical_order(&shuffled));
        }

        #[test]
        fn prop_canonical_order_groups_by_color(hand in arb_hand()) {
            let sorted = canonical_order(&hand);
            prop_assert_eq!(sorted.len(), hand.len());
            for pair in sorted.windows(2) {
                prop_assert!(pair[0].color <= pair[1].color);
                if pair[0].color == pair[1].color {
                    prop_assert!(pair[0].kind.code() <= pair[1].kind.code());
                }
            }
        }
    }
}

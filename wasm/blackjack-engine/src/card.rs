use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn symbol(&self) -> &'static str {
        match self {
            Suit::Spades => "♠",
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Suit> {
        match symbol {
            "♠" | "S" | "s" => Some(Suit::Spades),
            "♥" | "H" | "h" => Some(Suit::Hearts),
            "♦" | "D" | "d" => Some(Suit::Diamonds),
            "♣" | "C" | "c" => Some(Suit::Clubs),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        }
    }

    fn from_label(label: &str) -> Option<Rank> {
        Rank::ALL.iter().copied().find(|rank| rank.label() == label)
    }

    /// Pip value with the ace counted high.
    pub fn value(&self) -> u8 {
        match self {
            Rank::Ace => 11,
            Rank::Jack | Rank::Queen | Rank::King | Rank::Ten => 10,
            other => *other as u8 + 1,
        }
    }
}

/// A playing card as seen by the table.
///
/// `Concealed` stands for a card whose face has not been disclosed yet by an
/// external dealer. It scores nothing until [`crate::hand::Hand::resolve`]
/// swaps it for the real card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Card {
    Known { suit: Suit, rank: Rank },
    Concealed,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Card::Known { suit, rank }
    }

    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let text = text.trim();
        if text == "?" || text == "??" {
            return Ok(Card::Concealed);
        }
        let split = text
            .char_indices()
            .last()
            .map(|(index, _)| index)
            .ok_or_else(|| EngineError::InvalidCard(text.to_string()))?;
        let (rank, suit) = text.split_at(split);
        match (Rank::from_label(rank), Suit::from_symbol(suit)) {
            (Some(rank), Some(suit)) => Ok(Card::Known { suit, rank }),
            _ => Err(EngineError::InvalidCard(text.to_string())),
        }
    }

    pub fn rank(&self) -> Option<Rank> {
        match self {
            Card::Known { rank, .. } => Some(*rank),
            Card::Concealed => None,
        }
    }

    pub fn suit(&self) -> Option<Suit> {
        match self {
            Card::Known { suit, .. } => Some(*suit),
            Card::Concealed => None,
        }
    }

    pub fn is_ace(&self) -> bool {
        self.rank() == Some(Rank::Ace)
    }

    /// Every total this card can contribute to a hand.
    pub fn values(&self) -> &'static [u8] {
        match self.rank() {
            Some(Rank::Ace) => &[1, 11],
            Some(Rank::Two) => &[2],
            Some(Rank::Three) => &[3],
            Some(Rank::Four) => &[4],
            Some(Rank::Five) => &[5],
            Some(Rank::Six) => &[6],
            Some(Rank::Seven) => &[7],
            Some(Rank::Eight) => &[8],
            Some(Rank::Nine) => &[9],
            Some(_) => &[10],
            None => &[0],
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Card::Known { suit, rank } => write!(f, "{}{}", rank.label(), suit.symbol()),
            Card::Concealed => write!(f, "??"),
        }
    }
}

impl FromStr for Card {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Card::parse(s)
    }
}

/// A card sitting in a hand, possibly face down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealtCard {
    pub card: Card,
    pub hidden: bool,
}

impl DealtCard {
    pub fn face_up(card: Card) -> Self {
        DealtCard { card, hidden: false }
    }

    pub fn face_down(card: Card) -> Self {
        DealtCard { card, hidden: true }
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden && self.card != Card::Concealed
    }

    /// What an observer at the table is allowed to see.
    pub fn display(&self) -> DealtCard {
        if self.hidden {
            DealtCard::face_down(Card::Concealed)
        } else {
            *self
        }
    }
}

impl From<Card> for DealtCard {
    fn from(card: Card) -> Self {
        DealtCard::face_up(card)
    }
}

/// Parses labels such as `["A♠", "K♥", "??"]`; `??` comes back face down.
pub fn parse_cards<I, S>(labels: I) -> Result<Vec<DealtCard>, EngineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .map(|label| {
            let card = Card::parse(label.as_ref())?;
            Ok(match card {
                Card::Concealed => DealtCard::face_down(card),
                known => DealtCard::face_up(known),
            })
        })
        .collect()
}

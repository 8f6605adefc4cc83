use serde::{Deserialize, Serialize};

use crate::{
    card::{Card, DealtCard, Rank},
    error::EngineError,
};

/// Best total of the visible cards: aces start at 11 and drop to 1 one at a
/// time while the hand is over 21.
pub fn total(cards: &[DealtCard]) -> u8 {
    hand_value(cards).0
}

/// Returns the total and whether an ace is still counted as 11.
pub fn hand_value(cards: &[DealtCard]) -> (u8, bool) {
    let mut total: u32 = 0;
    let mut aces = 0;

    for dealt in cards.iter().filter(|dealt| dealt.is_visible()) {
        match dealt.card.rank() {
            Some(Rank::Ace) => {
                aces += 1;
                total += 11;
            }
            Some(rank) => total += rank.value() as u32,
            None => {}
        }
    }

    while total > 21 && aces > 0 {
        total -= 10;
        aces -= 1;
    }

    (total.min(u8::MAX as u32) as u8, aces > 0)
}

pub fn is_soft(cards: &[DealtCard]) -> bool {
    hand_value(cards).1
}

pub fn is_blackjack(cards: &[DealtCard]) -> bool {
    cards.len() == 2 && cards.iter().all(DealtCard::is_visible) && total(cards) == 21
}

pub fn is_bust(cards: &[DealtCard]) -> bool {
    total(cards) > 21
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player,
    Dealer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    pub role: Role,
    pub cards: Vec<DealtCard>,
}

impl Hand {
    pub fn new(role: Role) -> Self {
        Hand {
            role,
            cards: Vec::new(),
        }
    }

    pub fn push(&mut self, card: DealtCard) {
        self.cards.push(card);
    }

    pub fn total(&self) -> u8 {
        total(&self.cards)
    }

    pub fn is_soft(&self) -> bool {
        is_soft(&self.cards)
    }

    pub fn is_blackjack(&self) -> bool {
        is_blackjack(&self.cards)
    }

    pub fn is_bust(&self) -> bool {
        is_bust(&self.cards)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn has_hidden(&self) -> bool {
        self.cards.iter().any(|dealt| dealt.hidden)
    }

    pub fn reveal_all(&mut self) {
        for dealt in &mut self.cards {
            if dealt.card != Card::Concealed {
                dealt.hidden = false;
            }
        }
    }

    /// Flags every concealed placeholder as face down.
    pub fn conceal_unknown(&mut self) {
        for dealt in &mut self.cards {
            if dealt.card == Card::Concealed {
                dealt.hidden = true;
            }
        }
    }

    /// Swaps a concealed placeholder for the card an external source revealed.
    pub fn resolve(&mut self, index: usize, card: Card) -> Result<(), EngineError> {
        let slot = self
            .cards
            .get_mut(index)
            .ok_or_else(|| EngineError::InvalidCard(format!("no card at position {index}")))?;
        if slot.card != Card::Concealed {
            return Err(EngineError::InvalidCard(format!(
                "position {index} already holds {}",
                slot.card
            )));
        }
        if card == Card::Concealed {
            return Err(EngineError::InvalidCard("cannot resolve to a concealed card".into()));
        }
        *slot = DealtCard::face_up(card);
        Ok(())
    }

    /// Cards as an observer sees them, hole card redacted.
    pub fn visible(&self) -> Vec<DealtCard> {
        self.cards.iter().map(DealtCard::display).collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::card::{Rank, Suit};

    fn up(rank: Rank) -> DealtCard {
        DealtCard::face_up(Card::new(Suit::Spades, rank))
    }

    fn cards(ranks: &[Rank]) -> Vec<DealtCard> {
        ranks.iter().copied().map(up).collect()
    }

    #[test]
    fn test_total_simple() {
        assert_eq!(total(&cards(&[Rank::Two, Rank::Three])), 5);
        assert_eq!(total(&cards(&[Rank::King, Rank::Queen])), 20);
    }

    #[test]
    fn test_total_soft_and_hard_aces() {
        assert_eq!(total(&cards(&[Rank::Ace, Rank::Six])), 17);
        assert_eq!(total(&cards(&[Rank::Ace, Rank::Six, Rank::Nine])), 16);
        assert_eq!(total(&cards(&[Rank::Ace, Rank::Ace, Rank::Nine])), 21);
        assert_eq!(total(&cards(&[Rank::Ace, Rank::Ace, Rank::Ace, Rank::Nine])), 12);
    }

    #[test]
    fn test_total_ignores_hidden_and_concealed() {
        let mut hand = cards(&[Rank::King]);
        hand.push(DealtCard::face_down(Card::new(Suit::Hearts, Rank::Nine)));
        hand.push(DealtCard::face_up(Card::Concealed));
        assert_eq!(total(&hand), 10);
    }

    #[test]
    fn test_is_soft() {
        assert!(is_soft(&cards(&[Rank::Ace, Rank::Six])));
        assert!(!is_soft(&cards(&[Rank::Ace, Rank::Six, Rank::Nine])));
        assert!(!is_soft(&cards(&[Rank::King, Rank::Seven])));
    }

    #[test]
    fn test_is_blackjack() {
        let hand = vec![
            DealtCard::face_up(Card::new(Suit::Spades, Rank::Ace)),
            DealtCard::face_up(Card::new(Suit::Hearts, Rank::King)),
        ];
        assert!(is_blackjack(&hand));

        let mut three = hand.clone();
        three.push(DealtCard::face_up(Card::new(Suit::Clubs, Rank::Two)));
        assert!(!is_blackjack(&three));

        assert!(!is_blackjack(&cards(&[Rank::Seven, Rank::Seven, Rank::Seven])));
        assert!(!is_blackjack(&cards(&[Rank::King, Rank::Queen])));
    }

    #[test]
    fn test_blackjack_needs_both_cards_visible() {
        let hand = vec![
            DealtCard::face_down(Card::new(Suit::Spades, Rank::Ace)),
            DealtCard::face_up(Card::new(Suit::Hearts, Rank::King)),
        ];
        assert!(!is_blackjack(&hand));
    }

    #[test]
    fn test_is_bust() {
        assert!(is_bust(&cards(&[Rank::King, Rank::Queen, Rank::Five])));
        assert!(!is_bust(&cards(&[Rank::King, Rank::Queen])));
    }

    #[test]
    fn test_reveal_and_visible() {
        let mut hand = Hand::new(Role::Dealer);
        hand.push(DealtCard::face_down(Card::new(Suit::Spades, Rank::Nine)));
        hand.push(up(Rank::Seven));
        assert_eq!(hand.total(), 7);
        assert_eq!(hand.visible()[0].card, Card::Concealed);

        hand.reveal_all();
        assert!(!hand.has_hidden());
        assert_eq!(hand.total(), 16);
        assert_eq!(hand.visible(), hand.cards);
    }

    #[test]
    fn test_conceal_unknown_then_resolve() {
        let mut hand = Hand::new(Role::Dealer);
        hand.push(DealtCard::face_up(Card::Concealed));
        hand.push(up(Rank::Five));
        hand.conceal_unknown();
        assert!(hand.cards[0].hidden);

        hand.reveal_all();
        assert!(hand.cards[0].hidden);

        hand.resolve(0, Card::new(Suit::Clubs, Rank::Ten)).unwrap();
        assert_eq!(hand.total(), 15);
        assert!(hand.resolve(0, Card::new(Suit::Clubs, Rank::Two)).is_err());
        assert!(hand.resolve(5, Card::new(Suit::Clubs, Rank::Two)).is_err());
    }

    fn rank_strategy() -> impl Strategy<Value = Rank> {
        (0usize..13).prop_map(|index| Rank::ALL[index])
    }

    proptest! {
        #[test]
        fn prop_total_is_best_total_not_over_21(ranks in prop::collection::vec(rank_strategy(), 1..8)) {
            let hand = cards(&ranks);
            let hard: u32 = ranks.iter().map(|rank| if *rank == Rank::Ace { 1 } else { rank.value() as u32 }).sum();
            let aces = ranks.iter().filter(|rank| **rank == Rank::Ace).count() as u32;
            let best = (0..=aces)
                .map(|high| hard + 10 * high)
                .filter(|candidate| *candidate <= 21)
                .max()
                .unwrap_or(hard);
            prop_assert_eq!(total(&hand) as u32, best);
        }
    }
}

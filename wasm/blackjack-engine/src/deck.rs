use log::trace;
use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

use crate::{
    card::{Card, Rank, Suit},
    error::EngineError,
};

pub const DECK_SIZE: usize = 52;

/// A single 52-card deck, dealt from the back.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn new() -> Self {
        Deck::shuffled_with(&mut SmallRng::from_entropy())
    }

    pub fn from_seed(seed: u64) -> Self {
        Deck::shuffled_with(&mut SmallRng::seed_from_u64(seed))
    }

    pub fn shuffled_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Deck::ordered();
        // SliceRandom::shuffle walks i from the last index down, swapping
        // with a uniform index in [0, i].
        deck.cards.shuffle(rng);
        deck
    }

    /// Suit-major, unshuffled.
    pub fn ordered() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(suit, rank));
            }
        }
        Deck { cards }
    }

    /// Builds a deck in the given order; the last card is dealt first.
    pub fn stacked(cards: Vec<Card>) -> Self {
        Deck { cards }
    }

    pub fn deal_one(&mut self) -> Result<Card, EngineError> {
        let card = self.cards.pop().ok_or(EngineError::EmptyDeck)?;
        trace!("dealt {card}, {} left", self.cards.len());
        Ok(card)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        Deck::new()
    }
}

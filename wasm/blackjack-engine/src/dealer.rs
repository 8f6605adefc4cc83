use log::debug;
use serde::Serialize;

use crate::{card::DealtCard, deck::Deck, error::EngineError, hand::Hand};

pub const DEALER_STANDS_ON: u8 = 17;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DealerState {
    Drawing,
    Standing,
}

impl DealerState {
    pub fn for_hand(hand: &Hand) -> Self {
        if hand.total() < DEALER_STANDS_ON {
            DealerState::Drawing
        } else {
            DealerState::Standing
        }
    }
}

/// Reveals the hole card and draws until the dealer reaches 17 or more.
/// Soft 17 stands. Returns how many cards were drawn.
pub fn play_dealer(hand: &mut Hand, deck: &mut Deck) -> Result<usize, EngineError> {
    hand.reveal_all();
    let mut drawn = 0;
    while DealerState::for_hand(hand) == DealerState::Drawing {
        hand.push(DealtCard::face_up(deck.deal_one()?));
        drawn += 1;
    }
    debug!("dealer stands on {} after drawing {drawn}", hand.total());
    Ok(drawn)
}

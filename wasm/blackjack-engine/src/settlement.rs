use serde::{Deserialize, Serialize};

use crate::hand::Hand;

/// Stake plus 3:2 profit.
pub const BLACKJACK_MULTIPLIER: f64 = 2.5;
/// Stake plus 1:1 profit.
pub const WIN_MULTIPLIER: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
    Push,
    Blackjack,
}

impl Outcome {
    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Win | Outcome::Blackjack)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub outcome: Outcome,
    pub bet: f64,
    /// Amount credited back, stake included.
    pub payout: f64,
}

impl Settlement {
    /// A player bust loses without looking at the dealer.
    pub fn bust(bet: f64) -> Self {
        Settlement {
            outcome: Outcome::Lose,
            bet,
            payout: 0.0,
        }
    }

    pub fn net(&self) -> f64 {
        self.payout - self.bet
    }

    /// Winnings shown on the win banner, whole tokens only.
    pub fn celebration(&self) -> Option<f64> {
        match self.outcome {
            Outcome::Blackjack => Some((self.bet * 1.5).floor()),
            Outcome::Win => Some(self.bet),
            Outcome::Lose | Outcome::Push => None,
        }
    }
}

/// Classifies a finished round. A blackjack against a dealer blackjack falls
/// through to the equal-totals branch and pushes.
pub fn settle(player: &Hand, dealer: &Hand, bet: f64) -> Settlement {
    let player_total = player.total();
    let dealer_total = dealer.total();

    let (outcome, multiplier) = if player.is_blackjack() && !dealer.is_blackjack() {
        (Outcome::Blackjack, BLACKJACK_MULTIPLIER)
    } else if player_total > 21 {
        (Outcome::Lose, 0.0)
    } else if dealer_total > 21 || player_total > dealer_total {
        (Outcome::Win, WIN_MULTIPLIER)
    } else if player_total < dealer_total {
        (Outcome::Lose, 0.0)
    } else {
        (Outcome::Push, 1.0)
    };

    Settlement {
        outcome,
        bet,
        payout: bet * multiplier,
    }
}

use std::fmt;

use log::{debug, info, warn};
use rand::{rngs::SmallRng, SeedableRng};
use serde::Serialize;

use crate::{
    bankroll::Bankroll,
    card::DealtCard,
    dealer::play_dealer,
    deck::Deck,
    error::EngineError,
    hand::{Hand, Role},
    settlement::{settle, Outcome, Settlement},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Betting,
    Playing,
    DealerTurn,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Betting => "betting",
            Phase::Playing => "playing",
            Phase::DealerTurn => "dealer_turn",
            Phase::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// One hand of blackjack from bet to settlement.
#[derive(Clone, Debug)]
pub struct Round {
    pub deck: Deck,
    pub player: Hand,
    pub dealer: Hand,
    pub bet: f64,
    pub phase: Phase,
    pub result: Option<Settlement>,
}

impl Round {
    fn idle() -> Self {
        Round {
            deck: Deck::stacked(Vec::new()),
            player: Hand::new(Role::Player),
            dealer: Hand::new(Role::Dealer),
            bet: 0.0,
            phase: Phase::Betting,
            result: None,
        }
    }

    /// Deals player, dealer (face down), player, dealer.
    fn deal(bet: f64, mut deck: Deck) -> Result<Self, EngineError> {
        let mut player = Hand::new(Role::Player);
        let mut dealer = Hand::new(Role::Dealer);
        player.push(DealtCard::face_up(deck.deal_one()?));
        dealer.push(DealtCard::face_down(deck.deal_one()?));
        player.push(DealtCard::face_up(deck.deal_one()?));
        dealer.push(DealtCard::face_up(deck.deal_one()?));
        Ok(Round {
            deck,
            player,
            dealer,
            bet,
            phase: Phase::Playing,
            result: None,
        })
    }

    /// Deck plus both hands; 52 for every dealt round.
    pub fn cards_in_play(&self) -> usize {
        self.deck.remaining() + self.player.len() + self.dealer.len()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub games_played: u32,
    pub wins: u32,
    pub last_bet: f64,
}

/// Read-only view of the table after an action.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub phase: Phase,
    pub player: Vec<DealtCard>,
    pub dealer: Vec<DealtCard>,
    pub player_total: u8,
    pub dealer_total: u8,
    pub bet: f64,
    pub result: Option<Outcome>,
    pub payout: Option<f64>,
    pub celebration: Option<f64>,
    pub balance: f64,
    pub stats: SessionStats,
}

pub struct BlackjackGame<B: Bankroll> {
    round: Round,
    bankroll: B,
    rng: SmallRng,
    stats: SessionStats,
}

impl<B: Bankroll> BlackjackGame<B> {
    pub fn new(bankroll: B, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        BlackjackGame {
            round: Round::idle(),
            bankroll,
            rng,
            stats: SessionStats::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.round.phase
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn bankroll(&self) -> &B {
        &self.bankroll
    }

    pub fn bankroll_mut(&mut self) -> &mut B {
        &mut self.bankroll
    }

    fn expect_phase(&self, expected: Phase, action: &'static str) -> Result<(), EngineError> {
        if self.round.phase == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                action,
                phase: self.round.phase,
            })
        }
    }

    /// Actions wait for an outstanding remote request to resolve.
    fn ensure_idle(&self) -> Result<(), EngineError> {
        if self.bankroll.is_pending() {
            Err(EngineError::RequestPending)
        } else {
            Ok(())
        }
    }

    pub fn place_bet(&mut self, amount: f64) -> Result<Snapshot, EngineError> {
        self.expect_phase(Phase::Betting, "place a bet")?;
        self.ensure_idle()?;
        self.check_bet(amount)?;
        let deck = Deck::shuffled_with(&mut self.rng);
        self.place_bet_with_deck(amount, deck)
    }

    /// Same as [`place_bet`](Self::place_bet) with a caller-supplied deck.
    pub fn place_bet_with_deck(&mut self, amount: f64, deck: Deck) -> Result<Snapshot, EngineError> {
        self.expect_phase(Phase::Betting, "place a bet")?;
        self.ensure_idle()?;
        self.check_bet(amount)?;

        let mut next = Round::deal(amount, deck)?;
        self.bankroll.debit(amount)?;
        debug!("bet {amount} placed, player shows {}", next.player.total());

        if next.player.is_blackjack() {
            next.phase = Phase::DealerTurn;
            if let Err(err) = self.run_dealer_and_settle(&mut next) {
                if let Err(refund) = self.bankroll.credit(amount) {
                    warn!("could not refund stake {amount}: {refund}");
                }
                return Err(err);
            }
        }

        self.stats.last_bet = amount;
        self.commit(next);
        Ok(self.snapshot())
    }

    pub fn hit(&mut self) -> Result<Snapshot, EngineError> {
        self.expect_phase(Phase::Playing, "hit")?;
        self.ensure_idle()?;
        let mut next = self.round.clone();
        next.player.push(DealtCard::face_up(next.deck.deal_one()?));

        if next.player.is_bust() {
            debug!("player busts with {}", next.player.total());
            next.dealer.reveal_all();
            next.result = Some(Settlement::bust(next.bet));
            next.phase = Phase::Finished;
        }

        self.commit(next);
        Ok(self.snapshot())
    }

    pub fn stand(&mut self) -> Result<Snapshot, EngineError> {
        self.expect_phase(Phase::Playing, "stand")?;
        self.ensure_idle()?;
        let mut next = self.round.clone();
        next.phase = Phase::DealerTurn;
        self.run_dealer_and_settle(&mut next)?;
        self.commit(next);
        Ok(self.snapshot())
    }

    /// Clears the finished round. Already betting is a no-op.
    pub fn reset(&mut self) -> Result<Snapshot, EngineError> {
        match self.round.phase {
            Phase::Finished | Phase::Betting => {
                self.round = Round::idle();
                Ok(self.snapshot())
            }
            phase => Err(EngineError::InvalidState {
                action: "reset",
                phase,
            }),
        }
    }

    /// Refills an empty bankroll to its starting balance and clears the table.
    pub fn start_over(&mut self) -> Result<Snapshot, EngineError> {
        match self.round.phase {
            Phase::Finished | Phase::Betting => {}
            phase => {
                return Err(EngineError::InvalidState {
                    action: "start over",
                    phase,
                })
            }
        }
        self.ensure_idle()?;
        let balance = self.bankroll.balance();
        if balance > 0.0 {
            return Err(EngineError::BalanceRemaining(balance));
        }
        self.bankroll.restore_default()?;
        info!("bankroll restored to {}", self.bankroll.balance());
        self.round = Round::idle();
        Ok(self.snapshot())
    }

    /// The previous stake, if the bankroll still covers it.
    pub fn repeat_last_bet(&self) -> Option<f64> {
        let last = self.stats.last_bet;
        (last > 0.0 && last <= self.bankroll.balance()).then_some(last)
    }

    pub fn snapshot(&self) -> Snapshot {
        let round = &self.round;
        let dealer = round.dealer.visible();
        Snapshot {
            phase: round.phase,
            player: round.player.cards.clone(),
            player_total: round.player.total(),
            dealer_total: crate::hand::total(&dealer),
            dealer,
            bet: round.bet,
            result: round.result.map(|settlement| settlement.outcome),
            payout: round.result.map(|settlement| settlement.payout),
            celebration: round.result.and_then(|settlement| settlement.celebration()),
            balance: self.bankroll.balance(),
            stats: self.stats,
        }
    }

    fn check_bet(&self, amount: f64) -> Result<(), EngineError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EngineError::InvalidBet(format!("bet must be positive, got {amount}")));
        }
        let balance = self.bankroll.balance();
        if amount > balance {
            return Err(EngineError::InvalidBet(format!(
                "bet {amount} exceeds balance {balance}"
            )));
        }
        Ok(())
    }

    /// Plays the dealer out and credits the payout. `next` is only a draft;
    /// nothing is committed here.
    fn run_dealer_and_settle(&mut self, next: &mut Round) -> Result<(), EngineError> {
        play_dealer(&mut next.dealer, &mut next.deck)?;
        let settlement = settle(&next.player, &next.dealer, next.bet);
        if settlement.payout > 0.0 {
            self.bankroll.credit(settlement.payout)?;
        }
        info!(
            "round settled: {:?}, player {} vs dealer {}, payout {}",
            settlement.outcome,
            next.player.total(),
            next.dealer.total(),
            settlement.payout
        );
        next.result = Some(settlement);
        next.phase = Phase::Finished;
        Ok(())
    }

    fn commit(&mut self, next: Round) {
        if next.phase == Phase::Finished {
            self.stats.games_played += 1;
            if next.result.map_or(false, |settlement| settlement.outcome.is_win()) {
                self.stats.wins += 1;
            }
        }
        self.round = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bankroll::{LocalBankroll, TokenLedger},
        card::{Card, Rank},
        error::BankrollError,
    };

    /// Local chips whose next credit fails once.
    struct FlakyBankroll {
        inner: LocalBankroll,
        fail_next_credit: bool,
    }

    impl Bankroll for FlakyBankroll {
        fn balance(&self) -> f64 {
            self.inner.balance()
        }

        fn debit(&mut self, amount: f64) -> Result<(), BankrollError> {
            self.inner.debit(amount)
        }

        fn credit(&mut self, amount: f64) -> Result<(), BankrollError> {
            if self.fail_next_credit {
                self.fail_next_credit = false;
                return Err(BankrollError::Unavailable("ledger timed out".into()));
            }
            self.inner.credit(amount)
        }

        fn restore_default(&mut self) -> Result<(), BankrollError> {
            self.inner.restore_default()
        }
    }

    /// Full deck that deals `order` first, front to back.
    fn deck_dealing(order: &[Rank]) -> Deck {
        let mut rest = Deck::ordered().cards().to_vec();
        let mut dealt = Vec::new();
        for rank in order {
            let index = rest
                .iter()
                .position(|card| card.rank() == Some(*rank))
                .unwrap();
            dealt.push(rest.remove(index));
        }
        dealt.reverse();
        rest.extend(dealt);
        Deck::stacked(rest)
    }

    fn game() -> BlackjackGame<LocalBankroll> {
        BlackjackGame::new(LocalBankroll::default(), Some(1))
    }

    #[test]
    fn test_place_bet_deals_and_debits() {
        let mut game = game();
        let snap = game
            .place_bet_with_deck(100.0, deck_dealing(&[Rank::Ten, Rank::Nine, Rank::Six, Rank::Seven]))
            .unwrap();
        assert_eq!(snap.phase, Phase::Playing);
        assert_eq!(snap.balance, 900.0);
        assert_eq!(snap.player_total, 16);
        assert_eq!(snap.dealer[0].card, Card::Concealed);
        assert_eq!(snap.dealer_total, 7);
        assert_eq!(game.round().cards_in_play(), 52);
    }

    #[test]
    fn test_invalid_bets() {
        let mut game = game();
        assert!(matches!(game.place_bet(0.0), Err(EngineError::InvalidBet(_))));
        assert!(matches!(game.place_bet(-5.0), Err(EngineError::InvalidBet(_))));
        assert!(matches!(game.place_bet(f64::NAN), Err(EngineError::InvalidBet(_))));
        assert!(matches!(game.place_bet(1000.5), Err(EngineError::InvalidBet(_))));
        assert_eq!(game.phase(), Phase::Betting);
        assert_eq!(game.bankroll().balance(), 1000.0);
    }

    #[test]
    fn test_player_blackjack_settles_immediately() {
        let mut game = game();
        let snap = game
            .place_bet_with_deck(100.0, deck_dealing(&[Rank::Ace, Rank::Nine, Rank::King, Rank::Seven]))
            .unwrap();
        assert_eq!(snap.phase, Phase::Finished);
        assert_eq!(snap.result, Some(Outcome::Blackjack));
        assert_eq!(snap.payout, Some(250.0));
        assert_eq!(snap.balance, 1150.0);
        assert_eq!(snap.celebration, Some(150.0));
        assert_eq!(snap.stats.wins, 1);
    }

    #[test]
    fn test_hit_to_bust_skips_dealer_draw() {
        let mut game = game();
        game.place_bet_with_deck(
            50.0,
            deck_dealing(&[Rank::Ten, Rank::Two, Rank::Six, Rank::Three, Rank::King]),
        )
        .unwrap();
        let before = game.round().deck.remaining();
        let snap = game.hit().unwrap();
        assert_eq!(snap.phase, Phase::Finished);
        assert_eq!(snap.result, Some(Outcome::Lose));
        assert_eq!(snap.payout, Some(0.0));
        assert_eq!(snap.balance, 950.0);
        assert_eq!(game.round().deck.remaining(), before - 1);
        assert_eq!(game.round().dealer.len(), 2);
        assert!(!game.round().dealer.has_hidden());
    }

    #[test]
    fn test_stand_runs_dealer_and_pays() {
        let mut game = game();
        // Player 20, dealer 16 then draws a 6 and busts.
        game.place_bet_with_deck(
            50.0,
            deck_dealing(&[Rank::King, Rank::Nine, Rank::Queen, Rank::Seven, Rank::Six]),
        )
        .unwrap();
        let snap = game.stand().unwrap();
        assert_eq!(snap.phase, Phase::Finished);
        assert_eq!(snap.dealer_total, 22);
        assert_eq!(snap.result, Some(Outcome::Win));
        assert_eq!(snap.balance, 1050.0);
        assert_eq!(game.round().cards_in_play(), 52);
    }

    #[test]
    fn test_push_returns_stake() {
        let mut game = game();
        game.place_bet_with_deck(
            50.0,
            deck_dealing(&[Rank::King, Rank::Nine, Rank::Eight, Rank::Nine]),
        )
        .unwrap();
        let snap = game.stand().unwrap();
        assert_eq!(snap.result, Some(Outcome::Push));
        assert_eq!(snap.balance, 1000.0);
    }

    #[test]
    fn test_actions_in_wrong_phase() {
        let mut game = game();
        assert!(matches!(game.hit(), Err(EngineError::InvalidState { .. })));
        assert!(matches!(game.stand(), Err(EngineError::InvalidState { .. })));

        game.place_bet_with_deck(10.0, deck_dealing(&[Rank::Two, Rank::Three, Rank::Four, Rank::Five]))
            .unwrap();
        assert!(matches!(game.place_bet(10.0), Err(EngineError::InvalidState { .. })));
        assert!(matches!(game.reset(), Err(EngineError::InvalidState { .. })));

        game.stand().unwrap();
        let err = game.hit().unwrap_err();
        assert_eq!(err.to_string(), "cannot hit while finished");
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut game = game();
        game.place_bet_with_deck(10.0, deck_dealing(&[Rank::King, Rank::Nine, Rank::Queen, Rank::Eight]))
            .unwrap();
        game.stand().unwrap();
        let first = game.reset().unwrap();
        let second = game.reset().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.phase, Phase::Betting);
        assert!(first.player.is_empty());
        assert!(first.dealer.is_empty());
        assert_eq!(first.result, None);
    }

    #[test]
    fn test_repeat_last_bet() {
        let mut game = BlackjackGame::new(LocalBankroll::new(100.0), Some(3));
        assert_eq!(game.repeat_last_bet(), None);
        game.place_bet_with_deck(
            60.0,
            deck_dealing(&[Rank::Ten, Rank::Two, Rank::Six, Rank::Three, Rank::King]),
        )
        .unwrap();
        game.hit().unwrap();
        game.reset().unwrap();
        // 40 left, a 60 stake no longer fits.
        assert_eq!(game.repeat_last_bet(), None);
        assert_eq!(game.stats().games_played, 1);
        assert_eq!(game.stats().last_bet, 60.0);
    }

    #[test]
    fn test_pending_remote_request_blocks_bet_without_side_effects() {
        let mut ledger = TokenLedger::default();
        ledger.set_api_key("key");
        let mut game = BlackjackGame::new(ledger, Some(5));
        game.bankroll_mut().begin_sync().unwrap();

        let err = game.place_bet(100.0).unwrap_err();
        assert_eq!(err, EngineError::RequestPending);
        assert_eq!(game.phase(), Phase::Betting);
        assert!(game.round().player.is_empty());
        assert_eq!(game.bankroll().balance(), 1000.0);
    }

    #[test]
    fn test_pending_remote_request_blocks_hit_and_stand() {
        let mut ledger = TokenLedger::default();
        ledger.set_api_key("key");
        let mut game = BlackjackGame::new(ledger, Some(5));
        game.place_bet_with_deck(
            10.0,
            deck_dealing(&[Rank::Ten, Rank::Two, Rank::Six, Rank::Three, Rank::King]),
        )
        .unwrap();
        let before = game.snapshot();

        game.bankroll_mut().begin_sync().unwrap();
        assert_eq!(game.hit().unwrap_err(), EngineError::RequestPending);
        assert_eq!(game.stand().unwrap_err(), EngineError::RequestPending);
        assert_eq!(game.round().player.len(), 2);
        assert_eq!(game.snapshot(), before);
        assert_eq!(game.stats().games_played, 0);

        game.bankroll_mut().fail_sync("offline");
        let snap = game.hit().unwrap();
        assert_eq!(snap.phase, Phase::Finished);
        assert_eq!(snap.result, Some(Outcome::Lose));
    }

    #[test]
    fn test_failed_blackjack_payout_refunds_stake() {
        let bank = FlakyBankroll {
            inner: LocalBankroll::default(),
            fail_next_credit: true,
        };
        let mut game = BlackjackGame::new(bank, Some(9));
        let err = game
            .place_bet_with_deck(100.0, deck_dealing(&[Rank::Ace, Rank::Nine, Rank::King, Rank::Seven]))
            .unwrap_err();
        assert_eq!(err, EngineError::RemoteUnavailable("ledger timed out".into()));
        assert_eq!(game.bankroll().balance(), 1000.0);
        assert_eq!(game.phase(), Phase::Betting);
        assert!(game.round().player.is_empty());
        assert_eq!(game.stats().games_played, 0);
        assert_eq!(game.stats().last_bet, 0.0);
    }

    #[test]
    fn test_start_over_when_broke() {
        let mut game = BlackjackGame::new(LocalBankroll::new(50.0), Some(4));
        game.place_bet_with_deck(
            50.0,
            deck_dealing(&[Rank::Ten, Rank::Two, Rank::Six, Rank::Three, Rank::King]),
        )
        .unwrap();
        assert!(matches!(game.start_over(), Err(EngineError::InvalidState { .. })));

        game.hit().unwrap();
        assert_eq!(game.bankroll().balance(), 0.0);
        let snap = game.start_over().unwrap();
        assert_eq!(snap.phase, Phase::Betting);
        assert_eq!(snap.balance, 50.0);
        assert!(snap.player.is_empty());
        assert_eq!(snap.stats.games_played, 1);

        assert_eq!(game.start_over().unwrap_err(), EngineError::BalanceRemaining(50.0));
    }

    #[test]
    fn test_failed_credit_leaves_round_playing() {
        let mut ledger = TokenLedger::default();
        ledger.set_api_key("key");
        let mut game = BlackjackGame::new(ledger, Some(5));
        game.place_bet_with_deck(
            50.0,
            deck_dealing(&[Rank::King, Rank::Nine, Rank::Queen, Rank::Seven, Rank::Six]),
        )
        .unwrap();
        let before = game.snapshot();

        game.bankroll_mut().begin_sync().unwrap();
        assert_eq!(game.stand().unwrap_err(), EngineError::RequestPending);
        assert_eq!(game.snapshot(), before);

        game.bankroll_mut().fail_sync("offline");
        let snap = game.stand().unwrap();
        assert_eq!(snap.result, Some(Outcome::Win));
        assert_eq!(snap.balance, 1050.0);
    }

    #[test]
    fn test_seeded_games_deal_the_same_cards() {
        let mut a = game();
        let mut b = game();
        assert_eq!(a.place_bet(10.0).unwrap(), b.place_bet(10.0).unwrap());
    }
}

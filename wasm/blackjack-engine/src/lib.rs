use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod bankroll;
pub mod card;
pub mod config;
pub mod dealer;
pub mod deck;
pub mod error;
pub mod game;
pub mod hand;
mod logger;
pub mod settlement;

pub use bankroll::{Bankroll, LocalBankroll, TokenLedger};
pub use card::{Card, DealtCard, Rank, Suit};
pub use config::TableConfig;
pub use dealer::{play_dealer, DealerState};
pub use deck::Deck;
pub use error::{BankrollError, EngineError};
pub use game::{BlackjackGame, Phase, Round, SessionStats, Snapshot};
pub use hand::{Hand, Role};
pub use settlement::{settle, Outcome, Settlement};

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|err| JsValue::from_str(&format!("Serialization failed: {err}")))
}

fn snapshot_to_js(result: Result<Snapshot, EngineError>) -> Result<JsValue, JsValue> {
    let snapshot = result.map_err(|err| JsValue::from_str(&format!("Blackjack error: {err}")))?;
    to_js(&snapshot)
}

fn ledger_error(err: BankrollError) -> JsValue {
    JsValue::from_str(&format!("Token ledger error: {err}"))
}

/// A single-seat table backed by the token ledger.
#[wasm_bindgen]
pub struct BlackjackTable {
    game: BlackjackGame<TokenLedger>,
}

#[wasm_bindgen]
impl BlackjackTable {
    #[wasm_bindgen(constructor)]
    pub fn new(config: &JsValue) -> Result<BlackjackTable, JsValue> {
        console_error_panic_hook::set_once();
        let config: TableConfig = if config.is_undefined() || config.is_null() {
            TableConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config.clone())
                .map_err(|err| JsValue::from_str(&format!("Invalid config: {err}")))?
        };
        logger::init(config.log_level());

        let ledger = TokenLedger::new(config.starting_balance, config.min_remote_balance);
        Ok(BlackjackTable {
            game: BlackjackGame::new(ledger, config.seed),
        })
    }

    pub fn place_bet(&mut self, amount: f64) -> Result<JsValue, JsValue> {
        snapshot_to_js(self.game.place_bet(amount))
    }

    pub fn hit(&mut self) -> Result<JsValue, JsValue> {
        snapshot_to_js(self.game.hit())
    }

    pub fn stand(&mut self) -> Result<JsValue, JsValue> {
        snapshot_to_js(self.game.stand())
    }

    pub fn reset(&mut self) -> Result<JsValue, JsValue> {
        snapshot_to_js(self.game.reset())
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.game.snapshot())
    }

    /// Refills an empty bankroll once the player is out of chips.
    pub fn start_over(&mut self) -> Result<JsValue, JsValue> {
        snapshot_to_js(self.game.start_over())
    }

    pub fn repeat_last_bet(&self) -> Option<f64> {
        self.game.repeat_last_bet()
    }

    pub fn balance(&self) -> f64 {
        self.game.bankroll().balance()
    }

    pub fn ledger_status(&self) -> Result<JsValue, JsValue> {
        to_js(&self.game.bankroll().status())
    }

    pub fn set_api_key(&mut self, key: String) {
        self.game.bankroll_mut().set_api_key(key);
    }

    pub fn clear_api_key(&mut self) {
        self.game.bankroll_mut().clear_api_key();
    }

    /// Call before fetching `/api/credits`; rejects a second fetch.
    pub fn begin_balance_sync(&mut self) -> Result<(), JsValue> {
        self.game.bankroll_mut().begin_sync().map_err(ledger_error)
    }

    pub fn apply_credits_response(&mut self, status: u16, body: &str) -> Result<f64, JsValue> {
        self.game
            .bankroll_mut()
            .apply_credits_response(status, body)
            .map_err(ledger_error)
    }

    pub fn fail_balance_sync(&mut self, message: &str) -> JsValue {
        ledger_error(self.game.bankroll_mut().fail_sync(message))
    }
}

/// Total of card labels such as `["A♠", "K♥"]`; face-down `??` counts zero.
#[wasm_bindgen]
pub fn card_total(cards: &js_sys::Array) -> Result<u8, JsValue> {
    total_of_labels(cards.iter().map(|value| value.as_string()))
        .map_err(|err| JsValue::from_str(&format!("Invalid card: {err}")))
}

/// Every entry must be a card label; anything else rejects the whole list.
fn total_of_labels<I>(labels: I) -> Result<u8, EngineError>
where
    I: IntoIterator<Item = Option<String>>,
{
    let labels = labels
        .into_iter()
        .enumerate()
        .map(|(index, label)| {
            label.ok_or_else(|| EngineError::InvalidCard(format!("entry {index} is not a string")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let cards = card::parse_cards(&labels)?;
    Ok(hand::total(&cards))
}

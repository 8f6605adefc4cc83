use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::BankrollError;

pub const DEFAULT_BALANCE: f64 = 1000.0;
/// Below this many remote tokens the table keeps playing with local chips.
pub const MIN_REMOTE_BALANCE: f64 = 100.0;

/// Where stakes come from and payouts go.
pub trait Bankroll {
    fn balance(&self) -> f64;
    fn debit(&mut self, amount: f64) -> Result<(), BankrollError>;
    fn credit(&mut self, amount: f64) -> Result<(), BankrollError>;
    /// Puts the starting balance back after the player goes broke.
    fn restore_default(&mut self) -> Result<(), BankrollError>;

    /// True while a remote request is outstanding.
    fn is_pending(&self) -> bool {
        false
    }
}

fn check_amount(amount: f64) -> Result<(), BankrollError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(BankrollError::InvalidAmount(amount))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocalBankroll {
    balance: f64,
    starting_balance: f64,
}

impl LocalBankroll {
    pub fn new(balance: f64) -> Self {
        LocalBankroll {
            balance,
            starting_balance: balance,
        }
    }
}

impl Default for LocalBankroll {
    fn default() -> Self {
        LocalBankroll::new(DEFAULT_BALANCE)
    }
}

impl Bankroll for LocalBankroll {
    fn balance(&self) -> f64 {
        self.balance
    }

    fn debit(&mut self, amount: f64) -> Result<(), BankrollError> {
        check_amount(amount)?;
        if amount > self.balance {
            return Err(BankrollError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    fn credit(&mut self, amount: f64) -> Result<(), BankrollError> {
        check_amount(amount)?;
        self.balance += amount;
        Ok(())
    }

    fn restore_default(&mut self) -> Result<(), BankrollError> {
        self.balance = self.starting_balance;
        Ok(())
    }
}

/// One entry of the credits history; other fields are ignored.
#[derive(Debug, Deserialize)]
pub struct CreditTransaction {
    pub amount_cents: serde_json::Value,
}

impl CreditTransaction {
    /// The credits API sends amounts as numbers or numeric strings.
    fn amount(&self) -> f64 {
        match &self.amount_cents {
            serde_json::Value::Number(number) => number.as_f64().unwrap_or(0.0),
            serde_json::Value::String(text) => text.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreditsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Vec<CreditTransaction>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatus {
    pub balance: f64,
    pub is_connected: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub has_api_key: bool,
}

/// Token balance that is either local chips or mirrors a remote credits
/// account reached with an API key.
///
/// The HTTP request itself is made by the host: it calls [`begin_sync`],
/// performs the fetch, then hands the result to [`apply_credits_response`]
/// or [`fail_sync`]. Only one request may be outstanding; while it is, the
/// ledger refuses debits and credits so the round cannot move on stale funds.
///
/// [`begin_sync`]: TokenLedger::begin_sync
/// [`apply_credits_response`]: TokenLedger::apply_credits_response
/// [`fail_sync`]: TokenLedger::fail_sync
#[derive(Clone, Debug)]
pub struct TokenLedger {
    balance: f64,
    default_balance: f64,
    min_remote_balance: f64,
    api_key: Option<String>,
    connected: bool,
    loading: bool,
    error: Option<String>,
}

impl TokenLedger {
    pub fn new(default_balance: f64, min_remote_balance: f64) -> Self {
        TokenLedger {
            balance: default_balance,
            default_balance,
            min_remote_balance,
            api_key: None,
            connected: false,
            loading: false,
            error: None,
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> LedgerStatus {
        LedgerStatus {
            balance: self.balance,
            is_connected: self.connected,
            is_loading: self.loading,
            error: self.error.clone(),
            has_api_key: self.api_key.is_some(),
        }
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = Some(key.into());
        self.error = None;
    }

    pub fn clear_api_key(&mut self) {
        self.api_key = None;
        self.connected = false;
        self.loading = false;
        self.error = None;
        self.balance = self.default_balance;
    }

    /// Marks a balance request as outstanding.
    pub fn begin_sync(&mut self) -> Result<(), BankrollError> {
        if self.api_key.is_none() {
            self.connected = false;
            return Err(BankrollError::Unavailable("no API key set".into()));
        }
        if self.loading {
            return Err(BankrollError::RequestPending);
        }
        self.loading = true;
        self.error = None;
        Ok(())
    }

    /// Applies the host's `GET /api/credits` result. A response nobody is
    /// waiting for, e.g. one that lands after the key was cleared, is
    /// rejected and changes nothing.
    pub fn apply_credits_response(&mut self, status: u16, body: &str) -> Result<f64, BankrollError> {
        if !self.loading {
            return Err(BankrollError::Unavailable(
                "no balance request outstanding".into(),
            ));
        }
        if self.api_key.is_none() {
            return Err(BankrollError::Unavailable("no API key set".into()));
        }
        self.loading = false;
        if status == 401 {
            return Err(self.disconnect("Invalid API key".into()));
        }
        if !(200..300).contains(&status) {
            return Err(self.disconnect("Failed to fetch balance".into()));
        }

        let response: CreditsResponse = serde_json::from_str(body)
            .map_err(|err| self.disconnect(format!("Malformed credits response: {err}")))?;
        let transactions = match response.data {
            Some(data) if response.success => data,
            _ => {
                self.connected = false;
                return Ok(self.balance);
            }
        };

        let remote: f64 = transactions.iter().map(CreditTransaction::amount).sum();
        if remote >= self.min_remote_balance {
            info!("connected to remote ledger with balance {remote}");
            self.balance = remote;
            self.connected = true;
        } else {
            info!("remote balance {remote} below minimum, staying local");
            self.connected = false;
        }
        Ok(self.balance)
    }

    /// Records a failed request. The balance is left as it was.
    pub fn fail_sync(&mut self, message: impl Into<String>) -> BankrollError {
        self.loading = false;
        self.disconnect(message.into())
    }

    pub fn add_local(&mut self, amount: f64) {
        self.balance += amount;
    }

    fn disconnect(&mut self, message: String) -> BankrollError {
        warn!("token fetch error: {message}");
        self.connected = false;
        self.error = Some(message.clone());
        BankrollError::Unavailable(message)
    }

    fn ensure_idle(&self) -> Result<(), BankrollError> {
        if self.loading {
            Err(BankrollError::RequestPending)
        } else {
            Ok(())
        }
    }
}

impl Default for TokenLedger {
    fn default() -> Self {
        TokenLedger::new(DEFAULT_BALANCE, MIN_REMOTE_BALANCE)
    }
}

impl Bankroll for TokenLedger {
    fn balance(&self) -> f64 {
        self.balance
    }

    fn debit(&mut self, amount: f64) -> Result<(), BankrollError> {
        self.ensure_idle()?;
        check_amount(amount)?;
        if amount > self.balance {
            return Err(BankrollError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    fn credit(&mut self, amount: f64) -> Result<(), BankrollError> {
        self.ensure_idle()?;
        check_amount(amount)?;
        self.balance += amount;
        Ok(())
    }

    fn restore_default(&mut self) -> Result<(), BankrollError> {
        self.ensure_idle()?;
        if self.connected {
            return Err(BankrollError::Unavailable(
                "remote balance cannot be reset locally".into(),
            ));
        }
        self.balance = self.default_balance;
        Ok(())
    }

    fn is_pending(&self) -> bool {
        self.loading
    }
}

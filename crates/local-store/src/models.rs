use core_types::{AccountId, Amount, PotId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Mirrors one bank account for one user (§3 "Account").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub description: String,
    pub account_type: String,
    pub created: Timestamp,
    pub closed: bool,
    pub active_for_sync: bool,
    pub last_sync: Option<Timestamp>,
    /// Most recently observed live balance, opportunistically cached by the
    /// sync engine and the trigger evaluator so that a balance check has
    /// something to fall back to when a live read fails (§4.4 "Live balance
    /// reads"). The account model has no other source of balance truth.
    pub last_known_balance: Option<Amount>,
}

impl Account {
    /// An account is synced only while active and not closed (§3 invariant).
    #[must_use]
    pub const fn is_syncable(&self) -> bool {
        self.active_for_sync && !self.closed
    }
}

/// The closed tag set a pot may be assigned to (§3 "UserPotCategory").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotCategory {
    Bills,
    Savings,
    Holding,
    Spending,
    Emergency,
    Investment,
    Custom,
}

impl PotCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bills => "bills",
            Self::Savings => "savings",
            Self::Holding => "holding",
            Self::Spending => "spending",
            Self::Emergency => "emergency",
            Self::Investment => "investment",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for PotCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PotCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bills" => Ok(Self::Bills),
            "savings" => Ok(Self::Savings),
            "holding" => Ok(Self::Holding),
            "spending" => Ok(Self::Spending),
            "emergency" => Ok(Self::Emergency),
            "investment" => Ok(Self::Investment),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown pot category {other:?}")),
        }
    }
}

/// A named sub-balance within an account (§3 "Pot").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pot {
    pub id: PotId,
    pub account_id: AccountId,
    pub user_id: UserId,
    pub name: String,
    pub style: Option<String>,
    pub balance: Amount,
    pub currency: String,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub deleted: bool,
    /// `0` means no goal.
    pub goal: Amount,
    /// Account-like id used to pull transactions posted against the pot.
    pub pot_current_id: Option<String>,
    pub category: Option<PotCategory>,
}

impl Pot {
    /// A deleted pot is never a valid sweep source or autosorter target
    /// (§3 invariant).
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        !self.deleted
    }

    #[must_use]
    pub const fn has_goal(&self) -> bool {
        self.goal.0 > 0
    }
}

/// One posted bank transaction (§3 "Transaction").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: AccountId,
    pub user_id: UserId,
    pub created: Timestamp,
    pub settled: Option<Timestamp>,
    pub amount: Amount,
    pub currency: String,
    pub description: String,
    pub category: Option<String>,
    pub merchant: Option<String>,
    pub notes: Option<String>,
    pub is_load: bool,
    pub metadata: serde_json::Value,
    pub pot_current_id: Option<String>,
}

/// Classification applied to a transaction posted against a bills pot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillsTransactionType {
    Subscription,
    PotTransfer,
    Other,
}

impl BillsTransactionType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::PotTransfer => "pot_transfer",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for BillsTransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription" => Ok(Self::Subscription),
            "pot_transfer" => Ok(Self::PotTransfer),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown bills transaction type {other:?}")),
        }
    }
}

/// A denormalized mirror of a transaction that flowed through a bills pot
/// (§3 "BillsPotTransaction").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillsPotTransaction {
    pub transaction_id: String,
    pub account_id: AccountId,
    pub user_id: UserId,
    pub pot_id: PotId,
    pub created: Timestamp,
    pub amount: Amount,
    pub description: String,
    pub transaction_type: BillsTransactionType,
    pub is_pot_withdrawal: bool,
}

/// Status of a pot-to-pot transfer intent (§9 "Pot-to-pot Atomicity").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferIntentStatus {
    /// Recorded before the withdraw leg; neither leg confirmed complete.
    Pending,
    /// Withdraw leg confirmed; deposit leg not yet confirmed.
    Withdrawn,
    /// Both legs confirmed; safe to delete or ignore on reconciliation.
    Completed,
}

impl TransferIntentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Withdrawn => "withdrawn",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for TransferIntentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "withdrawn" => Ok(Self::Withdrawn),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown transfer intent status {other:?}")),
        }
    }
}

/// A record of an in-flight two-leg pot transfer, recorded before the first
/// leg so a crash between legs can be detected and completed or logged on
/// startup (§9 "Pot-to-pot Atomicity").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub base_dedupe_id: String,
    pub user_id: UserId,
    pub source_pot_id: Option<PotId>,
    pub source_account_id: Option<AccountId>,
    pub target_pot_id: Option<PotId>,
    pub target_account_id: Option<AccountId>,
    pub amount: Amount,
    pub status: TransferIntentStatus,
    pub created: Timestamp,
}

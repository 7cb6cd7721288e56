//! Supplier ledger vocabulary

use serde::{Deserialize, Serialize};

/// Name of the sentinel supplier used when a purchase arrives without one.
/// Find-or-created idempotently per branch, never deleted.
pub const UNKNOWN_SUPPLIER: &str = "Unknown Supplier";

/// How a supplier payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
    MobileBanking,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::MobileBanking => "mobile_banking",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            "cheque" => Some(PaymentMethod::Cheque),
            "mobile_banking" => Some(PaymentMethod::MobileBanking),
            _ => None,
        }
    }
}

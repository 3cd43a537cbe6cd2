use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::sanitize::clean_field;

/// Character cap for payee names, imposed by the budgeting service.
pub const PAYEE_MAX: usize = 200;
/// Character cap for memos, imposed by the budgeting service.
pub const MEMO_MAX: usize = 100;

/// One normalized bank transaction, ready for upload.
///
/// Transient by design: constructed per parsed row, consumed by the upload
/// call, never persisted. Two transactions with identical fields are
/// indistinguishable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// ISO `YYYY-MM-DD`. A row without a parseable date never becomes a
    /// `Transaction` in the first place.
    pub date: String,
    pub payee_name: Option<String>,
    /// Only the generic fallback dialect carries an explicit category column.
    pub category_name: Option<String>,
    pub memo: Option<String>,
    /// Signed: positive = money into the account, negative = money out.
    pub amount: Decimal,
}

impl Transaction {
    /// Build a transaction from raw field values, sanitizing the free-text
    /// fields (control-char strip, trim, length cap, empty → `None`).
    pub fn new(
        date: String,
        payee_name: Option<&str>,
        category_name: Option<&str>,
        memo: Option<&str>,
        amount: Decimal,
    ) -> Self {
        Transaction {
            date,
            payee_name: payee_name.and_then(|s| clean_field(s, PAYEE_MAX)),
            category_name: category_name.and_then(|s| clean_field(s, PAYEE_MAX)),
            memo: memo.and_then(|s| clean_field(s, MEMO_MAX)),
            amount,
        }
    }
}

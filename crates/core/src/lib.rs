pub mod money;
pub mod sanitize;
pub mod transaction;

pub use money::{parse_amount, to_milliunits};
pub use sanitize::clean_field;
pub use transaction::{Transaction, MEMO_MAX, PAYEE_MAX};

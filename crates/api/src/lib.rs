pub mod client;
pub mod upload;

pub use client::{Account, ApiError, Budget, BudgetService, Client, NewTransaction, SaveResult};
pub use upload::{upload, Choice, UploadOutcome, UploadError};

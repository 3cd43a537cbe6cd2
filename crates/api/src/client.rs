use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.ynab.com/v1";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid or expired access token")]
    InvalidToken,
    #[error("service returned {status}: {detail}")]
    Service { status: u16, detail: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Budget {
    pub id: String,
    pub name: String,
    pub currency_format: Option<CurrencyFormat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyFormat {
    pub iso_code: String,
    pub decimal_digits: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub closed: bool,
}

/// One transaction in the create-transactions request, amount in milliunits.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub account_id: String,
    pub date: String,
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub cleared: String,
    pub approved: bool,
    pub import_id: String,
}

/// The service's answer to a batch create: which transactions it recorded
/// and which import ids it had already seen.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveResult {
    #[serde(default)]
    pub transaction_ids: Vec<String>,
    #[serde(default)]
    pub duplicate_import_ids: Vec<String>,
}

/// The slice of the budgeting service this importer talks to. Implemented by
/// the HTTP [`Client`] and by in-memory fakes in tests.
#[allow(async_fn_in_trait)]
pub trait BudgetService {
    async fn budgets(&self) -> Result<Vec<Budget>, ApiError>;
    async fn accounts(&self, budget_id: &str) -> Result<Vec<Account>, ApiError>;
    async fn create_transactions(
        &self,
        budget_id: &str,
        transactions: Vec<NewTransaction>,
    ) -> Result<SaveResult, ApiError>;
}

// ── Wire envelopes ───────────────────────────────────────────────────────────
// Every response body nests under `data`; errors under `error`.

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct BudgetsData {
    budgets: Vec<Budget>,
}

#[derive(Deserialize)]
struct AccountsData {
    accounts: Vec<Account>,
}

#[derive(Serialize)]
struct SaveRequest {
    transactions: Vec<NewTransaction>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    detail: String,
}

/// Bearer-token HTTP client for the budgeting service.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl Client {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Client {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::InvalidToken);
        }
        let detail = match response.json::<ErrorBody>().await {
            Ok(body) => body.error.detail,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        Err(ApiError::Service {
            status: status.as_u16(),
            detail,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(path, "GET");
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let envelope: Envelope<T> = Self::check(response).await?.json().await?;
        Ok(envelope.data)
    }
}

impl BudgetService for Client {
    async fn budgets(&self) -> Result<Vec<Budget>, ApiError> {
        let data: BudgetsData = self.get("/budgets").await?;
        Ok(data.budgets)
    }

    async fn accounts(&self, budget_id: &str) -> Result<Vec<Account>, ApiError> {
        let data: AccountsData = self.get(&format!("/budgets/{budget_id}/accounts")).await?;
        Ok(data.accounts)
    }

    async fn create_transactions(
        &self,
        budget_id: &str,
        transactions: Vec<NewTransaction>,
    ) -> Result<SaveResult, ApiError> {
        debug!(budget_id, count = transactions.len(), "POST transactions");
        let response = self
            .http
            .post(format!("{}/budgets/{budget_id}/transactions", self.base_url))
            .bearer_auth(&self.token)
            .json(&SaveRequest { transactions })
            .send()
            .await?;
        let envelope: Envelope<SaveResult> = Self::check(response).await?.json().await?;
        Ok(envelope.data)
    }
}

use einzug_core::{to_milliunits, Transaction};
use einzug_import::dedup;
use thiserror::Error;
use tracing::info;

use crate::client::{Account, ApiError, Budget, BudgetService, NewTransaction};

/// An id/name pair offered to the user when resolution is ambiguous.
#[derive(Debug, Clone)]
pub struct Choice {
    pub id: String,
    pub name: String,
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("no budgets found for this token")]
    NoBudgets,
    #[error("several budgets available, pick one: {}", list(.0))]
    AmbiguousBudget(Vec<Choice>),
    #[error("no budget matches '{0}'")]
    UnknownBudget(String),
    #[error("no open accounts in this budget")]
    NoAccounts,
    #[error("several accounts available, pick one: {}", list(.0))]
    AmbiguousAccount(Vec<Choice>),
    #[error("no open account matches '{0}'")]
    UnknownAccount(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

fn list(choices: &[Choice]) -> String {
    choices
        .iter()
        .map(|c| format!("{} ({})", c.name, c.id))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Newly recorded transactions.
    pub imported: usize,
    /// Re-submissions the service silently discarded by import id.
    pub duplicates: usize,
}

/// Upload a parsed batch to the budgeting service.
///
/// Budget and account resolve the same way: an explicit selector (id or
/// name) wins; otherwise a sole candidate is auto-selected; several
/// candidates without a selector is an error that enumerates them. Closed
/// accounts are never candidates. The batch goes out in one call and is not
/// retried.
pub async fn upload<S: BudgetService>(
    service: &S,
    transactions: &[Transaction],
    budget: Option<&str>,
    account: Option<&str>,
) -> Result<UploadOutcome, UploadError> {
    if transactions.is_empty() {
        return Ok(UploadOutcome { imported: 0, duplicates: 0 });
    }

    let budgets = service.budgets().await?;
    let budget = resolve_budget(&budgets, budget)?;

    let accounts = service.accounts(&budget.id).await?;
    let open: Vec<&Account> = accounts.iter().filter(|a| !a.closed).collect();
    let account = resolve_account(&open, account)?;

    let batch: Vec<NewTransaction> = transactions
        .iter()
        .map(|tx| NewTransaction {
            account_id: account.id.clone(),
            date: tx.date.clone(),
            amount: to_milliunits(tx.amount),
            payee_name: tx.payee_name.clone(),
            memo: tx.memo.clone(),
            cleared: "uncleared".to_string(),
            approved: false,
            import_id: dedup::import_id(tx),
        })
        .collect();

    let result = service.create_transactions(&budget.id, batch).await?;
    let outcome = UploadOutcome {
        imported: result.transaction_ids.len(),
        duplicates: result.duplicate_import_ids.len(),
    };
    info!(
        budget = %budget.name,
        account = %account.name,
        imported = outcome.imported,
        duplicates = outcome.duplicates,
        "batch uploaded"
    );
    Ok(outcome)
}

fn resolve_budget<'a>(
    budgets: &'a [Budget],
    wanted: Option<&str>,
) -> Result<&'a Budget, UploadError> {
    if let Some(wanted) = wanted {
        return budgets
            .iter()
            .find(|b| b.id == wanted || b.name == wanted)
            .ok_or_else(|| UploadError::UnknownBudget(wanted.to_string()));
    }
    match budgets {
        [] => Err(UploadError::NoBudgets),
        [sole] => Ok(sole),
        _ => Err(UploadError::AmbiguousBudget(
            budgets
                .iter()
                .map(|b| Choice { id: b.id.clone(), name: b.name.clone() })
                .collect(),
        )),
    }
}

fn resolve_account<'a>(
    open: &[&'a Account],
    wanted: Option<&str>,
) -> Result<&'a Account, UploadError> {
    if let Some(wanted) = wanted {
        return open
            .iter()
            .find(|a| a.id == wanted || a.name == wanted)
            .copied()
            .ok_or_else(|| UploadError::UnknownAccount(wanted.to_string()));
    }
    match open {
        [] => Err(UploadError::NoAccounts),
        [sole] => Ok(*sole),
        _ => Err(UploadError::AmbiguousAccount(
            open.iter()
                .map(|a| Choice { id: a.id.clone(), name: a.name.clone() })
                .collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SaveResult;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Mutex;

    struct FakeService {
        budgets: Vec<Budget>,
        accounts: Vec<Account>,
        result: SaveResult,
        sent: Mutex<Vec<NewTransaction>>,
    }

    impl FakeService {
        fn new(budgets: Vec<Budget>, accounts: Vec<Account>) -> Self {
            FakeService {
                budgets,
                accounts,
                result: SaveResult::default(),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl BudgetService for FakeService {
        async fn budgets(&self) -> Result<Vec<Budget>, ApiError> {
            Ok(self.budgets.clone())
        }

        async fn accounts(&self, _budget_id: &str) -> Result<Vec<Account>, ApiError> {
            Ok(self.accounts.clone())
        }

        async fn create_transactions(
            &self,
            _budget_id: &str,
            transactions: Vec<NewTransaction>,
        ) -> Result<SaveResult, ApiError> {
            let mut result = self.result.clone();
            if result.transaction_ids.is_empty() && result.duplicate_import_ids.is_empty() {
                result.transaction_ids = transactions.iter().map(|t| t.import_id.clone()).collect();
            }
            *self.sent.lock().unwrap() = transactions;
            Ok(result)
        }
    }

    fn budget(id: &str, name: &str) -> Budget {
        Budget { id: id.to_string(), name: name.to_string(), currency_format: None }
    }

    fn account(id: &str, name: &str, closed: bool) -> Account {
        Account {
            id: id.to_string(),
            name: name.to_string(),
            kind: "checking".to_string(),
            closed,
        }
    }

    fn tx(date: &str, amount: &str, payee: &str) -> Transaction {
        Transaction::new(
            date.to_string(),
            Some(payee),
            None,
            None,
            Decimal::from_str(amount).unwrap(),
        )
    }

    #[tokio::test]
    async fn sole_budget_and_account_auto_selected() {
        let service = FakeService::new(
            vec![budget("b1", "Household")],
            vec![account("a1", "Checking", false)],
        );
        let outcome = upload(&service, &[tx("2025-09-29", "-80.00", "TWINT *Sent")], None, None)
            .await
            .unwrap();
        assert_eq!(outcome.imported, 1);
        assert_eq!(outcome.duplicates, 0);

        let sent = service.sent.lock().unwrap();
        assert_eq!(sent[0].account_id, "a1");
        assert_eq!(sent[0].amount, -80_000);
        assert_eq!(sent[0].cleared, "uncleared");
        assert!(!sent[0].approved);
        assert!(sent[0].import_id.starts_with("EZ:-80000:2025-09-29:"));
    }

    #[tokio::test]
    async fn ambiguous_budget_enumerates_choices() {
        let service = FakeService::new(
            vec![budget("b1", "Household"), budget("b2", "Business")],
            vec![account("a1", "Checking", false)],
        );
        let err = upload(&service, &[tx("2025-01-01", "1", "x")], None, None)
            .await
            .unwrap_err();
        match err {
            UploadError::AmbiguousBudget(choices) => {
                assert_eq!(choices.len(), 2);
                assert_eq!(choices[0].name, "Household");
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[tokio::test]
    async fn budget_selected_by_name_or_id() {
        let service = FakeService::new(
            vec![budget("b1", "Household"), budget("b2", "Business")],
            vec![account("a1", "Checking", false)],
        );
        assert!(upload(&service, &[tx("2025-01-01", "1", "x")], Some("Business"), None)
            .await
            .is_ok());
        assert!(upload(&service, &[tx("2025-01-01", "1", "x")], Some("b1"), None)
            .await
            .is_ok());
        assert!(matches!(
            upload(&service, &[tx("2025-01-01", "1", "x")], Some("nope"), None).await,
            Err(UploadError::UnknownBudget(_))
        ));
    }

    #[tokio::test]
    async fn closed_accounts_are_not_candidates() {
        let service = FakeService::new(
            vec![budget("b1", "Household")],
            vec![account("a1", "Old savings", true), account("a2", "Checking", false)],
        );
        // Only one open account, so it is auto-selected.
        let outcome = upload(&service, &[tx("2025-01-01", "1", "x")], None, None)
            .await
            .unwrap();
        assert_eq!(outcome.imported, 1);
        assert_eq!(service.sent.lock().unwrap()[0].account_id, "a2");

        // A closed account cannot be chosen even explicitly.
        assert!(matches!(
            upload(&service, &[tx("2025-01-01", "1", "x")], None, Some("Old savings")).await,
            Err(UploadError::UnknownAccount(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_counts_come_from_the_service() {
        let mut service = FakeService::new(
            vec![budget("b1", "Household")],
            vec![account("a1", "Checking", false)],
        );
        service.result = SaveResult {
            transaction_ids: vec!["t1".to_string()],
            duplicate_import_ids: vec!["EZ:a".to_string(), "EZ:b".to_string()],
        };
        let batch = [
            tx("2025-01-01", "1", "x"),
            tx("2025-01-02", "2", "y"),
            tx("2025-01-03", "3", "z"),
        ];
        let outcome = upload(&service, &batch, None, None).await.unwrap();
        assert_eq!(outcome, UploadOutcome { imported: 1, duplicates: 2 });
    }

    #[tokio::test]
    async fn empty_batch_skips_the_network() {
        let service = FakeService::new(vec![], vec![]);
        // No budgets configured at all, but an empty batch never gets that far.
        let outcome = upload(&service, &[], None, None).await.unwrap();
        assert_eq!(outcome, UploadOutcome { imported: 0, duplicates: 0 });
    }

    #[tokio::test]
    async fn no_open_accounts_is_an_error() {
        let service = FakeService::new(
            vec![budget("b1", "Household")],
            vec![account("a1", "Old", true)],
        );
        assert!(matches!(
            upload(&service, &[tx("2025-01-01", "1", "x")], None, None).await,
            Err(UploadError::NoAccounts)
        ));
    }
}

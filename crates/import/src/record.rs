use csv::StringRecord;
use einzug_core::{parse_amount, Transaction};
use thiserror::Error;

use crate::date;
use crate::dialect::ColumnKind;

/// Why a single row was rejected. Rejection skips the row, never the batch.
#[derive(Error, Debug)]
pub enum RowError {
    #[error("row has no date value")]
    MissingDate,
    #[error("unrecognized date '{0}'")]
    BadDate(String),
}

/// Normalize one raw row into a `Transaction`, interpreting fields per the
/// dialect's positional column mapping.
///
/// The mapping and the physical row may disagree in length: extra physical
/// columns beyond the mapping are ignored, and mapped positions past the end
/// of the row are treated as absent.
pub fn normalize_row(
    record: &StringRecord,
    columns: &[ColumnKind],
    date_format: Option<&str>,
) -> Result<Transaction, RowError> {
    let mut date_raw = None;
    let mut payee = None;
    let mut category = None;
    let mut memo = None;
    let mut amount_raw = None;
    let mut inflow_raw = None;
    let mut outflow_raw = None;

    for (i, kind) in columns.iter().enumerate() {
        let Some(field) = record.get(i) else { break };
        match kind {
            ColumnKind::Date => date_raw = Some(field),
            ColumnKind::Payee => payee = Some(field),
            ColumnKind::Category => category = Some(field),
            ColumnKind::Memo => memo = Some(field),
            ColumnKind::Amount => amount_raw = Some(field),
            ColumnKind::Inflow => inflow_raw = Some(field),
            ColumnKind::Outflow => outflow_raw = Some(field),
            ColumnKind::Skip => {}
        }
    }

    // Inflow/outflow columns take precedence over a single signed amount;
    // outflow is always subtracted, regardless of how the bank signs it.
    let amount = if inflow_raw.is_some() || outflow_raw.is_some() {
        parse_amount(inflow_raw.unwrap_or_default())
            - parse_amount(outflow_raw.unwrap_or_default())
    } else {
        parse_amount(amount_raw.unwrap_or_default())
    };

    let token = date_raw.map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Err(RowError::MissingDate);
    }
    let iso = date::normalize(token, date_format);
    if !date::is_iso(&iso) {
        return Err(RowError::BadDate(token.to_string()));
    }

    Ok(Transaction::new(iso, payee, category, memo, amount))
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

/// A table row must carry at least this many cells: payee, amount, one
/// ignored cell, notes and date.
pub const MIN_CELLS: usize = 5;

/// Raw cell text as lifted out of the HTML table, before any normalization.
/// Field order follows the cell positions (0, 1, 3, 4); cell 2 carries no
/// documented meaning and is dropped at extraction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawRow {
    pub payee: String,
    pub amount: String,
    pub notes: String,
    pub transaction_date: String,
}

/// A validated transaction ready for CSV emission. Field order here is the
/// CSV column order, so we can hand the struct to `csv::Writer::serialize`
/// directly. `amount` serializes as a plain decimal string thanks to
/// rust_decimal's `serde-str` feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Record {
    pub payee: String,
    pub amount: Decimal,
    pub notes: String,
    pub transaction_date: String,
}

/// How transaction dates are handled. The bank export's date format is left
/// to the downstream finance application by default, so `Passthrough` keeps
/// the trimmed string as-is. `Strict` parses with the given chrono format
/// and re-emits ISO `%Y-%m-%d`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum DateFormat {
    #[default]
    Passthrough,
    Strict(String),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Options {
    pub date_format: DateFormat,
}

/// Everything that can go wrong between an HTML row and a valid `Record`.
/// Any of these aborts the whole run; rows are never skipped or repaired.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("table row has {found} cells, expected at least {MIN_CELLS}")]
    MalformedRow { found: usize },
    #[error("amount {raw:?} is not numeric after separator normalization")]
    InvalidAmount { raw: String },
    #[error("{field} must be a non-empty string")]
    Validation { field: &'static str },
    #[error("date {raw:?} does not match format {format:?}")]
    InvalidDate { raw: String, format: String },
}

/// Rewrite a European-formatted amount ("1.234,56") into a parseable decimal
/// string ("1234.56"): every "." is a thousands separator and is deleted,
/// then "," becomes the decimal point. Already-US-formatted input would be
/// corrupted by this; there is no way to tell the two conventions apart from
/// a single value, so the bank's convention is assumed.
pub(crate) fn normalize_amount(raw: &str) -> String {
    raw.trim().replace('.', "").replace(',', ".")
}

impl Record {
    /// Normalize and validate a raw row. This is the whole schema: payee and
    /// notes non-empty, amount a parseable decimal, date a string (checked
    /// against the configured format in strict mode).
    pub(crate) fn from_raw(raw: RawRow, options: &Options) -> Result<Self, Error> {
        let payee = raw.payee.trim().to_string();
        if payee.is_empty() {
            return Err(Error::Validation { field: "payee" });
        }
        let notes = raw.notes.trim().to_string();
        if notes.is_empty() {
            return Err(Error::Validation { field: "notes" });
        }
        let normalized = normalize_amount(&raw.amount);
        let amount = Decimal::from_str(&normalized).map_err(|_| Error::InvalidAmount {
            raw: raw.amount.trim().to_string(),
        })?;
        let transaction_date = match &options.date_format {
            DateFormat::Passthrough => raw.transaction_date.trim().to_string(),
            DateFormat::Strict(format) => {
                let date = NaiveDate::parse_from_str(raw.transaction_date.trim(), format)
                    .map_err(|_| Error::InvalidDate {
                        raw: raw.transaction_date.trim().to_string(),
                        format: format.clone(),
                    })?;
                date.format("%Y-%m-%d").to_string()
            }
        };
        Ok(Self {
            payee,
            amount,
            notes,
            transaction_date,
        })
    }
}

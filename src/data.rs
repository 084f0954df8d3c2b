use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Source line of a record, 1-based; only ever used in diagnostics.
pub type Line = usize;

pub const CURRENCY: &str = "£";

/// A field value that either validated, or didn't and kept its raw text so
/// it can still be shown. Entries are never dropped because of a bad field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Parsed<T> {
    Valid(T),
    Invalid(String),
}

impl<T> Parsed<T> {
    pub fn valid(&self) -> Option<&T> {
        match self {
            Parsed::Valid(value) => Some(value),
            Parsed::Invalid(_) => None,
        }
    }
}

/// Canonical transaction. `amount` always moves from `from` to `to`.
///
/// Entries are built once by the normalizer and then shared read-only (behind
/// an `Rc`) between the payer and the payee accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub date: Parsed<NaiveDate>,
    pub from: String,
    pub to: String,
    pub narrative: String,
    pub amount: Parsed<Decimal>,
    pub line: Line,
}

impl Entry {
    /// Signed effect of this entry on the balance of account `name`.
    ///
    /// An invalid amount moves nothing, and a self-transfer nets to zero.
    pub fn delta_for(&self, name: &str) -> Decimal {
        let Some(amount) = self.amount.valid() else {
            return Decimal::ZERO;
        };
        match (self.from == name, self.to == name) {
            (true, false) => -*amount,
            (false, true) => *amount,
            _ => Decimal::ZERO,
        }
    }
}

/// Which field of a record failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Date,
    Amount,
    /// A finite number that a `Decimal` cannot hold
    AmountRange,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Date => f.write_str("a correctly formatted date"),
            Field::Amount => f.write_str("a number in the amount field"),
            Field::AmountRange => f.write_str("an amount within range"),
        }
    }
}

/// A per-record validation failure. It marks the import as "completed with
/// errors" but never stops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordError {
    pub line: Line,
    pub field: Field,
    pub raw: String,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Entry on line {} does not have {} (got {:?})",
            self.line, self.field, self.raw
        )
    }
}

/// Domain errors. Anything structural here aborts an import as a whole;
/// the rest are command-level misses reported back to the user.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("File format not supported for {0}, use csv, json, or xml")]
    UnsupportedFormat(String),
    #[error("Markup is not a TransactionList of SupportTransaction nodes: {0}")]
    MalformedMarkup(String),
    #[error("Structured records are not a list of objects: {0}")]
    MalformedRecords(String),
    #[error("No account named {0:?}")]
    AccountNotFound(String),
    #[error("A file has already been processed")]
    AlreadyImported,
    #[error("No file has been processed yet")]
    NothingImported,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{Entry, Parsed};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::rc::Rc;

    /// Shorthand for a valid entry dated 2020-01-01
    pub fn entry(from: &str, to: &str, amount: Decimal, line: usize) -> Rc<Entry> {
        Rc::new(Entry {
            date: Parsed::Valid(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            from: from.to_owned(),
            to: to.to_owned(),
            narrative: format!("line {line}"),
            amount: Parsed::Valid(amount),
            line,
        })
    }

    pub fn bad_amount(from: &str, to: &str, line: usize) -> Rc<Entry> {
        let mut entry = (*entry(from, to, Decimal::ZERO, line)).clone();
        entry.amount = Parsed::Invalid("abc".to_owned());
        Rc::new(entry)
    }
}

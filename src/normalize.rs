use crate::{
    data::{Entry, Field, Parsed, RecordError},
    read::{EntryUser, RawDate, RawEntry},
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::{rc::Rc, str::FromStr};

/// Day zero of spreadsheet serial dates (this absorbs the 1900 leap year bug)
const SPREADSHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Outcome of normalizing one file: every record in source order, plus what
/// went wrong with some of them.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    pub entries: Vec<Rc<Entry>>,
    pub errors: Vec<RecordError>,
}

impl Journal {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Hand every entry, in file order, to `user`
    pub fn replay<U: EntryUser>(&self, user: &mut U) {
        for entry in &self.entries {
            user.use_entry(Rc::clone(entry));
        }
    }
}

/// A finite number that still does not fit a `Decimal` (too large, or too
/// many decimal places) fails as `AmountRange` rather than `Amount`.
pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, Field> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Field::AmountRange,
            _ => Field::Amount,
        })
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Whole days since the spreadsheet epoch; a fractional time of day is dropped.
pub(crate) fn parse_serial_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let days = match raw.parse::<i64>() {
        Ok(days) => days,
        Err(_) => {
            let days = raw.parse::<f64>().ok().filter(|d| d.is_finite())?;
            days.trunc() as i64
        }
    };
    let (y, m, d) = SPREADSHEET_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_signed(Duration::try_days(days)?)
}

fn check<T>(
    line: usize,
    text: String,
    parsed: Result<T, Field>,
    errors: &mut Vec<RecordError>,
) -> Parsed<T> {
    match parsed {
        Ok(value) => Parsed::Valid(value),
        Err(field) => {
            let error = RecordError {
                line,
                field,
                raw: text.clone(),
            };
            log::error!("{error}");
            errors.push(error);
            Parsed::Invalid(text)
        }
    }
}

/// Validate a record's date and amount and build its `Entry`. The entry is
/// produced even when validation fails so line numbers stay aligned.
fn normalize_one(raw: RawEntry, errors: &mut Vec<RecordError>) -> Entry {
    let line = raw.line;
    let (date_text, date) = match raw.date {
        RawDate::Text(text) => {
            let date = parse_date(&text);
            (text, date)
        }
        RawDate::Serial(text) => {
            let date = parse_serial_date(&text);
            (text, date)
        }
    };
    let date = check(line, date_text, date.ok_or(Field::Date), errors);
    let amount = parse_amount(&raw.amount);
    let amount = check(line, raw.amount, amount, errors);
    Entry {
        date,
        from: raw.from,
        to: raw.to,
        narrative: raw.narrative,
        amount,
        line,
    }
}

pub(crate) fn normalize(raws: Vec<RawEntry>) -> Journal {
    log::trace!("Creating entries from file");
    let mut journal = Journal::default();
    for raw in raws {
        let entry = normalize_one(raw, &mut journal.errors);
        journal.entries.push(Rc::new(entry));
    }
    if journal.has_errors() {
        log::warn!(
            "{} of {} entries had errors",
            journal.errors.len(),
            journal.entries.len()
        );
    } else {
        log::debug!("Entries created successfully");
    }
    journal
}

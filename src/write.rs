use crate::{
    compute::Accounts,
    data::{Entry, Error, Parsed, CURRENCY},
};
use rust_decimal::{Decimal, RoundingStrategy};

/// Currency rendering used everywhere: `£12.30`, `-£0.50`
pub(crate) fn format_currency(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    if rounded < Decimal::ZERO {
        format!("-{CURRENCY}{}", rounded.abs())
    } else {
        // `abs` also clears a negative zero
        format!("{CURRENCY}{}", rounded.abs())
    }
}

fn format_entry(entry: &Entry) -> String {
    let date = match &entry.date {
        Parsed::Valid(date) => date.format("%a %b %d %Y").to_string(),
        Parsed::Invalid(raw) => format!("Invalid Date ({raw})"),
    };
    let amount = match &entry.amount {
        Parsed::Valid(amount) => format_currency(*amount),
        Parsed::Invalid(raw) => format!("{CURRENCY}NaN ({raw})"),
    };
    format!(
        "{date}, from {} to {}, {}, {amount}",
        entry.from, entry.to, entry.narrative
    )
}

/// One `name: balance` line per account, in first-seen order
pub(crate) fn write_balances<W: std::io::Write>(
    mut writer: W,
    accounts: &Accounts,
) -> Result<(), anyhow::Error> {
    log::trace!("Printing all accounts");
    for account in accounts.iter() {
        writeln!(
            writer,
            "{}: {}",
            account.name(),
            format_currency(account.balance())
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Every entry of one account, in the order it was attached
pub(crate) fn write_history<W: std::io::Write>(
    mut writer: W,
    accounts: &Accounts,
    name: &str,
) -> Result<(), anyhow::Error> {
    log::debug!("Looking for account name {name:?}");
    let account = accounts
        .get(name)
        .ok_or_else(|| Error::AccountNotFound(name.to_owned()))?;
    log::debug!("Account found");
    for entry in account.entries() {
        writeln!(writer, "{}", format_entry(entry))?;
    }
    writer.flush()?;
    Ok(())
}

use crate::{
    compute::Accounts,
    data::Error,
    read::read_journal,
    write::{write_balances, write_history},
};
use std::io::Write;

/// A parsed input line. Prefixes are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command<'a> {
    Import(&'a str),
    ListAll,
    List(&'a str),
    Invalid,
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        if let Some(path) = line.strip_prefix("Import File ") {
            Command::Import(path)
        } else if let Some(name) = line.strip_prefix("List ") {
            match name {
                "All" => Command::ListAll,
                name => Command::List(name),
            }
        } else {
            Command::Invalid
        }
    }
}

/// State of one interactive run: nothing until a file has been imported,
/// then the accounts built from it, for good.
#[derive(Debug, Default)]
pub(crate) struct Session {
    accounts: Option<Accounts>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one input line, writing whatever the user should see to `out`.
    /// Only failures to write to `out` come back as errors.
    pub fn execute<W: Write>(&mut self, line: &str, mut out: W) -> Result<(), anyhow::Error> {
        log::trace!("Received command {line:?}");
        match Command::parse(line) {
            Command::Import(path) => self.import(path, &mut out),
            Command::ListAll => match &self.accounts {
                Some(accounts) => write_balances(&mut out, accounts),
                None => not_imported(&mut out),
            },
            Command::List(name) => match &self.accounts {
                Some(accounts) => match write_history(&mut out, accounts, name) {
                    Err(e)
                        if matches!(e.downcast_ref::<Error>(), Some(Error::AccountNotFound(_))) =>
                    {
                        log::warn!("{e}");
                        writeln!(out, "No account with that name found")?;
                        Ok(())
                    }
                    other => other,
                },
                None => not_imported(&mut out),
            },
            Command::Invalid => {
                log::warn!("Invalid command given: {line:?}");
                writeln!(out, "That is not a valid command")?;
                Ok(())
            }
        }
    }

    fn import<W: Write>(&mut self, path: &str, mut out: W) -> Result<(), anyhow::Error> {
        if self.accounts.is_some() {
            log::warn!("{}", Error::AlreadyImported);
            writeln!(out, "A file has already been processed")?;
            return Ok(());
        }
        let journal = match read_journal(path) {
            Ok(journal) => journal,
            Err(e) => {
                log::error!("{e:#}");
                let message = match e.downcast_ref::<Error>() {
                    Some(Error::UnsupportedFormat(_)) => {
                        "File format not supported, use csv, json, or xml".to_owned()
                    }
                    Some(_) => "There was an error processing the file".to_owned(),
                    None if e.is::<csv::Error>() => {
                        "There was an error processing the file".to_owned()
                    }
                    None => format!("Could not open file {path}"),
                };
                writeln!(out, "{message}")?;
                return Ok(());
            }
        };
        if journal.has_errors() {
            writeln!(
                out,
                "There were one or more errors creating the entries, check the log for details"
            )?;
        }
        let mut accounts = Accounts::new();
        journal.replay(&mut accounts);
        log::debug!(
            "Imported {} entries into {} accounts",
            journal.entries.len(),
            accounts.len()
        );
        self.accounts = Some(accounts);
        Ok(())
    }
}

fn not_imported<W: Write>(mut out: W) -> Result<(), anyhow::Error> {
    log::warn!("Cannot list accounts: {}", Error::NothingImported);
    writeln!(out, "No file has been processed yet")?;
    Ok(())
}

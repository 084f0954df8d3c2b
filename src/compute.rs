use crate::{data::Entry, read::EntryUser};
use rust_decimal::Decimal;
use std::{collections::HashMap, rc::Rc};

/// A named ledger. `balance` is a cache of the fold of `delta_for` over
/// `entries`, kept current by every mutation below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Account {
    name: String,
    balance: Decimal,
    entries: Vec<Rc<Entry>>,
}

impl Account {
    pub fn new(name: String) -> Self {
        log::debug!("Account {name} created");
        Self {
            name,
            balance: Decimal::ZERO,
            entries: Vec::new(),
        }
    }

    /// Shortcut for a new account whose first entry is already known
    pub fn with_entry(name: String, entry: Rc<Entry>) -> Self {
        let mut account = Self::new(name);
        account.entries.push(entry);
        account.recompute();
        account
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn entries(&self) -> &[Rc<Entry>] {
        &self.entries
    }

    fn delta(&self, entry: &Entry) -> Decimal {
        if entry.amount.valid().is_none() {
            log::error!(
                "Transaction amount on line {} is not a number, it will not be counted for {}",
                entry.line,
                self.name
            );
        }
        entry.delta_for(&self.name)
    }

    /// `balance` moved by `entry`. An entry that would overflow the balance is
    /// left out of it, on both the bulk and the incremental path.
    fn apply(&self, balance: Decimal, entry: &Entry) -> Decimal {
        balance.checked_add(self.delta(entry)).unwrap_or_else(|| {
            log::error!(
                "Transaction on line {} overflows the balance of {}, it will not be counted",
                entry.line,
                self.name
            );
            balance
        })
    }

    /// Full recomputation of the balance from an empty ledger
    pub fn recompute(&mut self) {
        log::trace!("Processing all transactions for account {:?}", self.name);
        self.balance = self
            .entries
            .iter()
            .fold(Decimal::ZERO, |balance, entry| self.apply(balance, entry));
    }

    /// Append an entry and adjust the balance by its delta only. The balance
    /// must already be in sync with the previous entries.
    pub fn attach(&mut self, entry: Rc<Entry>) {
        log::trace!(
            "New transaction from line {} added to account {:?}",
            entry.line,
            self.name
        );
        self.balance = self.apply(self.balance, &entry);
        self.entries.push(entry);
    }
}

/// This is where accounts are stored; they are created on the fly the first
/// time a name shows up on either side of an entry. Single-threaded, like the
/// rest of the tool.
#[derive(Debug, Default)]
pub(crate) struct Accounts {
    accounts: Vec<Account>,
    index: HashMap<String, usize>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Accounts in the order their name was first seen
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Account> {
        self.index.get(name).map(|&i| &self.accounts[i])
    }

    /// Attach `entry` to the account called `name`, creating it if needed
    fn post(&mut self, name: &str, entry: Rc<Entry>) {
        match self.index.get(name) {
            Some(&i) => self.accounts[i].attach(entry),
            None => {
                self.index.insert(name.to_owned(), self.accounts.len());
                self.accounts.push(Account::with_entry(name.to_owned(), entry));
            }
        }
    }
}

impl FromIterator<Rc<Entry>> for Accounts {
    fn from_iter<I: IntoIterator<Item = Rc<Entry>>>(iter: I) -> Self {
        let mut accounts = Accounts::new();
        for entry in iter {
            accounts.use_entry(entry);
        }
        accounts
    }
}

/// Payer first, then payee. A self-transfer is listed once; its delta already
/// nets to zero.
impl EntryUser for Accounts {
    fn use_entry(&mut self, entry: Rc<Entry>) {
        let from = entry.from.clone();
        if entry.from == entry.to {
            self.post(&from, entry);
            return;
        }
        let to = entry.to.clone();
        self.post(&from, Rc::clone(&entry));
        self.post(&to, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::{Account, Accounts};
    use crate::{
        data::fixtures::{bad_amount, entry},
        read::EntryUser,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::rc::Rc;

    fn names(accounts: &Accounts) -> Vec<&str> {
        accounts.iter().map(|a| a.name()).collect()
    }

    #[test]
    fn test_three_transfers() {
        let accounts: Accounts = [
            entry("Alice", "Bob", dec!(500.00), 2),
            entry("Bob", "Alice", dec!(100.00), 3),
            entry("Alice", "Carol", dec!(50.00), 4),
        ]
        .into_iter()
        .collect();
        assert_eq!(names(&accounts), ["Alice", "Bob", "Carol"]);
        assert_eq!(accounts.get("Alice").unwrap().balance(), dec!(-450.00));
        assert_eq!(accounts.get("Bob").unwrap().balance(), dec!(400.00));
        assert_eq!(accounts.get("Carol").unwrap().balance(), dec!(50.00));
        assert_eq!(accounts.get("Alice").unwrap().entries().len(), 3);
        assert_eq!(accounts.get("Carol").unwrap().entries().len(), 1);
    }

    #[test]
    fn test_closed_system_sums_to_zero() {
        let accounts: Accounts = [
            entry("A", "B", dec!(10.25), 1),
            entry("C", "A", dec!(3.10), 2),
            entry("B", "D", dec!(7), 3),
            entry("D", "C", dec!(0.01), 4),
            entry("A", "D", dec!(99.99), 5),
        ]
        .into_iter()
        .collect();
        let total: Decimal = accounts.iter().map(|a| a.balance()).sum();
        assert_eq!(total, dec!(0));
    }

    #[test]
    fn test_incremental_matches_bulk() {
        let entries = [
            entry("A", "B", dec!(10.25), 1),
            entry("B", "A", dec!(3.10), 2),
            bad_amount("A", "C", 3),
            entry("A", "A", dec!(8), 4),
            entry("C", "A", dec!(0.3), 5),
        ];
        let mut account = Account::new("A".to_owned());
        for e in &entries {
            account.attach(Rc::clone(e));
        }
        let incremental = account.balance();
        account.recompute();
        assert_eq!(incremental, account.balance());
        assert_eq!(incremental, dec!(-6.85));
    }

    #[test]
    fn test_overflow_is_left_out() {
        let entries = [
            entry("A", "B", Decimal::MAX, 1),
            entry("A", "B", dec!(1), 2),
            entry("B", "A", dec!(5), 3),
        ];
        let accounts: Accounts = entries.iter().cloned().collect();
        assert_eq!(accounts.get("A").unwrap().balance(), Decimal::MIN + dec!(5));
        assert_eq!(accounts.get("B").unwrap().balance(), Decimal::MAX - dec!(5));
        // listed even though it was not counted
        assert_eq!(accounts.get("B").unwrap().entries().len(), 3);

        let mut bulk = accounts.get("B").unwrap().clone();
        bulk.recompute();
        assert_eq!(&bulk, accounts.get("B").unwrap());
    }

    #[test]
    fn test_single_entry_shortcut() {
        let e = entry("A", "B", dec!(42), 1);
        let seeded = Account::with_entry("B".to_owned(), Rc::clone(&e));
        let mut attached = Account::new("B".to_owned());
        attached.attach(e);
        assert_eq!(seeded, attached);
        assert_eq!(seeded.balance(), dec!(42));
    }

    #[test]
    fn test_invalid_amount_counts_nothing() {
        let accounts: Accounts = [
            entry("A", "B", dec!(5), 1),
            bad_amount("A", "B", 2),
            bad_amount("B", "C", 3),
        ]
        .into_iter()
        .collect();
        assert_eq!(names(&accounts), ["A", "B", "C"]);
        assert_eq!(accounts.get("A").unwrap().balance(), dec!(-5));
        assert_eq!(accounts.get("B").unwrap().balance(), dec!(5));
        assert_eq!(accounts.get("C").unwrap().balance(), dec!(0));
        // still part of the history
        assert_eq!(accounts.get("B").unwrap().entries().len(), 3);
        assert_eq!(accounts.get("C").unwrap().entries()[0].line, 3);
    }

    #[test]
    fn test_self_transfer_listed_once() {
        let mut accounts = Accounts::new();
        accounts.use_entry(entry("A", "B", dec!(20), 1));
        accounts.use_entry(entry("A", "A", dec!(15), 2));
        let a = accounts.get("A").unwrap();
        assert_eq!(a.entries().len(), 2);
        assert_eq!(a.balance(), dec!(-20));
        assert_eq!(accounts.len(), 2);
    }

    #[test]
    fn test_self_transfer_creates_account() {
        let accounts: Accounts = [entry("A", "A", dec!(15), 1)].into_iter().collect();
        assert_eq!(names(&accounts), ["A"]);
        assert_eq!(accounts.get("A").unwrap().entries().len(), 1);
        assert_eq!(accounts.get("A").unwrap().balance(), dec!(0));
    }

    #[test]
    fn test_entries_are_shared() {
        let e = entry("A", "B", dec!(1), 1);
        let accounts: Accounts = [Rc::clone(&e)].into_iter().collect();
        assert!(Rc::ptr_eq(&accounts.get("A").unwrap().entries()[0], &e));
        assert!(Rc::ptr_eq(&accounts.get("B").unwrap().entries()[0], &e));
        assert_eq!(Rc::strong_count(&e), 3);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let accounts: Accounts = [entry("bob", "Bob", dec!(1), 1)].into_iter().collect();
        assert_eq!(names(&accounts), ["bob", "Bob"]);
        assert!(accounts.get("BOB").is_none());
    }

    #[test]
    fn test_first_seen_order() {
        let accounts: Accounts = [
            entry("C", "B", dec!(1), 1),
            entry("A", "C", dec!(1), 2),
            entry("", "D", dec!(1), 3),
        ]
        .into_iter()
        .collect();
        assert_eq!(names(&accounts), ["C", "B", "A", "", "D"]);
    }
}

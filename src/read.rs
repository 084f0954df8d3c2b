use crate::{
    data::{Entry, Error, Line},
    normalize::{normalize, Journal},
};
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::{path::Path, rc::Rc};

/// Trait for doing something with an `Entry` coming out of an import. Used by
/// the aggregator to build `Accounts`, but also used for mock tests to check
/// entries come through in file order.
pub(crate) trait EntryUser {
    fn use_entry(&mut self, entry: Rc<Entry>);
}

/// Supported encodings, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Csv,
    Json,
    Xml,
}

impl Format {
    pub fn detect(path: &str) -> Result<Self, Error> {
        match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("csv") => Ok(Format::Csv),
            Some("json") => Ok(Format::Json),
            Some("xml") => Ok(Format::Xml),
            _ => Err(Error::UnsupportedFormat(path.to_owned())),
        }
    }
}

/// How a record spells its date. Markup files count days from the
/// spreadsheet epoch instead of writing a calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawDate {
    Text(String),
    Serial(String),
}

/// A record as found in the file, before any validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawEntry {
    pub line: Line,
    pub date: RawDate,
    pub from: String,
    pub to: String,
    pub narrative: String,
    pub amount: String,
}

/// Read, detect, extract and normalize one file. Only structural problems
/// come back as errors; bad records end up in the `Journal`.
pub(crate) fn read_journal(path: &str) -> Result<Journal, anyhow::Error> {
    let format = Format::detect(path)?;
    log::trace!("Opening file {path}");
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Problem opening file {path}"))?;
    log::debug!("File opened");
    let raws = extract(format, &text)?;
    Ok(normalize(raws))
}

pub(crate) fn extract(format: Format, text: &str) -> Result<Vec<RawEntry>, anyhow::Error> {
    match format {
        Format::Csv => extract_csv(text.as_bytes()),
        Format::Json => Ok(extract_json(text)?),
        Format::Xml => Ok(extract_xml(text)?),
    }
}

/// Delimited text: a header row, then one `Date,From,To,Narrative,Amount` row
/// per transaction.
fn extract_csv<R: std::io::Read>(reader: R) -> Result<Vec<RawEntry>, anyhow::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut raws = Vec::new();
    for result in rdr.records() {
        let record = result?;
        // header is line 1
        let line = record.position().map_or(raws.len() + 2, |p| p.line() as Line);
        let field = |i: usize| record.get(i).unwrap_or_default().to_owned();
        raws.push(RawEntry {
            line,
            date: RawDate::Text(field(0)),
            from: field(1),
            to: field(2),
            narrative: field(3),
            amount: field(4),
        });
    }
    Ok(raws)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct JsonRecord {
    date: Value,
    from_account: Value,
    to_account: Value,
    narrative: Value,
    amount: Value,
}

/// Render a loosely-typed JSON value as the text the normalizer expects
fn json_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn extract_json(text: &str) -> Result<Vec<RawEntry>, Error> {
    let records: Vec<Value> =
        serde_json::from_str(text).map_err(|e| Error::MalformedRecords(e.to_string()))?;
    Ok(records
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            // A non-object element still takes its line; it just validates badly.
            let record = serde_json::from_value::<JsonRecord>(value).unwrap_or_default();
            RawEntry {
                line: i + 1,
                date: RawDate::Text(json_text(record.date)),
                from: json_text(record.from_account),
                to: json_text(record.to_account),
                narrative: json_text(record.narrative),
                amount: json_text(record.amount),
            }
        })
        .collect())
}

fn child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn child_text(node: roxmltree::Node<'_, '_>, path: &[&str]) -> String {
    path.iter()
        .try_fold(node, |node, name| child(node, name))
        .and_then(|node| node.text())
        .unwrap_or_default()
        .trim()
        .to_owned()
}

/// Tagged markup: `TransactionList/SupportTransaction` nodes with a serial
/// `Date` attribute, `Description`, `Value` and `Parties/{From,To}` children.
fn extract_xml(text: &str) -> Result<Vec<RawEntry>, Error> {
    let doc =
        roxmltree::Document::parse(text).map_err(|e| Error::MalformedMarkup(e.to_string()))?;
    let root = doc.root_element();
    if !root.has_tag_name("TransactionList") {
        return Err(Error::MalformedMarkup(format!(
            "root element is <{}>",
            root.tag_name().name()
        )));
    }
    let raws: Vec<RawEntry> = root
        .children()
        .filter(|n| n.has_tag_name("SupportTransaction"))
        .enumerate()
        .map(|(i, node)| RawEntry {
            line: i + 1,
            date: RawDate::Serial(node.attribute("Date").unwrap_or_default().to_owned()),
            from: child_text(node, &["Parties", "From"]),
            to: child_text(node, &["Parties", "To"]),
            narrative: child_text(node, &["Description"]),
            amount: child_text(node, &["Value"]),
        })
        .collect();
    if raws.is_empty() {
        return Err(Error::MalformedMarkup("no SupportTransaction nodes".to_owned()));
    }
    Ok(raws)
}

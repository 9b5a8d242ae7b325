mod data;

pub mod conversations;
pub mod transcript;

#[cfg(feature = "web")]
pub mod content;
#[cfg(feature = "web")]
pub mod web;

pub use data::TABLE_FORMAT_VERSION;

use data::TableFile;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

static CANONICAL_TABLE_JSON: &str = include_str!("../data/responses.json");

static CANONICAL_TABLE: Lazy<ResponseTable> = Lazy::new(|| {
    ResponseTable::from_json_str(CANONICAL_TABLE_JSON).expect("valid canonical response table")
});

/// Answers `input` from the canonical table.
pub fn respond(input: &str) -> &'static str {
    ResponseTable::canonical().respond(input)
}

/// Ordered keyword to answer mapping. Earlier entries take priority.
#[derive(Debug, Clone)]
pub struct ResponseTable {
    version: u32,
    fallback: String,
    entries: Vec<ResponseEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEntry {
    keyword: String,
    topic: String,
    response: String,
}

impl ResponseEntry {
    /// Lowercased keyword matched as a substring.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn response(&self) -> &str {
        &self.response
    }
}

/// Outcome of a table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match<'a> {
    Keyword {
        index: usize,
        entry: &'a ResponseEntry,
    },
    Fallback {
        response: &'a str,
    },
}

impl<'a> Match<'a> {
    pub fn response(&self) -> &'a str {
        match self {
            Match::Keyword { entry, .. } => entry.response(),
            Match::Fallback { response } => response,
        }
    }

    pub fn topic(&self) -> Option<&'a str> {
        match self {
            Match::Keyword { entry, .. } => Some(entry.topic()),
            Match::Fallback { .. } => None,
        }
    }

    pub fn keyword(&self) -> Option<&'a str> {
        match self {
            Match::Keyword { entry, .. } => Some(entry.keyword()),
            Match::Fallback { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Match::Fallback { .. })
    }
}

impl ResponseTable {
    /// The table compiled into the binary from `data/responses.json`.
    pub fn canonical() -> &'static ResponseTable {
        &CANONICAL_TABLE
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, TableError> {
        let file: TableFile = serde_json::from_str(text)?;
        Self::from_file(file)
    }

    fn from_file(file: TableFile) -> Result<Self, TableError> {
        if file.version != TABLE_FORMAT_VERSION {
            return Err(TableError::UnsupportedVersion(file.version));
        }
        if file.fallback.trim().is_empty() {
            return Err(TableError::BlankFallback);
        }
        let mut seen = HashSet::with_capacity(file.entries.len());
        let mut entries = Vec::with_capacity(file.entries.len());
        for (index, record) in file.entries.into_iter().enumerate() {
            if record.keyword.trim().is_empty() {
                return Err(TableError::BlankKeyword { index });
            }
            if record.response.trim().is_empty() {
                return Err(TableError::BlankResponse { index });
            }
            let keyword = record.keyword.to_lowercase();
            if !seen.insert(keyword.clone()) {
                return Err(TableError::DuplicateKeyword { keyword });
            }
            let topic = record
                .topic
                .map(|topic| topic.trim().to_string())
                .filter(|topic| !topic.is_empty())
                .unwrap_or_else(|| keyword.trim().to_string());
            entries.push(ResponseEntry {
                keyword,
                topic,
                response: record.response,
            });
        }
        Ok(Self {
            version: file.version,
            fallback: file.fallback,
            entries,
        })
    }

    /// Finds the first entry, in table order, whose keyword occurs anywhere
    /// in the lowercased input.
    pub fn lookup(&self, input: &str) -> Match<'_> {
        let normalized = input.to_lowercase();
        for (index, entry) in self.entries.iter().enumerate() {
            if normalized.contains(entry.keyword.as_str()) {
                debug!(index, keyword = %entry.keyword, "keyword matched");
                return Match::Keyword { index, entry };
            }
        }
        debug!(chars = normalized.chars().count(), "no keyword matched");
        Match::Fallback {
            response: &self.fallback,
        }
    }

    pub fn respond(&self, input: &str) -> &str {
        self.lookup(input).response()
    }

    pub fn entries(&self) -> &[ResponseEntry] {
        &self.entries
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(keyword, topic)` pairs in priority order.
    pub fn topics(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.keyword(), entry.topic()))
    }
}

#[derive(Debug)]
pub enum TableError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    UnsupportedVersion(u32),
    BlankFallback,
    BlankKeyword { index: usize },
    BlankResponse { index: usize },
    DuplicateKeyword { keyword: String },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::Io(err) => write!(f, "io error: {err}"),
            TableError::Parse(err) => write!(f, "invalid table json: {err}"),
            TableError::UnsupportedVersion(version) => write!(
                f,
                "unsupported table version {version} (expected {TABLE_FORMAT_VERSION})"
            ),
            TableError::BlankFallback => write!(f, "fallback response must not be blank"),
            TableError::BlankKeyword { index } => write!(f, "entry #{index} has a blank keyword"),
            TableError::BlankResponse { index } => {
                write!(f, "entry #{index} has a blank response")
            }
            TableError::DuplicateKeyword { keyword } => {
                write!(f, "keyword {keyword:?} appears more than once")
            }
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Io(err) => Some(err),
            TableError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TableError {
    fn from(value: std::io::Error) -> Self {
        TableError::Io(value)
    }
}

impl From<serde_json::Error> for TableError {
    fn from(value: serde_json::Error) -> Self {
        TableError::Parse(value)
    }
}

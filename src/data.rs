use serde::Deserialize;

/// Table file format version this build understands.
pub const TABLE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct TableFile {
    pub version: u32,
    pub fallback: String,
    #[serde(default)]
    pub entries: Vec<EntryRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryRecord {
    pub keyword: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub response: String,
}

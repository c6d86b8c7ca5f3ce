use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// Short digest of a client's network address, used as the one-vote key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tally(BTreeMap<String, u64>);

impl Tally {
    pub fn zeroed(options: &[String]) -> Self {
        Self(options.iter().map(|option| (option.clone(), 0)).collect())
    }

    // Adds any configured option missing from a persisted tally.
    pub fn fill_missing(&mut self, options: &[String]) {
        for option in options {
            self.0.entry(option.clone()).or_insert(0);
        }
    }

    pub fn increment(&mut self, option: &str) {
        *self.0.entry(option.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, option: &str) -> u64 {
        self.0.get(option).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    #[serde(rename = "username")]
    pub name: String,
    pub choice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    // Records written before timestamps were kept load as the epoch.
    #[serde(default)]
    pub voted_at: DateTime<Utc>,
}

// Who voted, keyed by identifier. At most one record per identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterMap(BTreeMap<Identifier, VoterRecord>);

impl VoterMap {
    pub fn get(&self, identifier: &Identifier) -> Option<&VoterRecord> {
        self.0.get(identifier)
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.0.contains_key(identifier)
    }

    // Inserts a record unless the identifier already voted. Returns whether it was inserted.
    pub fn insert_new(&mut self, identifier: Identifier, record: VoterRecord) -> bool {
        if self.0.contains_key(&identifier) {
            return false;
        }
        self.0.insert(identifier, record);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // Records in voting order, oldest first.
    pub fn chronological(&self) -> Vec<(&Identifier, &VoterRecord)> {
        let mut records: Vec<_> = self.0.iter().collect();
        records.sort_by(|a, b| a.1.voted_at.cmp(&b.1.voted_at).then_with(|| a.0.cmp(b.0)));
        records
    }
}

// Login state carried in the session between the login and vote steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVoter {
    pub name: String,
    pub identifier: Identifier,
}

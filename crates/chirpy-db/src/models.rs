use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chirp {
    pub id: u64,
    pub body: String,
    pub author_id: u64,
}

/// `password` is the argon2 hash, so handlers map this to an API response
/// type instead of serializing it onto the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_chirpy_red: bool,
}

/// The whole database file. serde_json writes the integer map keys as
/// strings, so a chirp with id 1 sits under `"chirps": {"1": ...}`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub chirps: BTreeMap<u64, Chirp>,
    #[serde(default)]
    pub users: BTreeMap<u64, User>,
    #[serde(default)]
    pub revoked_tokens: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub chirp_seq: u64,
    #[serde(default)]
    pub user_seq: u64,
}

impl Document {
    /// Files written before the id counters existed load with both at zero.
    /// Raise each counter to the highest id present so the next insert
    /// continues the sequence instead of reissuing an id.
    pub(crate) fn sync_counters(&mut self) {
        if let Some(&max) = self.chirps.keys().next_back() {
            self.chirp_seq = self.chirp_seq.max(max);
        }
        if let Some(&max) = self.users.keys().next_back() {
            self.user_seq = self.user_seq.max(max);
        }
    }

    pub(crate) fn next_chirp_id(&mut self) -> u64 {
        self.chirp_seq += 1;
        self.chirp_seq
    }

    pub(crate) fn next_user_id(&mut self) -> u64 {
        self.user_seq += 1;
        self.user_seq
    }
}

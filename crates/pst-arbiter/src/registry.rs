//! The reservation registry boundary and a local implementation.
//!
//! On a live ledger the registry is the system contract's name-auction
//! table. The engine only ever reads it, through [`ReservationRegistry`].

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::RwLock;

use pst_types::AccountName;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Current state of the auction for one name suffix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameBid {
    /// The suffix being auctioned.
    pub newname: AccountName,
    /// Account holding the highest bid.
    pub high_bidder: AccountName,
    /// Highest bid amount. Negative once the auction is closed.
    pub high_bid: i64,
    /// Time of the last bid, microseconds since the epoch.
    #[serde(default)]
    pub last_bid_time: u64,
}

impl NameBid {
    /// An open bid of `amount`. Negative amounts are clamped to zero.
    pub fn open(newname: AccountName, high_bidder: AccountName, amount: i64) -> Self {
        Self {
            newname,
            high_bidder,
            high_bid: amount.max(0),
            last_bid_time: 0,
        }
    }

    /// A finalized auction won by `high_bidder`.
    pub fn closed(newname: AccountName, high_bidder: AccountName, amount: i64) -> Self {
        let amount = amount.checked_abs().unwrap_or(i64::MAX);
        Self {
            high_bid: if amount == 0 { -1 } else { -amount },
            ..Self::open(newname, high_bidder, 0)
        }
    }

    /// Whether the auction is finalized and the winner is settled.
    pub fn is_closed(&self) -> bool {
        self.high_bid < 0
    }
}

/// Read-only access to the name reservation registry.
pub trait ReservationRegistry: Send + Sync {
    /// Look up the auction entry for `suffix`.
    ///
    /// Returns `Ok(None)` if the suffix has never been bid on.
    fn lookup(&self, suffix: &AccountName) -> RegistryResult<Option<NameBid>>;
}

/// In-memory registry for tests, demos, and the local command-line host.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    bids: RwLock<BTreeMap<AccountName, NameBid>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `bid.newname`.
    pub fn record_bid(&self, bid: NameBid) -> RegistryResult<()> {
        let mut bids = self
            .bids
            .write()
            .map_err(|e| RegistryError::LockPoisoned(e.to_string()))?;
        bids.insert(bid.newname, bid);
        Ok(())
    }

    /// Every entry, ordered by suffix.
    pub fn bids(&self) -> RegistryResult<Vec<NameBid>> {
        let bids = self
            .bids
            .read()
            .map_err(|e| RegistryError::LockPoisoned(e.to_string()))?;
        Ok(bids.values().cloned().collect())
    }

    /// Load entries from a JSON array of [`NameBid`]s.
    ///
    /// A missing file is an empty registry.
    pub fn load_json(path: &Path) -> RegistryResult<Self> {
        let registry = Self::new();
        if !path.exists() {
            return Ok(registry);
        }
        let text = fs::read_to_string(path)?;
        let bids: Vec<NameBid> =
            serde_json::from_str(&text).map_err(|e| RegistryError::Serialization(e.to_string()))?;
        for bid in bids {
            registry.record_bid(bid)?;
        }
        Ok(registry)
    }

    /// Write every entry to `path` as a JSON array.
    ///
    /// The file is replaced by rename, so readers see the old or the new
    /// contents and never a partial write.
    pub fn save_json(&self, path: &Path) -> RegistryResult<()> {
        let text = serde_json::to_string_pretty(&self.bids()?)
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(text.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| RegistryError::Io(e.error))?;
        Ok(())
    }
}

impl ReservationRegistry for InMemoryRegistry {
    fn lookup(&self, suffix: &AccountName) -> RegistryResult<Option<NameBid>> {
        let bids = self
            .bids
            .read()
            .map_err(|e| RegistryError::LockPoisoned(e.to_string()))?;
        Ok(bids.get(suffix).cloned())
    }
}

impl<R: ReservationRegistry + ?Sized> ReservationRegistry for &R {
    fn lookup(&self, suffix: &AccountName) -> RegistryResult<Option<NameBid>> {
        (**self).lookup(suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> AccountName {
        AccountName::parse(s).unwrap()
    }

    #[test]
    fn open_and_closed_bids() {
        let open = NameBid::open(name("alice"), name("carol"), 50_000);
        assert!(!open.is_closed());

        let closed = NameBid::closed(name("alice"), name("carol"), 50_000);
        assert!(closed.is_closed());
        assert_eq!(closed.high_bid, -50_000);
        assert_eq!(closed.high_bidder, name("carol"));
    }

    #[test]
    fn negative_open_bid_stays_open() {
        let bid = NameBid::open(name("alice"), name("carol"), -40);
        assert!(!bid.is_closed());
        assert_eq!(bid.high_bid, 0);
    }

    #[test]
    fn closed_bid_of_zero_is_still_closed() {
        assert!(NameBid::closed(name("alice"), name("carol"), 0).is_closed());
        assert!(NameBid::closed(name("alice"), name("carol"), i64::MIN).is_closed());
    }

    #[test]
    fn lookup_missing_suffix() {
        let registry = InMemoryRegistry::new();
        assert!(registry.lookup(&name("alice")).unwrap().is_none());
    }

    #[test]
    fn record_replaces_entry() {
        let registry = InMemoryRegistry::new();
        registry
            .record_bid(NameBid::open(name("alice"), name("bob"), 10))
            .unwrap();
        registry
            .record_bid(NameBid::open(name("alice"), name("carol"), 20))
            .unwrap();

        let bid = registry.lookup(&name("alice")).unwrap().unwrap();
        assert_eq!(bid.high_bidder, name("carol"));
        assert_eq!(registry.bids().unwrap().len(), 1);
    }

    #[test]
    fn json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let registry = InMemoryRegistry::new();
        registry
            .record_bid(NameBid::closed(name("alice"), name("carol"), 7))
            .unwrap();
        registry
            .record_bid(NameBid::open(name("dave"), name("erin"), 3))
            .unwrap();
        registry.save_json(&path).unwrap();

        let loaded = InMemoryRegistry::load_json(&path).unwrap();
        assert_eq!(loaded.bids().unwrap(), registry.bids().unwrap());
    }

    #[test]
    fn save_replaces_existing_file_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, "x".repeat(4096)).unwrap();

        let registry = InMemoryRegistry::new();
        registry
            .record_bid(NameBid::open(name("alice"), name("bob"), 1))
            .unwrap();
        registry.save_json(&path).unwrap();

        let loaded = InMemoryRegistry::load_json(&path).unwrap();
        assert_eq!(loaded.bids().unwrap(), registry.bids().unwrap());
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn missing_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = InMemoryRegistry::load_json(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.bids().unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            InMemoryRegistry::load_json(&path),
            Err(RegistryError::Serialization(_))
        ));
    }

    #[test]
    fn last_bid_time_defaults() {
        let bid: NameBid = serde_json::from_str(
            r#"{"newname":"alice","high_bidder":"bob","high_bid":-5}"#,
        )
        .unwrap();
        assert_eq!(bid.last_bid_time, 0);
        assert!(bid.is_closed());
    }
}

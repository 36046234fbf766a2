use crate::types::{Article, Result, SeenEntry, WatcherError};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

const HEADER: &str = "key,first_seen";

/// Persistent set of every identity key ever confirmed fetched.
///
/// The ledger only grows: a run's output ledger is the input ledger unioned
/// with all keys fetched that run, regardless of relevance scores. All
/// mutation happens on owned values returned from [`SeenLedger::partition`];
/// the caller decides when (and whether) to persist, so a failed run never
/// commits partial state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenLedger {
    entries: BTreeMap<String, NaiveDate>,
}

impl SeenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn first_seen(&self, key: &str) -> Option<NaiveDate> {
        self.entries.get(key).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = SeenEntry> + '_ {
        self.entries.iter().map(|(key, date)| SeenEntry {
            key: key.clone(),
            first_seen: *date,
        })
    }

    /// Load the ledger file. `Ok(None)` means the file does not exist yet;
    /// the caller treats that as a baseline (first) run. Any other I/O
    /// failure is fatal: silently restarting from an empty ledger would
    /// re-report every article ever seen.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(WatcherError::LedgerIo {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let mut entries = BTreeMap::new();
        for (lineno, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line == HEADER {
                continue;
            }
            // Keys may contain commas (they embed URLs); the date is always
            // the final field.
            match line.rsplit_once(',') {
                Some((key, date_str)) => match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
                    Ok(date) => {
                        entries.insert(key.to_string(), date);
                    }
                    Err(_) => warn!(
                        "Ignoring ledger line {} with bad date: {:?}",
                        lineno + 1,
                        line
                    ),
                },
                None => warn!("Ignoring malformed ledger line {}: {:?}", lineno + 1, line),
            }
        }

        info!("Loaded {} seen keys from {}", entries.len(), path.display());
        Ok(Some(Self { entries }))
    }

    /// Write the full ledger to disk. Writes a sibling temp file and renames
    /// it into place so an interrupted persist never truncates prior state.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let ledger_io = |e: std::io::Error| WatcherError::LedgerIo {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(ledger_io)?;
            }
        }

        let tmp_path = path.with_extension("csv.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path).map_err(ledger_io)?;
            writeln!(file, "{}", HEADER).map_err(ledger_io)?;
            for (key, date) in &self.entries {
                writeln!(file, "{},{}", key, date.format("%Y-%m-%d")).map_err(ledger_io)?;
            }
            file.flush().map_err(ledger_io)?;
        }
        std::fs::rename(&tmp_path, path).map_err(ledger_io)?;

        debug!("Persisted {} seen keys to {}", self.entries.len(), path.display());
        Ok(())
    }

    /// Reconcile a fetch against this ledger.
    ///
    /// Returns the articles whose identity key is absent from the ledger
    /// (fetch order preserved, within-run duplicates collapsed to their
    /// first occurrence) and a new ledger containing this ledger's keys
    /// unioned with every key from the fetch. Pure: `self` is untouched, so
    /// calling twice on the same inputs yields identical results and the
    /// caller controls commit timing.
    pub fn partition(&self, articles: &[Article], today: NaiveDate) -> (Vec<Article>, SeenLedger) {
        let mut updated = self.clone();
        let mut new_articles = Vec::new();

        for article in articles {
            let key = article.identity_key();
            if !updated.entries.contains_key(&key) {
                new_articles.push(article.clone());
            }
            // Existing keys keep their original first-seen date.
            updated.entries.entry(key).or_insert(today);
        }

        (new_articles, updated)
    }
}

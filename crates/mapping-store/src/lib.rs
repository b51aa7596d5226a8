//! offense-deck mapping store adapter.
//!
//! Implements [`bridge::MappingStore`] over a plain text log file:
//!
//! ```text
//! #offense-deck-mapping v1
//! 100,55
//! 101,
//! ```
//!
//! One `offense-id,card-id` line per entry; an empty card id is a tombstone.
//! [`FileMappingStore::record`] appends a line. [`FileMappingStore::tombstone`]
//! rewrites the whole file (temp file + fsync + rename) with the offense's
//! line replaced by a tombstone line. On load, later lines override earlier
//! ones, so an interrupted append never corrupts older entries. `record`
//! refuses to append to a log that does not parse; a complete last line that
//! only lacks its newline is terminated before the new entry is written.
//!
//! Files written before the version marker existed load unchanged and gain
//! the marker on their next rewrite.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** File layout and durability live here. The engine sees
//! only [`bridge::MappingStore`].

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bridge::{CardId, CardSlot, MappingEntry, MappingState, MappingStore, OffenseId, StoreError};
use tracing::{debug, info};

/// First line of every file written by this store.
pub const VERSION_MARKER: &str = "#offense-deck-mapping v1";

/// A [`MappingStore`] backed by one text file.
#[derive(Debug, Clone)]
pub struct FileMappingStore {
    path: PathBuf,
}

impl FileMappingStore {
    /// Creates a store over `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Reads the file; a missing file reads as empty.
    fn read_contents(&self) -> Result<String, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Parses every line into entries, in file order.
    fn read_entries(&self) -> Result<Vec<MappingEntry>, StoreError> {
        let contents = self.read_contents()?;
        self.parse(&contents)
    }

    fn parse(&self, contents: &str) -> Result<Vec<MappingEntry>, StoreError> {
        parse_log(contents).map_err(|(line, reason)| StoreError::Corrupt {
            path: self.path.clone(),
            line,
            reason,
        })
    }

    /// Sibling path used while rewriting: the full file name plus `.tmp`.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Replaces the file with `contents` atomically.
    fn atomic_write(&self, contents: &str) -> Result<(), StoreError> {
        let temp_path = self.temp_path();

        let mut file = File::create(&temp_path).map_err(|e| self.io_error(e))?;
        file.write_all(contents.as_bytes())
            .map_err(|e| self.io_error(e))?;
        file.sync_all().map_err(|e| self.io_error(e))?;

        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(e))
    }
}

impl MappingStore for FileMappingStore {
    fn load(&self) -> Result<MappingState, StoreError> {
        let entries = self.read_entries()?;
        let state: MappingState = entries.into_iter().collect();
        debug!(path = %self.path.display(), entries = state.len(), "Loaded mapping");
        Ok(state)
    }

    fn record(&self, offense: OffenseId, card: CardId) -> Result<(), StoreError> {
        let contents = self.read_contents()?;
        let entry = format_entry(MappingEntry {
            offense,
            slot: CardSlot::Live(card),
        });

        if contents.trim().is_empty() {
            self.atomic_write(&format!("{VERSION_MARKER}\n{entry}"))?;
            debug!(%offense, %card, "Recorded first mapping entry");
            return Ok(());
        }

        // A torn last line would merge with the new entry.
        self.parse(&contents)?;

        let mut text = String::new();
        if !contents.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&entry);

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| self.io_error(e))?;
        file.sync_all().map_err(|e| self.io_error(e))?;

        debug!(%offense, %card, "Recorded mapping entry");
        Ok(())
    }

    fn tombstone(&self, offense: OffenseId) -> Result<(), StoreError> {
        let entries = self.read_entries()?;
        let tombstone = MappingEntry {
            offense,
            slot: CardSlot::Retired,
        };

        let mut contents = String::from(VERSION_MARKER);
        contents.push('\n');
        let mut replaced = false;
        for entry in entries {
            if entry.offense != offense {
                contents.push_str(&format_entry(entry));
            } else if !replaced {
                contents.push_str(&format_entry(tombstone));
                replaced = true;
            }
        }
        if !replaced {
            contents.push_str(&format_entry(tombstone));
        }

        self.atomic_write(&contents)?;
        info!(%offense, "Tombstoned mapping entry");
        Ok(())
    }
}

/// Renders one entry as a log line, including the trailing newline.
pub fn format_entry(entry: MappingEntry) -> String {
    match entry.slot {
        CardSlot::Live(card) => format!("{},{}\n", entry.offense, card),
        CardSlot::Retired => format!("{},\n", entry.offense),
    }
}

/// Parses a whole log. Errors carry the 1-based line number.
fn parse_log(contents: &str) -> Result<Vec<MappingEntry>, (usize, String)> {
    let mut entries = Vec::new();
    for (index, raw) in contents.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            if line_no == 1 && line == VERSION_MARKER {
                continue;
            }
            return Err((line_no, format!("unsupported marker line '{line}'")));
        }
        entries.push(parse_entry(line).map_err(|reason| (line_no, reason))?);
    }
    Ok(entries)
}

/// Parses one `offense-id,card-id` line.
pub fn parse_entry(line: &str) -> Result<MappingEntry, String> {
    let fields: Vec<&str> = line.split(',').collect();
    let [offense, card] = fields.as_slice() else {
        return Err(format!(
            "expected 2 comma-separated fields, found {}",
            fields.len()
        ));
    };

    let offense: OffenseId = offense
        .trim()
        .parse()
        .map_err(|_| format!("offense id '{offense}' is not a number"))?;

    let card = card.trim();
    let slot = if card.is_empty() {
        CardSlot::Retired
    } else {
        CardSlot::Live(
            card.parse()
                .map_err(|_| format!("card id '{card}' is not a number"))?,
        )
    };

    Ok(MappingEntry { offense, slot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileMappingStore {
        FileMappingStore::new(dir.path().join("processed_offenses.txt"))
    }

    fn lines(store: &FileMappingStore) -> Vec<String> {
        fs::read_to_string(store.path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_missing_file_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.load().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_record_then_load_returns_all_entries() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for (offense, card) in [(100, 55), (7, 3), (42, 900)] {
            store
                .record(OffenseId::new(offense), CardId::new(card))
                .unwrap();
        }

        let state = store_in(&dir).load().unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.live_card(OffenseId::new(100)), Some(CardId::new(55)));
        assert_eq!(state.live_card(OffenseId::new(7)), Some(CardId::new(3)));
        assert_eq!(state.live_card(OffenseId::new(42)), Some(CardId::new(900)));
    }

    #[test]
    fn test_first_write_adds_version_marker_once() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.record(OffenseId::new(1), CardId::new(2)).unwrap();
        store.record(OffenseId::new(3), CardId::new(4)).unwrap();
        assert_eq!(lines(&store), vec![VERSION_MARKER, "1,2", "3,4"]);
    }

    #[test]
    fn test_tombstone_changes_only_that_line() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.record(OffenseId::new(99), CardId::new(1)).unwrap();
        store.record(OffenseId::new(100), CardId::new(55)).unwrap();
        store.record(OffenseId::new(101), CardId::new(56)).unwrap();

        store.tombstone(OffenseId::new(100)).unwrap();

        assert_eq!(lines(&store), vec![VERSION_MARKER, "99,1", "100,", "101,56"]);
        let state = store.load().unwrap();
        assert_eq!(state.get(OffenseId::new(100)), Some(CardSlot::Retired));
        assert_eq!(state.live_card(OffenseId::new(101)), Some(CardId::new(56)));
        assert!(!dir.path().join("processed_offenses.txt.tmp").exists());
    }

    #[test]
    fn test_tombstone_collapses_duplicate_lines() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "100,55\n5,6\n100,57\n").unwrap();

        store.tombstone(OffenseId::new(100)).unwrap();

        assert_eq!(lines(&store), vec![VERSION_MARKER, "100,", "5,6"]);
    }

    #[test]
    fn test_tombstone_of_unknown_offense_appends_tombstone() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.record(OffenseId::new(1), CardId::new(2)).unwrap();
        store.tombstone(OffenseId::new(8)).unwrap();
        assert_eq!(lines(&store), vec![VERSION_MARKER, "1,2", "8,"]);
    }

    #[test]
    fn test_legacy_file_without_marker_loads() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "100,55\n101,\n\n").unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.live_card(OffenseId::new(100)), Some(CardId::new(55)));
        assert_eq!(state.get(OffenseId::new(101)), Some(CardSlot::Retired));
    }

    #[test]
    fn test_later_line_wins_on_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "100,55\n100,\n").unwrap();
        let state = store.load().unwrap();
        assert_eq!(state.get(OffenseId::new(100)), Some(CardSlot::Retired));
    }

    #[test]
    fn test_malformed_lines_are_reported_with_line_number() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for (contents, bad_line) in [
            ("100,55\n100\n", 2),
            ("100,55,1\n", 1),
            ("abc,55\n", 1),
            ("#offense-deck-mapping v1\n1,x\n", 2),
            ("#offense-deck-mapping v9\n1,2\n", 1),
            ("1,2\n#offense-deck-mapping v1\n", 2),
        ] {
            fs::write(store.path(), contents).unwrap();
            match store.load() {
                Err(StoreError::Corrupt { line, .. }) => {
                    assert_eq!(line, bad_line, "contents: {contents:?}")
                }
                other => panic!("expected corrupt error for {contents:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_tombstone_refuses_to_rewrite_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "100,55\ngarbage\n").unwrap();

        assert!(matches!(
            store.tombstone(OffenseId::new(100)),
            Err(StoreError::Corrupt { line: 2, .. })
        ));
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "100,55\ngarbage\n"
        );
    }

    #[test]
    fn test_record_terminates_unterminated_last_line_first() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "100,55").unwrap();

        store.record(OffenseId::new(101), CardId::new(56)).unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "100,55\n101,56\n");
        let state = store.load().unwrap();
        assert_eq!(state.live_card(OffenseId::new(100)), Some(CardId::new(55)));
        assert_eq!(state.live_card(OffenseId::new(101)), Some(CardId::new(56)));
    }

    #[test]
    fn test_record_refuses_to_append_after_torn_line() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let torn = format!("{VERSION_MARKER}\n100,55\n101");
        fs::write(store.path(), &torn).unwrap();

        assert!(matches!(
            store.record(OffenseId::new(102), CardId::new(7)),
            Err(StoreError::Corrupt { line: 3, .. })
        ));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), torn);
    }

    #[test]
    fn test_record_into_blank_file_writes_marker_first() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "\n\n").unwrap();

        store.record(OffenseId::new(1), CardId::new(2)).unwrap();

        assert_eq!(lines(&store), vec![VERSION_MARKER, "1,2"]);
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_tombstone_is_atomic_when_file_name_ends_in_tmp() {
        let dir = TempDir::new().unwrap();
        let store = FileMappingStore::new(dir.path().join("mapping.tmp"));
        store.record(OffenseId::new(100), CardId::new(55)).unwrap();
        store.record(OffenseId::new(101), CardId::new(56)).unwrap();

        assert_eq!(store.temp_path(), dir.path().join("mapping.tmp.tmp"));
        store.tombstone(OffenseId::new(100)).unwrap();

        assert_eq!(lines(&store), vec![VERSION_MARKER, "100,", "101,56"]);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_parse_entry_trims_whitespace() {
        let entry = parse_entry(" 100 , 55 ").unwrap();
        assert_eq!(entry.offense, OffenseId::new(100));
        assert_eq!(entry.slot, CardSlot::Live(CardId::new(55)));
    }
}

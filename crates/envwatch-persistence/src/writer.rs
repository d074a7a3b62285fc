//! JSON Lines reading store.
//!
//! Uses JSON Lines format (.jsonl) for robustness:
//! - Each line is a complete JSON object
//! - Partial file corruption only affects individual lines
//! - Can be read even if write was interrupted
//!
//! Files rotate daily (`readings_YYYY-MM-DD.jsonl`, by write date). Only
//! readings created within the last `RESIDENT_HOURS` are held in memory,
//! sorted by `created_at`; queries reaching further back read the files on
//! demand. A reading is expected to be created no later than the day it is
//! written, so files dated before a query's start are skipped unread.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use envwatch_core::Reading;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::PersistenceResult;
use crate::store::{insert_sorted, latest_of, recent_of, since_of, ReadingStore};

const FILE_PREFIX: &str = "readings_";
const FILE_SUFFIX: &str = ".jsonl";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Hours of readings, by `created_at`, kept in memory.
pub const RESIDENT_HOURS: i64 = 48;

/// Minimum slide of the resident window before old readings are evicted.
const EVICT_STEP_MINUTES: i64 = 60;

/// Active writer state for daily file.
struct ActiveWriter {
    file: File,
    date: String,
    records_written: usize,
}

struct Inner {
    active_writer: Option<ActiveWriter>,
    /// Readings with `created_at >= resident_from`, sorted.
    index: Vec<Reading>,
    resident_from: DateTime<Utc>,
    /// At least one stored reading predates `resident_from`.
    has_older: bool,
}

impl Inner {
    /// Drop readings created before `horizon` from memory.
    fn evict_before(&mut self, horizon: DateTime<Utc>) {
        let cut = self.index.partition_point(|r| r.created_at < horizon);
        if cut > 0 {
            self.index.drain(..cut);
            self.has_older = true;
            debug!(evicted = cut, resident = self.index.len(), "Evicted readings from memory");
        }
        self.resident_from = horizon;
    }
}

/// Append-only reading store on JSON Lines files.
pub struct JsonLinesStore {
    /// Base directory for output files.
    base_dir: PathBuf,
    inner: Mutex<Inner>,
}

impl JsonLinesStore {
    /// Open (or create) a store in `base_dir`, loading recent readings.
    pub fn open(base_dir: impl AsRef<Path>) -> PersistenceResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;

        let resident_from = Utc::now() - Duration::hours(RESIDENT_HOURS);
        let files = reading_files(&base_dir)?;

        let mut index = Vec::new();
        let mut has_older = false;
        for (date, path) in &files {
            if *date < resident_from.date_naive() {
                has_older = true;
                continue;
            }
            for reading in read_file(path)? {
                if reading.created_at >= resident_from {
                    index.push(reading);
                } else {
                    has_older = true;
                }
            }
        }
        // Stable: equal timestamps keep file order
        index.sort_by_key(|r| r.created_at);

        debug!(
            files = files.len(),
            resident = index.len(),
            has_older,
            "Loaded reading files"
        );

        Ok(Self {
            base_dir,
            inner: Mutex::new(Inner {
                active_writer: None,
                index,
                resident_from,
                has_older,
            }),
        })
    }

    /// Number of readings held in memory.
    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().index.is_empty()
    }

    fn file_for(&self, date: &str) -> PathBuf {
        self.base_dir
            .join(format!("{FILE_PREFIX}{date}{FILE_SUFFIX}"))
    }

    /// Open a writer for the given date.
    fn open_writer(&self, date: &str) -> PersistenceResult<ActiveWriter> {
        let filename = self.file_for(date);

        info!(filename = %filename.display(), "Opening JSON Lines writer (append mode)");

        // Open in append mode - won't truncate existing data
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&filename)?;

        // Close off a torn last line so the next record starts clean
        if ends_mid_line(&filename)? {
            warn!(filename = %filename.display(), "Reading file ends mid-line, terminating it");
            file.write_all(b"\n")?;
        }

        Ok(ActiveWriter {
            file,
            date: date.to_string(),
            records_written: 0,
        })
    }

    fn close_writer(active: ActiveWriter) {
        if let Err(e) = active.file.sync_data() {
            warn!(?e, "Failed to sync reading file on close");
        }
        info!(
            date = %active.date,
            records = active.records_written,
            "Closed JSON Lines writer"
        );
    }

    /// Every stored reading created at or after `start`, read from disk.
    fn scan_since(&self, start: DateTime<Utc>) -> PersistenceResult<Vec<Reading>> {
        let mut readings = Vec::new();
        for (date, path) in reading_files(&self.base_dir)? {
            if date < start.date_naive() {
                continue;
            }
            readings.extend(read_file(&path)?.into_iter().filter(|r| r.created_at >= start));
        }
        readings.sort_by_key(|r| r.created_at);
        Ok(readings)
    }

    /// Newest `limit` stored readings, read from disk newest file first.
    fn scan_recent(&self, limit: usize) -> PersistenceResult<Vec<Reading>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut chunks: Vec<Vec<Reading>> = Vec::new();
        for (date, path) in reading_files(&self.base_dir)?.iter().rev() {
            chunks.push(read_file(path)?);

            // Older files only hold readings created before this date
            let floor = date.and_time(NaiveTime::MIN).and_utc();
            let settled = chunks
                .iter()
                .flatten()
                .filter(|r| r.created_at >= floor)
                .count();
            if settled >= limit {
                break;
            }
        }

        let mut readings: Vec<Reading> = chunks.into_iter().rev().flatten().collect();
        readings.sort_by_key(|r| r.created_at);
        Ok(recent_of(&readings, limit))
    }
}

impl ReadingStore for JsonLinesStore {
    fn append(&self, reading: &Reading) -> PersistenceResult<()> {
        let mut line = serde_json::to_string(reading)?;
        line.push('\n');
        let now = Utc::now();
        let today = now.format(DATE_FORMAT).to_string();

        let mut inner = self.inner.lock();

        // Rotate when the date changed since the writer was opened
        let mut active = match inner.active_writer.take() {
            Some(active) if active.date == today => active,
            stale => {
                if let Some(old) = stale {
                    Self::close_writer(old);
                }
                self.open_writer(&today)?
            }
        };

        // One unbuffered write per record. On failure the writer is dropped
        // and the next append reopens the file
        active.file.write_all(line.as_bytes()).map_err(|e| {
            warn!(error = %e, "Failed to write reading, closing writer");
            e
        })?;
        active.records_written += 1;
        inner.active_writer = Some(active);

        let horizon = now - Duration::hours(RESIDENT_HOURS);
        if horizon - inner.resident_from >= Duration::minutes(EVICT_STEP_MINUTES) {
            inner.evict_before(horizon);
        }

        if reading.created_at >= inner.resident_from {
            insert_sorted(&mut inner.index, reading.clone());
        } else {
            inner.has_older = true;
        }
        debug!(id = %reading.id, "Appended reading");
        Ok(())
    }

    fn latest(&self) -> PersistenceResult<Option<Reading>> {
        let inner = self.inner.lock();
        if inner.index.is_empty() && inner.has_older {
            return Ok(self.scan_recent(1)?.pop());
        }
        Ok(latest_of(&inner.index))
    }

    fn since(&self, start: DateTime<Utc>) -> PersistenceResult<Vec<Reading>> {
        let inner = self.inner.lock();
        if start < inner.resident_from && inner.has_older {
            return self.scan_since(start);
        }
        Ok(since_of(&inner.index, start))
    }

    fn recent(&self, limit: usize) -> PersistenceResult<Vec<Reading>> {
        let inner = self.inner.lock();
        if inner.index.len() < limit && inner.has_older {
            return self.scan_recent(limit);
        }
        Ok(recent_of(&inner.index, limit))
    }
}

impl Drop for JsonLinesStore {
    fn drop(&mut self) {
        if let Some(active) = self.inner.get_mut().active_writer.take() {
            Self::close_writer(active);
        }
    }
}

/// Reading files in `dir` with their write date, oldest first.
fn reading_files(dir: &Path) -> PersistenceResult<Vec<(NaiveDate, PathBuf)>> {
    let mut files: Vec<(NaiveDate, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            let date = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
            match NaiveDate::parse_from_str(date, DATE_FORMAT) {
                Ok(date) => Some((date, path)),
                Err(_) => {
                    warn!(file = %path.display(), "Ignoring reading file with unexpected name");
                    None
                }
            }
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Parse one reading file, skipping corrupt lines.
fn read_file(path: &Path) -> PersistenceResult<Vec<Reading>> {
    let reader = BufReader::new(File::open(path)?);
    let mut readings = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Reading>(&line) {
            Ok(reading) => readings.push(reading),
            Err(e) => warn!(
                file = %path.display(),
                line = lineno + 1,
                error = %e,
                "Skipping corrupt reading line"
            ),
        }
    }
    Ok(readings)
}

fn ends_mid_line(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

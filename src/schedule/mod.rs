//! Schedule Reference Table
//!
//! Loads the train reference table from CSV and resolves train identifiers to
//! [`TrainRecord`]s. The table is read once at startup and shared read-only.
//!
//! Required columns: `train_id, priority, max_speed, train_type`. Movement
//! columns (`block_id`, `approach_dir`, `arrival_time`, ...) and trip columns
//! (`passengers`, `distance_km`, ...) are optional and feed conflict detection.
//!
//! # Usage
//!
//! ```ignore
//! use block_arbiter::schedule::ScheduleTable;
//!
//! let table = ScheduleTable::load("trains.csv", &config.schedule)?;
//! let record = table.lookup(&TrainRef::from(12951))?;
//! ```

pub mod csv;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::ScheduleConfig;
use crate::error::{ArbiterError, ScheduleError};
use crate::types::{ScheduledTrain, TrainRecord, TrainRef};

use self::csv::{csv_split, parse_row, ColumnMap};

/// The loaded reference table, keyed by integer train id.
#[derive(Debug, Clone, Default)]
pub struct ScheduleTable {
    rows: Vec<ScheduledTrain>,
    index: HashMap<i64, usize>,
}

impl ScheduleTable {
    /// Load a schedule CSV file.
    pub fn load(path: impl AsRef<Path>, config: &ScheduleConfig) -> Result<Self, ScheduleError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let io_err = |source| ScheduleError::Io {
            path: path_str.clone(),
            source,
        };

        let file = File::open(path).map_err(io_err)?;
        let mut lines = BufReader::new(file).lines();

        let header = lines.next().ok_or(ScheduleError::Empty)?.map_err(io_err)?;
        let cols = ColumnMap::from_header(&header)?;
        tracing::debug!(file = %path_str, optional_columns = %cols.optional_summary(), "Schedule header");

        let mut table = Self::default();
        let mut line_num = 1usize;
        for line in lines {
            line_num += 1;
            let line = line.map_err(io_err)?;
            table.push_line(&line, &cols, config, line_num)?;
        }

        tracing::info!(file = %path_str, trains = table.len(), "Schedule loaded");
        Ok(table)
    }

    /// Parse a schedule from CSV text (header row first).
    pub fn from_csv_str(text: &str, config: &ScheduleConfig) -> Result<Self, ScheduleError> {
        let mut lines = text.lines();
        let header = lines.next().ok_or(ScheduleError::Empty)?;
        let cols = ColumnMap::from_header(header)?;

        let mut table = Self::default();
        for (i, line) in lines.enumerate() {
            table.push_line(line, &cols, config, i + 2)?;
        }
        Ok(table)
    }

    fn push_line(
        &mut self,
        line: &str,
        cols: &ColumnMap,
        config: &ScheduleConfig,
        line_num: usize,
    ) -> Result<(), ScheduleError> {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            return Ok(());
        }
        let fields = csv_split(line);
        let row = parse_row(&fields, cols, config, line_num)?;
        self.insert(row, line_num)
    }

    fn insert(&mut self, row: ScheduledTrain, line: usize) -> Result<(), ScheduleError> {
        let id = row.id();
        if self.index.contains_key(&id) {
            return Err(ScheduleError::DuplicateId { line, id });
        }
        self.index.insert(id, self.rows.len());
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in file order.
    pub fn rows(&self) -> &[ScheduledTrain] {
        &self.rows
    }

    pub fn get(&self, id: i64) -> Option<&ScheduledTrain> {
        self.index.get(&id).map(|&i| &self.rows[i])
    }

    /// Resolve an identifier to its full schedule row.
    ///
    /// A string identifier must parse as an integer (`InvalidInput`
    /// otherwise); an unknown id is `NotFound`.
    pub fn lookup_row(&self, train: &TrainRef) -> Result<&ScheduledTrain, ArbiterError> {
        let id = train.as_table_id().ok_or_else(|| {
            ArbiterError::invalid("train_id", format!("'{train}' is not an integer train id"))
        })?;
        self.get(id)
            .ok_or_else(|| ArbiterError::NotFound(train.to_string()))
    }

    /// Resolve an identifier to its [`TrainRecord`].
    pub fn lookup(&self, train: &TrainRef) -> Result<&TrainRecord, ArbiterError> {
        self.lookup_row(train).map(|row| &row.record)
    }
}

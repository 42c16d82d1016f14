//! Dataset Store - CSV-backed question/answer mapping
//!
//! Keys are lower-cased questions. The mapping keeps insertion order so the
//! resolver sees keys in the same order they appear in the file.
//!
//! Appends write the mapping first and the file second. The two writes are
//! not transactional: a crash in between leaves the file one row short of
//! memory, which the next load simply doesn't see.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ChatError;

const QUESTION_COLUMN: &str = "question";
const ANSWER_COLUMN: &str = "answer";

/// A single dataset row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    pub question: String,
    pub answer: String,
}

/// Result of [`DatasetStore::append`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// New row added to memory and file
    Saved,
    /// Question already known; nothing written
    Skipped,
}

/// Exclusive owner of the dataset mapping and its backing file
#[derive(Debug)]
pub struct DatasetStore {
    path: PathBuf,
    entries: Vec<DatasetEntry>,
    index: HashMap<String, usize>,
}

impl DatasetStore {
    /// Load every row of the dataset file.
    ///
    /// Later rows win over earlier rows with the same (case-insensitive)
    /// question, keeping the first row's position.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let path = path.as_ref().to_path_buf();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .map_err(|e| ChatError::dataset_load(&path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| ChatError::dataset_load(&path, e))?
            .clone();
        let question_idx = column_index(&headers, QUESTION_COLUMN)
            .ok_or_else(|| ChatError::dataset_load(&path, "missing 'question' column"))?;
        let answer_idx = column_index(&headers, ANSWER_COLUMN)
            .ok_or_else(|| ChatError::dataset_load(&path, "missing 'answer' column"))?;

        let mut store = Self {
            path: path.clone(),
            entries: Vec::new(),
            index: HashMap::new(),
        };

        for (row_idx, result) in reader.records().enumerate() {
            let record = result
                .map_err(|e| ChatError::dataset_load(&path, format!("row {}: {}", row_idx + 1, e)))?;
            let (Some(question), Some(answer)) = (record.get(question_idx), record.get(answer_idx)) else {
                return Err(ChatError::dataset_load(
                    &path,
                    format!("row {}: missing question or answer field", row_idx + 1),
                ));
            };
            store.upsert(question.to_lowercase(), answer.to_string());
        }

        info!(path = %path.display(), entries = store.len(), "Loaded dataset");
        Ok(store)
    }

    /// Load the dataset, first writing an empty one (header only) if the
    /// file does not exist yet.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let path = path.as_ref();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| ChatError::dataset_load(path, e))?;
            }
            write_header(path).map_err(|e| ChatError::dataset_load(path, e))?;
            info!(path = %path.display(), "Created empty dataset");
        }
        Self::load(path)
    }

    /// Case-insensitive exact key lookup
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.index
            .get(&key.to_lowercase())
            .map(|&i| self.entries[i].answer.as_str())
    }

    /// Add a new question/answer pair.
    ///
    /// Existing questions are never overwritten: the call returns
    /// [`AppendOutcome::Skipped`] and touches neither memory nor file.
    pub fn append(&mut self, question: &str, answer: &str) -> Result<AppendOutcome, ChatError> {
        let question = question.to_lowercase();
        if self.index.contains_key(&question) {
            debug!(question = %question, "Question already in dataset, skipping");
            return Ok(AppendOutcome::Skipped);
        }

        self.upsert(question.clone(), answer.to_string());
        self.append_row(&question, answer)
            .map_err(|source| ChatError::DatasetWrite { path: self.path.clone(), source })?;

        info!(question = %question, "Saved new dataset entry");
        Ok(AppendOutcome::Saved)
    }

    /// Entries in mapping order
    pub fn entries(&self) -> impl Iterator<Item = &DatasetEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn upsert(&mut self, question: String, answer: String) {
        match self.index.get(&question) {
            Some(&i) => self.entries[i].answer = answer,
            None => {
                self.index.insert(question.clone(), self.entries.len());
                self.entries.push(DatasetEntry { question, answer });
            }
        }
    }

    fn append_row(&self, question: &str, answer: &str) -> Result<(), csv::Error> {
        let mut file = OpenOptions::new().read(true).append(true).open(&self.path)?;

        // Hand-edited files may lack a trailing newline
        if file.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                file.write_all(b"\n")?;
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        writer.write_record([question, answer])?;
        writer.flush()?;
        Ok(())
    }
}

fn write_header(path: &Path) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)?;
    writer.write_record([QUESTION_COLUMN, ANSWER_COLUMN])?;
    writer.flush()?;
    Ok(())
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

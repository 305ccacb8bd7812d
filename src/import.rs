//! Corpus import.
//!
//! Loads tweets from a CSV file in the Sentiment140 layout: no header row, and the columns
//! polarity, tweet id, date, query, user and text. The published dataset is Latin-1 encoded, so
//! fields that are not valid UTF-8 are decoded as Latin-1.

use crate::error::StatsError;
use crate::models::Record;
use crate::store::SqliteStore;

use csv::ByteRecord;
use std::io::Read;
use std::path::Path;
use tracing::{event, Level};

/// Column positions of the fields that are kept.
const POLARITY_COLUMN: usize = 0;
const USER_COLUMN: usize = 4;
const TEXT_COLUMN: usize = 5;

/// Result of an import.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ImportSummary {
    /// Rows stored in the corpus
    pub imported: usize,
    /// Rows that could not be parsed
    pub skipped: usize,
}

/// Import the CSV file at `path` into `store`.
///
/// # Arguments
///
/// * `store`: Corpus to add the tweets to
/// * `path`: CSV file to read
#[tracing::instrument(level = "INFO", skip(store))]
pub fn import_csv(store: &SqliteStore, path: &Path) -> Result<ImportSummary, StatsError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    import_reader(store, reader)
}

/// Import CSV rows from `reader` into `store`.
///
/// Rows are streamed into a single transaction. Rows without an integer polarity or with
/// missing columns are logged and skipped. I/O errors abort the import, in which case nothing
/// is stored.
pub fn import_reader<R: Read>(
    store: &SqliteStore,
    mut reader: csv::Reader<R>,
) -> Result<ImportSummary, StatsError> {
    let mut skipped = 0;
    let records = reader.byte_records().filter_map(|row| match row {
        Ok(row) => match decode_row(&row) {
            Some(record) => Some(Ok(record)),
            None => {
                let line = row.position().map(|position| position.line());
                event!(Level::WARN, ?line, "Skipping CSV row without a valid polarity");
                skipped += 1;
                None
            }
        },
        Err(error) if error.is_io_error() => Some(Err(error.into())),
        Err(error) => {
            event!(Level::WARN, "Skipping CSV row: {}", error);
            skipped += 1;
            None
        }
    });
    let imported = store.try_insert_records(records)?;
    event!(Level::INFO, imported, skipped, "Corpus import complete");
    Ok(ImportSummary { imported, skipped })
}

/// Build a [Record] from a row, or `None` if the row has no usable polarity.
fn decode_row(row: &ByteRecord) -> Option<Record> {
    let polarity = std::str::from_utf8(row.get(POLARITY_COLUMN)?)
        .ok()?
        .trim()
        .parse()
        .ok()?;
    let user = decode_text(row.get(USER_COLUMN)?);
    let text = decode_text(row.get(TEXT_COLUMN)?);
    Some(Record::new(user, text, polarity))
}

/// Decode a field as UTF-8, falling back to Latin-1.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

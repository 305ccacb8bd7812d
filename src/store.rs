//! SQLite corpus store.
//!
//! The corpus lives in a single `tweets` table. Its columns are declared without a type so that,
//! like a document store, each row may hold values of any type; rows are validated when they are
//! decoded into a [Record].
//!
//! All access goes through one connection shared behind a mutex. Queries run on Tokio's blocking
//! thread pool. Record scans hand rows to the async side through a bounded channel, so a scan
//! only runs ahead of its consumer by a fixed number of records.

use crate::error::StatsError;
use crate::extractor;
use crate::models::{RankedEntry, Record};
use crate::source::{Filter, RecordSource, RecordStream};

use async_trait::async_trait;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, Row};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{ready, Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tracing::{event, Level};

/// Name of the corpus table.
pub const TABLE: &str = "tweets";

/// Columns that get a lookup index.
pub const INDEXED_COLUMNS: [&str; 3] = ["user", "text", "polarity"];

/// Number of decoded records a scan may buffer ahead of its consumer.
const SCAN_BUFFER: usize = 256;

/// Corpus store backed by an SQLite database.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open the corpus at `db_url`, creating the database and table if necessary.
    ///
    /// # Arguments
    ///
    /// * `db_url`: Path or `file:` URI of the SQLite database
    pub fn open(db_url: &str) -> Result<Self, StatsError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::from_connection(Connection::open_with_flags(db_url, flags)?)
    }

    /// Open an empty in-memory corpus.
    pub fn open_in_memory() -> Result<Self, StatsError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StatsError> {
        register_functions(&conn)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert records in a single transaction.
    ///
    /// Returns the number of records inserted.
    pub fn insert_records<I>(&self, records: I) -> Result<usize, StatsError>
    where
        I: IntoIterator<Item = Record>,
    {
        self.try_insert_records(records.into_iter().map(Ok))
    }

    /// Insert records from a fallible iterator in a single transaction.
    ///
    /// The first error rolls the transaction back, so either every record is stored or none is.
    /// Returns the number of records inserted.
    pub fn try_insert_records<I>(&self, records: I) -> Result<usize, StatsError>
    where
        I: IntoIterator<Item = Result<Record, StatsError>>,
    {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {TABLE} (user, text, polarity) VALUES (?1, ?2, ?3)"
            ))?;
            for record in records {
                let record = record?;
                stmt.execute(params![record.user, record.text, record.polarity])?;
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Create the lookup indexes unless they already exist.
    ///
    /// Returns whether any index was created.
    pub fn provision_indexes(&self) -> Result<bool, StatsError> {
        let conn = lock(&self.conn)?;
        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1",
            [TABLE],
            |row| row.get(0),
        )?;
        if existing >= INDEXED_COLUMNS.len() as i64 {
            return Ok(false);
        }
        event!(Level::INFO, existing, "Creating corpus indexes");
        for column in INDEXED_COLUMNS {
            conn.execute(
                &format!("CREATE INDEX IF NOT EXISTS idx_{TABLE}_{column} ON {TABLE} ({column})"),
                [],
            )?;
        }
        Ok(true)
    }

    /// Run `f` with the connection on the blocking thread pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T, StatsError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StatsError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            f(&conn)
        })
        .await?
    }
}

/// Provision the corpus indexes in the background.
///
/// Failure is logged and otherwise ignored; queries work without the indexes, only slower.
pub fn spawn_index_provisioning(store: SqliteStore) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || match store.provision_indexes() {
        Ok(true) => event!(Level::INFO, "Corpus indexes created"),
        Ok(false) => event!(Level::DEBUG, "Corpus indexes already present"),
        Err(error) => event!(Level::WARN, "Failed to create corpus indexes: {}", error),
    })
}

#[async_trait]
impl RecordSource for SqliteStore {
    fn records(&self, filter: Filter) -> RecordStream {
        let conn = Arc::clone(&self.conn);
        let (tx, rx) = mpsc::channel(SCAN_BUFFER);
        let producer = tokio::task::spawn_blocking(move || scan(&conn, filter, &tx));
        Box::pin(ScanStream {
            rx,
            producer: Some(producer),
        })
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn distinct_users(&self) -> Result<u64, StatsError> {
        self.with_connection(|conn| {
            let users: i64 = conn.query_row(
                &format!("SELECT COUNT(DISTINCT user) FROM {TABLE}"),
                [],
                |row| row.get(0),
            )?;
            Ok(users as u64)
        })
        .await
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn group_count(
        &self,
        filter: Filter,
        limit: usize,
    ) -> Result<Vec<RankedEntry>, StatsError> {
        self.with_connection(move |conn| {
            let (clause, param) = where_clause(filter);
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let mut stmt = conn.prepare(&format!(
                "SELECT user, COUNT(*) AS count FROM {TABLE} \
                 WHERE {clause} AND typeof(user) = 'text' \
                 GROUP BY user ORDER BY count DESC, MIN(rowid) ASC LIMIT ?"
            ))?;
            let entries = stmt
                .query_map(params_from_iter(param.into_iter().chain([limit])), |row| {
                    let count: i64 = row.get(1)?;
                    Ok(RankedEntry::new(row.get::<_, String>(0)?, count as u64))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
    }
}

/// Stream of records produced by a blocking scan.
///
/// Once the channel is drained, the outcome of the scan itself is checked, so that a scan that
/// failed or panicked part way through ends the stream with an error instead of looking complete.
struct ScanStream {
    rx: mpsc::Receiver<Result<Record, StatsError>>,
    producer: Option<JoinHandle<Result<(), StatsError>>>,
}

impl Stream for ScanStream {
    type Item = Result<Record, StatsError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if let Some(item) = ready!(this.rx.poll_recv(cx)) {
            return Poll::Ready(Some(item));
        }
        let Some(producer) = this.producer.as_mut() else {
            return Poll::Ready(None);
        };
        let outcome = ready!(Pin::new(producer).poll(cx));
        this.producer = None;
        Poll::Ready(match outcome {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(Err(error)),
            Err(error) => Some(Err(error.into())),
        })
    }
}

/// Read the records matching `filter` in rowid order and send them to `tx`.
///
/// Stops early without error if the receiving side has been dropped.
fn scan(
    conn: &Mutex<Connection>,
    filter: Filter,
    tx: &mpsc::Sender<Result<Record, StatsError>>,
) -> Result<(), StatsError> {
    let conn = lock(conn)?;
    let (clause, param) = where_clause(filter);
    let mut stmt = conn.prepare(&format!(
        "SELECT rowid, user, text, polarity FROM {TABLE} WHERE {clause} ORDER BY rowid"
    ))?;
    let mut rows = stmt.query(params_from_iter(param))?;
    while let Some(row) = rows.next()? {
        if tx.blocking_send(decode(row)).is_err() {
            event!(Level::DEBUG, "Record consumer dropped, stopping scan");
            break;
        }
    }
    Ok(())
}

/// Decode a `rowid, user, text, polarity` row into a [Record].
fn decode(row: &Row<'_>) -> Result<Record, StatsError> {
    let rowid: i64 = row.get(0)?;
    let user = text_column(row, 1, rowid, "user")?;
    let text = text_column(row, 2, rowid, "text")?;
    let polarity = match row.get_ref(3)? {
        ValueRef::Integer(polarity) => polarity,
        other => return Err(malformed(rowid, format!("polarity is {}", other.data_type()))),
    };
    Ok(Record {
        user,
        text,
        polarity,
    })
}

fn text_column(row: &Row<'_>, idx: usize, rowid: i64, name: &str) -> Result<String, StatsError> {
    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => String::from_utf8(bytes.to_vec())
            .map_err(|_| malformed(rowid, format!("{name} is not valid UTF-8"))),
        other => Err(malformed(rowid, format!("{name} is {}", other.data_type()))),
    }
}

fn malformed(rowid: i64, reason: String) -> StatsError {
    StatsError::MalformedRecord { rowid, reason }
}

/// SQL condition and optional bound parameter for a filter.
fn where_clause(filter: Filter) -> (&'static str, Option<i64>) {
    match filter {
        Filter::All => ("1", None),
        Filter::Mentions => ("has_mention(text)", None),
        Filter::Polarity(polarity) => ("polarity = ?", Some(polarity.value())),
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StatsError> {
    conn.lock().map_err(|_| StatsError::LockPoisoned)
}

/// Register `has_mention(text)`, which is true when `text` contains a mention.
fn register_functions(conn: &Connection) -> Result<(), StatsError> {
    conn.create_scalar_function(
        "has_mention",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                    .map(extractor::contains_mention)
                    .unwrap_or(false),
                _ => false,
            })
        },
    )?;
    Ok(())
}

fn initialize_schema(conn: &Connection) -> Result<(), StatsError> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {TABLE} (user, text, polarity);"
    ))?;
    Ok(())
}

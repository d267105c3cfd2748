//! Load step: replace destination tables with run output.
//!
//! Every table is truncated and then bulk-inserted in chunks, with a
//! 0-based `id` row index prepended. Transactions and retries are left to
//! the database; a failed load surfaces as [`EtlError::Database`].

use crate::error::{EtlError, Result};
use crate::frame::{Frame, Value};
use crate::pipeline::RunOutput;
use sqlx::postgres::Postgres;
use sqlx::query_builder::Separated;
use sqlx::{PgPool, QueryBuilder};
use tracing::info;

pub const MAIN_TABLE: &str = "main";
pub const MAIN_INFO_TABLE: &str = "main_info";
pub const CINEMAS_INFO_TABLE: &str = "cinemas_info";

/// Rows per INSERT statement.
pub const INSERT_CHUNK_SIZE: usize = 50;

const INIT_SQL: &str = include_str!("../sql/init.sql");

/// Destination that can replace a table's full contents.
#[allow(async_fn_in_trait)]
pub trait Sink {
    /// Replace all rows of `table` with the rows of `frame`.
    async fn replace_all(&self, table: &str, frame: &Frame) -> Result<u64>;
}

/// Load the fact frame and both reports.
pub async fn load_run<S: Sink>(sink: &S, output: &RunOutput) -> Result<()> {
    let mut main = output.main.clone();
    main.drop_column("fuente");

    sink.replace_all(MAIN_TABLE, &main).await?;
    sink.replace_all(MAIN_INFO_TABLE, &output.reports.report_main)
        .await?;
    sink.replace_all(CINEMAS_INFO_TABLE, &output.reports.report_cinemas)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Int,
    Float,
    Date,
}

/// Kind of each column, from its first non-null value. All-null columns
/// are treated as text.
fn column_kinds(frame: &Frame) -> Vec<ColumnKind> {
    (0..frame.width())
        .map(|i| {
            frame
                .rows()
                .iter()
                .filter_map(|row| match row.get(i) {
                    Some(Value::Int(_)) => Some(ColumnKind::Int),
                    Some(Value::Float(_)) => Some(ColumnKind::Float),
                    Some(Value::Date(_)) => Some(ColumnKind::Date),
                    Some(Value::Text(_)) => Some(ColumnKind::Text),
                    _ => None,
                })
                .next()
                .unwrap_or(ColumnKind::Text)
        })
        .collect()
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn bind_value(b: &mut Separated<'_, '_, Postgres, &'static str>, value: &Value, kind: ColumnKind) {
    match kind {
        ColumnKind::Int => {
            b.push_bind(value.as_i64());
        }
        ColumnKind::Float => {
            let v = match value {
                Value::Float(f) if !f.is_nan() => Some(*f),
                Value::Int(i) => Some(*i as f64),
                _ => None,
            };
            b.push_bind(v);
        }
        ColumnKind::Date => {
            let v = match value {
                Value::Date(d) => Some(*d),
                _ => None,
            };
            b.push_bind(v);
        }
        ColumnKind::Text => {
            let v = match value {
                Value::Null => None,
                other => Some(other.to_string()),
            };
            b.push_bind(v);
        }
    }
}

/// Postgres destination.
#[derive(Debug, Clone)]
pub struct PgSink {
    pool: PgPool,
    chunk_size: usize,
}

impl PgSink {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            chunk_size: INSERT_CHUNK_SIZE,
        }
    }

    /// Create the destination tables if they do not exist.
    pub async fn init_schema(&self) -> Result<()> {
        info!("initializing database");
        sqlx::raw_sql(INIT_SQL)
            .execute(&self.pool)
            .await
            .map_err(|source| EtlError::Database {
                table: "*".to_string(),
                source,
            })?;
        info!("initialized database");
        Ok(())
    }
}

impl Sink for PgSink {
    async fn replace_all(&self, table: &str, frame: &Frame) -> Result<u64> {
        let db_err = |source: sqlx::Error| EtlError::Database {
            table: table.to_string(),
            source,
        };
        if let Some(bad) = std::iter::once(table)
            .chain(frame.columns().iter().map(String::as_str))
            .find(|n| !is_identifier(n))
        {
            return Err(EtlError::Config(format!("invalid SQL identifier '{}'", bad)));
        }

        info!(table, rows = frame.height(), "inserting frame into table");

        sqlx::query(&format!("TRUNCATE TABLE {}", table))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        let kinds = column_kinds(frame);
        let mut header = String::from("id");
        for column in frame.columns() {
            header.push_str(", ");
            header.push_str(column);
        }

        let mut inserted = 0u64;
        for (chunk_idx, chunk) in frame.rows().chunks(self.chunk_size).enumerate() {
            let offset = chunk_idx * self.chunk_size;
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO {} ({}) ", table, header));
            qb.push_values(chunk.iter().enumerate(), |mut b, (i, row)| {
                b.push_bind((offset + i) as i64);
                for (value, kind) in row.iter().zip(&kinds) {
                    bind_value(&mut b, value, *kind);
                }
            });
            let result = qb.build().execute(&self.pool).await.map_err(db_err)?;
            inserted += result.rows_affected();
        }

        info!(table, rows = inserted, "inserted frame into table");
        Ok(inserted)
    }
}

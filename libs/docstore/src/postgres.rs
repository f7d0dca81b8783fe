//! PostgreSQL document store
//!
//! Each collection is a table `(seq BIGSERIAL, id TEXT PRIMARY KEY, doc JSONB)`.
//! Equality filters use JSONB containment, indexes are expression indexes on
//! `doc->>'field'`, and unique violations (SQLSTATE 23505) are translated into
//! [`StoreError::Conflict`] using the constraint name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Row, postgres::PgArguments, query::Query};
use tracing::{debug, info};

use crate::{
    Clause, Document, DocumentStore, Filter, IndexSpec, StoreError, StoreResult, document_id,
    index::fields_from_index_name,
};

/// Value bound to a query placeholder
#[derive(Debug, Clone, PartialEq)]
enum Bind {
    Json(Value),
    Text(String),
    Time(DateTime<Utc>),
}

/// Document store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Wrap an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Reject names that cannot be safely interpolated into SQL
fn checked_name(name: &str) -> StoreResult<&str> {
    let valid = !name.is_empty()
        && name.len() <= 48
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidQuery(format!("unsupported name: {:?}", name)))
    }
}

/// Escape a literal for a POSIX regular expression
fn escape_pattern(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if !c.is_alphanumeric() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build a WHERE condition for `filter`, numbering placeholders from `first`
fn where_clause(filter: &Filter, first: usize) -> StoreResult<(String, Vec<Bind>)> {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();
    let mut contained = Document::new();

    for clause in filter.clauses() {
        match clause {
            Clause::Eq { field, value } => {
                contained.insert(checked_name(field)?.to_string(), value.clone());
            }
            Clause::SlugFamily {
                field,
                base,
                delimiter,
            } => {
                binds.push(Bind::Text(format!(
                    "^{}({}[0-9]+)?$",
                    escape_pattern(base),
                    escape_pattern(delimiter)
                )));
                conditions.push(format!(
                    "doc->>'{}' ~ ${}",
                    checked_name(field)?,
                    first + binds.len() - 1
                ));
            }
            Clause::Before { field, instant } => {
                binds.push(Bind::Time(*instant));
                conditions.push(format!(
                    "(doc->>'{}')::timestamptz < ${}",
                    checked_name(field)?,
                    first + binds.len() - 1
                ));
            }
        }
    }

    if !contained.is_empty() {
        binds.push(Bind::Json(Value::Object(contained)));
        conditions.push(format!("doc @> ${}", first + binds.len() - 1));
    }

    if conditions.is_empty() {
        return Ok(("TRUE".to_string(), binds));
    }

    Ok((conditions.join(" AND "), binds))
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    binds: Vec<Bind>,
) -> Query<'q, Postgres, PgArguments> {
    for bind in binds {
        query = match bind {
            Bind::Json(value) => query.bind(value),
            Bind::Text(text) => query.bind(text),
            Bind::Time(instant) => query.bind(instant),
        };
    }
    query
}

/// Translate a driver error, recognising unique violations
fn map_error(collection: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let index = db.constraint().unwrap_or_default().to_string();
            let fields = fields_from_index_name(collection, &index);
            return StoreError::Conflict { index, fields };
        }
    }

    StoreError::Unavailable(err)
}

fn into_document(value: Value) -> StoreResult<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, found {}",
            other
        ))),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ensure_collection(&self, collection: &str) -> StoreResult<()> {
        let table = checked_name(collection)?;
        let sql = format!(
            r#"CREATE TABLE IF NOT EXISTS "{}" (
                seq BIGSERIAL NOT NULL,
                id TEXT PRIMARY KEY,
                doc JSONB NOT NULL
            )"#,
            table
        );

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        info!("Collection {} is ready", collection);
        Ok(())
    }

    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()> {
        self.ensure_collection(collection).await?;

        let table = checked_name(collection)?;
        let columns = index
            .fields
            .iter()
            .map(|field| checked_name(field).map(|f| format!("(doc->>'{}')", f)))
            .collect::<StoreResult<Vec<_>>>()?
            .join(", ");
        let name = index.name(collection);

        let sql = format!(
            r#"CREATE {}INDEX IF NOT EXISTS "{}" ON "{}" ({})"#,
            if index.unique { "UNIQUE " } else { "" },
            name,
            table,
            columns
        );

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        info!("Index {} is ready", name);
        Ok(())
    }

    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<()> {
        let table = checked_name(collection)?;
        let id = document_id(&doc)?.to_string();
        let sql = format!(r#"INSERT INTO "{}" (id, doc) VALUES ($1, $2)"#, table);

        sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(doc))
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let table = checked_name(collection)?;
        let (condition, binds) = where_clause(filter, 1)?;
        let sql = format!(
            r#"SELECT doc FROM "{}" WHERE {} ORDER BY seq ASC LIMIT 1"#,
            table, condition
        );

        let row = bind_all(sqlx::query(&sql), binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        row.map(|row| {
            let value: Value = row.try_get("doc").map_err(StoreError::Unavailable)?;
            into_document(value)
        })
        .transpose()
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let table = checked_name(collection)?;
        let (condition, binds) = where_clause(filter, 1)?;
        let sql = format!(
            r#"SELECT doc FROM "{}" WHERE {} ORDER BY seq ASC"#,
            table, condition
        );

        let rows = bind_all(sqlx::query(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        debug!("Found {} documents in {}", rows.len(), collection);

        rows.into_iter()
            .map(|row| {
                let value: Value = row.try_get("doc").map_err(StoreError::Unavailable)?;
                into_document(value)
            })
            .collect()
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        mut patch: Document,
    ) -> StoreResult<Option<Document>> {
        let table = checked_name(collection)?;
        patch.remove("id");

        let (condition, binds) = where_clause(filter, 2)?;
        let sql = format!(
            r#"UPDATE "{table}" SET doc = doc || $1
               WHERE seq = (SELECT seq FROM "{table}" WHERE {condition} ORDER BY seq ASC LIMIT 1)
               RETURNING doc"#,
            table = table,
            condition = condition
        );

        let query = sqlx::query(&sql).bind(Value::Object(patch));
        let row = bind_all(query, binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        row.map(|row| {
            let value: Value = row.try_get("doc").map_err(StoreError::Unavailable)?;
            into_document(value)
        })
        .transpose()
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        let table = checked_name(collection)?;
        let (condition, binds) = where_clause(filter, 1)?;
        let sql = format!(
            r#"DELETE FROM "{table}"
               WHERE seq = (SELECT seq FROM "{table}" WHERE {condition} ORDER BY seq ASC LIMIT 1)"#,
            table = table,
            condition = condition
        );

        let result = bind_all(sqlx::query(&sql), binds)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let table = checked_name(collection)?;
        let (condition, binds) = where_clause(filter, 1)?;
        let sql = format!(r#"DELETE FROM "{}" WHERE {}"#, table, condition);

        let result = bind_all(sqlx::query(&sql), binds)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        Ok(result.rows_affected())
    }
}

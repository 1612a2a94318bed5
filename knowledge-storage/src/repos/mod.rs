//! Session-isolated repositories
//!
//! One generic repository per catalog kind plus specialized repositories
//! for classes, spells, monsters, and equipment. Every public call
//! acquires a connection, reads, converts rows into pure value objects,
//! and releases the connection before returning; callers can hold the
//! returned values indefinitely.
//!
//! Lookups accept an optional content-pack priority list. With a list, the
//! first pack containing a match wins; without one, only active packs are
//! visible.

mod classes;
mod equipment;
mod monsters;
mod resolver;
mod spells;

use std::marker::PhantomData;
use std::sync::Arc;

use libsql::params::IntoParams;
use serde_json::Value;
use tracing::warn;

use gm_knowledge_core::catalog::CatalogEntity;
use gm_knowledge_core::{EntityKind, Error, Result};

use crate::fields::{field_map, FieldMap};
use crate::rows;
use crate::ContentStore;

pub use classes::ClassRepository;
pub use equipment::EquipmentRepository;
pub use monsters::MonsterRepository;
pub use resolver::ReferenceResolver;
pub use spells::SpellRepository;

/// Generic repository over one catalog kind
pub struct Repository<T: CatalogEntity> {
    store: Arc<ContentStore>,
    fields: Arc<FieldMap>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: CatalogEntity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            fields: Arc::clone(&self.fields),
            _marker: PhantomData,
        }
    }
}

impl<T: CatalogEntity> Repository<T> {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self {
            store,
            // First construction of a kind populates the process-wide cache
            fields: field_map(T::KIND),
            _marker: PhantomData,
        }
    }

    pub fn kind(&self) -> EntityKind {
        T::KIND
    }

    fn table(&self) -> &'static str {
        T::KIND.table_name()
    }

    /// Get an entity by its unique index from any active pack
    pub async fn get_by_index(&self, index: &str) -> Result<Option<T>> {
        self.get_by_index_with_packs(index, None).await
    }

    /// Get an entity by index, resolving through the pack priority list
    pub async fn get_by_index_with_packs(
        &self,
        index: &str,
        packs: Option<&[String]>,
    ) -> Result<Option<T>> {
        self.lookup_one("\"index\" = ?", index, packs).await
    }

    /// Get an entity by name (case-insensitive) from any active pack
    pub async fn get_by_name(&self, name: &str) -> Result<Option<T>> {
        self.get_by_name_with_packs(name, None).await
    }

    /// Get an entity by name, resolving through the pack priority list
    pub async fn get_by_name_with_packs(
        &self,
        name: &str,
        packs: Option<&[String]>,
    ) -> Result<Option<T>> {
        self.lookup_one("name = ? COLLATE NOCASE", name, packs).await
    }

    async fn lookup_one(
        &self,
        predicate: &str,
        value: &str,
        packs: Option<&[String]>,
    ) -> Result<Option<T>> {
        let conn = self.store.acquire().await?;

        let found = if let Some(priority) = packs {
            let sql = format!(
                "SELECT t.* FROM {} t WHERE t.{predicate} AND t.content_pack_id = ? LIMIT 1",
                self.table()
            );
            let mut found = None;
            for pack_id in priority {
                if let Some(model) = self
                    .query_one(&conn, &sql, libsql::params![value, pack_id.as_str()])
                    .await?
                {
                    found = Some(model);
                    break;
                }
            }
            found
        } else {
            // Order by pack id so the winner is stable when several active
            // packs share an index
            let sql = format!(
                "SELECT t.* FROM {} t JOIN content_packs p ON t.content_pack_id = p.id \
                 WHERE t.{predicate} AND p.is_active = 1 ORDER BY t.content_pack_id LIMIT 1",
                self.table()
            );
            self.query_one(&conn, &sql, libsql::params![value]).await?
        };

        self.store.release(conn);
        Ok(found)
    }

    /// All entities visible through the packs (or all active packs)
    pub async fn list_all(&self) -> Result<Vec<T>> {
        self.list_all_with_packs(None).await
    }

    pub async fn list_all_with_packs(&self, packs: Option<&[String]>) -> Result<Vec<T>> {
        let conn = self.store.acquire().await?;
        let models = match packs {
            Some(priority) => {
                let placeholders = vec!["?"; priority.len()].join(", ");
                let sql = format!(
                    "SELECT t.* FROM {} t WHERE t.content_pack_id IN ({placeholders})",
                    self.table()
                );
                let params: Vec<libsql::Value> = priority
                    .iter()
                    .map(|p| libsql::Value::Text(p.clone()))
                    .collect();
                self.query_models(&conn, &sql, libsql::params_from_iter(params))
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT t.* FROM {} t JOIN content_packs p ON t.content_pack_id = p.id \
                     WHERE p.is_active = 1",
                    self.table()
                );
                self.query_models(&conn, &sql, ()).await?
            }
        };
        self.store.release(conn);
        Ok(models)
    }

    /// Entities whose name contains the query (case-insensitive)
    pub async fn search(&self, query: &str) -> Result<Vec<T>> {
        self.search_with_packs(query, None).await
    }

    pub async fn search_with_packs(
        &self,
        query: &str,
        packs: Option<&[String]>,
    ) -> Result<Vec<T>> {
        let conn = self.store.acquire().await?;
        let pattern = format!("%{query}%");
        let models = match packs {
            Some(priority) => {
                let placeholders = vec!["?"; priority.len()].join(", ");
                let sql = format!(
                    "SELECT t.* FROM {} t WHERE t.name LIKE ? AND t.content_pack_id IN ({placeholders})",
                    self.table()
                );
                let mut params: Vec<libsql::Value> = vec![libsql::Value::Text(pattern)];
                params.extend(priority.iter().map(|p| libsql::Value::Text(p.clone())));
                self.query_models(&conn, &sql, libsql::params_from_iter(params))
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT t.* FROM {} t JOIN content_packs p ON t.content_pack_id = p.id \
                     WHERE t.name LIKE ? AND p.is_active = 1",
                    self.table()
                );
                self.query_models(&conn, &sql, libsql::params![pattern]).await?
            }
        };
        self.store.release(conn);
        Ok(models)
    }

    /// Entities matching exact column values. Field names are validated
    /// against the kind's declared columns before any SQL is built.
    pub async fn filter_by(&self, filters: &[(&str, Value)]) -> Result<Vec<T>> {
        let columns = kind_columns(T::KIND);
        let mut predicates = Vec::with_capacity(filters.len());
        let mut params: Vec<libsql::Value> = Vec::with_capacity(filters.len());

        for (field, value) in filters {
            let column = self.fields.column_for_field(field);
            if !columns.iter().any(|c| c == column) {
                return Err(Error::validation(
                    (*field).to_string(),
                    format!("not a column of {}", self.table()),
                ));
            }
            predicates.push(format!("t.\"{column}\" = ?"));
            params.push(json_to_sql_value(value)?);
        }

        let where_clause = if predicates.is_empty() {
            String::new()
        } else {
            format!("AND {} ", predicates.join(" AND "))
        };
        let sql = format!(
            "SELECT t.* FROM {} t JOIN content_packs p ON t.content_pack_id = p.id \
             WHERE p.is_active = 1 {where_clause}",
            self.table()
        );

        let conn = self.store.acquire().await?;
        let models = self
            .query_models(&conn, &sql, libsql::params_from_iter(params))
            .await?;
        self.store.release(conn);
        Ok(models)
    }

    /// Whether an entity with this index exists in any active pack
    pub async fn exists(&self, index: &str) -> Result<bool> {
        let conn = self.store.acquire().await?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} t JOIN content_packs p ON t.content_pack_id = p.id \
             WHERE t.\"index\" = ? AND p.is_active = 1",
            self.table()
        );
        let count = self
            .scalar_count(&conn, &sql, libsql::params![index])
            .await?;
        self.store.release(conn);
        Ok(count > 0)
    }

    /// Number of entities visible through active packs
    pub async fn count(&self) -> Result<usize> {
        let conn = self.store.acquire().await?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} t JOIN content_packs p ON t.content_pack_id = p.id \
             WHERE p.is_active = 1",
            self.table()
        );
        let count = self.scalar_count(&conn, &sql, ()).await?;
        self.store.release(conn);
        Ok(count)
    }

    /// All indices visible through active packs
    pub async fn get_indices(&self) -> Result<Vec<String>> {
        self.string_column("\"index\"").await
    }

    /// All names visible through active packs
    pub async fn get_names(&self) -> Result<Vec<String>> {
        self.string_column("name").await
    }

    async fn string_column(&self, column: &str) -> Result<Vec<String>> {
        let conn = self.store.acquire().await?;
        let sql = format!(
            "SELECT t.{column} FROM {} t JOIN content_packs p ON t.content_pack_id = p.id \
             WHERE p.is_active = 1 ORDER BY t.{column}",
            self.table()
        );
        let mut rows = conn
            .query(&sql, ())
            .await
            .map_err(|e| Error::database("list column", e))?;

        let mut values = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::database("list column", e))?
        {
            values.push(
                row.get::<String>(0)
                    .map_err(|e| Error::database("list column", e))?,
            );
        }
        self.store.release(conn);
        Ok(values)
    }

    async fn scalar_count(
        &self,
        conn: &libsql::Connection,
        sql: &str,
        params: impl IntoParams,
    ) -> Result<usize> {
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| Error::database("count", e))?;
        let count = match rows.next().await.map_err(|e| Error::database("count", e))? {
            Some(row) => row.get::<i64>(0).map_err(|e| Error::database("count", e))?,
            None => 0,
        };
        Ok(count.max(0) as usize)
    }

    /// Run a query expecting at most one row; validation failures on a
    /// point lookup propagate rather than being skipped
    async fn query_one(
        &self,
        conn: &libsql::Connection,
        sql: &str,
        params: impl IntoParams,
    ) -> Result<Option<T>> {
        let mut result = conn
            .query(sql, params)
            .await
            .map_err(|e| Error::database("lookup", e))?;
        let names = rows::column_names(&result);
        match result
            .next()
            .await
            .map_err(|e| Error::database("lookup", e))?
        {
            Some(row) => {
                let map = rows::row_to_json_map(&row, &names, &self.fields)?;
                Ok(Some(rows::to_model::<T>(map)?))
            }
            None => Ok(None),
        }
    }

    /// Run a query converting every row; invalid rows are logged and
    /// skipped so the rest of the batch still returns
    async fn query_models(
        &self,
        conn: &libsql::Connection,
        sql: &str,
        params: impl IntoParams,
    ) -> Result<Vec<T>> {
        let mut result = conn
            .query(sql, params)
            .await
            .map_err(|e| Error::database("query", e))?;
        let names = rows::column_names(&result);

        let mut models = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Error::database("query", e))?
        {
            match rows::row_to_json_map(&row, &names, &self.fields)
                .and_then(rows::to_model::<T>)
            {
                Ok(model) => models.push(model),
                Err(e) => warn!(table = self.table(), "skipping invalid row: {e}"),
            }
        }
        Ok(models)
    }
}

/// Declared column names of a kind table, derived from its DDL
pub(crate) fn kind_columns(kind: EntityKind) -> Vec<String> {
    let mut columns = vec![
        "index".to_string(),
        "name".to_string(),
        "url".to_string(),
        "content_pack_id".to_string(),
        "embedding".to_string(),
    ];
    for definition in kind.extra_columns_ddl().split(',') {
        if let Some(name) = definition.split_whitespace().next() {
            columns.push(name.trim_matches('"').to_string());
        }
    }
    columns
}

fn json_to_sql_value(value: &Value) -> Result<libsql::Value> {
    match value {
        Value::String(s) => Ok(libsql::Value::Text(s.clone())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(libsql::Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(libsql::Value::Real(f))
            } else {
                Err(Error::InvalidArgument(format!("unsupported number: {n}")))
            }
        }
        Value::Bool(b) => Ok(libsql::Value::Integer(i64::from(*b))),
        Value::Null => Ok(libsql::Value::Null),
        other => Err(Error::InvalidArgument(format!(
            "unsupported filter value: {other}"
        ))),
    }
}

/// Construction point wiring every repository to one store
pub struct RepositoryHub {
    store: Arc<ContentStore>,
}

impl RepositoryHub {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    /// Generic repository for any catalog kind
    pub fn repo<T: CatalogEntity>(&self) -> Repository<T> {
        Repository::new(Arc::clone(&self.store))
    }

    pub fn spells(&self) -> SpellRepository {
        SpellRepository::new(Arc::clone(&self.store))
    }

    pub fn monsters(&self) -> MonsterRepository {
        MonsterRepository::new(Arc::clone(&self.store))
    }

    pub fn classes(&self) -> ClassRepository {
        ClassRepository::new(Arc::clone(&self.store))
    }

    pub fn equipment(&self) -> EquipmentRepository {
        EquipmentRepository::new(Arc::clone(&self.store))
    }

    pub fn resolver(&self) -> ReferenceResolver {
        ReferenceResolver::new(Arc::clone(&self.store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_columns_include_shared_and_specific() {
        let columns = kind_columns(EntityKind::Spells);
        assert!(columns.contains(&"index".to_string()));
        assert!(columns.contains(&"level".to_string()));
        assert!(columns.contains(&"desc".to_string()));
        assert!(!columns.contains(&"hit_points".to_string()));

        let monster_columns = kind_columns(EntityKind::Monsters);
        assert!(monster_columns.contains(&"challenge_rating".to_string()));
    }

    #[test]
    fn filter_values_convert_or_reject() {
        assert!(matches!(
            json_to_sql_value(&Value::String("wand".into())),
            Ok(libsql::Value::Text(_))
        ));
        assert!(matches!(
            json_to_sql_value(&serde_json::json!(6)),
            Ok(libsql::Value::Integer(6))
        ));
        assert!(json_to_sql_value(&serde_json::json!({"nested": true})).is_err());
    }
}

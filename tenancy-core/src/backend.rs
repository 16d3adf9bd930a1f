//! Storage backends.
//!
//! A backend only ever sees rows through a [`RowFilter`] assembled by the
//! [`TenantStore`](crate::TenantStore). The `tenant` field of the filter is
//! the isolation predicate; a SQL backend renders it as `tenant_id = $n`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::errors::{ServiceError, ServiceResult};
use crate::record::Record;
use crate::tenant::TenantId;

/// Caller-supplied row predicate.
pub type Predicate<R> = dyn Fn(&R) -> bool + Send + Sync;

/// Conditions a row must meet to be visible to one operation.
pub struct RowFilter<'a, R> {
    /// Isolation predicate: only rows owned by this tenant.
    pub tenant: Option<TenantId>,
    pub id: Option<&'a str>,
    pub predicate: Option<&'a Predicate<R>>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl<'a, R: Record> RowFilter<'a, R> {
    pub fn matches(&self, row: &R) -> bool {
        if let Some(tenant) = self.tenant {
            if row.tenant_id() != Some(tenant) {
                return false;
            }
        }
        if let Some(id) = self.id {
            if row.id() != id {
                return false;
            }
        }
        self.predicate.map_or(true, |p| p(row))
    }
}

#[async_trait]
pub trait RecordBackend<R: Record>: Send + Sync {
    /// Persist a new row. Fails with `Conflict` if the id is taken.
    async fn insert(&self, record: R) -> ServiceResult<R>;

    /// Rows matching `filter`, ordered by id, after `skip`/`limit`.
    async fn select(&self, filter: &RowFilter<'_, R>) -> ServiceResult<Vec<R>>;

    /// Replace the row with `record.id()` if the current row matches `filter`.
    async fn replace(&self, record: R, filter: &RowFilter<'_, R>) -> ServiceResult<Option<R>>;

    /// Delete the row with `id` if it matches `filter`.
    async fn delete(&self, id: &str, filter: &RowFilter<'_, R>) -> ServiceResult<Option<R>>;
}

/// In-process backend keyed by id.
pub struct MemoryBackend<R> {
    rows: RwLock<BTreeMap<String, R>>,
}

impl<R> Default for MemoryBackend<R> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<R> MemoryBackend<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl<R: Record> RecordBackend<R> for MemoryBackend<R> {
    async fn insert(&self, record: R) -> ServiceResult<R> {
        let mut rows = self.rows.write();
        if rows.contains_key(record.id()) {
            return Err(
                ServiceError::conflict(format!("{} '{}' already exists", R::KIND, record.id()))
                    .into_anyhow(),
            );
        }
        rows.insert(record.id().to_string(), record.clone());
        Ok(record)
    }

    async fn select(&self, filter: &RowFilter<'_, R>) -> ServiceResult<Vec<R>> {
        let rows = self.rows.read();
        let matching = rows.values().filter(|row| filter.matches(row)).skip(filter.skip);
        let out = match filter.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        };
        Ok(out)
    }

    async fn replace(&self, record: R, filter: &RowFilter<'_, R>) -> ServiceResult<Option<R>> {
        let mut rows = self.rows.write();
        match rows.get_mut(record.id()) {
            Some(current) if filter.matches(current) => {
                *current = record.clone();
                Ok(Some(record))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: &str, filter: &RowFilter<'_, R>) -> ServiceResult<Option<R>> {
        let mut rows = self.rows.write();
        let visible = rows.get(id).is_some_and(|row| filter.matches(row));
        Ok(if visible { rows.remove(id) } else { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::Note;

    fn note(id: &str, tenant: Option<TenantId>) -> Note {
        Note {
            id: id.to_string(),
            tenant_id: tenant,
            ..Note::default()
        }
    }

    fn open<'a>() -> RowFilter<'a, Note> {
        RowFilter {
            tenant: None,
            id: None,
            predicate: None,
            skip: 0,
            limit: None,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let backend = MemoryBackend::new();
        backend.insert(note("n1", None)).await.unwrap();

        let err = backend.insert(note("n1", None)).await.unwrap_err();
        assert_eq!(ServiceError::find(&err).unwrap().code(), 409);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn select_applies_tenant_then_pagination() {
        let a = TenantId::generate();
        let b = TenantId::generate();
        let backend = MemoryBackend::new();
        for (id, t) in [("n1", a), ("n2", b), ("n3", a), ("n4", a)] {
            backend.insert(note(id, Some(t))).await.unwrap();
        }

        let filter = RowFilter {
            tenant: Some(a),
            skip: 1,
            limit: Some(1),
            ..open()
        };
        let rows = backend.select(&filter).await.unwrap();
        assert_eq!(rows.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["n3"]);
    }

    #[tokio::test]
    async fn replace_and_delete_respect_filter() {
        let a = TenantId::generate();
        let b = TenantId::generate();
        let backend = MemoryBackend::new();
        backend.insert(note("n1", Some(a))).await.unwrap();

        let as_b = RowFilter { tenant: Some(b), ..open() };
        assert!(backend.replace(note("n1", Some(b)), &as_b).await.unwrap().is_none());
        assert!(backend.delete("n1", &as_b).await.unwrap().is_none());
        assert_eq!(backend.len(), 1);

        let as_a = RowFilter { tenant: Some(a), ..open() };
        assert!(backend.delete("n1", &as_a).await.unwrap().is_some());
        assert!(backend.is_empty());
    }
}

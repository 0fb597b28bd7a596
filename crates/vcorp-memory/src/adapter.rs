// In-memory database adapter — HashMap-based store implementing the core
// Adapter trait.
//
// Stores data in `HashMap<String, Vec<serde_json::Value>>` keyed by
// collection name. Thread-safe via `tokio::sync::RwLock`; every mutating
// operation holds the write lock for its full filter-and-write step, which
// gives `update` and `increment` the same single-document atomicity the
// MongoDB adapter gets from conditional updates.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use vcorp_core::db::adapter::{
    Adapter, AdapterResult, Connector, FindManyQuery, Operator, SortDirection, WhereClause,
};

/// Type alias for the in-memory store.
type Store = HashMap<String, Vec<serde_json::Value>>;

/// In-memory database adapter.
///
/// All data is stored in a `HashMap` wrapped in an `Arc<RwLock<...>>` for
/// thread-safe concurrent access. Data is lost when the adapter is dropped.
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    store: Arc<RwLock<Store>>,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    /// Create a new empty in-memory adapter.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a new adapter pre-populated with data.
    pub fn with_data(data: Store) -> Self {
        Self {
            store: Arc::new(RwLock::new(data)),
        }
    }

    /// Get a snapshot of all data (for debugging/testing).
    pub async fn snapshot(&self) -> Store {
        self.store.read().await.clone()
    }

    /// Clear all data.
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    /// Get record count for a specific collection.
    pub async fn model_count(&self, model: &str) -> usize {
        self.store
            .read()
            .await
            .get(model)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

/// Read a possibly-dotted field path out of a record.
fn get_path(record: &serde_json::Value, path: &str) -> serde_json::Value {
    let mut current = record;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return serde_json::Value::Null,
        }
    }
    current.clone()
}

/// Write a possibly-dotted field path into a record, creating intermediate
/// objects as needed.
fn set_path(record: &mut serde_json::Value, path: &str, value: serde_json::Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = record;
    for segment in &segments[..segments.len() - 1] {
        if !current.get(*segment).map(|v| v.is_object()).unwrap_or(false) {
            if let Some(obj) = current.as_object_mut() {
                obj.insert(segment.to_string(), serde_json::json!({}));
            } else {
                return;
            }
        }
        current = match current.get_mut(*segment) {
            Some(next) => next,
            None => return,
        };
    }
    if let (Some(obj), Some(last)) = (current.as_object_mut(), segments.last()) {
        obj.insert(last.to_string(), value);
    }
}

/// Check if a record matches a set of WHERE clauses.
fn matches_where(record: &serde_json::Value, clauses: &[WhereClause]) -> bool {
    if clauses.is_empty() {
        return true;
    }

    let mut result = true;
    let mut pending_or = false;

    for clause in clauses {
        let field_val = get_path(record, &clause.field);
        let clause_match = match_operator(&field_val, &clause.value, &clause.operator);

        if pending_or {
            result = result || clause_match;
        } else {
            result = result && clause_match;
        }

        pending_or = matches!(clause.connector, Some(Connector::Or));
    }

    result
}

/// Match a single operator condition.
fn match_operator(field_val: &serde_json::Value, target: &serde_json::Value, op: &Operator) -> bool {
    match op {
        Operator::Eq => field_val == target,
        Operator::Ne => field_val != target,
        Operator::Lt => compare_json(field_val, target).map_or(false, |c| c < 0),
        Operator::Lte => compare_json(field_val, target).map_or(false, |c| c <= 0),
        Operator::Gt => compare_json(field_val, target).map_or(false, |c| c > 0),
        Operator::Gte => compare_json(field_val, target).map_or(false, |c| c >= 0),
        Operator::In => {
            if let serde_json::Value::Array(arr) = target {
                arr.contains(field_val)
            } else {
                false
            }
        }
        Operator::Contains => {
            let fs = field_val.as_str().unwrap_or("");
            let ts = target.as_str().unwrap_or("");
            fs.contains(ts)
        }
        Operator::StartsWith => {
            let fs = field_val.as_str().unwrap_or("");
            let ts = target.as_str().unwrap_or("");
            fs.starts_with(ts)
        }
        Operator::EndsWith => {
            let fs = field_val.as_str().unwrap_or("");
            let ts = target.as_str().unwrap_or("");
            fs.ends_with(ts)
        }
    }
}

/// Compare two JSON values numerically/lexicographically. RFC 3339
/// timestamps compare correctly as strings.
fn compare_json(a: &serde_json::Value, b: &serde_json::Value) -> Option<i8> {
    match (a, b) {
        (serde_json::Value::Number(an), serde_json::Value::Number(bn)) => {
            let af = an.as_f64()?;
            let bf = bn.as_f64()?;
            Some(af.partial_cmp(&bf).map(|o| match o {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            })?)
        }
        (serde_json::Value::String(a_s), serde_json::Value::String(b_s)) => {
            Some(match a_s.cmp(b_s) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            })
        }
        _ => None,
    }
}

/// Apply sorting to records.
fn sort_records(records: &mut [serde_json::Value], query: &FindManyQuery) {
    if let Some(ref sort) = query.sort_by {
        records.sort_by(|a, b| {
            let av = get_path(a, &sort.field);
            let bv = get_path(b, &sort.field);
            let cmp = compare_json(&av, &bv).unwrap_or(0);
            match sort.direction {
                SortDirection::Asc => cmp.cmp(&0),
                SortDirection::Desc => cmp.cmp(&0).reverse(),
            }
        });
    }
}

/// Merge update data into an existing record. Dotted keys set nested
/// fields, matching MongoDB `$set` semantics.
fn merge_update(record: &mut serde_json::Value, data: &serde_json::Value) {
    if let Some(data_obj) = data.as_object() {
        for (k, v) in data_obj {
            if k.contains('.') {
                set_path(record, k, v.clone());
            } else if let Some(rec_obj) = record.as_object_mut() {
                rec_obj.insert(k.clone(), v.clone());
            }
        }
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn create(
        &self,
        model: &str,
        data: serde_json::Value,
    ) -> AdapterResult<serde_json::Value> {
        let mut record = data;

        // Auto-generate ID if not present
        if record.get("id").is_none() || record.get("id") == Some(&serde_json::Value::Null) {
            if let Some(obj) = record.as_object_mut() {
                obj.insert(
                    "id".to_string(),
                    serde_json::Value::String(uuid::Uuid::new_v4().to_string()),
                );
            }
        }

        let mut store = self.store.write().await;
        store
            .entry(model.to_string())
            .or_default()
            .push(record.clone());

        Ok(record)
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        let store = self.store.read().await;
        match store.get(model) {
            Some(recs) => Ok(recs.iter().find(|r| matches_where(r, where_clauses)).cloned()),
            None => Ok(None),
        }
    }

    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        let store = self.store.read().await;
        let empty = Vec::new();
        let records = store.get(model).unwrap_or(&empty);

        let mut result: Vec<serde_json::Value> = records
            .iter()
            .filter(|r| matches_where(r, &query.where_clauses))
            .cloned()
            .collect();

        sort_records(&mut result, &query);

        if let Some(offset) = query.offset {
            if (offset as usize) < result.len() {
                result = result.split_off(offset as usize);
            } else {
                result.clear();
            }
        }

        if let Some(limit) = query.limit {
            result.truncate(limit as usize);
        }

        Ok(result)
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let store = self.store.read().await;
        let empty = Vec::new();
        let records = store.get(model).unwrap_or(&empty);
        let count = records
            .iter()
            .filter(|r| matches_where(r, where_clauses))
            .count();
        Ok(count as i64)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let mut store = self.store.write().await;
        match store.get_mut(model) {
            Some(recs) => {
                let found = recs.iter_mut().find(|r| matches_where(r, where_clauses));
                match found {
                    Some(record) => {
                        merge_update(record, &data);
                        Ok(Some(record.clone()))
                    }
                    None => Ok(None),
                }
            }
            None => Ok(None),
        }
    }

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64> {
        let mut store = self.store.write().await;
        let mut count = 0i64;

        if let Some(recs) = store.get_mut(model) {
            for record in recs.iter_mut() {
                if matches_where(record, where_clauses) {
                    merge_update(record, &data);
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    async fn increment(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        delta: f64,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let mut store = self.store.write().await;
        if let Some(recs) = store.get_mut(model) {
            if let Some(record) = recs.iter_mut().find(|r| matches_where(r, where_clauses)) {
                let current = get_path(record, field).as_f64().unwrap_or(0.0);
                set_path(record, field, serde_json::json!(current + delta));
                return Ok(Some(record.clone()));
            }
        }
        Ok(None)
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        if let Some(recs) = store.get_mut(model) {
            if let Some(pos) = recs.iter().position(|r| matches_where(r, where_clauses)) {
                recs.remove(pos);
            }
        }
        Ok(())
    }

    async fn delete_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<i64> {
        let mut store = self.store.write().await;
        if let Some(recs) = store.get_mut(model) {
            let before = recs.len();
            recs.retain(|r| !matches_where(r, where_clauses));
            Ok((before - recs.len()) as i64)
        } else {
            Ok(0)
        }
    }
}

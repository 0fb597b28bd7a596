// MongoAdapter — concrete implementation of the core Adapter trait using MongoDB.
//
// Maps models to collections, the logical `id` field to `_id`, and WHERE
// clauses to find filters. `update` and `increment` go through
// findOneAndUpdate so the filter check and the write are one atomic step.

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use vcorp_core::db::adapter::{
    db_error, Adapter, AdapterResult, FindManyQuery, WhereClause,
};
use vcorp_core::db::models;
use vcorp_core::error::VcorpError;
use vcorp_core::program::ProgramId;

use crate::query;

/// MongoDB database adapter.
#[derive(Debug, Clone)]
pub struct MongoAdapter {
    db: Database,
}

impl MongoAdapter {
    /// Create a new adapter from an existing database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new adapter by connecting to a MongoDB URI.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, VcorpError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| db_error(format!("MongoDB connection failed: {e}")))?;
        let db = client.database(db_name);
        Ok(Self { db })
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Create the indexes the platform relies on: unique user emails,
    /// unique webhook event ids, and per-program account/dependent lookups.
    pub async fn ensure_indexes(&self) -> Result<(), VcorpError> {
        let unique = mongodb::options::IndexOptions::builder().unique(true).build();

        let users: Collection<mongodb::bson::Document> = self.db.collection(models::USERS);
        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await
            .map_err(|e| db_error(format!("Index creation failed: {e}")))?;

        let events: Collection<mongodb::bson::Document> =
            self.db.collection(models::PROCESSED_PAYMENT_EVENTS);
        events
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "eventId": 1 })
                    .options(unique)
                    .build(),
            )
            .await
            .map_err(|e| db_error(format!("Index creation failed: {e}")))?;

        for program in ProgramId::ALL {
            let accounts: Collection<mongodb::bson::Document> =
                self.db.collection(program.account_collection());
            accounts
                .create_index(IndexModel::builder().keys(doc! { "userId": 1 }).build())
                .await
                .map_err(|e| db_error(format!("Index creation failed: {e}")))?;

            let dependents: Collection<mongodb::bson::Document> =
                self.db.collection(program.dependent_collection());
            dependents
                .create_index(IndexModel::builder().keys(doc! { "accountId": 1 }).build())
                .await
                .map_err(|e| db_error(format!("Index creation failed: {e}")))?;
        }

        Ok(())
    }

    fn collection(&self, model: &str) -> Collection<mongodb::bson::Document> {
        self.db.collection(model)
    }
}

#[async_trait]
impl Adapter for MongoAdapter {
    async fn create(
        &self,
        model: &str,
        data: serde_json::Value,
    ) -> AdapterResult<serde_json::Value> {
        let coll = self.collection(model);
        let mut record = data;

        if record.get("id").is_none() || record.get("id") == Some(&serde_json::Value::Null) {
            if let Some(obj) = record.as_object_mut() {
                obj.insert(
                    "id".to_string(),
                    serde_json::Value::String(
                        mongodb::bson::oid::ObjectId::new().to_hex(),
                    ),
                );
            }
        }

        let doc = query::build_insert_doc(&record);
        coll.insert_one(doc)
            .await
            .map_err(|e| db_error(format!("MongoDB insert failed: {e}")))?;

        Ok(record)
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        let coll = self.collection(model);
        let filter = query::build_filter(where_clauses);

        let result = coll
            .find_one(filter)
            .await
            .map_err(|e| db_error(format!("MongoDB find_one failed: {e}")))?;

        Ok(result.map(|doc| query::doc_to_json(&doc)))
    }

    async fn find_many(
        &self,
        model: &str,
        query_params: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        let coll = self.collection(model);
        let filter = query::build_filter(&query_params.where_clauses);

        let mut find_opts = FindOptions::default();
        if let Some(limit) = query_params.limit {
            find_opts.limit = Some(limit);
        }
        if let Some(offset) = query_params.offset {
            find_opts.skip = Some(offset as u64);
        }
        if let Some(sort) = query::build_sort(&query_params) {
            find_opts.sort = Some(sort);
        }

        let mut cursor = coll
            .find(filter)
            .with_options(find_opts)
            .await
            .map_err(|e| db_error(format!("MongoDB find failed: {e}")))?;

        let mut results = Vec::new();
        while let Some(doc) = cursor.next().await {
            let doc = doc.map_err(|e| db_error(format!("Cursor error: {e}")))?;
            results.push(query::doc_to_json(&doc));
        }

        Ok(results)
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let coll = self.collection(model);
        let filter = query::build_filter(where_clauses);

        let count = coll
            .count_documents(filter)
            .await
            .map_err(|e| db_error(format!("MongoDB count failed: {e}")))?;

        Ok(count as i64)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let coll = self.collection(model);
        let filter = query::build_filter(where_clauses);
        let update = query::build_update_doc(&data);

        let result = coll
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| db_error(format!("MongoDB update failed: {e}")))?;

        Ok(result.map(|doc| query::doc_to_json(&doc)))
    }

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64> {
        let coll = self.collection(model);
        let filter = query::build_filter(where_clauses);
        let update = query::build_update_doc(&data);

        let result = coll
            .update_many(filter, update)
            .await
            .map_err(|e| db_error(format!("MongoDB update_many failed: {e}")))?;

        Ok(result.modified_count as i64)
    }

    async fn increment(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        delta: f64,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let coll = self.collection(model);
        let filter = query::build_filter(where_clauses);
        let update = doc! { "$inc": { query::map_field(field): delta } };

        let result = coll
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| db_error(format!("MongoDB increment failed: {e}")))?;

        Ok(result.map(|doc| query::doc_to_json(&doc)))
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        let coll = self.collection(model);
        let filter = query::build_filter(where_clauses);

        coll.delete_one(filter)
            .await
            .map_err(|e| db_error(format!("MongoDB delete failed: {e}")))?;

        Ok(())
    }

    async fn delete_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<i64> {
        let coll = self.collection(model);
        let filter = query::build_filter(where_clauses);

        let result = coll
            .delete_many(filter)
            .await
            .map_err(|e| db_error(format!("MongoDB delete_many failed: {e}")))?;

        Ok(result.deleted_count as i64)
    }
}

use crate::error::{ApiError, Result};
use crate::models::WardrobeItem;
use futures::TryStreamExt;
use log::info;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection};

const WARDROBE_COLLECTION: &str = "wardrobe";

/// Candidate pool for the approximate nearest-neighbor stage; the index
/// narrows these down to `limit` results.
const NUM_CANDIDATES: i32 = 100;

/// Typed handle to the wardrobe collection and its Atlas vector index.
#[derive(Clone)]
pub struct WardrobeStore {
    collection: Collection<WardrobeItem>,
    vector_index: String,
}

impl WardrobeStore {
    pub async fn connect(mongo_url: &str, database: &str, vector_index: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongo_url).await?;

        // Cheap liveness check so a bad connection string fails at startup
        // rather than on the first request.
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        info!("Successfully connected to MongoDB");

        let collection = client.database(database).collection(WARDROBE_COLLECTION);
        Ok(Self {
            collection,
            vector_index: vector_index.to_string(),
        })
    }

    pub async fn insert(&self, item: &WardrobeItem) -> Result<()> {
        self.collection.insert_one(item).await?;
        Ok(())
    }

    /// Deletes one item, scoped to its owner. Returns whether a document
    /// was actually removed.
    pub async fn delete(&self, item_id: &str, user_id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": item_id, "user_id": user_id })
            .await?;
        Ok(result.deleted_count == 1)
    }

    pub async fn find_by_user(&self, user_id: &str) -> Result<Vec<WardrobeItem>> {
        let cursor = self.collection.find(doc! { "user_id": user_id }).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Ranked nearest-neighbor lookup over `caption_embedding`, restricted to
    /// one user's items by an index-level filter. Candidates belonging to
    /// other users are never considered, regardless of `k`.
    pub async fn vector_search(
        &self,
        query_vector: &[f32],
        user_id: &str,
        k: usize,
    ) -> Result<Vec<WardrobeItem>> {
        let query_vector = mongodb::bson::to_bson(query_vector)
            .map_err(|e| ApiError::SearchFailure(e.to_string()))?;
        let pipeline = vector_search_pipeline(query_vector, user_id, k, &self.vector_index);

        let cursor = self
            .collection
            .aggregate(pipeline)
            .with_type::<WardrobeItem>()
            .await
            .map_err(|e| ApiError::SearchFailure(e.to_string()))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| ApiError::SearchFailure(e.to_string()))
    }
}

fn vector_search_pipeline(
    query_vector: Bson,
    user_id: &str,
    k: usize,
    index: &str,
) -> Vec<Document> {
    vec![doc! {
        "$vectorSearch": {
            "numCandidates": NUM_CANDIDATES,
            "queryVector": query_vector,
            "path": "caption_embedding",
            "limit": k as i64,
            "index": index,
            "filter": {
                "user_id": user_id,
            },
        }
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_filters_by_user_at_index_level() {
        let vector = mongodb::bson::to_bson(&[0.1_f32, 0.2, 0.3]).unwrap();
        let pipeline = vector_search_pipeline(vector, "user-a", 2, "vector_index");

        assert_eq!(pipeline.len(), 1);
        let stage = pipeline[0].get_document("$vectorSearch").unwrap();
        let filter = stage.get_document("filter").unwrap();
        assert_eq!(filter.get_str("user_id").unwrap(), "user-a");
        assert_eq!(stage.get_i64("limit").unwrap(), 2);
        assert_eq!(stage.get_str("path").unwrap(), "caption_embedding");
        assert_eq!(stage.get_str("index").unwrap(), "vector_index");
    }

    #[test]
    fn pipeline_limit_follows_k() {
        let vector = mongodb::bson::to_bson(&[0.5_f32]).unwrap();
        let pipeline = vector_search_pipeline(vector, "user-b", 7, "vector_index");
        let stage = pipeline[0].get_document("$vectorSearch").unwrap();
        assert_eq!(stage.get_i64("limit").unwrap(), 7);
    }
}

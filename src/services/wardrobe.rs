use crate::error::Result;
use crate::ml::TextEmbedder;
use crate::models::{
    CategoryEntry, CategoryResults, FlatRecommendation, RecommendationItem, RecommendationPayload,
    SearchResult, SubcategoryEntry, SuggestionEntry, WardrobeItem,
};
use crate::services::{StorageClient, WardrobeStore};
use futures::future;
use log::warn;
use tracing::debug;
use uuid::Uuid;

/// Orchestrates the wardrobe-matching pipeline: payload extraction, per-item
/// embed + filtered vector search, signed-URL resolution, bucketing and
/// flattening. Holds shared read-only handles to the embedder, the document
/// store and object storage; safe to clone across requests.
#[derive(Clone)]
pub struct WardrobeService {
    embedder: TextEmbedder,
    store: WardrobeStore,
    storage: StorageClient,
    search_top_k: usize,
}

impl WardrobeService {
    pub fn new(
        embedder: TextEmbedder,
        store: WardrobeStore,
        storage: StorageClient,
        search_top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            storage,
            search_top_k,
        }
    }

    pub async fn vectorize(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).await
    }

    /// Nearest-neighbor search over one user's wardrobe.
    ///
    /// Matches come back with a short-lived signed image URL and with the
    /// stored embedding redacted. URL resolution is one batch call per
    /// search; a batch failure aborts the whole call instead of returning
    /// results with misaligned URLs.
    pub async fn search(
        &self,
        query_vector: &[f32],
        user_id: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        let mut matches = self.store.vector_search(query_vector, user_id, k).await?;
        if matches.is_empty() {
            return Ok(matches);
        }

        let urls: Vec<String> = matches.iter().map(|m| m.image_url.clone()).collect();
        let signed = self.storage.resolve_signed_urls(&urls).await?;

        for (item, signed_url) in matches.iter_mut().zip(signed) {
            item.image_url = signed_url;
            item.caption_embedding = None;
        }

        Ok(matches)
    }

    /// Matches every extracted recommendation item against the user's saved
    /// wardrobe. Per-item lookups run concurrently; `join_all` hands results
    /// back in input order, so the bucket layout is deterministic regardless
    /// of completion order. An item whose embed or search step fails is
    /// logged and contributes nothing; the request itself never aborts.
    pub async fn match_wardrobe(
        &self,
        payload: &RecommendationPayload,
        user_id: &str,
    ) -> CategoryResults {
        let items = extract_recommendation_items(payload);
        debug!("Extracted {} recommendation items", items.len());

        let outcomes = future::join_all(
            items
                .iter()
                .map(|item| self.embed_and_search(item, user_id)),
        )
        .await;

        let item_results = items
            .into_iter()
            .zip(outcomes)
            .map(|(item, outcome)| {
                let results = match outcome {
                    Ok(results) => Some(results),
                    Err(e) => {
                        warn!(
                            "Skipping '{}' under {}/{}: {}",
                            item.query_text, item.category, item.subcategory, e
                        );
                        None
                    }
                };
                (item, results)
            })
            .collect();

        collect_category_results(item_results)
    }

    async fn embed_and_search(
        &self,
        item: &RecommendationItem,
        user_id: &str,
    ) -> Result<Vec<SearchResult>> {
        let embedding = self.embedder.embed(&item.query_text).await?;
        self.search(&embedding, user_id, self.search_top_k).await
    }

    pub async fn add_item(
        &self,
        user_id: &str,
        image_url: &str,
        caption: &str,
        category: &str,
    ) -> Result<WardrobeItem> {
        let caption_embedding = self.embedder.embed(caption).await?;
        let item = WardrobeItem {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            image_url: image_url.to_string(),
            caption: caption.to_string(),
            caption_embedding: Some(caption_embedding),
            category: category.to_string(),
        };
        self.store.insert(&item).await?;
        Ok(item)
    }

    pub async fn get_user_wardrobe(&self, user_id: &str) -> Result<Vec<WardrobeItem>> {
        let mut items = self.store.find_by_user(user_id).await?;
        if items.is_empty() {
            return Ok(items);
        }

        let urls: Vec<String> = items.iter().map(|i| i.image_url.clone()).collect();
        let signed = self.storage.resolve_signed_urls(&urls).await?;
        for (item, signed_url) in items.iter_mut().zip(signed) {
            item.image_url = signed_url;
            item.caption_embedding = None;
        }

        Ok(items)
    }

    pub async fn delete_item(&self, item_id: &str, user_id: &str) -> Result<bool> {
        self.store.delete(item_id, user_id).await
    }
}

/// Walks the nested payload in encounter order and produces one
/// `(category, subcategory, query_text)` tuple per well-formed descriptor.
/// Absent categories and malformed entries are skipped silently; the output
/// order is exactly the traversal order, with no deduplication.
pub fn extract_recommendation_items(payload: &RecommendationPayload) -> Vec<RecommendationItem> {
    let mut items = Vec::new();
    for (category, entry) in &payload.0 {
        let CategoryEntry::Subcategories(subcategories) = entry else {
            continue;
        };
        for (subcategory, sub_entry) in subcategories {
            let SubcategoryEntry::Items(suggestions) = sub_entry else {
                continue;
            };
            for suggestion in suggestions {
                let SuggestionEntry::Descriptor(descriptor) = suggestion else {
                    continue;
                };
                items.push(RecommendationItem {
                    category: category.clone(),
                    subcategory: subcategory.clone(),
                    query_text: descriptor.query_text(),
                });
            }
        }
    }
    items
}

/// Assembles per-item search outcomes into the category/subcategory bucket.
/// Each successful item appends its own result list (the bucket value is a
/// list of per-item lists, in extraction order); failed items contribute
/// nothing, and a `(category, subcategory)` pair with zero successes is
/// omitted entirely.
pub fn collect_category_results(
    item_results: Vec<(RecommendationItem, Option<Vec<SearchResult>>)>,
) -> CategoryResults {
    let mut buckets = CategoryResults::new();
    for (item, results) in item_results {
        let Some(results) = results else {
            continue;
        };
        buckets
            .entry(item.category)
            .or_insert_with(Default::default)
            .entry(item.subcategory)
            .or_insert_with(Vec::new)
            .push(results);
    }
    buckets
}

/// Converts the nested bucket into a single flat list, stamping every result
/// with the top-level category it was found under. Pure structural
/// transform: no filtering, no deduplication, no re-ranking.
pub fn flatten_recommendations(category_results: &CategoryResults) -> Vec<FlatRecommendation> {
    let mut flat = Vec::new();
    for (category, subcategories) in category_results {
        for item_lists in subcategories.values() {
            for items in item_lists {
                for item in items {
                    flat.push(FlatRecommendation::from_result(item, category));
                }
            }
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> RecommendationPayload {
        serde_json::from_str(json).unwrap()
    }

    fn make_result(id: &str, category: &str) -> SearchResult {
        WardrobeItem {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            image_url: format!("https://signed.example.com/{}", id),
            caption: format!("caption for {}", id),
            caption_embedding: None,
            category: category.to_string(),
        }
    }

    fn item(category: &str, subcategory: &str, query_text: &str) -> RecommendationItem {
        RecommendationItem {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            query_text: query_text.to_string(),
        }
    }

    #[test]
    fn extracts_single_descriptor() {
        let p = payload(r#"{"tops": {"Suggestions": [{"Clothing Type": "shirt", "Color": "blue"}]}}"#);
        let items = extract_recommendation_items(&p);
        assert_eq!(items, vec![item("tops", "Suggestions", "blue shirt")]);
    }

    #[test]
    fn extraction_follows_traversal_order() {
        let p = payload(
            r#"{
                "bottoms": {"Suggestions": [
                    {"Clothing Type": "jeans", "Color": "black"},
                    {"Clothing Type": "chinos", "Color": "beige"}
                ]},
                "tops": {
                    "Casual": [{"Clothing Type": "t-shirt", "Color": "white"}],
                    "Formal": [{"Clothing Type": "shirt", "Color": "blue"}]
                }
            }"#,
        );
        let items = extract_recommendation_items(&p);
        assert_eq!(
            items,
            vec![
                item("bottoms", "Suggestions", "black jeans"),
                item("bottoms", "Suggestions", "beige chinos"),
                item("tops", "Casual", "white t-shirt"),
                item("tops", "Formal", "blue shirt"),
            ]
        );
    }

    #[test]
    fn extraction_skips_malformed_entries() {
        let p = payload(
            r#"{
                "tops": {"Suggestions": [
                    {"Clothing Type": "shirt", "Color": "blue"},
                    {"Color": "red"},
                    "just a string",
                    42,
                    null
                ]},
                "shoes": null,
                "accessories": {},
                "outerwear": {"Suggestions": "not a list"}
            }"#,
        );
        let items = extract_recommendation_items(&p);
        assert_eq!(items, vec![item("tops", "Suggestions", "blue shirt")]);
    }

    #[test]
    fn extraction_of_empty_payload_is_empty() {
        let p = payload(r#"{"tops": null, "bottoms": {}, "shoes": ""}"#);
        assert!(extract_recommendation_items(&p).is_empty());
    }

    #[test]
    fn collect_appends_per_item_lists_in_order() {
        let results = collect_category_results(vec![
            (
                item("tops", "Suggestions", "blue shirt"),
                Some(vec![make_result("a", "tops"), make_result("b", "tops")]),
            ),
            (
                item("tops", "Suggestions", "red shirt"),
                Some(vec![make_result("c", "tops")]),
            ),
        ]);

        let lists = &results["tops"]["Suggestions"];
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].len(), 2);
        assert_eq!(lists[1].len(), 1);
        assert_eq!(lists[0][0].id, "a");
        assert_eq!(lists[1][0].id, "c");
    }

    #[test]
    fn collect_drops_failed_items_but_keeps_the_rest() {
        let results = collect_category_results(vec![
            (
                item("tops", "Suggestions", "blue shirt"),
                Some(vec![make_result("a", "tops")]),
            ),
            (item("tops", "Suggestions", "red shirt"), None),
            (
                item("bottoms", "Suggestions", "black jeans"),
                Some(vec![make_result("b", "bottoms")]),
            ),
        ]);

        assert_eq!(results["tops"]["Suggestions"].len(), 1);
        assert_eq!(results["bottoms"]["Suggestions"].len(), 1);
    }

    #[test]
    fn collect_omits_pairs_with_zero_successes() {
        let results = collect_category_results(vec![
            (item("tops", "Suggestions", "blue shirt"), None),
            (
                item("bottoms", "Suggestions", "black jeans"),
                Some(vec![make_result("b", "bottoms")]),
            ),
        ]);

        assert!(!results.contains_key("tops"));
        assert!(results.contains_key("bottoms"));
    }

    #[test]
    fn collect_of_no_items_is_empty() {
        assert!(collect_category_results(Vec::new()).is_empty());
    }

    #[test]
    fn flatten_stamps_payload_category_over_stored_category() {
        let results = collect_category_results(vec![(
            item("tops", "Suggestions", "blue shirt"),
            Some(vec![make_result("a", "stored-category")]),
        )]);

        let flat = flatten_recommendations(&results);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].id, "a");
        assert_eq!(flat[0].category, "tops");
        assert!(flat[0].caption_embedding.is_none());
    }

    #[test]
    fn flatten_preserves_full_traversal_order() {
        let results = collect_category_results(vec![
            (
                item("tops", "Casual", "white t-shirt"),
                Some(vec![make_result("a", "tops"), make_result("b", "tops")]),
            ),
            (
                item("tops", "Formal", "blue shirt"),
                Some(vec![make_result("c", "tops")]),
            ),
            (
                item("bottoms", "Suggestions", "black jeans"),
                Some(vec![make_result("d", "bottoms")]),
            ),
        ]);

        let flat = flatten_recommendations(&results);
        let ids: Vec<_> = flat.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert!(flat[..3].iter().all(|f| f.category == "tops"));
        assert_eq!(flat[3].category, "bottoms");
    }

    #[test]
    fn flatten_of_empty_bucket_is_empty() {
        assert!(flatten_recommendations(&CategoryResults::new()).is_empty());
    }

    #[test]
    fn flatten_skips_empty_result_lists() {
        let results = collect_category_results(vec![(
            item("tops", "Suggestions", "blue shirt"),
            Some(Vec::new()),
        )]);

        // The pair is present (the lookup succeeded with zero matches) but
        // contributes nothing to the flat output.
        assert_eq!(results["tops"]["Suggestions"].len(), 1);
        assert!(flatten_recommendations(&results).is_empty());
    }
}

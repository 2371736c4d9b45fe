use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A user-owned clothing record, keyed by its caption embedding for retrieval.
///
/// Created once by the add path and immutable afterwards except for deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WardrobeItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    pub caption: String,
    pub caption_embedding: Option<Vec<f32>>,
    pub category: String,
}

/// A wardrobe item as returned from similarity search: `image_url` replaced
/// by a short-lived signed URL, `caption_embedding` redacted to `null`.
pub type SearchResult = WardrobeItem;

/// A search result stamped with the top-level payload category it was
/// discovered under (not the item's own stored category).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlatRecommendation {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    pub caption: String,
    pub caption_embedding: Option<Vec<f32>>,
    pub category: String,
}

impl FlatRecommendation {
    pub fn from_result(result: &SearchResult, category: &str) -> Self {
        Self {
            id: result.id.clone(),
            user_id: result.user_id.clone(),
            image_url: result.image_url.clone(),
            caption: result.caption.clone(),
            caption_embedding: result.caption_embedding.clone(),
            category: category.to_string(),
        }
    }
}

/// The nested recommendation payload as produced by the upstream outfit
/// generator: category -> subcategory -> list of clothing descriptors.
///
/// The source is free-form model output, so every level tolerates malformed
/// entries; anything that does not decode as the expected shape falls into
/// the `Other` arm of its enum and is skipped during extraction.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RecommendationPayload(pub IndexMap<String, CategoryEntry>);

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CategoryEntry {
    Subcategories(IndexMap<String, SubcategoryEntry>),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubcategoryEntry {
    Items(Vec<SuggestionEntry>),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SuggestionEntry {
    Descriptor(ClothingDescriptor),
    Other(serde_json::Value),
}

/// One suggested piece of clothing. Only the clothing type is required;
/// a missing color yields a query text with a leading space.
#[derive(Debug, Clone, Deserialize)]
pub struct ClothingDescriptor {
    #[serde(rename = "Clothing Type", alias = "clothing_type")]
    pub clothing_type: String,
    #[serde(rename = "Color", alias = "color", default)]
    pub color: String,
}

impl ClothingDescriptor {
    pub fn query_text(&self) -> String {
        format!("{} {}", self.color, self.clothing_type)
    }
}

/// One extracted `(category, subcategory, query_text)` tuple, in payload
/// encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationItem {
    pub category: String,
    pub subcategory: String,
    pub query_text: String,
}

/// Per-request bucket of search results: category -> subcategory -> one
/// result list per originating descriptor, in extraction order.
pub type CategoryResults = IndexMap<String, IndexMap<String, Vec<Vec<SearchResult>>>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_preserves_category_order() {
        let payload: RecommendationPayload = serde_json::from_str(
            r#"{"tops": {"Suggestions": []}, "bottoms": {"Suggestions": []}, "shoes": null}"#,
        )
        .unwrap();

        let keys: Vec<_> = payload.0.keys().cloned().collect();
        assert_eq!(keys, vec!["tops", "bottoms", "shoes"]);
    }

    #[test]
    fn malformed_category_decodes_as_other() {
        let payload: RecommendationPayload = serde_json::from_str(
            r#"{"tops": "not a mapping", "bottoms": {"Suggestions": [{"Clothing Type": "jeans"}]}}"#,
        )
        .unwrap();

        assert!(matches!(payload.0["tops"], CategoryEntry::Other(_)));
        assert!(matches!(
            payload.0["bottoms"],
            CategoryEntry::Subcategories(_)
        ));
    }

    #[test]
    fn descriptor_without_clothing_type_decodes_as_other() {
        let entry: SuggestionEntry =
            serde_json::from_str(r#"{"Color": "blue", "Fabric": "denim"}"#).unwrap();
        assert!(matches!(entry, SuggestionEntry::Other(_)));

        let entry: SuggestionEntry =
            serde_json::from_str(r#"{"Clothing Type": "shirt", "Color": "blue"}"#).unwrap();
        match entry {
            SuggestionEntry::Descriptor(d) => assert_eq!(d.query_text(), "blue shirt"),
            SuggestionEntry::Other(_) => panic!("expected a descriptor"),
        }
    }

    #[test]
    fn descriptor_color_defaults_to_empty() {
        let d: ClothingDescriptor = serde_json::from_str(r#"{"Clothing Type": "coat"}"#).unwrap();
        assert_eq!(d.query_text(), " coat");
    }

    #[test]
    fn wardrobe_item_serializes_null_embedding() {
        let item = WardrobeItem {
            id: "abc".to_string(),
            user_id: "u1".to_string(),
            image_url: "https://example.com/img.jpg".to_string(),
            caption: "a red shirt".to_string(),
            caption_embedding: None,
            category: "tops".to_string(),
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["_id"], "abc");
        assert!(json["caption_embedding"].is_null());
    }
}

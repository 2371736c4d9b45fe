use serde::Deserialize;

pub use wardrobe::{
    CategoryEntry, CategoryResults, ClothingDescriptor, FlatRecommendation, RecommendationItem,
    RecommendationPayload, SearchResult, SubcategoryEntry, SuggestionEntry, WardrobeItem,
};

mod wardrobe;

/// Request body for text vectorization.
#[derive(Debug, Clone, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Request body for wardrobe matching.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchWardrobeRequest {
    pub user_id: String,
    pub recommendations: RecommendationPayload,
}

/// Request body for image captioning.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageUrlRequest {
    pub image_url: String,
}

/// Request body for adding a wardrobe item.
#[derive(Debug, Clone, Deserialize)]
pub struct AddWardrobeItemRequest {
    pub user_id: String,
    pub image_url: String,
    pub caption: String,
    pub category: String,
}

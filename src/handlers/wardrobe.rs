use crate::{
    error::ApiError,
    models::{AddWardrobeItemRequest, MatchWardrobeRequest, TextRequest},
    services::wardrobe::flatten_recommendations,
    services::WardrobeService,
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};
use log::warn;

pub fn wardrobe_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/vectorize", web::post().to(vectorize_text))
        .route("/match", web::post().to(match_wardrobe))
        .route("/add", web::post().to(add_wardrobe_item))
        .route("/{user_id}", web::get().to(get_user_wardrobe))
        .route("/{user_id}/{item_id}", web::delete().to(delete_wardrobe_item));
}

/// Vectorize a piece of text.
///
/// On embedding failure the response is `{"vector": null}` rather than an
/// HTTP error; callers tolerate a null.
pub async fn vectorize_text(
    request: Json<TextRequest>,
    service: web::Data<WardrobeService>,
) -> HttpResponse {
    match service.vectorize(&request.text).await {
        Ok(vector) => HttpResponse::Ok().json(serde_json::json!({ "vector": vector })),
        Err(e) => {
            warn!("Vectorization failed: {}", e);
            HttpResponse::Ok().json(serde_json::json!({ "vector": null }))
        }
    }
}

/// Match the user's wardrobe to the recommendations.
///
/// The flattened result list is wrapped in a single-element outer array;
/// existing clients depend on that exact shape.
pub async fn match_wardrobe(
    request: Json<MatchWardrobeRequest>,
    service: web::Data<WardrobeService>,
) -> HttpResponse {
    let category_results = service
        .match_wardrobe(&request.recommendations, &request.user_id)
        .await;
    let flat = flatten_recommendations(&category_results);

    HttpResponse::Ok().json(serde_json::json!({ "recommendations": [flat] }))
}

pub async fn add_wardrobe_item(
    request: Json<AddWardrobeItemRequest>,
    service: web::Data<WardrobeService>,
) -> Result<HttpResponse, ApiError> {
    if request.user_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("user_id cannot be empty".to_string()));
    }

    let item = service
        .add_item(
            &request.user_id,
            &request.image_url,
            &request.caption,
            &request.category,
        )
        .await?;

    Ok(HttpResponse::Ok().json(item))
}

pub async fn get_user_wardrobe(
    user_id: web::Path<String>,
    service: web::Data<WardrobeService>,
) -> Result<HttpResponse, ApiError> {
    let items = service.get_user_wardrobe(&user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "wardrobe": items })))
}

pub async fn delete_wardrobe_item(
    path: web::Path<(String, String)>,
    service: web::Data<WardrobeService>,
) -> Result<HttpResponse, ApiError> {
    let (user_id, item_id) = path.into_inner();
    let deleted = service.delete_item(&item_id, &user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": deleted })))
}

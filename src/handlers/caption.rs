use crate::ml::Captioner;
use crate::models::ImageUrlRequest;
use actix_web::{
    web::{self, Json},
    HttpResponse,
};
use log::error;

pub fn caption_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::post().to(caption_image)));
}

/// Generate an image caption from a clothing image.
///
/// Captioning failures are reported in-band as `{"error": ...}` with a 200
/// status; callers treat an absent caption as a soft failure.
pub async fn caption_image(
    request: Json<ImageUrlRequest>,
    captioner: web::Data<Captioner>,
) -> HttpResponse {
    match captioner.caption(&request.image_url).await {
        Ok(caption) => HttpResponse::Ok().json(serde_json::json!({ "caption": caption })),
        Err(e) => {
            error!("Captioning failed for {}: {}", request.image_url, e);
            HttpResponse::Ok().json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}

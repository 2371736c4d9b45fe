use actix_web::{web, Scope};

use crate::handlers::{caption_config, wardrobe_config};

/// Configure all routes for the API
pub fn api_routes() -> Scope {
    web::scope("/api")
        .service(web::scope("/wardrobe").configure(wardrobe_config))
        .service(web::scope("/caption").configure(caption_config))
}

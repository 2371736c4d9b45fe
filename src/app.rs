use crate::{
    config::Config,
    error::Result,
    handlers::health_check,
    ml::{Captioner, TextEmbedder},
    routes::api_routes,
    services::{StorageClient, WardrobeService, WardrobeStore},
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::info;
use std::net::TcpListener;

pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        // Always bind to 0.0.0.0 for Docker/Render compatibility
        let bind_address = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&bind_address)?;
        info!("Starting server at http://{}:{}", self.host, self.port);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    /// This is useful for testing where we want to use a random port
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        // Initialize external collaborators once; every request shares these
        // read-only handles.
        let store = WardrobeStore::connect(
            &self.config.mongo_url,
            &self.config.mongo_database,
            &self.config.vector_index,
        )
        .await
        .context("Failed to connect to MongoDB")?;

        let storage = StorageClient::from_env(self.config.signed_url_ttl_secs).await;

        let embedder =
            TextEmbedder::new(&self.config).context("Failed to initialize text embedder")?;
        let captioner = Captioner::new(&self.config).context("Failed to initialize captioner")?;

        let wardrobe_service = web::Data::new(WardrobeService::new(
            embedder,
            store,
            storage,
            self.config.search_top_k,
        ));
        let captioner = web::Data::new(captioner);

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .app_data(wardrobe_service.clone())
                .app_data(captioner.clone())
                .service(health_check)
                .service(api_routes())
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}

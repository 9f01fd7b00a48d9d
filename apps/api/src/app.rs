use crate::{
    config::{Config, VectorBackend},
    error::{ApiError, Result},
    handlers::page_config,
    ml::{Embedder, JinaEmbedder},
    routes::api_routes,
    services::{
        tagged_document::load_corpus, InMemoryIndex, PineconeIndex, RecommendationService,
        VectorIndex,
    },
    store::BookStore,
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;
use std::{net::TcpListener, sync::Arc};

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
        let bind_address = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&bind_address)?;
        info!("Starting server at http://{}", bind_address);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    ///
    /// Metadata and the vector index are fully loaded before the listener
    /// accepts traffic; a load failure aborts startup.
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let recommendation_service = web::Data::new(build_service(&self.config).await?);

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .app_data(recommendation_service.clone())
                .configure(page_config)
                .service(api_routes())
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}

/// Load the metadata store, connect the embedder and prepare the vector index.
pub async fn build_service(config: &Config) -> Result<RecommendationService> {
    let limits = config.retrieval_limits()?;

    let store = Arc::new(BookStore::load(
        &config.books_csv_path,
        &config.cover_fallback,
    )?);
    if store.is_empty() {
        return Err(ApiError::LoadError(format!(
            "{} contains no books",
            config.books_csv_path.display()
        )));
    }

    let embedder: Arc<dyn Embedder> = Arc::new(JinaEmbedder::new(config)?);

    let index: Arc<dyn VectorIndex> = match config.vector_backend {
        VectorBackend::Memory => {
            let documents = load_corpus(&config.tagged_descriptions_path)?;
            Arc::new(InMemoryIndex::build(embedder.as_ref(), &documents).await?)
        }
        VectorBackend::Pinecone => {
            let (Some(api_key), Some(host)) = (&config.pinecone_api_key, &config.pinecone_host)
            else {
                return Err(ApiError::ConfigError(
                    "Pinecone backend requires APP_PINECONE_API_KEY and APP_PINECONE_HOST"
                        .to_string(),
                ));
            };
            let mut pinecone = PineconeIndex::new(api_key, host)?;
            if let Some(namespace) = &config.pinecone_namespace {
                pinecone = pinecone.with_namespace(namespace.clone());
            }
            info!("Using Pinecone index at {}", host);
            Arc::new(pinecone)
        }
    };

    info!(
        "Recommendation service ready: {} books, initial_top_k={}, final_top_k={}",
        store.len(),
        limits.initial_top_k(),
        limits.final_top_k()
    );

    Ok(RecommendationService::new(store, embedder, index, limits))
}

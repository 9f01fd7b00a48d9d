use crate::{
    error::ApiError,
    models::{CategoryFilter, RecommendationRequest, RecommendationResponse, Tone},
    services::RecommendationService,
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};
use tracing::info;

pub fn recommendations_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/recommendations").route(web::post().to(get_recommendations)));
}

/// Get a gallery of book recommendations for a free-text description.
///
/// `category` and `tone` default to `"All"`. An unknown tone is rejected with
/// 400 rather than ignored.
pub async fn get_recommendations(
    request: Json<RecommendationRequest>,
    recommendation_service: web::Data<RecommendationService>,
) -> Result<HttpResponse, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Query cannot be empty".to_string()));
    }

    let tone =
        Tone::parse_filter(&request.tone).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    let category = CategoryFilter::parse(&request.category);

    info!(
        "Recommendation request: query='{}', category='{}', tone='{}'",
        request.query,
        category.label(),
        tone.map(|t| t.label()).unwrap_or("All")
    );

    let recommendations = recommendation_service
        .recommend(&request.query, &category, tone)
        .await?;

    Ok(HttpResponse::Ok().json(RecommendationResponse {
        recommendations,
        category: category.label().to_string(),
        tone: tone.map(|t| t.label()).unwrap_or("All").to_string(),
    }))
}

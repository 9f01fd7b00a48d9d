use crate::{
    models::{FiltersResponse, Tone},
    services::RecommendationService,
};
use actix_web::{get, web, HttpResponse};

/// Dropdown choices: `"All"` plus the sorted categories, and `"All"` plus the tones.
#[get("/filters")]
pub async fn list_filters(
    recommendation_service: web::Data<RecommendationService>,
) -> HttpResponse {
    HttpResponse::Ok().json(FiltersResponse {
        categories: recommendation_service.store().category_choices(),
        tones: Tone::choices(),
    })
}

use actix_web::{get, http::header::ContentType, web, HttpResponse};

const INDEX_HTML: &str = include_str!("../../static/index.html");
const COVER_PLACEHOLDER_SVG: &str = include_str!("../../static/cover-not-found.svg");

/// Page routes: the gallery and the placeholder cover it links to for books
/// without a thumbnail.
pub fn page_config(cfg: &mut web::ServiceConfig) {
    cfg.service(index_page).service(cover_placeholder);
}

/// Single-page gallery UI backed by `/api/filters` and `/api/recommendations`.
#[get("/")]
pub async fn index_page() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

#[get("/assets/cover-not-found.svg")]
pub async fn cover_placeholder() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("image/svg+xml")
        .body(COVER_PLACEHOLDER_SVG)
}

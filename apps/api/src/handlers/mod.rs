pub mod filters;
pub mod health;
pub mod page;
pub mod recommendations;

pub use filters::list_filters;
pub use health::health_check;
pub use page::{cover_placeholder, index_page, page_config};
pub use recommendations::recommendations_config;

pub mod config;
pub mod error;
pub mod models;
pub mod params;
pub mod parse;
pub mod present;
pub mod prompt;

pub use config::VoyageConfig;
pub use error::{ExportError, MalformedResponse, ParameterError};
pub use models::*;
pub use params::normalize_text;
pub use parse::parse_trip_plan;
pub use present::{
    fetch_image_urls, map_view, render_itinerary_document, ItineraryDocument, EXPORT_FILE_NAME,
};
pub use prompt::build_plan_prompt;

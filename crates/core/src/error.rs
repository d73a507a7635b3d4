use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("destination must not be empty")]
    EmptyDestination,
    #[error("days must be between {min} and {max}, got {got}")]
    DaysOutOfRange { got: u32, min: u8, max: u8 },
    #[error("unknown budget tier: {0}")]
    UnknownBudget(String),
    #[error("unknown travel style: {0}")]
    UnknownStyle(String),
}

/// The model replied, but the reply could not be coerced into a trip plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedResponse {
    #[error("model reply is empty")]
    Empty,
    #[error("model reply contains no JSON object")]
    NoObject,
    #[error("model reply is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("model reply has no itinerary")]
    MissingItinerary,
    #[error("model reply has an unexpected shape: {0}")]
    InvalidShape(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("pdf rendering failed: {0}")]
    Pdf(String),
}

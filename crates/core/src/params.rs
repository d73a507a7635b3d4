use crate::error::ParameterError;
use crate::models::{Budget, TravelStyle, TripParameters};

pub const MIN_DAYS: u8 = 1;
pub const MAX_DAYS: u8 = 14;

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

impl TripParameters {
    pub fn new(
        destination: &str,
        days: u32,
        budget: Budget,
        styles: Vec<TravelStyle>,
    ) -> Result<Self, ParameterError> {
        let destination = normalize_text(destination);
        if destination.is_empty() {
            return Err(ParameterError::EmptyDestination);
        }

        if !(u32::from(MIN_DAYS)..=u32::from(MAX_DAYS)).contains(&days) {
            return Err(ParameterError::DaysOutOfRange {
                got: days,
                min: MIN_DAYS,
                max: MAX_DAYS,
            });
        }

        let mut unique = Vec::new();
        for style in styles {
            if !unique.contains(&style) {
                unique.push(style);
            }
        }

        Ok(Self {
            destination,
            days: days as u8,
            budget,
            styles: unique,
        })
    }

    /// Same as [`TripParameters::new`] but for raw form input, e.g. CLI flags.
    pub fn from_raw(
        destination: &str,
        days: u32,
        budget: &str,
        styles: &[String],
    ) -> Result<Self, ParameterError> {
        let budget =
            Budget::parse(budget).ok_or_else(|| ParameterError::UnknownBudget(budget.to_string()))?;
        let styles = styles
            .iter()
            .map(|raw| {
                TravelStyle::parse(raw).ok_or_else(|| ParameterError::UnknownStyle(raw.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(destination, days, budget, styles)
    }
}

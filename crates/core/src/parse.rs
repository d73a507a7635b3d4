use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::MalformedResponse;
use crate::models::TripPlan;

#[derive(Debug, Deserialize)]
struct RawPlan {
    itinerary: IndexMap<String, Value>,
    #[serde(default)]
    hotels: Value,
    #[serde(default)]
    food: Value,
    #[serde(default)]
    tips: Value,
}

/// Extracts a [`TripPlan`] from a free-text model reply.
///
/// One layer of code fences is stripped, then everything from the first `{`
/// to the last `}` is parsed as JSON. Braces appearing in prose around the
/// object break this slicing; the reply is rejected rather than repaired.
/// Only the itinerary is checked for shape; list entries that are not plain
/// strings are kept as their JSON text.
pub fn parse_trip_plan(raw: &str) -> Result<TripPlan, MalformedResponse> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(MalformedResponse::Empty);
    }

    let candidate = slice_outer_object(&text).ok_or(MalformedResponse::NoObject)?;

    let document: Value = serde_json::from_str(candidate)
        .map_err(|error| MalformedResponse::InvalidJson(error.to_string()))?;

    match document.get("itinerary") {
        None => return Err(MalformedResponse::MissingItinerary),
        Some(Value::Object(_)) => {}
        Some(other) => {
            return Err(MalformedResponse::InvalidShape(format!(
                "itinerary must be an object, got {}",
                json_kind(other)
            )))
        }
    }

    // Decoded from the text again so the itinerary keeps the model's day order.
    let plan: RawPlan = serde_json::from_str(candidate)
        .map_err(|error| MalformedResponse::InvalidShape(error.to_string()))?;
    if plan.itinerary.is_empty() {
        return Err(MalformedResponse::InvalidShape(
            "itinerary has no days".to_string(),
        ));
    }

    Ok(TripPlan {
        itinerary: plan
            .itinerary
            .into_iter()
            .map(|(day, activities)| (day, coerce_entries(activities)))
            .collect(),
        hotels: coerce_list(plan.hotels),
        food: coerce_list(plan.food),
        tips: coerce_list(plan.tips),
    })
}

/// Optional lists: anything other than an array counts as empty.
fn coerce_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(entry_text).collect(),
        _ => Vec::new(),
    }
}

/// Day entries: an array is the usual shape, a lone string or object is a
/// single activity.
fn coerce_entries(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(entry_text).collect(),
        other => entry_text(other).into_iter().collect(),
    }
}

fn entry_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("```") {
        trimmed
            .replace("```json", "")
            .replace("```", "")
            .trim()
            .to_string()
    } else {
        trimmed.to_string()
    }
}

fn slice_outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

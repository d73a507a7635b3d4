use crate::models::TripParameters;

const PLAN_SHAPE: &str = r#"{
  "itinerary": {
    "Day 1": ["item","item"]
  },
  "hotels": [],
  "food": [],
  "tips": []
}"#;

/// Builds the instruction text sent to the model. Deterministic for equal
/// inputs; parameters are trusted as already validated.
pub fn build_plan_prompt(params: &TripParameters, places: &[String]) -> String {
    let styles = if params.styles().is_empty() {
        "Any".to_string()
    } else {
        params
            .styles()
            .iter()
            .map(|style| style.label())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let famous_places = if places.is_empty() {
        "None found".to_string()
    } else {
        places.join(", ")
    };

    format!(
        "Return ONLY valid JSON. No explanation.\n\n\
         Format:\n{shape}\n\n\
         Use the keys \"Day 1\" through \"Day {days}\" for the itinerary, in order.\n\n\
         Destination: {destination}\n\
         Days: {days}\n\
         Budget: {budget}\n\
         Style: {styles}\n\
         Famous Places: {famous_places}\n",
        shape = PLAN_SHAPE,
        days = params.days(),
        destination = params.destination(),
        budget = params.budget().label(),
    )
}

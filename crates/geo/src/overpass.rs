use std::collections::HashMap;

use serde::Deserialize;

pub const SEARCH_RADIUS_METERS: u32 = 15_000;
pub const SERVER_RESULT_CAP: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OverpassElement {
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
}

/// Tourist attractions (nodes and ways) around a point.
pub fn attraction_query(latitude: f64, longitude: f64) -> String {
    format!(
        "[out:json];\n(\n  node[\"tourism\"=\"attraction\"](around:{radius},{latitude},{longitude});\n  way[\"tourism\"=\"attraction\"](around:{radius},{latitude},{longitude});\n);\nout tags center {cap};\n",
        radius = SEARCH_RADIUS_METERS,
        cap = SERVER_RESULT_CAP,
    )
}

/// Names in service order; unnamed elements are skipped, duplicates kept.
pub fn attraction_names(response: OverpassResponse, limit: usize) -> Vec<String> {
    response
        .elements
        .into_iter()
        .filter_map(|element| element.tags.and_then(|mut tags| tags.remove("name")))
        .filter(|name| !name.trim().is_empty())
        .take(limit)
        .collect()
}

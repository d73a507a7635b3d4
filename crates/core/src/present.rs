use printpdf::{BuiltinFont, Mm, PdfDocument};
use rand::{rng, Rng};
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;
use url::form_urlencoded;

use crate::error::ExportError;
use crate::models::{GeoResult, MapView, TripPlan};

pub const DEFAULT_IMAGE_COUNT: usize = 3;
pub const DEFAULT_MAP_ZOOM: u8 = 12;
pub const LINES_PER_PAGE: usize = 40;
pub const MAX_LINE_GRAPHEMES: usize = 90;

pub const EXPORT_FILE_NAME: &str = "trip_plan.pdf";

const DOCUMENT_TITLE: &str = "Voyage Planner";

// A4 portrait, millimetres.
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_LEFT_MM: f32 = 15.0;
const FIRST_LINE_MM: f32 = 280.0;
const LINE_HEIGHT_MM: f32 = 6.0;
const FOOTER_MM: f32 = 12.0;
const TITLE_FONT_SIZE: f32 = 16.0;
const BODY_FONT_SIZE: f32 = 11.0;
const FOOTER_FONT_SIZE: f32 = 9.0;

/// Stock photo URLs for a keyword. Each URL carries a random `sig` so
/// repeated calls yield different pictures.
pub fn fetch_image_urls(keyword: &str, count: usize) -> Vec<String> {
    let query = form_urlencoded::byte_serialize(keyword.trim().as_bytes()).collect::<String>();
    let mut generator = rng();

    (0..count)
        .map(|_| {
            let sig: u32 = generator.random_range(1..=10_000_000);
            format!("https://source.unsplash.com/800x600/?{query},travel&sig={sig}")
        })
        .collect()
}

pub fn map_view(geo: &GeoResult, marker_label: &str) -> MapView {
    MapView {
        latitude: geo.latitude,
        longitude: geo.longitude,
        zoom: DEFAULT_MAP_ZOOM,
        marker_label: marker_label.to_string(),
        osm_url: format!(
            "https://www.openstreetmap.org/?mlat={lat}&mlon={lon}#map={zoom}/{lat}/{lon}",
            lat = geo.latitude,
            lon = geo.longitude,
            zoom = DEFAULT_MAP_ZOOM,
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItineraryDocument {
    pub pages: Vec<Vec<String>>,
}

impl ItineraryDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Lays the pages out as an A4 PDF. The first line of the first page is
    /// the title; every page carries a `page i of n` footer.
    pub fn to_pdf(&self) -> Result<Vec<u8>, ExportError> {
        let (doc, first_page, first_layer) = PdfDocument::new(
            DOCUMENT_TITLE,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let body = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|error| ExportError::Pdf(format!("{error:?}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|error| ExportError::Pdf(format!("{error:?}")))?;

        let total = self.pages.len();
        for (idx, lines) in self.pages.iter().enumerate() {
            let (page, layer) = if idx == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1")
            };
            let layer = doc.get_page(page).get_layer(layer);

            for (row, line) in lines.iter().enumerate() {
                if line.is_empty() {
                    continue;
                }
                let y = Mm(FIRST_LINE_MM - LINE_HEIGHT_MM * row as f32);
                if idx == 0 && row == 0 {
                    layer.use_text(line.as_str(), TITLE_FONT_SIZE, Mm(MARGIN_LEFT_MM), y, &bold);
                } else {
                    layer.use_text(line.as_str(), BODY_FONT_SIZE, Mm(MARGIN_LEFT_MM), y, &body);
                }
            }

            layer.use_text(
                format!("page {} of {}", idx + 1, total),
                FOOTER_FONT_SIZE,
                Mm(PAGE_WIDTH_MM / 2.0 - 10.0),
                Mm(FOOTER_MM),
                &body,
            );
        }

        doc.save_to_bytes()
            .map_err(|error| ExportError::Pdf(format!("{error:?}")))
    }
}

pub fn render_itinerary_document(destination: &str, plan: &TripPlan) -> ItineraryDocument {
    let mut lines = vec![format!("{DOCUMENT_TITLE}: {destination}"), String::new()];

    for (day, activities) in &plan.itinerary {
        lines.push(day.clone());
        for activity in activities {
            lines.extend(wrap_line(&format!("- {activity}"), MAX_LINE_GRAPHEMES));
        }
        lines.push(String::new());
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    ItineraryDocument {
        pages: lines
            .chunks(LINES_PER_PAGE)
            .map(|chunk| chunk.to_vec())
            .collect(),
    }
}

fn wrap_line(line: &str, max_graphemes: usize) -> Vec<String> {
    let graphemes = line.graphemes(true).collect::<Vec<_>>();
    if graphemes.len() <= max_graphemes {
        return vec![line.to_string()];
    }

    let mut wrapped = Vec::new();
    let mut current = String::new();
    let mut width = 0usize;

    for word in line.split_word_bounds() {
        let word_width = word.graphemes(true).count();
        if width + word_width > max_graphemes && !current.trim().is_empty() {
            wrapped.push(current.trim_end().to_string());
            current = "  ".to_string();
            width = 2;
            if word.trim().is_empty() {
                continue;
            }
        }
        current.push_str(word);
        width += word_width;
    }

    if !current.trim().is_empty() {
        wrapped.push(current.trim_end().to_string());
    }

    wrapped
}

use urlencoding::encode;

use crate::coord::BoundingBox;

pub const QUERY_BASE: &str = "https://picsfromspace.com/satellite";

// The provider expects the basemap name percent-encoded once in the raw
// value, then again as a query parameter.
const BASEMAP: &str = "Google%20Hybrid";

/// Renders the provider query URL for a bounding box.
///
/// Corners are embedded in (min_x, min_y) then (max_x, max_y) order with
/// percent-encoded comma separators. The coordinates are already signed
/// decimal degrees (the DMS sign was folded in during conversion), so
/// they are rendered as-is; a box straddling the prime meridian or the
/// equator keeps each corner's own sign.
pub fn build_query_url(bbox: &BoundingBox) -> String {
    let pos = format!(
        "{},{},{},{}",
        bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y,
    );
    format!("{QUERY_BASE}?pos={}&basemap={}", encode(&pos), encode(BASEMAP))
}

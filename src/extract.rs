//! Grid-coordinate recovery from tile source URLs.

/// Strategy for recovering a tile's (x, y) grid position from its source
/// URL. Kept behind a trait so an alternate provider with a different URL
/// numbering scheme can plug in its own parser without touching the
/// reconstruction algorithm.
pub trait CoordExtractor {
    fn extract(&self, url: &str) -> (String, String);
}

/// Default strategy: the first two runs of ASCII digits found anywhere in
/// the URL, with `"0"` standing in for a missing component. This is a
/// positional proxy tied to the stock provider's numbering, not a
/// calibrated geodetic coordinate.
pub struct FirstTwoIntegers;

impl CoordExtractor for FirstTwoIntegers {
    fn extract(&self, url: &str) -> (String, String) {
        let mut runs = url
            .split(|ch: char| !ch.is_ascii_digit())
            .filter(|run| !run.is_empty());
        let x = runs.next().unwrap_or("0").to_string();
        let y = runs.next().unwrap_or("0").to_string();
        (x, y)
    }
}

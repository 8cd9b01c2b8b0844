use crate::constants::{OFFSET_X, OFFSET_Y};
use crate::error::PipelineError;

/// Sign of a DMS coordinate, entered as `p`/`n` on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

impl Sign {
    pub fn from_token(token: &str) -> Result<Self, PipelineError> {
        let lowered = token.trim().to_ascii_lowercase();
        if lowered.starts_with('p') {
            Ok(Sign::Positive)
        } else if lowered.starts_with('n') {
            Ok(Sign::Negative)
        } else {
            Err(PipelineError::Validation(format!(
                "invalid sign '{token}' (expected p for positive or n for negative)"
            )))
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Sign::Positive => 1.0,
            Sign::Negative => -1.0,
        }
    }
}

/// Which geographic axis a DMS value describes; the degree bound differs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Longitude,
    Latitude,
}

impl Axis {
    fn degree_limit(self) -> u32 {
        match self {
            Axis::Longitude => 180,
            Axis::Latitude => 90,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Axis::Longitude => "longitude",
            Axis::Latitude => "latitude",
        }
    }
}

/// One degree/minute/second coordinate as entered by the user.
#[derive(Clone, Copy, Debug)]
pub struct Dms {
    pub sign: Sign,
    pub degree: u32,
    pub minute: u32,
    pub second: f64,
}

impl Dms {
    /// Converts to signed decimal degrees, validating each component
    /// against the axis range.
    pub fn to_decimal(&self, axis: Axis) -> Result<f64, PipelineError> {
        if self.degree > axis.degree_limit() {
            return Err(PipelineError::Validation(format!(
                "{} degree {} exceeds {}",
                axis.name(),
                self.degree,
                axis.degree_limit()
            )));
        }
        if self.minute > 59 {
            return Err(PipelineError::Validation(format!(
                "minute {} must be between 0 and 59",
                self.minute
            )));
        }
        if !(0.0..60.0).contains(&self.second) {
            return Err(PipelineError::Validation(format!(
                "second {} must be at least 0 and below 60",
                self.second
            )));
        }
        let decimal = self.degree as f64 + self.minute as f64 / 60.0 + self.second / 3600.0;
        Ok(self.sign.factor() * decimal)
    }
}

/// A point in signed decimal degrees.
#[derive(Clone, Copy, Debug)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// Axis-aligned box around a [`GeoPoint`], one provider tile page wide.
#[derive(Clone, Copy, Debug)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn around(point: GeoPoint) -> Self {
        Self {
            min_x: point.longitude - OFFSET_X,
            min_y: point.latitude - OFFSET_Y,
            max_x: point.longitude + OFFSET_X,
            max_y: point.latitude + OFFSET_Y,
        }
    }
}

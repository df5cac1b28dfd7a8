//! Bounding box to bearing angle conversion.
//!
//! Camera detections arrive as normalized boxes (`center_x`, `center_y`,
//! `width`, `height`, all in `[0, 1]`). The horizontal edges of a box are
//! mapped linearly onto the camera's horizontal field of view, giving the
//! bearing of each edge relative to the optical axis:
//!
//! ```text
//! left  = (center_x - width / 2 - 0.5) * fov
//! right = (center_x + width / 2 - 0.5) * fov
//! ```
//!
//! Label files use one detection per line: `class cx cy w h`.

use crate::error::FormationError;
use serde::{Deserialize, Serialize};

/// Default horizontal field of view of the fleet cameras (degrees).
pub const DEFAULT_HORIZONTAL_FOV_DEG: f64 = 70.42;

/// Normalized bounding box of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelBox {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl LabelBox {
    /// Creates a box, checking every parameter lies in `[0, 1]`.
    pub fn new(center_x: f64, center_y: f64, width: f64, height: f64) -> Result<Self, FormationError> {
        for (name, value) in [
            ("center_x", center_x),
            ("center_y", center_y),
            ("width", width),
            ("height", height),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FormationError::InvalidLabel(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(Self {
            center_x,
            center_y,
            width,
            height,
        })
    }

    /// Normalized horizontal coordinate of the left edge.
    pub fn left_edge(&self) -> f64 {
        self.center_x - self.width / 2.0
    }

    /// Normalized horizontal coordinate of the right edge.
    pub fn right_edge(&self) -> f64 {
        self.center_x + self.width / 2.0
    }
}

/// Parses a label file and returns the box of `target_class`.
///
/// Blank lines are skipped. When the class appears several times the last
/// occurrence wins. Returns `Ok(None)` when the class is absent.
pub fn parse_labels(text: &str, target_class: u32) -> Result<Option<LabelBox>, FormationError> {
    let mut found = None;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<f64> = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|_| {
                    FormationError::InvalidLabel(format!(
                        "line {}: `{}` is not a number",
                        line_no + 1,
                        tok
                    ))
                })
            })
            .collect::<Result<_, _>>()?;

        if fields.len() != 5 {
            return Err(FormationError::InvalidLabel(format!(
                "line {}: expected 5 fields, got {}",
                line_no + 1,
                fields.len()
            )));
        }

        if fields[0] == target_class as f64 {
            found = Some(LabelBox::new(fields[1], fields[2], fields[3], fields[4])?);
        }
    }

    Ok(found)
}

/// Converts boxes to edge bearings for a given camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BearingConverter {
    /// Horizontal field of view (degrees)
    pub horizontal_fov_deg: f64,
}

impl BearingConverter {
    /// Creates a converter for a camera with the given field of view.
    pub fn new(horizontal_fov_deg: f64) -> Result<Self, FormationError> {
        crate::error::require_positive("horizontal_fov_deg", horizontal_fov_deg)?;
        Ok(Self { horizontal_fov_deg })
    }

    /// Returns `(left, right)` edge bearings in degrees.
    pub fn relative_angles(&self, label: &LabelBox) -> (f64, f64) {
        let left = (label.left_edge() - 0.5) * self.horizontal_fov_deg;
        let right = (label.right_edge() - 0.5) * self.horizontal_fov_deg;
        (left, right)
    }
}

impl Default for BearingConverter {
    fn default() -> Self {
        Self {
            horizontal_fov_deg: DEFAULT_HORIZONTAL_FOV_DEG,
        }
    }
}

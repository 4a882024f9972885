//! Two-tone layer styling keyed purely on predisposed membership.

#[cfg(test)]
#[path = "style_test.rs"]
mod tests;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Default,
    Predisposed,
}

impl Tone {
    #[must_use]
    pub fn from_predisposed(predisposed: bool) -> Self {
        if predisposed { Self::Predisposed } else { Self::Default }
    }
}

/// Paint parameters handed to the map surface for one layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerStyle {
    pub tone: Tone,
    pub stroke: &'static str,
    pub fill: &'static str,
    pub weight: f32,
    pub opacity: f32,
    pub fill_opacity: f32,
    /// Marker radius in pixels; `None` for area layers.
    pub radius: Option<f32>,
}

/// Building footprint: orange when predisposed, blue otherwise.
#[must_use]
pub fn polygon_style(tone: Tone) -> LayerStyle {
    let (color, fill_opacity) = match tone {
        Tone::Predisposed => ("orange", 0.4),
        Tone::Default => ("blue", 0.3),
    };
    LayerStyle { tone, stroke: color, fill: color, weight: 1.0, opacity: 1.0, fill_opacity, radius: None }
}

/// Centroid marker: black outline, fill follows the parent building.
#[must_use]
pub fn centroid_style(tone: Tone) -> LayerStyle {
    let fill = match tone {
        Tone::Predisposed => "#FFA500",
        Tone::Default => "#FF0000",
    };
    LayerStyle { tone, stroke: "#000", fill, weight: 1.0, opacity: 1.0, fill_opacity: 0.8, radius: Some(5.0) }
}

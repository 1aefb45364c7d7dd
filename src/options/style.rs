use serde::Deserialize;

/// Colour maps understood by the renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Viridis,
    Coolwarm,
    Greys,
}

/// Stroke settings for lines, boxes and coastlines
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineStyle {
    /// Named colour or `#rrggbb`
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub linewidth: Option<f64>,
    #[serde(default)]
    pub dashed: bool,
}

/// One contour-line pass
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContourStyle {
    /// Contour values; derived from the data when absent
    #[serde(default)]
    pub levels: Option<Vec<f64>>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub linewidth: Option<f64>,
    #[serde(default)]
    pub dashed: bool,
}

impl ContourStyle {
    pub fn line(&self) -> LineStyle {
        LineStyle {
            color: self.color.clone(),
            linewidth: self.linewidth,
            dashed: self.dashed,
        }
    }
}

/// Arrow settings for vector plots
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VectorStyle {
    /// Vector magnitude drawn as one arrow spacing; fixed by the first panel when absent
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub linewidth: Option<f64>,
}

/// Pointwise `z * scale + offset`, e.g. a unit conversion
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MathTransform {
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl MathTransform {
    pub fn apply(&self, z: f64) -> f64 {
        z * self.scale + self.offset
    }
}

/// Parse `#rrggbb` or a small set of named colours
pub fn parse_color(color: &str) -> Option<(u8, u8, u8)> {
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return Some((channel(0)?, channel(2)?, channel(4)?));
    }
    match color {
        "black" | "k" => Some((0, 0, 0)),
        "white" | "w" => Some((255, 255, 255)),
        "red" | "r" => Some((214, 39, 40)),
        "blue" | "b" => Some((31, 119, 180)),
        "green" | "g" => Some((44, 160, 44)),
        "orange" => Some((255, 127, 14)),
        "gray" | "grey" => Some((127, 127, 127)),
        "purple" => Some((148, 103, 189)),
        _ => None,
    }
}

use crate::options::Colormap;

const VIRIDIS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

const COOLWARM: [(u8, u8, u8); 3] = [(59, 76, 192), (221, 221, 221), (180, 4, 38)];

const GREYS: [(u8, u8, u8); 2] = [(255, 255, 255), (0, 0, 0)];

impl Colormap {
    fn anchors(&self) -> &'static [(u8, u8, u8)] {
        match self {
            Colormap::Viridis => &VIRIDIS,
            Colormap::Coolwarm => &COOLWARM,
            Colormap::Greys => &GREYS,
        }
    }

    /// Colour at `t` in `[0, 1]`, piecewise linear between anchors
    pub fn rgb(&self, t: f64) -> (u8, u8, u8) {
        let anchors = self.anchors();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * (anchors.len() - 1) as f64;
        let i = (pos.floor() as usize).min(anchors.len() - 2);
        let frac = pos - i as f64;
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let (a, b) = (anchors[i], anchors[i + 1]);
        (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
    }
}

/// Band of `value` among `levels`: 0 below the first level, `levels.len()` above the last
pub fn level_band(levels: &[f64], value: f64) -> Option<usize> {
    if value.is_nan() {
        return None;
    }
    Some(levels.iter().take_while(|&&l| l <= value).count())
}

/// Colour of band `band` when `levels` split the colormap into `levels.len() + 1` bands
pub fn band_color(colormap: Colormap, levels: &[f64], band: usize) -> (u8, u8, u8) {
    let bands = levels.len() + 1;
    if bands <= 1 {
        return colormap.rgb(0.5);
    }
    colormap.rgb(band as f64 / (bands - 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colormap_end_points() {
        assert_eq!(Colormap::Viridis.rgb(0.0), (68, 1, 84));
        assert_eq!(Colormap::Viridis.rgb(1.0), (253, 231, 37));
        assert_eq!(Colormap::Greys.rgb(0.5), (128, 128, 128));
        assert_eq!(Colormap::Coolwarm.rgb(f64::NAN), (59, 76, 192));
    }

    #[test]
    fn test_level_band() {
        let levels = [0.0, 1.0, 2.0];
        assert_eq!(level_band(&levels, -1.0), Some(0));
        assert_eq!(level_band(&levels, 0.5), Some(1));
        assert_eq!(level_band(&levels, 2.0), Some(3));
        assert_eq!(level_band(&levels, f64::NAN), None);
        assert_eq!(band_color(Colormap::Greys, &levels, 3), (0, 0, 0));
    }
}

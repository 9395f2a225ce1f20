//! Synthetic glyph datasets
//!
//! Stand-ins for loaded data: clustered scatter points tagged by cluster, or a
//! checkerboard of squares carrying a float weight.

use abstract_rendering::{Glyph, Rect, Value, ValueKind};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    #[default]
    Scatter,
    Checkerboard,
}

/// Dataset generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    pub kind: DatasetKind,
    /// Scatter points to generate
    pub points: usize,
    /// Scatter clusters; point values are the 1-based cluster number
    pub clusters: usize,
    /// Side of each scatter glyph; 0 makes point glyphs
    pub glyph_size: f64,
    /// Squares per checkerboard side
    pub squares: usize,
    /// Side length of the square the dataset spans
    pub extent: f64,
    pub seed: u64,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            kind: DatasetKind::Scatter,
            points: 20_000,
            clusters: 4,
            glyph_size: 0.0,
            squares: 8,
            extent: 100.0,
            seed: 7,
        }
    }
}

impl DatasetSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.extent > 0.0 && self.extent.is_finite()) {
            return Err(format!("Dataset extent must be positive, got {}", self.extent));
        }
        if !(self.glyph_size >= 0.0) {
            return Err(format!(
                "Dataset glyph_size cannot be negative, got {}",
                self.glyph_size
            ));
        }
        match self.kind {
            DatasetKind::Scatter if self.clusters == 0 => {
                Err("Scatter datasets need at least one cluster".to_string())
            }
            DatasetKind::Checkerboard if self.squares == 0 => {
                Err("Checkerboard datasets need at least one square".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Kind of the values carried by the generated glyphs.
    pub fn value_kind(&self) -> ValueKind {
        match self.kind {
            DatasetKind::Scatter => ValueKind::Int,
            DatasetKind::Checkerboard => ValueKind::Float,
        }
    }

    pub fn generate(&self) -> Vec<Glyph<Value>> {
        match self.kind {
            DatasetKind::Scatter => self.scatter(),
            DatasetKind::Checkerboard => self.checkerboard(),
        }
    }

    fn scatter(&self) -> Vec<Glyph<Value>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let spread = self.extent / 10.0;
        let centers: Vec<(f64, f64)> = (0..self.clusters)
            .map(|_| {
                (
                    rng.gen_range(spread..self.extent - spread),
                    rng.gen_range(spread..self.extent - spread),
                )
            })
            .collect();

        (0..self.points)
            .map(|i| {
                let cluster = i % self.clusters;
                let (cx, cy) = centers[cluster];
                // Sum of three uniforms: cheap bell-shaped falloff around the center.
                let mut offset = || {
                    (rng.r#gen::<f64>() + rng.r#gen::<f64>() + rng.r#gen::<f64>() - 1.5) * spread
                };
                let x = (cx + offset()).clamp(0.0, self.extent);
                let y = (cy + offset()).clamp(0.0, self.extent);
                Glyph::new(
                    Rect::new(x, y, self.glyph_size, self.glyph_size),
                    Value::Int(cluster as i64 + 1),
                )
            })
            .collect()
    }

    fn checkerboard(&self) -> Vec<Glyph<Value>> {
        let side = self.extent / self.squares as f64;
        let mut glyphs = Vec::with_capacity(self.squares * self.squares / 2 + 1);
        for row in 0..self.squares {
            for col in 0..self.squares {
                if (row + col) % 2 != 0 {
                    continue;
                }
                let weight = ((row + col) / 2 % 4 + 1) as f64;
                glyphs.push(Glyph::new(
                    Rect::new(col as f64 * side, row as f64 * side, side, side),
                    Value::Float(weight),
                ));
            }
        }
        glyphs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scatter_is_deterministic_and_bounded() {
        let settings = DatasetSettings {
            points: 500,
            ..DatasetSettings::default()
        };
        let a = settings.generate();
        let b = settings.generate();
        assert_eq!(a.len(), 500);
        assert_eq!(a, b);
        for glyph in &a {
            let bounds = glyph.bounds();
            assert!(bounds.min_x >= 0.0 && bounds.min_x <= settings.extent);
            assert!(bounds.min_y >= 0.0 && bounds.min_y <= settings.extent);
            assert_eq!(glyph.value().kind(), ValueKind::Int);
        }
    }

    #[test]
    fn test_checkerboard_covers_dark_squares() {
        let settings = DatasetSettings {
            kind: DatasetKind::Checkerboard,
            squares: 4,
            extent: 8.0,
            ..DatasetSettings::default()
        };
        let glyphs = settings.generate();
        assert_eq!(glyphs.len(), 8);
        assert_eq!(glyphs[0].bounds(), Rect::new(0.0, 0.0, 2.0, 2.0));
        assert!(glyphs.iter().all(|g| g.value().kind() == settings.value_kind()));
    }

    #[test]
    fn test_validate_rejects_degenerate_settings() {
        assert!(DatasetSettings::default().validate().is_ok());
        let mut settings = DatasetSettings {
            clusters: 0,
            ..DatasetSettings::default()
        };
        assert!(settings.validate().is_err());
        settings.clusters = 2;
        settings.extent = -1.0;
        assert!(settings.validate().is_err());
    }
}

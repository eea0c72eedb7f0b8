use crate::config::defaults::HeatmapStyle;
use crate::engine::density::DensityField;
use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use std::path::Path;

/// Rasterize a density field. Row 0 of the image is the -Z edge of the field.
pub fn render_heatmap(field: &DensityField, style: &HeatmapStyle) -> RgbaImage {
    let size = field.resolution as u32;
    let mut img = RgbaImage::new(size, size);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let v = field.cells[y as usize * field.resolution + x as usize];
        *pixel = ramp(v, style);
    }
    img
}

/// Map intensity in [0, 1] onto cold → warm → hot with intensity-scaled alpha.
fn ramp(v: f32, style: &HeatmapStyle) -> Rgba<u8> {
    if !(v >= style.cutoff) {
        return Rgba([0, 0, 0, 0]);
    }
    let v = v.min(1.0);
    let rgb = if v < 0.5 {
        mix(style.cold, style.warm, v * 2.0)
    } else {
        mix(style.warm, style.hot, (v - 0.5) * 2.0)
    };
    let alpha = (v * style.max_alpha as f32).round() as u8;
    Rgba([rgb[0], rgb[1], rgb[2], alpha])
}

fn mix(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let lerp = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2])]
}

pub fn save_heatmap(field: &DensityField, style: &HeatmapStyle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    render_heatmap(field, style)
        .save(path)
        .with_context(|| format!("writing heatmap to {}", path.display()))?;
    log::info!("Heatmap written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_with(resolution: usize, values: &[(usize, f32)]) -> DensityField {
        let mut field = DensityField::empty(resolution, 10.0);
        for &(i, v) in values {
            field.cells[i] = v;
        }
        field
    }

    #[test]
    fn test_ramp_endpoints() {
        let style = HeatmapStyle::default();
        assert_eq!(ramp(0.0, &style), Rgba([0, 0, 0, 0]));
        assert_eq!(ramp(f32::NAN, &style), Rgba([0, 0, 0, 0]));
        let hot = ramp(1.0, &style);
        assert_eq!([hot[0], hot[1], hot[2]], style.hot);
        assert_eq!(hot[3], style.max_alpha);
        let warm = ramp(0.5, &style);
        assert_eq!([warm[0], warm[1], warm[2]], style.warm);
    }

    #[test]
    fn test_render_dimensions_and_layout() {
        let field = field_with(4, &[(4 + 2, 1.0)]);
        let img = render_heatmap(&field, &HeatmapStyle::default());
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(2, 1)[3], 200);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("heat.png");
        let field = field_with(8, &[(0, 0.7)]);
        save_heatmap(&field, &HeatmapStyle::default(), &path).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (8, 8));
        assert!(loaded.get_pixel(0, 0)[3] > 0);
    }
}

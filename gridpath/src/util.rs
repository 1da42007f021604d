use std::path::Path;

use anyhow::{bail, Context};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::{IntensityField, Point};

/// Convert an image to a field, using the average of the red, green and blue channels of each
/// pixel. Rows run from the top of the image down.
pub fn field_from_image(img: &DynamicImage) -> Result<IntensityField, anyhow::Error> {
    let width = img.width() as usize;
    let height = img.height() as usize;

    let mut values = Vec::with_capacity(width * height);

    for row in 0..height {
        for col in 0..width {
            let [r, g, b, _] = img.get_pixel(col as u32, row as u32).0;
            values.push(((r as u16 + g as u16 + b as u16) / 3) as u8);
        }
    }

    IntensityField::from_raw(height, width, values)
}

pub fn load_field<P: AsRef<Path>>(path: P) -> Result<IntensityField, anyhow::Error> {
    let path = path.as_ref();
    let img = image::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    field_from_image(&img).with_context(|| format!("failed to convert {}", path.display()))
}

/// How a field and a path are drawn
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)] // missing keys fall back to the defaults below
pub struct RenderConfig {
    /// Side of the square drawn for each cell, in pixels
    pub cell_size: u32,
    pub line_width: u32,
    pub path_color: [u8; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cell_size: 7,
            line_width: 2,
            path_color: [255, 0, 0],
        }
    }
}

/// Draw every cell as a gray square and join the centers of consecutive path cells with a line.
pub fn render(
    field: &IntensityField,
    path: &[Point],
    config: &RenderConfig,
) -> Result<RgbImage, anyhow::Error> {
    if config.cell_size == 0 {
        bail!("cell size must be at least one pixel");
    }

    let size = config.cell_size;

    // drawing takes signed coordinates, so the image has to stay within i32
    let pixels = |cells: usize| {
        u32::try_from(cells)
            .ok()
            .and_then(|cells| cells.checked_mul(size))
            .filter(|&px| px <= i32::MAX as u32)
    };
    let (Some(width), Some(height)) = (pixels(field.columns()), pixels(field.rows())) else {
        bail!(
            "{}x{} cells of {} pixels do not fit in an image",
            field.rows(),
            field.columns(),
            size
        );
    };

    let mut img = RgbImage::new(width, height);

    for (point, intensity) in field.iter() {
        let rect = Rect::at((point.col as u32 * size) as i32, (point.row as u32 * size) as i32)
            .of_size(size, size);
        draw_filled_rect_mut(&mut img, rect, Rgb([intensity, intensity, intensity]));
    }

    let center = |p: Point| {
        (
            (p.col as u32 * size + size / 2) as f32,
            (p.row as u32 * size + size / 2) as f32,
        )
    };

    // thick lines are drawn as parallel one pixel segments
    let line_width = config.line_width.max(1) as i32;
    let color = Rgb(config.path_color);
    for pair in path.windows(2) {
        let (from, to) = (center(pair[0]), center(pair[1]));
        for oy in 0..line_width {
            for ox in 0..line_width {
                let (dx, dy) = ((ox - line_width / 2) as f32, (oy - line_width / 2) as f32);
                draw_line_segment_mut(
                    &mut img,
                    (from.0 + dx, from.1 + dy),
                    (to.0 + dx, to.1 + dy),
                    color,
                );
            }
        }
    }

    Ok(img)
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_field_from_image() {
        let img = RgbImage::from_fn(3, 2, |x, y| match (x, y) {
            (0, 0) => Rgb([30, 60, 90]),
            (2, 1) => Rgb([255, 255, 254]),
            _ => Rgb([0, 0, 0]),
        });
        let field = field_from_image(&DynamicImage::ImageRgb8(img)).unwrap();

        assert_eq!(field.rows(), 2);
        assert_eq!(field.columns(), 3);
        assert_eq!(field.get(Point::new(0, 0)), Some(60));
        // integer division truncates
        assert_eq!(field.get(Point::new(1, 2)), Some(254));
        assert_eq!(field.get(Point::new(1, 0)), Some(0));
    }

    #[test]
    fn test_render() {
        let field = IntensityField::from_rows(&[vec![0, 10], vec![20, 30]]).unwrap();
        let config = RenderConfig::default();
        let path = [Point::new(0, 0), Point::new(0, 1), Point::new(1, 1)];

        let img = render(&field, &path, &config).unwrap();

        assert_eq!(img.dimensions(), (14, 14));

        // path cell centers are painted in the path color
        assert_eq!(*img.get_pixel(3, 3), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(10, 3), Rgb([255, 0, 0]));
        // and so are the segments between them, two pixels wide
        assert_eq!(*img.get_pixel(6, 3), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(6, 2), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(10, 6), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(9, 6), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(6, 4), Rgb([10, 10, 10]));

        // the cell that is not on the path keeps its gray level
        assert_eq!(*img.get_pixel(3, 10), Rgb([20, 20, 20]));
        assert_eq!(*img.get_pixel(0, 13), Rgb([20, 20, 20]));
    }

    #[test]
    fn test_render_rejects_empty_cells() {
        let field = IntensityField::from_rows(&[vec![0]]).unwrap();
        let config = RenderConfig {
            cell_size: 0,
            ..Default::default()
        };

        assert!(render(&field, &[], &config).is_err());
    }

    #[test]
    fn test_render_rejects_oversized_images() {
        let config = RenderConfig {
            cell_size: u32::MAX,
            ..Default::default()
        };

        let wide = IntensityField::from_rows(&[vec![0, 0]]).unwrap();
        assert!(render(&wide, &[], &config).is_err());

        let single = IntensityField::from_rows(&[vec![0]]).unwrap();
        assert!(render(&single, &[], &config).is_err());
    }

    #[test]
    fn test_render_config_defaults() {
        let config: RenderConfig = serde_json::from_str(r#"{"cell_size": 3}"#).unwrap();

        assert_eq!(config.cell_size, 3);
        assert_eq!(config.line_width, 2);
        assert_eq!(config.path_color, [255, 0, 0]);
    }
}

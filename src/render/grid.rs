//! Paper-style background grid for waveform surfaces.

use crate::render::surface::{Color, LineCap, LineJoin, Point, Rect, RenderSurface, StrokeStyle};
use crate::render::RenderError;

const MAJOR: StrokeStyle = StrokeStyle {
    width: 1.0,
    color: Color::rgb(0xFF, 0x00, 0x00),
    cap: LineCap::Round,
    join: LineJoin::Round,
};

const MINOR: StrokeStyle = StrokeStyle {
    width: 0.2,
    color: Color::rgb(0x99, 0x00, 0x00),
    cap: LineCap::Round,
    join: LineJoin::Round,
};

/// The first line and every fifth line after it are drawn heavier.
fn line_style(index: usize) -> &'static StrokeStyle {
    if index == 0 || (index + 1) % 5 == 0 {
        &MAJOR
    } else {
        &MINOR
    }
}

/// Draws a grid of `grid_size` cells centred on the surface.
pub fn draw_grid<S: RenderSurface + ?Sized>(
    surface: &mut S,
    grid_size: f64,
    clear_first: bool,
) -> Result<(), RenderError> {
    if !(grid_size.is_finite() && grid_size > 0.0) {
        return Err(RenderError::invalid("gridSize", format!("must be positive, got {grid_size}")));
    }
    let (width, height) = (surface.width(), surface.height());
    if clear_first {
        surface.clear_region(Rect::new(0.0, 0.0, width, height))?;
    }
    let vertical_count = (width / grid_size).floor() as usize;
    let vertical_padding = (width - (vertical_count as f64 * grid_size).floor()) / 2.0;
    let horizontal_count = (height / grid_size).floor() as usize;
    let horizontal_padding = (height - (horizontal_count as f64 * grid_size).floor()) / 2.0;
    for i in 0..=vertical_count {
        let x = vertical_padding + i as f64 * grid_size;
        surface.stroke_path(
            &[
                Point::new(x, horizontal_padding),
                Point::new(x, height - horizontal_padding),
            ],
            line_style(i),
        )?;
    }
    for i in 0..=horizontal_count {
        let y = horizontal_padding + i as f64 * grid_size;
        surface.stroke_path(
            &[
                Point::new(vertical_padding, y),
                Point::new(width - vertical_padding, y),
            ],
            line_style(i),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::{RecordingSurface, SurfaceOp};

    #[test]
    fn grid_is_centred_with_major_lines() {
        let mut surface = RecordingSurface::new(110.0, 45.0);
        draw_grid(&mut surface, 20.0, true).unwrap();
        let ops = surface.ops();
        assert_eq!(ops[0], SurfaceOp::Clear(Rect::new(0.0, 0.0, 110.0, 45.0)));
        // 5 columns -> 6 vertical lines, 2 rows -> 3 horizontal lines
        let strokes: Vec<&SurfaceOp> = ops[1..].iter().collect();
        assert_eq!(strokes.len(), 9);
        let SurfaceOp::Stroke { points, style } = strokes[0] else {
            panic!("expected a stroke");
        };
        assert_eq!(points[0], Point::new(5.0, 2.5));
        assert_eq!(points[1], Point::new(5.0, 42.5));
        assert_eq!(*style, MAJOR);
        let widths: Vec<f64> = strokes[..6]
            .iter()
            .map(|op| match op {
                SurfaceOp::Stroke { style, .. } => style.width,
                _ => 0.0,
            })
            .collect();
        assert_eq!(widths, vec![1.0, 0.2, 0.2, 0.2, 1.0, 0.2]);
    }

    #[test]
    fn rejects_non_positive_grid() {
        let mut surface = RecordingSurface::new(10.0, 10.0);
        assert!(draw_grid(&mut surface, 0.0, false).is_err());
        assert!(surface.ops().is_empty());
    }
}

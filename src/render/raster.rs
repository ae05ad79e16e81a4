use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use plotters::style::Color as _;
use crate::render::surface::{Color, Point, Rect, RenderSurface, StrokeStyle};
use crate::render::RenderError;

/// Largest backing store side, in pixels.
const MAX_PIXEL_SIDE: f64 = 16384.0;

/// RGB pixel buffer drawn through plotters' bitmap backend.
///
/// Line caps and joins are not expressible in the bitmap backend and are ignored.
pub struct RasterSurface {
    logical_width: f64,
    logical_height: f64,
    scale: f64,
    pixel_width: u32,
    pixel_height: u32,
    background: Color,
    pixels: Vec<u8>,
    dirty: bool,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        let mut surface = Self {
            logical_width: width as f64,
            logical_height: height as f64,
            scale: 1.0,
            pixel_width: width,
            pixel_height: height,
            background,
            pixels: Vec::new(),
            dirty: true,
        };
        surface.reallocate();
        surface
    }

    fn reallocate(&mut self) {
        let bg = [self.background.r, self.background.g, self.background.b];
        self.pixels = bg.repeat(self.pixel_width as usize * self.pixel_height as usize);
        self.dirty = true;
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.pixel_width, self.pixel_height)
    }

    /// Packed RGB rows, `pixel_size()` wide and high.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.pixel_width || y >= self.pixel_height {
            return None;
        }
        let offset = (y as usize * self.pixel_width as usize + x as usize) * 3;
        Some([
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ])
    }

    /// Returns whether anything was drawn since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let image =
            ImageBuffer::<Rgb<u8>, _>::from_raw(self.pixel_width, self.pixel_height, self.pixels.clone())
                .ok_or_else(|| RenderError::Surface("failed to allocate image buffer".into()))?;
        let mut output = Vec::new();
        DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
        Ok(output)
    }

    fn to_pixel(&self, x: f64, y: f64) -> (i32, i32) {
        (
            (x * self.scale).round() as i32,
            (y * self.scale).round() as i32,
        )
    }
}

fn rgb(color: Color) -> RGBColor {
    RGBColor(color.r, color.g, color.b)
}

impl RenderSurface for RasterSurface {
    fn width(&self) -> f64 {
        self.logical_width
    }

    fn height(&self) -> f64 {
        self.logical_height
    }

    fn clear_region(&mut self, region: Rect) -> Result<(), RenderError> {
        if region.width <= 0.0 || region.height <= 0.0 {
            return Ok(());
        }
        let top_left = self.to_pixel(region.x, region.y);
        let (right, bottom) = self.to_pixel(region.x + region.width, region.y + region.height);
        let fill = rgb(self.background).filled();
        let size = (self.pixel_width, self.pixel_height);
        {
            let root = BitMapBackend::with_buffer(&mut self.pixels, size).into_drawing_area();
            // plotters rectangles include both corners
            root.draw(&Rectangle::new([top_left, (right - 1, bottom - 1)], fill))?;
            root.present()?;
        }
        self.dirty = true;
        Ok(())
    }

    fn stroke_path(&mut self, points: &[Point], style: &StrokeStyle) -> Result<(), RenderError> {
        if points.len() < 2 {
            return Ok(());
        }
        let coords: Vec<(i32, i32)> = points.iter().map(|p| self.to_pixel(p.x, p.y)).collect();
        let color = RGBAColor(
            style.color.r,
            style.color.g,
            style.color.b,
            style.color.a as f64 / 255.0,
        );
        let stroke_width = (style.width * self.scale).round().max(1.0) as u32;
        let size = (self.pixel_width, self.pixel_height);
        {
            let root = BitMapBackend::with_buffer(&mut self.pixels, size).into_drawing_area();
            root.draw(&PathElement::new(coords, color.stroke_width(stroke_width)))?;
            root.present()?;
        }
        self.dirty = true;
        Ok(())
    }

    fn configure_output_scale(
        &mut self,
        ratio: f64,
        logical_width: f64,
        logical_height: f64,
    ) -> Result<(), RenderError> {
        if ratio == 0.0 {
            return Ok(());
        }
        if !ratio.is_finite() || ratio < 0.0 {
            return Err(RenderError::invalid("outputScale", format!("bad ratio {ratio}")));
        }
        if !(logical_width > 0.0 && logical_height > 0.0) {
            return Err(RenderError::invalid(
                "outputScale",
                format!("bad logical size {logical_width}x{logical_height}"),
            ));
        }
        let (pixel_width, pixel_height) = (
            (logical_width * ratio).round().max(1.0),
            (logical_height * ratio).round().max(1.0),
        );
        if pixel_width > MAX_PIXEL_SIDE || pixel_height > MAX_PIXEL_SIDE {
            return Err(RenderError::invalid(
                "outputScale",
                format!("ratio {ratio} needs {pixel_width}x{pixel_height} pixels"),
            ));
        }
        self.scale = ratio;
        self.logical_width = logical_width;
        self.logical_height = logical_height;
        self.pixel_width = pixel_width as u32;
        self.pixel_height = pixel_height as u32;
        self.reallocate();
        Ok(())
    }
}

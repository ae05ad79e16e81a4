use std::fmt;
use std::str::FromStr;
use serde::Deserialize;
use crate::render::RenderError;

/// Point in logical surface coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned region, origin at the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl FromStr for Color {
    type Err = RenderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let named = match raw.to_ascii_lowercase().as_str() {
            "black" => Some(Color::BLACK),
            "white" => Some(Color::WHITE),
            "red" => Some(Color::RED),
            "green" | "lime" => Some(Color::GREEN),
            "blue" => Some(Color::BLUE),
            "yellow" => Some(Color::YELLOW),
            _ => None,
        };
        if let Some(color) = named {
            return Ok(color);
        }
        let bad = || RenderError::invalid("strokeStyle", format!("unsupported colour {raw:?}"));
        let hex = raw.strip_prefix('#').ok_or_else(bad)?;
        if !hex.is_ascii() {
            return Err(bad());
        }
        let channel = |i: usize, len: usize| -> Result<u8, RenderError> {
            let digits = &hex[i * len..(i + 1) * len];
            let value = u8::from_str_radix(digits, 16).map_err(|_| bad())?;
            // #RGB expands each nibble (0xF -> 0xFF)
            Ok(if len == 1 { value * 17 } else { value })
        };
        match hex.len() {
            3 => Ok(Color::rgb(channel(0, 1)?, channel(1, 1)?, channel(2, 1)?)),
            6 => Ok(Color::rgb(channel(0, 2)?, channel(1, 2)?, channel(2, 2)?)),
            8 => Ok(Color {
                r: channel(0, 2)?,
                g: channel(1, 2)?,
                b: channel(2, 2)?,
                a: channel(3, 2)?,
            }),
            _ => Err(bad()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = RenderError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    #[default]
    Round,
    Bevel,
    Miter,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    pub color: Color,
    pub cap: LineCap,
    pub join: LineJoin,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            color: Color::BLACK,
            cap: LineCap::Round,
            join: LineJoin::Round,
        }
    }
}

/// Drawing area the waveform renderer paints onto.
///
/// Coordinates are logical units; any output scaling configured through
/// [`RenderSurface::configure_output_scale`] is applied by the implementation.
pub trait RenderSurface {
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn clear_region(&mut self, region: Rect) -> Result<(), RenderError>;
    /// Strokes an open polyline through `points` in order.
    fn stroke_path(&mut self, points: &[Point], style: &StrokeStyle) -> Result<(), RenderError>;
    /// Compensates for high-density outputs: the backing store becomes
    /// `logical * ratio` while drawing stays in logical units.
    fn configure_output_scale(
        &mut self,
        ratio: f64,
        logical_width: f64,
        logical_height: f64,
    ) -> Result<(), RenderError>;
}

impl<S: RenderSurface + ?Sized> RenderSurface for &mut S {
    fn width(&self) -> f64 {
        (**self).width()
    }

    fn height(&self) -> f64 {
        (**self).height()
    }

    fn clear_region(&mut self, region: Rect) -> Result<(), RenderError> {
        (**self).clear_region(region)
    }

    fn stroke_path(&mut self, points: &[Point], style: &StrokeStyle) -> Result<(), RenderError> {
        (**self).stroke_path(points, style)
    }

    fn configure_output_scale(
        &mut self,
        ratio: f64,
        logical_width: f64,
        logical_height: f64,
    ) -> Result<(), RenderError> {
        (**self).configure_output_scale(ratio, logical_width, logical_height)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceOp {
    Clear(Rect),
    Stroke { points: Vec<Point>, style: StrokeStyle },
    Scale { ratio: f64, width: f64, height: f64 },
}

/// Display-list surface: keeps every operation instead of rasterising it.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    ops: Vec<SurfaceOp>,
    rejected_clears: Vec<Rect>,
    rejected_stroke_colors: Vec<Color>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }

    /// Makes every later `clear_region` of exactly `region` fail.
    pub fn reject_clear(&mut self, region: Rect) {
        self.rejected_clears.push(region);
    }

    /// Fails every stroke drawn in `color`.
    pub fn reject_strokes_with(&mut self, color: Color) {
        self.rejected_stroke_colors.push(color);
    }

    pub fn clears(&self) -> impl Iterator<Item = &Rect> {
        self.ops.iter().filter_map(|op| match op {
            SurfaceOp::Clear(rect) => Some(rect),
            _ => None,
        })
    }

    pub fn strokes(&self) -> impl Iterator<Item = &[Point]> {
        self.ops.iter().filter_map(|op| match op {
            SurfaceOp::Stroke { points, .. } => Some(points.as_slice()),
            _ => None,
        })
    }
}

impl RenderSurface for RecordingSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear_region(&mut self, region: Rect) -> Result<(), RenderError> {
        if self.rejected_clears.contains(&region) {
            return Err(RenderError::Surface(format!("clear rejected for {region:?}")));
        }
        self.ops.push(SurfaceOp::Clear(region));
        Ok(())
    }

    fn stroke_path(&mut self, points: &[Point], style: &StrokeStyle) -> Result<(), RenderError> {
        if self.rejected_stroke_colors.contains(&style.color) {
            return Err(RenderError::Surface(format!("stroke rejected for {}", style.color)));
        }
        self.ops.push(SurfaceOp::Stroke {
            points: points.to_vec(),
            style: *style,
        });
        Ok(())
    }

    fn configure_output_scale(
        &mut self,
        ratio: f64,
        logical_width: f64,
        logical_height: f64,
    ) -> Result<(), RenderError> {
        self.width = logical_width;
        self.height = logical_height;
        self.ops.push(SurfaceOp::Scale {
            ratio,
            width: logical_width,
            height: logical_height,
        });
        Ok(())
    }
}

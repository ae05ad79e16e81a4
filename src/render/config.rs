use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use crate::render::surface::{Color, LineCap, LineJoin, StrokeStyle};
use crate::render::RenderError;

/// Per-channel option bag as it appears in JSON config (camelCase keys).
/// Only `width`, `height` and `median` are required.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOptions {
    pub width: f64,
    pub height: f64,
    pub median: f64,
    #[serde(default)]
    pub clear_dirty: Option<bool>,
    #[serde(default)]
    pub draw_count: Option<usize>,
    #[serde(default)]
    pub base_line: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub scale_ratio: Option<f64>,
    #[serde(default, alias = "maxCacheSize")]
    pub max_queue_depth: Option<usize>,
    #[serde(default)]
    pub start_x: Option<f64>,
    #[serde(default)]
    pub start_y: Option<f64>,
    #[serde(default)]
    pub padding: Option<f64>,
    #[serde(default)]
    pub line_width: Option<f64>,
    #[serde(default)]
    pub stroke_style: Option<Color>,
    #[serde(default)]
    pub line_cap: Option<LineCap>,
    #[serde(default)]
    pub line_join: Option<LineJoin>,
}

impl ChannelOptions {
    pub fn new(width: f64, height: f64, median: f64) -> Self {
        Self {
            width,
            height,
            median,
            clear_dirty: None,
            draw_count: None,
            base_line: None,
            step: None,
            scale_ratio: None,
            max_queue_depth: None,
            start_x: None,
            start_y: None,
            padding: None,
            line_width: None,
            stroke_style: None,
            line_cap: None,
            line_join: None,
        }
    }

    /// Fills in defaults and validates the geometry once.
    pub fn build(&self) -> Result<ChannelConfig, RenderError> {
        let width = positive("width", self.width)?;
        let height = positive("height", self.height)?;
        let draw_count = self.draw_count.unwrap_or(1);
        if draw_count == 0 {
            return Err(RenderError::invalid("drawCount", "must be at least 1"));
        }
        let base_line = finite("baseLine", self.base_line.unwrap_or(height / 2.0))?.floor();
        let padding = finite("padding", self.padding.unwrap_or(16.0))?;
        if padding < 0.0 {
            return Err(RenderError::invalid("padding", "must not be negative"));
        }
        Ok(ChannelConfig {
            width,
            height,
            start_x: finite("startX", self.start_x.unwrap_or(0.0))?,
            start_y: finite("startY", self.start_y.unwrap_or(0.0))?,
            clear_dirty: self.clear_dirty.unwrap_or(true),
            draw_count,
            median: finite("median", self.median)?,
            base_line,
            step: positive("step", self.step.unwrap_or(1.0))?,
            scale_ratio: finite("scaleRatio", self.scale_ratio.unwrap_or(1.0))?,
            padding,
            max_queue_depth: self.max_queue_depth.unwrap_or(0),
            stroke: StrokeStyle {
                width: positive("lineWidth", self.line_width.unwrap_or(1.0))?,
                color: self.stroke_style.unwrap_or_default(),
                cap: self.line_cap.unwrap_or_default(),
                join: self.line_join.unwrap_or_default(),
            },
        })
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, RenderError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RenderError::invalid(field, format!("must be finite, got {value}")))
    }
}

fn positive(field: &'static str, value: f64) -> Result<f64, RenderError> {
    let value = finite(field, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(RenderError::invalid(field, format!("must be positive, got {value}")))
    }
}

/// Validated, immutable channel geometry and style.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelConfig {
    pub width: f64,
    pub height: f64,
    pub start_x: f64,
    pub start_y: f64,
    pub clear_dirty: bool,
    /// Samples painted per segment.
    pub draw_count: usize,
    /// Raw value that maps onto the baseline.
    pub median: f64,
    pub base_line: f64,
    /// X advance per sample.
    pub step: f64,
    pub scale_ratio: f64,
    /// Width of the strip cleared ahead of the cursor.
    pub padding: f64,
    /// Backlog at which a tick keeps draining; 0 disables catch-up.
    pub max_queue_depth: usize,
    pub stroke: StrokeStyle,
}

impl ChannelConfig {
    /// Maps a raw sample onto a y coordinate; higher values draw above the baseline.
    pub fn y_for(&self, sample: f64) -> f64 {
        self.base_line + (self.median - sample) * self.scale_ratio
    }
}

fn default_tick_interval_ms() -> u64 {
    40
}

fn default_idle_timeout_ms() -> u64 {
    2000
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default)]
    pub output_scale: Option<f64>,
    pub channels: Vec<ChannelOptions>,
}

impl RendererConfig {
    pub fn new(channels: Vec<ChannelOptions>) -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            output_scale: None,
            channels,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        serde_json::from_str(json).map_err(RenderError::Config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn build_channels(&self) -> Result<Vec<ChannelConfig>, RenderError> {
        if self.tick_interval_ms == 0 {
            return Err(RenderError::invalid("tickIntervalMs", "must be positive"));
        }
        if self.channels.is_empty() {
            return Err(RenderError::NoChannels);
        }
        self.channels.iter().map(ChannelOptions::build).collect()
    }

    /// Three-channel bedside layout on one surface: ECG across the top half,
    /// chest and abdominal respiration overlaid on the bottom half.
    ///
    /// At 40 ms per tick: ECG 200 samples/s -> 8 per tick, respiration
    /// 25 samples/s -> 1 per tick.
    pub fn bedside_monitor(width: f64, height: f64) -> Self {
        let step = 0.5;
        let half = height / 2.0;
        let ecg = ChannelOptions {
            draw_count: Some(8),
            step: Some(step),
            base_line: Some(height / 4.0),
            max_queue_depth: Some(2),
            scale_ratio: Some(0.8),
            padding: Some(16.0),
            start_x: Some(0.0),
            start_y: Some(0.0),
            stroke_style: Some(Color::RED),
            ..ChannelOptions::new(width, half, 512.0)
        };
        let chest = ChannelOptions {
            clear_dirty: Some(true),
            draw_count: Some(1),
            step: Some(step * 8.0),
            base_line: Some(height * 0.75),
            max_queue_depth: Some(2),
            scale_ratio: Some(0.6),
            padding: Some(16.0),
            start_x: Some(0.0),
            start_y: Some(half - 2.0),
            stroke_style: Some(Color::GREEN),
            ..ChannelOptions::new(width, half, 512.0)
        };
        let abdominal = ChannelOptions {
            clear_dirty: Some(false),
            start_y: Some(half + 2.0),
            stroke_style: Some(Color::YELLOW),
            ..chest.clone()
        };
        Self::new(vec![ecg, chest, abdominal])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_option_bag() {
        let config = ChannelOptions::new(600.0, 101.0, 512.0).build().unwrap();
        assert!(config.clear_dirty);
        assert_eq!(config.draw_count, 1);
        assert_eq!(config.base_line, 50.0);
        assert_eq!(config.step, 1.0);
        assert_eq!(config.scale_ratio, 1.0);
        assert_eq!(config.max_queue_depth, 0);
        assert_eq!(config.padding, 16.0);
        assert_eq!(config.stroke, StrokeStyle::default());
    }

    #[test]
    fn maps_samples_around_baseline() {
        let options = ChannelOptions {
            base_line: Some(100.0),
            scale_ratio: Some(0.8),
            ..ChannelOptions::new(600.0, 200.0, 512.0)
        };
        let config = options.build().unwrap();
        assert_eq!(config.y_for(512.0), 100.0);
        assert!((config.y_for(412.0) - 180.0).abs() < 1e-9);
        assert!(config.y_for(612.0) < 100.0);
    }

    #[test]
    fn rejects_bad_geometry() {
        let zero_draw = ChannelOptions {
            draw_count: Some(0),
            ..ChannelOptions::new(10.0, 10.0, 0.0)
        };
        assert!(matches!(
            zero_draw.build(),
            Err(RenderError::InvalidConfig { field: "drawCount", .. })
        ));
        assert!(ChannelOptions::new(0.0, 10.0, 0.0).build().is_err());
        assert!(ChannelOptions::new(10.0, -1.0, 0.0).build().is_err());
        assert!(ChannelOptions::new(10.0, 10.0, f64::NAN).build().is_err());
        let backwards = ChannelOptions {
            step: Some(-1.0),
            ..ChannelOptions::new(10.0, 10.0, 0.0)
        };
        assert!(backwards.build().is_err());
    }

    #[test]
    fn parses_json_config() {
        let json = r##"{
            "tickIntervalMs": 20,
            "outputScale": 2.0,
            "channels": [
                { "width": 600, "height": 100, "median": 512, "drawCount": 8,
                  "maxCacheSize": 2, "strokeStyle": "#FF0000", "lineCap": "square" },
                { "width": 600, "height": 100, "median": 512, "clearDirty": false }
            ]
        }"##;
        let config = RendererConfig::from_json_str(json).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
        assert_eq!(config.idle_timeout(), Duration::from_millis(2000));
        assert_eq!(config.output_scale, Some(2.0));
        let channels = config.build_channels().unwrap();
        assert_eq!(channels[0].max_queue_depth, 2);
        assert_eq!(channels[0].stroke.color, Color::RED);
        assert_eq!(channels[0].stroke.cap, LineCap::Square);
        assert!(!channels[1].clear_dirty);
    }

    #[test]
    fn rejects_empty_or_malformed_config() {
        assert!(matches!(
            RendererConfig::new(Vec::new()).build_channels(),
            Err(RenderError::NoChannels)
        ));
        assert!(matches!(
            RendererConfig::from_json_str("{\"channels\": 3}"),
            Err(RenderError::Config(_))
        ));
        let bad_colour = r#"{"channels":[{"width":1,"height":1,"median":0,"strokeStyle":"mauve"}]}"#;
        assert!(RendererConfig::from_json_str(bad_colour).is_err());
    }

    #[test]
    fn bedside_preset_matches_layout() {
        let channels = RendererConfig::bedside_monitor(600.0, 200.0)
            .build_channels()
            .unwrap();
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].draw_count, 8);
        assert_eq!(channels[0].base_line, 50.0);
        assert_eq!(channels[1].step, 4.0);
        assert_eq!(channels[1].start_y, 98.0);
        assert!(!channels[2].clear_dirty);
        assert_eq!(channels[2].start_y, 102.0);
        assert_eq!(channels[2].stroke.color, Color::YELLOW);
    }
}

// 波形渲染核心：通道缓冲、调度与绘制表面

pub mod channel;
pub mod clock;
pub mod config;
pub mod error;
pub mod grid;
pub mod raster;
pub mod renderer;
pub mod scheduler;
pub mod surface;

// 公开导出常用类型，方便外部调用
pub use channel::{ChannelBuffer, Cursor};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ChannelConfig, ChannelOptions, RendererConfig};
pub use error::RenderError;
pub use grid::draw_grid;
pub use raster::RasterSurface;
pub use renderer::{IngestGate, RendererState, WaveRenderer};
pub use scheduler::{TickSchedule, TickToken};
pub use surface::{
    Color, LineCap, LineJoin, Point, Rect, RecordingSurface, RenderSurface, StrokeStyle, SurfaceOp,
};

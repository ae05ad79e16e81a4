//! Real-time sweep rendering of multi-channel physiological waveforms.
//!
//! Sample batches arrive in irregular bursts through [`WaveRenderer::ingest`]
//! and are painted at a fixed tick rate onto a [`RenderSurface`]. See
//! [`render`] for the core and [`transport`] for the device subscription glue.

pub mod render;
pub mod transport;

pub use render::{
    ChannelOptions, RenderError, RenderSurface, RendererConfig, RendererState, WaveRenderer,
};
pub use transport::{DevicePacket, PacketSink, Subscriptions};

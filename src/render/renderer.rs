use std::time::{Duration, Instant};
use log::{debug, error, info, trace, warn};
use crate::render::channel::ChannelBuffer;
use crate::render::clock::{Clock, SystemClock};
use crate::render::config::RendererConfig;
use crate::render::scheduler::{TickSchedule, TickToken};
use crate::render::surface::RenderSurface;
use crate::render::RenderError;

/// Whether `ingest` takes new batches.
///
/// `pause()` opens the gate and `resume()` closes it. Data arriving while
/// paused therefore restarts the sweep on its own, while a freshly resumed
/// renderer ignores data until its first idle pause reopens the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestGate {
    Accepting,
    Suppressing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererState {
    /// No ticks; new data does not restart them.
    Stopped,
    Running,
    /// No ticks; the next accepted batch restarts them.
    Paused,
}

/// Multi-channel sweep renderer driven by a fixed-interval tick.
///
/// All mutation happens on the caller's thread: hosts call [`WaveRenderer::poll`]
/// (or `due_tick`/`run_tick`) from the same loop that delivers data through
/// [`WaveRenderer::ingest`].
pub struct WaveRenderer<S, C = SystemClock> {
    surface: S,
    clock: C,
    channels: Vec<ChannelBuffer>,
    gate: IngestGate,
    schedule: Option<TickSchedule>,
    generation: u64,
    recover_on_next_push: bool,
    last_receive: Option<Instant>,
    tick_interval: Duration,
    idle_timeout: Duration,
}

impl<S: RenderSurface> WaveRenderer<S, SystemClock> {
    pub fn new(surface: S, config: &RendererConfig) -> Result<Self, RenderError> {
        Self::with_clock(surface, config, SystemClock)
    }
}

impl<S: RenderSurface, C: Clock> WaveRenderer<S, C> {
    pub fn with_clock(mut surface: S, config: &RendererConfig, clock: C) -> Result<Self, RenderError> {
        let channels: Vec<ChannelBuffer> = config
            .build_channels()?
            .into_iter()
            .map(ChannelBuffer::new)
            .collect();
        if let Some(ratio) = config.output_scale {
            let (width, height) = (surface.width(), surface.height());
            surface.configure_output_scale(ratio, width, height)?;
        }
        debug!(
            "renderer ready: {} channel(s), tick {:?}, idle after {:?}",
            channels.len(),
            config.tick_interval(),
            config.idle_timeout()
        );
        Ok(Self {
            surface,
            clock,
            channels,
            gate: IngestGate::Accepting,
            schedule: None,
            generation: 0,
            recover_on_next_push: false,
            last_receive: None,
            tick_interval: config.tick_interval(),
            idle_timeout: config.idle_timeout(),
        })
    }

    pub fn state(&self) -> RendererState {
        match (self.schedule.is_some(), self.recover_on_next_push) {
            (true, _) => RendererState::Running,
            (false, true) => RendererState::Paused,
            (false, false) => RendererState::Stopped,
        }
    }

    pub fn gate(&self) -> IngestGate {
        self.gate
    }

    pub fn channels(&self) -> &[ChannelBuffer] {
        &self.channels
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn last_receive(&self) -> Option<Instant> {
        self.last_receive
    }

    /// Accepts one batch per channel, in channel order. Extra batches are ignored;
    /// channels without a batch get nothing. Returns whether the data was taken.
    /// A call whose batches are all empty counts as no data: it is refused and
    /// does not re-arm the idle timeout.
    pub fn ingest(&mut self, batches: Vec<Vec<f64>>) -> bool {
        if !self.accepting() || batches.iter().all(Vec::is_empty) {
            return false;
        }
        self.mark_received();
        for (channel, batch) in self.channels.iter_mut().zip(batches) {
            channel.push(batch);
        }
        self.recover_if_idle();
        true
    }

    pub fn ingest_channel(&mut self, index: usize, batch: Vec<f64>) -> bool {
        if !self.accepting() || batch.is_empty() {
            return false;
        }
        let Some(channel) = self.channels.get_mut(index) else {
            debug!("dropping batch for unknown channel {index}");
            return false;
        };
        channel.push(batch);
        self.mark_received();
        self.recover_if_idle();
        true
    }

    fn accepting(&self) -> bool {
        if self.gate == IngestGate::Suppressing {
            trace!("ingest suppressed");
            return false;
        }
        true
    }

    fn mark_received(&mut self) {
        let now = self.clock.now();
        self.last_receive = Some(self.last_receive.map_or(now, |prev| prev.max(now)));
    }

    fn recover_if_idle(&mut self) {
        if self.schedule.is_none() && self.recover_on_next_push {
            info!("data arrived while paused, restarting ticks");
            self.start_schedule(true);
        }
    }

    pub fn start(&mut self) {
        self.start_schedule(true);
    }

    /// Explicit stop: later data does not restart the ticks.
    pub fn stop(&mut self) {
        self.stop_schedule(false);
        self.recover_on_next_push = false;
    }

    pub fn pause(&mut self) {
        self.gate = IngestGate::Accepting;
        self.reset_queues();
        self.stop_schedule(true);
        self.clear_view();
    }

    pub fn resume(&mut self) {
        self.clear_view();
        self.reset_queues();
        self.start_schedule(true);
        self.gate = IngestGate::Suppressing;
    }

    fn start_schedule(&mut self, recover: bool) {
        if self.schedule.is_some() {
            return;
        }
        self.generation += 1;
        self.schedule = Some(TickSchedule::start(
            self.generation,
            self.tick_interval,
            self.clock.now(),
        ));
        self.recover_on_next_push = recover;
        debug!("ticks started (generation {})", self.generation);
    }

    fn stop_schedule(&mut self, recover: bool) {
        if self.schedule.take().is_some() {
            self.recover_on_next_push = recover;
            debug!("ticks cancelled (recover on push: {recover})");
        }
    }

    fn reset_queues(&mut self) {
        for channel in &mut self.channels {
            channel.reset_queue();
        }
    }

    /// Clears every channel region. A failing channel is logged and skipped.
    pub fn clear_view(&mut self) {
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if let Err(err) = channel.clear(&mut self.surface) {
                error!("channel {index}: failed to clear region: {err}");
            }
        }
    }

    /// One paint pass over every channel in construction order. When nothing
    /// was painted and no data arrived within the idle timeout, the view is
    /// cleared and the renderer pauses.
    pub fn tick(&mut self) -> bool {
        // a lone channel owns the surface and commits once per tick
        let single = self.channels.len() == 1;
        let mut any_drew = false;
        for (index, channel) in self.channels.iter_mut().enumerate() {
            let drew = match channel.tick(&mut self.surface, !single) {
                Ok(drew) => drew,
                Err(err) => {
                    warn!("channel {index}: paint failed: {err}");
                    true
                }
            };
            if single && drew {
                if let Err(err) = channel.flush(&mut self.surface) {
                    warn!("channel {index}: stroke failed: {err}");
                }
            }
            any_drew |= drew;
        }
        if !any_drew && self.idle() {
            info!("no data for {:?}, pausing", self.idle_timeout);
            self.pause();
        }
        any_drew
    }

    fn idle(&self) -> bool {
        self.last_receive.map_or(true, |at| {
            self.clock.now().saturating_duration_since(at) >= self.idle_timeout
        })
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.schedule.as_ref().map(TickSchedule::next_due)
    }

    pub fn due_tick(&self) -> Option<TickToken> {
        self.schedule.as_ref()?.due(self.clock.now())
    }

    /// Runs a previously obtained tick. Returns `None` when the schedule that
    /// issued `token` has been cancelled or replaced in the meantime.
    pub fn run_tick(&mut self, token: TickToken) -> Option<bool> {
        let now = self.clock.now();
        match self.schedule.as_mut() {
            Some(schedule) if schedule.accepts(token) => schedule.advance(now),
            _ => {
                trace!("skipping stale tick");
                return None;
            }
        }
        Some(self.tick())
    }

    /// Runs at most one tick if one is due.
    pub fn poll(&mut self) -> Option<bool> {
        let token = self.due_tick()?;
        self.run_tick(token)
    }
}

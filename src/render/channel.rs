use std::collections::VecDeque;
use crate::render::config::ChannelConfig;
use crate::render::surface::{Point, Rect, RenderSurface};
use crate::render::RenderError;

/// Draw position of a channel's sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
}

impl Cursor {
    /// Start of a fresh sweep: one step left of the edge, on the baseline.
    pub fn origin(base_line: f64) -> Self {
        Self { x: -1.0, y: base_line }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn advance(self, step: f64, y: f64) -> Self {
        Self { x: self.x + step, y }
    }

    /// Back to the left edge; y keeps the last painted value.
    fn wrapped(self) -> Self {
        Self { x: -1.0, ..self }
    }
}

/// Immutable batch plus read offset.
#[derive(Debug)]
struct ActiveBatch {
    samples: Vec<f64>,
    offset: usize,
}

impl ActiveBatch {
    fn remaining(&self) -> usize {
        self.samples.len() - self.offset
    }

    fn take(&mut self, max: usize) -> &[f64] {
        let end = self.offset + max.min(self.remaining());
        let taken = &self.samples[self.offset..end];
        self.offset = end;
        taken
    }
}

/// One channel's pending sample batches and sweep state.
#[derive(Debug)]
pub struct ChannelBuffer {
    config: ChannelConfig,
    pending: VecDeque<Vec<f64>>,
    active: Option<ActiveBatch>,
    cursor: Cursor,
    deferred: Vec<Vec<Point>>,
}

impl ChannelBuffer {
    pub fn new(config: ChannelConfig) -> Self {
        let cursor = Cursor::origin(config.base_line);
        Self {
            config,
            pending: VecDeque::new(),
            active: None,
            cursor,
            deferred: Vec::new(),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Samples not painted yet, across the active batch and the queue.
    pub fn backlog_samples(&self) -> usize {
        let active = self.active.as_ref().map_or(0, ActiveBatch::remaining);
        active + self.pending.iter().map(Vec::len).sum::<usize>()
    }

    /// Queues a batch for painting; empty batches are dropped.
    pub fn push(&mut self, batch: Vec<f64>) {
        if batch.is_empty() {
            return;
        }
        self.pending.push_back(batch);
    }

    /// Discards queued and in-progress samples without painting them.
    pub fn reset_queue(&mut self) {
        self.pending.clear();
        self.active = None;
        self.deferred.clear();
    }

    /// Clears the whole channel region and restarts the sweep.
    pub fn clear<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) -> Result<(), RenderError> {
        self.cursor = Cursor::origin(self.config.base_line);
        self.deferred.clear();
        let cfg = &self.config;
        surface.clear_region(Rect::new(cfg.start_x, cfg.start_y, cfg.width, cfg.height))
    }

    fn backlogged(&self) -> bool {
        self.config.max_queue_depth != 0 && self.pending.len() >= self.config.max_queue_depth
    }

    /// One scheduler pass. Paints a single segment, or keeps draining while the
    /// queue is at or above `max_queue_depth`. Returns whether anything was painted.
    ///
    /// With `commit == false` segments are held until [`ChannelBuffer::flush`].
    pub fn tick<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        commit: bool,
    ) -> Result<bool, RenderError> {
        let mut drew = false;
        loop {
            if self.active.as_ref().is_some_and(|batch| batch.remaining() > 0) {
                self.paint_segment(surface, commit)?;
                drew = true;
                if !self.backlogged() {
                    return Ok(true);
                }
                continue;
            }
            match self.pending.pop_front() {
                Some(samples) => self.active = Some(ActiveBatch { samples, offset: 0 }),
                None => {
                    self.active = None;
                    return Ok(drew);
                }
            }
        }
    }

    fn paint_segment<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        commit: bool,
    ) -> Result<(), RenderError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        let cfg = &self.config;
        if cfg.clear_dirty {
            surface.clear_region(Rect::new(self.cursor.x, cfg.start_y, cfg.padding, cfg.height))?;
        }
        let mut path = Vec::with_capacity(cfg.draw_count + 1);
        path.push(self.cursor.point());
        let mut cursor = self.cursor;
        for &sample in active.take(cfg.draw_count) {
            cursor = cursor.advance(cfg.step, cfg.y_for(sample));
            path.push(cursor.point());
        }
        self.cursor = if cursor.x >= cfg.width {
            cursor.wrapped()
        } else {
            cursor
        };
        if commit {
            surface.stroke_path(&path, &cfg.stroke)
        } else {
            self.defer(path);
            Ok(())
        }
    }

    fn defer(&mut self, path: Vec<Point>) {
        if let Some(last) = self.deferred.last_mut() {
            if last.last() == path.first() {
                last.extend_from_slice(&path[1..]);
                return;
            }
        }
        self.deferred.push(path);
    }

    /// Commits segments held back by a non-committing tick.
    pub fn flush<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) -> Result<(), RenderError> {
        for path in self.deferred.drain(..) {
            surface.stroke_path(&path, &self.config.stroke)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::config::ChannelOptions;
    use crate::render::surface::RecordingSurface;

    fn channel(draw_count: usize, width: f64, max_queue_depth: usize) -> ChannelBuffer {
        let options = ChannelOptions {
            draw_count: Some(draw_count),
            max_queue_depth: Some(max_queue_depth),
            base_line: Some(0.0),
            ..ChannelOptions::new(width, 20.0, 0.0)
        };
        ChannelBuffer::new(options.build().unwrap())
    }

    fn painted_xs(surface: &RecordingSurface) -> Vec<f64> {
        // the first point of each stroke is the previous cursor position
        surface
            .strokes()
            .flat_map(|points| points[1..].iter().map(|p| p.x))
            .collect()
    }

    #[test]
    fn drains_two_batches_in_order() {
        let mut ch = channel(2, 10.0, 0);
        let mut surface = RecordingSurface::new(10.0, 20.0);
        ch.push(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        ch.push(vec![6.0, 7.0]);
        let mut ticks = 0;
        while ch.tick(&mut surface, true).unwrap() {
            ticks += 1;
        }

        // [1,2] [3,4] [5] [6,7]
        assert_eq!(ticks, 4);
        assert_eq!(painted_xs(&surface), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let ys: Vec<f64> = surface
            .strokes()
            .flat_map(|points| points[1..].iter().map(|p| p.y))
            .collect();
        assert_eq!(ys, vec![-1.0, -2.0, -3.0, -4.0, -5.0, -6.0, -7.0]);
        assert_eq!(ch.pending_len(), 0);
        assert_eq!(ch.backlog_samples(), 0);
        assert!(!ch.tick(&mut surface, true).unwrap());
    }

    #[test]
    fn every_pushed_sample_is_painted_once() {
        let mut ch = channel(3, 1000.0, 0);
        let mut surface = RecordingSurface::new(1000.0, 20.0);
        let mut expected = Vec::new();
        for len in [4usize, 1, 7, 2, 9] {
            let batch: Vec<f64> = (0..len).map(|i| (expected.len() + i) as f64).collect();
            expected.extend(batch.iter().map(|v| -v));
            ch.push(batch);
            ch.tick(&mut surface, true).unwrap();
        }
        while ch.tick(&mut surface, true).unwrap() {}
        let ys: Vec<f64> = surface
            .strokes()
            .flat_map(|points| points[1..].iter().map(|p| p.y))
            .collect();
        assert_eq!(ys, expected);
    }

    #[test]
    fn backlog_drains_several_batches_in_one_tick() {
        let mut ch = channel(2, 1000.0, 2);
        let mut surface = RecordingSurface::new(1000.0, 20.0);
        for _ in 0..5 {
            ch.push(vec![1.0, 2.0, 3.0, 4.0]);
        }
        assert!(ch.tick(&mut surface, true).unwrap());
        let painted = painted_xs(&surface).len();
        assert!(painted > 4, "painted {painted} samples");
        // stops as soon as the queue falls below the threshold
        assert_eq!(ch.pending_len(), 1);
        // without catch-up only one segment goes out
        let mut steady = channel(2, 1000.0, 0);
        let mut steady_surface = RecordingSurface::new(1000.0, 20.0);
        for _ in 0..5 {
            steady.push(vec![1.0, 2.0, 3.0, 4.0]);
        }
        steady.tick(&mut steady_surface, true).unwrap();
        assert_eq!(painted_xs(&steady_surface).len(), 2);
    }

    #[test]
    fn wrap_resets_x_but_keeps_y() {
        let mut ch = channel(4, 3.0, 0);
        let mut surface = RecordingSurface::new(3.0, 20.0);
        ch.push(vec![5.0, 6.0, 7.0, 8.0, 9.0]);
        ch.tick(&mut surface, true).unwrap();
        assert_eq!(ch.cursor(), Cursor { x: -1.0, y: -8.0 });
        ch.tick(&mut surface, true).unwrap();
        let last = surface.strokes().last().unwrap().to_vec();
        assert_eq!(last[0], Point::new(-1.0, -8.0));
        assert_eq!(last[1], Point::new(0.0, -9.0));
    }

    #[test]
    fn clears_dirty_strip_ahead_of_cursor() {
        let mut ch = channel(2, 100.0, 0);
        let mut surface = RecordingSurface::new(100.0, 20.0);
        ch.push(vec![0.0, 0.0, 0.0, 0.0]);
        ch.tick(&mut surface, true).unwrap();
        ch.tick(&mut surface, true).unwrap();
        let clears: Vec<Rect> = surface.clears().copied().collect();
        assert_eq!(
            clears,
            vec![Rect::new(-1.0, 0.0, 16.0, 20.0), Rect::new(1.0, 0.0, 16.0, 20.0)]
        );
    }

    #[test]
    fn clear_and_reset_restore_initial_state() {
        let mut ch = channel(1, 100.0, 0);
        let mut surface = RecordingSurface::new(100.0, 20.0);
        ch.push(vec![3.0, 4.0]);
        ch.push(vec![5.0]);
        ch.push(Vec::new());
        assert_eq!(ch.pending_len(), 2);
        ch.tick(&mut surface, true).unwrap();
        ch.reset_queue();
        assert_eq!(ch.backlog_samples(), 0);
        assert!(!ch.tick(&mut surface, true).unwrap());
        ch.clear(&mut surface).unwrap();
        assert_eq!(ch.cursor(), Cursor::origin(0.0));
        assert_eq!(
            surface.clears().last(),
            Some(&Rect::new(0.0, 0.0, 100.0, 20.0))
        );
    }

    #[test]
    fn deferred_segments_merge_into_one_stroke() {
        let mut ch = channel(2, 1000.0, 2);
        let mut surface = RecordingSurface::new(1000.0, 20.0);
        for _ in 0..3 {
            ch.push(vec![1.0, 2.0]);
        }
        assert!(ch.tick(&mut surface, false).unwrap());
        assert_eq!(surface.strokes().count(), 0);
        ch.flush(&mut surface).unwrap();
        let strokes: Vec<Vec<Point>> = surface.strokes().map(<[Point]>::to_vec).collect();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].len(), 5);
    }
}

use std::time::{Duration, Instant};

/// Per-interval loop rates, emitted as a structured log event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LoopRates {
    pub(crate) fps: f32,
    pub(crate) tps: f32,
    pub(crate) avg_frame_ms: f32,
}

/// Accumulates frame and tick counts over a fixed interval, then collapses
/// them into rates and resets.
#[derive(Debug)]
pub(crate) struct RateMeter {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
}

impl RateMeter {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval_start: Instant::now(),
            interval,
            frames: 0,
            ticks: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub(crate) fn maybe_rates(&mut self, now: Instant) -> Option<LoopRates> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let avg_frame_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };

        let rates = LoopRates {
            fps: self.frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            avg_frame_ms,
        };

        self.interval_start = now;
        self.frames = 0;
        self.ticks = 0;
        self.frame_time_sum = Duration::ZERO;

        Some(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_reflect_recorded_frames_and_ticks() {
        let mut meter = RateMeter::new(Duration::from_secs(1));
        let base = Instant::now();

        meter.record_frame(Duration::from_millis(16));
        meter.record_frame(Duration::from_millis(16));
        for _ in 0..4 {
            meter.record_tick();
        }

        let rates = meter
            .maybe_rates(base + Duration::from_secs(1))
            .expect("interval elapsed");

        assert!((rates.fps - 2.0).abs() < 0.05);
        assert!((rates.tps - 4.0).abs() < 0.05);
        assert!((rates.avg_frame_ms - 16.0).abs() < 0.001);
    }

    #[test]
    fn no_rates_before_interval_elapses() {
        let mut meter = RateMeter::new(Duration::from_secs(1));
        let base = Instant::now();
        meter.record_frame(Duration::from_millis(16));

        assert!(meter.maybe_rates(base + Duration::from_millis(500)).is_none());
    }

    #[test]
    fn counters_reset_after_emitting() {
        let mut meter = RateMeter::new(Duration::from_secs(1));
        let base = Instant::now();
        meter.record_frame(Duration::from_millis(10));
        meter.record_tick();

        let first = meter.maybe_rates(base + Duration::from_secs(1));
        assert!(first.is_some());

        let second = meter
            .maybe_rates(base + Duration::from_secs(3))
            .expect("second interval elapsed");
        assert_eq!(second.fps, 0.0);
        assert_eq!(second.tps, 0.0);
        assert_eq!(second.avg_frame_ms, 0.0);
    }
}

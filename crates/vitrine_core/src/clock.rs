use std::time::{Duration, Instant};

const FPS_SAMPLE_COUNT: usize = 60;

/// Timing snapshot produced once per frame while the clock runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Seconds since the previous tick, clamped to `max_delta`.
    pub delta: f32,
    /// Seconds of *running* time since the clock was last reset. Intervals
    /// spent stopped are not counted.
    pub elapsed: f32,
}

/// Pause-aware frame clock.
///
/// The clock only accumulates wall-clock time while running: `stop()` banks
/// the time played so far and `start()` re-arms the delta baseline, so a
/// pause of any length never shows up in `elapsed` and never produces a
/// delta spike on resume.
#[derive(Debug, Clone)]
pub struct PlayClock {
    running: bool,
    last_instant: Option<Instant>,
    elapsed: Duration,

    /// Spiral-of-death cap: a single frame delta never exceeds this.
    pub max_delta: Duration,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl PlayClock {
    pub fn new() -> Self {
        Self {
            running: false,
            last_instant: None,
            elapsed: Duration::ZERO,
            max_delta: Duration::from_millis(250),
            fps_samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 60.0,
            smoothed_frame_time_ms: 16.667,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Running time accumulated so far, in seconds.
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Starts (or resumes) the clock. Idempotent while already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_instant = Some(Instant::now());
    }

    /// Stops the clock, banking the running time since the last tick.
    /// Idempotent while already stopped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        if let Some(last) = self.last_instant.take() {
            let banked = self.clamp_delta(last.elapsed());
            self.elapsed += banked;
        }
        self.running = false;
    }

    /// Stops the clock and discards all accumulated time.
    pub fn reset(&mut self) {
        self.running = false;
        self.last_instant = None;
        self.elapsed = Duration::ZERO;
    }

    /// Advances the clock and returns the new snapshot.
    ///
    /// Ticking a stopped clock is harmless: it reports a zero delta and the
    /// banked elapsed time.
    pub fn tick(&mut self) -> FrameTick {
        if !self.running {
            return FrameTick {
                delta: 0.0,
                elapsed: self.elapsed.as_secs_f32(),
            };
        }

        let now = Instant::now();
        let raw = self
            .last_instant
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        let delta = self.clamp_delta(raw);
        self.last_instant = Some(now);
        self.elapsed += delta;

        // FPS smoothing over the last FPS_SAMPLE_COUNT ticks.
        self.fps_samples[self.fps_sample_index] = delta.as_secs_f64();
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };

        FrameTick {
            delta: delta.as_secs_f32(),
            elapsed: self.elapsed.as_secs_f32(),
        }
    }

    fn clamp_delta(&self, raw: Duration) -> Duration {
        if raw > self.max_delta {
            log::warn!(
                "Frame took {:.1}ms — capping delta to {}ms",
                raw.as_secs_f64() * 1000.0,
                self.max_delta.as_millis()
            );
            self.max_delta
        } else {
            raw
        }
    }
}

impl Default for PlayClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn new_clock_is_stopped_with_zero_elapsed() {
        let clock = PlayClock::new();
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed_secs(), 0.0);
    }

    #[test]
    fn tick_while_stopped_reports_zero_delta() {
        let mut clock = PlayClock::new();
        let tick = clock.tick();
        assert_eq!(tick.delta, 0.0);
        assert_eq!(tick.elapsed, 0.0);
    }

    #[test]
    fn elapsed_is_monotonic_and_delta_non_negative() {
        let mut clock = PlayClock::new();
        clock.start();

        let mut previous_elapsed = 0.0;
        for _ in 0..5 {
            sleep(Duration::from_millis(2));
            let tick = clock.tick();
            assert!(tick.delta >= 0.0, "delta must never be negative");
            assert!(
                tick.elapsed >= previous_elapsed,
                "elapsed must be monotonic: {} then {}",
                previous_elapsed,
                tick.elapsed
            );
            previous_elapsed = tick.elapsed;
        }
    }

    #[test]
    fn stopped_interval_is_excluded_from_elapsed() {
        let mut clock = PlayClock::new();
        clock.start();
        sleep(Duration::from_millis(20));
        clock.tick();
        clock.stop();

        // None of this interval may be counted.
        sleep(Duration::from_millis(120));

        clock.start();
        let tick = clock.tick();
        assert!(
            tick.elapsed < 0.1,
            "elapsed {} must exclude the 120ms stopped interval",
            tick.elapsed
        );
        assert!(
            tick.delta < 0.1,
            "resume must not produce a delta spike, got {}",
            tick.delta
        );
    }

    #[test]
    fn stop_banks_time_since_last_tick() {
        let mut clock = PlayClock::new();
        clock.start();
        sleep(Duration::from_millis(15));
        clock.stop();
        assert!(
            clock.elapsed_secs() > 0.0,
            "time between start and stop should be banked even without a tick"
        );
    }

    #[test]
    fn delta_is_clamped_to_max_delta() {
        let mut clock = PlayClock::new();
        clock.max_delta = Duration::from_millis(5);
        clock.start();
        sleep(Duration::from_millis(30));
        let tick = clock.tick();
        assert!(
            tick.delta <= 0.006,
            "delta {} should be capped near 5ms",
            tick.delta
        );
    }

    #[test]
    fn reset_discards_accumulated_time() {
        let mut clock = PlayClock::new();
        clock.start();
        sleep(Duration::from_millis(5));
        clock.tick();
        clock.reset();
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed_secs(), 0.0);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut clock = PlayClock::new();
        clock.start();
        clock.start();
        assert!(clock.is_running());
        clock.stop();
        let banked = clock.elapsed_secs();
        clock.stop();
        assert_eq!(clock.elapsed_secs(), banked);
    }
}

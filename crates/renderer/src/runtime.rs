use std::time::{Duration, Instant};

/// Snapshot of the clock handed to the compositor each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Seconds since the source was created or reset.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    fn reset(&mut self);
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.origin.elapsed().as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that advances by a fixed step per sample.
#[derive(Debug, Clone, Copy)]
pub struct SteppedTimeSource {
    step: f32,
    frame: u64,
}

impl SteppedTimeSource {
    pub fn new(step: f32) -> Self {
        Self { step, frame: 0 }
    }
}

impl TimeSource for SteppedTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.frame as f32 * self.step, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Turns successive time samples into per-frame deltas.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameClock {
    last: Option<f32>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick; the first tick reports zero.
    pub fn tick(&mut self, sample: TimeSample) -> f32 {
        let delta = self
            .last
            .map(|last| (sample.seconds - last).max(0.0))
            .unwrap_or(0.0);
        self.last = Some(sample.seconds);
        delta
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Decides when the next frame may be drawn.
///
/// Without a cap every wake-up renders and presentation pacing comes from the
/// swapchain; with a cap frames are spaced by `1 / fps`.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    last_render: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)));
        Self {
            interval,
            last_render: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.last_render) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.interval, self.last_render) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.last_render = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_clock_reports_deltas() {
        let mut source = SteppedTimeSource::new(0.5);
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(source.sample()), 0.0);
        assert!((clock.tick(source.sample()) - 0.5).abs() < 1e-6);
        assert!((clock.tick(source.sample()) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn frame_clock_never_runs_backwards() {
        let mut clock = FrameClock::new();
        clock.tick(TimeSample::new(2.0, 0));
        assert_eq!(clock.tick(TimeSample::new(1.0, 1)), 0.0);
    }

    #[test]
    fn uncapped_scheduler_is_always_ready() {
        let mut scheduler = FrameScheduler::new(None);
        let now = Instant::now();
        scheduler.mark_rendered(now);
        assert!(scheduler.ready_for_frame(now));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn capped_scheduler_spaces_frames() {
        let mut scheduler = FrameScheduler::new(Some(10.0));
        let now = Instant::now();
        assert!(scheduler.ready_for_frame(now));
        scheduler.mark_rendered(now);
        assert!(!scheduler.ready_for_frame(now + Duration::from_millis(50)));
        assert!(scheduler.ready_for_frame(now + Duration::from_millis(120)));
        let deadline = scheduler.next_deadline().expect("deadline");
        assert!(deadline > now + Duration::from_millis(99));
        assert!(deadline < now + Duration::from_millis(101));
    }

    #[test]
    fn zero_fps_is_uncapped() {
        assert!(FrameScheduler::new(Some(0.0)).interval().is_none());
    }
}

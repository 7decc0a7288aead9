use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use smallvec::{smallvec, SmallVec};

const CACHED_DELTA_TIMES_COUNT: usize = 20;

/// Largest step the simulation takes in one frame, so a suspended window does not teleport the camera on resume.
pub const DEFAULT_MAX_DELTA: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct Time {
    frame_count: usize,
    frame_time: Instant,
    raw_delta_time: Duration,
    delta_time: Duration,
    max_delta_time: Duration,
    total_time: Duration,
    start_time: Instant,
    delta_times: VecDeque<Duration>,
    fps: Stats,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub max: f64,
    pub min: f64,
    pub avg: f64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELTA)
    }
}

impl Time {
    pub fn new(max_delta_time: Duration) -> Self {
        let mut delta_times = VecDeque::new();
        delta_times.push_back(Duration::from_millis(10));
        Time {
            start_time: Instant::now(),
            total_time: Duration::ZERO,
            frame_count: 0,
            frame_time: Instant::now() - Duration::from_millis(10),
            raw_delta_time: Duration::from_millis(10),
            delta_time: Duration::from_millis(10),
            max_delta_time,
            delta_times,
            fps: Stats::default(),
        }
    }

    pub fn start_frame(&mut self) {
        let this_frame = Instant::now();
        self.total_time = this_frame - self.start_time;
        let raw = this_frame.duration_since(self.frame_time);
        self.frame_time = this_frame;
        self.advance(raw);
    }

    /// Steps the clock by an explicit raw delta. The reported [`Time::delta`] is clamped to the configured maximum.
    pub fn advance(&mut self, raw: Duration) {
        self.raw_delta_time = raw;
        self.delta_time = raw.min(self.max_delta_time);
        if self.delta_times.len() >= CACHED_DELTA_TIMES_COUNT {
            self.delta_times.pop_back();
        }
        self.delta_times.push_front(raw);
        self.frame_count += 1;
        self.fps = fps_stats(&self.delta_times);
    }
}

impl Time {
    pub fn fps(&self) -> f64 {
        self.fps.avg
    }

    pub fn worst_fps(&self) -> f64 {
        self.fps.min
    }

    #[inline(always)]
    pub fn delta(&self) -> &Duration {
        &self.delta_time
    }

    /// Clamped delta in seconds, what every per-frame update integrates with.
    #[inline(always)]
    pub fn delta_secs(&self) -> f32 {
        self.delta_time.as_secs_f32()
    }

    pub fn raw_delta(&self) -> &Duration {
        &self.raw_delta_time
    }

    pub fn total(&self) -> &Duration {
        &self.total_time
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }
}

fn fps_stats(delta_times: &VecDeque<Duration>) -> Stats {
    let mut fps: SmallVec<[f64; CACHED_DELTA_TIMES_COUNT]> = smallvec![];
    for d in delta_times {
        let secs = d.as_secs_f64();
        if secs > 0.0 {
            fps.push(1.0 / secs);
        }
    }
    if fps.is_empty() {
        return Stats::default();
    }
    let mut max: f64 = f64::MIN;
    let mut min: f64 = f64::MAX;
    let mut sum: f64 = 0.0;
    for e in fps.iter() {
        sum += *e;
        max = max.max(*e);
        min = min.min(*e);
    }
    Stats {
        max,
        min,
        avg: sum / fps.len() as f64,
    }
}

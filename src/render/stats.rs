use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Recent frame intervals kept for the jitter report.
pub const FRAME_INTERVAL_SAMPLES: usize = 30;

/// Worker phases timed per frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the caller's next submission.
    Caller,
    /// Bit-plane encoding into the locked surface.
    Encode,
    /// Surface unlock / upload.
    Update,
    /// Throttle sleep before present.
    Throttle,
    /// Present (flip), including vsync wait.
    Present,
}

impl Phase {
    const COUNT: usize = 5;

    const fn index(self) -> usize {
        match self {
            Self::Caller => 0,
            Self::Encode => 1,
            Self::Update => 2,
            Self::Throttle => 3,
            Self::Present => 4,
        }
    }
}

/// Counters written by the worker and read by anyone without locking.
#[derive(Debug, Default)]
pub struct StatsCell {
    numfr: AtomicU64,
    numerr: AtomicU64,
    num_dirty: AtomicU64,
    samples: AtomicU64,
    phase_nanos: [AtomicU64; Phase::COUNT],
    intervals_nanos: [AtomicU64; FRAME_INTERVAL_SAMPLES],
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

impl StatsCell {
    /// Zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `d` to the accumulator of `phase`.
    pub fn add_phase(&self, phase: Phase, d: Duration) {
        self.phase_nanos[phase.index()].fetch_add(nanos(d), Ordering::Relaxed);
    }

    /// Count a failed upload or present.
    pub fn record_error(&self) {
        self.numerr.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a submission that carried new pixels.
    pub fn record_dirty(&self) {
        self.num_dirty.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a presented frame, `interval` after the previous one.
    ///
    /// The first present of a canvas has no predecessor and passes `None`; it is counted but
    /// adds no interval sample.
    pub fn record_frame(&self, interval: Option<Duration>) {
        if let Some(interval) = interval {
            let n = self.samples.load(Ordering::Relaxed);
            self.intervals_nanos[(n % FRAME_INTERVAL_SAMPLES as u64) as usize]
                .store(nanos(interval), Ordering::Relaxed);
            self.samples.store(n + 1, Ordering::Release);
        }
        self.numfr.fetch_add(1, Ordering::Release);
    }

    /// Reset every counter and accumulator.
    pub fn clear(&self) {
        for c in [&self.numfr, &self.numerr, &self.num_dirty, &self.samples] {
            c.store(0, Ordering::Relaxed);
        }
        for c in self.phase_nanos.iter().chain(&self.intervals_nanos) {
            c.store(0, Ordering::Relaxed);
        }
    }

    /// Derive a report; `elapsed` is the canvas clock reading.
    pub fn snapshot(&self, elapsed: Duration) -> StatsSnapshot {
        let numfr = self.numfr.load(Ordering::Acquire);
        let samples = self.samples.load(Ordering::Acquire);
        let filled = (samples as usize).min(FRAME_INTERVAL_SAMPLES);
        // Once the ring has wrapped, the slot about to be overwritten holds the oldest sample.
        let oldest = if filled < FRAME_INTERVAL_SAMPLES {
            0
        } else {
            (samples % FRAME_INTERVAL_SAMPLES as u64) as usize
        };
        let frame_intervals_ms: Vec<f64> = (0..filled)
            .map(|k| {
                let slot = (oldest + k) % FRAME_INTERVAL_SAMPLES;
                self.intervals_nanos[slot].load(Ordering::Relaxed) as f64 / 1e6
            })
            .collect();
        let interval_secs: f64 = frame_intervals_ms.iter().sum::<f64>() / 1e3;
        let avg_fps = if interval_secs > 0.0 {
            filled as f64 / interval_secs
        } else {
            0.0
        };
        let elapsed_secs = elapsed.as_secs_f64();
        let fps = if elapsed_secs > 0.0 {
            numfr as f64 / elapsed_secs
        } else {
            0.0
        };
        let avg_ms = |phase: Phase| {
            if numfr == 0 {
                return 0.0;
            }
            self.phase_nanos[phase.index()].load(Ordering::Relaxed) as f64 / 1e6 / numfr as f64
        };

        StatsSnapshot {
            numfr,
            numerr: self.numerr.load(Ordering::Relaxed),
            num_dirty: self.num_dirty.load(Ordering::Relaxed),
            elapsed_secs,
            fps,
            avg_fps,
            caller_ms: avg_ms(Phase::Caller),
            encode_ms: avg_ms(Phase::Encode),
            update_ms: avg_ms(Phase::Update),
            throttle_ms: avg_ms(Phase::Throttle),
            present_ms: avg_ms(Phase::Present),
            frame_intervals_ms,
        }
    }
}

/// Point-in-time statistics report.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StatsSnapshot {
    /// Frames presented.
    pub numfr: u64,
    /// Failed uploads or presents.
    pub numerr: u64,
    /// Submissions that carried new pixels.
    pub num_dirty: u64,
    /// Canvas clock reading.
    pub elapsed_secs: f64,
    /// `numfr / elapsed_secs`.
    pub fps: f64,
    /// Frame rate over the recent interval samples.
    pub avg_fps: f64,
    /// Average per-frame wait for the caller, in ms.
    pub caller_ms: f64,
    /// Average per-frame encode time, in ms.
    pub encode_ms: f64,
    /// Average per-frame upload time, in ms.
    pub update_ms: f64,
    /// Average per-frame throttle sleep, in ms.
    pub throttle_ms: f64,
    /// Average per-frame present time, in ms.
    pub present_ms: f64,
    /// Up to [`FRAME_INTERVAL_SAMPLES`] recent present-to-present intervals in ms, oldest
    /// first.
    pub frame_intervals_ms: Vec<f64>,
}

/// Splits worker time into consecutive phases.
#[derive(Debug)]
pub struct PhaseTimer {
    mark: Instant,
}

impl PhaseTimer {
    /// Start timing now.
    pub fn start() -> Self {
        Self {
            mark: Instant::now(),
        }
    }

    /// Charge the time since the previous lap to `phase`.
    pub fn lap(&mut self, stats: &StatsCell, phase: Phase) {
        let now = Instant::now();
        stats.add_phase(phase, now - self.mark);
        self.mark = now;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/stats.rs"]
mod tests;

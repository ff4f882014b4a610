use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::search::Limits;

/// Wall-clock budgets for one `go`. The ideal usage cell is written only
/// by the main thread's adaptive logic and read by everyone, so a plain
/// atomic is enough.
pub struct TimeManager {
    start: Instant,
    pub max_usage: u64,
    ideal_usage: AtomicU64,
    pub self_timed: bool,
}

impl TimeManager {
    pub fn new(limits: &Limits, overhead: u64) -> Self {
        let (ideal, max, self_timed) = match *limits {
            Limits::MoveTime(ms) => {
                let budget = ms.saturating_sub(overhead).max(1);
                (budget, budget, false)
            }
            Limits::SelfClock {
                time,
                inc,
                moves_to_go,
            } => {
                let time = time.saturating_sub(overhead).max(1);
                let mtg = moves_to_go.unwrap_or(30).clamp(1, 50) as u64;

                let ideal = time / (mtg + 5) + inc;
                let max = (time / mtg.min(10) + inc).min(time);
                (ideal.min(max).max(1), max.max(1), true)
            }
            _ => (u64::MAX, u64::MAX, false),
        };

        Self {
            start: Instant::now(),
            max_usage: max,
            ideal_usage: AtomicU64::new(ideal),
            self_timed,
        }
    }

    #[inline(always)]
    pub fn elapsed(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[inline(always)]
    pub fn ideal_usage(&self) -> u64 {
        self.ideal_usage.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn hard_expired(&self) -> bool {
        self.max_usage != u64::MAX && self.elapsed() >= self.max_usage
    }

    #[inline(always)]
    pub fn ideal_expired(&self) -> bool {
        let ideal = self.ideal_usage();
        ideal != u64::MAX && self.elapsed() >= ideal
    }

    /// Stretch the soft budget by `percent`, never past the hard cap.
    pub fn scale_ideal(&self, percent: u64) {
        let ideal = self.ideal_usage();
        if ideal == u64::MAX {
            return;
        }
        let scaled = (ideal * percent / 100).min(self.max_usage);
        self.ideal_usage.store(scaled, Ordering::Relaxed);
    }
}

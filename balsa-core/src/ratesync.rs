use balsa_util::time::Instant;

/// C2: converts a frame count into a wall-clock sleep so playback writes
/// pace the nominal sample rate, without accumulating rounding error.
///
/// Every call to [`sync`](Self::sync) adds to a running total of frames
/// moved since the last [`reset`](Self::reset); the target wake time is
/// computed from that total against the anchor, not from the previous
/// sleep's target, so per-period rounding never compounds.
pub struct RateSynchronizer {
    rate: u32,
    anchor: Instant,
    frames_since_anchor: u64,
}

impl RateSynchronizer {
    pub fn new(rate: u32) -> Self {
        RateSynchronizer {
            rate,
            anchor: Instant::now(),
            frames_since_anchor: 0,
        }
    }

    /// Reset the anchor to now and the frame count to zero. Called whenever
    /// the worker re-enters the period loop after a resume.
    pub fn reset(&mut self) {
        self.anchor = Instant::now();
        self.frames_since_anchor = 0;
    }

    /// Block until the nominal wall-clock time for having moved
    /// `frames_since_anchor + frames` frames at `rate` has elapsed.
    pub fn sync(&mut self, frames: u64) {
        self.frames_since_anchor += frames;
        let target = self.anchor.add_micros(target_offset_micros(self.frames_since_anchor, self.rate));

        let now = Instant::now();
        if let Some(remaining) = target.checked_duration_since(now) {
            balsa_util::time::sleep(remaining);
        }
        // if we're already past target (consumer running behind), don't
        // sleep at all -- we'll never sleep negative time, and the next
        // call's target only grows from here.
    }
}

fn target_offset_micros(frames: u64, rate: u32) -> u64 {
    (frames * 1_000_000) / u64::from(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_math_is_exact_for_round_numbers() {
        assert_eq!(target_offset_micros(48_000, 48_000), 1_000_000);
        assert_eq!(target_offset_micros(24_000, 48_000), 500_000);
    }

    #[test]
    fn offset_math_does_not_accumulate_rounding_when_called_cumulatively() {
        // 1/3 second at 48kHz doesn't divide evenly; verify that computing
        // the cumulative offset directly (as sync() does) rather than
        // summing per-call deltas avoids drift.
        let rate = 48_000u32;
        let per_call_frames = 160u64; // 3.333ms, doesn't divide evenly into whole micros
        let mut cumulative = 0u64;
        let mut summed_deltas = 0u64;
        let mut prev_target = 0u64;

        for _ in 0..300 {
            cumulative += per_call_frames;
            let target = target_offset_micros(cumulative, rate);
            summed_deltas += target - prev_target;
            prev_target = target;
        }

        // the cumulative target and the sum of deltas must agree exactly --
        // this is what "anchor-based" pacing buys over re-deriving a fresh
        // delta from a possibly-rounded previous target each time.
        assert_eq!(summed_deltas, target_offset_micros(cumulative, rate));
    }

    #[test]
    fn reset_zeroes_frame_count() {
        let mut sync = RateSynchronizer::new(48_000);
        sync.frames_since_anchor = 12_345;
        sync.reset();
        assert_eq!(sync.frames_since_anchor, 0);
    }
}

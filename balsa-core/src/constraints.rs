//! Hardware constraints a stream reports at `hw_params` negotiation time
//! (§4.1). The transport only ever carries one format, so there's nothing
//! to pick between -- this exists to reject geometries the transport can't
//! service rather than to offer a choice.

/// PCM sample format. The daemon only ever hands out S16_LE transports, so
/// this is a single-variant enum rather than a bitmask of supported
/// formats, kept as an enum so a future second codec doesn't require
/// widening every call site that matches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    S16Le,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::S16Le => 2,
        }
    }
}

pub const MIN_PERIODS: u32 = 2;
pub const MAX_PERIODS: u32 = 1024;

/// Buffer and period size bounds, derived from the transport's rate and
/// channel count. `hw_params` rejects any request outside these bounds.
#[derive(Debug, Clone, Copy)]
pub struct Constraints {
    pub format: SampleFormat,
    pub channels: u16,
    pub rate: u32,
    pub min_period_bytes: usize,
    pub max_period_bytes: usize,
    pub min_periods: u32,
    pub max_periods: u32,
}

impl Constraints {
    /// Derive constraints for a transport of the given channel count and
    /// rate. Period bounds track roughly 10ms-500ms per period, matching
    /// the daemon's own FIFO sizing so a period never outgrows one write
    /// the daemon would do to the transport.
    pub fn for_transport(channels: u16, rate: u32) -> Self {
        let frame_size = SampleFormat::S16Le.bytes_per_sample() * channels as usize;
        let min_period_frames = (rate as usize * 10) / 1000;
        let max_period_frames = (rate as usize * 500) / 1000;
        Constraints {
            format: SampleFormat::S16Le,
            channels,
            rate,
            min_period_bytes: min_period_frames.max(1) * frame_size,
            max_period_bytes: max_period_frames.max(1) * frame_size,
            min_periods: MIN_PERIODS,
            max_periods: MAX_PERIODS,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.format.bytes_per_sample() * self.channels as usize
    }

    pub fn validate_period_bytes(&self, period_bytes: usize) -> Result<(), &'static str> {
        if period_bytes < self.min_period_bytes {
            return Err("period size below minimum");
        }
        if period_bytes > self.max_period_bytes {
            return Err("period size above maximum");
        }
        if period_bytes % self.frame_size() != 0 {
            return Err("period size not a whole number of frames");
        }
        Ok(())
    }

    pub fn validate_periods(&self, periods: u32) -> Result<(), &'static str> {
        if periods < self.min_periods || periods > self.max_periods {
            return Err("period count out of range");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cd_quality_stereo_bounds() {
        let c = Constraints::for_transport(2, 48_000);
        assert_eq!(c.frame_size(), 4);
        assert_eq!(c.min_period_bytes, 480 * 4);
        assert_eq!(c.max_period_bytes, 24_000 * 4);
    }

    #[test]
    fn rejects_unaligned_period_bytes() {
        let c = Constraints::for_transport(2, 48_000);
        assert!(c.validate_period_bytes(4801).is_err());
        assert!(c.validate_period_bytes(4800).is_ok());
    }

    #[test]
    fn rejects_periods_out_of_range() {
        let c = Constraints::for_transport(2, 48_000);
        assert!(c.validate_periods(1).is_err());
        assert!(c.validate_periods(2000).is_err());
        assert!(c.validate_periods(4).is_ok());
    }
}

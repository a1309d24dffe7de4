//! The seam between the PCM core and the host sound stack (§3, §4.1): the
//! mmap area and the consumer-side application pointer are owned by the
//! host, not by the stream. The worker asks through this trait rather than
//! touching host state directly.

use crate::ring::RingBufferView;

/// Implemented by the host sound stack integration (`balsa-pcm`'s plugin
/// glue) and handed to a [`crate::stream::Stream`] at `hw_params` time.
pub trait HostContext: Send + Sync {
    /// The consumer's current application pointer, in frames, modulo
    /// `hw_boundary`. The worker never advances this -- only reads it to
    /// compute available space.
    fn appl_ptr(&self) -> u64;

    /// Frames of headroom between `hw_ptr` and `appl_ptr`, in the direction
    /// that matters for this stream (space to write for playback, frames
    /// ready to read for capture).
    fn avail(&self, hw_ptr: u64, hw_boundary: u64, buffer_size: u64) -> u64;

    /// The mmap area backing this stream's buffer.
    fn ring(&self) -> RingBufferView;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::ring::MmapArea;
    use std::sync::Mutex;

    /// A `HostContext` over a plain heap buffer, for worker unit tests --
    /// no real mmap, no real consumer.
    pub struct FakeHost {
        _storage: Box<[u8]>,
        ring: RingBufferView,
        appl_ptr: Mutex<u64>,
    }

    impl FakeHost {
        pub fn new(buffer_size: u64, frame_size: usize) -> Self {
            let mut storage = vec![0u8; buffer_size as usize * frame_size].into_boxed_slice();
            let base = storage.as_mut_ptr();
            let area = unsafe { MmapArea::new(base, 0, frame_size as usize * 8) };
            FakeHost {
                _storage: storage,
                ring: RingBufferView::new(area, buffer_size),
                appl_ptr: Mutex::new(buffer_size),
            }
        }

        pub fn set_appl_ptr(&self, value: u64) {
            *self.appl_ptr.lock().unwrap() = value;
        }
    }

    impl HostContext for FakeHost {
        fn appl_ptr(&self) -> u64 {
            *self.appl_ptr.lock().unwrap()
        }

        fn avail(&self, hw_ptr: u64, _hw_boundary: u64, buffer_size: u64) -> u64 {
            let appl_ptr = self.appl_ptr();
            (appl_ptr.wrapping_sub(hw_ptr)).min(buffer_size)
        }

        fn ring(&self) -> RingBufferView {
            self.ring
        }
    }
}

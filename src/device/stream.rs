//! Scoped ownership of open video streams
//!
//! A [`StreamGuard`] owns exactly one open stream and closes it when dropped,
//! so every exit path (explicit close, device switch, error, early return,
//! session teardown) releases the camera.

use log::debug;

use super::traits::VideoStream;

/// Owns an open stream and closes it on drop
pub struct StreamGuard<S: VideoStream> {
    stream: S,
}

impl<S: VideoStream> StreamGuard<S> {
    /// Take ownership of a freshly opened stream
    pub fn new(stream: S) -> Self {
        debug!(
            "Acquired stream {} on device '{}'",
            stream.id(),
            stream.device_id()
        );
        Self { stream }
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Close the stream now
    pub fn release(self) {
        drop(self);
    }
}

impl<S: VideoStream> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        if self.stream.is_open() {
            debug!("Releasing stream {}", self.stream.id());
            self.stream.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::PlatformError;
    use image::RgbImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingStream {
        open: bool,
        closes: Arc<AtomicUsize>,
    }

    impl VideoStream for CountingStream {
        fn id(&self) -> u64 {
            7
        }

        fn device_id(&self) -> &str {
            "counting"
        }

        fn resolution(&self) -> (u32, u32) {
            (2, 2)
        }

        fn grab_frame(&mut self) -> Result<RgbImage, PlatformError> {
            Ok(RgbImage::new(2, 2))
        }

        fn close(&mut self) {
            if self.open {
                self.open = false;
                self.closes.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    fn counting() -> (CountingStream, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        (
            CountingStream {
                open: true,
                closes: Arc::clone(&closes),
            },
            closes,
        )
    }

    #[test]
    fn test_drop_closes_stream() {
        let (stream, closes) = counting();
        {
            let _guard = StreamGuard::new(stream);
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_closes_once() {
        let (stream, closes) = counting();
        let mut guard = StreamGuard::new(stream);
        guard.stream_mut().close();
        guard.release();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replacing_guard_closes_previous() {
        let (first, first_closes) = counting();
        let (second, second_closes) = counting();

        let mut slot = Some(StreamGuard::new(first));
        assert!(slot.is_some());
        slot = Some(StreamGuard::new(second));
        assert_eq!(first_closes.load(Ordering::SeqCst), 1);
        assert_eq!(second_closes.load(Ordering::SeqCst), 0);

        assert!(slot.as_ref().map(|g| g.stream().is_open()).unwrap_or(false));
        drop(slot);
        assert_eq!(second_closes.load(Ordering::SeqCst), 1);
    }
}

//! Mock media devices for testing without a real camera
//!
//! This module provides mock implementations of the media device traits that
//! simulate attached cameras with configurable failures and latency. Every
//! stream opened and closed is recorded in a [`StreamLedger`], so tests can
//! check that no camera is ever left open.

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use log::{debug, trace};
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::device::{
    MediaDeviceDescriptor, MediaDevices, PlatformError, StreamConstraints, VideoStream,
};

/// Configuration for mock device behavior
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    /// Fail device enumeration with this error
    pub enumerate_error: Option<PlatformError>,
    /// Fail every stream open with this error
    pub open_error: Option<PlatformError>,
    /// Fail this many opens with a "device busy" error, then succeed
    pub fail_next_opens: usize,
    /// Simulated device-enumeration latency
    pub enumerate_delay: Duration,
    /// Simulated device-open latency
    pub open_delay: Duration,
    /// Fail frame grabs with this error
    pub frame_error: Option<PlatformError>,
    /// Random open failure rate (percentage 0-100)
    pub random_failure_rate: u8,
    /// Largest frame size the simulated sensor delivers
    pub sensor_width: u32,
    pub sensor_height: u32,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self {
            enumerate_error: None,
            open_error: None,
            fail_next_opens: 0,
            enumerate_delay: Duration::ZERO,
            open_delay: Duration::ZERO,
            frame_error: None,
            random_failure_rate: 0,
            sensor_width: 1920,
            sensor_height: 1080,
        }
    }
}

impl MockDeviceConfig {
    /// The user declines camera access
    pub fn denied() -> Self {
        Self {
            open_error: Some(PlatformError::not_allowed()),
            ..Default::default()
        }
    }

    /// The platform has no video capture support
    pub fn unsupported() -> Self {
        Self {
            enumerate_error: Some(PlatformError::not_supported()),
            open_error: Some(PlatformError::not_supported()),
            ..Default::default()
        }
    }

    /// Cameras take a while to start
    pub fn slow(ms: u64) -> Self {
        Self {
            open_delay: Duration::from_millis(ms),
            ..Default::default()
        }
    }

    /// Opens fail at random
    pub fn flaky(failure_rate: u8) -> Self {
        Self {
            random_failure_rate: failure_rate.min(100),
            ..Default::default()
        }
    }

    /// Set the simulated sensor size
    pub fn with_sensor(mut self, width: u32, height: u32) -> Self {
        self.sensor_width = width;
        self.sensor_height = height;
        self
    }

    /// Set the enumeration latency
    pub fn with_enumerate_delay(mut self, ms: u64) -> Self {
        self.enumerate_delay = Duration::from_millis(ms);
        self
    }

    /// Set the open latency
    pub fn with_open_delay(mut self, ms: u64) -> Self {
        self.open_delay = Duration::from_millis(ms);
        self
    }
}

/// A stream lifecycle event recorded by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Opened { stream_id: u64, device_id: String },
    Closed { stream_id: u64 },
}

#[derive(Debug, Default)]
struct LedgerState {
    next_id: u64,
    open: BTreeMap<u64, String>,
    events: Vec<StreamEvent>,
    max_concurrent: usize,
    open_attempts: usize,
    last_constraints: Option<StreamConstraints>,
}

/// Shared record of every stream a mock backend opened and closed
#[derive(Debug, Clone, Default)]
pub struct StreamLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl StreamLedger {
    fn record_attempt(&self, constraints: &StreamConstraints) {
        let mut state = self.state.lock().unwrap();
        state.open_attempts += 1;
        state.last_constraints = Some(constraints.clone());
    }

    fn record_open(&self, device_id: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let stream_id = state.next_id;
        state.open.insert(stream_id, device_id.to_string());
        state.max_concurrent = state.max_concurrent.max(state.open.len());
        state.events.push(StreamEvent::Opened {
            stream_id,
            device_id: device_id.to_string(),
        });
        stream_id
    }

    fn record_close(&self, stream_id: u64) {
        let mut state = self.state.lock().unwrap();
        state.open.remove(&stream_id);
        state.events.push(StreamEvent::Closed { stream_id });
    }

    /// Streams currently open
    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().open.len()
    }

    /// Devices of the streams currently open
    pub fn open_device_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().open.values().cloned().collect()
    }

    pub fn opened_total(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, StreamEvent::Opened { .. }))
            .count()
    }

    pub fn closed_total(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, StreamEvent::Closed { .. }))
            .count()
    }

    /// Most streams that were ever open at the same time
    pub fn max_concurrent(&self) -> usize {
        self.state.lock().unwrap().max_concurrent
    }

    pub fn open_attempts(&self) -> usize {
        self.state.lock().unwrap().open_attempts
    }

    pub fn last_constraints(&self) -> Option<StreamConstraints> {
        self.state.lock().unwrap().last_constraints.clone()
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.state.lock().unwrap().events.clone()
    }
}

/// A simulated open camera stream
///
/// Dropping a mock stream without closing it leaves it open in the ledger,
/// which is how leaks show up in tests.
#[derive(Debug)]
pub struct MockStream {
    id: u64,
    device_id: String,
    width: u32,
    height: u32,
    open: bool,
    frames: u64,
    frame_error: Option<PlatformError>,
    ledger: StreamLedger,
}

impl MockStream {
    /// Synthetic test pattern with a little sensor noise
    fn render(&self) -> RgbImage {
        let mut rng = rand::thread_rng();
        let (width, height) = (self.width.max(1), self.height.max(1));
        let tint = (self.frames.wrapping_mul(16) % 256) as u8;

        RgbImage::from_fn(width, height, |x, y| {
            let noise: u8 = rng.gen_range(0..8);
            Rgb([
                ((x * 255) / width) as u8 ^ noise,
                ((y * 255) / height) as u8 ^ noise,
                tint,
            ])
        })
    }
}

impl VideoStream for MockStream {
    fn id(&self) -> u64 {
        self.id
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab_frame(&mut self) -> Result<RgbImage, PlatformError> {
        if !self.open {
            return Err(PlatformError::new("InvalidStateError", "stream is closed"));
        }
        if let Some(err) = &self.frame_error {
            return Err(err.clone());
        }

        self.frames += 1;
        trace!("Mock stream {} frame {}", self.id, self.frames);
        Ok(self.render())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.ledger.record_close(self.id);
            debug!("Mock stream {} closed", self.id);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Simulated set of attached cameras
#[derive(Debug)]
pub struct MockMediaDevices {
    devices: Vec<MediaDeviceDescriptor>,
    config: Mutex<MockDeviceConfig>,
    ledger: StreamLedger,
}

impl MockMediaDevices {
    /// Create a backend with the given cameras and default behavior
    pub fn new(devices: Vec<MediaDeviceDescriptor>) -> Self {
        Self::with_config(devices, MockDeviceConfig::default())
    }

    /// Create a backend with the given cameras and behavior
    pub fn with_config(devices: Vec<MediaDeviceDescriptor>, config: MockDeviceConfig) -> Self {
        Self {
            devices,
            config: Mutex::new(config),
            ledger: StreamLedger::default(),
        }
    }

    /// One front-facing webcam
    pub fn single_camera() -> Self {
        Self::new(vec![MediaDeviceDescriptor::new(
            "cam-front-0001",
            "Integrated Webcam",
        )])
    }

    /// A phone-style front and rear camera pair
    pub fn dual_camera() -> Self {
        Self::new(vec![
            MediaDeviceDescriptor::new("cam-front-0001", "Front Camera"),
            MediaDeviceDescriptor::new("cam-rear-0002", "Back Camera"),
        ])
    }

    /// No cameras attached
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    pub fn devices(&self) -> &[MediaDeviceDescriptor] {
        &self.devices
    }

    /// Handle on the stream ledger; stays valid after the backend moves
    pub fn ledger(&self) -> StreamLedger {
        self.ledger.clone()
    }

    pub fn config(&self) -> MockDeviceConfig {
        self.config.lock().unwrap().clone()
    }

    /// Change behavior mid-test, e.g. grant a permission that was denied
    pub fn update_config(&self, update: impl FnOnce(&mut MockDeviceConfig)) {
        update(&mut self.config.lock().unwrap());
    }

    fn take_scheduled_failure(&self) -> bool {
        let mut config = self.config.lock().unwrap();
        if config.fail_next_opens > 0 {
            config.fail_next_opens -= 1;
            return true;
        }
        config.random_failure_rate > 0
            && rand::thread_rng().gen_range(0..100u8) < config.random_failure_rate
    }

    fn resolve_device(&self, constraints: &StreamConstraints) -> Option<&MediaDeviceDescriptor> {
        constraints
            .device_id
            .as_deref()
            .and_then(|id| self.devices.iter().find(|d| d.id == id))
            .or_else(|| self.devices.first())
    }
}

#[async_trait]
impl MediaDevices for MockMediaDevices {
    type Stream = MockStream;

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceDescriptor>, PlatformError> {
        let config = self.config();
        if !config.enumerate_delay.is_zero() {
            tokio::time::sleep(config.enumerate_delay).await;
        }

        match config.enumerate_error {
            Some(err) => Err(err),
            None => Ok(self.devices.clone()),
        }
    }

    async fn open_stream(&self, constraints: &StreamConstraints) -> Result<MockStream, PlatformError> {
        self.ledger.record_attempt(constraints);
        let config = self.config();

        if !config.open_delay.is_zero() {
            tokio::time::sleep(config.open_delay).await;
        }

        if let Some(err) = config.open_error {
            return Err(err);
        }
        if self.take_scheduled_failure() {
            return Err(PlatformError::not_readable("Could not start video source"));
        }

        let device = self.resolve_device(constraints).ok_or_else(PlatformError::not_found)?;
        let stream_id = self.ledger.record_open(&device.id);
        debug!("Mock stream {} opened on '{}'", stream_id, device.id);

        Ok(MockStream {
            id: stream_id,
            device_id: device.id.clone(),
            width: constraints.ideal_width.min(config.sensor_width),
            height: constraints.ideal_height.min(config.sensor_height),
            open: true,
            frames: 0,
            frame_error: config.frame_error,
            ledger: self.ledger.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enumerate_and_open() {
        let media = MockMediaDevices::dual_camera();
        let ledger = media.ledger();

        let devices = media.enumerate_devices().await.unwrap();
        assert_eq!(devices.len(), 2);

        let constraints = StreamConstraints::default().with_device(Some("cam-rear-0002".to_string()));
        let mut stream = media.open_stream(&constraints).await.unwrap();
        assert_eq!(stream.device_id(), "cam-rear-0002");
        assert_eq!(stream.resolution(), (1280, 720));
        assert_eq!(ledger.open_count(), 1);

        stream.close();
        stream.close();
        assert_eq!(ledger.open_count(), 0);
        assert_eq!(ledger.closed_total(), 1);
    }

    #[tokio::test]
    async fn test_unknown_device_falls_back_to_first() {
        let media = MockMediaDevices::dual_camera();
        let constraints = StreamConstraints::default().with_device(Some("missing".to_string()));
        let stream = media.open_stream(&constraints).await.unwrap();
        assert_eq!(stream.device_id(), "cam-front-0001");
    }

    #[tokio::test]
    async fn test_no_devices_is_not_found() {
        let media = MockMediaDevices::none();
        let err = media.open_stream(&StreamConstraints::default()).await.unwrap_err();
        assert_eq!(err, PlatformError::not_found());
    }

    #[tokio::test]
    async fn test_denied_config() {
        let media = MockMediaDevices::with_config(
            vec![MediaDeviceDescriptor::new("cam", "")],
            MockDeviceConfig::denied(),
        );
        let err = media.open_stream(&StreamConstraints::default()).await.unwrap_err();
        assert_eq!(err.name, "NotAllowedError");
        assert_eq!(media.ledger().open_attempts(), 1);
        assert_eq!(media.ledger().opened_total(), 0);
    }

    #[tokio::test]
    async fn test_scheduled_failures_then_success() {
        let media = MockMediaDevices::single_camera();
        media.update_config(|c| c.fail_next_opens = 1);

        assert!(media.open_stream(&StreamConstraints::default()).await.is_err());
        assert!(media.open_stream(&StreamConstraints::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_frames_follow_sensor_limits() {
        let media = MockMediaDevices::with_config(
            vec![MediaDeviceDescriptor::new("cam", "Cam")],
            MockDeviceConfig::default().with_sensor(32, 18),
        );
        let mut stream = media.open_stream(&StreamConstraints::default()).await.unwrap();
        let frame = stream.grab_frame().unwrap();
        assert_eq!(frame.dimensions(), (32, 18));

        stream.close();
        assert!(stream.grab_frame().is_err());
    }

    #[test]
    fn test_config_builders() {
        assert!(MockDeviceConfig::denied().open_error.is_some());
        assert!(MockDeviceConfig::unsupported().enumerate_error.is_some());
        assert_eq!(MockDeviceConfig::slow(40).open_delay, Duration::from_millis(40));
        assert_eq!(MockDeviceConfig::flaky(150).random_failure_rate, 100);
        assert_eq!(
            MockDeviceConfig::default().with_enumerate_delay(30).enumerate_delay,
            Duration::from_millis(30)
        );
        let sensor = MockDeviceConfig::default().with_sensor(10, 20);
        assert_eq!((sensor.sensor_width, sensor.sensor_height), (10, 20));
    }
}

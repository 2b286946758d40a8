//! Image acquisition session
//!
//! [`ImageAcquisitionSession`] drives one camera through
//! `Closed -> Enumerating -> Opening -> Live -> Capturing -> Reviewing` and
//! hands confirmed stills to the [`SharedImageStore`].
//!
//! At most one stream is open per session. Every request that opens a stream
//! (open, device switch, retake) takes a fresh request number; when a
//! suspended request resumes and finds a newer number, it closes whatever it
//! acquired and returns [`SessionError::Superseded`]. `close()` takes a number
//! too, so a close during `Opening` wins over the pending open.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use log::{debug, info, warn};

use super::frame::CapturedFrame;
use super::state::SessionState;
use crate::core::config::CaptureConfig;
use crate::core::error::{DeviceError, SessionError, SessionResult};
use crate::device::{
    MediaDeviceDescriptor, MediaDevices, StreamConstraints, StreamGuard, VideoStream,
};
use crate::store::{ArtifactView, ImageArtifact, SharedImageStore};

struct SessionInner<S: VideoStream> {
    state: SessionState,
    error: Option<DeviceError>,
    request: u64,
    devices: Vec<MediaDeviceDescriptor>,
    selected_device: Option<String>,
    stream: Option<StreamGuard<S>>,
    frame: Option<CapturedFrame>,
}

impl<S: VideoStream> SessionInner<S> {
    fn new() -> Self {
        Self {
            state: SessionState::Closed,
            error: None,
            request: 0,
            devices: Vec::new(),
            selected_device: None,
            stream: None,
            frame: None,
        }
    }

    fn next_request(&mut self) -> u64 {
        self.request += 1;
        self.request
    }

    fn is_current(&self, request: u64) -> bool {
        self.request == request
    }

    fn release_stream(&mut self) {
        if let Some(guard) = self.stream.take() {
            guard.release();
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            operation,
            state: self.state,
        }
    }

    /// Keep the current selection if it is still attached, otherwise take the first device
    fn select_default_device(&mut self) {
        let still_attached = self
            .selected_device
            .as_ref()
            .is_some_and(|id| self.devices.iter().any(|d| &d.id == id));

        if !still_attached {
            self.selected_device = self.devices.first().map(|d| d.id.clone());
        }
    }

    fn fail(&mut self, error: DeviceError) {
        self.release_stream();
        self.frame = None;
        self.state = SessionState::Error;
        self.error = Some(error);
    }
}

/// A single camera capture session
pub struct ImageAcquisitionSession<M: MediaDevices> {
    media: Arc<M>,
    store: Arc<SharedImageStore>,
    config: CaptureConfig,
    inner: Mutex<SessionInner<M::Stream>>,
}

impl<M: MediaDevices> ImageAcquisitionSession<M> {
    /// Create a closed session
    pub fn new(media: Arc<M>, store: Arc<SharedImageStore>, config: CaptureConfig) -> Self {
        Self {
            media,
            store,
            config,
            inner: Mutex::new(SessionInner::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner<M::Stream>> {
        self.inner.lock().unwrap()
    }

    fn constraints_for(&self, inner: &SessionInner<M::Stream>) -> StreamConstraints {
        StreamConstraints::default()
            .with_device(inner.selected_device.clone())
            .with_resolution(self.config.ideal_width, self.config.ideal_height)
            .with_facing(self.config.facing_for(inner.devices.len()))
    }

    /// Enumerate cameras and start a stream on the default device
    ///
    /// Valid from every state except `Capturing`. Reopening from `Reviewing`
    /// discards the unconfirmed still. Enumeration failures are not fatal:
    /// the stream is requested anyway and the platform decides.
    pub async fn open(&self) -> SessionResult<()> {
        let request = {
            let mut inner = self.lock();
            if inner.state == SessionState::Capturing {
                return Err(inner.invalid("open the camera"));
            }
            inner.release_stream();
            inner.frame = None;
            inner.error = None;
            inner.state = SessionState::Enumerating;
            inner.next_request()
        };
        info!("Opening camera session");

        let devices = match self.media.enumerate_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Device enumeration failed, continuing without a device list: {}", e);
                Vec::new()
            }
        };

        let constraints = {
            let mut inner = self.lock();
            if !inner.is_current(request) {
                debug!("Enumeration result discarded, session moved on");
                return Err(SessionError::Superseded);
            }
            debug!("Enumerated {} camera(s)", devices.len());
            inner.devices = devices;
            inner.select_default_device();
            inner.state = SessionState::Opening;
            self.constraints_for(&inner)
        };

        self.acquire_stream(request, constraints).await
    }

    /// Switch to another enumerated camera
    ///
    /// Valid from `Live`, `Error` and `Opening`. The old stream is closed
    /// before the new one is requested; if several switches overlap, only the
    /// last one keeps its stream.
    pub async fn select_device(&self, device_id: &str) -> SessionResult<()> {
        let (request, constraints) = {
            let mut inner = self.lock();
            match inner.state {
                SessionState::Live | SessionState::Error | SessionState::Opening => {}
                _ => return Err(inner.invalid("switch cameras")),
            }
            if !inner.devices.iter().any(|d| d.id == device_id) {
                return Err(SessionError::UnknownDevice(device_id.to_string()));
            }

            inner.release_stream();
            inner.error = None;
            inner.selected_device = Some(device_id.to_string());
            inner.state = SessionState::Opening;
            let request = inner.next_request();
            (request, self.constraints_for(&inner))
        };
        info!("Switching camera to '{}'", device_id);

        self.acquire_stream(request, constraints).await
    }

    /// Take a still from the live stream
    ///
    /// Only valid from `Live`. The stream is released once the still is
    /// ready for review.
    pub async fn capture(&self) -> SessionResult<()> {
        let (request, raw, captured_at) = {
            let mut inner = self.lock();
            if inner.state != SessionState::Live {
                return Err(inner.invalid("capture"));
            }

            let grabbed = inner
                .stream
                .as_mut()
                .map(|guard| guard.stream_mut().grab_frame());
            let grabbed = match grabbed {
                Some(grabbed) => grabbed,
                None => return Err(inner.invalid("capture")),
            };

            match grabbed {
                Ok(raw) => {
                    inner.state = SessionState::Capturing;
                    (inner.request, raw, Utc::now())
                }
                Err(e) => {
                    let error = DeviceError::from(e);
                    warn!("Frame grab failed: {}", error.detail().unwrap_or(error.kind()));
                    inner.fail(error.clone());
                    return Err(error.into());
                }
            }
        };
        debug!("Encoding {}x{} frame", raw.width(), raw.height());

        let quality = self.config.jpeg_quality;
        let prefix = self.config.file_prefix.clone();
        let encoded = tokio::task::spawn_blocking(move || {
            CapturedFrame::encode(&raw, quality, &prefix, captured_at)
        })
        .await;

        let frame = match encoded {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => return Err(self.abort_capture(request, e.to_string())),
            Err(e) => return Err(self.abort_capture(request, e.to_string())),
        };

        let delay = self.config.review_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        if !inner.is_current(request) || inner.state != SessionState::Capturing {
            debug!("Dropping still {}, session closed during capture", frame.file_name);
            return Err(SessionError::Superseded);
        }
        inner.release_stream();
        info!("Captured {} ({} bytes)", frame.file_name, frame.size());
        inner.frame = Some(frame);
        inner.state = SessionState::Reviewing;
        Ok(())
    }

    fn abort_capture(&self, request: u64, message: String) -> SessionError {
        warn!("Failed to encode captured frame: {}", message);
        let mut inner = self.lock();
        if inner.is_current(request) && inner.state == SessionState::Capturing {
            inner.state = SessionState::Live;
        }
        SessionError::Encode(message)
    }

    /// Discard the still under review and return to a live stream
    pub async fn retake(&self) -> SessionResult<()> {
        let (request, constraints) = {
            let mut inner = self.lock();
            if inner.state != SessionState::Reviewing {
                return Err(inner.invalid("retake"));
            }
            inner.frame = None;
            inner.release_stream();
            inner.state = SessionState::Opening;
            let request = inner.next_request();
            (request, self.constraints_for(&inner))
        };
        info!("Retaking photo");

        self.acquire_stream(request, constraints).await
    }

    /// Promote the still under review into the shared image store and close
    pub fn confirm_and_submit(&self) -> SessionResult<ArtifactView> {
        let frame = {
            let mut inner = self.lock();
            if inner.state != SessionState::Reviewing {
                return Err(inner.invalid("confirm"));
            }
            let frame = match inner.frame.take() {
                Some(frame) => frame,
                None => return Err(inner.invalid("confirm")),
            };
            inner.release_stream();
            inner.state = SessionState::Closed;
            inner.next_request();
            frame
        };

        let view = self.store.set_image(ImageArtifact::from_capture(frame));
        info!(
            "Submitted {} to the image store ({})",
            view.original_name,
            view.formatted_size()
        );
        Ok(view)
    }

    /// Release everything and return to `Closed`
    ///
    /// Valid from every state and idempotent. A pending open or capture
    /// resumes into a closed session and discards its result.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.state == SessionState::Closed && inner.stream.is_none() && inner.frame.is_none() {
            return;
        }
        inner.release_stream();
        inner.frame = None;
        inner.error = None;
        inner.state = SessionState::Closed;
        inner.next_request();
        info!("Camera session closed");
    }

    async fn acquire_stream(&self, request: u64, constraints: StreamConstraints) -> SessionResult<()> {
        debug!(
            "Requesting stream: device={:?} {}x{} facing={:?}",
            constraints.device_id,
            constraints.ideal_width,
            constraints.ideal_height,
            constraints.facing_mode
        );
        let opened = self.open_stream(&constraints).await;

        let mut inner = self.lock();
        if !inner.is_current(request) {
            if let Ok(stream) = opened {
                debug!("Closing stream {} from a superseded request", stream.id());
                StreamGuard::new(stream).release();
            }
            return Err(SessionError::Superseded);
        }

        match opened {
            Ok(stream) => {
                let (width, height) = stream.resolution();
                info!("Camera live on '{}' ({}x{})", stream.device_id(), width, height);
                inner.stream = Some(StreamGuard::new(stream));
                inner.state = SessionState::Live;
                Ok(())
            }
            Err(error) => {
                warn!(
                    "Camera failed to start: {} ({})",
                    error.kind(),
                    error.detail().unwrap_or("no detail")
                );
                inner.fail(error.clone());
                Err(error.into())
            }
        }
    }

    async fn open_stream(&self, constraints: &StreamConstraints) -> Result<M::Stream, DeviceError> {
        let request = self.media.open_stream(constraints);
        match self.config.open_timeout() {
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(result) => result.map_err(DeviceError::from),
                Err(_) => Err(DeviceError::Unknown(format!(
                    "camera did not start within {} ms",
                    limit.as_millis()
                ))),
            },
            None => request.await.map_err(DeviceError::from),
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// The error behind the `Error` state
    pub fn error(&self) -> Option<DeviceError> {
        self.lock().error.clone()
    }

    /// Cameras found by the last enumeration
    pub fn devices(&self) -> Vec<MediaDeviceDescriptor> {
        self.lock().devices.clone()
    }

    pub fn selected_device(&self) -> Option<String> {
        self.lock().selected_device.clone()
    }

    /// The still under review, if any
    pub fn captured_frame(&self) -> Option<CapturedFrame> {
        self.lock().frame.clone()
    }

    /// Whether the capture control should be enabled
    pub fn is_capture_enabled(&self) -> bool {
        let inner = self.lock();
        inner.state == SessionState::Live && inner.stream.is_some()
    }

    pub fn store(&self) -> &Arc<SharedImageStore> {
        &self.store
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

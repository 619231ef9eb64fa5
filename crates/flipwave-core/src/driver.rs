//! Display driver
//!
//! Ties the pieces together: bitmaps are encoded and framed on the caller's
//! thread, then handed to a single sender thread that owns the transport.
//! Sends are queued FIFO, so two images never interleave on the wire, and the
//! frames of one image always go out in ascending screen id order.
//!
//! Shutdown is cooperative: the sender checks a cancellation token before each
//! frame, so a frame that has started is always written completely.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DisplaySettings;
use crate::encoder;
use crate::layout::PanelLayout;
use crate::protocol::Frame;
use crate::transport::SerialTransport;
use crate::FlipdotError;

/// Driver lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverState {
    /// No link to the panels
    Disconnected,
    /// Loading the layout and opening the port
    Connecting,
    /// Idle and ready to send
    Connected,
    /// Writing an image to the panels
    Sending,
}

/// Outcome of a completed send
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendReport {
    /// Frames handed to the port
    pub frames_written: usize,
    /// Bytes handed to the port, frame overhead included
    pub bytes_written: usize,
}

type SendResult = Result<SendReport, FlipdotError>;

/// Completion signal for one queued image
#[derive(Debug)]
pub struct SendHandle {
    rx: oneshot::Receiver<SendResult>,
}

impl SendHandle {
    /// Block until the image has been written (or failed).
    ///
    /// Must not be called from inside an async runtime; use
    /// [`SendHandle::completed`] there.
    pub fn wait(self) -> SendResult {
        self.rx.blocking_recv().unwrap_or(Err(FlipdotError::Cancelled))
    }

    /// Wait for the image to be written
    pub async fn completed(self) -> SendResult {
        self.rx.await.unwrap_or(Err(FlipdotError::Cancelled))
    }
}

/// One image worth of encoded frames
struct SendJob {
    frames: Vec<Vec<u8>>,
    done: oneshot::Sender<SendResult>,
}

/// Connection to a flip-dot display
pub struct Driver {
    layout: PanelLayout,
    state: Arc<Mutex<DriverState>>,
    cancel: CancellationToken,
    pending: Arc<AtomicUsize>,
    jobs: Option<mpsc::Sender<SendJob>>,
    worker: Option<JoinHandle<SerialTransport>>,
}

impl Driver {
    /// Validate the settings, open the serial port and start the sender.
    ///
    /// There is no retry; a failed attempt leaves nothing open.
    pub fn connect(settings: &DisplaySettings) -> Result<Self, FlipdotError> {
        info!(port = %settings.com_port, "connecting to display");
        let layout = settings.layout()?;
        layout.ensure_addressable()?;
        let transport = SerialTransport::open(&settings.serial())?;
        Self::with_transport(layout, transport)
    }

    /// Start a driver on an already-open transport
    pub fn with_transport(
        layout: PanelLayout,
        transport: SerialTransport,
    ) -> Result<Self, FlipdotError> {
        layout.ensure_addressable()?;
        if !transport.is_open() {
            return Err(FlipdotError::NotConnected);
        }

        let state = Arc::new(Mutex::new(DriverState::Connecting));
        let cancel = CancellationToken::new();
        let pending = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        let worker = {
            let state = state.clone();
            let cancel = cancel.clone();
            let pending = pending.clone();
            thread::Builder::new()
                .name("flipwave-sender".to_string())
                .spawn(move || run_sender(transport, rx, cancel, pending, state))?
        };

        set_state(&state, DriverState::Connected);
        info!(panels = layout.panel_count(), "display connected");

        Ok(Self {
            layout,
            state,
            cancel,
            pending,
            jobs: Some(tx),
            worker: Some(worker),
        })
    }

    /// Queue `bitmap` for transmission with a full refresh
    pub fn send_image(&self, bitmap: &[i32]) -> Result<SendHandle, FlipdotError> {
        self.send_image_with(bitmap, true)
    }

    /// Queue `bitmap` for transmission.
    ///
    /// The bitmap is encoded before this returns. A bitmap of the wrong length
    /// is rejected and nothing is queued. Transmission errors are reported
    /// through the returned handle.
    pub fn send_image_with(
        &self,
        bitmap: &[i32],
        refresh: bool,
    ) -> Result<SendHandle, FlipdotError> {
        let jobs = self.jobs.as_ref().ok_or(FlipdotError::NotConnected)?;
        if self.cancel.is_cancelled() {
            return Err(FlipdotError::Cancelled);
        }

        let frames: Vec<Vec<u8>> = encoder::encode(bitmap, &self.layout)?
            .into_iter()
            .zip(self.layout.panels())
            .map(|(payload, panel)| Frame::new(panel.screen_id(), payload, refresh).to_bytes())
            .collect();

        let (done, rx) = oneshot::channel();
        self.pending.fetch_add(1, Ordering::SeqCst);
        if jobs.send(SendJob { frames, done }).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(FlipdotError::NotConnected);
        }
        Ok(SendHandle { rx })
    }

    /// Stop sending and release the port.
    ///
    /// A frame already being written is finished; the rest of that image and
    /// every queued image resolve to [`FlipdotError::Cancelled`]. Safe to call
    /// more than once.
    pub fn disconnect(&mut self) {
        let Some(jobs) = self.jobs.take() else {
            return;
        };
        self.cancel.cancel();
        drop(jobs);

        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(mut transport) => transport.close(),
                Err(_) => error!("sender thread panicked"),
            }
        }
        set_state(&self.state, DriverState::Disconnected);
        info!("display disconnected");
    }

    /// Token that cancels in-flight and queued sends when triggered.
    ///
    /// Lets a supervisor abort transmission from another thread. The sender
    /// goes back to `Connected` once the current frame is written, but the
    /// driver accepts no new images and should be disconnected.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> DriverState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether [`Driver::disconnect`] has not run yet
    pub fn is_connected(&self) -> bool {
        self.jobs.is_some()
    }

    /// Images queued or being written
    pub fn pending_sends(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Panel layout images are encoded against
    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn set_state(state: &Mutex<DriverState>, new: DriverState) {
    *state.lock().unwrap_or_else(|e| e.into_inner()) = new;
}

/// Sender thread: drain the queue until every handle to it is gone
fn run_sender(
    mut transport: SerialTransport,
    jobs: mpsc::Receiver<SendJob>,
    cancel: CancellationToken,
    pending: Arc<AtomicUsize>,
    state: Arc<Mutex<DriverState>>,
) -> SerialTransport {
    debug!(port = transport.port_name(), "sender started");
    for job in jobs {
        let result = if cancel.is_cancelled() {
            Err(FlipdotError::Cancelled)
        } else {
            set_state(&state, DriverState::Sending);
            let result = transmit(&mut transport, &job.frames, &cancel);
            set_state(&state, DriverState::Connected);
            result
        };

        match &result {
            Ok(report) => debug!(
                frames = report.frames_written,
                bytes = report.bytes_written,
                "image sent"
            ),
            Err(FlipdotError::Cancelled) => debug!("image cancelled"),
            Err(e) => warn!("image send failed: {}", e),
        }

        pending.fetch_sub(1, Ordering::SeqCst);
        // The caller may have dropped its handle
        let _ = job.done.send(result);
    }
    debug!(port = transport.port_name(), "sender stopped");
    transport
}

fn transmit(
    transport: &mut SerialTransport,
    frames: &[Vec<u8>],
    cancel: &CancellationToken,
) -> SendResult {
    let mut report = SendReport::default();
    for frame in frames {
        if cancel.is_cancelled() {
            return Err(FlipdotError::Cancelled);
        }
        transport.write(frame)?;
        report.frames_written += 1;
        report.bytes_written += frame.len();
    }
    Ok(report)
}

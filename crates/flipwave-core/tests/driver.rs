use flipwave_core::driver::{Driver, DriverState};
use flipwave_core::layout::{PanelDimension, PanelLayout};
use flipwave_core::transport::{Channel, SerialTransport};
use flipwave_core::FlipdotError;
use pretty_assertions::assert_eq;
use std::io::{self, Write};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock serial port that accepts one byte per write call, so a frame takes
/// many calls to go out and any interleaving would show up in `sent`.
#[derive(Clone, Default)]
struct TricklePort {
    sent: Arc<Mutex<Vec<u8>>>,
}

impl Write for TricklePort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.sent.lock().unwrap().push(buf[0]);
        std::thread::yield_now();
        Ok(1)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Channel for TricklePort {
    fn clear_output_buffer(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Mock serial port whose writes block until the test hands out a token
struct GatedPort {
    sent: Arc<Mutex<Vec<u8>>>,
    entered: mpsc::Sender<()>,
    tokens: mpsc::Receiver<()>,
}

impl Write for GatedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _ = self.entered.send(());
        self.tokens
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no token"))?;
        self.sent.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Channel for GatedPort {
    fn clear_output_buffer(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Mock serial port that fails once `budget` bytes have been written
struct FlakyPort {
    sent: Arc<Mutex<Vec<u8>>>,
    budget: usize,
}

impl Write for FlakyPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut sent = self.sent.lock().unwrap();
        if sent.len() + buf.len() > self.budget {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Channel for FlakyPort {
    fn clear_output_buffer(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Two 28x7 panels side by side
fn wide_layout() -> PanelLayout {
    PanelLayout::new(
        &[PanelDimension::new(0, 0, 28, 7), PanelDimension::new(28, 0, 28, 7)],
        56,
        Some(7),
    )
    .unwrap()
}

/// Split a byte stream into (screen id, payload) pairs of 28-column frames
fn split_frames(stream: &[u8]) -> Vec<(u8, Vec<u8>)> {
    assert_eq!(stream.len() % 32, 0, "stream holds a partial frame");
    stream
        .chunks(32)
        .map(|f| {
            assert_eq!(f[0], 0x80);
            assert_eq!(f[31], 0x8F);
            (f[2], f[3..31].to_vec())
        })
        .collect()
}

#[test]
fn test_end_to_end_frames() {
    let port = TricklePort::default();
    let transport = SerialTransport::from_channel("mock", Box::new(port.clone()));
    let driver = Driver::with_transport(wide_layout(), transport).unwrap();

    // Top row lit on the left panel, bottom row lit on the right panel
    let mut bitmap = vec![0; 392];
    for x in 0..28 {
        bitmap[x] = 1;
    }
    for x in 28..56 {
        bitmap[x + 6 * 56] = 1;
    }

    let report = driver.send_image(&bitmap).unwrap().wait().unwrap();
    assert_eq!(report.frames_written, 2);
    assert_eq!(report.bytes_written, 64);

    let frames = split_frames(&port.sent.lock().unwrap());
    assert_eq!(frames[0], (1, vec![0b000_0001; 28]));
    assert_eq!(frames[1], (2, vec![0b100_0000; 28]));
}

#[test]
fn test_concurrent_sends_do_not_interleave() {
    let port = TricklePort::default();
    let transport = SerialTransport::from_channel("mock", Box::new(port.clone()));
    let driver = Driver::with_transport(wide_layout(), transport).unwrap();

    let on = vec![1; 392];
    let off = vec![0; 392];

    let (a, b) = std::thread::scope(|s| {
        let a = s.spawn(|| driver.send_image(&on).unwrap());
        let b = s.spawn(|| driver.send_image(&off).unwrap());
        (a.join().unwrap(), b.join().unwrap())
    });
    a.wait().unwrap();
    b.wait().unwrap();

    let frames = split_frames(&port.sent.lock().unwrap());
    assert_eq!(frames.len(), 4);
    let ids: Vec<u8> = frames.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![1, 2, 1, 2]);

    // Each image is contiguous: the first two frames match, as do the last two
    assert_eq!(frames[0].1, frames[1].1);
    assert_eq!(frames[2].1, frames[3].1);
    assert_ne!(frames[1].1, frames[2].1);
}

#[test]
fn test_queued_sends_complete_in_order() {
    let port = TricklePort::default();
    let transport = SerialTransport::from_channel("mock", Box::new(port.clone()));
    let driver = Driver::with_transport(wide_layout(), transport).unwrap();

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let bitmap: Vec<i32> = vec![i % 2; 392];
            driver.send_image(&bitmap).unwrap()
        })
        .collect();
    for handle in handles {
        handle.wait().unwrap();
    }
    assert_eq!(driver.pending_sends(), 0);

    let frames = split_frames(&port.sent.lock().unwrap());
    assert_eq!(frames.len(), 10);
    for (i, pair) in frames.chunks(2).enumerate() {
        let expected = if i % 2 == 0 { 0x00 } else { 0x7F };
        assert_eq!(pair[0].1, vec![expected; 28]);
        assert_eq!(pair[1].1, vec![expected; 28]);
    }
}

#[test]
fn test_cancellation_finishes_current_frame() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let (entered_tx, entered_rx) = mpsc::channel();
    let (token_tx, token_rx) = mpsc::channel();
    let port = GatedPort {
        sent: sent.clone(),
        entered: entered_tx,
        tokens: token_rx,
    };
    let transport = SerialTransport::from_channel("mock", Box::new(port));
    let mut driver = Driver::with_transport(wide_layout(), transport).unwrap();

    let first = driver.send_image(&[1; 392]).unwrap();
    let second = driver.send_image(&[0; 392]).unwrap();

    // Sender is now blocked inside the first frame of the first image
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(driver.state(), DriverState::Sending);

    driver.cancellation_token().cancel();
    token_tx.send(()).unwrap();

    assert!(matches!(first.wait(), Err(FlipdotError::Cancelled)));
    assert!(matches!(second.wait(), Err(FlipdotError::Cancelled)));

    // Exactly one whole frame reached the port
    let written = sent.lock().unwrap().clone();
    assert_eq!(written.len(), 32);
    assert_eq!(&written[..3], &[0x80, 0x83, 0x01]);
    assert_eq!(written[31], 0x8F);

    // The sender is idle again, though the driver takes no more images
    assert_eq!(driver.state(), DriverState::Connected);
    assert_eq!(driver.pending_sends(), 0);
    assert!(matches!(
        driver.send_image(&[0; 392]),
        Err(FlipdotError::Cancelled)
    ));

    driver.disconnect();
    assert_eq!(driver.state(), DriverState::Disconnected);
}

#[test]
fn test_disconnect_cancels_queued_images() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let (entered_tx, entered_rx) = mpsc::channel();
    let (token_tx, token_rx) = mpsc::channel();
    let port = GatedPort {
        sent: sent.clone(),
        entered: entered_tx,
        tokens: token_rx,
    };
    let transport = SerialTransport::from_channel("mock", Box::new(port));
    let mut driver = Driver::with_transport(wide_layout(), transport).unwrap();

    let first = driver.send_image(&[1; 392]).unwrap();
    let queued = driver.send_image(&[0; 392]).unwrap();
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // Release the blocked frame while disconnect waits for the sender
    let release = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        token_tx.send(()).unwrap();
    });
    driver.disconnect();
    release.join().unwrap();

    assert!(matches!(first.wait(), Err(FlipdotError::Cancelled)));
    assert!(matches!(queued.wait(), Err(FlipdotError::Cancelled)));
    assert_eq!(sent.lock().unwrap().len(), 32);
    assert_eq!(driver.state(), DriverState::Disconnected);
}

#[test]
fn test_write_failure_reported_through_handle() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let port = FlakyPort {
        sent: sent.clone(),
        budget: 40,
    };
    let transport = SerialTransport::from_channel("mock", Box::new(port));
    let driver = Driver::with_transport(wide_layout(), transport).unwrap();

    let err = driver.send_image(&[1; 392]).unwrap().wait().unwrap_err();
    assert!(matches!(err, FlipdotError::IoError(_)));
    assert!(!err.is_validation());

    // The first frame went out and is not rolled back
    assert_eq!(sent.lock().unwrap().len(), 32);
    assert_eq!(driver.state(), DriverState::Connected);
}

#[test]
fn test_wrong_length_is_dropped() {
    let port = TricklePort::default();
    let transport = SerialTransport::from_channel("mock", Box::new(port.clone()));
    let driver = Driver::with_transport(wide_layout(), transport).unwrap();

    // 56 * 7 would be right; one row short is not
    let err = driver.send_image(&vec![1; 56 * 6]).unwrap_err();
    assert!(matches!(
        err,
        FlipdotError::BitmapLength {
            expected: 392,
            actual: 336
        }
    ));
    assert!(port.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_async_completion() {
    let port = TricklePort::default();
    let transport = SerialTransport::from_channel("mock", Box::new(port.clone()));
    let driver = Driver::with_transport(wide_layout(), transport).unwrap();

    let report = driver.send_image(&[1; 392]).unwrap().completed().await.unwrap();
    assert_eq!(report.frames_written, 2);
    assert_eq!(port.sent.lock().unwrap().len(), 64);
}

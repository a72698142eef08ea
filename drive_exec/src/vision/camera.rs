//! Camera vision source
//!
//! Captures MJPEG frames from a V4L2 device in a background thread, decodes them and publishes
//! each one into the shared [`FrameBuffer`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Utc;
use image::ImageFormat;
use log::{info, warn};
use rscam::{Camera, Config};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use super::{CameraParams, Frame, FrameBuffer, VisionError, VisionSource};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Wait after a failed capture before trying again.
const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(100);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A V4L2 camera.
pub struct CameraSource {
    params: CameraParams,

    buffer: FrameBuffer,

    stop: Arc<AtomicBool>,

    join_handle: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CameraSource {
    /// Create a new camera source. The device is not opened until [`VisionSource::start`].
    pub fn new(params: &CameraParams) -> Self {
        Self {
            params: params.clone(),
            buffer: FrameBuffer::new(),
            stop: Arc::new(AtomicBool::new(false)),
            join_handle: None,
        }
    }
}

impl VisionSource for CameraSource {
    fn start(&mut self) -> Result<(), VisionError> {
        if self.join_handle.is_some() {
            return Err(VisionError::AlreadyStarted);
        }

        self.stop.store(false, Ordering::Relaxed);

        // The camera handle cannot leave the thread that opened it, so the capture thread opens
        // it and reports back whether that worked.
        let (open_tx, open_rx) = mpsc::channel();
        let params = self.params.clone();
        let buffer = self.buffer.clone();
        let stop = self.stop.clone();

        let join_handle = thread::spawn(move || {
            let camera = match open_camera(&params) {
                Ok(c) => {
                    open_tx.send(Ok(())).ok();
                    c
                }
                Err(e) => {
                    open_tx.send(Err(e)).ok();
                    return;
                }
            };

            capture_loop(camera, buffer, stop)
        });

        match open_rx.recv() {
            Ok(Ok(())) => {
                info!(
                    "Camera {} started at {}x{} {} fps",
                    self.params.device, self.params.resolution.0, self.params.resolution.1,
                    self.params.fps
                );
                self.join_handle = Some(join_handle);
                Ok(())
            }
            Ok(Err(e)) => {
                join_handle.join().ok();
                Err(e)
            }
            Err(_) => Err(VisionError::OpenError("capture thread exited".into())),
        }
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
            info!("Camera {} stopped", self.params.device);
        }
    }

    fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.buffer.latest()
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn open_camera(params: &CameraParams) -> Result<Camera, VisionError> {
    let mut camera =
        Camera::new(&params.device).map_err(|e| VisionError::OpenError(e.to_string()))?;

    camera
        .start(&Config {
            interval: (1, params.fps),
            resolution: params.resolution,
            format: b"MJPG",
            ..Default::default()
        })
        .map_err(|e| VisionError::OpenError(e.to_string()))?;

    Ok(camera)
}

fn capture_loop(camera: Camera, buffer: FrameBuffer, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        let raw = match camera.capture() {
            Ok(f) => f,
            Err(e) => {
                warn!("Camera capture failed: {}", e);
                thread::sleep(CAPTURE_RETRY_DELAY);
                continue;
            }
        };

        match image::load_from_memory_with_format(&raw, ImageFormat::Jpeg) {
            Ok(image) => buffer.publish(Frame {
                timestamp: Utc::now(),
                image,
            }),
            Err(e) => warn!("Could not decode camera frame: {}", e),
        }
    }
}

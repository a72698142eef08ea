//! # Vision module
//!
//! Vision sources capture frames in the background and publish the most recent one into a
//! [`FrameBuffer`]. The drive loop takes whatever frame is latest at the start of each cycle and
//! never waits for a new one.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// V4L2 camera vision source.
#[cfg(feature = "cam")]
pub mod camera;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::Deserialize;
use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of frames captured asynchronously to the drive loop.
pub trait VisionSource {
    /// Start capturing frames.
    fn start(&mut self) -> Result<(), VisionError>;

    /// Stop capturing frames. The last captured frame remains available.
    fn stop(&mut self);

    /// The most recently captured frame, or `None` if nothing has been captured yet.
    fn latest_frame(&self) -> Option<Arc<Frame>>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single captured frame.
#[derive(Clone, Debug)]
pub struct Frame {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The image itself
    pub image: DynamicImage,
}

/// Holds the most recent frame published by a vision source.
///
/// Frames are swapped in whole behind an `Arc`, so a reader always sees a complete frame even
/// while the writer is publishing the next one.
#[derive(Clone, Default)]
pub struct FrameBuffer {
    latest: Arc<Mutex<Option<Arc<Frame>>>>,
}

/// Parameters for the camera vision source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    /// The V4L2 device to capture from.
    pub device: String,

    /// Capture resolution as (width, height).
    ///
    /// Units: pixels
    pub resolution: (u32, u32),

    /// Capture rate.
    ///
    /// Units: frames/second
    pub fps: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Supported vision sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionKind {
    Camera,
}

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Unsupported vision sensor {0:?}, only \"camera\" is supported")]
    UnsupportedSensor(String),

    #[error("Support for the {0} vision sensor was not enabled at build time (feature `{1}`)")]
    NotBuilt(&'static str, &'static str),

    #[error("Could not open the camera: {0}")]
    OpenError(String),

    #[error("The vision source has already been started")]
    AlreadyStarted,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the vision source for the given sensor kind.
#[allow(unused_variables)]
pub fn build_source(
    kind: VisionKind,
    camera_params: &CameraParams,
) -> Result<Box<dyn VisionSource>, VisionError> {
    match kind {
        #[cfg(feature = "cam")]
        VisionKind::Camera => Ok(Box::new(camera::CameraSource::new(camera_params))),
        #[cfg(not(feature = "cam"))]
        VisionKind::Camera => Err(VisionError::NotBuilt("camera", "cam")),
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest frame.
    pub fn publish(&self, frame: Frame) {
        let frame = Arc::new(frame);

        // A poisoned lock still holds a whole frame, so it is safe to keep using it
        match self.latest.lock() {
            Ok(mut l) => *l = Some(frame),
            Err(poisoned) => *poisoned.into_inner() = Some(frame),
        }
    }

    /// Get the latest frame, if any.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        match self.latest.lock() {
            Ok(l) => l.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl FromStr for VisionKind {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camera" => Ok(VisionKind::Camera),
            _ => Err(VisionError::UnsupportedSensor(s.into())),
        }
    }
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            device: "/dev/video0".into(),
            resolution: (160, 120),
            fps: 20,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;
    use image::GenericImageView;

    fn frame(width: u32) -> Frame {
        Frame {
            timestamp: Utc::now(),
            image: DynamicImage::new_luma8(width, 1),
        }
    }

    #[test]
    fn test_vision_kind_from_str() {
        assert_eq!("camera".parse::<VisionKind>().unwrap(), VisionKind::Camera);
        assert!(matches!(
            "lidar".parse::<VisionKind>(),
            Err(VisionError::UnsupportedSensor(s)) if s == "lidar"
        ));
    }

    #[test]
    fn test_frame_buffer_keeps_latest() {
        let buffer = FrameBuffer::new();
        assert!(buffer.latest().is_none());

        buffer.publish(frame(1));
        buffer.publish(frame(2));

        assert_eq!(buffer.latest().unwrap().image.width(), 2);
    }

    #[test]
    fn test_frame_buffer_reader_holds_complete_frame() {
        let buffer = FrameBuffer::new();
        buffer.publish(frame(1));

        let held = buffer.latest().unwrap();

        let writer = {
            let buffer = buffer.clone();
            thread::spawn(move || {
                for w in 2..50 {
                    buffer.publish(frame(w));
                }
            })
        };
        writer.join().unwrap();

        // The frame taken before the writes is untouched
        assert_eq!(held.image.width(), 1);
        assert_eq!(buffer.latest().unwrap().image.width(), 49);
    }
}

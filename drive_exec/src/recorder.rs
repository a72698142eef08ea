//! # Frame recorder
//!
//! Records the frames seen by the pilot together with the command it decided, producing a
//! training set for the autonomous pilot's model. Encoding and writing happen on a background
//! thread so the drive loop never waits on the disk.
//!
//! Each recording directory holds `frame_<n>.jpg` images and a `records.csv` index with the
//! columns `frame_file, timestamp_ms, steering_angle, throttle`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{DynamicImage, ImageFormat};
use log::{debug, info, warn};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        mpsc::{channel, Receiver, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
};
use util::archive::{ArchiveError, Archiver};

use crate::vision::Frame;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Destination for recorded frames.
pub trait FrameRecorder {
    /// Queue a frame and the command decided for it. Failures are logged, never returned.
    fn record_frame(&mut self, frame: &Arc<Frame>, steering_angle: f64, throttle: f64);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Records frames to a directory.
pub struct FileRecorder {
    sender: Sender<RecorderSignal>,

    join_handle: Option<JoinHandle<()>>,
}

/// Recorder which drops every frame, used when no recording directory is available.
pub struct NullRecorder;

/// One row of `records.csv`.
#[derive(Debug, Serialize)]
struct FrameRecord {
    frame_file: String,
    timestamp_ms: i64,
    steering_angle: f64,
    throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

enum RecorderSignal {
    Record(Arc<Frame>, f64, f64),
    Stop,
}

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Could not create the records directory {0:?}: {1}")]
    CreateDirError(PathBuf, std::io::Error),

    #[error("Could not create the records index: {0}")]
    ArchiveError(#[from] ArchiveError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FileRecorder {
    /// Start a recorder writing into `records_dir`, which is created if needed.
    pub fn new<P: AsRef<Path>>(records_dir: P) -> Result<Self, RecorderError> {
        let records_dir = records_dir.as_ref().to_path_buf();

        fs::create_dir_all(&records_dir)
            .map_err(|e| RecorderError::CreateDirError(records_dir.clone(), e))?;

        let archiver = Archiver::create(records_dir.join("records.csv"))?;

        let (sender, receiver) = channel();

        let join_handle = {
            let records_dir = records_dir.clone();
            thread::spawn(move || writer_thread(records_dir, archiver, receiver))
        };

        info!("Recording frames to {:?}", records_dir);

        Ok(Self {
            sender,
            join_handle: Some(join_handle),
        })
    }
}

impl FrameRecorder for FileRecorder {
    fn record_frame(&mut self, frame: &Arc<Frame>, steering_angle: f64, throttle: f64) {
        if self
            .sender
            .send(RecorderSignal::Record(frame.clone(), steering_angle, throttle))
            .is_err()
        {
            warn!("Recorder thread has stopped, frame dropped");
        }
    }
}

impl Drop for FileRecorder {
    fn drop(&mut self) {
        self.sender.send(RecorderSignal::Stop).ok();

        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
        }
    }
}

impl FrameRecorder for NullRecorder {
    fn record_frame(&mut self, _frame: &Arc<Frame>, _steering_angle: f64, _throttle: f64) {}
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn writer_thread(records_dir: PathBuf, mut archiver: Archiver, receiver: Receiver<RecorderSignal>) {
    let mut num_frames: u64 = 0;

    while let Ok(signal) = receiver.recv() {
        let (frame, steering_angle, throttle) = match signal {
            RecorderSignal::Record(f, s, t) => (f, s, t),
            RecorderSignal::Stop => break,
        };

        let frame_file = format!("frame_{:06}.jpg", num_frames);

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(frame.image.to_rgb8());
        if let Err(e) = rgb.save_with_format(records_dir.join(&frame_file), ImageFormat::Jpeg) {
            warn!("Could not write {}: {}", frame_file, e);
            continue;
        }

        let record = FrameRecord {
            frame_file,
            timestamp_ms: frame.timestamp.timestamp_millis(),
            steering_angle,
            throttle,
        };

        if let Err(e) = archiver.serialise(&record) {
            warn!("Could not index {}: {}", record.frame_file, e);
            continue;
        }

        num_frames += 1;
    }

    debug!("Recorder stopped after {} frames", num_frames);
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_file_recorder_writes_frames_and_index() {
        let dir = std::env::temp_dir().join(format!("drive_recorder_{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();

        let frame = Arc::new(Frame {
            timestamp: Utc.timestamp_millis(1_600_000_000_123),
            image: DynamicImage::new_rgba8(8, 6),
        });

        {
            let mut recorder = FileRecorder::new(&dir).unwrap();
            recorder.record_frame(&frame, 0.5, -0.25);
            recorder.record_frame(&frame, 0.0, 1.0);
        }

        assert!(dir.join("frame_000000.jpg").is_file());
        assert!(dir.join("frame_000001.jpg").is_file());
        assert_eq!(
            fs::read_to_string(dir.join("records.csv")).unwrap(),
            "frame_file,timestamp_ms,steering_angle,throttle\n\
             frame_000000.jpg,1600000000123,0.5,-0.25\n\
             frame_000001.jpg,1600000000123,0.0,1.0\n"
        );

        fs::remove_dir_all(&dir).ok();
    }
}

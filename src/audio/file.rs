use async_trait::async_trait;
use hound::WavReader;
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::device::{AudioChunk, CaptureConstraints, CaptureDevice, DeviceError};

/// WAV-file-backed capture device
///
/// Replays a recording as a stream of chunks, used for tests and for
/// re-processing a consultation captured elsewhere. The file is decoded
/// once at open; `acquire` emits its samples in `buffer_duration_ms`
/// slices with advancing timestamps.
pub struct FileDevice {
    path: String,
    sample_rate: u32,
    channels: u16,
    samples: Vec<i16>,
    emit_task: Option<JoinHandle<()>>,
    capturing: bool,
}

impl FileDevice {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        info!("Opening capture file: {}", path.display());

        let reader = WavReader::open(path).map_err(|e| match e {
            hound::Error::IoError(io) => DeviceError::DeviceNotFound(format!(
                "{}: {}",
                path.display(),
                io
            )),
            other => DeviceError::Unknown(format!("{}: {}", path.display(), other)),
        })?;

        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(DeviceError::Unknown(format!(
                "{}: stream reports zero audio channels",
                path.display()
            )));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DeviceError::Unknown(format!("failed to read samples: {}", e)))?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Capture file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
            emit_task: None,
            capturing: false,
        })
    }
}

#[async_trait]
impl CaptureDevice for FileDevice {
    async fn acquire(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<mpsc::Receiver<AudioChunk>, DeviceError> {
        if self.capturing {
            return Err(DeviceError::DeviceBusy(format!(
                "{} is already streaming",
                self.path
            )));
        }

        let (tx, rx) = mpsc::channel(100);

        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let samples = self.samples.clone();
        let chunk_ms = constraints.buffer_duration_ms.max(1);
        let samples_per_chunk =
            (sample_rate as u64 * channels as u64 * chunk_ms / 1000).max(1) as usize;

        let task = tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            for slice in samples.chunks(samples_per_chunk) {
                let chunk = AudioChunk {
                    samples: slice.to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms,
                };
                if tx.send(chunk).await.is_err() {
                    // Receiver dropped; stop replaying
                    break;
                }
                timestamp_ms += chunk_ms;
            }
        });

        self.emit_task = Some(task);
        self.capturing = true;

        Ok(rx)
    }

    async fn release(&mut self) -> Result<(), DeviceError> {
        if let Some(task) = self.emit_task.take() {
            // Let any in-flight chunk land before the channel closes
            if let Err(e) = task.await {
                warn!("File replay task panicked: {}", e);
            }
        }
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        &self.path
    }
}

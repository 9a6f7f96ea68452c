use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Audio sample data delivered by a capture device (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Constraints handed to the device when acquiring a stream
#[derive(Debug, Clone)]
pub struct CaptureConstraints {
    /// Target sample rate (chunks are normalized to this if needed)
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz for speech backends
            channels: 1,        // Mono
            buffer_duration_ms: 100,
        }
    }
}

/// Errors surfaced while acquiring or releasing a capture device.
///
/// Each variant maps to distinct remediation guidance shown to the
/// clinician, so acquisition failures are never collapsed into one
/// generic error.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("no capture device found: {0}")]
    DeviceNotFound(String),

    #[error("capture device is busy: {0}")]
    DeviceBusy(String),

    #[error("capture device error: {0}")]
    Unknown(String),
}

/// Audio capture device contract
///
/// The physical input device is an external collaborator; this trait is
/// the narrow surface the recorder consumes. Implementations:
/// - `FileDevice`: replays a WAV file (testing / batch re-processing)
/// - hardware microphone backends live outside this crate
#[async_trait]
pub trait CaptureDevice: Send {
    /// Acquire the device and start capturing
    ///
    /// Returns a channel receiver that will receive audio chunks. The
    /// device must supply at least one active audio channel; violations
    /// surface as a typed error and leave the device unacquired.
    async fn acquire(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<mpsc::Receiver<AudioChunk>, DeviceError>;

    /// Release the hardware handle and stop capturing
    ///
    /// Idempotent: releasing an unacquired device is a no-op.
    async fn release(&mut self) -> Result<(), DeviceError>;

    /// Check if the device is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// Capture source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Physical microphone (requires a hardware backend)
    Microphone,
    /// WAV file replay (testing / batch re-processing)
    File(String),
}

/// Capture device factory
pub struct DeviceFactory;

impl DeviceFactory {
    /// Create a capture device for the given source
    pub fn create(source: CaptureSource) -> Result<Box<dyn CaptureDevice>, DeviceError> {
        match source {
            CaptureSource::Microphone => Err(DeviceError::DeviceNotFound(
                "no microphone backend compiled into this build; \
                 attach a hardware capture collaborator"
                    .to_string(),
            )),

            CaptureSource::File(path) => {
                let device = super::file::FileDevice::open(path)?;
                Ok(Box::new(device))
            }
        }
    }
}

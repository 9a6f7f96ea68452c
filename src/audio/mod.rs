pub mod device;
pub mod file;
pub mod recorder;
pub mod segment;

pub use device::{
    AudioChunk, CaptureConstraints, CaptureDevice, CaptureSource, DeviceError, DeviceFactory,
};
pub use file::FileDevice;
pub use recorder::{RecordError, RecordState, SegmentRecorder};
pub use segment::{AudioSegment, SegmentStore, SegmentSummary};

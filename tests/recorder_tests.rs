// Integration tests for the segment recorder
//
// A scripted capture device stands in for the microphone so the state
// machine, validity checks and teardown discipline can be exercised
// without hardware.

use anyhow::Result;
use async_trait::async_trait;
use consult_scribe::audio::{
    AudioChunk, CaptureConstraints, CaptureDevice, DeviceError, FileDevice, RecordError,
    RecordState, SegmentRecorder, SegmentStore,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};

/// Capture device that replays a fixed chunk script on every acquire
struct ScriptedDevice {
    chunks: Vec<AudioChunk>,
    acquire_error: Option<DeviceError>,
    capturing: bool,
    released: Arc<AtomicBool>,
}

impl ScriptedDevice {
    fn new(chunks: Vec<AudioChunk>) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        (
            Self {
                chunks,
                acquire_error: None,
                capturing: false,
                released: Arc::clone(&released),
            },
            released,
        )
    }

    fn failing(error: DeviceError) -> Self {
        Self {
            chunks: Vec::new(),
            acquire_error: Some(error),
            capturing: false,
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn acquire(
        &mut self,
        _constraints: &CaptureConstraints,
    ) -> Result<mpsc::Receiver<AudioChunk>, DeviceError> {
        if let Some(e) = self.acquire_error.take() {
            return Err(e);
        }

        let (tx, rx) = mpsc::channel(self.chunks.len() + 1);
        for chunk in self.chunks.clone() {
            tx.send(chunk).await.map_err(|e| {
                DeviceError::Unknown(format!("scripted send failed: {}", e))
            })?;
        }
        // Dropping tx closes the stream once the script is exhausted

        self.capturing = true;
        self.released.store(false, Ordering::SeqCst);
        Ok(rx)
    }

    async fn release(&mut self) -> Result<(), DeviceError> {
        self.capturing = false;
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn mono_chunk(samples: usize, timestamp_ms: u64) -> AudioChunk {
    AudioChunk {
        samples: vec![100i16; samples],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

fn new_recorder(
    device: Box<dyn CaptureDevice>,
    min_segment_bytes: usize,
) -> (SegmentRecorder, Arc<Mutex<SegmentStore>>, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let store = Arc::new(Mutex::new(SegmentStore::new(temp_dir.path())));
    let recorder = SegmentRecorder::new(
        device,
        Arc::clone(&store),
        CaptureConstraints::default(),
        min_segment_bytes,
    );
    (recorder, store, temp_dir)
}

#[tokio::test]
async fn test_stop_with_no_audio_rejects_segment() -> Result<()> {
    // Scenario C: zero bytes buffered -> NoAudioCaptured, store unchanged
    let (device, released) = ScriptedDevice::new(Vec::new());
    let (mut recorder, store, _dir) = new_recorder(Box::new(device), 1024);

    recorder.start().await?;
    let result = recorder.stop().await;

    assert!(matches!(result, Err(RecordError::NoAudioCaptured)));
    assert_eq!(store.lock().await.len(), 0, "No empty segment should be stored");
    assert!(released.load(Ordering::SeqCst), "Device must be released on error paths");
    assert_eq!(recorder.state(), RecordState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_stop_with_tiny_audio_rejects_segment() -> Result<()> {
    // 10 samples = 20 PCM bytes + header, far below the minimum
    let (device, released) = ScriptedDevice::new(vec![mono_chunk(10, 0)]);
    let (mut recorder, store, _dir) = new_recorder(Box::new(device), 4096);

    recorder.start().await?;
    let result = recorder.stop().await;

    match result {
        Err(RecordError::AudioTooSmall { bytes, min_bytes }) => {
            assert!(bytes < min_bytes);
            assert_eq!(min_bytes, 4096);
        }
        other => panic!("Expected AudioTooSmall, got {:?}", other),
    }

    assert_eq!(store.lock().await.len(), 0);
    assert!(released.load(Ordering::SeqCst));

    Ok(())
}

#[tokio::test]
async fn test_finalized_segment_lands_in_store() -> Result<()> {
    // 16000 samples = 1s of audio at 16kHz, comfortably above minimum
    let chunks = vec![mono_chunk(1600, 0), mono_chunk(1600, 100), mono_chunk(1600, 200)];
    let (device, released) = ScriptedDevice::new(chunks);
    let (mut recorder, store, _dir) = new_recorder(Box::new(device), 1024);

    recorder.start().await?;
    assert_eq!(recorder.state(), RecordState::Recording);

    let summary = recorder.stop().await?;

    assert_eq!(summary.media_type, "audio/wav");
    assert!(summary.size_bytes > 1024);
    assert!(summary.duration_seconds >= 0.0);

    let store = store.lock().await;
    assert_eq!(store.len(), 1);
    assert_eq!(store.all()[0].id, summary.id);
    assert!(released.load(Ordering::SeqCst));

    Ok(())
}

#[tokio::test]
async fn test_stop_without_start_is_an_error() {
    let (device, _released) = ScriptedDevice::new(Vec::new());
    let (mut recorder, _store, _dir) = new_recorder(Box::new(device), 1024);

    let result = recorder.stop().await;
    assert!(matches!(result, Err(RecordError::NotRecording)));
}

#[tokio::test]
async fn test_device_acquire_error_is_typed_and_terminal() -> Result<()> {
    let device = ScriptedDevice::failing(DeviceError::PermissionDenied(
        "microphone access was denied".to_string(),
    ));
    let (mut recorder, store, _dir) = new_recorder(Box::new(device), 1024);

    let result = recorder.start().await;

    match result {
        Err(RecordError::Device(DeviceError::PermissionDenied(msg))) => {
            assert!(msg.contains("denied"));
        }
        other => panic!("Expected PermissionDenied, got {:?}", other),
    }

    // The session stays Idle and the store untouched
    assert_eq!(recorder.state(), RecordState::Idle);
    assert_eq!(store.lock().await.len(), 0);

    Ok(())
}

#[tokio::test]
async fn test_restart_tears_down_previous_stream() -> Result<()> {
    let chunks = vec![mono_chunk(1600, 0), mono_chunk(1600, 100)];
    let (device, _released) = ScriptedDevice::new(chunks);
    let (mut recorder, store, _dir) = new_recorder(Box::new(device), 1024);

    recorder.start().await?;
    // Second start abandons the first segment's buffer entirely
    recorder.start().await?;

    let summary = recorder.stop().await?;
    assert_eq!(store.lock().await.len(), 1, "Only the second segment is finalized");
    assert!(summary.size_bytes > 0);

    Ok(())
}

#[tokio::test]
async fn test_chunks_are_normalized_to_mono_16khz() -> Result<()> {
    // 32kHz stereo in; the stored WAV must be 16kHz mono
    let stereo = AudioChunk {
        samples: vec![500i16; 64000], // 1s of 32kHz stereo
        sample_rate: 32000,
        channels: 2,
        timestamp_ms: 0,
    };
    let (device, _released) = ScriptedDevice::new(vec![stereo]);
    let (mut recorder, store, _dir) = new_recorder(Box::new(device), 1024);

    recorder.start().await?;
    let summary = recorder.stop().await?;

    let store = store.lock().await;
    let (_, bytes) = store.bytes_of(summary.id).expect("segment present");

    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.channels, 1);

    Ok(())
}

#[tokio::test]
async fn test_multiple_segments_in_one_session() -> Result<()> {
    // Two start/stop rounds on the same recorder produce two ordered
    // segments; the session clock keeps running between them
    let temp_dir = TempDir::new()?;
    let store = Arc::new(Mutex::new(SegmentStore::new(temp_dir.path())));

    let (device, _released) = ScriptedDevice::new(vec![mono_chunk(1600, 0)]);
    let mut recorder = SegmentRecorder::new(
        Box::new(device),
        Arc::clone(&store),
        CaptureConstraints::default(),
        128,
    );

    recorder.start().await?;
    let first = recorder.stop().await?;

    recorder.start().await?;
    let second = recorder.stop().await?;

    let store = store.lock().await;
    let ids: Vec<_> = store.all().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![first.id, second.id], "Finalization order matches store order");

    Ok(())
}

#[tokio::test]
async fn test_file_device_drives_full_recording() -> Result<()> {
    // End to end with the WAV-replay device: write a fixture, replay it,
    // and expect one finalized segment in the store
    let temp_dir = TempDir::new()?;
    let fixture_path = temp_dir.path().join("fixture.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&fixture_path, spec)?;
    for i in 0..8000 {
        writer.write_sample((i % 256) as i16)?;
    }
    writer.finalize()?;

    let device = FileDevice::open(&fixture_path).map_err(|e| anyhow::anyhow!(e))?;

    let store = Arc::new(Mutex::new(SegmentStore::new(temp_dir.path().join("store"))));
    let mut recorder = SegmentRecorder::new(
        Box::new(device),
        Arc::clone(&store),
        CaptureConstraints::default(),
        1024,
    );

    recorder.start().await?;
    let summary = recorder.stop().await?;

    assert_eq!(store.lock().await.len(), 1);
    assert!(summary.size_bytes > 1024);

    Ok(())
}

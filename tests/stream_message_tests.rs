// Wire-message tests for the transcription channels
//
// The tagged stream-event enum is decoded exactly once at the channel
// boundary; these tests pin the shapes both directions.

use base64::Engine;
use consult_scribe::transcribe::{
    AudioFrameMessage, BatchRequest, BatchResponse, StreamEvent, StreamStatus,
};

#[test]
fn test_audio_frame_serialization() {
    let msg = AudioFrameMessage {
        session_id: "consult-42".to_string(),
        sequence: 0,
        pcm: base64::engine::general_purpose::STANDARD.encode([0u8; 100]),
        sample_rate: 16000,
        channels: 1,
        timestamp: "2026-08-07T14:30:00Z".to_string(),
        final_frame: false,
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("consult-42"));
    assert!(json.contains("16000"));
    assert!(json.contains("\"final\":false"));
    assert!(json.contains("\"sequence\":0"));

    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.session_id, "consult-42");
    assert_eq!(deserialized.sample_rate, 16000);
    assert_eq!(deserialized.channels, 1);
    assert!(!deserialized.final_frame);
}

#[test]
fn test_audio_frame_final_marker() {
    let msg = AudioFrameMessage {
        session_id: "consult-42".to_string(),
        sequence: 10,
        pcm: String::new(), // Empty for the final marker
        sample_rate: 16000,
        channels: 1,
        timestamp: "2026-08-07T14:30:00Z".to_string(),
        final_frame: true,
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"final\":true"));

    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();
    assert!(deserialized.final_frame);
    assert!(deserialized.pcm.is_empty());
    assert_eq!(deserialized.sequence, 10);
}

#[test]
fn test_transcript_event_decoding() {
    let json = r#"{
        "type": "transcript",
        "text": "patient reports headache",
        "is_final": false
    }"#;

    let event: StreamEvent = serde_json::from_str(json).unwrap();
    match event {
        StreamEvent::Transcript { text, is_final } => {
            assert_eq!(text, "patient reports headache");
            assert!(!is_final);
        }
        other => panic!("Expected transcript event, got {:?}", other),
    }
}

#[test]
fn test_status_event_decoding() {
    let json = r#"{"type": "status", "status": "connected"}"#;

    let event: StreamEvent = serde_json::from_str(json).unwrap();
    match event {
        StreamEvent::Status { status } => assert_eq!(status, StreamStatus::Connected),
        other => panic!("Expected status event, got {:?}", other),
    }

    let json = r#"{"type": "status", "status": "disconnected"}"#;
    let event: StreamEvent = serde_json::from_str(json).unwrap();
    assert!(matches!(
        event,
        StreamEvent::Status {
            status: StreamStatus::Disconnected
        }
    ));
}

#[test]
fn test_error_event_decoding() {
    let json = r#"{"type": "error", "message": "model overloaded"}"#;

    let event: StreamEvent = serde_json::from_str(json).unwrap();
    match event {
        StreamEvent::Error { message } => assert_eq!(message, "model overloaded"),
        other => panic!("Expected error event, got {:?}", other),
    }
}

#[test]
fn test_unknown_event_type_is_rejected() {
    let json = r#"{"type": "speaker_change", "speaker": 2}"#;

    let result: Result<StreamEvent, _> = serde_json::from_str(json);
    assert!(result.is_err(), "Unknown tags must fail decoding, not be guessed at");
}

#[test]
fn test_batch_request_roundtrip() {
    let request = BatchRequest {
        segment_id: "0d9c9e07-6a3e-4a8d-9d9f-0a4f8c1a2b3c".to_string(),
        audio: base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3, 4]),
        media_type: "audio/wav".to_string(),
    };

    let json = serde_json::to_string(&request).unwrap();
    let deserialized: BatchRequest = serde_json::from_str(&json).unwrap();

    assert_eq!(deserialized.segment_id, request.segment_id);
    assert_eq!(deserialized.media_type, "audio/wav");

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(&deserialized.audio)
        .unwrap();
    assert_eq!(decoded, vec![1u8, 2, 3, 4]);
}

#[test]
fn test_batch_response_decoding() {
    let json = r#"{"text": "patient reports headache since tuesday"}"#;

    let response: BatchResponse = serde_json::from_str(json).unwrap();
    assert_eq!(response.text, "patient reports headache since tuesday");
}

#[test]
fn test_pcm_encoding_roundtrip() {
    let original_samples: Vec<i16> = vec![100, -200, 300, -400];

    let pcm_bytes: Vec<u8> = original_samples
        .iter()
        .flat_map(|&s| s.to_le_bytes())
        .collect();

    let encoded = base64::engine::general_purpose::STANDARD.encode(&pcm_bytes);

    let msg = AudioFrameMessage {
        session_id: "consult-42".to_string(),
        sequence: 0,
        pcm: encoded,
        sample_rate: 16000,
        channels: 1,
        timestamp: "2026-08-07T14:30:00Z".to_string(),
        final_frame: false,
    };

    let json = serde_json::to_string(&msg).unwrap();
    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();

    let decoded_bytes = base64::engine::general_purpose::STANDARD
        .decode(&deserialized.pcm)
        .unwrap();

    let decoded_samples: Vec<i16> = decoded_bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    assert_eq!(decoded_samples, original_samples);
}

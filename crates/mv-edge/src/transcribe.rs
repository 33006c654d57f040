//! Simulated speech recognition (spec §1: the audio recognizer is an
//! out-of-scope external collaborator). Mirrors `mv_agent::speech`'s
//! simulated synthesis: the assembled audio buffer is treated as the
//! literal UTF-8 bytes the client "spoke", so the pipeline downstream of
//! transcription can be exercised without a real recognizer attached.

/// Transcribe an assembled audio buffer (all chunks of one utterance,
/// concatenated in arrival order). Returns `None` when the buffer isn't
/// valid UTF-8 — the caller degrades to an error frame rather than
/// failing the turn.
pub fn transcribe(audio_bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8(audio_bytes.to_vec()).ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcribes_utf8_payload() {
        assert_eq!(transcribe(b"how is apple doing"), Some("how is apple doing".to_string()));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(transcribe(&[0xff, 0xfe, 0xfd]).is_none());
    }

    #[test]
    fn rejects_blank_payload() {
        assert!(transcribe(b"   ").is_none());
    }
}

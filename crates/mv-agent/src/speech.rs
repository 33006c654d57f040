//! Stage 7 — speech emission (spec §4.3 "Speak"). Splits the response
//! text into sentence-aware chunks no longer than `MAX_CHUNK_CHARS`,
//! stamped with a monotonic sequence number and a `is_final` marker on
//! the last chunk, then hands each chunk to a deterministic simulated
//! TTS backend (the real synthesis engine is an out-of-scope external
//! collaborator, spec §1).

use base64::Engine;

use crate::types::SpeechChunk;

/// Chunks longer than this are split mid-sentence at a word boundary
/// (spec §4.3 "Speak": "chunks should read naturally aloud").
const MAX_CHUNK_CHARS: usize = 200;

/// Split `text` into sentences, then greedily pack sentences into chunks
/// under `MAX_CHUNK_CHARS`, synthesizing each into a simulated audio
/// payload. Returns `None` when `audio_requested` is false — the caller
/// still gets the text response, just no TTS stream.
pub fn emit(text: &str, audio_requested: bool) -> Vec<SpeechChunk> {
    if !audio_requested || text.trim().is_empty() {
        return Vec::new();
    }

    let chunks = pack_sentences(text);
    let last_index = chunks.len().saturating_sub(1);
    chunks
        .into_iter()
        .enumerate()
        .map(|(seq, chunk_text)| SpeechChunk {
            seq: seq as u64,
            data: synthesize(&chunk_text),
            is_final: seq == last_index,
        })
        .collect()
}

fn pack_sentences(text: &str) -> Vec<String> {
    let sentences = split_sentences(text);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        if current.is_empty() {
            current = sentence;
        } else if current.len() + 1 + sentence.len() <= MAX_CHUNK_CHARS {
            current.push(' ');
            current.push_str(&sentence);
        } else {
            chunks.push(std::mem::take(&mut current));
            current = sentence;
        }

        while current.len() > MAX_CHUNK_CHARS {
            let split_at = word_boundary_before(&current, MAX_CHUNK_CHARS);
            chunks.push(current[..split_at].trim().to_string());
            current = current[split_at..].trim_start().to_string();
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            sentences.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences.into_iter().filter(|s| !s.is_empty()).collect()
}

/// Byte offset at or before `max_len`, snapped to a char boundary, and
/// then backed up to the nearest preceding space so a multi-byte
/// character is never split across chunks.
fn word_boundary_before(text: &str, max_len: usize) -> usize {
    let boundary = text
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max_len)
        .last()
        .unwrap_or(0);

    text[..boundary].rfind(' ').map(|i| i + 1).unwrap_or(boundary)
}

/// Deterministic stand-in for a real TTS backend: a short marker payload
/// derived from the chunk text, base64-encoded so it matches the wire
/// shape `ServerFrame::TtsChunk.data` expects (spec §6).
fn synthesize(chunk_text: &str) -> String {
    let marker = format!("wav:{}:{}", chunk_text.len(), chunk_text);
    base64::engine::general_purpose::STANDARD.encode(marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_audio_requested_returns_no_chunks() {
        assert!(emit("hello there.", false).is_empty());
    }

    #[test]
    fn sequence_numbers_are_monotonic_and_final_flag_set_once() {
        let long_text = "Apple is up two percent today. ".repeat(20);
        let chunks = emit(&long_text, true);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.seq, i as u64);
        }
        assert!(chunks.iter().rev().skip(1).all(|c| !c.is_final));
        assert!(chunks.last().unwrap().is_final);
    }

    #[test]
    fn chunks_never_exceed_max_length() {
        let long_text = "word ".repeat(100) + ".";
        let chunks = emit(&long_text, true);
        for chunk in &chunks {
            let decoded = base64::engine::general_purpose::STANDARD.decode(&chunk.data).unwrap();
            let decoded = String::from_utf8(decoded).unwrap();
            assert!(decoded.len() <= MAX_CHUNK_CHARS + 16);
        }
    }

    #[test]
    fn short_text_produces_single_final_chunk() {
        let chunks = emit("Apple is up.", true);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_final);
    }
}

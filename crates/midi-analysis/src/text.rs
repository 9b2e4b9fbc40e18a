//! Best-effort decoding of MIDI meta-event text.
//!
//! SMF text events carry raw bytes with no declared encoding. Files authored
//! in Japanese and Chinese sequencers commonly use Shift-JIS or GB18030, so
//! those are tried before falling back to Latin-1, which never fails.

use encoding_rs::{GB18030, SHIFT_JIS};

/// Decode meta-event bytes: UTF-8, then Shift-JIS, then GB18030, then Latin-1.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    for encoding in [SHIFT_JIS, GB18030] {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return text.into_owned();
        }
    }

    bytes.iter().map(|&b| b as char).collect()
}

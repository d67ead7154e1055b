//! Fixed-size framing for telephony consumers

use bytes::Bytes;

/// Bytes per frame: 20 ms of 8 kHz, 16-bit mono PCM
pub const FRAME_SIZE: usize = 320;

/// Split a buffer into consecutive [`FRAME_SIZE`] frames
///
/// Every frame but the last is exactly `FRAME_SIZE` bytes; the last holds
/// the remainder and is never padded. Frames share the buffer's storage.
pub fn frames(audio: Bytes) -> impl Iterator<Item = Bytes> + Send {
    let len = audio.len();

    (0..len)
        .step_by(FRAME_SIZE)
        .map(move |start| audio.slice(start..len.min(start + FRAME_SIZE)))
}

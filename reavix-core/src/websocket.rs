//! Server-to-client WebSocket text frames.
//!
//! Frames are unmasked with FIN set. Payloads up to 125 bytes use the single length byte,
//! up to 65535 the 16-bit extended length; anything longer is refused.

use crate::CoreError;

/// FIN bit plus the text opcode.
pub const FIN_TEXT: u8 = 0x81;
/// Largest payload a single frame may carry.
pub const MAX_TEXT_PAYLOAD: usize = u16::MAX as usize;

const EXTENDED_16: u8 = 126;

/// Encode `payload` as one text frame.
pub fn encode_text_frame(payload: &[u8]) -> Result<Vec<u8>, CoreError> {
    let len = payload.len();
    let mut frame = Vec::with_capacity(len + 4);
    frame.push(FIN_TEXT);
    if len <= 125 {
        frame.push(len as u8);
    } else if len <= MAX_TEXT_PAYLOAD {
        frame.push(EXTENDED_16);
        frame.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        return Err(CoreError::FrameTooLarge(len));
    }
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Split `data` into the payloads of a run of text frames as produced by
/// [`encode_text_frame`]. `None` unless the whole buffer is such a run with UTF-8 payloads.
pub fn decode_text_frames(data: &[u8]) -> Option<Vec<&str>> {
    let mut payloads = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let (&opcode, tail) = rest.split_first()?;
        let (&len_byte, tail) = tail.split_first()?;
        if opcode != FIN_TEXT || len_byte > EXTENDED_16 {
            return None;
        }
        let (len, tail) = if len_byte == EXTENDED_16 {
            let ext = tail.get(..2)?;
            (u16::from_be_bytes([ext[0], ext[1]]) as usize, &tail[2..])
        } else {
            (len_byte as usize, tail)
        };
        let payload = tail.get(..len)?;
        payloads.push(std::str::from_utf8(payload).ok()?);
        rest = &tail[len..];
    }
    Some(payloads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_payload_uses_single_length_byte() {
        let frame = encode_text_frame(b"hi").unwrap();
        assert_eq!(frame, vec![0x81, 2, b'h', b'i']);

        let frame = encode_text_frame(&[b'a'; 125]).unwrap();
        assert_eq!(frame[1], 125);
        assert_eq!(frame.len(), 127);
    }

    #[test]
    fn medium_payload_uses_16_bit_length() {
        let frame = encode_text_frame(&[b'a'; 126]).unwrap();
        assert_eq!(&frame[..4], &[0x81, 126, 0, 126]);
        assert_eq!(frame.len(), 130);

        let frame = encode_text_frame(&vec![b'a'; 65_535]).unwrap();
        assert_eq!(&frame[..4], &[0x81, 126, 0xff, 0xff]);
    }

    #[test]
    fn frame_runs_decode_back_to_payloads() {
        let mut data = encode_text_frame(b"a").unwrap();
        data.extend(encode_text_frame(&[b'b'; 300]).unwrap());
        let payloads = decode_text_frames(&data).unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0], "a");
        assert_eq!(payloads[1].len(), 300);
        assert_eq!(decode_text_frames(b""), Some(vec![]));
    }

    #[test]
    fn non_frame_bytes_do_not_decode() {
        assert!(decode_text_frames(br#"{"error":{"code":401}}"#).is_none());
        // Truncated payload.
        assert!(decode_text_frames(&[0x81, 5, b'a']).is_none());
        // Masked or 64-bit lengths are never produced here.
        assert!(decode_text_frames(&[0x81, 0x82, 0, 0, 0, 0, b'a', b'b']).is_none());
        assert!(decode_text_frames(&[0x81, 1, 0xff]).is_none());
    }

    #[test]
    fn oversized_payload_is_refused() {
        let err = encode_text_frame(&vec![b'a'; 65_536]).unwrap_err();
        assert!(matches!(err, CoreError::FrameTooLarge(65_536)));
    }
}

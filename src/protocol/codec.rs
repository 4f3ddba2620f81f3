//! Protocol codec for encoding/decoding datagrams
//!
//! Datagrams are self-delimiting, so there is no framing state: one
//! datagram always carries exactly one message.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::{Message, Opcode, MAX_PAYLOAD};

/// Codec errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Empty datagram")]
    Empty,

    #[error("Unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    #[error("Truncated {opcode} header: {len} bytes (need {need})")]
    Truncated { opcode: Opcode, len: usize, need: usize },

    #[error("Identifier is not valid UTF-8")]
    InvalidUtf8,

    #[error("Message too large: {0} bytes (max: {1})")]
    PayloadTooLarge(usize, usize),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Encode a message into a single datagram
pub fn encode(message: &Message) -> CodecResult<Bytes> {
    let opcode = message.opcode();
    let identifier = message.identifier().as_bytes();
    let len = opcode.header_len() + identifier.len();

    // Truncating would risk splitting a multi-byte character, so refuse instead
    if len > MAX_PAYLOAD {
        return Err(CodecError::PayloadTooLarge(len, MAX_PAYLOAD));
    }

    let mut buf = BytesMut::with_capacity(len);
    buf.put_u8(opcode as u8);
    if let Some(frame) = message.frame() {
        buf.put_i64(frame);
    }
    buf.put_slice(identifier);

    Ok(buf.freeze())
}

/// Decode a single datagram
pub fn decode(datagram: &[u8]) -> CodecResult<Message> {
    let mut buf = datagram;
    if !buf.has_remaining() {
        return Err(CodecError::Empty);
    }

    let opcode = Opcode::try_from(buf.get_u8()).map_err(CodecError::UnknownOpcode)?;
    if datagram.len() < opcode.header_len() {
        return Err(CodecError::Truncated {
            opcode,
            len: datagram.len(),
            need: opcode.header_len(),
        });
    }

    let message = match opcode {
        Opcode::SongSelected => Message::SongSelected {
            identifier: read_identifier(buf)?,
        },
        Opcode::ReadyToPreview => {
            let frame = buf.get_i64();
            Message::ReadyToPreview {
                frame,
                identifier: read_identifier(buf)?,
            }
        }
        Opcode::ReadyToStart => {
            let frame = buf.get_i64();
            Message::ReadyToStart {
                frame,
                identifier: read_identifier(buf)?,
            }
        }
    };

    Ok(message)
}

fn read_identifier(rest: &[u8]) -> CodecResult<String> {
    std::str::from_utf8(rest)
        .map(str::to_owned)
        .map_err(|_| CodecError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_to_start_roundtrip() {
        let original = Message::ReadyToStart {
            frame: -123_456_789_012,
            identifier: "ダンス/Über Song ♪".to_string(),
        };

        let bytes = encode(&original).unwrap();
        assert_eq!(decode(&bytes).unwrap(), original);
    }

    #[test]
    fn test_wire_layout() {
        let bytes = encode(&Message::ReadyToPreview {
            frame: 0x0102_0304_0506_0708,
            identifier: "a/b".to_string(),
        })
        .unwrap();
        assert_eq!(
            &bytes[..],
            &[1, 1, 2, 3, 4, 5, 6, 7, 8, b'a', b'/', b'b']
        );

        let bytes = encode(&Message::SongSelected {
            identifier: "x".to_string(),
        })
        .unwrap();
        assert_eq!(&bytes[..], &[0, b'x']);

        let bytes = encode(&Message::ReadyToStart {
            frame: -1,
            identifier: String::new(),
        })
        .unwrap();
        assert_eq!(&bytes[..], &[2, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_payload_bound() {
        let fits = Message::ReadyToStart {
            frame: 7,
            identifier: "é".repeat((MAX_PAYLOAD - 9) / 2),
        };
        let bytes = encode(&fits).unwrap();
        assert!(bytes.len() <= MAX_PAYLOAD);
        assert_eq!(decode(&bytes).unwrap(), fits);

        let too_big = Message::SongSelected {
            identifier: "x".repeat(MAX_PAYLOAD),
        };
        assert_eq!(
            encode(&too_big),
            Err(CodecError::PayloadTooLarge(MAX_PAYLOAD + 1, MAX_PAYLOAD))
        );
    }

    #[test]
    fn test_malformed_datagrams() {
        assert_eq!(decode(&[]), Err(CodecError::Empty));
        assert_eq!(decode(&[9, 1, 2]), Err(CodecError::UnknownOpcode(9)));
        assert!(matches!(
            decode(&[2, 0, 0, 0]),
            Err(CodecError::Truncated { opcode: Opcode::ReadyToStart, len: 4, need: 9 })
        ));
        assert_eq!(decode(&[0, 0xff, 0xfe]), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn test_empty_identifier_is_valid() {
        assert_eq!(
            decode(&[0]).unwrap(),
            Message::SongSelected { identifier: String::new() }
        );
    }
}

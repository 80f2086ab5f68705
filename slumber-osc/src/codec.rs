//! Control message encoding and decoding.

use slumber_core::{ControlMessage, OscValue};

use crate::error::CodecError;

const BUNDLE_TAG: &[u8] = b"#bundle\0";
/// Tag (8 bytes) plus NTP time tag (8 bytes).
const BUNDLE_HEADER_LEN: usize = 16;

mod tag {
    pub const TRUE: u8 = b'T';
    pub const FALSE: u8 = b'F';
    pub const INT: u8 = b'i';
    pub const FLOAT: u8 = b'f';
    pub const STRING: u8 = b's';
}

/// Encode one message to a datagram payload.
pub fn encode(message: &ControlMessage) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.address.len() + 8 + message.values.len() * 8);
    write_padded_str(&mut out, message.address.as_bytes());

    let mut tags = Vec::with_capacity(message.values.len() + 1);
    tags.push(b',');
    for value in &message.values {
        tags.push(match value {
            OscValue::Bool(true) => tag::TRUE,
            OscValue::Bool(false) => tag::FALSE,
            OscValue::Int(_) => tag::INT,
            OscValue::Float(_) => tag::FLOAT,
            OscValue::String(_) => tag::STRING,
        });
    }
    write_padded_str(&mut out, &tags);

    for value in &message.values {
        match value {
            OscValue::Bool(_) => {}
            OscValue::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            OscValue::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
            OscValue::String(s) => write_padded_str(&mut out, s.as_bytes()),
        }
    }
    out
}

/// Decode a datagram into its messages.
///
/// A plain message yields one entry; a bundle yields every message it
/// contains, depth-first, in packet order.
pub fn decode_packet(data: &[u8]) -> Result<Vec<ControlMessage>, CodecError> {
    if data.is_empty() {
        return Err(CodecError::Empty);
    }
    if data.starts_with(BUNDLE_TAG) {
        return decode_bundle(data);
    }
    decode_message(data).map(|message| vec![message])
}

fn decode_bundle(data: &[u8]) -> Result<Vec<ControlMessage>, CodecError> {
    let mut reader = Reader::new(data);
    reader.take(BUNDLE_HEADER_LEN)?;

    let mut messages = Vec::new();
    while !reader.is_done() {
        let size = u32::from_be_bytes(reader.take_array()?) as usize;
        let element = reader.take(size)?;
        messages.extend(decode_packet(element)?);
    }
    Ok(messages)
}

fn decode_message(data: &[u8]) -> Result<ControlMessage, CodecError> {
    let mut reader = Reader::new(data);
    let address = reader.read_str()?;
    if !address.starts_with('/') {
        return Err(CodecError::InvalidAddress);
    }

    // Type tags are optional in OSC 1.0; a bare address carries no values.
    if reader.is_done() {
        return Ok(ControlMessage::new(address, Vec::new()));
    }

    let tags = reader.read_str()?;
    let Some(tags) = tags.strip_prefix(',') else {
        return Err(CodecError::MissingTypeTags);
    };

    let mut values = Vec::with_capacity(tags.len());
    for tag in tags.bytes() {
        let value = match tag {
            tag::TRUE => OscValue::Bool(true),
            tag::FALSE => OscValue::Bool(false),
            tag::INT => OscValue::Int(i32::from_be_bytes(reader.take_array()?)),
            tag::FLOAT => OscValue::Float(f32::from_be_bytes(reader.take_array()?)),
            tag::STRING => OscValue::String(reader.read_str()?),
            other => return Err(CodecError::UnknownTypeTag(other as char)),
        };
        values.push(value);
    }

    Ok(ControlMessage::new(address, values))
}

fn write_padded_str(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(bytes);
    out.push(0);
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn pad4(len: usize) -> usize {
    (len + 3) & !3
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let available = self.data.len() - self.pos;
        if len > available {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: len,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array(&mut self) -> Result<[u8; 4], CodecError> {
        let slice = self.take(4)?;
        Ok([slice[0], slice[1], slice[2], slice[3]])
    }

    fn read_str(&mut self) -> Result<String, CodecError> {
        let offset = self.pos;
        let rest = &self.data[offset..];
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(CodecError::UnterminatedString { offset })?;
        let text = std::str::from_utf8(&rest[..nul])
            .map_err(|_| CodecError::InvalidUtf8 { offset })?
            .to_string();
        self.take(pad4(nul + 1))?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_message_matches_reference_bytes() {
        let bytes = encode(&ControlMessage::bool("/a", true));
        assert_eq!(bytes, b"/a\0\0,T\0\0");
    }

    #[test]
    fn int_payload_is_big_endian() {
        let bytes = encode(&ControlMessage::int("/cmd", 1));
        assert_eq!(&bytes[..8], b"/cmd\0\0\0\0");
        assert_eq!(&bytes[8..12], b",i\0\0");
        assert_eq!(&bytes[12..], &[0, 0, 0, 1]);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = decode_packet(b"/x\0\0,h\0\0\0\0\0\0\0\0\0\0").unwrap_err();
        assert_eq!(err, CodecError::UnknownTypeTag('h'));
    }

    #[test]
    fn truncated_int_is_rejected() {
        let err = decode_packet(b"/x\0\0,i\0\0\0\0").unwrap_err();
        assert!(matches!(err, CodecError::Truncated { needed: 4, .. }), "got: {err}");
    }

    #[test]
    fn address_without_type_tags_has_no_values() {
        let messages = decode_packet(b"/avatar/change\0\0").expect("decode");
        assert_eq!(messages, vec![ControlMessage::new("/avatar/change", vec![])]);
    }

    #[test]
    fn non_slash_address_is_rejected() {
        assert_eq!(
            decode_packet(b"abc\0,T\0\0").unwrap_err(),
            CodecError::InvalidAddress
        );
    }
}

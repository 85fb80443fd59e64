//! Versioned tagged binary layout.
//!
//! ```text
//! entry  := MAGIC VERSION field*
//! field  := tag:u8 len:u32be payload[len]
//! ```
//!
//! | tag | field            | payload                                    |
//! |-----|------------------|--------------------------------------------|
//! | 1   | status           | `u16be`                                    |
//! | 2   | reason phrase    | UTF-8                                      |
//! | 3   | version          | `major:u8 minor:u8`                        |
//! | 4   | headers          | header list                                |
//! | 5   | content headers  | header list                                |
//! | 6   | body             | raw bytes                                  |
//!
//! A header list is `count:u32be` entries of `name:str values:u32be str*`
//! where `str` is `len:u32be` UTF-8 bytes.
//!
//! Decoding skips tags it does not know and defaults every field except the
//! status, so new fields can be added without bumping [`VERSION`]. The
//! version only changes when an existing field changes meaning.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use stashbox_core::{CachedResponse, HeaderList, HttpVersion, Raw};

use super::{Format, FormatError, FormatTypeId};

const MAGIC: u8 = 0xCB;

/// Schema version written by this encoder.
pub const VERSION: u8 = 1;

const TAG_STATUS: u8 = 1;
const TAG_REASON: u8 = 2;
const TAG_VERSION: u8 = 3;
const TAG_HEADERS: u8 = 4;
const TAG_CONTENT_HEADERS: u8 = 5;
const TAG_BODY: u8 = 6;

/// Compact binary format (default).
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryFormat;

impl Format for BinaryFormat {
    fn encode(&self, value: &CachedResponse) -> Result<Raw, FormatError> {
        let mut buf = BytesMut::with_capacity(64 + value.memory_size());
        buf.put_u8(MAGIC);
        buf.put_u8(VERSION);

        put_field(&mut buf, TAG_STATUS, &value.status.to_be_bytes())?;
        put_field(&mut buf, TAG_REASON, value.reason.as_bytes())?;
        put_field(
            &mut buf,
            TAG_VERSION,
            &[value.version.major, value.version.minor],
        )?;
        put_field(&mut buf, TAG_HEADERS, &encode_headers(&value.headers)?)?;
        put_field(
            &mut buf,
            TAG_CONTENT_HEADERS,
            &encode_headers(&value.content_headers)?,
        )?;
        put_field(&mut buf, TAG_BODY, &value.body)?;

        Ok(buf.freeze())
    }

    fn decode(&self, data: &[u8]) -> Result<CachedResponse, FormatError> {
        let mut buf = data;
        if buf.remaining() < 2 {
            return Err(FormatError::Truncated);
        }
        if buf.get_u8() != MAGIC {
            return Err(FormatError::malformed("not a stashbox binary entry"));
        }
        let version = buf.get_u8();
        if version > VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                supported: VERSION,
            });
        }

        let mut status = None;
        let mut response = CachedResponse::new(0);

        while buf.has_remaining() {
            if buf.remaining() < 5 {
                return Err(FormatError::Truncated);
            }
            let tag = buf.get_u8();
            let len = buf.get_u32() as usize;
            if buf.remaining() < len {
                return Err(FormatError::Truncated);
            }
            let (mut payload, rest) = buf.split_at(len);
            buf = rest;

            match tag {
                TAG_STATUS => {
                    if payload.len() != 2 {
                        return Err(FormatError::malformed("status field must be two bytes"));
                    }
                    status = Some(payload.get_u16());
                }
                TAG_REASON => response.reason = utf8(payload)?,
                TAG_VERSION => {
                    if payload.len() != 2 {
                        return Err(FormatError::malformed("version field must be two bytes"));
                    }
                    response.version = HttpVersion::new(payload[0], payload[1]);
                }
                TAG_HEADERS => response.headers = decode_headers(payload)?,
                TAG_CONTENT_HEADERS => response.content_headers = decode_headers(payload)?,
                TAG_BODY => response.body = Bytes::copy_from_slice(payload),
                _ => {}
            }
        }

        response.status = status.ok_or_else(|| FormatError::malformed("entry has no status field"))?;
        Ok(response)
    }

    fn clone_box(&self) -> Box<dyn Format> {
        Box::new(*self)
    }

    fn format_type_id(&self) -> FormatTypeId {
        FormatTypeId::Binary
    }
}

fn put_len(buf: &mut BytesMut, len: usize) -> Result<(), FormatError> {
    let len = u32::try_from(len).map_err(|e| FormatError::Serialize(Box::new(e)))?;
    buf.put_u32(len);
    Ok(())
}

fn put_field(buf: &mut BytesMut, tag: u8, payload: &[u8]) -> Result<(), FormatError> {
    buf.put_u8(tag);
    put_len(buf, payload.len())?;
    buf.put_slice(payload);
    Ok(())
}

fn put_str(buf: &mut BytesMut, s: &str) -> Result<(), FormatError> {
    put_len(buf, s.len())?;
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn encode_headers(headers: &HeaderList) -> Result<BytesMut, FormatError> {
    let mut buf = BytesMut::with_capacity(4 + headers.byte_len() + headers.len() * 8);
    put_len(&mut buf, headers.len())?;
    for (name, values) in headers.iter() {
        put_str(&mut buf, name)?;
        put_len(&mut buf, values.len())?;
        for value in values {
            put_str(&mut buf, value)?;
        }
    }
    Ok(buf)
}

fn get_u32(buf: &mut &[u8]) -> Result<usize, FormatError> {
    if buf.remaining() < 4 {
        return Err(FormatError::Truncated);
    }
    Ok(buf.get_u32() as usize)
}

fn get_str(buf: &mut &[u8]) -> Result<String, FormatError> {
    let len = get_u32(buf)?;
    if buf.remaining() < len {
        return Err(FormatError::Truncated);
    }
    let (s, rest) = buf.split_at(len);
    *buf = rest;
    utf8(s)
}

fn utf8(bytes: &[u8]) -> Result<String, FormatError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| FormatError::Deserialize(Box::new(e)))
}

fn decode_headers(mut buf: &[u8]) -> Result<HeaderList, FormatError> {
    let count = get_u32(&mut buf)?;
    let mut headers = HeaderList::new();
    for _ in 0..count {
        let name = get_str(&mut buf)?;
        let value_count = get_u32(&mut buf)?;
        let mut values = Vec::with_capacity(value_count.min(buf.remaining() / 4));
        for _ in 0..value_count {
            values.push(get_str(&mut buf)?);
        }
        headers.push(name, values);
    }
    Ok(headers)
}

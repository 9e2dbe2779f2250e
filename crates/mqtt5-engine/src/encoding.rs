//! Primitive MQTT data representations: Variable Byte Integers, length
//! prefixed UTF-8 strings and length prefixed binary data.
//!
//! A Variable Byte Integer carries 7 bits per byte, least significant group
//! first, with bit 7 set on every byte except the last. Four bytes at most,
//! so the largest value is 268,435,455.

use crate::constants::limits::{
    MAX_STRING_LENGTH, MAX_VARIABLE_BYTE_INTEGER, MAX_VARIABLE_BYTE_INTEGER_LEN,
};
use crate::constants::masks::{CONTINUATION_BIT, VARIABLE_BYTE_VALUE};
use crate::error::{MqttError, Result};
use bytes::{Buf, BufMut, Bytes};

/// # Errors
/// Returns `MalformedPacket` when the value exceeds 268,435,455.
pub fn encode_variable_int<B: BufMut>(buf: &mut B, value: u32) -> Result<()> {
    if value > MAX_VARIABLE_BYTE_INTEGER {
        return Err(MqttError::MalformedPacket(format!(
            "Variable byte integer {value} exceeds maximum {MAX_VARIABLE_BYTE_INTEGER}"
        )));
    }

    let mut remaining = value;
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (remaining & u32::from(VARIABLE_BYTE_VALUE)) as u8;
        remaining >>= 7;
        if remaining > 0 {
            byte |= CONTINUATION_BIT;
        }
        buf.put_u8(byte);
        if remaining == 0 {
            return Ok(());
        }
    }
}

/// # Errors
/// Returns `MalformedPacket` when the buffer ends mid-sequence or a fifth
/// byte would be needed.
pub fn decode_variable_int<B: Buf>(buf: &mut B) -> Result<u32> {
    let mut value = 0u32;

    for index in 0..MAX_VARIABLE_BYTE_INTEGER_LEN {
        if !buf.has_remaining() {
            return Err(MqttError::MalformedPacket(
                "Truncated variable byte integer".to_string(),
            ));
        }
        let byte = buf.get_u8();
        value |= u32::from(byte & VARIABLE_BYTE_VALUE) << (7 * index);
        if byte & CONTINUATION_BIT == 0 {
            return Ok(value);
        }
    }

    Err(MqttError::MalformedPacket(
        "Variable byte integer longer than 4 bytes".to_string(),
    ))
}

/// Decodes a Variable Byte Integer at the start of `bytes` without consuming.
///
/// Returns `Ok(None)` while the sequence is still incomplete, otherwise the
/// value and the number of bytes it occupied.
///
/// # Errors
/// Returns `MalformedPacket` when the continuation bit is still set on the
/// fourth byte.
pub fn peek_variable_int(bytes: &[u8]) -> Result<Option<(u32, usize)>> {
    let mut value = 0u32;

    for (index, &byte) in bytes.iter().enumerate() {
        if index == MAX_VARIABLE_BYTE_INTEGER_LEN {
            break;
        }
        value |= u32::from(byte & VARIABLE_BYTE_VALUE) << (7 * index);
        if byte & CONTINUATION_BIT == 0 {
            return Ok(Some((value, index + 1)));
        }
    }

    if bytes.len() >= MAX_VARIABLE_BYTE_INTEGER_LEN {
        return Err(MqttError::MalformedPacket(
            "Variable byte integer longer than 4 bytes".to_string(),
        ));
    }
    Ok(None)
}

#[must_use]
pub fn variable_int_len(value: u32) -> usize {
    match value {
        0..=127 => 1,
        128..=16_383 => 2,
        16_384..=2_097_151 => 3,
        _ => 4,
    }
}

/// # Errors
/// Returns `StringTooLong` when the UTF-8 encoding exceeds 65,535 bytes.
pub fn encode_string<B: BufMut>(buf: &mut B, value: &str) -> Result<()> {
    let len = value.len();
    let prefix = u16::try_from(len).map_err(|_| MqttError::StringTooLong(len))?;
    buf.put_u16(prefix);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// # Errors
/// Returns `MalformedPacket` when the buffer is shorter than the declared
/// length or the bytes are not valid UTF-8.
pub fn decode_string<B: Buf>(buf: &mut B) -> Result<String> {
    let raw = decode_length_prefixed(buf, "string")?;
    String::from_utf8(raw.to_vec())
        .map_err(|e| MqttError::MalformedPacket(format!("Invalid UTF-8 string: {e}")))
}

#[must_use]
pub fn string_len(value: &str) -> usize {
    2 + value.len()
}

/// # Errors
/// Returns `MalformedPacket` when the data exceeds 65,535 bytes.
pub fn encode_binary<B: BufMut>(buf: &mut B, value: &[u8]) -> Result<()> {
    if value.len() > MAX_STRING_LENGTH {
        return Err(MqttError::MalformedPacket(format!(
            "Binary data of {} bytes exceeds maximum of {MAX_STRING_LENGTH}",
            value.len()
        )));
    }
    #[allow(clippy::cast_possible_truncation)]
    buf.put_u16(value.len() as u16);
    buf.put_slice(value);
    Ok(())
}

/// # Errors
/// Returns `MalformedPacket` when the buffer is shorter than the declared
/// length.
pub fn decode_binary<B: Buf>(buf: &mut B) -> Result<Bytes> {
    decode_length_prefixed(buf, "binary data")
}

#[must_use]
pub fn binary_len(value: &[u8]) -> usize {
    2 + value.len()
}

fn decode_length_prefixed<B: Buf>(buf: &mut B, what: &str) -> Result<Bytes> {
    if buf.remaining() < 2 {
        return Err(MqttError::MalformedPacket(format!(
            "Missing length prefix for {what}"
        )));
    }
    let len = usize::from(buf.get_u16());
    if buf.remaining() < len {
        return Err(MqttError::MalformedPacket(format!(
            "Insufficient data for {what}: expected {len}, got {}",
            buf.remaining()
        )));
    }
    Ok(buf.copy_to_bytes(len))
}

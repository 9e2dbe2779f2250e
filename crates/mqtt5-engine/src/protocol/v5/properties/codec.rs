use super::{Properties, PropertyId, PropertyScope, PropertyValue, PropertyValueType};
use crate::encoding::{
    binary_len, decode_binary, decode_string, decode_variable_int, encode_binary, encode_string,
    encode_variable_int, string_len, variable_int_len,
};
use crate::error::{MqttError, Result};
use bytes::{Buf, BufMut};

impl Properties {
    /// Writes the block length followed by every property, identifiers in
    /// ascending order.
    ///
    /// # Errors
    /// Returns error if a value cannot be encoded or the block is too large.
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let props_len = self.properties_encoded_len();
        encode_variable_int(
            buf,
            props_len
                .try_into()
                .map_err(|_| MqttError::PacketTooLarge {
                    size: props_len,
                    max: u32::MAX as usize,
                })?,
        )?;
        self.encode_properties(buf)
    }

    /// # Errors
    /// Returns `InvalidPropertyId` if a property is not allowed in `scope`,
    /// before anything is written.
    pub fn encode_for<B: BufMut>(&self, buf: &mut B, scope: PropertyScope) -> Result<()> {
        self.validate_for(scope)?;
        self.encode(buf)
    }

    fn encode_properties<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        for (id, value) in self.iter() {
            buf.put_u8(id as u8);

            match value {
                PropertyValue::Byte(v) => buf.put_u8(*v),
                PropertyValue::TwoByteInteger(v) => buf.put_u16(*v),
                PropertyValue::FourByteInteger(v) => buf.put_u32(*v),
                PropertyValue::VariableByteInteger(v) => encode_variable_int(buf, *v)?,
                PropertyValue::BinaryData(v) => encode_binary(buf, v)?,
                PropertyValue::Utf8String(v) => encode_string(buf, v)?,
                PropertyValue::Utf8StringPair(k, v) => {
                    encode_string(buf, k)?;
                    encode_string(buf, v)?;
                }
            }
        }
        Ok(())
    }

    /// Decodes a block accepting any known identifier.
    ///
    /// # Errors
    /// Returns error if decoding fails, an identifier is unknown, or a
    /// non-repeatable property appears twice.
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        Self::decode_scoped(buf, None)
    }

    /// # Errors
    /// As [`Properties::decode`], and `InvalidPropertyId` for identifiers
    /// `scope` does not accept.
    pub fn decode_for<B: Buf>(buf: &mut B, scope: PropertyScope) -> Result<Self> {
        Self::decode_scoped(buf, Some(scope))
    }

    fn decode_scoped<B: Buf>(buf: &mut B, scope: Option<PropertyScope>) -> Result<Self> {
        let props_len = decode_variable_int(buf)? as usize;

        if buf.remaining() < props_len {
            return Err(MqttError::MalformedPacket(format!(
                "Insufficient data for properties: expected {props_len}, got {}",
                buf.remaining()
            )));
        }

        let mut props_buf = buf.copy_to_bytes(props_len);
        let mut properties = Self::new();

        while props_buf.has_remaining() {
            let id_byte = props_buf.get_u8();
            let id = PropertyId::from_u8(id_byte).ok_or(MqttError::InvalidPropertyId(id_byte))?;

            if let Some(scope) = scope {
                if !scope.allows(id) {
                    return Err(MqttError::InvalidPropertyId(id_byte));
                }
            }

            let value = decode_value(&mut props_buf, id)?;
            properties.add(id, value)?;
        }

        Ok(properties)
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let props_len = self.properties_encoded_len();
        variable_int_len(props_len.try_into().unwrap_or(u32::MAX)) + props_len
    }

    fn properties_encoded_len(&self) -> usize {
        self.iter()
            .map(|(_, value)| {
                1 + match value {
                    PropertyValue::Byte(_) => 1,
                    PropertyValue::TwoByteInteger(_) => 2,
                    PropertyValue::FourByteInteger(_) => 4,
                    PropertyValue::VariableByteInteger(v) => variable_int_len(*v),
                    PropertyValue::BinaryData(v) => binary_len(v),
                    PropertyValue::Utf8String(v) => string_len(v),
                    PropertyValue::Utf8StringPair(k, v) => string_len(k) + string_len(v),
                }
            })
            .sum()
    }
}

fn decode_value<B: Buf>(buf: &mut B, id: PropertyId) -> Result<PropertyValue> {
    let needed = match id.value_type() {
        PropertyValueType::Byte => 1,
        PropertyValueType::TwoByteInteger => 2,
        PropertyValueType::FourByteInteger => 4,
        _ => 0,
    };
    if buf.remaining() < needed {
        return Err(MqttError::MalformedPacket(format!(
            "Insufficient data for property {id:?}"
        )));
    }

    let value = match id.value_type() {
        PropertyValueType::Byte => PropertyValue::Byte(buf.get_u8()),
        PropertyValueType::TwoByteInteger => PropertyValue::TwoByteInteger(buf.get_u16()),
        PropertyValueType::FourByteInteger => PropertyValue::FourByteInteger(buf.get_u32()),
        PropertyValueType::VariableByteInteger => {
            let v = decode_variable_int(buf)?;
            if id == PropertyId::SubscriptionIdentifier && v == 0 {
                return Err(MqttError::MalformedPacket(
                    "Subscription identifier must not be 0".to_string(),
                ));
            }
            PropertyValue::VariableByteInteger(v)
        }
        PropertyValueType::BinaryData => PropertyValue::BinaryData(decode_binary(buf)?),
        PropertyValueType::Utf8String => PropertyValue::Utf8String(decode_string(buf)?),
        PropertyValueType::Utf8StringPair => {
            let key = decode_string(buf)?;
            let value = decode_string(buf)?;
            PropertyValue::Utf8StringPair(key, value)
        }
    };
    Ok(value)
}

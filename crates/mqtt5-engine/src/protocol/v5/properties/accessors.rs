use super::{Properties, PropertyId, PropertyValue};
use bytes::Bytes;

impl Properties {
    /// Replaces any existing value of a non-repeatable property.
    fn set_single(&mut self, id: PropertyId, value: PropertyValue) {
        self.properties.insert(id, vec![value]);
    }

    fn byte(&self, id: PropertyId) -> Option<u8> {
        match self.get(id)? {
            PropertyValue::Byte(v) => Some(*v),
            _ => None,
        }
    }

    fn two_byte(&self, id: PropertyId) -> Option<u16> {
        match self.get(id)? {
            PropertyValue::TwoByteInteger(v) => Some(*v),
            _ => None,
        }
    }

    fn four_byte(&self, id: PropertyId) -> Option<u32> {
        match self.get(id)? {
            PropertyValue::FourByteInteger(v) => Some(*v),
            _ => None,
        }
    }

    fn string(&self, id: PropertyId) -> Option<&str> {
        match self.get(id)? {
            PropertyValue::Utf8String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    fn binary(&self, id: PropertyId) -> Option<&Bytes> {
        match self.get(id)? {
            PropertyValue::BinaryData(v) => Some(v),
            _ => None,
        }
    }

    pub fn set_payload_format_indicator(&mut self, is_utf8: bool) {
        self.set_single(
            PropertyId::PayloadFormatIndicator,
            PropertyValue::Byte(u8::from(is_utf8)),
        );
    }

    #[must_use]
    pub fn payload_format_indicator(&self) -> Option<bool> {
        self.byte(PropertyId::PayloadFormatIndicator).map(|v| v != 0)
    }

    pub fn set_message_expiry_interval(&mut self, seconds: u32) {
        self.set_single(
            PropertyId::MessageExpiryInterval,
            PropertyValue::FourByteInteger(seconds),
        );
    }

    #[must_use]
    pub fn message_expiry_interval(&self) -> Option<u32> {
        self.four_byte(PropertyId::MessageExpiryInterval)
    }

    pub fn set_content_type(&mut self, content_type: String) {
        self.set_single(
            PropertyId::ContentType,
            PropertyValue::Utf8String(content_type),
        );
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.string(PropertyId::ContentType)
    }

    pub fn set_response_topic(&mut self, topic: String) {
        self.set_single(PropertyId::ResponseTopic, PropertyValue::Utf8String(topic));
    }

    #[must_use]
    pub fn response_topic(&self) -> Option<&str> {
        self.string(PropertyId::ResponseTopic)
    }

    pub fn set_correlation_data(&mut self, data: Bytes) {
        self.set_single(PropertyId::CorrelationData, PropertyValue::BinaryData(data));
    }

    #[must_use]
    pub fn correlation_data(&self) -> Option<&Bytes> {
        self.binary(PropertyId::CorrelationData)
    }

    pub fn add_subscription_identifier(&mut self, id: u32) {
        self.properties
            .entry(PropertyId::SubscriptionIdentifier)
            .or_default()
            .push(PropertyValue::VariableByteInteger(id));
    }

    #[must_use]
    pub fn subscription_identifiers(&self) -> Vec<u32> {
        self.get_all(PropertyId::SubscriptionIdentifier)
            .unwrap_or_default()
            .iter()
            .filter_map(|value| match value {
                PropertyValue::VariableByteInteger(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn set_session_expiry_interval(&mut self, seconds: u32) {
        self.set_single(
            PropertyId::SessionExpiryInterval,
            PropertyValue::FourByteInteger(seconds),
        );
    }

    #[must_use]
    pub fn session_expiry_interval(&self) -> Option<u32> {
        self.four_byte(PropertyId::SessionExpiryInterval)
    }

    pub fn set_assigned_client_identifier(&mut self, id: String) {
        self.set_single(
            PropertyId::AssignedClientIdentifier,
            PropertyValue::Utf8String(id),
        );
    }

    #[must_use]
    pub fn assigned_client_identifier(&self) -> Option<&str> {
        self.string(PropertyId::AssignedClientIdentifier)
    }

    pub fn set_server_keep_alive(&mut self, seconds: u16) {
        self.set_single(
            PropertyId::ServerKeepAlive,
            PropertyValue::TwoByteInteger(seconds),
        );
    }

    #[must_use]
    pub fn server_keep_alive(&self) -> Option<u16> {
        self.two_byte(PropertyId::ServerKeepAlive)
    }

    pub fn set_authentication_method(&mut self, method: String) {
        self.set_single(
            PropertyId::AuthenticationMethod,
            PropertyValue::Utf8String(method),
        );
    }

    #[must_use]
    pub fn authentication_method(&self) -> Option<&str> {
        self.string(PropertyId::AuthenticationMethod)
    }

    pub fn set_authentication_data(&mut self, data: Bytes) {
        self.set_single(
            PropertyId::AuthenticationData,
            PropertyValue::BinaryData(data),
        );
    }

    #[must_use]
    pub fn authentication_data(&self) -> Option<&Bytes> {
        self.binary(PropertyId::AuthenticationData)
    }

    pub fn set_request_problem_information(&mut self, request: bool) {
        self.set_single(
            PropertyId::RequestProblemInformation,
            PropertyValue::Byte(u8::from(request)),
        );
    }

    #[must_use]
    pub fn request_problem_information(&self) -> Option<bool> {
        self.byte(PropertyId::RequestProblemInformation)
            .map(|v| v != 0)
    }

    pub fn set_will_delay_interval(&mut self, seconds: u32) {
        self.set_single(
            PropertyId::WillDelayInterval,
            PropertyValue::FourByteInteger(seconds),
        );
    }

    #[must_use]
    pub fn will_delay_interval(&self) -> Option<u32> {
        self.four_byte(PropertyId::WillDelayInterval)
    }

    pub fn set_request_response_information(&mut self, request: bool) {
        self.set_single(
            PropertyId::RequestResponseInformation,
            PropertyValue::Byte(u8::from(request)),
        );
    }

    #[must_use]
    pub fn request_response_information(&self) -> Option<bool> {
        self.byte(PropertyId::RequestResponseInformation)
            .map(|v| v != 0)
    }

    #[must_use]
    pub fn response_information(&self) -> Option<&str> {
        self.string(PropertyId::ResponseInformation)
    }

    pub fn set_server_reference(&mut self, reference: String) {
        self.set_single(
            PropertyId::ServerReference,
            PropertyValue::Utf8String(reference),
        );
    }

    #[must_use]
    pub fn server_reference(&self) -> Option<&str> {
        self.string(PropertyId::ServerReference)
    }

    pub fn set_reason_string(&mut self, reason: String) {
        self.set_single(PropertyId::ReasonString, PropertyValue::Utf8String(reason));
    }

    #[must_use]
    pub fn reason_string(&self) -> Option<&str> {
        self.string(PropertyId::ReasonString)
    }

    pub fn set_receive_maximum(&mut self, value: u16) {
        self.set_single(
            PropertyId::ReceiveMaximum,
            PropertyValue::TwoByteInteger(value),
        );
    }

    #[must_use]
    pub fn receive_maximum(&self) -> Option<u16> {
        self.two_byte(PropertyId::ReceiveMaximum)
    }

    pub fn set_topic_alias_maximum(&mut self, value: u16) {
        self.set_single(
            PropertyId::TopicAliasMaximum,
            PropertyValue::TwoByteInteger(value),
        );
    }

    #[must_use]
    pub fn topic_alias_maximum(&self) -> Option<u16> {
        self.two_byte(PropertyId::TopicAliasMaximum)
    }

    pub fn set_topic_alias(&mut self, alias: u16) {
        self.set_single(PropertyId::TopicAlias, PropertyValue::TwoByteInteger(alias));
    }

    #[must_use]
    pub fn topic_alias(&self) -> Option<u16> {
        self.two_byte(PropertyId::TopicAlias)
    }

    #[must_use]
    pub fn maximum_qos(&self) -> Option<u8> {
        self.byte(PropertyId::MaximumQoS)
    }

    #[must_use]
    pub fn retain_available(&self) -> Option<bool> {
        self.byte(PropertyId::RetainAvailable).map(|v| v != 0)
    }

    pub fn set_maximum_packet_size(&mut self, size: u32) {
        self.set_single(
            PropertyId::MaximumPacketSize,
            PropertyValue::FourByteInteger(size),
        );
    }

    #[must_use]
    pub fn maximum_packet_size(&self) -> Option<u32> {
        self.four_byte(PropertyId::MaximumPacketSize)
    }

    #[must_use]
    pub fn wildcard_subscription_available(&self) -> Option<bool> {
        self.byte(PropertyId::WildcardSubscriptionAvailable)
            .map(|v| v != 0)
    }

    #[must_use]
    pub fn subscription_identifier_available(&self) -> Option<bool> {
        self.byte(PropertyId::SubscriptionIdentifierAvailable)
            .map(|v| v != 0)
    }

    #[must_use]
    pub fn shared_subscription_available(&self) -> Option<bool> {
        self.byte(PropertyId::SharedSubscriptionAvailable)
            .map(|v| v != 0)
    }

    pub fn add_user_property(&mut self, key: String, value: String) {
        self.properties
            .entry(PropertyId::UserProperty)
            .or_default()
            .push(PropertyValue::Utf8StringPair(key, value));
    }

    /// User properties in wire order.
    #[must_use]
    pub fn user_properties(&self) -> Vec<(String, String)> {
        self.get_all(PropertyId::UserProperty)
            .unwrap_or_default()
            .iter()
            .filter_map(|value| match value {
                PropertyValue::Utf8StringPair(k, v) => Some((k.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn user_property_value(&self, key: &str) -> Option<&str> {
        self.get_all(PropertyId::UserProperty)?
            .iter()
            .find_map(|value| match value {
                PropertyValue::Utf8StringPair(k, v) if k == key => Some(v.as_str()),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_replace_single_values() {
        let mut props = Properties::new();
        props.set_session_expiry_interval(10);
        props.set_session_expiry_interval(20);

        assert_eq!(props.session_expiry_interval(), Some(20));
        assert_eq!(
            props.get_all(PropertyId::SessionExpiryInterval).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_repeatable_accessors_accumulate() {
        let mut props = Properties::new();
        props.add_subscription_identifier(3);
        props.add_subscription_identifier(9);
        props.add_user_property("a".to_string(), "1".to_string());
        props.add_user_property("a".to_string(), "2".to_string());

        assert_eq!(props.subscription_identifiers(), vec![3, 9]);
        assert_eq!(props.user_properties().len(), 2);
        assert_eq!(props.user_property_value("a"), Some("1"));
        assert_eq!(props.user_property_value("b"), None);
    }

    #[test]
    fn test_missing_values() {
        let props = Properties::new();
        assert_eq!(props.topic_alias(), None);
        assert_eq!(props.reason_string(), None);
        assert!(props.subscription_identifiers().is_empty());
        assert!(props.user_properties().is_empty());
    }

    #[test]
    fn test_boolean_accessors() {
        let mut props = Properties::new();
        props.set_payload_format_indicator(true);
        props.set_request_problem_information(false);

        assert_eq!(props.payload_format_indicator(), Some(true));
        assert_eq!(props.request_problem_information(), Some(false));
        assert_eq!(props.get(PropertyId::PayloadFormatIndicator), Some(&PropertyValue::Byte(1)));
    }
}

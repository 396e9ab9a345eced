// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN Messages
//!
//! Provides types for parsing a received STUN message into a [`Packet`].  The [`Packet`]
//! borrows the received bytes and only validates the framing: the header and that every
//! attribute record (including its padding) is contained in the data.  Attribute values are
//! looked up on demand by scanning the attribute records.
//!
//! # Examples
//!
//! ### Parse a STUN [`Packet`]
//!
//! ```
//! use stun_packet::attribute::AttributeType;
//! use stun_packet::message::{MessageType, Packet};
//!
//! let msg_data = [
//!     0x00, 0x01, 0x00, 0x08, // message type (Request) and length
//!     0x21, 0x12, 0xa4, 0x42, // magic cookie
//!     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0xe8, // transaction ID
//!     0x80, 0x22, 0x00, 0x03, // SOFTWARE attribute header
//!     0x61, 0x62, 0x63, 0x00, // "abc" and padding
//! ];
//! let packet = Packet::parse(&msg_data).unwrap();
//! assert_eq!(packet.message_type(), MessageType::Request);
//! assert_eq!(packet.transaction_id(), 1000.into());
//! assert_eq!(packet.attribute_value(AttributeType::SOFTWARE), Some(b"abc".as_ref()));
//! assert!(!packet.has_fingerprint());
//! ```

use std::net::SocketAddr;

use byteorder::{BigEndian, ByteOrder};
use tracing::{trace, warn};

use crate::attribute::fingerprint;
use crate::attribute::{
    AttributeHeader, AttributeType, MappedSocketAddr, RawAttribute, XorSocketAddr,
};
use crate::builder::PacketBuilder;
use crate::data::Data;
use crate::transaction::TransactionId;

/// The value of the magic cookie (in network byte order) as specified in RFC5389, and RFC8489.
pub const MAGIC_COOKIE: u32 = 0x2112A442;

/// Reasons why some data does not contain a valid STUN message
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PacketFormatError {
    /// The data is too short
    #[error("Not enough data available to parse the packet, expected {}, actual {}", .expected, .actual)]
    Truncated {
        /// The expected number of bytes
        expected: usize,
        /// The encountered number of bytes
        actual: usize,
    },
    /// The first two bytes are not a known message type
    #[error("Unknown message type {:#06x}", .0)]
    UnknownMessageType(u16),
    /// The magic cookie does not match [`MAGIC_COOKIE`]
    #[error("Malformed magic cookie {:#010x}", .0)]
    BadMagicCookie(u32),
    /// The length in the header does not match the size of the data
    #[error("Advertised size {} and data size {} don't match", .declared, .actual)]
    LengthMismatch {
        /// The size of the message according to the header
        declared: usize,
        /// The size of the data
        actual: usize,
    },
    /// An attribute record does not fit in the remaining data
    #[error("Attribute at offset {} overruns the end of the packet", .offset)]
    AttributeOverrun {
        /// Offset of the attribute header from the start of the message
        offset: usize,
    },
}

/// Possible errors when parsing a STUN message or its contents.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StunParseError {
    /// A transaction ID must be exactly 12 bytes
    #[error("Transaction ID must be 12 bytes, not {}", .0)]
    InvalidTransactionIdLength(usize),
    /// Not a STUN message.
    #[error("The provided data is not a STUN message: {}", .0)]
    InvalidPacketFormat(#[from] PacketFormatError),
    /// Neither a MAPPED-ADDRESS nor a XOR-MAPPED-ADDRESS is present
    #[error("The message does not contain an address attribute")]
    AddressAttributeNotFound,
    /// The attribute contains invalid data
    #[error("The attribute {} contains invalid data", .0)]
    InvalidAttributeData(AttributeType),
}

/// Errors produced when writing a STUN message
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StunWriteError {
    /// The attributes do not fit in a STUN message
    #[error("Too many bytes for this data, expected {}, actual {}", .expected, .actual)]
    TooLarge {
        /// The maximum number of bytes
        expected: usize,
        /// The required number of bytes
        actual: usize,
    },
}

/// The type of a [`Packet`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[repr(u16)]
pub enum MessageType {
    /// A request expecting a response
    Request = 0x0001,
    /// A success response
    Success = 0x0101,
    /// An error response
    Failure = 0x0111,
    /// A request without a response
    Indication = 0x0011,
}

impl MessageType {
    /// The integer value of this [`MessageType`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::message::MessageType;
    /// assert_eq!(MessageType::Success.value(), 0x0101);
    /// assert_eq!(MessageType::try_from(0x0111).unwrap(), MessageType::Failure);
    /// assert!(MessageType::try_from(0x0002).is_err());
    /// ```
    pub fn value(self) -> u16 {
        self as u16
    }

    /// Whether this [`MessageType`] is a response to a request
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::message::MessageType;
    /// assert!(MessageType::Success.is_response());
    /// assert!(MessageType::Failure.is_response());
    /// assert!(!MessageType::Request.is_response());
    /// assert!(!MessageType::Indication.is_response());
    /// ```
    pub fn is_response(self) -> bool {
        matches!(self, MessageType::Success | MessageType::Failure)
    }

    fn name(self) -> &'static str {
        match self {
            MessageType::Request => "Request",
            MessageType::Success => "Success",
            MessageType::Failure => "Failure",
            MessageType::Indication => "Indication",
        }
    }

    /// Read a [`MessageType`] from the first two bytes of `data`
    pub fn from_bytes(data: &[u8]) -> Result<Self, PacketFormatError> {
        if data.len() < 2 {
            return Err(PacketFormatError::Truncated {
                expected: 2,
                actual: data.len(),
            });
        }
        Self::try_from(BigEndian::read_u16(data))
    }

    /// Write this [`MessageType`] into the first two bytes of `dest`
    pub fn write_into(&self, dest: &mut [u8]) {
        BigEndian::write_u16(dest, self.value());
    }
}

impl TryFrom<u16> for MessageType {
    type Error = PacketFormatError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0001 => Ok(MessageType::Request),
            0x0101 => Ok(MessageType::Success),
            0x0111 => Ok(MessageType::Failure),
            0x0011 => Ok(MessageType::Indication),
            value => Err(PacketFormatError::UnknownMessageType(value)),
        }
    }
}

impl From<MessageType> for u16 {
    fn from(value: MessageType) -> Self {
        value.value()
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#06x})", self.name(), self.value())
    }
}

/// The fixed length header of a STUN message.  Allows reading the message header for a quick
/// check if this message is a valid STUN message.  Can also be used to expose the length of the
/// complete message without needing to receive the entire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    mtype: MessageType,
    transaction_id: TransactionId,
    length: u16,
}

impl MessageHeader {
    /// The length of the STUN message header.
    pub const LENGTH: usize = 20;

    /// Deserialize a `MessageHeader`
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::message::{MessageHeader, MessageType};
    /// let msg_data = [0, 1, 0, 8, 33, 18, 164, 66, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 232];
    /// let header = MessageHeader::from_bytes(&msg_data).unwrap();
    /// assert_eq!(header.get_type(), MessageType::Request);
    /// assert_eq!(header.transaction_id(), 1000.into());
    /// assert_eq!(header.data_length(), 8);
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self, PacketFormatError> {
        if data.len() < Self::LENGTH {
            return Err(PacketFormatError::Truncated {
                expected: Self::LENGTH,
                actual: data.len(),
            });
        }
        let mtype = MessageType::from_bytes(data)?;
        let length = BigEndian::read_u16(&data[2..4]);
        let cookie = BigEndian::read_u32(&data[4..8]);
        if cookie != MAGIC_COOKIE {
            return Err(PacketFormatError::BadMagicCookie(cookie));
        }
        let mut id = [0; TransactionId::LENGTH];
        id.copy_from_slice(&data[8..Self::LENGTH]);

        Ok(Self {
            mtype,
            transaction_id: id.into(),
            length,
        })
    }

    /// The number of bytes of content in this [`MessageHeader`]. Adding both `data_length()`
    /// and [`MessageHeader::LENGTH`] will result in the size of the complete STUN message.
    pub fn data_length(&self) -> u16 {
        self.length
    }

    /// The [`TransactionId`] of this [`MessageHeader`]
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// The [`MessageType`] of this [`MessageHeader`]
    pub fn get_type(&self) -> MessageType {
        self.mtype
    }

    pub(crate) fn new(mtype: MessageType, transaction_id: TransactionId, length: u16) -> Self {
        Self {
            mtype,
            transaction_id,
            length,
        }
    }

    pub(crate) fn write_into(&self, dest: &mut [u8]) {
        self.mtype.write_into(&mut dest[..2]);
        BigEndian::write_u16(&mut dest[2..4], self.length);
        BigEndian::write_u32(&mut dest[4..8], MAGIC_COOKIE);
        dest[8..Self::LENGTH].copy_from_slice(self.transaction_id.as_bytes());
    }
}

/// A validated STUN message
///
/// A [`Packet`] produced by [`Packet::parse`] borrows the parsed data.  A [`Packet`] produced
/// by [`PacketBuilder::build`] owns its data.
#[derive(Debug, Clone)]
pub struct Packet<'a> {
    header: MessageHeader,
    data: Data<'a>,
}

impl<'a> Packet<'a> {
    /// Validate `data` as a STUN message without copying it.
    ///
    /// The checks are (in order): at least 20 bytes of data, a known message type, a length in
    /// the header matching the size of `data`, the magic cookie, and that every attribute
    /// record including its padding is contained in `data`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::message::{Packet, PacketFormatError, StunParseError};
    /// let zeroes = [0; 20];
    /// assert!(matches!(
    ///     Packet::parse(&zeroes),
    ///     Err(StunParseError::InvalidPacketFormat(PacketFormatError::UnknownMessageType(0)))
    /// ));
    /// ```
    #[tracing::instrument(
        name = "packet_parse",
        level = "trace",
        skip(data),
        fields(
            data.len = data.len()
        )
    )]
    pub fn parse(data: &'a [u8]) -> Result<Self, StunParseError> {
        let header = Self::validate(data).map_err(|e| {
            warn!("rejecting packet: {e}");
            e
        })?;
        Ok(Self {
            header,
            data: data.into(),
        })
    }

    fn validate(data: &[u8]) -> Result<MessageHeader, PacketFormatError> {
        if data.len() < MessageHeader::LENGTH {
            return Err(PacketFormatError::Truncated {
                expected: MessageHeader::LENGTH,
                actual: data.len(),
            });
        }
        MessageType::from_bytes(data)?;
        let declared = BigEndian::read_u16(&data[2..4]) as usize + MessageHeader::LENGTH;
        if declared != data.len() {
            return Err(PacketFormatError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }
        let header = MessageHeader::from_bytes(data)?;

        let mut offset = MessageHeader::LENGTH;
        while offset < data.len() {
            let Ok(attr) = AttributeHeader::parse(&data[offset..]) else {
                return Err(PacketFormatError::AttributeOverrun { offset });
            };
            let end = offset
                + AttributeHeader::LENGTH
                + crate::attribute::padded_attr_len(attr.length() as usize);
            if end > data.len() {
                return Err(PacketFormatError::AttributeOverrun { offset });
            }
            trace!("attribute {} at offset {offset}", attr.get_type());
            offset = end;
        }

        Ok(header)
    }

    pub(crate) fn from_built(header: MessageHeader, data: Vec<u8>) -> Packet<'static> {
        Packet {
            header,
            data: data.into(),
        }
    }

    /// The [`MessageType`] of the [`Packet`]
    pub fn message_type(&self) -> MessageType {
        self.header.get_type()
    }

    /// The [`TransactionId`] of the [`Packet`]
    pub fn transaction_id(&self) -> TransactionId {
        self.header.transaction_id()
    }

    /// The serialized bytes of this [`Packet`]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The number of bytes of this [`Packet`] including the header
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`, a [`Packet`] contains at least a header
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy any borrowed data so that the [`Packet`] is no longer tied to the parsed buffer
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::builder::PacketBuilder;
    /// # use stun_packet::message::Packet;
    /// let built = PacketBuilder::new().build().unwrap();
    /// let received = built.as_bytes().to_vec();
    /// let parsed = Packet::parse(&received).unwrap();
    /// let owned = parsed.into_owned();
    /// drop(received);
    /// assert_eq!(owned.as_bytes(), built.as_bytes());
    /// ```
    pub fn into_owned<'b>(self) -> Packet<'b> {
        Packet {
            header: self.header,
            data: self.data.into_owned(),
        }
    }

    /// Iterate over the attributes of this [`Packet`] in the order they are stored.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::attribute::AttributeType;
    /// # use stun_packet::builder::PacketBuilder;
    /// let mut builder = PacketBuilder::new();
    /// builder
    ///     .add_attribute(AttributeType::SOFTWARE, b"stun-packet")
    ///     .add_attribute(AttributeType::PRIORITY, &[0, 0, 0, 1]);
    /// let packet = builder.build().unwrap();
    /// let types: Vec<_> = packet.iter_attributes().map(|attr| attr.get_type()).collect();
    /// assert_eq!(types, [AttributeType::SOFTWARE, AttributeType::PRIORITY]);
    /// ```
    pub fn iter_attributes(&self) -> PacketAttributesIter<'_> {
        PacketAttributesIter::new(&self.data)
    }

    /// The types of the attributes of this [`Packet`] in the order they are stored.
    pub fn attribute_types(&self) -> impl Iterator<Item = AttributeType> + '_ {
        self.iter_attributes().map(|attr| attr.get_type())
    }

    /// Retrieve the first [`RawAttribute`] of a certain type from this [`Packet`].
    #[tracing::instrument(
        name = "packet_get_raw_attribute",
        level = "trace",
        skip(self, atype),
        fields(
            msg.transaction = %self.transaction_id(),
            attribute_type = %atype,
        )
    )]
    pub fn raw_attribute(&self, atype: AttributeType) -> Option<RawAttribute<'_>> {
        if let Some(attr) = self.iter_attributes().find(|attr| attr.get_type() == atype) {
            trace!("found attribute with length {}", attr.length());
            Some(attr)
        } else {
            trace!("could not find attribute");
            None
        }
    }

    /// The value (without padding) of the first attribute of type `atype`
    pub fn attribute_value(&self, atype: AttributeType) -> Option<&[u8]> {
        self.raw_attribute(atype).map(|attr| attr.value)
    }

    /// Whether this [`Packet`] contains an attribute of type `atype`
    pub fn has_attribute(&self, atype: AttributeType) -> bool {
        self.attribute_types().any(|t| t == atype)
    }

    /// Whether this [`Packet`] contains a MAPPED-ADDRESS or a XOR-MAPPED-ADDRESS
    pub fn has_address(&self) -> bool {
        self.attribute_types().any(|t| {
            t == AttributeType::MAPPED_ADDRESS || t == AttributeType::XOR_MAPPED_ADDRESS
        })
    }

    /// Whether this [`Packet`] contains a FINGERPRINT
    pub fn has_fingerprint(&self) -> bool {
        self.has_attribute(AttributeType::FINGERPRINT)
    }

    /// Check that the last attribute is a FINGERPRINT matching the rest of the packet
    ///
    /// See [`verify_fingerprint`](crate::attribute::fingerprint::verify_fingerprint).
    pub fn verify_fingerprint(&self) -> bool {
        fingerprint::verify_fingerprint(&self.data)
    }

    /// The address stored in this [`Packet`].
    ///
    /// A MAPPED-ADDRESS is returned as stored.  Otherwise a XOR-MAPPED-ADDRESS is unmasked with
    /// the [`TransactionId`] of this [`Packet`].
    ///
    /// # Errors
    ///
    /// - [`StunParseError::AddressAttributeNotFound`] if neither attribute is present
    /// - [`StunParseError::InvalidAttributeData`] if the address value is malformed
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::builder::PacketBuilder;
    /// # use stun_packet::message::StunParseError;
    /// # use std::net::SocketAddr;
    /// let addr: SocketAddr = "[2001:db8::1]:3478".parse().unwrap();
    /// let mut builder = PacketBuilder::new();
    /// builder.set_xor_mapped_address(addr);
    /// let packet = builder.build().unwrap();
    /// assert_eq!(packet.resolved_address().unwrap(), addr);
    ///
    /// let packet = PacketBuilder::new().build().unwrap();
    /// assert!(matches!(
    ///     packet.resolved_address(),
    ///     Err(StunParseError::AddressAttributeNotFound)
    /// ));
    /// ```
    #[tracing::instrument(
        name = "packet_resolved_address",
        level = "trace",
        skip(self),
        fields(
            msg.transaction = %self.transaction_id(),
        )
    )]
    pub fn resolved_address(&self) -> Result<SocketAddr, StunParseError> {
        if let Some(value) = self.attribute_value(AttributeType::MAPPED_ADDRESS) {
            let mapped = MappedSocketAddr::from_value(AttributeType::MAPPED_ADDRESS, value)?;
            trace!("mapped address {mapped}");
            return Ok(mapped.addr());
        }
        if let Some(value) = self.attribute_value(AttributeType::XOR_MAPPED_ADDRESS) {
            let xor = XorSocketAddr::from_value(AttributeType::XOR_MAPPED_ADDRESS, value)?;
            trace!("xor mapped address {xor}");
            return Ok(xor.addr(self.transaction_id()));
        }
        Err(StunParseError::AddressAttributeNotFound)
    }

    /// A [`PacketBuilder`] with the type, transaction ID and all attributes of this [`Packet`].
    ///
    /// Attributes (including any FINGERPRINT) are copied as opaque values.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::attribute::AttributeType;
    /// # use stun_packet::builder::PacketBuilder;
    /// # use stun_packet::message::MessageType;
    /// let mut builder = PacketBuilder::new();
    /// builder
    ///     .set_message_type(MessageType::Indication)
    ///     .add_attribute(AttributeType::SOFTWARE, b"abcd");
    /// let packet = builder.build().unwrap();
    /// assert_eq!(packet.to_builder().build().unwrap().as_bytes(), packet.as_bytes());
    /// ```
    pub fn to_builder(&self) -> PacketBuilder {
        let mut builder = PacketBuilder::new();
        builder
            .set_message_type(self.message_type())
            .set_transaction_id(self.transaction_id());
        for attr in self.iter_attributes() {
            builder.add_attribute(attr.get_type(), attr.value);
        }
        builder
    }
}

impl<'a> TryFrom<&'a [u8]> for Packet<'a> {
    type Error = StunParseError;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        Packet::parse(value)
    }
}

impl std::fmt::Display for Packet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Packet(type: {}, transaction: {}, attributes: [",
            self.message_type(),
            self.transaction_id()
        )?;
        for (i, attr) in self.iter_attributes().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", attr.get_type())?;
        }
        write!(f, "])")
    }
}

/// Iterator over the [`RawAttribute`]s of a [`Packet`]
#[derive(Debug, Clone)]
pub struct PacketAttributesIter<'a> {
    data: &'a [u8],
    data_i: usize,
}

impl<'a> PacketAttributesIter<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            data_i: MessageHeader::LENGTH,
        }
    }
}

impl<'a> Iterator for PacketAttributesIter<'a> {
    type Item = RawAttribute<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data_i >= self.data.len() {
            return None;
        }

        let Ok(attr) = RawAttribute::from_bytes(&self.data[self.data_i..]) else {
            self.data_i = self.data.len();
            return None;
        };
        self.data_i += attr.padded_len();
        Some(attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::fingerprint::verify_fingerprint;

    // RFC 5769 2.2 IPv4 response
    const RFC5769_RESPONSE_IPV4: [u8; 80] = [
        0x01, 0x01, 0x00, 0x3c, // Response type and message length
        0x21, 0x12, 0xa4, 0x42, // Magic cookie
        0xb7, 0xe7, 0xa7, 0x01, // }
        0xbc, 0x34, 0xd6, 0x86, // }  Transaction ID
        0xfa, 0x87, 0xdf, 0xae, // }
        0x80, 0x22, 0x00, 0x0b, // SOFTWARE attribute header
        0x74, 0x65, 0x73, 0x74, // }
        0x20, 0x76, 0x65, 0x63, // }  UTF-8 server name
        0x74, 0x6f, 0x72, 0x20, // }
        0x00, 0x20, 0x00, 0x08, // XOR-MAPPED-ADDRESS attribute header
        0x00, 0x01, 0xa1, 0x47, // Address family (IPv4) and xor'd mapped port number
        0xe1, 0x12, 0xa6, 0x43, // Xor'd mapped IPv4 address
        0x00, 0x08, 0x00, 0x14, // MESSAGE-INTEGRITY attribute header
        0x2b, 0x91, 0xf5, 0x99, // }
        0xfd, 0x9e, 0x90, 0xc3, // }
        0x8c, 0x74, 0x89, 0xf9, // }  HMAC-SHA1 fingerprint
        0x2a, 0xf9, 0xba, 0x53, // }
        0xf0, 0x6b, 0xe7, 0xd7, // }
        0x80, 0x28, 0x00, 0x04, // FINGERPRINT attribute header
        0xc0, 0x7d, 0x4c, 0x96, // CRC32 fingerprint
    ];

    // RFC 5769 2.3 IPv6 response
    const RFC5769_RESPONSE_IPV6: [u8; 92] = [
        0x01, 0x01, 0x00, 0x48, // Response type and message length
        0x21, 0x12, 0xa4, 0x42, // Magic cookie
        0xb7, 0xe7, 0xa7, 0x01, // }
        0xbc, 0x34, 0xd6, 0x86, // }  Transaction ID
        0xfa, 0x87, 0xdf, 0xae, // }
        0x80, 0x22, 0x00, 0x0b, // SOFTWARE attribute header
        0x74, 0x65, 0x73, 0x74, // }
        0x20, 0x76, 0x65, 0x63, // }  UTF-8 server name
        0x74, 0x6f, 0x72, 0x20, // }
        0x00, 0x20, 0x00, 0x14, // XOR-MAPPED-ADDRESS attribute header
        0x00, 0x02, 0xa1, 0x47, // Address family (IPv6) and xor'd mapped port number
        0x01, 0x13, 0xa9, 0xfa, // }
        0xa5, 0xd3, 0xf1, 0x79, // }  Xor'd mapped IPv6 address
        0xbc, 0x25, 0xf4, 0xb5, // }
        0xbe, 0xd2, 0xb9, 0xd9, // }
        0x00, 0x08, 0x00, 0x14, // MESSAGE-INTEGRITY attribute header
        0xa3, 0x82, 0x95, 0x4e, // }
        0x4b, 0xe6, 0x7b, 0xf1, // }
        0x17, 0x84, 0xc9, 0x7c, // }  HMAC-SHA1 fingerprint
        0x82, 0x92, 0xc2, 0x75, // }
        0xbf, 0xe3, 0xed, 0x41, // }
        0x80, 0x28, 0x00, 0x04, // FINGERPRINT attribute header
        0xc8, 0xfb, 0x0b, 0x4c, // CRC32 fingerprint
    ];

    // RFC 5769 2.1 request
    const RFC5769_REQUEST: [u8; 108] = [
        0x00, 0x01, 0x00, 0x58, // Request type and message length
        0x21, 0x12, 0xa4, 0x42, // Magic cookie
        0xb7, 0xe7, 0xa7, 0x01, // }
        0xbc, 0x34, 0xd6, 0x86, // }  Transaction ID
        0xfa, 0x87, 0xdf, 0xae, // }
        0x80, 0x22, 0x00, 0x10, // SOFTWARE attribute header
        0x53, 0x54, 0x55, 0x4e, // }
        0x20, 0x74, 0x65, 0x73, // }  User-agent...
        0x74, 0x20, 0x63, 0x6c, // }  ...name
        0x69, 0x65, 0x6e, 0x74, // }
        0x00, 0x24, 0x00, 0x04, // PRIORITY attribute header
        0x6e, 0x00, 0x01, 0xff, // ICE priority value
        0x80, 0x29, 0x00, 0x08, // ICE-CONTROLLED attribute header
        0x93, 0x2f, 0xf9, 0xb1, // }  Pseudo-random tie breaker...
        0x51, 0x26, 0x3b, 0x36, // }   ...for ICE control
        0x00, 0x06, 0x00, 0x09, // USERNAME attribute header
        0x65, 0x76, 0x74, 0x6a, // }
        0x3a, 0x68, 0x36, 0x76, // }  Username (9 bytes) and padding (3 bytes)
        0x59, 0x20, 0x20, 0x20, // }
        0x00, 0x08, 0x00, 0x14, // MESSAGE-INTEGRITY attribute header
        0x9a, 0xea, 0xa7, 0x0c, // }
        0xbf, 0xd8, 0xcb, 0x56, // }
        0x78, 0x1e, 0xf2, 0xb5, // }  HMAC-SHA1 fingerprint
        0xb2, 0xd3, 0xf2, 0x49, // }
        0xc1, 0xb5, 0x71, 0xa2, // }
        0x80, 0x28, 0x00, 0x04, // FINGERPRINT attribute header
        0xe5, 0x7a, 0x3b, 0xcf, // CRC32 fingerprint
    ];

    const RFC5769_TRANSACTION: u128 = 0xb7e7_a701_bc34_d686_fa87_dfae;

    fn parse_format_error(data: &[u8]) -> PacketFormatError {
        match Packet::parse(data) {
            Err(StunParseError::InvalidPacketFormat(e)) => e,
            res => panic!("unexpected parse result {res:?}"),
        }
    }

    #[test]
    fn message_type() {
        let _log = crate::tests::test_init_log();
        for mtype in [
            MessageType::Request,
            MessageType::Success,
            MessageType::Failure,
            MessageType::Indication,
        ] {
            let value: u16 = mtype.into();
            assert_eq!(MessageType::try_from(value).unwrap(), mtype);
        }
        assert_eq!(format!("{}", MessageType::Success), "Success(0x0101)");
        assert!(matches!(
            MessageType::try_from(0x0110),
            Err(PacketFormatError::UnknownMessageType(0x0110))
        ));
    }

    #[test]
    fn rfc5769_response_ipv4() {
        let _log = crate::tests::test_init_log();
        let packet = Packet::parse(&RFC5769_RESPONSE_IPV4).unwrap();
        trace!("{packet}");
        assert_eq!(packet.message_type(), MessageType::Success);
        assert_eq!(packet.transaction_id(), RFC5769_TRANSACTION.into());
        assert_eq!(packet.transaction_id().to_hex(), "B7E7A701BC34D686FA87DFAE");
        assert_eq!(packet.len(), 80);
        assert_eq!(
            packet.attribute_types().collect::<Vec<_>>(),
            [
                AttributeType::SOFTWARE,
                AttributeType::XOR_MAPPED_ADDRESS,
                AttributeType::MESSAGE_INTEGRITY,
                AttributeType::FINGERPRINT,
            ]
        );
        assert_eq!(
            packet.attribute_value(AttributeType::SOFTWARE),
            Some(b"test vector".as_ref())
        );
        assert!(packet.has_address());
        assert!(packet.has_fingerprint());
        assert!(packet.verify_fingerprint());
        assert_eq!(
            packet.resolved_address().unwrap(),
            "192.0.2.1:32853".parse().unwrap()
        );
    }

    #[test]
    fn rfc5769_response_ipv6() {
        let _log = crate::tests::test_init_log();
        let packet = Packet::parse(&RFC5769_RESPONSE_IPV6).unwrap();
        assert_eq!(packet.message_type(), MessageType::Success);
        assert!(packet.verify_fingerprint());
        assert_eq!(
            packet.resolved_address().unwrap(),
            "[2001:db8:1234:5678:11:2233:4455:6677]:32853"
                .parse()
                .unwrap()
        );
    }

    #[test]
    fn rfc5769_request() {
        let _log = crate::tests::test_init_log();
        let packet = Packet::parse(&RFC5769_REQUEST).unwrap();
        assert_eq!(packet.message_type(), MessageType::Request);
        assert_eq!(packet.transaction_id(), RFC5769_TRANSACTION.into());
        assert_eq!(packet.iter_attributes().count(), 6);
        assert!(!packet.has_address());
        assert!(packet.has_fingerprint());
        assert!(packet.verify_fingerprint());
        assert!(packet.has_attribute(AttributeType::ICE_CONTROLLED));
        assert!(!packet.has_attribute(AttributeType::ICE_CONTROLLING));
        assert_eq!(
            packet.attribute_value(AttributeType::USERNAME),
            Some(b"evtj:h6vY".as_ref())
        );
        assert_eq!(
            packet.attribute_value(AttributeType::PRIORITY),
            Some([0x6e, 0x00, 0x01, 0xff].as_ref())
        );
        assert_eq!(packet.attribute_value(AttributeType::REALM), None);
        assert!(matches!(
            packet.resolved_address(),
            Err(StunParseError::AddressAttributeNotFound)
        ));
    }

    #[test]
    fn rfc5769_rebuild_identical() {
        let _log = crate::tests::test_init_log();
        for data in [
            RFC5769_REQUEST.as_slice(),
            RFC5769_RESPONSE_IPV4.as_slice(),
            RFC5769_RESPONSE_IPV6.as_slice(),
        ] {
            let packet = Packet::parse(data).unwrap();
            let mut builder = packet.to_builder();
            builder.set_padding_byte(0x20);
            assert_eq!(builder.build().unwrap().as_bytes(), data);
        }
    }

    #[test]
    fn rfc5769_recompute_fingerprint() {
        let _log = crate::tests::test_init_log();
        for data in [
            RFC5769_REQUEST.as_slice(),
            RFC5769_RESPONSE_IPV4.as_slice(),
            RFC5769_RESPONSE_IPV6.as_slice(),
        ] {
            let packet = Packet::parse(data).unwrap();
            let mut builder = PacketBuilder::new();
            builder
                .set_message_type(packet.message_type())
                .set_transaction_id(packet.transaction_id())
                .set_padding_byte(0x20)
                .set_fingerprint(true);
            for attr in packet
                .iter_attributes()
                .filter(|attr| attr.get_type() != AttributeType::FINGERPRINT)
            {
                builder.add_attribute(attr.get_type(), attr.value);
            }
            assert_eq!(builder.build().unwrap().as_bytes(), data);
        }
    }

    #[test]
    fn zeroed_header() {
        let _log = crate::tests::test_init_log();
        assert_eq!(
            parse_format_error(&[0; 20]),
            PacketFormatError::UnknownMessageType(0)
        );
    }

    #[test]
    fn truncated() {
        let _log = crate::tests::test_init_log();
        assert_eq!(
            parse_format_error(&RFC5769_REQUEST[..19]),
            PacketFormatError::Truncated {
                expected: 20,
                actual: 19
            }
        );
        assert_eq!(
            parse_format_error(&[]),
            PacketFormatError::Truncated {
                expected: 20,
                actual: 0
            }
        );
    }

    #[test]
    fn length_mismatch() {
        let _log = crate::tests::test_init_log();
        let mut data = RFC5769_RESPONSE_IPV4.to_vec();
        data.push(0);
        assert_eq!(
            parse_format_error(&data),
            PacketFormatError::LengthMismatch {
                declared: 80,
                actual: 81
            }
        );
        assert_eq!(
            parse_format_error(&RFC5769_RESPONSE_IPV4[..76]),
            PacketFormatError::LengthMismatch {
                declared: 80,
                actual: 76
            }
        );
    }

    #[test]
    fn bad_magic_cookie() {
        let _log = crate::tests::test_init_log();
        let mut data = RFC5769_RESPONSE_IPV4;
        data[4] = 0x22;
        assert_eq!(
            parse_format_error(&data),
            PacketFormatError::BadMagicCookie(0x2212_a442)
        );
    }

    #[test]
    fn error_order() {
        let _log = crate::tests::test_init_log();
        // unknown type is reported before the length and the cookie
        let mut data = [0; 24];
        data[1] = 0x02;
        assert_eq!(
            parse_format_error(&data),
            PacketFormatError::UnknownMessageType(0x0002)
        );
        // length is reported before the cookie
        data[1] = 0x01;
        assert_eq!(
            parse_format_error(&data),
            PacketFormatError::LengthMismatch {
                declared: 20,
                actual: 24
            }
        );
        data[3] = 4;
        assert_eq!(parse_format_error(&data), PacketFormatError::BadMagicCookie(0));
    }

    fn header_with_body(body: &[u8]) -> Vec<u8> {
        let mut data = vec![0; MessageHeader::LENGTH];
        MessageHeader::new(MessageType::Request, 0x42.into(), body.len() as u16)
            .write_into(&mut data);
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn attribute_overrun() {
        let _log = crate::tests::test_init_log();
        // advertised value length larger than the remaining data
        let data = header_with_body(&[0x80, 0x22, 0x00, 0x08, 0x61, 0x62, 0x63, 0x64]);
        assert_eq!(
            parse_format_error(&data),
            PacketFormatError::AttributeOverrun { offset: 20 }
        );
        // padding of the last attribute is missing
        let data = header_with_body(&[0x80, 0x22, 0x00, 0x03, 0x61, 0x62, 0x63]);
        assert_eq!(
            parse_format_error(&data),
            PacketFormatError::AttributeOverrun { offset: 20 }
        );
        // trailing bytes that cannot hold an attribute header
        let data = header_with_body(&[0x80, 0x22, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(
            parse_format_error(&data),
            PacketFormatError::AttributeOverrun { offset: 24 }
        );
    }

    #[test]
    fn padding_independent_value() {
        let _log = crate::tests::test_init_log();
        for padding in [0x00, 0x20, 0xff] {
            let data = header_with_body(&[
                0x80, 0x22, 0x00, 0x05, b'T', b'E', b'S', b'T', b'!', padding, padding, padding,
            ]);
            let packet = Packet::parse(&data).unwrap();
            assert_eq!(
                packet.attribute_value(AttributeType::SOFTWARE),
                Some(b"TEST!".as_ref())
            );
            let raw = packet.raw_attribute(AttributeType::SOFTWARE).unwrap();
            assert_eq!(raw.padded_len(), 12);
        }
    }

    #[test]
    fn duplicate_attributes_first_wins() {
        let _log = crate::tests::test_init_log();
        let mut builder = PacketBuilder::new();
        builder
            .add_attribute(AttributeType::NONCE, b"first")
            .add_attribute(AttributeType::NONCE, b"second");
        let packet = builder.build().unwrap();
        assert_eq!(packet.attribute_types().count(), 2);
        assert_eq!(
            packet.attribute_value(AttributeType::NONCE),
            Some(b"first".as_ref())
        );
    }

    #[test]
    fn mapped_address_preferred() {
        let _log = crate::tests::test_init_log();
        let xor_addr: SocketAddr = "192.0.2.1:32853".parse().unwrap();
        let plain_addr: SocketAddr = "198.51.100.7:4000".parse().unwrap();
        let mut builder = PacketBuilder::new();
        builder
            .set_xor_mapped_address(xor_addr)
            .set_mapped_address(plain_addr);
        let packet = builder.build().unwrap();
        assert_eq!(packet.resolved_address().unwrap(), plain_addr);

        builder.clear_attributes().set_xor_mapped_address(xor_addr);
        let packet = builder.build().unwrap();
        assert_eq!(packet.resolved_address().unwrap(), xor_addr);
    }

    #[test]
    fn malformed_address() {
        let _log = crate::tests::test_init_log();
        let mut builder = PacketBuilder::new();
        builder.add_attribute(AttributeType::XOR_MAPPED_ADDRESS, &[0x00, 0x01, 0x00]);
        let packet = builder.build().unwrap();
        assert!(packet.has_address());
        assert!(matches!(
            packet.resolved_address(),
            Err(StunParseError::InvalidAttributeData(AttributeType::XOR_MAPPED_ADDRESS))
        ));

        builder
            .clear_attributes()
            .add_attribute(AttributeType::MAPPED_ADDRESS, &[0x00, 0x03, 0, 0, 0, 0, 0, 0]);
        let packet = builder.build().unwrap();
        assert!(matches!(
            packet.resolved_address(),
            Err(StunParseError::InvalidAttributeData(AttributeType::MAPPED_ADDRESS))
        ));
    }

    #[test]
    fn address_roundtrip() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use std::net::{Ipv4Addr, Ipv6Addr};

        let _log = crate::tests::test_init_log();
        let mut rng = StdRng::seed_from_u64(0x5354_554e);
        for i in 0..200 {
            let port = rng.random::<u16>();
            let addr = if i % 2 == 0 {
                SocketAddr::new(Ipv4Addr::from(rng.random::<u32>()).into(), port)
            } else {
                SocketAddr::new(Ipv6Addr::from(rng.random::<u128>()).into(), port)
            };
            let mut builder = PacketBuilder::new();
            builder.set_mapped_address(addr);
            let packet = builder.build().unwrap();
            let packet = Packet::parse(packet.as_bytes()).unwrap();
            assert_eq!(packet.resolved_address().unwrap(), addr);

            let mut builder = PacketBuilder::new();
            builder.set_xor_mapped_address(addr);
            let packet = builder.build().unwrap();
            let packet = Packet::parse(packet.as_bytes()).unwrap();
            assert_eq!(packet.resolved_address().unwrap(), addr);
        }
    }

    #[test]
    fn fingerprint_corruption() {
        let _log = crate::tests::test_init_log();
        let mut builder = PacketBuilder::new();
        builder
            .add_attribute(AttributeType::SOFTWARE, b"stun-packet")
            .set_xor_mapped_address("127.0.0.1:3478".parse().unwrap())
            .set_fingerprint(true);
        let packet = builder.build().unwrap();
        assert!(packet.verify_fingerprint());
        for i in 0..packet.len() {
            let mut data = packet.as_bytes().to_vec();
            data[i] = !data[i];
            assert!(!verify_fingerprint(&data), "corruption at byte {i} not detected");
        }
    }

    #[test]
    fn fingerprint_not_last() {
        let _log = crate::tests::test_init_log();
        let mut builder = Packet::parse(&RFC5769_RESPONSE_IPV4).unwrap().to_builder();
        builder.add_attribute(AttributeType::SOFTWARE, b"late");
        let packet = builder.build().unwrap();
        assert!(packet.has_fingerprint());
        assert!(!packet.verify_fingerprint());
    }

    #[test]
    fn display_and_owned() {
        let _log = crate::tests::test_init_log();
        let data = RFC5769_REQUEST.to_vec();
        let packet = Packet::try_from(data.as_slice()).unwrap();
        let display = format!("{packet}");
        assert!(display.starts_with(
            "Packet(type: Request(0x0001), transaction: B7E7A701BC34D686FA87DFAE, attributes: ["
        ));
        assert!(display.contains("SOFTWARE"));
        let owned = packet.into_owned();
        drop(data);
        assert_eq!(owned.as_bytes(), RFC5769_REQUEST);
        assert!(owned.verify_fingerprint());
    }

    #[test]
    fn iterator_restarts() {
        let _log = crate::tests::test_init_log();
        let packet = Packet::parse(&RFC5769_REQUEST).unwrap();
        let first: Vec<_> = packet.iter_attributes().collect();
        let second: Vec<_> = packet.iter_attributes().collect();
        assert_eq!(first, second);
        assert_eq!(first[1].value, &[0x6e, 0x00, 0x01, 0xff]);
    }
}

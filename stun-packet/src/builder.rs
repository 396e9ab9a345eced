// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Building STUN messages
//!
//! A [`PacketBuilder`] accumulates the message type, transaction ID and attributes of a STUN
//! message.  [`PacketBuilder::build`] serializes them into a new [`Packet`].
//!
//! # Examples
//!
//! ```
//! use stun_packet::attribute::AttributeType;
//! use stun_packet::builder::PacketBuilder;
//! use stun_packet::message::MessageType;
//!
//! let mut builder = PacketBuilder::new();
//! builder
//!     .set_message_type(MessageType::Indication)
//!     .add_attribute(AttributeType::SOFTWARE, b"stun-packet")
//!     .set_fingerprint(true);
//! let packet = builder.build().unwrap();
//! assert_eq!(packet.message_type(), MessageType::Indication);
//! assert!(packet.verify_fingerprint());
//! ```

use std::net::SocketAddr;

use byteorder::{BigEndian, ByteOrder};
use tracing::trace;

use crate::attribute::fingerprint::{compute_fingerprint, FINGERPRINT_ATTRIBUTE_LENGTH};
use crate::attribute::{
    AttributeHeader, AttributeType, MappedSocketAddr, RawAttribute, XorSocketAddr,
};
use crate::message::{MessageHeader, MessageType, Packet, StunWriteError};
use crate::transaction::TransactionId;

/// Accumulates the contents of a STUN message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketBuilder {
    message_type: MessageType,
    transaction_id: Option<TransactionId>,
    attributes: Vec<(AttributeType, Vec<u8>)>,
    padding: u8,
    fingerprint: bool,
}

impl Default for PacketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketBuilder {
    /// Create a new [`PacketBuilder`] for a [`MessageType::Request`] without any attributes.
    pub fn new() -> Self {
        Self {
            message_type: MessageType::Request,
            transaction_id: None,
            attributes: Vec::new(),
            padding: 0,
            fingerprint: false,
        }
    }

    /// Set the [`MessageType`]
    pub fn set_message_type(&mut self, message_type: MessageType) -> &mut Self {
        self.message_type = message_type;
        self
    }

    /// Set the [`TransactionId`].  Without a [`TransactionId`], every call to
    /// [`PacketBuilder::build`] generates a new random one.
    pub fn set_transaction_id(&mut self, transaction_id: TransactionId) -> &mut Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Set the byte used to pad attribute values to a multiple of 4 bytes.  Defaults to 0.
    pub fn set_padding_byte(&mut self, padding: u8) -> &mut Self {
        self.padding = padding;
        self
    }

    /// Whether to append a FINGERPRINT attribute when building
    pub fn set_fingerprint(&mut self, fingerprint: bool) -> &mut Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Append an attribute.  Existing attributes of the same type are kept.
    pub fn add_attribute(&mut self, atype: AttributeType, value: &[u8]) -> &mut Self {
        self.attributes.push((atype, value.to_vec()));
        self
    }

    /// Remove all attributes.  The other settings are kept.
    pub fn clear_attributes(&mut self) -> &mut Self {
        self.attributes.clear();
        self
    }

    /// Append a MAPPED-ADDRESS attribute containing `addr`
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::attribute::AttributeType;
    /// # use stun_packet::builder::PacketBuilder;
    /// let mut builder = PacketBuilder::new();
    /// builder.set_mapped_address("192.0.2.1:32853".parse().unwrap());
    /// let packet = builder.build().unwrap();
    /// assert_eq!(
    ///     packet.attribute_value(AttributeType::MAPPED_ADDRESS),
    ///     Some([0x00, 0x01, 0x80, 0x55, 0xc0, 0x00, 0x02, 0x01].as_ref())
    /// );
    /// ```
    pub fn set_mapped_address(&mut self, addr: SocketAddr) -> &mut Self {
        let value = MappedSocketAddr::new(addr).to_value();
        self.add_attribute(AttributeType::MAPPED_ADDRESS, &value)
    }

    /// Append a XOR-MAPPED-ADDRESS attribute containing `addr`.
    ///
    /// The address is masked with the [`TransactionId`] of this builder which is generated now
    /// if it has not been set.
    pub fn set_xor_mapped_address(&mut self, addr: SocketAddr) -> &mut Self {
        let transaction_id = *self
            .transaction_id
            .get_or_insert_with(TransactionId::generate);
        let value = XorSocketAddr::new(addr, transaction_id).to_value();
        self.add_attribute(AttributeType::XOR_MAPPED_ADDRESS, &value)
    }

    /// The [`MessageType`] that will be built
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The [`TransactionId`] that will be built, if set
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    /// The type and value of the attributes that will be built in order
    pub fn attributes(&self) -> impl Iterator<Item = (AttributeType, &[u8])> + '_ {
        self.attributes
            .iter()
            .map(|(atype, value)| (*atype, value.as_slice()))
    }

    /// Serialize the accumulated contents into a new [`Packet`].
    ///
    /// Attributes are written in the order they were added followed by a FINGERPRINT if
    /// enabled.
    ///
    /// # Errors
    ///
    /// - [`StunWriteError::TooLarge`] if the attributes do not fit in a STUN message.
    #[tracing::instrument(
        name = "packet_build",
        level = "trace",
        skip(self),
        fields(
            message_type = %self.message_type,
            n_attributes = self.attributes.len(),
            fingerprint = self.fingerprint,
        )
    )]
    pub fn build(&self) -> Result<Packet<'static>, StunWriteError> {
        let mut body_len = self
            .attributes
            .iter()
            .map(|(_atype, value)| {
                AttributeHeader::LENGTH + crate::attribute::padded_attr_len(value.len())
            })
            .sum::<usize>();
        if self.fingerprint {
            body_len += FINGERPRINT_ATTRIBUTE_LENGTH;
        }
        let max_value_len = self
            .attributes
            .iter()
            .map(|(_atype, value)| value.len())
            .max()
            .unwrap_or(0);
        if max_value_len > u16::MAX as usize {
            return Err(StunWriteError::TooLarge {
                expected: u16::MAX as usize,
                actual: max_value_len,
            });
        }
        let length = u16::try_from(body_len).map_err(|_| StunWriteError::TooLarge {
            expected: u16::MAX as usize,
            actual: body_len,
        })?;

        let transaction_id = self.transaction_id.unwrap_or_else(TransactionId::generate);
        let header = MessageHeader::new(self.message_type, transaction_id, length);
        let mut data = vec![0; MessageHeader::LENGTH + body_len];
        header.write_into(&mut data);

        let mut offset = MessageHeader::LENGTH;
        for (atype, value) in self.attributes() {
            let attr = RawAttribute::new(atype, value)?;
            offset += attr.write_into_unchecked(&mut data[offset..], self.padding);
        }
        if self.fingerprint {
            let fingerprint = compute_fingerprint(&data[..offset]);
            AttributeHeader::new(AttributeType::FINGERPRINT, 4).write_into(&mut data[offset..]);
            BigEndian::write_u32(
                &mut data[offset + AttributeHeader::LENGTH..offset + FINGERPRINT_ATTRIBUTE_LENGTH],
                fingerprint,
            );
            offset += FINGERPRINT_ATTRIBUTE_LENGTH;
        }
        debug_assert_eq!(offset, data.len());
        trace!(transaction = %transaction_id, "built packet of {} bytes", data.len());

        Ok(Packet::from_built(header, data))
    }
}

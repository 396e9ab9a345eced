// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN Attributes
//!
//! Attributes are stored in a STUN message as a type-length-value stream.  Each record is a 4
//! byte header (type and value length) followed by the value which is padded to a multiple of
//! 4 bytes.
//!
//! Values are not interpreted by this module.  Only the address attributes (see
//! [`MappedSocketAddr`] and [`XorSocketAddr`]) and the [fingerprint](crate::attribute::fingerprint)
//! have a defined value layout.
//!
//! # Examples
//!
//! ```
//! use stun_packet::attribute::{AttributeType, RawAttribute};
//!
//! let attribute_data = [
//!     0x80, 0x22, 0x00, 0x05, // Attribute type (0x8022: Software) and length (0x0005)
//!     0x54, 0x45, 0x53, 0x54, // T E S T
//!     0x21, 0x00, 0x00, 0x00, // ! and padding
//! ];
//!
//! let raw = RawAttribute::from_bytes(&attribute_data).unwrap();
//! assert_eq!(raw.get_type(), AttributeType::SOFTWARE);
//! assert_eq!(raw.value, b"TEST!");
//! assert_eq!(raw.to_bytes(0x00), attribute_data);
//! ```

macro_rules! bytewise_xor {
    ($size:literal, $a:expr, $b:expr, $default:literal) => {{
        let mut arr = [$default; $size];
        for (i, item) in arr.iter_mut().enumerate() {
            *item = $a[i] ^ $b[i];
        }
        arr
    }};
}

mod address;
pub use address::{xor_ip, xor_octets, xor_port, AddressFamily, MappedSocketAddr, XorSocketAddr};
pub mod fingerprint;

use byteorder::{BigEndian, ByteOrder};

use crate::message::{PacketFormatError, StunWriteError};

/// The type of an attribute in a STUN [`Packet`](crate::message::Packet)
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct AttributeType(u16);

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#x}: {})", self.0, self.0, self.name())
    }
}

impl AttributeType {
    /// MAPPED-ADDRESS, an address stored without masking
    pub const MAPPED_ADDRESS: AttributeType = AttributeType(0x0001);
    /// RESPONSE-ADDRESS
    pub const RESPONSE_ADDRESS: AttributeType = AttributeType(0x0002);
    /// CHANGE-REQUEST
    pub const CHANGE_REQUEST: AttributeType = AttributeType(0x0003);
    /// SOURCE-ADDRESS
    pub const SOURCE_ADDRESS: AttributeType = AttributeType(0x0004);
    /// CHANGED-ADDRESS
    pub const CHANGED_REQUEST: AttributeType = AttributeType(0x0005);
    /// USERNAME
    pub const USERNAME: AttributeType = AttributeType(0x0006);
    /// PASSWORD
    pub const PASSWORD: AttributeType = AttributeType(0x0007);
    /// MESSAGE-INTEGRITY
    pub const MESSAGE_INTEGRITY: AttributeType = AttributeType(0x0008);
    /// ERROR-CODE
    pub const ERROR_CODE: AttributeType = AttributeType(0x0009);
    /// UNKNOWN-ATTRIBUTES
    pub const UNKNOWN_ATTRIBUTES: AttributeType = AttributeType(0x000A);
    /// REFLECTED-FROM
    pub const REFLECTED_FROM: AttributeType = AttributeType(0x000B);
    /// REALM
    pub const REALM: AttributeType = AttributeType(0x0014);
    /// NONCE
    pub const NONCE: AttributeType = AttributeType(0x0015);
    /// XOR-MAPPED-ADDRESS, an address masked with the magic cookie and transaction ID
    pub const XOR_MAPPED_ADDRESS: AttributeType = AttributeType(0x0020);
    /// PRIORITY
    pub const PRIORITY: AttributeType = AttributeType(0x0024);
    /// USE-CANDIDATE
    pub const USE_CANDIDATE: AttributeType = AttributeType(0x0025);
    /// SOFTWARE
    pub const SOFTWARE: AttributeType = AttributeType(0x8022);
    /// ALTERNATE-SERVER
    pub const ALTERNATE_SERVER: AttributeType = AttributeType(0x8023);
    /// FINGERPRINT, must be the last attribute of a message
    pub const FINGERPRINT: AttributeType = AttributeType(0x8028);
    /// ICE-CONTROLLED
    pub const ICE_CONTROLLED: AttributeType = AttributeType(0x8029);
    /// ICE-CONTROLLING
    pub const ICE_CONTROLLING: AttributeType = AttributeType(0x802A);

    /// Create a new AttributeType from an existing value
    ///
    /// # Examples
    /// ```
    /// # use stun_packet::attribute::AttributeType;
    /// assert_eq!(AttributeType::new(0x123).value(), 0x123);
    /// ```
    pub const fn new(val: u16) -> Self {
        Self(val)
    }

    /// Return the integer value of this AttributeType
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Returns a human readable name of this `AttributeType` or "unknown"
    ///
    /// # Examples
    /// ```
    /// # use stun_packet::attribute::*;
    /// assert_eq!(AttributeType::XOR_MAPPED_ADDRESS.name(), "XOR-MAPPED-ADDRESS");
    /// assert_eq!(AttributeType::new(0x7777).name(), "unknown");
    /// ```
    pub fn name(self) -> &'static str {
        match self {
            Self::MAPPED_ADDRESS => "MAPPED-ADDRESS",
            Self::RESPONSE_ADDRESS => "RESPONSE-ADDRESS",
            Self::CHANGE_REQUEST => "CHANGE-REQUEST",
            Self::SOURCE_ADDRESS => "SOURCE-ADDRESS",
            Self::CHANGED_REQUEST => "CHANGED-ADDRESS",
            Self::USERNAME => "USERNAME",
            Self::PASSWORD => "PASSWORD",
            Self::MESSAGE_INTEGRITY => "MESSAGE-INTEGRITY",
            Self::ERROR_CODE => "ERROR-CODE",
            Self::UNKNOWN_ATTRIBUTES => "UNKNOWN-ATTRIBUTES",
            Self::REFLECTED_FROM => "REFLECTED-FROM",
            Self::REALM => "REALM",
            Self::NONCE => "NONCE",
            Self::XOR_MAPPED_ADDRESS => "XOR-MAPPED-ADDRESS",
            Self::PRIORITY => "PRIORITY",
            Self::USE_CANDIDATE => "USE-CANDIDATE",
            Self::SOFTWARE => "SOFTWARE",
            Self::ALTERNATE_SERVER => "ALTERNATE-SERVER",
            Self::FINGERPRINT => "FINGERPRINT",
            Self::ICE_CONTROLLED => "ICE-CONTROLLED",
            Self::ICE_CONTROLLING => "ICE-CONTROLLING",
            _ => "unknown",
        }
    }

    /// Whether this `AttributeType` is in the optional category.  All integer attribute values
    /// < 0x8000 are optional.  The category does not affect parsing.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::attribute::AttributeType;
    /// assert!(AttributeType::XOR_MAPPED_ADDRESS.is_optional());
    /// assert!(!AttributeType::SOFTWARE.is_optional());
    /// ```
    pub fn is_optional(self) -> bool {
        self.0 & 0x8000 == 0
    }

    /// Whether this `AttributeType` is in the required category.  All integer attribute values
    /// >= 0x8000 are required.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::attribute::AttributeType;
    /// assert_eq!(AttributeType::new(0x0).comprehension_required(), false);
    /// assert_eq!(AttributeType::new(0x8000).comprehension_required(), true);
    /// ```
    pub fn comprehension_required(self) -> bool {
        !self.is_optional()
    }
}

impl From<u16> for AttributeType {
    fn from(f: u16) -> Self {
        Self::new(f)
    }
}

impl From<AttributeType> for u16 {
    fn from(f: AttributeType) -> Self {
        f.0
    }
}

/// Structure for holding the header of a STUN attribute.  Contains the type and the length
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeHeader {
    atype: AttributeType,
    length: u16,
}

impl AttributeHeader {
    /// The size of an attribute header in bytes
    pub const LENGTH: usize = 4;

    /// Create a new [`AttributeHeader`]
    pub fn new(atype: AttributeType, length: u16) -> Self {
        Self { atype, length }
    }

    /// Parse the first four bytes of `data` as an attribute header
    pub fn parse(data: &[u8]) -> Result<Self, PacketFormatError> {
        if data.len() < Self::LENGTH {
            return Err(PacketFormatError::Truncated {
                expected: Self::LENGTH,
                actual: data.len(),
            });
        }
        Ok(Self {
            atype: BigEndian::read_u16(&data[0..2]).into(),
            length: BigEndian::read_u16(&data[2..4]),
        })
    }

    /// Write this header into the first four bytes of `dest`
    pub fn write_into(&self, dest: &mut [u8]) {
        BigEndian::write_u16(&mut dest[0..2], self.atype.into());
        BigEndian::write_u16(&mut dest[2..4], self.length);
    }

    /// Returns the type of the attribute
    pub fn get_type(&self) -> AttributeType {
        self.atype
    }

    /// Returns the length of the attribute value
    pub fn length(&self) -> u16 {
        self.length
    }
}

impl TryFrom<&[u8]> for AttributeHeader {
    type Error = PacketFormatError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        AttributeHeader::parse(value)
    }
}

/// Round an attribute value length up to the next multiple of 4.
pub fn padded_attr_len(len: usize) -> usize {
    if len % 4 == 0 {
        len
    } else {
        len + 4 - len % 4
    }
}

/// The header and raw bytes of an attribute in a STUN [`Packet`](crate::message::Packet)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    /// The [`AttributeHeader`] of this [`RawAttribute`]
    pub header: AttributeHeader,
    /// The value of this [`RawAttribute`] without padding
    pub value: &'a [u8],
}

impl std::fmt::Display for RawAttribute<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, len: {}, data: ", self.get_type(), self.length())?;
        for b in self.value {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl<'a> RawAttribute<'a> {
    /// Create a new [`RawAttribute`]
    ///
    /// # Errors
    ///
    /// - [`StunWriteError::TooLarge`] if `value` is longer than 65535 bytes.
    pub fn new(atype: AttributeType, value: &'a [u8]) -> Result<Self, StunWriteError> {
        let length = u16::try_from(value.len()).map_err(|_| StunWriteError::TooLarge {
            expected: u16::MAX as usize,
            actual: value.len(),
        })?;
        Ok(Self {
            header: AttributeHeader::new(atype, length),
            value,
        })
    }

    /// Deserialize a `RawAttribute` from the start of `data`.  The value must be contained in
    /// `data` but the trailing padding is not required.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::attribute::{RawAttribute, AttributeType};
    /// let data = &[0, 1, 0, 2, 5, 6, 0, 0];
    /// let attr = RawAttribute::from_bytes(data).unwrap();
    /// assert_eq!(attr.get_type(), AttributeType::new(1));
    /// assert_eq!(attr.length(), 2);
    /// assert_eq!(attr.value, &[5, 6]);
    /// ```
    pub fn from_bytes(data: &'a [u8]) -> Result<Self, PacketFormatError> {
        let header = AttributeHeader::parse(data)?;
        let end = AttributeHeader::LENGTH + header.length() as usize;
        // the advertised length is larger than actual data -> error
        if end > data.len() {
            return Err(PacketFormatError::Truncated {
                expected: end,
                actual: data.len(),
            });
        }
        Ok(Self {
            header,
            value: &data[AttributeHeader::LENGTH..end],
        })
    }

    /// Serialize a `RawAttribute` to bytes, filling the padding with `padding`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::attribute::{RawAttribute, AttributeType};
    /// let attr = RawAttribute::new(AttributeType::new(1), &[5, 6]).unwrap();
    /// assert_eq!(attr.to_bytes(0), &[0, 1, 0, 2, 5, 6, 0, 0]);
    /// assert_eq!(attr.to_bytes(0x20), &[0, 1, 0, 2, 5, 6, 0x20, 0x20]);
    /// ```
    pub fn to_bytes(&self, padding: u8) -> Vec<u8> {
        let mut vec = vec![0; self.padded_len()];
        self.write_into_unchecked(&mut vec, padding);
        vec
    }

    /// Write this attribute (header, value and padding) into the start of `dest`.  Returns
    /// the number of bytes written.
    ///
    /// # Panics
    ///
    /// If `dest` is shorter than [`RawAttribute::padded_len`].
    pub fn write_into_unchecked(&self, dest: &mut [u8], padding: u8) -> usize {
        let len = self.padded_len();
        self.header.write_into(dest);
        let offset = AttributeHeader::LENGTH + self.value.len();
        dest[AttributeHeader::LENGTH..offset].copy_from_slice(self.value);
        dest[offset..len].fill(padding);
        len
    }

    /// Returns the [`AttributeType`] of this [`RawAttribute`]
    pub fn get_type(&self) -> AttributeType {
        self.header.get_type()
    }

    /// Returns the length of the value of this [`RawAttribute`]
    pub fn length(&self) -> u16 {
        self.header.length()
    }

    /// The length in bytes of this attribute as stored in a
    /// [`Packet`](crate::message::Packet) including any padding and the attribute header.
    pub fn padded_len(&self) -> usize {
        AttributeHeader::LENGTH + padded_attr_len(self.value.len())
    }
}

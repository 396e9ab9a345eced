// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use byteorder::{BigEndian, ByteOrder};

use crate::message::{StunParseError, MAGIC_COOKIE};
use crate::transaction::TransactionId;

use super::AttributeType;

/// The address family of the socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// IP version 4 address
    IPV4,
    /// IP version 6 address
    IPV6,
}

impl AddressFamily {
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            AddressFamily::IPV4 => 0x1,
            AddressFamily::IPV6 => 0x2,
        }
    }

    pub(crate) fn from_byte(byte: u8) -> Option<AddressFamily> {
        match byte {
            0x1 => Some(AddressFamily::IPV4),
            0x2 => Some(AddressFamily::IPV6),
            _ => None,
        }
    }

    fn value_len(self) -> usize {
        match self {
            AddressFamily::IPV4 => 8,
            AddressFamily::IPV6 => 20,
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressFamily::IPV4 => write!(f, "IPV4"),
            AddressFamily::IPV6 => write!(f, "IPV6"),
        }
    }
}

/// Mask (or unmask) a port for use in an XOR-MAPPED-ADDRESS
///
/// # Examples
///
/// ```
/// # use stun_packet::attribute::xor_port;
/// assert_eq!(xor_port(32853), 0xa147);
/// assert_eq!(xor_port(xor_port(1234)), 1234);
/// ```
pub fn xor_port(port: u16) -> u16 {
    port ^ (MAGIC_COOKIE >> 16) as u16
}

fn xor_key(transaction: TransactionId) -> [u8; 16] {
    let transaction: u128 = transaction.into();
    ((MAGIC_COOKIE as u128) << 96 | (transaction & 0x0000_0000_ffff_ffff_ffff_ffff_ffff_ffff))
        .to_be_bytes()
}

/// Mask (or unmask) an IP address for use in an XOR-MAPPED-ADDRESS.
///
/// IPv4 addresses are masked with the magic cookie.  IPv6 addresses are masked with the magic
/// cookie followed by the bytes of `transaction`.
///
/// # Examples
///
/// ```
/// # use stun_packet::attribute::xor_ip;
/// # use std::net::IpAddr;
/// let ip: IpAddr = "192.0.2.1".parse().unwrap();
/// let masked = xor_ip(ip, 0.into());
/// assert_eq!(masked, "225.18.166.67".parse::<IpAddr>().unwrap());
/// assert_eq!(xor_ip(masked, 0.into()), ip);
/// ```
pub fn xor_ip(ip: IpAddr, transaction: TransactionId) -> IpAddr {
    match ip {
        IpAddr::V4(ip) => {
            let const_octets = MAGIC_COOKIE.to_be_bytes();
            let addr_octets = ip.octets();
            let octets = bytewise_xor!(4, const_octets, addr_octets, 0);
            IpAddr::V4(Ipv4Addr::from(octets))
        }
        IpAddr::V6(ip) => {
            let const_octets = xor_key(transaction);
            let addr_octets = ip.octets();
            let octets = bytewise_xor!(16, const_octets, addr_octets, 0);
            IpAddr::V6(Ipv6Addr::from(octets))
        }
    }
}

/// Mask (or unmask) the raw bytes of an IPv4 (4 bytes) or IPv6 (16 bytes) address in place.
///
/// `octets` must be 4 or 16 bytes long.  Other lengths are left untouched in release builds.
pub fn xor_octets(octets: &mut [u8], transaction: TransactionId) {
    debug_assert!(
        octets.len() == 4 || octets.len() == 16,
        "address octets must be 4 or 16 bytes, not {}",
        octets.len()
    );
    let key = xor_key(transaction);
    if octets.len() == 4 || octets.len() == 16 {
        for (b, k) in octets.iter_mut().zip(key) {
            *b ^= k;
        }
    }
}

/// Helper struct for `SocketAddr`s that are stored is an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedSocketAddr {
    addr: SocketAddr,
}

impl MappedSocketAddr {
    /// Create a new [`MappedSocketAddr`].
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// The number of bytes of this [`MappedSocketAddr`].
    pub fn length(&self) -> u16 {
        match self.addr {
            SocketAddr::V4(_) => 8,
            SocketAddr::V6(_) => 20,
        }
    }

    /// Serialize this [`MappedSocketAddr`] into an attribute value
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::attribute::MappedSocketAddr;
    /// let mapped = MappedSocketAddr::new("192.0.2.1:32853".parse().unwrap());
    /// assert_eq!(mapped.to_value(), [0x00, 0x01, 0x80, 0x55, 0xc0, 0x00, 0x02, 0x01]);
    /// ```
    pub fn to_value(&self) -> Vec<u8> {
        let mut buf = vec![0; self.length() as usize];
        self.write_into_unchecked(&mut buf);
        buf
    }

    /// Decode an attribute value into a [`MappedSocketAddr`].  `atype` is only used for
    /// error reporting.
    ///
    /// # Errors
    ///
    /// - [`StunParseError::InvalidAttributeData`] if the value is shorter than 4 bytes, has an
    ///   unknown address family, or has the wrong length for its address family.
    pub fn from_value(atype: AttributeType, value: &[u8]) -> Result<Self, StunParseError> {
        if value.len() < 4 {
            return Err(StunParseError::InvalidAttributeData(atype));
        }
        let family = AddressFamily::from_byte(value[1])
            .ok_or(StunParseError::InvalidAttributeData(atype))?;
        if value.len() != family.value_len() {
            return Err(StunParseError::InvalidAttributeData(atype));
        }
        let port = BigEndian::read_u16(&value[2..4]);
        let addr = match family {
            AddressFamily::IPV4 => IpAddr::V4(Ipv4Addr::from(BigEndian::read_u32(&value[4..8]))),
            AddressFamily::IPV6 => {
                IpAddr::V6(Ipv6Addr::from(BigEndian::read_u128(&value[4..20])))
            }
        };
        Ok(Self {
            addr: SocketAddr::new(addr, port),
        })
    }

    /// The `SocketAddr` in this [`MappedSocketAddr`]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub(crate) fn write_into_unchecked(&self, dest: &mut [u8]) {
        match self.addr {
            SocketAddr::V4(addr) => {
                dest[0] = 0x0;
                dest[1] = AddressFamily::IPV4.to_byte();
                BigEndian::write_u16(&mut dest[2..4], addr.port());
                BigEndian::write_u32(&mut dest[4..8], u32::from(*addr.ip()));
            }
            SocketAddr::V6(addr) => {
                dest[0] = 0x0;
                dest[1] = AddressFamily::IPV6.to_byte();
                BigEndian::write_u16(&mut dest[2..4], addr.port());
                BigEndian::write_u128(&mut dest[4..20], u128::from(*addr.ip()));
            }
        }
    }
}

impl std::fmt::Display for MappedSocketAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// Helper struct for [`SocketAddr`] that are stored as an attribute after an XOR operation with
/// the [`TransactionId`] of a [`Packet`](crate::message::Packet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorSocketAddr {
    /// The masked address
    pub addr: MappedSocketAddr,
}

impl XorSocketAddr {
    /// Create a new [`XorSocketAddr`] by masking `addr` with `transaction`.
    pub fn new(addr: SocketAddr, transaction: TransactionId) -> Self {
        Self {
            addr: MappedSocketAddr::new(XorSocketAddr::xor_addr(addr, transaction)),
        }
    }

    /// The number of bytes of this [`XorSocketAddr`].
    pub fn length(&self) -> u16 {
        self.addr.length()
    }

    /// Serialize this [`XorSocketAddr`] into an attribute value
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::attribute::XorSocketAddr;
    /// let xor = XorSocketAddr::new("192.0.2.1:32853".parse().unwrap(), 0.into());
    /// assert_eq!(xor.to_value(), [0x00, 0x01, 0xa1, 0x47, 0xe1, 0x12, 0xa6, 0x43]);
    /// ```
    pub fn to_value(&self) -> Vec<u8> {
        self.addr.to_value()
    }

    /// Decode a (still masked) attribute value into a [`XorSocketAddr`].
    pub fn from_value(atype: AttributeType, value: &[u8]) -> Result<Self, StunParseError> {
        let addr = MappedSocketAddr::from_value(atype, value)?;
        Ok(Self { addr })
    }

    /// Mask (or unmask) both the port and the IP address of `addr`.
    pub fn xor_addr(addr: SocketAddr, transaction: TransactionId) -> SocketAddr {
        SocketAddr::new(xor_ip(addr.ip(), transaction), xor_port(addr.port()))
    }

    /// The unmasked address
    pub fn addr(&self, transaction: TransactionId) -> SocketAddr {
        XorSocketAddr::xor_addr(self.addr.addr(), transaction)
    }
}

impl std::fmt::Display for XorSocketAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "XOR({})", self.addr)
    }
}

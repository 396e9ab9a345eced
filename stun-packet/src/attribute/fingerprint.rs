// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The FINGERPRINT attribute
//!
//! A FINGERPRINT is always the last attribute of a message.  Its 4 byte value is the CRC-32 of
//! every preceding byte of the message XOR'd with `0x5354554E`.  The length field of the
//! message header already includes the 8 bytes of the FINGERPRINT attribute when the CRC is
//! computed.

use byteorder::{BigEndian, ByteOrder};
use tracing::trace;

use super::{AttributeHeader, AttributeType};
use crate::message::MessageHeader;

const XOR_CONSTANT: u32 = 0x5354_554E;

/// The number of bytes a FINGERPRINT attribute occupies in a message
pub const FINGERPRINT_ATTRIBUTE_LENGTH: usize = AttributeHeader::LENGTH + 4;

/// Compute the fingerprint of a specified block of data as required by STUN
///
/// # Examples
/// ```
/// # use stun_packet::attribute::fingerprint::compute_fingerprint;
/// assert_eq!(compute_fingerprint(&[99; 4]), 0x8b79_af40);
/// assert_eq!(compute_fingerprint(b"123456789"), 0xcbf4_3926 ^ 0x5354_554e);
/// ```
pub fn compute_fingerprint(data: &[u8]) -> u32 {
    use crc::{Crc, CRC_32_ISO_HDLC};
    const CRC_ALGO: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);
    CRC_ALGO.checksum(data) ^ XOR_CONSTANT
}

/// Check the FINGERPRINT attribute at the end of `data`.
///
/// Only the final 8 bytes are inspected so this can be used on a buffer that has not (or can
/// not) be parsed.  Returns `false` if `data` is too short to hold a message header and a
/// FINGERPRINT, if the final attribute is not a FINGERPRINT, or if the stored value does not
/// match.
///
/// # Examples
///
/// ```
/// # use stun_packet::attribute::fingerprint::verify_fingerprint;
/// # use stun_packet::builder::PacketBuilder;
/// let packet = PacketBuilder::new().set_fingerprint(true).build().unwrap();
/// assert!(verify_fingerprint(packet.as_bytes()));
/// let mut corrupted = packet.as_bytes().to_vec();
/// corrupted[10] ^= 0x01;
/// assert!(!verify_fingerprint(&corrupted));
/// ```
pub fn verify_fingerprint(data: &[u8]) -> bool {
    if data.len() < MessageHeader::LENGTH + FINGERPRINT_ATTRIBUTE_LENGTH {
        trace!(len = data.len(), "too short for a fingerprint");
        return false;
    }
    let offset = data.len() - FINGERPRINT_ATTRIBUTE_LENGTH;
    let Ok(header) = AttributeHeader::parse(&data[offset..]) else {
        return false;
    };
    if header.get_type() != AttributeType::FINGERPRINT || header.length() != 4 {
        trace!("last attribute is {} and not a fingerprint", header.get_type());
        return false;
    }
    let stored = BigEndian::read_u32(&data[offset + AttributeHeader::LENGTH..]);
    let calculated = compute_fingerprint(&data[..offset]);
    if stored != calculated {
        trace!("fingerprint mismatch, stored {stored:#010x} calculated {calculated:#010x}");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 5769 IPv4 response
    const RESPONSE: [u8; 80] = [
        0x01, 0x01, 0x00, 0x3c, 0x21, 0x12, 0xa4, 0x42, 0xb7, 0xe7, 0xa7, 0x01, 0xbc, 0x34, 0xd6,
        0x86, 0xfa, 0x87, 0xdf, 0xae, 0x80, 0x22, 0x00, 0x0b, 0x74, 0x65, 0x73, 0x74, 0x20, 0x76,
        0x65, 0x63, 0x74, 0x6f, 0x72, 0x20, 0x00, 0x20, 0x00, 0x08, 0x00, 0x01, 0xa1, 0x47, 0xe1,
        0x12, 0xa6, 0x43, 0x00, 0x08, 0x00, 0x14, 0x2b, 0x91, 0xf5, 0x99, 0xfd, 0x9e, 0x90, 0xc3,
        0x8c, 0x74, 0x89, 0xf9, 0x2a, 0xf9, 0xba, 0x53, 0xf0, 0x6b, 0xe7, 0xd7, 0x80, 0x28, 0x00,
        0x04, 0xc0, 0x7d, 0x4c, 0x96,
    ];

    #[test]
    fn compute() {
        let _log = crate::tests::test_init_log();
        assert_eq!(compute_fingerprint(&RESPONSE[..72]), 0xc07d_4c96);
        assert_eq!(compute_fingerprint(&[]), XOR_CONSTANT);
    }

    #[test]
    fn verify() {
        let _log = crate::tests::test_init_log();
        assert!(verify_fingerprint(&RESPONSE));
    }

    #[test]
    fn verify_single_byte_corruption() {
        let _log = crate::tests::test_init_log();
        for i in 0..RESPONSE.len() {
            let mut data = RESPONSE;
            data[i] ^= 0x40;
            assert!(!verify_fingerprint(&data), "corruption at byte {i} not detected");
        }
    }

    #[test]
    fn verify_too_short() {
        let _log = crate::tests::test_init_log();
        assert!(!verify_fingerprint(&[]));
        assert!(!verify_fingerprint(&RESPONSE[RESPONSE.len() - 27..]));
    }

    #[test]
    fn verify_not_last_attribute() {
        let _log = crate::tests::test_init_log();
        // the message without the fingerprint ends with MESSAGE-INTEGRITY
        assert!(!verify_fingerprint(&RESPONSE[..72]));
        // fingerprint with the wrong length
        let mut data = RESPONSE;
        data[75] = 0x05;
        assert!(!verify_fingerprint(&data));
    }
}

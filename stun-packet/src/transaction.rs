// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN transaction identifiers
//!
//! Every STUN message carries a 96-bit transaction ID that correlates a request with its
//! response.  The same bytes are also the keystream used to mask an IPv6
//! XOR-MAPPED-ADDRESS.

use std::net::SocketAddr;
use std::sync::{Mutex, OnceLock, PoisonError};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::attribute::XorSocketAddr;
use crate::message::StunParseError;

/// A unique transaction identifier for each message and it's (possible) response.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct TransactionId {
    id: [u8; 12],
}

impl TransactionId {
    /// The length in bytes of a [`TransactionId`]
    pub const LENGTH: usize = 12;

    /// Create a [`TransactionId`] by copying the provided bytes
    ///
    /// # Errors
    ///
    /// - If `data` is not exactly 12 bytes long
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::transaction::TransactionId;
    /// # use stun_packet::message::StunParseError;
    /// let tid = TransactionId::from_bytes(&[0x42; 12]).unwrap();
    /// assert_eq!(tid.as_bytes(), &[0x42; 12]);
    /// assert!(matches!(
    ///     TransactionId::from_bytes(&[0x42; 11]),
    ///     Err(StunParseError::InvalidTransactionIdLength(11))
    /// ));
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self, StunParseError> {
        let id: [u8; 12] = data
            .try_into()
            .map_err(|_| StunParseError::InvalidTransactionIdLength(data.len()))?;
        Ok(Self { id })
    }

    /// Generate a new random [`TransactionId`] from the process wide
    /// [`TransactionIdGenerator`].
    pub fn generate() -> TransactionId {
        TransactionIdGenerator::global().generate()
    }

    /// The bytes of this [`TransactionId`]
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.id
    }

    /// Render this [`TransactionId`] as an uppercase hexadecimal string
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::transaction::TransactionId;
    /// let tid = TransactionId::from(0xb7e7_a701_bc34_d686_fa87_dfae);
    /// assert_eq!(tid.to_hex(), "B7E7A701BC34D686FA87DFAE");
    /// ```
    pub fn to_hex(&self) -> String {
        self.id.iter().fold(String::with_capacity(24), |mut s, b| {
            s.push_str(&format!("{b:02X}"));
            s
        })
    }

    /// Mask an address for use in an XOR-MAPPED-ADDRESS with this [`TransactionId`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::transaction::TransactionId;
    /// # use std::net::SocketAddr;
    /// let tid = TransactionId::from(0x1234);
    /// let addr: SocketAddr = "192.0.2.1:32853".parse().unwrap();
    /// let masked = tid.mask_address(addr);
    /// assert_ne!(masked, addr);
    /// assert_eq!(tid.unmask_address(masked), addr);
    /// ```
    pub fn mask_address(&self, addr: SocketAddr) -> SocketAddr {
        XorSocketAddr::xor_addr(addr, *self)
    }

    /// Reverse [`TransactionId::mask_address`].  XOR masking is its own inverse so this is the
    /// same operation.
    pub fn unmask_address(&self, addr: SocketAddr) -> SocketAddr {
        XorSocketAddr::xor_addr(addr, *self)
    }
}

impl From<[u8; 12]> for TransactionId {
    fn from(id: [u8; 12]) -> Self {
        Self { id }
    }
}

impl TryFrom<&[u8]> for TransactionId {
    type Error = StunParseError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        TransactionId::from_bytes(value)
    }
}

impl From<u128> for TransactionId {
    fn from(id: u128) -> Self {
        let mut ret = [0; 12];
        ret.copy_from_slice(&id.to_be_bytes()[4..]);
        Self { id: ret }
    }
}

impl From<TransactionId> for u128 {
    fn from(id: TransactionId) -> Self {
        let mut ret = [0; 16];
        ret[4..].copy_from_slice(&id.id);
        u128::from_be_bytes(ret)
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.to_hex())
    }
}

/// Source of random [`TransactionId`]s.
///
/// A generator is seeded once and can then be shared between threads.  Most users want the
/// process wide instance returned by [`TransactionIdGenerator::global`], which is seeded from
/// the operating system's entropy source on first use.
#[derive(Debug)]
pub struct TransactionIdGenerator {
    rng: Mutex<StdRng>,
}

static GLOBAL_GENERATOR: OnceLock<TransactionIdGenerator> = OnceLock::new();

impl TransactionIdGenerator {
    /// Create a new generator seeded from the operating system's entropy source.
    pub fn from_os_rng() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Create a new generator with a fixed seed.  The produced sequence is reproducible and
    /// must not be used for real traffic.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_packet::transaction::TransactionIdGenerator;
    /// let a = TransactionIdGenerator::seed_from_u64(7);
    /// let b = TransactionIdGenerator::seed_from_u64(7);
    /// assert_eq!(a.generate(), b.generate());
    /// ```
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// The process wide generator.
    pub fn global() -> &'static TransactionIdGenerator {
        GLOBAL_GENERATOR.get_or_init(TransactionIdGenerator::from_os_rng)
    }

    /// Draw a new [`TransactionId`] from this generator.
    pub fn generate(&self) -> TransactionId {
        let mut id = [0; 12];
        // the rng state is still valid if another thread panicked while holding the lock
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(&mut id);
        TransactionId { id }
    }
}

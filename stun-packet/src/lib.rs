// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN packets
//!
//! Parsing and building of STUN messages as specified in [RFC5389] (and the older [RFC3489]
//! MAPPED-ADDRESS form).
//!
//! A received datagram is validated with [`Packet::parse`](message::Packet::parse) and
//! attributes are then looked up directly from the received bytes. New messages are
//! accumulated with a [`PacketBuilder`](builder::PacketBuilder) and serialized with
//! [`PacketBuilder::build`](builder::PacketBuilder::build).
//!
//! [RFC5389]: https://tools.ietf.org/html/rfc5389
//! [RFC3489]: https://tools.ietf.org/html/rfc3489
//!
//! ## Examples
//!
//! ```
//! use stun_packet::builder::PacketBuilder;
//! use stun_packet::message::{MessageType, Packet};
//!
//! let request = PacketBuilder::new().set_fingerprint(true).build().unwrap();
//! let request = Packet::parse(request.as_bytes()).unwrap();
//! assert!(request.verify_fingerprint());
//!
//! // answer with the address the request was seen from
//! let from = "192.0.2.1:32853".parse().unwrap();
//! let mut response = request.to_builder();
//! response
//!     .set_message_type(MessageType::Success)
//!     .clear_attributes()
//!     .set_xor_mapped_address(from);
//! let response = response.build().unwrap();
//! assert_eq!(response.transaction_id(), request.transaction_id());
//! assert_eq!(response.resolved_address().unwrap(), from);
//! ```

pub mod attribute;
pub mod builder;
mod data;
pub mod message;
pub mod transaction;

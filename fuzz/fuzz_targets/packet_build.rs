// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use std::net::SocketAddr;
use std::sync::Once;

use stun_packet::attribute::AttributeType;
use stun_packet::builder::PacketBuilder;
use stun_packet::message::{MessageType, Packet};
use stun_packet::transaction::TransactionId;
use tracing::debug;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

fn init_log() {
    TRACING.call_once(|| {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    });
}

#[derive(Debug, Arbitrary)]
struct BuildInput<'a> {
    message_type: MessageType,
    transaction_id: TransactionId,
    padding: u8,
    fingerprint: bool,
    attributes: Vec<(u16, &'a [u8])>,
    mapped_address: Option<SocketAddr>,
    xor_mapped_address: Option<SocketAddr>,
}

fuzz_target!(|input: BuildInput| {
    init_log();
    let mut builder = PacketBuilder::new();
    builder
        .set_message_type(input.message_type)
        .set_transaction_id(input.transaction_id)
        .set_padding_byte(input.padding)
        .set_fingerprint(input.fingerprint);
    for (atype, value) in input.attributes.iter() {
        builder.add_attribute(AttributeType::new(*atype), value);
    }
    if let Some(addr) = input.xor_mapped_address {
        builder.set_xor_mapped_address(addr);
    }
    if let Some(addr) = input.mapped_address {
        builder.set_mapped_address(addr);
    }
    let Ok(built) = builder.build() else {
        return;
    };
    debug!("{built}");

    let packet = Packet::parse(built.as_bytes()).unwrap();
    assert_eq!(packet.message_type(), input.message_type);
    assert_eq!(packet.transaction_id(), input.transaction_id);
    if input.fingerprint {
        assert!(packet.verify_fingerprint());
    }
    let n_attributes = input.attributes.len()
        + input.xor_mapped_address.is_some() as usize
        + input.mapped_address.is_some() as usize
        + input.fingerprint as usize;
    assert_eq!(packet.iter_attributes().count(), n_attributes);
    if let Some(addr) = input.mapped_address {
        if !input
            .attributes
            .iter()
            .any(|(atype, _)| AttributeType::new(*atype) == AttributeType::MAPPED_ADDRESS)
        {
            // flow info and scope id are not stored
            let resolved = packet.resolved_address().unwrap();
            assert_eq!(resolved.ip(), addr.ip());
            assert_eq!(resolved.port(), addr.port());
        }
    }

    let mut rebuilt = packet.to_builder();
    rebuilt.set_padding_byte(input.padding);
    assert_eq!(rebuilt.build().unwrap().as_bytes(), built.as_bytes());
});

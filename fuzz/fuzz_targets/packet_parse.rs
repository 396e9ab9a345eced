// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![no_main]
use libfuzzer_sys::fuzz_target;

use std::sync::Once;

use stun_packet::attribute::fingerprint::verify_fingerprint;
use stun_packet::message::Packet;
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

fuzz_target!(|data: &[u8]| {
    init_log();
    let Ok(packet) = Packet::parse(data) else {
        return;
    };
    debug!("{packet}");
    let attr_len: usize = packet
        .iter_attributes()
        .map(|attr| attr.padded_len())
        .sum();
    assert_eq!(attr_len + 20, packet.len());
    for atype in packet.attribute_types() {
        assert!(packet.attribute_value(atype).is_some());
    }
    let _ = packet.resolved_address();
    assert_eq!(packet.verify_fingerprint(), verify_fingerprint(data));

    // padding is not stored so only rebuilding with zero padding may reproduce the input
    let rebuilt = packet.to_builder().build().unwrap();
    let rebuilt = Packet::parse(rebuilt.as_bytes()).unwrap();
    assert_eq!(rebuilt.len(), packet.len());
    assert_eq!(rebuilt.transaction_id(), packet.transaction_id());
    assert!(rebuilt.iter_attributes().eq(packet.iter_attributes()));
});

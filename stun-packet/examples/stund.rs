// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![cfg(not(tarpaulin))]

use std::fmt::Display;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::str::FromStr;

use tracing::{error, info, warn};

use stun_packet::message::{MessageType, Packet, StunWriteError};

fn warn_on_err<T, E>(res: Result<T, E>, default: T) -> T
where
    E: Display,
{
    match res {
        Ok(v) => v,
        Err(e) => {
            warn!("{}", e);
            default
        }
    }
}

fn handle_binding_request(request: &Packet, from: SocketAddr) -> Result<Vec<u8>, StunWriteError> {
    let mut response = request.to_builder();
    response
        .set_message_type(MessageType::Success)
        .clear_attributes()
        .set_xor_mapped_address(from)
        .set_fingerprint(true);
    Ok(response.build()?.as_bytes().to_vec())
}

fn handle_incoming_data(data: &[u8], from: SocketAddr) -> Option<Vec<u8>> {
    let packet = match Packet::parse(data) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("dropping {} bytes from {from}: {e}", data.len());
            return None;
        }
    };
    info!("received from {}: {}", from, packet);
    if packet.message_type() != MessageType::Request {
        error!("received unexpected {} from {from}", packet.message_type());
        return None;
    }
    if packet.has_fingerprint() && !packet.verify_fingerprint() {
        warn!("dropping request from {from} with an invalid fingerprint");
        return None;
    }
    match handle_binding_request(&packet, from) {
        Ok(response) => {
            info!("sending response to {}: {:?}", from, response);
            Some(response)
        }
        Err(err) => {
            warn!("error: {}", err);
            None
        }
    }
}

fn init_logs() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Layer;
    let level_filter = std::env::var("STUN_LOG")
        .ok()
        .and_then(|var| var.parse::<tracing_subscriber::filter::Targets>().ok())
        .unwrap_or(tracing_subscriber::filter::Targets::new().with_default(tracing::Level::ERROR));
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_level(true)
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(level_filter),
    );
    tracing::subscriber::set_global_default(registry).unwrap()
}

fn main() -> io::Result<()> {
    init_logs();

    let args: Vec<String> = std::env::args().collect();
    let local_addr = SocketAddr::from_str(if args.len() > 1 {
        &args[1]
    } else {
        "127.0.0.1:3478"
    })
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let udp_socket = UdpSocket::bind(local_addr)?;
    println!("listening on {}", udp_socket.local_addr()?);
    loop {
        let mut data = [0; 1500];
        let Some((len, from)) = warn_on_err(udp_socket.recv_from(&mut data).map(Some), None)
        else {
            continue;
        };
        if let Some(response) = handle_incoming_data(&data[..len], from) {
            warn_on_err(udp_socket.send_to(&response, from), 0);
        }
    }
}

// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![cfg(not(tarpaulin))]

use std::env;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, trace};

use stun_packet::builder::PacketBuilder;
use stun_packet::message::{MessageType, Packet};
use stun_packet::transaction::TransactionId;

fn usage() {
    println!("stunclient [server address:port] [local address:port]");
}

fn invalid_data(msg: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn parse_response(response: &Packet, transaction: TransactionId) -> Result<SocketAddr, io::Error> {
    if response.transaction_id() != transaction {
        return Err(invalid_data(format!(
            "Response transaction {} does not match request transaction {}",
            response.transaction_id(),
            transaction
        )));
    }
    if !response.verify_fingerprint() {
        return Err(invalid_data("Response fingerprint does not match"));
    }
    match response.message_type() {
        MessageType::Success => response.resolved_address().map_err(invalid_data),
        mtype => Err(io::Error::new(
            io::ErrorKind::Other,
            format!("Unexpected {mtype} response"),
        )),
    }
}

fn udp_message(to: SocketAddr, local: SocketAddr) -> Result<SocketAddr, io::Error> {
    let socket = UdpSocket::bind(local)?;
    socket.set_read_timeout(Some(Duration::from_secs(5)))?;

    let mut request = PacketBuilder::new();
    request.set_fingerprint(true);
    let request = request.build().map_err(invalid_data)?;
    info!("generated {}", request);
    trace!("generated {:?}", request.as_bytes());
    socket.send_to(request.as_bytes(), to)?;

    let mut buf = [0; 1500];
    let (amt, src) = socket.recv_from(&mut buf)?;
    let buf = &buf[..amt];
    trace!("got {:?}", buf);
    let response = Packet::parse(buf).map_err(invalid_data)?;
    info!("got from {:?} to {:?} {}", src, socket.local_addr()?, response);

    parse_response(&response, request.transaction_id())
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

fn parse_addr(args: &[String], i: usize, default: &str) -> SocketAddr {
    let addr = args.get(i).map(String::as_str).unwrap_or(default);
    SocketAddr::from_str(addr).unwrap_or_else(|e| {
        println!("invalid address {addr}: {e}");
        usage();
        std::process::exit(1);
    })
}

fn main() -> io::Result<()> {
    init_logs();

    let args: Vec<String> = env::args().collect();
    let to = parse_addr(&args, 1, "127.0.0.1:3478");
    let local = parse_addr(&args, 2, if to.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" });

    println!("sending STUN request to {}", to);
    let visible_addr = udp_message(to, local)?;
    println!("found visible address {}", visible_addr);
    Ok(())
}

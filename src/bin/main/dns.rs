//! Captive DNS responder: answers every A query with the gateway address so
//! joining stations land on the control panel no matter what name they ask
//! for.

use core::net::Ipv4Addr;
use core::str::from_utf8;

use embassy_net::{
    Stack,
    udp::{self, UdpSocket},
};
use embassy_time::Timer;
use log::{debug, info, warn};

const SERVER_PORT: u16 = 53;
const RESPONSE_TTL: u32 = 60;
const MAX_NAME_BYTES: usize = 253;

struct Question {
    len: usize,
    qtype: u16,
    name: heapless::String<MAX_NAME_BYTES>,
}

fn parse_question(packet: &[u8]) -> Option<Question> {
    if packet.len() < 12 {
        return None;
    }

    let mut idx = 12;
    let mut name = heapless::String::<MAX_NAME_BYTES>::new();
    loop {
        let label_len = *packet.get(idx)? as usize;
        idx += 1;
        if label_len == 0 {
            break;
        }
        if idx + label_len > packet.len() {
            return None;
        }
        let label = from_utf8(&packet[idx..idx + label_len]).ok()?;
        if !name.is_empty() {
            name.push('.').ok()?;
        }
        name.push_str(label).ok()?;
        idx += label_len;
    }

    if idx + 4 > packet.len() {
        return None;
    }
    let qtype = u16::from_be_bytes([packet[idx], packet[idx + 1]]);

    Some(Question {
        len: idx + 4 - 12,
        qtype,
        name,
    })
}

fn build_response(
    query: &[u8],
    response: &mut [u8],
    answer_ip: Ipv4Addr,
    question: &Question,
) -> Option<usize> {
    let question_end = 12 + question.len;
    if query.len() < question_end || response.len() < question_end + 16 {
        return None;
    }

    response.fill(0);
    response[0..2].copy_from_slice(&query[0..2]);
    // Standard response, recursion available.
    response[2] = 0x81;
    response[3] = 0x80;
    response[4..6].copy_from_slice(&query[4..6]); // QDCOUNT
    response[6..8].copy_from_slice(&1u16.to_be_bytes()); // ANCOUNT
    response[12..question_end].copy_from_slice(&query[12..question_end]);

    let mut offset = question_end;
    response[offset] = 0xC0;
    response[offset + 1] = 0x0C; // pointer back to the question name
    response[offset + 2..offset + 4].copy_from_slice(&1u16.to_be_bytes()); // A
    response[offset + 4..offset + 6].copy_from_slice(&1u16.to_be_bytes()); // IN
    response[offset + 6..offset + 10].copy_from_slice(&RESPONSE_TTL.to_be_bytes());
    response[offset + 10..offset + 12].copy_from_slice(&4u16.to_be_bytes());
    response[offset + 12..offset + 16].copy_from_slice(&answer_ip.octets());
    offset += 16;

    Some(offset)
}

pub async fn serve(stack: Stack<'_>, answer_ip: Ipv4Addr) -> ! {
    let mut rx_meta = [udp::PacketMetadata::EMPTY; 4];
    let mut rx_buffer = [0u8; 512];
    let mut tx_meta = [udp::PacketMetadata::EMPTY; 4];
    let mut tx_buffer = [0u8; 512];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );

    if let Err(err) = socket.bind(SERVER_PORT) {
        warn!("dns: bind to port {} failed: {:?}", SERVER_PORT, err);
        loop {
            Timer::after_secs(1).await;
        }
    }
    info!("dns: answering every query with {}", answer_ip);

    let mut frame = [0u8; 512];
    let mut response = [0u8; 512];

    loop {
        let Ok((len, remote)) = socket.recv_from(&mut frame).await else {
            continue;
        };

        let query = &frame[..len];
        let Some(question) = parse_question(query) else {
            debug!("dns: ignoring malformed query from {:?}", remote);
            continue;
        };
        let Some(response_len) = build_response(query, &mut response, answer_ip, &question)
        else {
            debug!("dns: response for {} did not fit", question.name);
            continue;
        };

        if let Err(err) = socket.send_to(&response[..response_len], remote).await {
            warn!("dns: send error: {:?}", err);
            continue;
        }
        debug!(
            "dns: {} -> {} (qtype {})",
            if question.name.is_empty() { "(root)" } else { question.name.as_str() },
            answer_ip,
            question.qtype
        );
    }
}

//! Minimal DHCP responder for the soft-AP subnet.
//!
//! Hands out leases from a small fixed pool and points joining stations at
//! the gateway for router and DNS. Only BOOTREQUEST frames from Ethernet
//! clients with 6-byte MACs are answered.

use core::net::Ipv4Addr;

use embassy_net::{
    IpAddress, Stack,
    udp::{self, UdpSocket},
};
use embassy_time::{Duration, Instant, Timer};
use log::{debug, info, warn};

const SERVER_PORT: u16 = 67;
const CLIENT_PORT: u16 = 68;
const MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];
const LEASE_SECONDS: u32 = 7_200;
const MAX_LEASES: usize = 8;
// BOOTP fixed header plus cookie; frames shorter than this are noise.
const MIN_FRAME_BYTES: usize = 240;

/// Addresses offered to joining stations, contiguous from `start`.
#[derive(Clone, Copy)]
pub struct AddressPool {
    pub start: Ipv4Addr,
    pub size: u8,
}

impl AddressPool {
    fn nth(&self, offset: u8) -> Ipv4Addr {
        let base = u32::from_be_bytes(self.start.octets());
        Ipv4Addr::from_bits(base.saturating_add(offset as u32))
    }

    fn contains(&self, ip: Ipv4Addr) -> bool {
        if self.size == 0 {
            return false;
        }
        let start = u32::from_be_bytes(self.start.octets());
        let value = u32::from_be_bytes(ip.octets());
        value >= start && value < start + self.size as u32
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum MessageKind {
    Discover,
    Request,
    Decline,
    Release,
    Inform,
    Other(u8),
}

impl MessageKind {
    fn from_option(code: u8) -> Self {
        match code {
            1 => Self::Discover,
            3 => Self::Request,
            4 => Self::Decline,
            7 => Self::Release,
            8 => Self::Inform,
            other => Self::Other(other),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Discover => "DISCOVER",
            Self::Request => "REQUEST",
            Self::Decline => "DECLINE",
            Self::Release => "RELEASE",
            Self::Inform => "INFORM",
            Self::Other(_) => "OTHER",
        }
    }
}

struct BootRequest {
    kind: MessageKind,
    transaction_id: u32,
    hardware_type: u8,
    hardware_len: u8,
    flags: u16,
    client_mac: [u8; 6],
    client_ip: Option<Ipv4Addr>,
    requested_ip: Option<Ipv4Addr>,
    server_id: Option<Ipv4Addr>,
}

struct Lease {
    mac: [u8; 6],
    ip: Ipv4Addr,
    expires_at: Instant,
}

fn option_ipv4(data: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(data[0], data[1], data[2], data[3])
}

fn parse_frame(frame: &[u8]) -> Option<BootRequest> {
    if frame.len() < MIN_FRAME_BYTES || frame[0] != 1 {
        return None;
    }

    let hardware_type = frame[1];
    let hardware_len = frame[2];
    if hardware_type != 1 || hardware_len != 6 {
        return None;
    }
    if frame[236..240] != MAGIC_COOKIE {
        return None;
    }

    let transaction_id = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);
    let flags = u16::from_be_bytes([frame[10], frame[11]]);

    let mut kind = None;
    let mut requested_ip = None;
    let mut server_id = None;
    let mut idx = MIN_FRAME_BYTES;
    while idx < frame.len() {
        let code = frame[idx];
        idx += 1;
        match code {
            0 => continue,
            255 => break,
            _ => {
                if idx >= frame.len() {
                    break;
                }
                let len = frame[idx] as usize;
                idx += 1;
                if idx + len > frame.len() {
                    break;
                }
                let data = &frame[idx..idx + len];
                match code {
                    50 if len == 4 => requested_ip = Some(option_ipv4(data)),
                    53 if len == 1 => kind = Some(MessageKind::from_option(data[0])),
                    54 if len == 4 => server_id = Some(option_ipv4(data)),
                    _ => {}
                }
                idx += len;
            }
        }
    }

    let ciaddr = Ipv4Addr::new(frame[12], frame[13], frame[14], frame[15]);
    let mut client_mac = [0u8; 6];
    client_mac.copy_from_slice(&frame[28..34]);

    Some(BootRequest {
        kind: kind?,
        transaction_id,
        hardware_type,
        hardware_len,
        flags,
        client_mac,
        client_ip: (!ciaddr.is_unspecified()).then_some(ciaddr),
        requested_ip,
        server_id,
    })
}

fn push_option(dest: &mut [u8], code: u8, payload: &[u8]) -> Option<usize> {
    let needed = payload.len().checked_add(2)?;
    if dest.len() < needed {
        return None;
    }
    dest[0] = code;
    dest[1] = payload.len() as u8;
    dest[2..needed].copy_from_slice(payload);
    Some(needed)
}

fn build_reply(
    scratch: &mut [u8],
    request: &BootRequest,
    offered_ip: Ipv4Addr,
    server_ip: Ipv4Addr,
    netmask: Ipv4Addr,
) -> Option<usize> {
    if scratch.len() < 300 {
        return None;
    }
    // 2 = OFFER answering a DISCOVER, 5 = ACK answering a REQUEST.
    let reply_type: u8 = match request.kind {
        MessageKind::Discover => 2,
        MessageKind::Request => 5,
        _ => return None,
    };

    scratch.fill(0);
    scratch[0] = 2; // BOOTREPLY
    scratch[1] = request.hardware_type;
    scratch[2] = request.hardware_len;
    scratch[4..8].copy_from_slice(&request.transaction_id.to_be_bytes());
    scratch[10..12].copy_from_slice(&request.flags.to_be_bytes());
    scratch[16..20].copy_from_slice(&offered_ip.octets());
    scratch[20..24].copy_from_slice(&server_ip.octets());
    scratch[28..34].copy_from_slice(&request.client_mac);
    scratch[236..240].copy_from_slice(&MAGIC_COOKIE);

    let server_bytes = server_ip.octets();
    let renewal = LEASE_SECONDS / 2;
    let rebinding = (LEASE_SECONDS as u64 * 7 / 8) as u32;
    let broadcast = {
        let o = server_ip.octets();
        Ipv4Addr::new(o[0], o[1], o[2], 255)
    };

    let mut idx = MIN_FRAME_BYTES;
    idx += push_option(&mut scratch[idx..], 53, &[reply_type])?;
    idx += push_option(&mut scratch[idx..], 54, &server_bytes)?; // server id
    idx += push_option(&mut scratch[idx..], 51, &LEASE_SECONDS.to_be_bytes())?;
    idx += push_option(&mut scratch[idx..], 58, &renewal.to_be_bytes())?;
    idx += push_option(&mut scratch[idx..], 59, &rebinding.to_be_bytes())?;
    idx += push_option(&mut scratch[idx..], 1, &netmask.octets())?;
    idx += push_option(&mut scratch[idx..], 3, &server_bytes)?; // router
    idx += push_option(&mut scratch[idx..], 6, &server_bytes)?; // dns
    idx += push_option(&mut scratch[idx..], 28, &broadcast.octets())?;
    scratch[idx] = 255;
    idx += 1;

    Some(idx)
}

fn allocate(
    leases: &mut heapless::Vec<Lease, MAX_LEASES>,
    mac: [u8; 6],
    pool: AddressPool,
    requested: Option<Ipv4Addr>,
) -> Option<Ipv4Addr> {
    let now = Instant::now();
    leases.retain(|lease| lease.expires_at > now);
    let expiry = now + Duration::from_secs(LEASE_SECONDS as u64);

    let desired = requested.filter(|ip| pool.contains(*ip)).filter(|ip| {
        leases
            .iter()
            .all(|lease| lease.mac == mac || lease.ip != *ip)
    });

    if let Some(existing) = leases.iter_mut().find(|lease| lease.mac == mac) {
        if let Some(ip) = desired {
            existing.ip = ip;
        }
        existing.expires_at = expiry;
        return Some(existing.ip);
    }

    if let Some(ip) = desired
        && leases.push(Lease { mac, ip, expires_at: expiry }).is_ok()
    {
        return Some(ip);
    }

    for offset in 0..pool.size {
        let candidate = pool.nth(offset);
        if leases.iter().any(|lease| lease.ip == candidate) {
            continue;
        }
        if leases
            .push(Lease { mac, ip: candidate, expires_at: expiry })
            .is_ok()
        {
            return Some(candidate);
        }
    }

    None
}

pub async fn serve(
    stack: Stack<'_>,
    server_ip: Ipv4Addr,
    netmask: Ipv4Addr,
    pool: AddressPool,
) -> ! {
    let mut rx_meta = [udp::PacketMetadata::EMPTY; 4];
    let mut rx_buffer = [0u8; 768];
    let mut tx_meta = [udp::PacketMetadata::EMPTY; 4];
    let mut tx_buffer = [0u8; 768];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );

    if let Err(err) = socket.bind(SERVER_PORT) {
        warn!("dhcp: bind to port {} failed: {:?}", SERVER_PORT, err);
        loop {
            Timer::after_secs(1).await;
        }
    }
    info!("dhcp: serving leases on {}", server_ip);

    let mut leases: heapless::Vec<Lease, MAX_LEASES> = heapless::Vec::new();
    let mut frame = [0u8; 768];
    let mut reply = [0u8; 768];

    loop {
        let (len, remote) = match socket.recv_from(&mut frame).await {
            Ok(received) => received,
            Err(err) => {
                warn!("dhcp: recv error: {:?}", err);
                continue;
            }
        };

        let Some(request) = parse_frame(&frame[..len]) else {
            debug!("dhcp: ignoring malformed frame from {:?}", remote);
            continue;
        };
        debug!(
            "dhcp: {} from {:02x?}",
            request.kind.label(),
            request.client_mac
        );

        // REQUESTs addressed to a different server are not ours to answer.
        if request.kind == MessageKind::Request
            && request.server_id.is_some()
            && request.server_id != Some(server_ip)
        {
            continue;
        }

        let offered_ip = match request.kind {
            MessageKind::Discover | MessageKind::Request => allocate(
                &mut leases,
                request.client_mac,
                pool,
                request.requested_ip.or(request.client_ip),
            )
            .unwrap_or(pool.start),
            MessageKind::Decline | MessageKind::Release => {
                leases.retain(|lease| lease.mac != request.client_mac);
                continue;
            }
            MessageKind::Inform | MessageKind::Other(_) => continue,
        };

        let Some(reply_len) = build_reply(&mut reply, &request, offered_ip, server_ip, netmask)
        else {
            warn!("dhcp: reply did not fit the scratch buffer");
            continue;
        };

        let destination = (IpAddress::Ipv4(Ipv4Addr::BROADCAST), CLIENT_PORT);
        match socket.send_to(&reply[..reply_len], destination).await {
            Ok(()) => info!("dhcp: leased {} to {:02x?}", offered_ip, request.client_mac),
            Err(err) => warn!("dhcp: send error: {:?}", err),
        }
    }
}

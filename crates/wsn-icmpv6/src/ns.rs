use crate::checksum::fill_checksum;
use crate::error::Icmp6Error;
use crate::options::{encode_earo, encode_sllao, encode_tllao, parse_options, Earo, NdOption};
use crate::validate::{validate_common, ICMP_NEIGHBOR_ADVERTISEMENT, ICMP_NEIGHBOR_SOLICITATION};
use wsn_addr::{Addr, Eui64};
use wsn_common::time::MonoMs;
use wsn_ncache::NeighborCache;
use wsn_packet::{AroStatus, Direction, PacketMeta};

const NS_FIXED_LEN: usize = 8 + 16;
const NA_FIXED_LEN: usize = 8 + 16;

const NA_FLAG_ROUTER: u8 = 0x80;
const NA_FLAG_SOLICITED: u8 = 0x40;
const NA_FLAG_OVERRIDE: u8 = 0x20;

/// The three outcomes the registration handler can hand back for an
/// inbound EARO (spec §4.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EaroDecision {
    /// Must query upstream before replying; drop current NS.
    Defer,
    ReplyWithEaro(AroStatus),
    ReplyWithoutEaro,
}

/// The address-registration collaborator (spec §6: outside the core's
/// scope, but the core drives it synchronously from the NS handler).
pub trait RegistrationHandler {
    fn decide(&mut self, eui64: Eui64, tid: u8, lifetime: u16, now_ms: MonoMs) -> EaroDecision;
}

/// A built outbound message: metadata plus the (checksum-filled) ICMPv6
/// octets, ready for a caller to wrap in a `PacketBuffer` and hand to the
/// lower layer.
pub struct OutboundIcmp6 {
    pub meta: PacketMeta,
    pub bytes: Vec<u8>,
}

/// Process an inbound Neighbor Solicitation (spec §4.3.2). Returns the NA
/// to emit, if any; `Ok(None)` covers both "no reply required" (plain NS,
/// silently answered is NOT this case — see below) and DEFER.
///
/// Note: an ordinary NS without EARO always gets a reply per RFC 4861;
/// only the EARO path can defer.
pub fn handle_ns(
    message: &[u8],
    meta: &PacketMeta,
    ncache: &mut NeighborCache,
    handler: &mut dyn RegistrationHandler,
    our_addrs: &[Addr],
    accepts_aro: bool,
    now_ms: MonoMs,
) -> Result<Option<OutboundIcmp6>, Icmp6Error> {
    validate_common(meta, message)?;
    if message.len() < NS_FIXED_LEN {
        return Err(Icmp6Error::MalformedPacket);
    }

    let mut target = [0u8; 16];
    target.copy_from_slice(&message[8..24]);
    let target = Addr(target);
    if target.is_multicast() {
        return Err(Icmp6Error::MalformedPacket);
    }

    let mut options = parse_options(&message[24..])?;

    let sllao = options.iter().find_map(|o| match o {
        NdOption::Sllao(e) => Some(*e),
        _ => None,
    });
    let earo = options.iter().find_map(|o| match o {
        NdOption::Earo(e) => Some(*e),
        _ => None,
    });

    if meta.src_addr.is_unspecified() {
        if !meta.dst_addr.is_solicited_node_multicast() || sllao.is_some() {
            return Err(Icmp6Error::MalformedPacket);
        }
    } else if let Some(ll) = sllao {
        ncache
            .update_unsolicited(meta.src_addr, ll)
            .map_err(|_| Icmp6Error::AllocFailed)?;
    }

    // Wi-SUN shorthand: a bare EARO with no SLLAO carries enough
    // information (EUI-64 global uniqueness) that we synthesize one.
    let synthesized_sllao = earo.is_some() && accepts_aro && sllao.is_none();
    if synthesized_sllao {
        let e = earo.unwrap();
        options.push(NdOption::Sllao(e.eui64));
        ncache
            .update_unsolicited(meta.src_addr, e.eui64)
            .map_err(|_| Icmp6Error::AllocFailed)?;
    }

    let mut reply_earo: Option<Earo> = None;
    if let Some(e) = earo {
        if !accepts_aro {
            return Ok(None);
        }
        match handler.decide(e.eui64, e.tid, e.lifetime, now_ms) {
            EaroDecision::Defer => return Ok(None),
            EaroDecision::ReplyWithEaro(status) => {
                reply_earo = Some(Earo {
                    status: status.as_u8(),
                    opaque: e.opaque,
                    flags: e.flags,
                    tid: e.tid,
                    lifetime: e.lifetime,
                    eui64: e.eui64,
                });
            }
            EaroDecision::ReplyWithoutEaro => {}
        }
    }

    let dad = meta.src_addr.is_unspecified();
    let solicited = !dad;
    let override_flag = true; // this core never proxies a subordinate's address

    let our_ll = our_addrs
        .iter()
        .find(|a| a.is_link_local())
        .copied()
        .unwrap_or(target);
    let src_addr = if our_addrs.contains(&target) {
        target
    } else {
        our_ll
    };

    let dst_addr = match &reply_earo {
        Some(e) if e.status != AroStatus::Success.as_u8() => e.eui64.link_local(),
        _ => meta.src_addr,
    };

    let na = build_na(
        target,
        true,
        solicited,
        override_flag,
        local_eui64(our_addrs).unwrap_or(Eui64::ZERO),
        reply_earo,
        src_addr,
        dst_addr,
    );
    Ok(Some(na))
}

/// Best-effort stand-in for "our EUI-64" derived from any of our assigned
/// link-local addresses (all share the same interface identifier).
fn local_eui64(our_addrs: &[Addr]) -> Option<Eui64> {
    our_addrs
        .iter()
        .find(|a| a.is_link_local())
        .map(|a| a.eui64_from_iid())
}

#[allow(clippy::too_many_arguments)]
fn build_na(
    target: Addr,
    router: bool,
    solicited: bool,
    override_flag: bool,
    our_eui64: Eui64,
    earo: Option<Earo>,
    src_addr: Addr,
    dst_addr: Addr,
) -> OutboundIcmp6 {
    let mut bytes = vec![0u8; NA_FIXED_LEN];
    bytes[0] = ICMP_NEIGHBOR_ADVERTISEMENT;
    bytes[1] = 0;
    let mut flags = 0u8;
    if router {
        flags |= NA_FLAG_ROUTER;
    }
    if solicited {
        flags |= NA_FLAG_SOLICITED;
    }
    if override_flag {
        flags |= NA_FLAG_OVERRIDE;
    }
    bytes[4] = flags;
    bytes[8..24].copy_from_slice(&target.0);
    bytes.extend(encode_tllao(our_eui64));
    if let Some(e) = earo {
        bytes.extend(encode_earo(&e));
    }
    fill_checksum(&src_addr, &dst_addr, &mut bytes);

    let meta = PacketMeta {
        src_addr,
        dst_addr,
        hop_limit: 255,
        traffic_class: 0,
        icmp_type: ICMP_NEIGHBOR_ADVERTISEMENT,
        icmp_code: 0,
        direction: Direction::Down,
        ..Default::default()
    };
    OutboundIcmp6 { meta, bytes }
}

/// Build an outbound Neighbor Solicitation (spec §4.3.6).
///
/// `prompting_src_addr`, when assigned to us, is preferred as the NS
/// source per RFC 4861 §7.2.2; `dad` forces the unspecified source.
#[allow(clippy::too_many_arguments)]
pub fn build_ns(
    target: Addr,
    our_eui64: Eui64,
    earo: Option<Earo>,
    dad: bool,
    prompting_src_addr: Option<Addr>,
    our_link_local: Addr,
    our_addrs: &[Addr],
    unicast_dst: Option<Addr>,
) -> OutboundIcmp6 {
    let src_addr = if dad {
        Addr::UNSPECIFIED
    } else if let Some(p) = prompting_src_addr {
        if our_addrs.contains(&p) {
            p
        } else {
            our_link_local
        }
    } else {
        our_link_local
    };
    let dst_addr = unicast_dst.unwrap_or_else(|| target.solicited_node_multicast());

    let mut bytes = vec![0u8; NS_FIXED_LEN];
    bytes[0] = ICMP_NEIGHBOR_SOLICITATION;
    bytes[8..24].copy_from_slice(&target.0);
    if !dad {
        bytes.extend(encode_sllao(our_eui64));
    }
    if let Some(e) = earo {
        bytes.extend(encode_earo(&e));
    }
    fill_checksum(&src_addr, &dst_addr, &mut bytes);

    let meta = PacketMeta {
        src_addr,
        dst_addr,
        hop_limit: 255,
        icmp_type: ICMP_NEIGHBOR_SOLICITATION,
        icmp_code: 0,
        direction: Direction::Down,
        ..Default::default()
    };
    OutboundIcmp6 { meta, bytes }
}

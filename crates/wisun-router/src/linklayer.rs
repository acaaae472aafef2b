//! The link-layer boundary (spec §9 "interface trait instead of
//! function-pointer vtable"): a single `LinkLayer` implementation for
//! the Wi-SUN/EUI-64 case, not a trait object — no second variant exists
//! in this core.

use crate::rcp::{RcpBus, RcpIndication};
use std::collections::HashSet;
use wsn_addr::{Addr, Eui64};
use wsn_packet::PacketMeta;

/// The minimal 802.15.4 contract of spec §1: "deliver/accept an
/// 802.15.4 data frame with source EUI-64". Implemented once, over
/// whatever `RcpBus` the caller wired up.
pub trait Eui64Source {
    fn local_eui64(&self) -> Eui64;
}

/// One inbound frame turned into IPv6-level metadata plus payload,
/// ready for the ICMPv6/RPL engines.
pub struct Inbound {
    pub meta: PacketMeta,
    pub payload: Vec<u8>,
}

/// Bridges `RcpIndication::RxInd`/`TxCnf` to the IPv6 engines' view of
/// the world: recovers `src_addr` from the frame's source EUI-64 (the
/// core's addresses are always link-local-from-EUI-64 or
/// global-from-EUI-64, so no separate address-resolution protocol is
/// needed at this layer) and turns outbound `OutboundIcmp6`-shaped bytes
/// back into an RCP `data_tx` addressed by destination EUI-64.
pub struct LinkLayer<B: RcpBus> {
    bus: B,
    our_eui64: Eui64,
    next_handle: u8,
    /// EUI-64s blacklisted at the MAC after an ARO failure (spec
    /// §4.3.3): their frames are dropped before reaching the IPv6
    /// engines rather than merely logged.
    blacklisted: HashSet<Eui64>,
}

impl<B: RcpBus> LinkLayer<B> {
    pub fn new(bus: B, our_eui64: Eui64) -> LinkLayer<B> {
        LinkLayer {
            bus,
            our_eui64,
            next_handle: 0,
            blacklisted: HashSet::new(),
        }
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn blacklist(&mut self, eui64: Eui64) {
        self.blacklisted.insert(eui64);
    }

    pub fn is_blacklisted(&self, eui64: Eui64) -> bool {
        self.blacklisted.contains(&eui64)
    }

    /// Drain one RCP indication into an `Inbound` frame, if it is a data
    /// indication. `TxCnf`/`ResetInd` are handled by the caller directly
    /// (they carry no IPv6-level payload). Frames from a blacklisted
    /// EUI-64 are dropped silently and polling continues.
    pub fn poll_inbound(&mut self) -> Option<InboundOrEvent> {
        loop {
            match self.bus.poll_indication()? {
                RcpIndication::RxInd { src_eui64, payload } => {
                    if self.blacklisted.contains(&src_eui64) {
                        continue;
                    }
                    let src_addr = src_eui64.link_local();
                    let meta = PacketMeta {
                        src_addr,
                        ..Default::default()
                    };
                    return Some(InboundOrEvent::Frame(Inbound { meta, payload }));
                }
                RcpIndication::TxCnf { handle, success } => {
                    return Some(InboundOrEvent::TxCnf { handle, success });
                }
                RcpIndication::ResetInd => return Some(InboundOrEvent::Reset),
            }
        }
    }

    /// Turn an IPv6-addressed outbound message into a `data_tx` request.
    /// The destination EUI-64 is recovered from the destination
    /// address's interface identifier — multicast destinations are not
    /// representable as a single EUI-64 and are rejected by the caller
    /// before reaching here (spec §1 collapses multicast delivery to the
    /// out-of-scope MAC/LLC broadcast schedule).
    pub fn send_unicast(&mut self, dst_addr: Addr, payload: &[u8]) -> u8 {
        let dst_eui64 = dst_addr.eui64_from_iid();
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        self.bus.data_tx(dst_eui64, payload, handle);
        handle
    }
}

impl<B: RcpBus> Eui64Source for LinkLayer<B> {
    fn local_eui64(&self) -> Eui64 {
        self.our_eui64
    }
}

pub enum InboundOrEvent {
    Frame(Inbound),
    TxCnf { handle: u8, success: bool },
    Reset,
}

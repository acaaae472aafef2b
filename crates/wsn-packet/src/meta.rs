use wsn_addr::Addr;

/// Direction a packet buffer is flowing (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Received from the radio, heading toward ICMPv6/RPL/higher layers.
    Up,
    /// Originated locally or turned around, heading toward the RCP.
    Down,
}

/// Opaque handle into the neighbor cache's NCE arena (spec §9: "arena
/// holding NCEs indexed by a small integer handle"). Defined here, at the
/// packet-buffer layer, because `AckIntent` needs it and nothing above L1
/// may be named by L1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NceHandle(pub u32);

/// Opaque handle into the RPL engine's neighbor table (spec §9). Lives
/// alongside `NceHandle` so the NCE↔RN weak back-reference coupling (spec
/// §3) can be expressed on both sides without either crate depending on
/// the other's arena internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RnHandle(pub u32);

/// RFC 8505 §4.1 EARO status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AroStatus {
    Success = 0,
    Duplicate = 1,
    Moved = 3,
    Removed = 4,
    ValidationRequested = 5,
    DuplicateSource = 6,
}

impl AroStatus {
    pub fn from_u8(v: u8) -> Option<AroStatus> {
        match v {
            0 => Some(AroStatus::Success),
            1 => Some(AroStatus::Duplicate),
            3 => Some(AroStatus::Moved),
            4 => Some(AroStatus::Removed),
            5 => Some(AroStatus::ValidationRequested),
            6 => Some(AroStatus::DuplicateSource),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Replaces the C source's `ack_receive_cb` function pointer (spec §9,
/// "callback-driven asynchrony"): the scheduler's MAC-confirmation handler
/// matches on this instead of invoking a type-erased callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckIntent {
    #[default]
    None,
    UpdateNeighborReachable(NceHandle),
    RemoveNeighbor(NceHandle),
    NotifyAroResult(wsn_addr::Eui64, AroStatus),
}

/// Per-packet metadata carried alongside the octet buffer (spec §3).
#[derive(Debug, Clone)]
pub struct PacketMeta {
    pub src_addr: Addr,
    pub dst_addr: Addr,
    pub hop_limit: u8,
    pub traffic_class: u8,
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub ll_security_bypass: bool,
    pub ll_multicast_rx: bool,
    pub ll_broadcast_rx: bool,
    pub direction: Direction,
    pub ack_intent: AckIntent,
}

impl Default for PacketMeta {
    fn default() -> Self {
        PacketMeta {
            src_addr: Addr::UNSPECIFIED,
            dst_addr: Addr::UNSPECIFIED,
            hop_limit: 255,
            traffic_class: 0,
            icmp_type: 0,
            icmp_code: 0,
            ll_security_bypass: false,
            ll_multicast_rx: false,
            ll_broadcast_rx: false,
            direction: Direction::Down,
            ack_intent: AckIntent::None,
        }
    }
}

use crate::state::NeighborState;
use wsn_addr::{Addr, Eui64};
use wsn_common::time::MonoMs;
use wsn_packet::RnHandle;

/// A neighbor cache entry (spec §3).
///
/// Invariant upheld by `NeighborCache`: a non-zero `registration_lifetime`
/// implies `ll_addr.is_some()`.
#[derive(Debug, Clone)]
pub struct Nce {
    pub addr: Addr,
    pub ll_addr: Option<Eui64>,
    pub state: NeighborState,
    /// Valid while `state == Reachable`: when it lapses into `Stale`.
    pub reachable_until: MonoMs,
    /// Generic deadline used while `state` is `Delay` or `Probe` to drive
    /// the next transition (spec §4.2 `tick`).
    pub state_deadline: MonoMs,
    pub registration_lifetime: u32,
    pub registration_expires_at: Option<MonoMs>,
    /// Set when we registered this address with our parent (sent the
    /// ARO); clear when we received an ARO from a downstream node
    /// registering through us.
    pub registration_owner: bool,
    pub rpl_link: Option<RnHandle>,
    pub is_router: bool,
}

impl Nce {
    pub fn new(addr: Addr) -> Nce {
        Nce {
            addr,
            ll_addr: None,
            state: NeighborState::Incomplete,
            reachable_until: 0,
            state_deadline: 0,
            registration_lifetime: 0,
            registration_expires_at: None,
            registration_owner: false,
            rpl_link: None,
            is_router: false,
        }
    }
}

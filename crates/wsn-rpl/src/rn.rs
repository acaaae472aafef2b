use wsn_addr::{Addr, Eui64};
use wsn_common::time::MonoMs;
use wsn_packet::NceHandle;

pub const INFINITE_RANK: u16 = 0xffff;

/// A candidate parent / RPL neighbor (spec §3 "RN").
#[derive(Debug, Clone)]
pub struct Rn {
    pub eui64: Eui64,
    pub link_local: Addr,
    pub rank: u16,
    pub dodag_id: Addr,
    pub instance_id: u8,
    pub version: u8,
    pub grounded: bool,
    pub path_cost: u16,
    pub is_preferred_parent: bool,
    /// Weak back-reference to this neighbor's NCE (spec §3, §9).
    pub nce: Option<NceHandle>,
    /// MAC-level success ratio in [0.0, 1.0], fed by a future link-quality
    /// source; defaults to 1.0 (best case) until observed otherwise.
    pub success_ratio: f64,
    pub last_dio_at: MonoMs,
    pub dao_retry_count: u32,
    pub dao_backoff_ms: u64,
}

impl Rn {
    pub fn new(eui64: Eui64, link_local: Addr, now_ms: MonoMs) -> Rn {
        Rn {
            eui64,
            link_local,
            rank: INFINITE_RANK,
            dodag_id: Addr::UNSPECIFIED,
            instance_id: 0,
            version: 0,
            grounded: false,
            path_cost: u16::MAX,
            is_preferred_parent: false,
            nce: None,
            success_ratio: 1.0,
            last_dio_at: now_ms,
            dao_retry_count: 0,
            dao_backoff_ms: 1_000,
        }
    }
}

/// OF0 (RFC 6552) step-of-rank-derived rank increase (spec §4.4.1):
/// `rank_factor * step_of_rank + stretch`, clamped to at least
/// `min_hop_rank_increase`. `step_of_rank` is approximated as `3*ETX - 2`.
pub fn rank_increase(success_ratio: f64, min_hop_rank_increase: u16) -> u16 {
    const RANK_FACTOR: f64 = 1.0;
    const STRETCH: f64 = 0.0;

    let etx = if success_ratio <= 0.0 {
        4.0
    } else {
        (1.0 / success_ratio).clamp(1.0, 4.0)
    };
    let step_of_rank = (3.0 * etx - 2.0).max(1.0);
    let computed = RANK_FACTOR * step_of_rank + STRETCH;
    (computed.round() as u16).max(min_hop_rank_increase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_link_yields_min_hop_rank_increase() {
        assert_eq!(rank_increase(1.0, 128), 128);
    }

    #[test]
    fn lossy_link_can_exceed_min_hop_rank_increase() {
        // ETX = 1/0.2 = 5, clamped to 4: step_of_rank = 10, rank_factor*10=10,
        // still below min_hop_rank_increase=5 so clamps up to 5.
        assert!(rank_increase(0.2, 5) >= 5);
    }
}

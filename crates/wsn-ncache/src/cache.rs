use crate::nce::Nce;
use crate::state::NeighborState;
use crate::token_bucket::TokenBucket;
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use wsn_addr::{Addr, Eui64};
use wsn_common::time::MonoMs;
use wsn_packet::NceHandle;

#[derive(Error, Debug)]
pub enum NcacheError {
    #[error("neighbor table full")]
    TableFull,
}

const DELAY_TO_PROBE_MS: u64 = 5_000;
const REACHABLE_TIME_REROLL_INTERVAL_MS: u64 = 600_000;

struct Slot {
    nce: Nce,
}

/// The neighbor cache (spec §3, §4.2): an arena of `Nce`s keyed by both a
/// small integer handle (for O(1) lookups and for the NCE↔RN weak
/// back-reference of spec §9) and, via an index map, by IPv6 address.
pub struct NeighborCache {
    slots: Vec<Option<Slot>>,
    by_addr: HashMap<Addr, NceHandle>,
    order: VecDeque<NceHandle>,
    capacity: usize,

    pub base_reachable_time_ms: u64,
    pub reachable_time_ms: u64,
    last_reroll_ms: MonoMs,

    pub retrans_timer_ms: u64,
    pub max_multicast_solicit: u32,

    pub token_bucket: TokenBucket,
}

impl NeighborCache {
    pub fn new(
        capacity: usize,
        base_reachable_time_ms: u64,
        retrans_timer_ms: u64,
        max_multicast_solicit: u32,
        now_ms: MonoMs,
    ) -> NeighborCache {
        NeighborCache {
            slots: Vec::new(),
            by_addr: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            base_reachable_time_ms,
            reachable_time_ms: base_reachable_time_ms,
            last_reroll_ms: now_ms,
            retrans_timer_ms,
            max_multicast_solicit,
            token_bucket: TokenBucket::new(10, 10, now_ms),
        }
    }

    pub fn lookup(&self, addr: &Addr) -> Option<NceHandle> {
        self.by_addr.get(addr).copied()
    }

    pub fn get(&self, handle: NceHandle) -> Option<&Nce> {
        self.slots.get(handle.0 as usize)?.as_ref().map(|s| &s.nce)
    }

    pub fn get_mut(&mut self, handle: NceHandle) -> Option<&mut Nce> {
        self.slots
            .get_mut(handle.0 as usize)?
            .as_mut()
            .map(|s| &mut s.nce)
    }

    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_addr.is_empty()
    }

    fn insert_slot(&mut self, nce: Nce) -> NceHandle {
        let addr = nce.addr;
        let handle = if let Some(free) = self.slots.iter().position(|s| s.is_none()) {
            self.slots[free] = Some(Slot { nce });
            NceHandle(free as u32)
        } else {
            self.slots.push(Some(Slot { nce }));
            NceHandle((self.slots.len() - 1) as u32)
        };
        self.by_addr.insert(addr, handle);
        self.order.push_back(handle);
        handle
    }

    /// Evict the oldest STALE/UNREACHABLE entry to make room (spec §7
    /// `NeighborTableFull` recovery: "drop oldest STALE/UNREACHABLE
    /// entry, retry once"). Returns whether an entry was evicted.
    fn evict_oldest_stale_or_unreachable(&mut self) -> bool {
        let victim = self.order.iter().copied().find(|&h| {
            matches!(
                self.get(h).map(|n| n.state),
                Some(NeighborState::Stale) | Some(NeighborState::Unreachable)
            )
        });
        match victim {
            Some(h) => {
                self.remove(h);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, handle: NceHandle) {
        if let Some(slot) = self.slots.get_mut(handle.0 as usize) {
            if let Some(Slot { nce }) = slot.take() {
                self.by_addr.remove(&nce.addr);
            }
        }
        self.order.retain(|&h| h != handle);
    }

    /// Insert a fresh INCOMPLETE entry for `addr`, making room per spec §7
    /// if the table is full. Returns `NcacheError::TableFull` only if
    /// eviction still couldn't free a slot (the "retry once" of spec §7
    /// has already been applied internally).
    pub fn insert_incomplete(&mut self, addr: Addr) -> Result<NceHandle, NcacheError> {
        if self.len() >= self.capacity && !self.evict_oldest_stale_or_unreachable() {
            return Err(NcacheError::TableFull);
        }
        Ok(self.insert_slot(Nce::new(addr)))
    }

    /// RFC 4861 §7.2.3: unsolicited update from a received SLLAO/EARO.
    /// Creates the entry (state STALE) if missing; if present and the
    /// link-layer address differs, marks it STALE.
    pub fn update_unsolicited(
        &mut self,
        addr: Addr,
        ll_addr: Eui64,
    ) -> Result<NceHandle, NcacheError> {
        if let Some(handle) = self.lookup(&addr) {
            let nce = self.get_mut(handle).expect("handle from lookup is valid");
            if nce.ll_addr != Some(ll_addr) {
                nce.ll_addr = Some(ll_addr);
                nce.state = NeighborState::Stale;
            }
            return Ok(handle);
        }
        if self.len() >= self.capacity && !self.evict_oldest_stale_or_unreachable() {
            return Err(NcacheError::TableFull);
        }
        let mut nce = Nce::new(addr);
        nce.ll_addr = Some(ll_addr);
        nce.state = NeighborState::Stale;
        Ok(self.insert_slot(nce))
    }

    /// RFC 4861 §7.2.5: update driven by a received Neighbor
    /// Advertisement. `solicited`/`override_flag` are the NA's S/O bits.
    pub fn update_from_na(
        &mut self,
        handle: NceHandle,
        solicited: bool,
        override_flag: bool,
        ll_addr: Option<Eui64>,
        now_ms: MonoMs,
    ) {
        let reachable_time_ms = self.reachable_time_ms;
        let Some(nce) = self.get_mut(handle) else {
            return;
        };

        if nce.state == NeighborState::Incomplete {
            match ll_addr {
                Some(ll) if solicited => {
                    nce.ll_addr = Some(ll);
                    nce.state = NeighborState::Reachable;
                    nce.reachable_until = now_ms + reachable_time_ms;
                }
                Some(ll) => {
                    nce.ll_addr = Some(ll);
                    nce.state = NeighborState::Stale;
                }
                None => {
                    // No usable link-layer info yet; stays INCOMPLETE.
                }
            }
            return;
        }

        let ll_changed = ll_addr.is_some() && ll_addr != nce.ll_addr;
        if ll_changed && !override_flag {
            if !solicited && nce.state == NeighborState::Reachable {
                nce.state = NeighborState::Stale;
            }
            return;
        }
        if let Some(ll) = ll_addr {
            if override_flag {
                nce.ll_addr = Some(ll);
            }
        }
        if solicited {
            nce.state = NeighborState::Reachable;
            nce.reachable_until = now_ms + reachable_time_ms;
        } else if ll_changed && override_flag {
            nce.state = NeighborState::Stale;
        }
    }

    /// Explicitly begin probing a neighbor (e.g. RPL NUD suspects the
    /// preferred parent is unreachable): REACHABLE/STALE → DELAY.
    pub fn begin_probe(&mut self, handle: NceHandle, now_ms: MonoMs) {
        if let Some(nce) = self.get_mut(handle) {
            nce.state = NeighborState::Delay;
            nce.state_deadline = now_ms + DELAY_TO_PROBE_MS;
        }
    }

    /// Register `addr` with lifetime `lifetime_secs` (0 clears the
    /// registration). Per the NCE invariant (spec §3), `ll_addr` must be
    /// known whenever the resulting lifetime is non-zero.
    pub fn set_registration(
        &mut self,
        handle: NceHandle,
        lifetime_secs: u32,
        owner: bool,
        now_ms: MonoMs,
    ) {
        if let Some(nce) = self.get_mut(handle) {
            if lifetime_secs == 0 {
                nce.registration_lifetime = 0;
                nce.registration_expires_at = None;
            } else if nce.ll_addr.is_some() {
                nce.registration_lifetime = lifetime_secs;
                nce.registration_expires_at = Some(now_ms + lifetime_secs as u64 * 1000);
                nce.registration_owner = owner;
            }
        }
    }

    /// Drive per-entry expiry and the periodic reachable-time reroll
    /// (spec §4.2): REACHABLE → STALE on timeout; DELAY → PROBE after
    /// 5s; PROBE expires (→ UNREACHABLE) after
    /// `max_multicast_solicit * retrans_timer` ms.
    pub fn tick(&mut self, now_ms: MonoMs) {
        let max_multicast_solicit = self.max_multicast_solicit;
        let retrans_timer_ms = self.retrans_timer_ms;

        for slot in self.slots.iter_mut().flatten() {
            let nce = &mut slot.nce;
            match nce.state {
                NeighborState::Reachable if now_ms >= nce.reachable_until => {
                    nce.state = NeighborState::Stale;
                }
                NeighborState::Delay if now_ms >= nce.state_deadline => {
                    nce.state = NeighborState::Probe;
                    nce.state_deadline =
                        now_ms + max_multicast_solicit as u64 * retrans_timer_ms;
                }
                NeighborState::Probe if now_ms >= nce.state_deadline => {
                    nce.state = NeighborState::Unreachable;
                }
                _ => {}
            }

            if let Some(expiry) = nce.registration_expires_at {
                if now_ms >= expiry {
                    nce.registration_lifetime = 0;
                    nce.registration_expires_at = None;
                }
            }
        }

        if now_ms.saturating_sub(self.last_reroll_ms) >= REACHABLE_TIME_REROLL_INTERVAL_MS {
            self.reroll_reachable_time(now_ms);
        }
    }

    /// Re-roll `reachable_time_ms` uniformly in [0.5×base, 1.5×base]
    /// (spec §4.2, RFC 4861 §6.3.4) — called every 600s, or immediately
    /// when `base_reachable_time_ms` changes.
    pub fn reroll_reachable_time(&mut self, now_ms: MonoMs) {
        let lo = self.base_reachable_time_ms / 2;
        let hi = self.base_reachable_time_ms + self.base_reachable_time_ms / 2;
        self.reachable_time_ms = rand::rng().random_range(lo..=hi);
        self.last_reroll_ms = now_ms;
    }

    pub fn set_base_reachable_time_ms(&mut self, base_ms: u64, now_ms: MonoMs) {
        self.base_reachable_time_ms = base_ms;
        self.reroll_reachable_time(now_ms);
    }
}

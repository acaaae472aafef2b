use crate::error::RplError;
use crate::options::ConfigOption;
use crate::rn::{rank_increase, Rn, INFINITE_RANK};
use std::collections::{HashMap, HashSet};
use wsn_addr::{Addr, Eui64};
use wsn_common::time::MonoMs;
use wsn_packet::RnHandle;

/// Everything a validated DIO carries that the table needs (spec §4.4.1).
#[derive(Debug, Clone)]
pub struct DioInfo {
    pub instance_id: u8,
    pub version: u8,
    pub rank: u16,
    pub grounded: bool,
    pub dodag_id: Addr,
    pub config: Option<ConfigOption>,
}

/// Emitted when the preferred parent changes (spec §4.4.2
/// `pref_parent_change` callback).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferredParentChange {
    pub handle: RnHandle,
    pub eui64: Eui64,
    pub link_local: Addr,
}

/// The outcome of a parent-selection pass, distinguishing "nothing
/// changed" from "the preferred parent was cleared" — both of which a
/// bare `Option<PreferredParentChange>` would otherwise conflate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentSelection {
    Unchanged,
    Installed(PreferredParentChange),
    Cleared,
}

struct Slot {
    rn: Rn,
}

/// The RPL neighbor table (spec §3 "RN table", §4.4). Owns the arena of
/// `Rn`s and the DODAG-wide state (current version, our own rank, the
/// active Configuration option) that parent selection depends on.
pub struct RplTable {
    slots: Vec<Option<Slot>>,
    by_eui64: HashMap<Eui64, RnHandle>,
    capacity: usize,

    pub current_dodag_id: Addr,
    pub current_instance_id: u8,
    pub current_version: Option<u8>,
    /// Our own rank once a preferred parent is installed; `None` before
    /// first attach (spec §4.4.1 step 4's "current rank" comparison is
    /// skipped while this is `None`).
    pub self_rank: Option<u16>,
    pub active_config: ConfigOption,
    pub preferred_parent: Option<RnHandle>,

    /// EUI-64s of neighbors who have named us as their DAO parent
    /// (Transit Information). Used for the spec §4.4.1 loop check: a
    /// candidate that would form a DODAG loop is one that is, from our
    /// own local vantage, already downstream of us.
    children: HashSet<Eui64>,
}

impl RplTable {
    pub fn new(capacity: usize, default_config: ConfigOption) -> RplTable {
        RplTable {
            slots: Vec::new(),
            by_eui64: HashMap::new(),
            capacity,
            current_dodag_id: Addr::UNSPECIFIED,
            current_instance_id: 0,
            current_version: None,
            self_rank: None,
            active_config: default_config,
            preferred_parent: None,
            children: HashSet::new(),
        }
    }

    pub fn get(&self, handle: RnHandle) -> Option<&Rn> {
        self.slots.get(handle.0 as usize)?.as_ref().map(|s| &s.rn)
    }

    pub fn get_mut(&mut self, handle: RnHandle) -> Option<&mut Rn> {
        self.slots
            .get_mut(handle.0 as usize)?
            .as_mut()
            .map(|s| &mut s.rn)
    }

    pub fn lookup(&self, eui64: Eui64) -> Option<RnHandle> {
        self.by_eui64.get(&eui64).copied()
    }

    pub fn len(&self) -> usize {
        self.by_eui64.len()
    }

    pub fn record_child_dao(&mut self, child_eui64: Eui64) {
        self.children.insert(child_eui64);
    }

    fn insert_slot(&mut self, rn: Rn) -> RnHandle {
        let eui64 = rn.eui64;
        let handle = if let Some(free) = self.slots.iter().position(|s| s.is_none()) {
            self.slots[free] = Some(Slot { rn });
            RnHandle(free as u32)
        } else {
            self.slots.push(Some(Slot { rn }));
            RnHandle((self.slots.len() - 1) as u32)
        };
        self.by_eui64.insert(eui64, handle);
        handle
    }

    fn remove(&mut self, handle: RnHandle) {
        if let Some(slot) = self.slots.get_mut(handle.0 as usize) {
            if let Some(Slot { rn }) = slot.take() {
                self.by_eui64.remove(&rn.eui64);
            }
        }
        if self.preferred_parent == Some(handle) {
            self.preferred_parent = None;
        }
    }

    /// Evict the worst-path-cost non-preferred candidate (supplementary
    /// feature: spec §7's `NeighborTableFull` recovery generalized from
    /// age-based to cost-based eviction for the RPL table).
    fn evict_worst_candidate(&mut self) -> bool {
        let victim = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                let rn = &s.as_ref()?.rn;
                if rn.is_preferred_parent {
                    None
                } else {
                    Some((RnHandle(i as u32), rn.path_cost))
                }
            })
            .max_by_key(|&(_, cost)| cost);
        match victim {
            Some((handle, _)) => {
                self.remove(handle);
                true
            }
            None => false,
        }
    }

    fn get_or_create(&mut self, eui64: Eui64, link_local: Addr, now_ms: MonoMs) -> Result<RnHandle, RplError> {
        if let Some(h) = self.lookup(eui64) {
            return Ok(h);
        }
        if self.len() >= self.capacity && !self.evict_worst_candidate() {
            return Err(RplError::TableFull);
        }
        Ok(self.insert_slot(Rn::new(eui64, link_local, now_ms)))
    }

    fn is_admissible(&self, rn: &Rn) -> bool {
        if rn.rank == INFINITE_RANK {
            return false;
        }
        if let Some(cur_version) = self.current_version {
            if rn.version != cur_version {
                return false;
            }
        }
        if let Some(self_rank) = self.self_rank {
            if rn.path_cost as u32 > self_rank as u32 + self.active_config.max_rank_increase as u32
            {
                return false;
            }
        }
        if self.children.contains(&rn.eui64) {
            return false;
        }
        true
    }

    /// Process a validated inbound DIO (spec §4.4.1).
    pub fn process_dio(
        &mut self,
        link_local_src: Addr,
        dio: &DioInfo,
        now_ms: MonoMs,
    ) -> Result<ParentSelection, RplError> {
        let eui64 = link_local_src.eui64_from_iid();
        let handle = self.get_or_create(eui64, link_local_src, now_ms)?;

        if let Some(cfg) = &dio.config {
            self.active_config = *cfg;
        }
        let min_hop_rank_increase = self.active_config.min_hop_rank_increase;

        let rn = self.get_mut(handle).expect("just inserted or found");
        rn.dodag_id = dio.dodag_id;
        rn.instance_id = dio.instance_id;
        rn.version = dio.version;
        rn.grounded = dio.grounded;
        rn.rank = dio.rank;
        rn.last_dio_at = now_ms;
        rn.path_cost = if dio.rank == INFINITE_RANK {
            u16::MAX
        } else {
            dio.rank.saturating_add(rank_increase(rn.success_ratio, min_hop_rank_increase))
        };

        if self.current_version.is_none() {
            self.current_version = Some(dio.version);
            self.current_dodag_id = dio.dodag_id;
            self.current_instance_id = dio.instance_id;
        }

        Ok(self.select_preferred_parent())
    }

    /// Re-run parent selection (spec §4.4.2): among admissible
    /// candidates, minimize `path_cost`; break ties by preferring the
    /// current preferred parent, then by lowest EUI-64.
    pub fn select_preferred_parent(&mut self) -> ParentSelection {
        let previous = self.preferred_parent;

        let mut best: Option<RnHandle> = None;
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            if !self.is_admissible(&slot.rn) {
                continue;
            }
            let handle = RnHandle(i as u32);
            best = Some(match best {
                None => handle,
                Some(cur) => {
                    let cur_rn = &self.slots[cur.0 as usize].as_ref().unwrap().rn;
                    let cand = &slot.rn;
                    if cand.path_cost < cur_rn.path_cost {
                        handle
                    } else if cand.path_cost > cur_rn.path_cost {
                        cur
                    } else if Some(cur) == previous {
                        cur
                    } else if Some(handle) == previous {
                        handle
                    } else if cand.eui64 < cur_rn.eui64 {
                        handle
                    } else {
                        cur
                    }
                }
            });
        }

        if best == previous {
            return ParentSelection::Unchanged;
        }

        if let Some(prev) = previous {
            if let Some(rn) = self.get_mut(prev) {
                rn.is_preferred_parent = false;
            }
        }
        self.preferred_parent = best;
        match best {
            None => {
                self.self_rank = None;
                ParentSelection::Cleared
            }
            Some(handle) => {
                let rn = self.get_mut(handle).expect("selected handle is valid");
                rn.is_preferred_parent = true;
                let change = PreferredParentChange {
                    handle,
                    eui64: rn.eui64,
                    link_local: rn.link_local,
                };
                self.self_rank = Some(rn.path_cost);
                ParentSelection::Installed(change)
            }
        }
    }

    /// Clear the preferred parent unconditionally (spec §4.4.5 parent
    /// loss): used when NUD declares it UNREACHABLE, DAO retries are
    /// exhausted, or its silence window elapses.
    pub fn demote_preferred_parent(&mut self) {
        if let Some(handle) = self.preferred_parent.take() {
            if let Some(rn) = self.get_mut(handle) {
                rn.is_preferred_parent = false;
                rn.rank = INFINITE_RANK;
                rn.path_cost = u16::MAX;
            }
        }
        self.self_rank = None;
        self.current_version = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> ConfigOption {
        ConfigOption {
            dio_interval_doublings: 2,
            dio_interval_min: 15,
            dio_redundancy: 0,
            max_rank_increase: u16::MAX,
            min_hop_rank_increase: 128,
            default_lifetime: 60,
            lifetime_unit: 60,
        }
    }

    // S2 — DIO installs a preferred parent.
    #[test]
    fn dio_installs_preferred_parent() {
        let mut table = RplTable::new(32, default_config());
        let src: Addr = "fe80::a".parse().unwrap();
        let dio = DioInfo {
            instance_id: 0x1e,
            version: 1,
            rank: 256,
            grounded: true,
            dodag_id: "2001:db8::1".parse().unwrap(),
            config: Some(ConfigOption {
                dio_interval_doublings: 2,
                dio_interval_min: 15,
                dio_redundancy: 0,
                max_rank_increase: u16::MAX,
                min_hop_rank_increase: 128,
                default_lifetime: 60,
                lifetime_unit: 60,
            }),
        };
        let change = table.process_dio(src, &dio, 0).unwrap();
        assert!(matches!(change, ParentSelection::Installed(_)));
        assert_eq!(table.len(), 1);

        let handle = table.lookup(src.eui64_from_iid()).unwrap();
        assert!(table.get(handle).unwrap().is_preferred_parent);
        let rank = table.self_rank.unwrap();
        assert!(rank >= 384 && rank <= 768, "rank {rank} out of expected range");
    }

    #[test]
    fn infinite_rank_is_never_admissible() {
        let mut table = RplTable::new(32, default_config());
        let src: Addr = "fe80::b".parse().unwrap();
        let dio = DioInfo {
            instance_id: 0,
            version: 1,
            rank: INFINITE_RANK,
            grounded: false,
            dodag_id: "2001:db8::1".parse().unwrap(),
            config: None,
        };
        let change = table.process_dio(src, &dio, 0).unwrap();
        assert_eq!(change, ParentSelection::Unchanged);
        assert!(table.preferred_parent.is_none());
    }

    #[test]
    fn lower_path_cost_replaces_preferred_parent() {
        let mut table = RplTable::new(32, default_config());
        let a: Addr = "fe80::a".parse().unwrap();
        let b: Addr = "fe80::b".parse().unwrap();
        let base_dio = |rank: u16, dodag: &str| DioInfo {
            instance_id: 0,
            version: 1,
            rank,
            grounded: true,
            dodag_id: dodag.parse().unwrap(),
            config: None,
        };
        table.process_dio(a, &base_dio(512, "2001:db8::1"), 0).unwrap();
        let change = table.process_dio(b, &base_dio(128, "2001:db8::1"), 0).unwrap();
        match change {
            ParentSelection::Installed(c) => assert_eq!(c.eui64, b.eui64_from_iid()),
            other => panic!("expected Installed, got {other:?}"),
        }
    }

    #[test]
    fn demote_clears_preferred_parent_and_rank() {
        let mut table = RplTable::new(32, default_config());
        let src: Addr = "fe80::a".parse().unwrap();
        let dio = DioInfo {
            instance_id: 0,
            version: 1,
            rank: 256,
            grounded: true,
            dodag_id: "2001:db8::1".parse().unwrap(),
            config: None,
        };
        table.process_dio(src, &dio, 0).unwrap();
        assert!(table.preferred_parent.is_some());
        table.demote_preferred_parent();
        assert!(table.preferred_parent.is_none());
        assert!(table.self_rank.is_none());
    }
}

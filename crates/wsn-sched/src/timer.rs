use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Opaque handle to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct HeapEntry {
    deadline: u64,
    seq: u64,
    id: TimerId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

/// Monotonic min-heap of `(deadline, group, entry)` (spec §4.5).
///
/// Timers are armed, rearmed, or cancelled idempotently: rearming replaces
/// the deadline of an already-armed timer rather than creating a second
/// one. This uses the classic lazy-deletion technique for a binary heap
/// without decrease-key: `live` holds each timer's *current* deadline and
/// group; a popped heap entry is discarded if it no longer matches `live`
/// (it is a stale entry left behind by an earlier rearm/cancel).
pub struct TimerQueue<G> {
    heap: BinaryHeap<Reverse<HeapEntry>>,
    live: HashMap<u64, (u64, G)>,
    next_id: u64,
    next_seq: u64,
}

impl<G: Copy> TimerQueue<G> {
    pub fn new() -> Self {
        TimerQueue {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            next_id: 0,
            next_seq: 0,
        }
    }

    fn fresh_id(&mut self) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        TimerId(id)
    }

    fn fresh_seq(&mut self) -> u64 {
        let s = self.next_seq;
        self.next_seq += 1;
        s
    }

    /// Arm a new timer at `deadline_ms`, tagged with `group` (an
    /// application-defined discriminant, e.g. which subsystem owns it).
    pub fn arm(&mut self, deadline_ms: u64, group: G) -> TimerId {
        let id = self.fresh_id();
        let seq = self.fresh_seq();
        self.live.insert(id.0, (deadline_ms, group));
        self.heap.push(Reverse(HeapEntry {
            deadline: deadline_ms,
            seq,
            id,
        }));
        id
    }

    /// Replace the deadline of an active timer. No-op if the timer has
    /// already fired or been cancelled (idempotent per spec §4.5) — in
    /// that case the id is simply re-armed, matching "arming" semantics.
    pub fn rearm(&mut self, id: TimerId, new_deadline_ms: u64) {
        let group = self.live.get(&id.0).map(|(_, g)| *g);
        let Some(group) = group else { return };
        let seq = self.fresh_seq();
        self.live.insert(id.0, (new_deadline_ms, group));
        self.heap.push(Reverse(HeapEntry {
            deadline: new_deadline_ms,
            seq,
            id,
        }));
    }

    /// Cancel a timer. Idempotent: cancelling an unknown/already-fired id
    /// is a no-op.
    pub fn cancel(&mut self, id: TimerId) {
        self.live.remove(&id.0);
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.live.contains_key(&id.0)
    }

    /// The earliest deadline among active timers, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.heap
            .iter()
            .filter(|Reverse(e)| self.live.get(&e.id.0).is_some_and(|(d, _)| *d == e.deadline))
            .map(|Reverse(e)| e.deadline)
            .next()
    }

    /// Pop every timer whose deadline is `<= now_ms`, in deadline order
    /// (spec §4.5: "fire every expired timer in deadline order"), removing
    /// them from the live set. Ties broken by arm/rearm order.
    pub fn pop_expired(&mut self, now_ms: u64) -> Vec<(TimerId, G)> {
        let mut fired = Vec::new();
        while let Some(Reverse(top)) = self.heap.peek() {
            if top.deadline > now_ms {
                break;
            }
            let Reverse(entry) = self.heap.pop().unwrap();
            match self.live.get(&entry.id.0) {
                Some(&(deadline, group)) if deadline == entry.deadline => {
                    self.live.remove(&entry.id.0);
                    fired.push((entry.id, group));
                }
                _ => {
                    // Stale entry from an earlier rearm/cancel: skip.
                }
            }
        }
        fired
    }
}

impl<G: Copy> Default for TimerQueue<G> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Group {
        A,
        B,
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut q = TimerQueue::new();
        let t3 = q.arm(300, Group::A);
        let t1 = q.arm(100, Group::B);
        let t2 = q.arm(200, Group::A);

        assert_eq!(q.next_deadline(), Some(100));
        let fired = q.pop_expired(250);
        assert_eq!(fired, vec![(t1, Group::B), (t2, Group::A)]);
        assert!(q.is_active(t3));
    }

    #[test]
    fn rearm_replaces_deadline() {
        let mut q = TimerQueue::new();
        let t = q.arm(100, Group::A);
        q.rearm(t, 500);
        assert_eq!(q.pop_expired(100), vec![]);
        assert_eq!(q.pop_expired(500), vec![(t, Group::A)]);
    }

    #[test]
    fn cancel_is_idempotent_and_suppresses_firing() {
        let mut q = TimerQueue::new();
        let t = q.arm(100, Group::A);
        q.cancel(t);
        q.cancel(t); // no-op, doesn't panic
        assert_eq!(q.pop_expired(1000), vec![]);
    }

    #[test]
    fn rearm_unknown_timer_is_noop() {
        let mut q: TimerQueue<Group> = TimerQueue::new();
        let ghost = q.arm(0, Group::A);
        q.cancel(ghost);
        q.rearm(ghost, 100); // unknown now; must not resurrect it
        assert_eq!(q.pop_expired(1000), vec![]);
    }
}

use crate::timer::{TimerId, TimerQueue};
use mio::{Events, Poll, Token};
use std::collections::HashMap;
use std::time::Duration;

/// Fixed dispatch priority for ready file descriptors (spec §4.5):
/// RCP > timer > TUN > RPL > DHCP > mgmt. Lower value = serviced first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IoGroup {
    Rcp,
    TimerFd,
    Tun,
    Rpl,
    Dhcp,
    Mgmt,
}

/// One dispatch step's findings: expired timers (already fired, in
/// deadline order) and ready I/O sources (sorted by `IoGroup` priority).
/// Per spec §4.5/§5, callers must act on `expired_timers` in full before
/// touching `ready_io` — this type keeps that ordering explicit rather
/// than relying on caller discipline.
pub struct DispatchStep<G> {
    pub expired_timers: Vec<(TimerId, G)>,
    pub ready_io: Vec<(Token, IoGroup)>,
}

/// The L5 event scheduler: one monotonic timer heap plus `mio`-driven
/// readiness polling, single dispatch loop, single thread (spec §4.5,
/// §5). Not `Send`/`Sync` by construction — `Poll` itself already isn't
/// safely shared across an event loop boundary, which makes the
/// single-thread assumption of spec §5 a structural fact rather than a
/// convention enforced by review.
pub struct Scheduler<G> {
    poll: Poll,
    events: Events,
    timers: TimerQueue<G>,
    io_groups: HashMap<Token, IoGroup>,
}

impl<G: Copy> Scheduler<G> {
    pub fn new() -> std::io::Result<Self> {
        Ok(Scheduler {
            poll: Poll::new()?,
            events: Events::with_capacity(64),
            timers: TimerQueue::new(),
            io_groups: HashMap::new(),
        })
    }

    pub fn timers(&mut self) -> &mut TimerQueue<G> {
        &mut self.timers
    }

    /// Register an I/O source (RCP bus, TUN, DHCP socket, management
    /// bus, …) under a priority group. The source itself is registered
    /// with `mio::Registry` by the caller before or after this call; this
    /// just remembers which priority group a `Token` belongs to.
    pub fn register_io(&mut self, token: Token, group: IoGroup) {
        self.io_groups.insert(token, group);
    }

    pub fn deregister_io(&mut self, token: Token) {
        self.io_groups.remove(&token);
    }

    pub fn registry(&self) -> &mio::Registry {
        self.poll.registry()
    }

    /// One dispatch step (spec §4.5):
    /// 1. sleep = min(earliest deadline − now, 0 if any fd already ready)
    /// 2. block on a multiplexed wait
    /// 3. fire every expired timer in deadline order, then return ready
    ///    fds sorted into the fixed priority order; the caller services
    ///    them.
    pub fn dispatch_once(&mut self, now_ms: u64) -> std::io::Result<DispatchStep<G>> {
        let timeout = match self.timers.next_deadline() {
            Some(deadline) if deadline > now_ms => Some(Duration::from_millis(deadline - now_ms)),
            Some(_) => Some(Duration::ZERO),
            None => None,
        };

        self.poll.poll(&mut self.events, timeout)?;

        let expired_timers = self.timers.pop_expired(now_ms);

        let mut ready_io: Vec<(Token, IoGroup)> = self
            .events
            .iter()
            .filter_map(|e| {
                let token = e.token();
                self.io_groups.get(&token).map(|g| (token, *g))
            })
            .collect();
        ready_io.sort_by_key(|(_, g)| *g);

        Ok(DispatchStep {
            expired_timers,
            ready_io,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mio::Waker;
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Group {
        Timer,
    }

    #[test]
    fn timer_only_dispatch_fires_on_deadline() {
        let mut sched: Scheduler<Group> = Scheduler::new().unwrap();
        let id = sched.timers().arm(0, Group::Timer);
        let step = sched.dispatch_once(0).unwrap();
        assert_eq!(step.expired_timers, vec![(id, Group::Timer)]);
        assert!(step.ready_io.is_empty());
    }

    #[test]
    fn io_readiness_is_sorted_by_priority() {
        let mut sched: Scheduler<Group> = Scheduler::new().unwrap();
        let low_token = Token(1);
        let high_token = Token(2);
        let waker_low = Waker::new(sched.registry(), low_token).unwrap();
        let waker_high = Waker::new(sched.registry(), high_token).unwrap();
        sched.register_io(low_token, IoGroup::Mgmt);
        sched.register_io(high_token, IoGroup::Rcp);

        waker_low.wake().unwrap();
        waker_high.wake().unwrap();

        let step = sched.dispatch_once(0).unwrap();
        let groups: Vec<IoGroup> = step.ready_io.iter().map(|(_, g)| *g).collect();
        assert_eq!(groups, vec![IoGroup::Rcp, IoGroup::Mgmt]);
        drop(waker_low);
        drop(waker_high);
    }
}

use crate::message::build_dao;
use crate::options::{encode_target, encode_transit};
use wsn_addr::Addr;
use wsn_common::time::MonoMs;

const MAX_DAO_RETRIES: u32 = 8;
const MAX_BACKOFF_MS: u64 = 60_000;

/// A prefix we advertise reachability for via DAO Target options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedPrefix {
    pub prefix_length: u8,
    pub prefix: Addr,
}

/// Tracks one outstanding DAO and its retransmission state (spec
/// §4.4.3): exponential backoff 1s, 2s, 4s, ... capped at 60s, abandoned
/// after 8 tries.
pub struct DaoSession {
    sequence: u8,
    awaiting_ack: bool,
    retry_count: u32,
    backoff_ms: u64,
    sent_at: MonoMs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaoOutcome {
    Send,
    Wait,
    Abandoned,
}

impl DaoSession {
    pub fn new() -> DaoSession {
        DaoSession {
            sequence: 0,
            awaiting_ack: false,
            retry_count: 0,
            backoff_ms: 1_000,
            sent_at: 0,
        }
    }

    /// Build a fresh DAO (new sequence number) to the given parent,
    /// advertising `prefixes`. Resets retry state.
    pub fn build(
        &mut self,
        instance_id: u8,
        dodag_id: Addr,
        parent: Addr,
        prefixes: &[OwnedPrefix],
        now_ms: MonoMs,
    ) -> Vec<u8> {
        self.sequence = self.sequence.wrapping_add(1);
        self.awaiting_ack = true;
        self.retry_count = 0;
        self.backoff_ms = 1_000;
        self.sent_at = now_ms;
        self.encode(instance_id, dodag_id, parent, prefixes)
    }

    fn encode(
        &self,
        instance_id: u8,
        dodag_id: Addr,
        parent: Addr,
        prefixes: &[OwnedPrefix],
    ) -> Vec<u8> {
        let targets: Vec<Vec<u8>> = prefixes
            .iter()
            .map(|p| encode_target(p.prefix_length, p.prefix))
            .collect();
        let transit = encode_transit(0, 60, parent);
        build_dao(instance_id, self.sequence, dodag_id, &targets, &transit)
    }

    /// Record receipt of a DAO-ACK matching our outstanding sequence.
    pub fn on_ack(&mut self, sequence: u8) -> bool {
        if self.awaiting_ack && sequence == self.sequence {
            self.awaiting_ack = false;
            true
        } else {
            false
        }
    }

    /// Whether a retransmission (or abandonment) is due.
    pub fn poll(&mut self, now_ms: MonoMs) -> DaoOutcome {
        if !self.awaiting_ack {
            return DaoOutcome::Wait;
        }
        if now_ms < self.sent_at + self.backoff_ms {
            return DaoOutcome::Wait;
        }
        if self.retry_count >= MAX_DAO_RETRIES {
            self.awaiting_ack = false;
            return DaoOutcome::Abandoned;
        }
        self.retry_count += 1;
        self.backoff_ms = (self.backoff_ms * 2).min(MAX_BACKOFF_MS);
        self.sent_at = now_ms;
        DaoOutcome::Send
    }

    pub fn sequence(&self) -> u8 {
        self.sequence
    }
}

impl Default for DaoSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps_at_sixty_seconds() {
        let mut dao = DaoSession::new();
        let dodag: Addr = "2001:db8::1".parse().unwrap();
        let parent: Addr = "fe80::a".parse().unwrap();
        dao.build(0, dodag, parent, &[], 0);

        let mut t = 0u64;
        let mut backoffs = Vec::new();
        loop {
            t += 100_000; // force every poll to be due
            match dao.poll(t) {
                DaoOutcome::Send => backoffs.push(dao.backoff_ms),
                DaoOutcome::Abandoned => break,
                DaoOutcome::Wait => unreachable!(),
            }
        }
        assert_eq!(backoffs.len() as u32, MAX_DAO_RETRIES);
        assert_eq!(*backoffs.last().unwrap(), MAX_BACKOFF_MS);
    }

    #[test]
    fn ack_clears_awaiting_state() {
        let mut dao = DaoSession::new();
        let dodag: Addr = "2001:db8::1".parse().unwrap();
        let parent: Addr = "fe80::a".parse().unwrap();
        dao.build(0, dodag, parent, &[], 0);
        assert!(dao.on_ack(dao.sequence()));
        assert_eq!(dao.poll(100_000), DaoOutcome::Wait);
    }
}

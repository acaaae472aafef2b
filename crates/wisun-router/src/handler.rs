//! The registration-decision collaborator (spec §4.3.2): wired into the
//! ICMPv6 engine's `dispatch`. A Wi-SUN FAN router always accepts a
//! registration from a new child — there is no upstream registrar to
//! query in this core's scope (that is the border router's job).

use wsn_addr::Eui64;
use wsn_common::time::MonoMs;
use wsn_icmpv6::{EaroDecision, RegistrationHandler};
use wsn_packet::AroStatus;

pub struct DefaultRegistrationHandler;

impl RegistrationHandler for DefaultRegistrationHandler {
    fn decide(&mut self, _eui64: Eui64, _tid: u8, _lifetime: u16, _now_ms: MonoMs) -> EaroDecision {
        EaroDecision::ReplyWithEaro(AroStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_accepts() {
        let mut h = DefaultRegistrationHandler;
        let decision = h.decide(Eui64::ZERO, 0, 3600, 0);
        assert_eq!(decision, EaroDecision::ReplyWithEaro(AroStatus::Success));
    }
}

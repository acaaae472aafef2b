//! The `AttachState` state machine (spec §9): replaces the C source's
//! coroutine-shaped DHCPv6-acquire → ARO-register → DAO-emit flow with an
//! explicit, driven-by-events state machine.

use wsn_addr::Addr;

/// The DHCPv6 collaborator contract (spec §6, §9): `request_global_address`
/// is called once attachment to a preferred parent is confirmed;
/// `on_address_assigned` is the event the attach state machine waits for
/// before registering. Deliberately not a `usleep(100ms)` race (spec §9).
pub trait AddressSource {
    fn request_global_address(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Booting,
    AttachingParent,
    AddressAcquiring,
    Registering,
    Registered,
}

/// Driven by the scheduler: `on_pref_parent_change`,
/// `on_address_assigned`, NA-with-EARO-SUCCESS receipt, DAO-ACK receipt.
pub struct AttachMachine {
    state: AttachState,
    global_addr: Option<Addr>,
}

impl AttachMachine {
    pub fn new() -> AttachMachine {
        AttachMachine {
            state: AttachState::Booting,
            global_addr: None,
        }
    }

    pub fn state(&self) -> AttachState {
        self.state
    }

    pub fn start(&mut self) {
        if self.state == AttachState::Booting {
            self.state = AttachState::AttachingParent;
        }
    }

    /// A preferred parent was just installed (spec §4.4.2
    /// `pref_parent_change`): request a global address.
    pub fn on_pref_parent_change(&mut self, addr_source: &mut dyn AddressSource) {
        if self.state == AttachState::AttachingParent {
            self.state = AttachState::AddressAcquiring;
            addr_source.request_global_address();
        }
    }

    /// The DHCPv6 collaborator confirmed a global address — this is the
    /// explicit replacement for the C source's `usleep(100ms)` race (spec
    /// §9): we wait for this event instead of guessing a delay.
    pub fn on_address_assigned(&mut self, addr: Addr) {
        if self.state == AttachState::AddressAcquiring {
            self.global_addr = Some(addr);
            self.state = AttachState::Registering;
        }
    }

    /// An NA carrying EARO{status=SUCCESS} confirmed our registration
    /// with the preferred parent.
    pub fn on_registration_confirmed(&mut self) {
        if self.state == AttachState::Registering {
            self.state = AttachState::Registered;
        }
    }

    /// Parent lost (spec §4.4.5): fall back to attaching a new one.
    pub fn on_parent_lost(&mut self) {
        self.global_addr = None;
        self.state = AttachState::AttachingParent;
    }

    pub fn global_addr(&self) -> Option<Addr> {
        self.global_addr
    }
}

impl Default for AttachMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingAddressSource {
        requested: bool,
    }
    impl AddressSource for RecordingAddressSource {
        fn request_global_address(&mut self) {
            self.requested = true;
        }
    }

    #[test]
    fn full_attach_sequence() {
        let mut m = AttachMachine::new();
        let mut src = RecordingAddressSource { requested: false };
        assert_eq!(m.state(), AttachState::Booting);

        m.start();
        assert_eq!(m.state(), AttachState::AttachingParent);

        m.on_pref_parent_change(&mut src);
        assert_eq!(m.state(), AttachState::AddressAcquiring);
        assert!(src.requested);

        let addr: Addr = "2001:db8::1".parse().unwrap();
        m.on_address_assigned(addr);
        assert_eq!(m.state(), AttachState::Registering);
        assert_eq!(m.global_addr(), Some(addr));

        m.on_registration_confirmed();
        assert_eq!(m.state(), AttachState::Registered);
    }

    #[test]
    fn parent_loss_returns_to_attaching() {
        let mut m = AttachMachine::new();
        let mut src = RecordingAddressSource { requested: false };
        m.start();
        m.on_pref_parent_change(&mut src);
        m.on_address_assigned("2001:db8::1".parse().unwrap());
        m.on_registration_confirmed();
        assert_eq!(m.state(), AttachState::Registered);

        m.on_parent_lost();
        assert_eq!(m.state(), AttachState::AttachingParent);
        assert!(m.global_addr().is_none());
    }
}

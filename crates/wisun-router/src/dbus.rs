//! The D-Bus management surface (spec §1, §6): modeled as a read-only
//! projection of interface state plus a single callback the scheduler
//! invokes on preferred-parent change. No D-Bus transport crate is
//! pulled in — the transport itself is out of scope; this is only the
//! data shape the real layer would serve.

use wsn_addr::Eui64;
use wsn_rpl::PreferredParentChange;

/// A snapshot of interface-level state a D-Bus `GetProperties` call
/// would serve.
#[derive(Debug, Clone)]
pub struct InterfaceSnapshot {
    pub hw_address: Eui64,
    pub pan_id: u16,
    /// Installed Group Authentication Key indices (spec §1: "GAK
    /// installed for key-index k" is the only EAP-TLS event the core
    /// consumes).
    pub gaks: Vec<u8>,
}

/// The scheduler's single consumer of `pref_parent_change` events (spec
/// §9): a plain closure rather than a D-Bus signal binding.
pub type PrimaryParentChanged = Box<dyn FnMut(PreferredParentChange)>;

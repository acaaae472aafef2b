//! The DHCPv6 client boundary (spec §6, §9): modeled as the
//! `AddressSource` trait the RPL attach state machine drives. No
//! concrete DHCPv6 client is provided — the client itself is out of
//! scope (spec §1) — only a recording test double for wiring and tests.

pub use wsn_rpl::AddressSource;

/// Records that a global address was requested; a real client would
/// issue a Solicit/Request exchange here and later call
/// `AttachMachine::on_address_assigned` itself once a Reply arrives.
#[derive(Default)]
pub struct NullAddressSource {
    pub requests: u32,
}

impl NullAddressSource {
    pub fn new() -> NullAddressSource {
        NullAddressSource::default()
    }
}

impl AddressSource for NullAddressSource {
    fn request_global_address(&mut self) {
        self.requests += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_request() {
        let mut src = NullAddressSource::new();
        src.request_global_address();
        src.request_global_address();
        assert_eq!(src.requests, 2);
    }
}

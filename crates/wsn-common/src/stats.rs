/// Per-error-kind counters, single-threaded so plain `u64`s suffice (no
/// atomics — the whole core runs on one thread, per spec §5).
///
/// Read-only projection surfaced by the D-Bus layer (spec §6); not part of
/// any engine's control flow.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreStats {
    pub malformed_packet: u64,
    pub checksum_mismatch: u64,
    pub rate_limited: u64,
    pub no_route: u64,
    pub no_source_address: u64,
    pub neighbor_table_full: u64,
    pub parent_lost: u64,
}

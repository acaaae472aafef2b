//! The RCP (radio co-processor) transport contract (spec §1, §6): the
//! core never speaks the byte-oriented request/response bus itself —
//! only this trait, plus the decoded indications it yields.

use wsn_addr::Eui64;

/// FHSS schedule parameters (spec §1 "frequency-hopping schedule"):
/// collapsed to an opaque handle since the hopping-sequence detail lives
/// entirely in the out-of-scope MAC/LLC layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FhssParams {
    pub schedule_id: u8,
}

/// One decoded indication from the RCP (spec §6: `{rx_ind, tx_cnf,
/// reset_ind}`).
#[derive(Debug, Clone)]
pub enum RcpIndication {
    /// An 802.15.4 data frame was received, already stripped of MAC/LLC
    /// framing by the out-of-scope MAC layer — "deliver a frame with
    /// source EUI-64" (spec §1).
    RxInd { src_eui64: Eui64, payload: Vec<u8> },
    /// Confirmation for a previously submitted `data_tx`.
    TxCnf { handle: u8, success: bool },
    /// The RCP reset (e.g. after a firmware crash); the core must
    /// re-arm radio/FHSS/key state before resuming.
    ResetInd,
}

/// The RCP bus (spec §1, §6): a byte-oriented request/response
/// transport to the radio co-processor. No concrete implementation is
/// provided here — wiring an actual byte bus to real RCP firmware is out
/// of scope — only the trait and the in-memory `NullRcpBus` test double.
pub trait RcpBus {
    /// Submit an 802.15.4 data frame addressed to `dst_eui64`. Returns a
    /// caller-assigned handle later echoed in `TxCnf`.
    fn data_tx(&mut self, dst_eui64: Eui64, payload: &[u8], handle: u8);
    fn set_sec_key(&mut self, key_index: u8, key: [u8; 16]);
    fn set_radio(&mut self, channel: u8);
    fn set_fhss_uc(&mut self, params: FhssParams);
    fn set_fhss_async(&mut self, params: FhssParams);
    fn req_radio_enable(&mut self);
    fn req_radio_reset(&mut self);
    /// Drain one pending indication, if any. The scheduler calls this in
    /// a loop when the RCP's I/O source becomes readable (spec §4.5,
    /// `IoGroup::Rcp`).
    fn poll_indication(&mut self) -> Option<RcpIndication>;
}

/// In-memory test double: queues indications for `poll_indication` to
/// drain and records every outbound call, rather than talking to any
/// real transport.
#[derive(Default)]
pub struct NullRcpBus {
    pending: std::collections::VecDeque<RcpIndication>,
    pub sent: Vec<(Eui64, Vec<u8>, u8)>,
}

impl NullRcpBus {
    pub fn new() -> NullRcpBus {
        NullRcpBus::default()
    }

    /// Queue an indication for a later `poll_indication` to return —
    /// used by tests and the scheduler's own unit tests to simulate
    /// inbound radio traffic without a real bus.
    pub fn push_indication(&mut self, ind: RcpIndication) {
        self.pending.push_back(ind);
    }
}

impl RcpBus for NullRcpBus {
    fn data_tx(&mut self, dst_eui64: Eui64, payload: &[u8], handle: u8) {
        self.sent.push((dst_eui64, payload.to_vec(), handle));
    }

    fn set_sec_key(&mut self, _key_index: u8, _key: [u8; 16]) {}
    fn set_radio(&mut self, _channel: u8) {}
    fn set_fhss_uc(&mut self, _params: FhssParams) {}
    fn set_fhss_async(&mut self, _params: FhssParams) {}
    fn req_radio_enable(&mut self) {}
    fn req_radio_reset(&mut self) {}

    fn poll_indication(&mut self) -> Option<RcpIndication> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_bus_records_outbound_and_replays_queued_indications() {
        let mut bus = NullRcpBus::new();
        let eui = Eui64([1; 8]);
        bus.data_tx(eui, &[1, 2, 3], 7);
        assert_eq!(bus.sent, vec![(eui, vec![1, 2, 3], 7)]);

        bus.push_indication(RcpIndication::TxCnf {
            handle: 7,
            success: true,
        });
        match bus.poll_indication() {
            Some(RcpIndication::TxCnf { handle, success }) => {
                assert_eq!(handle, 7);
                assert!(success);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(bus.poll_indication().is_none());
    }
}

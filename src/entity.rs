//! The per-bearer PDCP entity.
//!
//! One [`PdcpEntity`] serves one radio bearer. On transmission it numbers SDUs, prepends the
//! header, applies integrity protection (signalling bearers) and ciphering, and hands the PDU to
//! RLC. On reception it reconstructs the 32-bit COUNT from the short SN in the header and its
//! local hyper-frame number, deciphers, verifies, strips the header, and delivers upward.
//!
//! Reception comes in three flavours, picked at [`init`] from the bearer type and RLC mode:
//!
//! * **SRB**: COUNT estimation with wrap lookahead, MAC-I verification, delivery to RRC. An
//!   integrity failure leaves all state untouched.
//! * **DRB on RLC UM**: COUNT tracking that tolerates losses, no duplicate handling, delivery to
//!   the gateway.
//! * **DRB on RLC AM**: no reordering, but window-based duplicate/stale discard around the last
//!   submitted SN, delivering PDUs in arrival order.
//!
//! All state lives behind one mutex per entity, so the upper and lower layer may each drive the
//! entity from their own thread. The transmit path hands the finished PDU to RLC after releasing
//! the lock.
//!
//! [`PdcpEntity`]: struct.PdcpEntity.html
//! [`init`]: struct.PdcpEntity.html#method.init

use crate::buffer::PduBuf;
use crate::config::{Config, PdcpConfig, RbType};
use crate::count::{Count, SnLen};
use crate::framing;
use crate::iface::{Gw, Rlc, Rrc};
use crate::security::{Security, SecurityFlags, MAC_LEN};
use crate::utils::HexDump;
use crate::Error;
use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Width of the duplicate/stale discard window on AM-mapped DRBs, in SNs.
///
/// Half the 12-bit SN space.
const REORDERING_WINDOW: u32 = 2048;

/// Receive handling selected for a bearer, from its type and RLC mode.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
enum BearerMode {
    Srb,
    DrbUm,
    DrbAm,
}

/// The (SN, HFN) halves of both COUNT counters, split by the bearer's SN width.
///
/// These are the values exchanged in a bearer context report: `dl_*` comes from the transmit
/// COUNT, `ul_*` from the receive COUNT.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct BearerStatus {
    pub dl_sn: u16,
    pub dl_hfn: u16,
    pub ul_sn: u16,
    pub ul_hfn: u16,
}

/// Mutable per-bearer state, everything behind the entity mutex.
struct State {
    lcid: u32,
    cfg: PdcpConfig,
    mode: BearerMode,
    active: bool,
    sec_flags: SecurityFlags,

    /// COUNT to use for the next transmitted PDU.
    tx_count: Count,
    /// COUNT of the last PDU accepted on the receive path.
    rx_count: Count,
    /// Receive-direction hyper-frame number.
    rx_hfn: u32,
    /// SN one past the most recently accepted PDU (`Next_PDCP_RX_SN`).
    next_rx_sn: u32,
    /// SN of the last PDU delivered upward on the AM path (`Last_Submitted_PDCP_RX_SN`).
    last_submitted_rx_sn: u32,

    max_sn: u32,
    reordering_window: u32,
}

impl State {
    fn new(lcid: u32, cfg: PdcpConfig, mode: BearerMode) -> Self {
        let max_sn = cfg.sn_len.max_sn();
        Self {
            lcid,
            cfg,
            mode,
            active: true,
            sec_flags: SecurityFlags::empty(),
            tx_count: Count::ZERO,
            rx_count: Count::ZERO,
            rx_hfn: 0,
            next_rx_sn: 0,
            // Sentinel: nothing delivered yet.
            last_submitted_rx_sn: max_sn,
            max_sn,
            reordering_window: match cfg.rb_type {
                RbType::Srb => 0,
                RbType::Drb => REORDERING_WINDOW,
            },
        }
    }

    /// Moves `Next_PDCP_RX_SN` past `sn`, bumping the HFN when the SN space wraps.
    fn advance_rx_sn(&mut self, sn: u32) {
        self.next_rx_sn = sn + 1;
        if self.next_rx_sn > self.max_sn {
            self.next_rx_sn = 0;
            self.rx_hfn = self.rx_hfn.wrapping_add(1);
        }
    }
}

/// A PDCP entity serving a single radio bearer.
///
/// Created inert by [`new`]; [`init`] installs the bearer configuration and starts accepting
/// traffic. All methods take `&self` and may be called from different threads; operations on one
/// entity are serialized by its internal mutex.
///
/// [`new`]: #method.new
/// [`init`]: #method.init
pub struct PdcpEntity<C: Config> {
    rlc: Arc<C::Rlc>,
    rrc: Arc<C::Rrc>,
    gw: Arc<C::Gw>,
    security: Arc<C::Security>,
    state: Mutex<Option<State>>,
}

impl<C: Config> PdcpEntity<C> {
    /// Creates an inert entity wired to the given collaborators.
    ///
    /// The entity rejects all traffic until [`init`] is called.
    ///
    /// [`init`]: #method.init
    pub fn new(
        rlc: Arc<C::Rlc>,
        rrc: Arc<C::Rrc>,
        gw: Arc<C::Gw>,
        security: Arc<C::Security>,
    ) -> Self {
        Self {
            rlc,
            rrc,
            gw,
            security,
            state: Mutex::new(None),
        }
    }

    /// Configures the entity for the bearer on logical channel `lcid` and activates it.
    ///
    /// All counters start at zero. The receive handling is fixed here from the bearer type and
    /// the RLC mode of the channel.
    ///
    /// Returns `Error::InvalidValue` when the SN length does not fit the bearer type (SRBs use
    /// the 5-bit format, DRBs one of the data formats).
    pub fn init(&self, lcid: u32, cfg: PdcpConfig) -> Result<(), Error> {
        let valid = match cfg.rb_type {
            RbType::Srb => cfg.sn_len == SnLen::Sn5,
            RbType::Drb => cfg.sn_len != SnLen::Sn5,
        };
        if !valid {
            error!(
                "bearer {}: SN length {:?} does not fit {:?}",
                cfg.bearer_id, cfg.sn_len, cfg.rb_type
            );
            return Err(Error::InvalidValue);
        }

        let mode = match cfg.rb_type {
            RbType::Srb => BearerMode::Srb,
            RbType::Drb if self.rlc.rb_is_um(lcid) => BearerMode::DrbUm,
            RbType::Drb => BearerMode::DrbAm,
        };
        let st = State::new(lcid, cfg, mode);
        info!(
            "init {} with bearer id {}",
            self.rrc.rb_name(lcid),
            cfg.bearer_id
        );
        debug!(
            "SN length: {} bits, header: {} B, reordering window: {}, maximum SN: {}",
            cfg.sn_len.bits(),
            cfg.hdr_len(),
            st.reordering_window,
            st.max_sn
        );
        *self.state.lock() = Some(st);
        Ok(())
    }

    /// Re-establishment procedure (36.323 5.2).
    ///
    /// SRBs and UM-mapped DRBs restart their counters from zero; AM-mapped DRBs keep them, and
    /// the upper layers drive recovery.
    pub fn reestablish(&self) {
        let mut guard = self.state.lock();
        let st = match guard.as_mut() {
            Some(st) => st,
            None => return,
        };
        info!(
            "re-establish {} with bearer id {}",
            self.rrc.rb_name(st.lcid),
            st.cfg.bearer_id
        );
        match st.mode {
            BearerMode::Srb | BearerMode::DrbUm => {
                st.tx_count = Count::ZERO;
                st.rx_count = Count::ZERO;
                st.rx_hfn = 0;
                st.next_rx_sn = 0;
            }
            BearerMode::DrbAm => {}
        }
    }

    /// Pauses the entity (e.g. on RRC connection release).
    ///
    /// Counters stay intact; traffic is rejected until the next [`init`].
    ///
    /// [`init`]: #method.init
    pub fn reset(&self) {
        if let Some(st) = self.state.lock().as_mut() {
            st.active = false;
            debug!("reset {}", self.rrc.rb_name(st.lcid));
        }
    }

    /// Sets which protections the entity applies, effective for subsequent PDUs in both
    /// directions.
    pub fn configure_security(&self, flags: SecurityFlags) -> Result<(), Error> {
        match self.state.lock().as_mut() {
            Some(st) => {
                st.sec_flags = flags;
                Ok(())
            }
            None => Err(Error::Inactive),
        }
    }

    /// Returns whether the entity currently accepts traffic.
    pub fn is_active(&self) -> bool {
        self.state.lock().as_ref().map_or(false, |st| st.active)
    }

    /// Returns the COUNT that will protect the next transmitted PDU.
    pub fn ul_count(&self) -> u32 {
        self.state
            .lock()
            .as_ref()
            .map_or(0, |st| st.tx_count.as_raw())
    }

    /// Returns the COUNT of the last PDU accepted on the receive path.
    pub fn dl_count(&self) -> u32 {
        self.state
            .lock()
            .as_ref()
            .map_or(0, |st| st.rx_count.as_raw())
    }

    /// Splits both COUNT counters into their (SN, HFN) halves for a bearer context report.
    ///
    /// Returns `None` for an entity that was never initialized.
    pub fn bearer_status(&self) -> Option<BearerStatus> {
        self.state.lock().as_ref().map(|st| {
            let sn_len = st.cfg.sn_len;
            BearerStatus {
                dl_sn: st.tx_count.sn(sn_len) as u16,
                dl_hfn: st.tx_count.hfn(sn_len) as u16,
                ul_sn: st.rx_count.sn(sn_len) as u16,
                ul_hfn: st.rx_count.hfn(sn_len) as u16,
            }
        })
    }

    /// Protects an SDU coming from the upper layer and hands it to RLC.
    ///
    /// The SDU buffer must leave headroom for the PDCP header and, on SRBs, tailroom for the
    /// MAC-I; `Error::Eof` is returned (and no state is touched) otherwise. `blocking` is passed
    /// through to the RLC transport.
    pub fn write_sdu(&self, mut sdu: PduBuf, blocking: bool) -> Result<(), Error> {
        let lcid = {
            let mut guard = self.state.lock();
            let st = match guard.as_mut() {
                Some(st) if st.active => st,
                _ => return Err(Error::Inactive),
            };

            let count = st.tx_count;
            let sn = count.sn(st.cfg.sn_len);
            info!(
                "TX {} SDU ({} B), SN {}, flags {:?}",
                self.rrc.rb_name(st.lcid),
                sdu.len(),
                sn,
                st.sec_flags
            );

            match st.mode {
                BearerMode::Srb => {
                    framing::pack_control_pdu(sn, &mut sdu)?;
                    if st.sec_flags.contains(SecurityFlags::INTEGRITY) {
                        // The MAC-I is computed over header and plaintext payload, then ciphered
                        // along with the payload.
                        let body = sdu.len() - MAC_LEN;
                        let mac = self.security.integrity_generate(&sdu[..body], count);
                        sdu[body..].copy_from_slice(&mac);
                    }
                }
                BearerMode::DrbUm | BearerMode::DrbAm => match st.cfg.sn_len {
                    SnLen::Sn12 => framing::pack_data_pdu_long_sn(sn, &mut sdu)?,
                    _ => framing::pack_data_pdu_short_sn(sn, &mut sdu)?,
                },
            }

            if st.sec_flags.contains(SecurityFlags::CIPHERING) {
                let hdr = st.cfg.hdr_len();
                self.security.cipher_encrypt(&mut sdu[hdr..], count);
            }

            st.tx_count.increment();
            trace!("TX PDU: {:?}", HexDump(&sdu));
            st.lcid
        };

        self.rlc.write_sdu(lcid, sdu, blocking);
        Ok(())
    }

    /// Accepts a PDU from RLC and runs the bearer's receive path.
    ///
    /// Malformed, failed, and out-of-window PDUs are discarded silently; the caller is never
    /// notified.
    pub fn write_pdu(&self, pdu: PduBuf) {
        let mut guard = self.state.lock();
        let st = match guard.as_mut() {
            Some(st) if st.active => st,
            _ => {
                debug!("dropping PDU received while inactive");
                return;
            }
        };

        trace!(
            "RX {} PDU ({} B): {:?}",
            self.rrc.rb_name(st.lcid),
            pdu.len(),
            HexDump(&pdu)
        );
        if pdu.len() <= st.cfg.hdr_len() {
            debug!("RX PDU not longer than its header, discarding");
            return;
        }

        match st.mode {
            BearerMode::Srb => self.handle_srb_pdu(st, pdu),
            BearerMode::DrbUm => self.handle_um_drb_pdu(st, pdu),
            BearerMode::DrbAm => self.handle_am_drb_pdu(st, pdu),
        }
    }

    /// SRB receive path (36.323 5.1.2.2).
    fn handle_srb_pdu(&self, st: &mut State, mut pdu: PduBuf) {
        if pdu.len() < st.cfg.hdr_len() + MAC_LEN {
            debug!("SRB PDU too short for a MAC-I, discarding");
            return;
        }

        let sn = u32::from(pdu[0] & 0x1f);
        debug!("RX SRB PDU, SN {}, Next_PDCP_RX_SN {}", sn, st.next_rx_sn);

        // Estimate the COUNT keying this PDU: an SN below the expected one is taken to follow an
        // SN wrap and is keyed with the upcoming HFN. The stored HFN only advances once the PDU
        // passes verification.
        let count = if sn < st.next_rx_sn {
            Count::from_parts(st.rx_hfn.wrapping_add(1), sn, st.cfg.sn_len)
        } else {
            Count::from_parts(st.rx_hfn, sn, st.cfg.sn_len)
        };

        if st.sec_flags.contains(SecurityFlags::CIPHERING) {
            self.security.cipher_decrypt(&mut pdu[1..], count);
        }

        let body = pdu.len() - MAC_LEN;
        let mut mac = [0; MAC_LEN];
        mac.copy_from_slice(&pdu[body..]);
        pdu.truncate(body);

        if st.sec_flags.contains(SecurityFlags::INTEGRITY)
            && !self.security.integrity_verify(&pdu, count, &mac)
        {
            warn!(
                "{} integrity check failed on SN {}, discarding PDU",
                self.rrc.rb_name(st.lcid),
                sn
            );
            return;
        }

        pdu.strip_left(1);

        if sn < st.next_rx_sn {
            st.rx_hfn = st.rx_hfn.wrapping_add(1);
        }
        st.advance_rx_sn(sn);
        st.rx_count = count;

        trace!("passing SDU to RRC: {:?}", HexDump(&pdu));
        self.rrc.write_pdu(st.lcid, pdu);
    }

    /// Receive path for DRBs mapped on RLC UM (36.323 5.1.2.1.3).
    fn handle_um_drb_pdu(&self, st: &mut State, mut pdu: PduBuf) {
        let sn = match st.cfg.sn_len {
            SnLen::Sn12 => framing::unpack_data_pdu_long_sn(&mut pdu),
            _ => framing::unpack_data_pdu_short_sn(&mut pdu),
        };
        let sn = match sn {
            Ok(sn) => sn,
            Err(_) => return,
        };

        if sn < st.next_rx_sn {
            st.rx_hfn = st.rx_hfn.wrapping_add(1);
        }
        let count = Count::from_parts(st.rx_hfn, sn, st.cfg.sn_len);

        if st.sec_flags.contains(SecurityFlags::CIPHERING) {
            self.security.cipher_decrypt(&mut pdu, count);
        }

        st.advance_rx_sn(sn);
        st.rx_count = count;

        debug!("RX {} PDU, SN {}", self.rrc.rb_name(st.lcid), sn);
        self.gw.write_pdu(st.lcid, pdu);
    }

    /// Receive path for DRBs mapped on RLC AM, without re-ordering (36.323 5.1.2.1.2).
    ///
    /// PDUs are delivered in arrival order; the window logic only reconstructs the COUNT and
    /// weeds out duplicates and stale copies. The guard order is load-bearing: each case's COUNT
    /// keying assumes the earlier cases did not match.
    fn handle_am_drb_pdu(&self, st: &mut State, mut pdu: PduBuf) {
        let sn = match framing::unpack_data_pdu_long_sn(&mut pdu) {
            Ok(sn) => sn,
            Err(_) => return,
        };

        let window = st.reordering_window as i32;
        let last_submit_diff_sn = st.last_submitted_rx_sn as i32 - sn as i32;
        let sn_diff_last_submit = sn as i32 - st.last_submitted_rx_sn as i32;
        let sn_diff_next_rx_sn = sn as i32 - st.next_rx_sn as i32;

        debug!(
            "RX HFN {}, SN {}, Last_Submitted_PDCP_RX_SN {}, Next_PDCP_RX_SN {}",
            st.rx_hfn, sn, st.last_submitted_rx_sn, st.next_rx_sn
        );

        let count;
        if (0 <= sn_diff_last_submit && sn_diff_last_submit > window)
            || (0 <= last_submit_diff_sn && last_submit_diff_sn < window)
        {
            // Outside the window relative to the last submitted SN: a duplicate or a stale copy.
            count = if sn > st.next_rx_sn {
                Count::from_parts(st.rx_hfn.wrapping_sub(1), sn, st.cfg.sn_len)
            } else {
                Count::from_parts(st.rx_hfn, sn, st.cfg.sn_len)
            };
            warn!(
                "SN {} outside the re-ordering window (count {:?}), discarding PDU",
                sn, count
            );
            return;
        } else if (st.next_rx_sn.wrapping_sub(sn)) as i32 > window {
            // SN from the next wrap of the sequence space.
            st.rx_hfn = st.rx_hfn.wrapping_add(1);
            count = Count::from_parts(st.rx_hfn, sn, st.cfg.sn_len);
            st.next_rx_sn = sn + 1;
        } else if sn_diff_next_rx_sn >= window {
            // Late PDU still keyed by the previous HFN.
            count = Count::from_parts(st.rx_hfn.wrapping_sub(1), sn, st.cfg.sn_len);
        } else if sn >= st.next_rx_sn {
            count = Count::from_parts(st.rx_hfn, sn, st.cfg.sn_len);
            st.advance_rx_sn(sn);
        } else {
            // Late but within the window; Next_PDCP_RX_SN stays put.
            count = Count::from_parts(st.rx_hfn, sn, st.cfg.sn_len);
        }

        self.security.cipher_decrypt(&mut pdu, count);

        st.last_submitted_rx_sn = sn;
        st.rx_count = count;

        debug!("RX {} PDU, SN {}", self.rrc.rb_name(st.lcid), sn);
        self.gw.write_pdu(st.lcid, pdu);
    }

    #[cfg(test)]
    fn rx_state(&self) -> (u32, u32, u32) {
        let guard = self.state.lock();
        let st = guard.as_ref().unwrap();
        (st.next_rx_sn, st.rx_hfn, st.last_submitted_rx_sn)
    }

    #[cfg(test)]
    fn set_rx_state(&self, next_rx_sn: u32, rx_hfn: u32, last_submitted_rx_sn: u32) {
        let mut guard = self.state.lock();
        let st = guard.as_mut().unwrap();
        st.next_rx_sn = next_rx_sn;
        st.rx_hfn = rx_hfn;
        st.last_submitted_rx_sn = last_submitted_rx_sn;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use std::thread;

    struct FakeRlc {
        um: bool,
        sdus: Mutex<Vec<PduBuf>>,
    }

    impl FakeRlc {
        fn new(um: bool) -> Self {
            Self {
                um,
                sdus: Mutex::new(Vec::new()),
            }
        }
    }

    impl Rlc for FakeRlc {
        fn write_sdu(&self, _lcid: u32, sdu: PduBuf, _blocking: bool) {
            self.sdus.lock().push(sdu);
        }

        fn rb_is_um(&self, _lcid: u32) -> bool {
            self.um
        }
    }

    #[derive(Default)]
    struct FakeRrc {
        pdus: Mutex<Vec<PduBuf>>,
    }

    impl Rrc for FakeRrc {
        fn write_pdu(&self, _lcid: u32, pdu: PduBuf) {
            self.pdus.lock().push(pdu);
        }

        fn rb_name(&self, lcid: u32) -> String {
            format!("RB{}", lcid)
        }
    }

    #[derive(Default)]
    struct FakeGw {
        pdus: Mutex<Vec<PduBuf>>,
    }

    impl Gw for FakeGw {
        fn write_pdu(&self, _lcid: u32, pdu: PduBuf) {
            self.pdus.lock().push(pdu);
        }
    }

    /// Toy COUNT-keyed algorithms: truncated SHA-256 MAC-I and a keystream XOR cipher. Any COUNT
    /// disagreement between the two sides garbles the payload or fails the MAC-I check.
    struct TestSecurity;

    fn keystream(count: Count, i: usize) -> u8 {
        let c = count.as_raw();
        ((c ^ (c >> 8) ^ (c >> 16) ^ (c >> 24)) as u8).wrapping_add(i as u8)
    }

    impl Security for TestSecurity {
        fn integrity_generate(&self, pdu: &[u8], count: Count) -> [u8; MAC_LEN] {
            let mut digest = Sha256::new();
            digest.input(&count.as_raw().to_be_bytes());
            digest.input(pdu);
            let out = digest.result();
            let mut mac = [0; MAC_LEN];
            mac.copy_from_slice(&out[..MAC_LEN]);
            mac
        }

        fn cipher_encrypt(&self, data: &mut [u8], count: Count) {
            for (i, byte) in data.iter_mut().enumerate() {
                *byte ^= keystream(count, i);
            }
        }

        fn cipher_decrypt(&self, data: &mut [u8], count: Count) {
            self.cipher_encrypt(data, count);
        }
    }

    struct TestStack;

    impl Config for TestStack {
        type Rlc = FakeRlc;
        type Rrc = FakeRrc;
        type Gw = FakeGw;
        type Security = TestSecurity;
    }

    struct Harness {
        rlc: Arc<FakeRlc>,
        rrc: Arc<FakeRrc>,
        gw: Arc<FakeGw>,
        pdcp: PdcpEntity<TestStack>,
    }

    impl Harness {
        /// Pops the oldest PDU handed to RLC.
        fn wire(&self) -> PduBuf {
            self.rlc.sdus.lock().remove(0)
        }
    }

    fn bearer(cfg: PdcpConfig, um: bool) -> Harness {
        let rlc = Arc::new(FakeRlc::new(um));
        let rrc = Arc::new(FakeRrc::default());
        let gw = Arc::new(FakeGw::default());
        let pdcp = PdcpEntity::new(rlc.clone(), rrc.clone(), gw.clone(), Arc::new(TestSecurity));
        pdcp.init(1, cfg).unwrap();
        Harness { rlc, rrc, gw, pdcp }
    }

    fn srb() -> Harness {
        bearer(PdcpConfig::srb(1), false)
    }

    fn um_drb(sn_len: SnLen) -> Harness {
        bearer(PdcpConfig::drb(1, sn_len), true)
    }

    fn am_drb() -> Harness {
        bearer(PdcpConfig::drb(1, SnLen::Sn12), false)
    }

    fn long_data_pdu(sn: u32, payload: &[u8]) -> PduBuf {
        let mut pdu = PduBuf::from_slice(payload).unwrap();
        framing::pack_data_pdu_long_sn(sn, &mut pdu).unwrap();
        pdu
    }

    fn short_data_pdu(sn: u32, payload: &[u8]) -> PduBuf {
        let mut pdu = PduBuf::from_slice(payload).unwrap();
        framing::pack_data_pdu_short_sn(sn, &mut pdu).unwrap();
        pdu
    }

    #[test]
    fn srb_echo() {
        let h = srb();
        h.pdcp
            .write_sdu(PduBuf::from_slice(&[0x11; 10]).unwrap(), false)
            .unwrap();
        assert_eq!(h.pdcp.ul_count(), 1);

        let wire = h.wire();
        assert_eq!(wire.len(), 15);
        assert_eq!(wire[0], 0x00);
        assert_eq!(&wire[11..], &[0; 4]);

        h.pdcp.write_pdu(wire);
        let sdu = h.rrc.pdus.lock().remove(0);
        assert_eq!(&sdu[..], &[0x11; 10]);
        assert_eq!(h.pdcp.rx_state(), (1, 0, 31));
    }

    #[test]
    fn srb_hfn_wrap() {
        let h = srb();
        for i in 0..32u8 {
            h.pdcp
                .write_sdu(PduBuf::from_slice(&[i]).unwrap(), false)
                .unwrap();
            h.pdcp.write_pdu(h.wire());
        }
        assert_eq!(h.pdcp.ul_count(), 32);
        assert_eq!(h.rrc.pdus.lock().len(), 32);
        // The SN space wrapped exactly once.
        assert_eq!(h.pdcp.rx_state(), (0, 1, 31));
        assert_eq!(h.pdcp.dl_count(), 31);
    }

    #[test]
    fn srb_count_round_trip_with_security() {
        let h = srb();
        h.pdcp
            .configure_security(SecurityFlags::INTEGRITY | SecurityFlags::CIPHERING)
            .unwrap();
        // Cross the SN wrap so the receiver has to key PDUs with HFN 1.
        for i in 0..40u8 {
            h.pdcp
                .write_sdu(PduBuf::from_slice(&[i, i ^ 0xff]).unwrap(), false)
                .unwrap();
            h.pdcp.write_pdu(h.wire());
            let sdu = h.rrc.pdus.lock().remove(0);
            assert_eq!(&sdu[..], &[i, i ^ 0xff]);
        }
        assert_eq!(h.pdcp.ul_count(), 40);
        assert_eq!(h.pdcp.rx_state(), (8, 1, 31));
    }

    #[test]
    fn srb_integrity_failure_is_state_neutral() {
        let h = srb();
        h.pdcp.configure_security(SecurityFlags::INTEGRITY).unwrap();
        h.pdcp
            .write_sdu(PduBuf::from_slice(&[1, 2, 3]).unwrap(), false)
            .unwrap();

        let good = h.wire();
        let mut mangled = good.clone();
        let last = mangled.len() - 1;
        mangled[last] ^= 0xff;

        h.pdcp.write_pdu(mangled);
        assert!(h.rrc.pdus.lock().is_empty());
        assert_eq!(h.pdcp.rx_state(), (0, 0, 31));

        h.pdcp.write_pdu(good.clone());
        assert_eq!(h.rrc.pdus.lock().len(), 1);
        assert_eq!(h.pdcp.rx_state(), (1, 0, 31));

        // Replaying the PDU now estimates the COUNT with the wrap lookahead, so even the intact
        // MAC-I no longer verifies; the lookahead must not leak into the stored HFN.
        h.pdcp.write_pdu(good);
        assert_eq!(h.rrc.pdus.lock().len(), 1);
        assert_eq!(h.pdcp.rx_state(), (1, 0, 31));
    }

    #[test]
    fn srb_pdu_without_mac_is_discarded() {
        let h = srb();
        h.pdcp.write_pdu(PduBuf::from_slice(&[0x00, 0xab]).unwrap());
        assert!(h.rrc.pdus.lock().is_empty());
        assert_eq!(h.pdcp.rx_state(), (0, 0, 31));
    }

    #[test]
    fn runt_pdu_is_discarded() {
        let h = srb();
        h.pdcp.write_pdu(PduBuf::from_slice(&[0x00]).unwrap());
        assert!(h.rrc.pdus.lock().is_empty());
        assert_eq!(h.pdcp.rx_state(), (0, 0, 31));

        let h = um_drb(SnLen::Sn12);
        h.pdcp.write_pdu(PduBuf::from_slice(&[0x80, 0x00]).unwrap());
        assert!(h.gw.pdus.lock().is_empty());
        assert_eq!(h.pdcp.rx_state(), (0, 0, 4095));
    }

    #[test]
    fn um_long_sn_wrap() {
        let h = um_drb(SnLen::Sn12);
        for &sn in &[4094, 4095, 0, 1] {
            h.pdcp.write_pdu(long_data_pdu(sn, &[sn as u8]));
        }
        assert_eq!(h.gw.pdus.lock().len(), 4);
        assert_eq!(h.pdcp.rx_state(), (2, 1, 4095));
        assert_eq!(h.pdcp.dl_count(), (1 << 12) | 1);
    }

    #[test]
    fn um_tolerates_gaps() {
        let h = um_drb(SnLen::Sn12);
        h.pdcp.write_pdu(long_data_pdu(0, &[0]));
        h.pdcp.write_pdu(long_data_pdu(3, &[3]));
        assert_eq!(h.gw.pdus.lock().len(), 2);
        assert_eq!(h.pdcp.rx_state(), (4, 0, 4095));
    }

    #[test]
    fn um_short_sn_wrap() {
        let h = um_drb(SnLen::Sn7);
        for &sn in &[126, 127, 0] {
            h.pdcp.write_pdu(short_data_pdu(sn, &[sn as u8]));
        }
        assert_eq!(h.gw.pdus.lock().len(), 3);
        assert_eq!(h.pdcp.rx_state(), (1, 1, 127));
    }

    #[test]
    fn um_count_round_trip_with_losses() {
        let tx = um_drb(SnLen::Sn12);
        let rx = um_drb(SnLen::Sn12);
        tx.pdcp.configure_security(SecurityFlags::CIPHERING).unwrap();
        rx.pdcp.configure_security(SecurityFlags::CIPHERING).unwrap();

        for i in 0..6u8 {
            tx.pdcp
                .write_sdu(PduBuf::from_slice(&[i; 4]).unwrap(), false)
                .unwrap();
        }
        for i in 0..6u8 {
            let pdu = tx.wire();
            if i == 2 {
                continue; // lost on the air
            }
            rx.pdcp.write_pdu(pdu);
        }

        let delivered = rx.gw.pdus.lock();
        let expected: Vec<u8> = vec![0, 1, 3, 4, 5];
        assert_eq!(delivered.len(), expected.len());
        for (pdu, i) in delivered.iter().zip(expected) {
            assert_eq!(&pdu[..], &[i; 4]);
        }
    }

    #[test]
    fn am_duplicate_is_discarded() {
        let h = am_drb();
        h.pdcp.write_pdu(long_data_pdu(100, &[1]));
        assert_eq!(h.gw.pdus.lock().len(), 1);
        assert_eq!(h.pdcp.rx_state(), (101, 0, 100));
        assert_eq!(h.pdcp.dl_count(), 100);

        h.pdcp.write_pdu(long_data_pdu(100, &[1]));
        assert_eq!(h.gw.pdus.lock().len(), 1);
        assert_eq!(h.pdcp.rx_state(), (101, 0, 100));
    }

    #[test]
    fn am_out_of_window_forward_is_discarded() {
        let h = am_drb();
        h.pdcp.write_pdu(long_data_pdu(0, &[0]));
        assert_eq!(h.pdcp.rx_state(), (1, 0, 0));

        // 4090 is more than a window ahead of the last submitted SN, so it is treated as a stale
        // copy and dropped without touching any state.
        h.pdcp.write_pdu(long_data_pdu(4090, &[9]));
        assert_eq!(h.gw.pdus.lock().len(), 1);
        assert_eq!(h.pdcp.rx_state(), (1, 0, 0));
    }

    #[test]
    fn am_hfn_advances_across_wrap() {
        let h = am_drb();
        for &sn in &[0, 2000, 4000] {
            h.pdcp.write_pdu(long_data_pdu(sn, &[sn as u8]));
        }
        assert_eq!(h.pdcp.rx_state(), (4001, 0, 4000));

        // A small SN more than a window below Next_PDCP_RX_SN belongs to the next wrap.
        h.pdcp.write_pdu(long_data_pdu(10, &[10]));
        assert_eq!(h.gw.pdus.lock().len(), 4);
        assert_eq!(h.pdcp.rx_state(), (11, 1, 10));
        assert_eq!(h.pdcp.dl_count(), (1 << 12) | 10);
    }

    #[test]
    fn am_stale_pdu_keyed_with_previous_hfn() {
        let h = am_drb();
        h.pdcp.set_rx_state(1, 0, 3000);

        // Far ahead of Next_PDCP_RX_SN but within a window of the last submitted SN: keyed with
        // HFN - 1 and delivered; Next_PDCP_RX_SN stays put.
        h.pdcp.write_pdu(long_data_pdu(4090, &[7]));
        assert_eq!(h.gw.pdus.lock().len(), 1);
        assert_eq!(h.pdcp.dl_count(), 0xffff_fffa);
        assert_eq!(h.pdcp.rx_state(), (1, 0, 4090));
    }

    #[test]
    fn am_stale_below_last_submitted_is_discarded() {
        let h = am_drb();
        for &sn in &[0, 1, 5] {
            h.pdcp.write_pdu(long_data_pdu(sn, &[sn as u8]));
        }
        assert_eq!(h.pdcp.rx_state(), (6, 0, 5));

        // Within a window below the last submitted SN: counted as an old copy and dropped.
        h.pdcp.write_pdu(long_data_pdu(3, &[3]));
        assert_eq!(h.gw.pdus.lock().len(), 3);
        assert_eq!(h.pdcp.rx_state(), (6, 0, 5));
    }

    #[test]
    fn am_late_in_window_keeps_next_rx_sn() {
        let h = am_drb();
        // A PDU above the last submitted SN but behind Next_PDCP_RX_SN is still delivered, keyed
        // with the current HFN, and does not move Next_PDCP_RX_SN.
        h.pdcp.set_rx_state(6, 0, 1);
        h.pdcp.write_pdu(long_data_pdu(3, &[3]));
        assert_eq!(h.gw.pdus.lock().len(), 1);
        assert_eq!(h.pdcp.rx_state(), (6, 0, 3));
        assert_eq!(h.pdcp.dl_count(), 3);
    }

    #[test]
    fn reestablish_restarts_srb_and_um_counters() {
        for h in vec![srb(), um_drb(SnLen::Sn12)] {
            for _ in 0..3 {
                h.pdcp
                    .write_sdu(PduBuf::from_slice(&[0]).unwrap(), false)
                    .unwrap();
            }
            // Loop the first two PDUs back so the receive counters leave zero.
            h.pdcp.write_pdu(h.wire());
            h.pdcp.write_pdu(h.wire());
            assert_eq!(h.pdcp.ul_count(), 3);
            assert_eq!(h.pdcp.dl_count(), 1);

            h.pdcp.reestablish();
            assert_eq!(h.pdcp.ul_count(), 0);
            assert_eq!(h.pdcp.dl_count(), 0);
            let (next_rx_sn, rx_hfn, _) = h.pdcp.rx_state();
            assert_eq!((next_rx_sn, rx_hfn), (0, 0));
            assert!(h.pdcp.is_active());
        }
    }

    #[test]
    fn reestablish_keeps_am_counters() {
        let h = am_drb();
        for _ in 0..3 {
            h.pdcp
                .write_sdu(PduBuf::from_slice(&[0]).unwrap(), false)
                .unwrap();
        }
        h.pdcp.write_pdu(long_data_pdu(0, &[0]));

        h.pdcp.reestablish();
        assert_eq!(h.pdcp.ul_count(), 3);
        assert_eq!(h.pdcp.dl_count(), 0);
        assert_eq!(h.pdcp.rx_state(), (1, 0, 0));
    }

    #[test]
    fn reset_rejects_traffic() {
        let h = srb();
        h.pdcp.reset();
        assert!(!h.pdcp.is_active());
        assert_eq!(
            h.pdcp.write_sdu(PduBuf::from_slice(&[1]).unwrap(), false),
            Err(Error::Inactive)
        );
        h.pdcp.write_pdu(PduBuf::from_slice(&[0, 1, 0, 0, 0, 0]).unwrap());
        assert!(h.rrc.pdus.lock().is_empty());
        // Counters survive the pause.
        assert_eq!(h.pdcp.rx_state(), (0, 0, 31));
    }

    #[test]
    fn inert_entity_rejects_traffic() {
        let rlc = Arc::new(FakeRlc::new(false));
        let rrc = Arc::new(FakeRrc::default());
        let gw = Arc::new(FakeGw::default());
        let pdcp: PdcpEntity<TestStack> =
            PdcpEntity::new(rlc, rrc.clone(), gw, Arc::new(TestSecurity));

        assert!(!pdcp.is_active());
        assert_eq!(pdcp.bearer_status(), None);
        assert_eq!(
            pdcp.write_sdu(PduBuf::from_slice(&[1]).unwrap(), false),
            Err(Error::Inactive)
        );
        pdcp.write_pdu(PduBuf::from_slice(&[0, 0, 0, 0, 0, 0]).unwrap());
        assert!(rrc.pdus.lock().is_empty());
    }

    #[test]
    fn init_rejects_mismatched_sn_length() {
        let h = srb();
        assert_eq!(
            h.pdcp.init(1, PdcpConfig::drb(1, SnLen::Sn5)),
            Err(Error::InvalidValue)
        );
        let mut cfg = PdcpConfig::srb(1);
        cfg.sn_len = SnLen::Sn12;
        assert_eq!(h.pdcp.init(1, cfg), Err(Error::InvalidValue));
    }

    #[test]
    fn bearer_status_partitions_counts() {
        let h = um_drb(SnLen::Sn7);
        for _ in 0..200 {
            h.pdcp
                .write_sdu(PduBuf::from_slice(&[0]).unwrap(), false)
                .unwrap();
        }
        for sn in 0..130 {
            h.pdcp.write_pdu(short_data_pdu(sn % 128, &[0]));
        }

        let status = h.pdcp.bearer_status().unwrap();
        assert_eq!(status.dl_sn, 200 % 128);
        assert_eq!(status.dl_hfn, 200 / 128);
        // Last accepted PDU carried SN 129 % 128 = 1 with HFN 1.
        assert_eq!(status.ul_sn, 1);
        assert_eq!(status.ul_hfn, 1);
        assert_eq!(
            u32::from(status.dl_hfn) << 7 | u32::from(status.dl_sn),
            h.pdcp.ul_count()
        );
    }

    #[test]
    fn tx_sns_are_sequential() {
        let h = um_drb(SnLen::Sn12);
        for _ in 0..5 {
            h.pdcp
                .write_sdu(PduBuf::from_slice(&[0]).unwrap(), false)
                .unwrap();
        }
        let mut sdus = h.rlc.sdus.lock();
        for (i, pdu) in sdus.iter_mut().enumerate() {
            assert_eq!(framing::unpack_data_pdu_long_sn(pdu).unwrap(), i as u32);
        }
    }

    #[test]
    fn concurrent_tx_assigns_each_sn_once() {
        let h = bearer(PdcpConfig::drb(1, SnLen::Sn12), true);
        let pdcp = Arc::new(h.pdcp);

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let pdcp = pdcp.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        pdcp.write_sdu(PduBuf::from_slice(&[0]).unwrap(), false)
                            .unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(pdcp.ul_count(), 100);
        let mut sns: Vec<u32> = h
            .rlc
            .sdus
            .lock()
            .iter_mut()
            .map(|pdu| framing::unpack_data_pdu_long_sn(pdu).unwrap())
            .collect();
        sns.sort();
        let expected: Vec<u32> = (0..100).collect();
        assert_eq!(sns, expected);
    }
}

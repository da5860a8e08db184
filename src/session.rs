//! One emulated printer session on the link.
//!
//! [`GbLink`] has two halves. [`GbLink::on_byte`] runs in the transport's
//! interrupt context for every exchanged byte and only frames packets. The
//! `check_*` methods run from the host's main loop and do everything else:
//! applying commands, logging, updating the display and supervising timing.
//! A completed packet crosses from one side to the other through a single
//! slot mailbox.
//!
//! Both halves take `&mut self`, so a host that really runs them on separate
//! contexts wraps the session in whatever critical section it has.

use std::time::Instant;

use log::{debug, error, warn};

use crate::{
    display::StatusDisplay,
    error::Error,
    link::{LinkState, PacketAssembler},
    packet::Packet,
    status::{DeviceStatus, DeviceStatusMachine, PacketEvent},
    store::PacketStore,
    supervisor::{LinkSupervisor, LinkTimings, LinkTransport},
};

pub struct GbLink {
    assembler: PacketAssembler,
    machine: DeviceStatusMachine,
    store: PacketStore,
    supervisor: LinkSupervisor,
    pending: Option<Packet>,
    overwritten_packets: u32,
}

impl GbLink {
    pub fn new(now: Instant) -> Self {
        Self::with_parts(now, PacketStore::new(), LinkTimings::default())
    }

    pub fn with_parts(now: Instant, store: PacketStore, timings: LinkTimings) -> Self {
        GbLink {
            assembler: PacketAssembler::new(),
            machine: DeviceStatusMachine::new(),
            store,
            supervisor: LinkSupervisor::with_timings(now, timings),
            pending: None,
            overwritten_packets: 0,
        }
    }

    /// Exchange one byte with the handheld and return the reply to latch.
    pub fn on_byte(&mut self, rx: u8) -> u8 {
        let (reply, packet) = self.assembler.handle_byte(rx, self.machine.status());
        if let Some(packet) = packet {
            if self.pending.replace(packet).is_some() {
                self.overwritten_packets = self.overwritten_packets.wrapping_add(1);
            }
        }
        reply
    }

    /// Handle the packet waiting in the mailbox, if any.
    ///
    /// Returns what the packet did, or `None` when there was nothing to do or
    /// the packet was rejected.
    pub fn check_handle_packet<D: StatusDisplay>(
        &mut self,
        now: Instant,
        display: &mut D,
    ) -> Option<PacketEvent> {
        if let Some(err) = self.assembler.take_error() {
            warn!("{} ({} framing errors so far)", err, self.assembler.protocol_errors());
        }

        let packet = self.pending.take()?;
        if !packet.checksum_matches() {
            warn!(
                "Checksum mismatch: received 0x{:04X}, calculated 0x{:04X}",
                packet.checksum,
                packet.calculated_checksum()
            );
        }

        let result = self.machine.on_packet_complete(&packet, &mut self.store);
        self.supervisor.touch(now);

        match result {
            Ok(event) => {
                if let PacketEvent::Stored { count } = event {
                    if count == 1 {
                        display.clear();
                        display.print("Packet 1");
                    } else {
                        display.set_cursor(7, 0);
                        display.print(&count.to_string());
                    }
                }
                Some(event)
            }
            Err(Error::BufferFull { capacity }) => {
                error!("Packet store full at {} packets, dropping print", capacity);
                self.store.clear();
                self.machine.reset();
                display.clear();
                display.print("Buffer full");
                None
            }
            Err(err) => {
                warn!("Ignoring packet: {}", err);
                None
            }
        }
    }

    /// True once a complete image has arrived and the link has gone quiet.
    pub fn check_print_ready(&mut self, now: Instant) -> bool {
        self.supervisor
            .check_print_ready(now, self.machine.end_of_print_data_mut())
    }

    /// Reset everything when the handheld has stopped talking mid-session.
    ///
    /// Returns true when a reset happened.
    pub fn check_timeout<T, D>(&mut self, now: Instant, transport: &mut T, display: &mut D) -> bool
    where
        T: LinkTransport,
        D: StatusDisplay,
    {
        if !self.supervisor.check_timeout(now) {
            return false;
        }
        warn!("Printer timeout, resetting link");
        transport.shutdown();
        self.reset();
        display.clear();
        display.print("Ready");
        transport.startup();
        true
    }

    /// Forget all link, status and image state.
    pub fn reset(&mut self) {
        debug!("Resetting link session");
        self.assembler.reset();
        self.machine.reset();
        self.store.clear();
        self.pending = None;
    }

    /// Restart the quiet-time and timeout clocks from `now`.
    pub fn touch(&mut self, now: Instant) {
        self.supervisor.touch(now);
    }

    pub fn status(&self) -> DeviceStatus {
        self.machine.status()
    }

    pub fn state(&self) -> LinkState {
        self.assembler.state()
    }

    pub fn machine(&self) -> &DeviceStatusMachine {
        &self.machine
    }

    pub fn store(&self) -> &PacketStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PacketStore {
        &mut self.store
    }

    pub fn last_packet_time(&self) -> Instant {
        self.supervisor.last_packet_time()
    }

    /// Framing faults seen since the session was created.
    pub fn protocol_errors(&self) -> u32 {
        self.assembler.protocol_errors()
    }

    /// Packets replaced in the mailbox before the main loop picked them up.
    pub fn overwritten_packets(&self) -> u32 {
        self.overwritten_packets
    }
}

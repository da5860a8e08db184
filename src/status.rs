//! Emulated device status register and command handling.
//!
//! The handheld only ever sees the status byte, so the "printing" phase is
//! faked: a Print command starts a short countdown that Status polls drain,
//! after which the device reports it has finished. The real conversion and
//! print run later, once the link has gone quiet.

use log::{debug, info};

use crate::{
    error::Error,
    packet::{Command, Packet},
    store::PacketStore,
};

/// Status polls answered with "printing" before reporting "finishing".
pub const FAKE_PRINT_TICKS: u8 = 5;

/// Status byte reported to the handheld.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Idle,
    ReceivingData,
    Printing,
    Finishing,
}

impl DeviceStatus {
    pub fn code(&self) -> u8 {
        match self {
            Self::Idle => 0x00,
            Self::ReceivingData => 0x08,
            Self::Printing => 0x06,
            Self::Finishing => 0x04,
        }
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// What a completed packet did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketEvent {
    /// Init or Break; `cleared` tells whether the store was emptied.
    Reset { cleared: bool },
    /// A zero length Data packet marking the end of the image data.
    EndOfData,
    /// A Data packet was stored; `count` packets are now held.
    Stored { count: usize },
    /// A Print command; `end_of_print_data` is false when more parts follow.
    PrintRequested { end_of_print_data: bool },
    Status(DeviceStatus),
}

#[derive(Debug, Default)]
pub struct DeviceStatusMachine {
    status: DeviceStatus,
    fake_print_ticks: u8,
    end_of_print_data: bool,
    continuation: bool,
}

impl DeviceStatusMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    pub fn fake_print_ticks(&self) -> u8 {
        self.fake_print_ticks
    }

    pub fn end_of_print_data(&self) -> bool {
        self.end_of_print_data
    }

    /// The latched end-of-print flag, for the supervisor to consume.
    pub fn end_of_print_data_mut(&mut self) -> &mut bool {
        &mut self.end_of_print_data
    }

    /// Whether the last Print announced that more parts follow.
    pub fn awaiting_continuation(&self) -> bool {
        self.continuation
    }

    /// Return to idle and forget any print in progress.
    pub fn reset(&mut self) {
        self.status = DeviceStatus::Idle;
        self.fake_print_ticks = 0;
        self.end_of_print_data = false;
        self.continuation = false;
    }

    /// Apply a completed packet.
    ///
    /// Data packets are copied into `store`. On [`Error::BufferFull`] the
    /// store is left untouched and the status is not advanced.
    pub fn on_packet_complete(
        &mut self,
        packet: &Packet,
        store: &mut PacketStore,
    ) -> Result<PacketEvent, Error> {
        let command = packet.command()?;
        debug!(
            "Packet type: {:?}, Printer status: {:?}, Print ticks: {}",
            command, self.status, self.fake_print_ticks
        );

        let event = match command {
            Command::Init | Command::Break => {
                // An Init that follows a "more parts" Print continues the
                // same image; Break always abandons it.
                let cleared = command == Command::Break || !self.continuation;
                if cleared {
                    store.clear();
                }
                self.status = DeviceStatus::Idle;
                self.fake_print_ticks = 0;
                self.continuation = false;
                PacketEvent::Reset { cleared }
            }
            Command::Data if packet.data_length == 0 => {
                debug!("Received stop data packet");
                PacketEvent::EndOfData
            }
            Command::Data => {
                store.append(packet)?;
                self.status = DeviceStatus::ReceivingData;
                PacketEvent::Stored { count: store.len() }
            }
            Command::Print => {
                self.status = DeviceStatus::Printing;
                self.fake_print_ticks = FAKE_PRINT_TICKS;
                // low nibble of the margin byte is the bottom margin; zero
                // means the image continues in the next print
                if packet.payload[1] % 16 == 0 {
                    info!("This is not the end of a print");
                    self.end_of_print_data = false;
                    self.continuation = true;
                } else {
                    info!("Will be end of print");
                    self.end_of_print_data = true;
                    self.continuation = false;
                }
                PacketEvent::PrintRequested {
                    end_of_print_data: self.end_of_print_data,
                }
            }
            Command::Status => {
                match self.status {
                    DeviceStatus::Printing => {
                        self.fake_print_ticks = self.fake_print_ticks.saturating_sub(1);
                        if self.fake_print_ticks == 0 {
                            self.status = DeviceStatus::Finishing;
                        }
                    }
                    DeviceStatus::Finishing => self.status = DeviceStatus::Idle,
                    _ => {}
                }
                PacketEvent::Status(self.status)
            }
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PACKET_SIZE;

    fn print_packet(margin: u8) -> Packet {
        Packet::with_payload(Command::Print, false, &[0x01, margin, 0xE4, 0x40]).unwrap()
    }

    fn data_packet() -> Packet {
        Packet::with_payload(Command::Data, false, &[0x55; PACKET_SIZE]).unwrap()
    }

    fn status_packet() -> Packet {
        Packet::with_payload(Command::Status, false, &[]).unwrap()
    }

    #[test]
    fn data_packet_is_stored_and_sets_receiving() {
        let mut machine = DeviceStatusMachine::new();
        let mut store = PacketStore::new();
        let event = machine.on_packet_complete(&data_packet(), &mut store).unwrap();
        assert_eq!(event, PacketEvent::Stored { count: 1 });
        assert_eq!(machine.status(), DeviceStatus::ReceivingData);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn stop_packet_changes_nothing() {
        let mut machine = DeviceStatusMachine::new();
        let mut store = PacketStore::new();
        machine.on_packet_complete(&data_packet(), &mut store).unwrap();
        let stop = Packet::with_payload(Command::Data, false, &[]).unwrap();
        let event = machine.on_packet_complete(&stop, &mut store).unwrap();
        assert_eq!(event, PacketEvent::EndOfData);
        assert_eq!(machine.status(), DeviceStatus::ReceivingData);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn print_countdown_then_finishing_then_idle() {
        let mut machine = DeviceStatusMachine::new();
        let mut store = PacketStore::new();
        machine.on_packet_complete(&print_packet(0x13), &mut store).unwrap();
        assert_eq!(machine.status(), DeviceStatus::Printing);
        assert!(machine.end_of_print_data());

        for _ in 0..FAKE_PRINT_TICKS - 1 {
            machine.on_packet_complete(&status_packet(), &mut store).unwrap();
            assert_eq!(machine.status(), DeviceStatus::Printing);
        }
        machine.on_packet_complete(&status_packet(), &mut store).unwrap();
        assert_eq!(machine.status(), DeviceStatus::Finishing);
        let event = machine.on_packet_complete(&status_packet(), &mut store).unwrap();
        assert_eq!(event, PacketEvent::Status(DeviceStatus::Idle));
    }

    #[test]
    fn zero_bottom_margin_means_more_parts_follow() {
        let mut machine = DeviceStatusMachine::new();
        let mut store = PacketStore::new();
        let event = machine.on_packet_complete(&print_packet(0x10), &mut store).unwrap();
        assert_eq!(
            event,
            PacketEvent::PrintRequested {
                end_of_print_data: false
            }
        );
        assert!(machine.awaiting_continuation());
    }

    #[test]
    fn init_keeps_store_only_when_continuing() {
        let mut machine = DeviceStatusMachine::new();
        let mut store = PacketStore::new();
        let init = Packet::with_payload(Command::Init, false, &[]).unwrap();

        machine.on_packet_complete(&data_packet(), &mut store).unwrap();
        machine.on_packet_complete(&print_packet(0x00), &mut store).unwrap();
        let event = machine.on_packet_complete(&init, &mut store).unwrap();
        assert_eq!(event, PacketEvent::Reset { cleared: false });
        assert_eq!(store.len(), 1);

        let event = machine.on_packet_complete(&init, &mut store).unwrap();
        assert_eq!(event, PacketEvent::Reset { cleared: true });
        assert!(store.is_empty());
        assert_eq!(machine.status(), DeviceStatus::Idle);
    }

    #[test]
    fn break_always_clears() {
        let mut machine = DeviceStatusMachine::new();
        let mut store = PacketStore::new();
        machine.on_packet_complete(&data_packet(), &mut store).unwrap();
        machine.on_packet_complete(&print_packet(0x00), &mut store).unwrap();
        let brk = Packet::with_payload(Command::Break, false, &[]).unwrap();
        let event = machine.on_packet_complete(&brk, &mut store).unwrap();
        assert_eq!(event, PacketEvent::Reset { cleared: true });
        assert!(store.is_empty());
    }

    #[test]
    fn buffer_full_keeps_status() {
        let mut machine = DeviceStatusMachine::new();
        let mut store = PacketStore::with_capacity(1);
        machine.on_packet_complete(&data_packet(), &mut store).unwrap();
        machine.on_packet_complete(&print_packet(0x13), &mut store).unwrap();
        match machine.on_packet_complete(&data_packet(), &mut store) {
            Err(Error::BufferFull { capacity: 1 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(machine.status(), DeviceStatus::Printing);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_command_is_reported() {
        let mut machine = DeviceStatusMachine::new();
        let mut store = PacketStore::new();
        let mut packet = status_packet();
        packet.command = 0x7F;
        assert!(matches!(
            machine.on_packet_complete(&packet, &mut store),
            Err(Error::UnknownCommand(0x7F))
        ));
    }
}

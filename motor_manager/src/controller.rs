//! Slave binding: one drive mapped onto one transport slave.
//!
//! A binding resolves every cyclic entry of its drive to a byte offset in
//! the transport's process image during `configure()`. Afterwards the
//! offsets never change and each cycle only reads or writes at them.
//!
//! The binding holds no reference to its drive or transport. Both live in
//! arenas owned by the manager; the binding stores their indices and gets
//! them passed in per call.

use motor_common::consts::MAX_COMMAND_TARGETS;
use motor_common::entry::{Entry, InterfaceId, read_value, write_value};
use motor_common::error::{ConfigurationError, LinkError, ProtocolError};
use motor_common::motor::cia402::StatusWord;
use motor_common::motor::drive::MotorDrive;
use motor_common::motor::transport::Transport;
use motor_common::motor::types::{
    CommandRecord, Direction, DriveId, FeedbackRecord, MasterId, SlaveHandle, SlaveIdentity,
};
use tracing::{debug, info};

/// A cyclic entry and where it lives in the process image.
#[derive(Debug, Clone, Copy)]
struct MappedEntry {
    entry: Entry,
    offset: usize,
}

/// Offset table built by `configure()`.
#[derive(Debug, Clone)]
struct SlaveMap {
    handle: SlaveHandle,
    commands: Vec<MappedEntry>,
    feedback: Vec<MappedEntry>,
    control_word: usize,
    status_word: usize,
}

impl SlaveMap {
    fn command(&self, id: u8) -> Option<&MappedEntry> {
        self.commands.iter().find(|m| m.entry.id == id)
    }
}

/// Binding between a drive and a transport slave.
#[derive(Debug, Clone)]
pub struct SlaveBinding {
    index: usize,
    master_id: MasterId,
    drive_id: DriveId,
    transport: usize,
    drive: usize,
    identity: SlaveIdentity,
    map: Option<SlaveMap>,
}

impl SlaveBinding {
    /// Unconfigured binding.
    ///
    /// `transport` and `drive` are indices into the manager's arenas.
    pub fn new(
        index: usize,
        master_id: MasterId,
        drive_id: DriveId,
        transport: usize,
        drive: usize,
        identity: SlaveIdentity,
    ) -> Self {
        Self {
            index,
            master_id,
            drive_id,
            transport,
            drive,
            identity,
            map: None,
        }
    }

    /// Position of the binding in the fleet.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Master owning the slave.
    pub fn master_id(&self) -> MasterId {
        self.master_id
    }

    /// Bound drive.
    pub fn drive_id(&self) -> DriveId {
        self.drive_id
    }

    /// Transport arena index.
    pub fn transport(&self) -> usize {
        self.transport
    }

    /// Drive arena index.
    pub fn drive(&self) -> usize {
        self.drive
    }

    /// Slave address.
    pub fn identity(&self) -> &SlaveIdentity {
        &self.identity
    }

    /// Transport handle, once configured.
    pub fn handle(&self) -> Option<SlaveHandle> {
        self.map.as_ref().map(|m| m.handle)
    }

    /// True after a successful `configure()`.
    pub fn is_configured(&self) -> bool {
        self.map.is_some()
    }

    /// Registered offset of a cyclic interface.
    pub fn offset_of(&self, id: u8) -> Option<usize> {
        let map = self.map.as_ref()?;
        map.commands
            .iter()
            .chain(&map.feedback)
            .find(|m| m.entry.id == id)
            .map(|m| m.offset)
    }

    fn link_error(&self, source: LinkError) -> ConfigurationError {
        ConfigurationError::Transport {
            master_id: self.master_id,
            position: self.identity.position,
            source,
        }
    }

    fn drive_error(&self, message: String) -> ConfigurationError {
        ConfigurationError::Drive {
            drive_id: self.drive_id,
            message,
        }
    }

    /// Check a cyclic entry against the direction it was listed in.
    fn check_entry(&self, entry: &Entry, direction: Direction) -> Result<(), ConfigurationError> {
        let Some(id) = InterfaceId::from_u8(entry.id) else {
            // Dispatch rejects it at runtime.
            debug!(
                "Drive {}: cyclic entry {} (0x{:04X}:{}) has no interface",
                self.drive_id, entry.id, entry.index, entry.subindex
            );
            return Ok(());
        };

        let in_group = match direction {
            Direction::Output => id.is_command(),
            Direction::Input => id.is_feedback(),
        };
        if !in_group {
            return Err(self.drive_error(format!(
                "interface {:?} (id {}) listed in the {} group",
                id,
                entry.id,
                match direction {
                    Direction::Output => "command",
                    Direction::Input => "feedback",
                }
            )));
        }

        if let Some(expected) = id.wire_type()
            && expected != entry.value_type
        {
            return Err(self.drive_error(format!(
                "interface {:?} (0x{:04X}:{}) declared {}, expected {}",
                id, entry.index, entry.subindex, entry.value_type, expected
            )));
        }
        Ok(())
    }

    fn register(
        &self,
        transport: &mut dyn Transport,
        handle: SlaveHandle,
        entries: &[Entry],
        direction: Direction,
    ) -> Result<Vec<MappedEntry>, ConfigurationError> {
        let mut mapped: Vec<MappedEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            self.check_entry(entry, direction)?;
            if mapped.iter().any(|m| m.entry.id == entry.id) {
                return Err(self.drive_error(format!("interface id {} mapped twice", entry.id)));
            }
            let offset = transport
                .register_offset(handle, entry.index, entry.subindex, direction)
                .map_err(|e| self.link_error(e))?;
            mapped.push(MappedEntry {
                entry: *entry,
                offset,
            });
        }
        Ok(mapped)
    }

    /// Attach the slave, negotiate its layout, register every cyclic entry
    /// and push the drive's one-time configuration entries.
    ///
    /// # Errors
    /// `ConfigurationError::Transport` when the transport rejects the slave,
    /// the layout or an offset; `ConfigurationError::Drive` when the cyclic
    /// entries are inconsistent.
    pub fn configure(
        &mut self,
        transport: &mut dyn Transport,
        drive: &dyn MotorDrive,
    ) -> Result<(), ConfigurationError> {
        let handle = transport
            .attach_slave(&self.identity)
            .map_err(|e| self.link_error(e))?;

        let layout = drive.cyclic_layout();
        transport
            .configure_layout(handle, &layout.slave_layout())
            .map_err(|e| self.link_error(e))?;

        let commands = self.register(transport, handle, &layout.commands, Direction::Output)?;
        let feedback = self.register(transport, handle, &layout.feedback, Direction::Input)?;

        let offset = |group: &[MappedEntry], id: InterfaceId| {
            group.iter().find(|m| m.entry.id == id.as_u8()).map(|m| m.offset)
        };
        let control_word = offset(&commands, InterfaceId::ControlWord)
            .ok_or_else(|| self.drive_error("no control word in the command group".to_string()))?;
        let status_word = offset(&feedback, InterfaceId::StatusWord)
            .ok_or_else(|| self.drive_error("no status word in the feedback group".to_string()))?;

        for entry in drive.configuration_entries() {
            transport
                .submit_configuration_value(handle, entry)
                .map_err(|e| self.link_error(e))?;
        }

        info!(
            "Binding {}: drive {} on master {} slave {}:{}, {} commands, {} feedback, {} configuration values",
            self.index,
            self.drive_id,
            self.master_id,
            self.identity.alias,
            self.identity.position,
            commands.len(),
            feedback.len(),
            drive.configuration_entries().len()
        );

        self.map = Some(SlaveMap {
            handle,
            commands,
            feedback,
            control_word,
            status_word,
        });
        Ok(())
    }

    fn map(&self) -> Result<&SlaveMap, ProtocolError> {
        self.map.as_ref().ok_or(ProtocolError::NotConfigured(self.index))
    }

    /// One enable step; returns true once the drive is operation-enabled.
    pub fn servo_on(&self, buf: &mut [u8], drive: &mut dyn MotorDrive) -> Result<bool, ProtocolError> {
        let map = self.map()?;
        let status = StatusWord::from_raw(read_value::<u16>(buf, map.status_word)?);
        let step = drive.advance_enable(status);
        if !step.done {
            write_value(buf, map.control_word, step.command.bits())?;
        }
        Ok(step.done)
    }

    /// One disable step; returns true once the drive is switch-on-disabled.
    pub fn servo_off(&self, buf: &mut [u8], drive: &mut dyn MotorDrive) -> Result<bool, ProtocolError> {
        let map = self.map()?;
        let status = StatusWord::from_raw(read_value::<u16>(buf, map.status_word)?);
        let step = drive.advance_disable(status);
        if !step.done {
            write_value(buf, map.control_word, step.command.bits())?;
        }
        Ok(step.done)
    }

    /// Answer the set-point handshake seen in `feedback`.
    pub fn check(
        &self,
        feedback: &FeedbackRecord,
        buf: &mut [u8],
        drive: &dyn MotorDrive,
    ) -> Result<(), ProtocolError> {
        let map = self.map()?;
        if let Some(ack) = drive.is_setpoint_acknowledged(StatusWord::from_raw(feedback.status_word)) {
            write_value(buf, map.control_word, ack.bits())?;
        }
        Ok(())
    }

    /// Encode the requested targets of `command` into the process image.
    ///
    /// Every target is converted and bounds-checked before the first byte
    /// is written, so an error leaves `buf` untouched.
    pub fn write(
        &self,
        command: &CommandRecord,
        buf: &mut [u8],
        drive: &dyn MotorDrive,
    ) -> Result<(), ProtocolError> {
        let map = self.map()?;
        let mut staged: heapless::Vec<MappedEntry, MAX_COMMAND_TARGETS> = heapless::Vec::new();

        for &id in &command.targets {
            let unsupported = ProtocolError::UnsupportedInterface {
                binding: self.index,
                id,
            };
            let interface = InterfaceId::from_u8(id)
                .filter(|i| i.is_command())
                .ok_or(unsupported.clone())?;
            let slot = map.command(id).ok_or(ProtocolError::UnmappedInterface {
                binding: self.index,
                id,
            })?;

            let (index, subindex) = (slot.entry.index, slot.entry.subindex);
            let out_of_range = ProtocolError::TargetOutOfRange {
                binding: self.index,
                id,
            };
            let entry = match interface {
                InterfaceId::ControlWord => Entry::new(id, index, subindex, command.control_word),
                InterfaceId::TargetPosition => drive
                    .physical_to_position(command.position)
                    .map(|raw| Entry::new(id, index, subindex, raw))
                    .ok_or(out_of_range)?,
                InterfaceId::TargetVelocity => drive
                    .physical_to_velocity(command.velocity)
                    .map(|raw| Entry::new(id, index, subindex, raw))
                    .ok_or(out_of_range)?,
                InterfaceId::TargetTorque => drive
                    .physical_to_torque(command.torque)
                    .map(|raw| Entry::new(id, index, subindex, raw))
                    .ok_or(out_of_range)?,
                _ => return Err(unsupported),
            };

            let width = entry.byte_size();
            if slot.offset + width > buf.len() {
                return Err(ProtocolError::OutOfBounds {
                    offset: slot.offset,
                    width,
                    len: buf.len(),
                });
            }
            staged
                .push(MappedEntry {
                    entry,
                    offset: slot.offset,
                })
                .map_err(|_| ProtocolError::TooManyTargets(MAX_COMMAND_TARGETS))?;
        }

        for mapped in &staged {
            mapped.entry.write_to(buf, mapped.offset)?;
        }
        Ok(())
    }

    /// Decode every feedback entry into `out`.
    ///
    /// `out` is only updated when all entries decode.
    pub fn read(
        &self,
        out: &mut FeedbackRecord,
        buf: &[u8],
        drive: &dyn MotorDrive,
    ) -> Result<(), ProtocolError> {
        let map = self.map()?;
        let mut record = FeedbackRecord {
            binding: self.index,
            ..FeedbackRecord::default()
        };

        for mapped in &map.feedback {
            let value = mapped.entry.read_from(buf, mapped.offset)?;
            match InterfaceId::from_u8(value.id) {
                Some(InterfaceId::StatusWord) => record.status_word = value.get::<u16>(),
                Some(InterfaceId::ErrorCode) => record.error_code = value.get::<u16>(),
                Some(InterfaceId::CurrentPosition) => {
                    record.position = drive.position_to_physical(value.get::<i32>())
                }
                Some(InterfaceId::CurrentVelocity) => {
                    record.velocity = drive.velocity_to_physical(value.get::<i32>())
                }
                Some(InterfaceId::CurrentTorque) => {
                    record.torque = drive.torque_to_physical(value.get::<i16>())
                }
                _ => {
                    return Err(ProtocolError::UnsupportedInterface {
                        binding: self.index,
                        id: value.id,
                    });
                }
            }
        }

        *out = record;
        Ok(())
    }
}

//! Simulated transport implementation.
//!
//! Offsets are packed in registration order into one process image that is
//! allocated at activation. `transmit_cycle` hands outputs to the devices;
//! `receive_cycle` ticks them and publishes their inputs.

use super::device::Cia402Device;
use motor_common::entry::Entry;
use motor_common::error::LinkError;
use motor_common::motor::config::MasterConfig;
use motor_common::motor::transport::Transport;
use motor_common::motor::types::{
    Direction, MasterId, SlaveHandle, SlaveHealth, SlaveIdentity, SlaveLayout, TransportHealth,
};
use tracing::{debug, info, warn};

/// One attached slave.
struct SimulatedSlave {
    identity: SlaveIdentity,
    layout: Option<SlaveLayout>,
    device: Cia402Device,
}

/// One registered cyclic object.
#[derive(Debug, Clone, Copy)]
struct Registration {
    slave: usize,
    index: u16,
    subindex: u8,
    direction: Direction,
    offset: usize,
    width: usize,
}

/// In-memory fieldbus master.
pub struct SimulatedTransport {
    config: MasterConfig,
    initialized: bool,
    active: bool,
    link_lost: bool,
    slaves: Vec<SimulatedSlave>,
    registrations: Vec<Registration>,
    image_size: usize,
    image: Vec<u8>,
    cycles: u64,
}

impl SimulatedTransport {
    /// Transport for one configured master.
    pub fn new(config: MasterConfig) -> Self {
        Self {
            config,
            initialized: false,
            active: false,
            link_lost: false,
            slaves: Vec::new(),
            registrations: Vec::new(),
            image_size: 0,
            image: Vec::new(),
            cycles: 0,
        }
    }

    /// Emulated device behind a handle.
    pub fn device(&self, slave: SlaveHandle) -> Option<&Cia402Device> {
        self.slaves.get(slave.0).map(|s| &s.device)
    }

    /// Size of the process image [bytes].
    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// Received cycles since activation.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn ensure_configurable(&self) -> Result<(), LinkError> {
        if !self.initialized {
            return Err(LinkError::NotInitialized);
        }
        if self.active {
            return Err(LinkError::AlreadyActive);
        }
        Ok(())
    }

    fn slave_mut(&mut self, slave: SlaveHandle) -> Result<&mut SimulatedSlave, LinkError> {
        self.slaves
            .get_mut(slave.0)
            .ok_or(LinkError::InvalidSlave(slave.0))
    }

    fn new_device(&self, position: u16) -> Cia402Device {
        let options = &self.config.simulation;
        if options.fault_slaves.contains(&position) {
            Cia402Device::faulted()
        } else if options.stuck_slaves.contains(&position) {
            Cia402Device::stuck()
        } else {
            Cia402Device::new()
        }
    }
}

impl Transport for SimulatedTransport {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn id(&self) -> MasterId {
        self.config.id
    }

    fn initialize(&mut self) -> Result<(), LinkError> {
        if self.active {
            return Err(LinkError::AlreadyActive);
        }
        self.initialized = true;
        info!(
            "Master {}: simulated ring with {} slaves (index {})",
            self.config.id, self.config.number_of_slaves, self.config.master_index
        );
        Ok(())
    }

    fn activate(&mut self) -> Result<(), LinkError> {
        self.ensure_configurable()?;
        self.image = vec![0; self.image_size];
        self.active = true;
        self.link_lost = false;
        self.cycles = 0;
        info!(
            "Master {}: activated, {} bytes process data, {} objects",
            self.config.id,
            self.image_size,
            self.registrations.len()
        );
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), LinkError> {
        if self.active {
            info!("Master {}: deactivated after {} cycles", self.config.id, self.cycles);
        }
        self.active = false;
        Ok(())
    }

    fn attach_slave(&mut self, identity: &SlaveIdentity) -> Result<SlaveHandle, LinkError> {
        self.ensure_configurable()?;
        if identity.position >= self.config.number_of_slaves {
            return Err(LinkError::SlaveNotFound {
                alias: identity.alias,
                position: identity.position,
            });
        }
        if let Some(existing) = self
            .slaves
            .iter()
            .position(|s| (s.identity.alias, s.identity.position) == (identity.alias, identity.position))
        {
            return Ok(SlaveHandle(existing));
        }

        let device = self.new_device(identity.position);
        self.slaves.push(SimulatedSlave {
            identity: *identity,
            layout: None,
            device,
        });
        debug!(
            "Master {}: attached slave {}:{} (vendor 0x{:08X}, product 0x{:08X})",
            self.config.id, identity.alias, identity.position, identity.vendor_id, identity.product_code
        );
        Ok(SlaveHandle(self.slaves.len() - 1))
    }

    fn configure_layout(&mut self, slave: SlaveHandle, layout: &SlaveLayout) -> Result<(), LinkError> {
        self.ensure_configurable()?;
        for entry in layout.outputs.entries.iter().chain(&layout.inputs.entries) {
            if entry.bit_length == 0 || entry.bit_length > 32 || entry.bit_length % 8 != 0 {
                return Err(LinkError::LayoutRejected(format!(
                    "0x{:04X}:{} has {} bits",
                    entry.index, entry.subindex, entry.bit_length
                )));
            }
        }
        self.slave_mut(slave)?.layout = Some(layout.clone());
        Ok(())
    }

    fn register_offset(
        &mut self,
        slave: SlaveHandle,
        index: u16,
        subindex: u8,
        direction: Direction,
    ) -> Result<usize, LinkError> {
        self.ensure_configurable()?;
        let not_mapped = LinkError::EntryNotMapped { index, subindex };
        let layout = self
            .slaves
            .get(slave.0)
            .ok_or(LinkError::InvalidSlave(slave.0))?
            .layout
            .as_ref()
            .ok_or_else(|| not_mapped.clone())?;
        let pdo_entry = layout
            .mapping(direction)
            .entries
            .iter()
            .find(|e| (e.index, e.subindex) == (index, subindex))
            .ok_or(not_mapped)?;
        let width = usize::from(pdo_entry.bit_length / 8);

        if let Some(existing) = self.registrations.iter().find(|r| {
            r.slave == slave.0 && r.index == index && r.subindex == subindex && r.direction == direction
        }) {
            return Ok(existing.offset);
        }

        let offset = self.image_size;
        self.image_size += width;
        self.registrations.push(Registration {
            slave: slave.0,
            index,
            subindex,
            direction,
            offset,
            width,
        });
        Ok(offset)
    }

    fn submit_configuration_value(&mut self, slave: SlaveHandle, entry: &Entry) -> Result<(), LinkError> {
        self.ensure_configurable()?;
        self.slave_mut(slave)?.device.configure(*entry);
        Ok(())
    }

    fn transmit_cycle(&mut self) -> Result<(), LinkError> {
        if !self.active {
            return Err(LinkError::NotActivated);
        }
        if self.link_lost {
            return Err(LinkError::Send("link down".to_string()));
        }
        for reg in self.registrations.iter().filter(|r| r.direction == Direction::Output) {
            let mut bytes = [0u8; 4];
            bytes[..reg.width].copy_from_slice(&self.image[reg.offset..reg.offset + reg.width]);
            self.slaves[reg.slave]
                .device
                .write_object(reg.index, reg.subindex, &bytes);
        }
        Ok(())
    }

    fn receive_cycle(&mut self) -> Result<(), LinkError> {
        if !self.active {
            return Err(LinkError::NotActivated);
        }
        if let Some(limit) = self.config.simulation.fail_receive_after
            && self.cycles >= limit
        {
            if !self.link_lost {
                warn!("Master {}: simulated link loss after {} cycles", self.config.id, limit);
            }
            self.link_lost = true;
            return Err(LinkError::Receive(format!("no frames after {limit} cycles")));
        }
        self.cycles += 1;

        for slave in &mut self.slaves {
            slave.device.tick();
        }
        for reg in self.registrations.iter().filter(|r| r.direction == Direction::Input) {
            let bytes = self.slaves[reg.slave].device.read_object(reg.index, reg.subindex);
            self.image[reg.offset..reg.offset + reg.width].copy_from_slice(&bytes[..reg.width]);
        }
        Ok(())
    }

    fn process_data(&mut self) -> Result<&mut [u8], LinkError> {
        if !self.active {
            return Err(LinkError::NotActivated);
        }
        Ok(&mut self.image)
    }

    fn health(&self) -> TransportHealth {
        let up = self.active && !self.link_lost;
        TransportHealth {
            slaves_responding: if up { self.slaves.len() as u32 } else { 0 },
            link_up: up,
            operational: up,
        }
    }

    fn slave_health(&self, slave: SlaveHandle) -> Option<SlaveHealth> {
        let up = self.active && !self.link_lost;
        self.slaves.get(slave.0).map(|_| SlaveHealth {
            online: up,
            operational: up,
        })
    }
}

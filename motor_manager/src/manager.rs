//! Fleet orchestrator.
//!
//! `MotorManager` owns every transport, drive and slave binding and runs
//! one cycle per `update()` call:
//!
//! 1. receive on every transport
//! 2. stop requested → disable sequence; fleet not enabled → enable
//!    sequence; otherwise read, check and write every binding
//! 3. transmit on every transport
//!
//! Enabling and disabling are all-or-nothing across the fleet. Each binding
//! keeps its own confirmation flag; confirmed bindings are skipped and the
//! fleet flag flips only when every flag is set.

use crate::controller::SlaveBinding;
use crate::policy::{AbortOnLinkError, LinkErrorPolicy, LinkPhase};
use crate::registry::Registry;
use motor_common::error::{ConfigurationError, LinkError, MotorError, ProtocolError};
use motor_common::motor::config::{DriveConfig, ManagerConfig};
use motor_common::motor::drive::MotorDrive;
use motor_common::motor::params::DriveParameters;
use motor_common::motor::transport::Transport;
use motor_common::motor::types::{
    CommandRecord, DriveState, FeedbackRecord, MasterId, SlaveHealth, TransportHealth,
};
use std::path::Path;
use tracing::{debug, info, warn};

/// Owner of the fleet and its cycle.
pub struct MotorManager {
    transports: Vec<Box<dyn Transport>>,
    drives: Vec<Box<dyn MotorDrive>>,
    bindings: Vec<SlaveBinding>,

    /// Per-binding enable confirmation.
    enable_confirmed: Vec<bool>,
    /// Per-binding disable confirmation.
    disable_confirmed: Vec<bool>,
    enabled: bool,
    disabling: bool,

    active: bool,
    period_ns: u32,
    health_interval: u64,
    transport_health: Vec<Option<TransportHealth>>,
    slave_health: Vec<Option<SlaveHealth>>,
    policy: Box<dyn LinkErrorPolicy>,
}

impl MotorManager {
    /// Load `path`, read every drive's parameter file and configure the fleet.
    pub fn load(path: &Path, registry: &Registry) -> Result<Self, MotorError> {
        let config = ManagerConfig::load_from(path)?;
        Self::new(&config, registry)
    }

    /// Configure the fleet, reading parameter files from disk.
    pub fn new(config: &ManagerConfig, registry: &Registry) -> Result<Self, MotorError> {
        Self::with_parameters(config, registry, |drive| {
            DriveParameters::load_for(drive.id, &drive.param_file)
        })
    }

    /// Configure the fleet with parameters supplied by `parameters`.
    ///
    /// Drives are created and loaded first, then every transport is
    /// initialized and every slave bound, all in configuration order.
    /// Nothing is activated.
    pub fn with_parameters<F>(
        config: &ManagerConfig,
        registry: &Registry,
        mut parameters: F,
    ) -> Result<Self, MotorError>
    where
        F: FnMut(&DriveConfig) -> Result<DriveParameters, ConfigurationError>,
    {
        config.validate()?;

        let mut drives = Vec::with_capacity(config.drives.len());
        for drive_config in &config.drives {
            let mut drive = registry.create_drive(drive_config)?;
            drive.load_parameters(&parameters(drive_config)?)?;
            drives.push(drive);
        }

        let mut transports = Vec::with_capacity(config.masters.len());
        for master in &config.masters {
            let mut transport = registry.create_transport(master)?;
            transport.initialize().map_err(|source| MotorError::Link {
                master_id: master.id,
                source,
            })?;
            transports.push(transport);
        }

        let mut bindings = Vec::with_capacity(config.binding_count());
        for (t, master) in config.masters.iter().enumerate() {
            for slave in &master.slaves {
                let d = drives
                    .iter()
                    .position(|drive: &Box<dyn MotorDrive>| drive.id() == slave.drive_id)
                    .ok_or_else(|| {
                        ConfigurationError::ValidationError(format!(
                            "master {} slave {}: unknown drive_id {}",
                            master.id, slave.position, slave.drive_id
                        ))
                    })?;
                let mut binding = SlaveBinding::new(
                    bindings.len(),
                    master.id,
                    slave.drive_id,
                    t,
                    d,
                    slave.identity(),
                );
                binding.configure(transports[t].as_mut(), drives[d].as_ref())?;
                bindings.push(binding);
            }
        }

        let n = bindings.len();
        info!(
            "Motor manager configured: {} masters, {} drives, {} bindings, {:.1} Hz",
            transports.len(),
            drives.len(),
            n,
            config.frequency_hz()
        );

        Ok(Self {
            transport_health: vec![None; transports.len()],
            slave_health: vec![None; n],
            transports,
            drives,
            bindings,
            enable_confirmed: vec![false; n],
            disable_confirmed: vec![false; n],
            enabled: false,
            disabling: false,
            active: false,
            period_ns: config.period_ns,
            health_interval: config.health_interval,
            policy: Box::new(AbortOnLinkError),
        })
    }

    /// Replace the link error policy.
    pub fn with_policy(mut self, policy: Box<dyn LinkErrorPolicy>) -> Self {
        self.policy = policy;
        self
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Activate every transport.
    pub fn start(&mut self) -> Result<(), MotorError> {
        for transport in &mut self.transports {
            transport.activate().map_err(|source| MotorError::Link {
                master_id: transport.id(),
                source,
            })?;
        }
        self.active = true;
        info!("Motor manager started ({} transports)", self.transports.len());
        Ok(())
    }

    /// Deactivate every transport.
    ///
    /// All transports are deactivated even if one fails; the first failure
    /// is returned.
    pub fn stop(&mut self) -> Result<(), MotorError> {
        let mut result = Ok(());
        for transport in &mut self.transports {
            if let Err(source) = transport.deactivate() {
                warn!("Master {}: deactivate failed: {}", transport.id(), source);
                if result.is_ok() {
                    result = Err(MotorError::Link {
                        master_id: transport.id(),
                        source,
                    });
                }
            }
        }
        if self.active {
            info!("Motor manager stopped");
        }
        self.active = false;
        result
    }

    // ─── Cycle ──────────────────────────────────────────────────────

    /// Run one cycle.
    ///
    /// `states` receives one feedback record per binding (only written in
    /// normal cycles). `commands` are routed by their `binding` field;
    /// records without targets are skipped.
    ///
    /// Returns true once every binding has confirmed the disable sequence.
    pub fn update(
        &mut self,
        stop: bool,
        states: &mut [FeedbackRecord],
        commands: &[CommandRecord],
    ) -> Result<bool, MotorError> {
        for transport in &mut self.transports {
            if let Err(error) = transport.receive_cycle() {
                self.policy
                    .on_link_error(transport.id(), LinkPhase::Receive, error)?;
            }
        }

        if stop {
            self.disable_sequence()?;
        } else if !self.enabled {
            self.enable_sequence()?;
        } else {
            self.normal_cycle(states, commands)?;
        }

        for transport in &mut self.transports {
            if let Err(error) = transport.transmit_cycle() {
                self.policy
                    .on_link_error(transport.id(), LinkPhase::Transmit, error)?;
            }
        }

        Ok(self.disabling)
    }

    fn enable_sequence(&mut self) -> Result<(), MotorError> {
        if self.disabling || self.disable_confirmed.contains(&true) {
            debug!("Re-enabling after a disable sequence");
            self.disabling = false;
            self.disable_confirmed.fill(false);
        }

        let mut confirmed = 0;
        for (i, binding) in self.bindings.iter().enumerate() {
            if self.enable_confirmed[i] {
                confirmed += 1;
                continue;
            }
            let buf = process_data(self.transports[binding.transport()].as_mut())?;
            if binding.servo_on(buf, self.drives[binding.drive()].as_mut())? {
                info!("Binding {}: drive {} enabled", i, binding.drive_id());
                self.enable_confirmed[i] = true;
                confirmed += 1;
            }
        }

        if confirmed == self.bindings.len() {
            self.enabled = true;
            info!("All {} drives enabled", confirmed);
        }
        Ok(())
    }

    fn disable_sequence(&mut self) -> Result<(), MotorError> {
        if self.enabled || self.enable_confirmed.contains(&true) {
            debug!("Disable sequence started");
            self.enabled = false;
            self.enable_confirmed.fill(false);
        }

        let mut confirmed = 0;
        for (i, binding) in self.bindings.iter().enumerate() {
            if self.disable_confirmed[i] {
                confirmed += 1;
                continue;
            }
            let buf = process_data(self.transports[binding.transport()].as_mut())?;
            if binding.servo_off(buf, self.drives[binding.drive()].as_mut())? {
                info!("Binding {}: drive {} disabled", i, binding.drive_id());
                self.disable_confirmed[i] = true;
                confirmed += 1;
            }
        }

        if confirmed == self.bindings.len() && !self.disabling {
            self.disabling = true;
            info!("All {} drives disabled", confirmed);
        }
        Ok(())
    }

    fn normal_cycle(
        &mut self,
        states: &mut [FeedbackRecord],
        commands: &[CommandRecord],
    ) -> Result<(), MotorError> {
        let n = self.bindings.len();
        if states.len() < n {
            return Err(ProtocolError::RecordBuffer {
                expected: n,
                actual: states.len(),
            }
            .into());
        }

        for (binding, state) in self.bindings.iter().zip(states.iter_mut()) {
            let buf = process_data(self.transports[binding.transport()].as_mut())?;
            binding.read(state, buf, self.drives[binding.drive()].as_ref())?;
        }

        for (binding, state) in self.bindings.iter().zip(states.iter()) {
            let buf = process_data(self.transports[binding.transport()].as_mut())?;
            binding.check(state, buf, self.drives[binding.drive()].as_ref())?;
        }

        for command in commands.iter().filter(|c| c.has_targets()) {
            let binding = self
                .bindings
                .get(command.binding)
                .ok_or(ProtocolError::UnknownBinding(command.binding))?;
            let buf = process_data(self.transports[binding.transport()].as_mut())?;
            binding.write(command, buf, self.drives[binding.drive()].as_ref())?;
        }
        Ok(())
    }

    // ─── Diagnostics ────────────────────────────────────────────────

    /// Poll transport and slave health, logging every change.
    ///
    /// Returns true if anything changed since the last poll. Never affects
    /// control.
    pub fn check_health(&mut self) -> bool {
        let mut changed = false;

        for (transport, last) in self.transports.iter().zip(self.transport_health.iter_mut()) {
            let health = transport.health();
            if *last != Some(health) {
                if health.link_up && health.operational {
                    info!(
                        "Master {}: link up, {} slaves responding, operational",
                        transport.id(),
                        health.slaves_responding
                    );
                } else {
                    warn!(
                        "Master {}: link_up={} operational={} slaves_responding={}",
                        transport.id(),
                        health.link_up,
                        health.operational,
                        health.slaves_responding
                    );
                }
                *last = Some(health);
                changed = true;
            }
        }

        for (binding, last) in self.bindings.iter().zip(self.slave_health.iter_mut()) {
            let Some(handle) = binding.handle() else {
                continue;
            };
            let health = self.transports[binding.transport()].slave_health(handle);
            if *last != health {
                match health {
                    Some(h) if h.online && h.operational => {
                        info!("Binding {}: slave online and operational", binding.index())
                    }
                    Some(h) => warn!(
                        "Binding {}: slave online={} operational={}",
                        binding.index(),
                        h.online,
                        h.operational
                    ),
                    None => warn!("Binding {}: slave unknown to transport", binding.index()),
                }
                *last = health;
                changed = true;
            }
        }
        changed
    }

    // ─── Accessors ──────────────────────────────────────────────────

    /// Cycle period [ns].
    pub fn period_ns(&self) -> u32 {
        self.period_ns
    }

    /// Cycles between health polls.
    pub fn health_interval(&self) -> u64 {
        self.health_interval
    }

    /// Number of slave bindings.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Binding by fleet index.
    pub fn binding(&self, index: usize) -> Option<&SlaveBinding> {
        self.bindings.get(index)
    }

    /// Handshake state of the drive behind a binding.
    pub fn drive_state(&self, index: usize) -> Option<DriveState> {
        let binding = self.bindings.get(index)?;
        Some(self.drives[binding.drive()].state())
    }

    /// Every binding confirmed the enable sequence.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Every binding confirmed the disable sequence.
    pub fn is_disabled(&self) -> bool {
        self.disabling
    }

    /// Transports are active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Raw process image of a master, if it is active.
    pub fn process_data(&mut self, master_id: MasterId) -> Option<&mut [u8]> {
        self.transports
            .iter_mut()
            .find(|t| t.id() == master_id)?
            .process_data()
            .ok()
    }
}

impl Drop for MotorManager {
    fn drop(&mut self) {
        if self.active
            && let Err(e) = self.stop()
        {
            warn!("Motor manager teardown: {}", e);
        }
    }
}

fn process_data(transport: &mut dyn Transport) -> Result<&mut [u8], MotorError> {
    let master_id = transport.id();
    transport
        .process_data()
        .map_err(|source: LinkError| MotorError::Link { master_id, source })
}

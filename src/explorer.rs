use crate::bus::I2cExplorer;
use crate::config::{FruTypeConfig, I2cDeviceConfig, PlatformConfig, SlotConfig, SlotTypeConfig};
use crate::errors::{ExplorationError, ExplorationResult, I2cError};
use crate::naming::{NamingTable, ROOT_FRU};
use crate::presence::PresenceDetector;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub const CHASSIS_SLOT_NAME: &str = "Chassis_Slot@0";
pub const CHASSIS_FRU_TYPE: &str = "CHASSIS";

/// What happened at one outgoing slot of a FRU
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// Something was plugged in and its subtree was explored
    Explored { fru_type: String },
    /// Nothing plugged in; the subtree was not touched
    Skipped,
}

/// Outcome of one successful exploration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplorationSummary {
    /// FRU names in the order they were explored
    pub frus: Vec<String>,
    /// Kernel nodes newly created by this pass
    pub devices_created: usize,
    pub duration: Duration,
}

/// Discovers the FRUs plugged into the chassis and the kernel buses they use.
///
/// Every call to [`PlatformExplorer::explore`] walks the whole tree with a
/// fresh [`NamingTable`]. The table is published only when the pass succeeds,
/// so a failed pass leaves the previous result intact.
pub struct PlatformExplorer {
    config: PlatformConfig,
    i2c: Box<dyn I2cExplorer>,
    presence: Box<dyn PresenceDetector>,
    kernel_i2c_bus_names: NamingTable,
    last_summary: Option<ExplorationSummary>,
}

impl PlatformExplorer {
    pub fn new(
        config: PlatformConfig,
        i2c: Box<dyn I2cExplorer>,
        presence: Box<dyn PresenceDetector>,
    ) -> Self {
        Self {
            config,
            i2c,
            presence,
            kernel_i2c_bus_names: NamingTable::new(),
            last_summary: None,
        }
    }

    /// Naming table of the last successful pass
    pub fn kernel_i2c_bus_names(&self) -> &NamingTable {
        &self.kernel_i2c_bus_names
    }

    pub fn last_summary(&self) -> Option<&ExplorationSummary> {
        self.last_summary.as_ref()
    }

    /// Runs one complete discovery pass
    pub fn explore(&mut self) -> ExplorationResult<ExplorationSummary> {
        info!(
            "[explorer] Exploring {}",
            self.config.platform_name.as_deref().unwrap_or("the device")
        );
        let started = Instant::now();
        let mut pass = Pass {
            config: &self.config,
            i2c: &*self.i2c,
            presence: &*self.presence,
            table: NamingTable::new(),
            summary: ExplorationSummary::default(),
        };

        if let Err(e) = pass.run() {
            if e.is_logic_error() {
                error!("[explorer] pass aborted by a configuration/ordering defect: {}", e);
            } else {
                error!("[explorer] pass aborted: {}", e);
            }
            return Err(e);
        }

        let Pass { table, mut summary, .. } = pass;
        summary.duration = started.elapsed();
        info!(
            "[explorer] found {} FRU(s), created {} device(s), {} bus mapping(s) in {:?}",
            summary.frus.len(),
            summary.devices_created,
            table.len(),
            summary.duration
        );
        match table.to_json() {
            Ok(json) => debug!("[explorer] kernel i2c bus names: {}", json),
            Err(e) => debug!("[explorer] could not dump bus names: {}", e),
        }

        self.kernel_i2c_bus_names = table;
        self.last_summary = Some(summary.clone());
        Ok(summary)
    }
}

/// State of a single pass
struct Pass<'a> {
    config: &'a PlatformConfig,
    i2c: &'a dyn I2cExplorer,
    presence: &'a dyn PresenceDetector,
    table: NamingTable,
    summary: ExplorationSummary,
}

impl<'a> Pass<'a> {
    fn run(&mut self) -> ExplorationResult<()> {
        let config = self.config;
        let main_board_buses = self
            .i2c
            .buses_from_bsp(&config.i2c_busses_from_main_board)
            .map_err(|e| hardware(ROOT_FRU, "resolving main board buses", e))?;
        for (bus_name, kernel_bus_name) in &main_board_buses {
            self.table.register(ROOT_FRU, bus_name, kernel_bus_name);
        }

        let chassis_slot = &config.chassis_slot_config;
        if !self.is_present(ROOT_FRU, CHASSIS_SLOT_NAME, chassis_slot)? {
            return Err(ExplorationError::ChassisNotPresent);
        }

        self.explore_fru(
            ROOT_FRU,
            CHASSIS_SLOT_NAME,
            chassis_slot,
            CHASSIS_FRU_TYPE,
            &config.chassis_fru_type_config,
        )
    }

    fn explore_fru(
        &mut self,
        parent_fru_name: &str,
        parent_slot_name: &str,
        parent_slot: &'a SlotConfig,
        fru_type_name: &str,
        fru_type_config: &'a FruTypeConfig,
    ) -> ExplorationResult<()> {
        let fru_name = format!("{}::{}/{}", parent_fru_name, parent_slot_name, fru_type_name);
        info!("[explorer] exploring {}", fru_name);

        for (i, bus_name) in parent_slot.outgoing_i2c_bus_names.iter().enumerate() {
            let kernel_bus_name = self.table.resolve(parent_fru_name, bus_name)?.to_string();
            self.table
                .register(&fru_name, &format!("INCOMING@{}", i), &kernel_bus_name);
        }

        self.explore_i2c_devices(&fru_name, &fru_type_config.i2c_device_configs)?;
        self.summary.frus.push(fru_name.clone());

        for (slot_name, slot_config) in &fru_type_config.outgoing_slot_configs {
            match self.explore_slot(&fru_name, slot_name, slot_config)? {
                SlotOutcome::Explored { fru_type } => {
                    debug!("[explorer] {} in {} holds {}", slot_name, fru_name, fru_type)
                }
                SlotOutcome::Skipped => {
                    info!("[explorer] nothing plugged into {} of {}", slot_name, fru_name)
                }
            }
        }
        Ok(())
    }

    fn explore_i2c_devices(&mut self, fru_name: &str, devices: &[I2cDeviceConfig]) -> ExplorationResult<()> {
        for device in devices {
            let bus = self.table.resolve(fru_name, &device.bus_name)?.to_string();
            if !device.is_mux() {
                let created = self
                    .i2c
                    .create_i2c_device(&device.kernel_device_name, &bus, device.address)
                    .map_err(|e| hardware(fru_name, &describe("creating device", device, &bus), e))?;
                self.count(created);
                continue;
            }

            let created = self
                .i2c
                .create_i2c_mux(
                    &device.kernel_device_name,
                    &bus,
                    device.address,
                    device.num_outgoing_channels,
                )
                .map_err(|e| hardware(fru_name, &describe("creating mux", device, &bus), e))?;
            self.count(created);

            let channel_buses = self
                .i2c
                .mux_channel_buses(&bus, device.address)
                .map_err(|e| hardware(fru_name, &describe("reading channels of mux", device, &bus), e))?;
            if channel_buses.len() != device.num_outgoing_channels as usize {
                return Err(ExplorationError::ChannelCountMismatch {
                    fru: fru_name.to_string(),
                    device: device.display_name().to_string(),
                    expected: device.num_outgoing_channels,
                    actual: channel_buses.len(),
                });
            }
            for (channel, kernel_bus_name) in channel_buses.iter().enumerate() {
                self.table.register(
                    fru_name,
                    &format!("{}@{}", device.display_name(), channel),
                    kernel_bus_name,
                );
            }
        }
        Ok(())
    }

    fn explore_slot(
        &mut self,
        fru_name: &str,
        slot_name: &str,
        slot_config: &'a SlotConfig,
    ) -> ExplorationResult<SlotOutcome> {
        if !self.is_present(fru_name, slot_name, slot_config)? {
            return Ok(SlotOutcome::Skipped);
        }

        let config = self.config;
        let slot_type = config
            .slot_type_configs
            .get(&slot_config.slot_type)
            .ok_or_else(|| ExplorationError::UnknownSlotType {
                fru: fru_name.to_string(),
                slot: slot_name.to_string(),
                slot_type: slot_config.slot_type.clone(),
            })?;
        let fru_type = self.identify(fru_name, slot_name, slot_config, slot_type)?;
        let fru_type_config = config.fru_type_configs.get(&fru_type).ok_or_else(|| {
            ExplorationError::UnknownFruType {
                fru: fru_name.to_string(),
                slot: slot_name.to_string(),
                fru_type: fru_type.clone(),
            }
        })?;

        self.explore_fru(fru_name, slot_name, slot_config, &fru_type, fru_type_config)?;
        Ok(SlotOutcome::Explored { fru_type })
    }

    /// Reads the FRU type plugged into a slot from its EEPROM, or takes the
    /// slot type's fixed FRU type.
    fn identify(
        &mut self,
        fru_name: &str,
        slot_name: &str,
        slot_config: &SlotConfig,
        slot_type: &SlotTypeConfig,
    ) -> ExplorationResult<String> {
        let Some(eeprom) = &slot_type.fru_eeprom else {
            return slot_type
                .fru_type
                .clone()
                .ok_or_else(|| ExplorationError::UnidentifiableSlot {
                    slot_type: slot_config.slot_type.clone(),
                });
        };

        let bus_name = slot_config
            .outgoing_i2c_bus_names
            .get(eeprom.incoming_bus_index)
            .ok_or_else(|| ExplorationError::EepromBusOutOfRange {
                fru: fru_name.to_string(),
                slot: slot_name.to_string(),
                index: eeprom.incoming_bus_index,
            })?;
        let bus = self.table.resolve(fru_name, bus_name)?.to_string();
        let operation = format!(
            "reading EEPROM {} at {}@{:#04x} for {}",
            eeprom.kernel_device_name, bus, eeprom.address, slot_name
        );

        let created = self
            .i2c
            .create_i2c_device(&eeprom.kernel_device_name, &bus, eeprom.address)
            .map_err(|e| hardware(fru_name, &operation, e))?;
        self.count(created);
        let eeprom_path = self
            .i2c
            .i2c_path(&bus, eeprom.address)
            .map_err(|e| hardware(fru_name, &operation, e))?;
        self.i2c
            .fru_type_name(&eeprom_path)
            .map_err(|e| hardware(fru_name, &operation, e))
    }

    fn is_present(&self, fru_name: &str, slot_name: &str, slot_config: &SlotConfig) -> ExplorationResult<bool> {
        let Some(detection) = &slot_config.presence_detection else {
            return Ok(true);
        };
        self.presence
            .is_present(detection)
            .map_err(|source| ExplorationError::Presence {
                fru: fru_name.to_string(),
                slot: slot_name.to_string(),
                source,
            })
    }

    fn count(&mut self, created: bool) {
        if created {
            self.summary.devices_created += 1;
        }
    }
}

fn describe(action: &str, device: &I2cDeviceConfig, bus: &str) -> String {
    format!(
        "{} {} ({}) at {}@{:#04x}",
        action,
        device.display_name(),
        device.kernel_device_name,
        bus,
        device.address
    )
}

fn hardware(fru_name: &str, operation: &str, source: I2cError) -> ExplorationError {
    ExplorationError::Hardware {
        fru: fru_name.to_string(),
        operation: operation.to_string(),
        source,
    }
}

use serde_json::Value;
use tracing::{debug, warn};

use crate::connector::Connector;
use crate::program::SwitchProgramStore;
use crate::protocol::{self, CURRENT_SETPOINT, SETPOINT_ON};
use crate::setpoints::SetpointCache;
use crate::types::{
    BusType, DeviceConfig, DeviceTime, OperatingMode, SchemaFlavor, Scheduled, SetpointDefinition,
};
use crate::{Error, Result};

/// Per-circuit schedule state: which switch program is loaded, its points and
/// schema flavor, and the lazily filled setpoint cache. Answers "what is
/// active now" against the device's own clock as sampled at load time.
pub struct ScheduleResolver<C> {
    connector: C,
    config: DeviceConfig,
    circuit_path: String,
    setpoints: SetpointCache,
    program: Option<LoadedProgram>,
}

struct LoadedProgram {
    id: String,
    store: SwitchProgramStore,
    clock: DeviceTime,
    kind: ProgramKind,
}

enum ProgramKind {
    Levels { levels_path: String },
    Absolute,
}

impl LoadedProgram {
    fn flavor(&self) -> SchemaFlavor {
        match self.kind {
            ProgramKind::Levels { .. } => SchemaFlavor::Levels,
            ProgramKind::Absolute => SchemaFlavor::Absolute,
        }
    }
}

/// Outcome of one mode/flavor dispatch, shared by all queries.
enum Resolution {
    /// Auto mode with no local program; defer to the device-reported one.
    DeviceProgram,
    /// Manual mode but the level behind the mode name is unavailable.
    ManualMiss,
    Manual(SetpointDefinition),
    Level { name: String, def: SetpointDefinition },
    Absolute { raw: String, temp: f64 },
}

impl<C: Connector> ScheduleResolver<C> {
    pub fn new(connector: C, config: DeviceConfig, circuit_path: impl Into<String>) -> Self {
        Self {
            connector,
            config,
            circuit_path: circuit_path.into(),
            setpoints: SetpointCache::new(),
            program: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.program.is_some()
    }

    pub fn program_id(&self) -> Option<&str> {
        self.program.as_ref().map(|p| p.id.as_str())
    }

    pub fn schema_flavor(&self) -> Option<SchemaFlavor> {
        self.program.as_ref().map(LoadedProgram::flavor)
    }

    pub fn switch_points(&self) -> Option<&SwitchProgramStore> {
        self.program.as_ref().map(|p| &p.store)
    }

    /// Fetch and install `program_id` as the active program. Samples the
    /// gateway clock once, so the schedule reference time is the device's own.
    /// Any failure leaves the resolver in the no-program state: queries keep
    /// answering with [`Scheduled::ActiveProgram`] until a later load succeeds.
    pub async fn load_program(&mut self, program_id: &str) -> Result<()> {
        match self.fetch_program(program_id).await {
            Ok(loaded) => {
                if loaded.flavor() == SchemaFlavor::Levels {
                    self.setpoints.invalidate_all();
                }
                debug!(
                    program = program_id,
                    points = loaded.store.len(),
                    flavor = ?loaded.flavor(),
                    "switch program loaded"
                );
                self.program = Some(loaded);
                Ok(())
            }
            Err(err) => {
                warn!(
                    program = program_id,
                    error = %err,
                    "switch program load failed, deferring to device-reported program"
                );
                self.program = None;
                Err(err)
            }
        }
    }

    async fn fetch_program(&self, program_id: &str) -> Result<LoadedProgram> {
        let clock_body = self.connector.get(protocol::DATETIME_PATH).await?;
        let clock_str = clock_body
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Protocol("gateway clock response missing value".into()))?;
        let clock = protocol::parse_device_time(clock_str)?;

        let path = protocol::switch_program_path(&self.circuit_path, program_id);
        let raw = protocol::parse_switch_program(self.connector.get(&path).await?)?;

        let mut points = Vec::with_capacity(raw.switch_points.len());
        for raw_point in raw.switch_points {
            points.push(raw_point.try_into()?);
        }
        let store = SwitchProgramStore::load(points)?;

        let kind = match raw.setpoint_property {
            Some(prop) => ProgramKind::Levels { levels_path: prop.id },
            None => ProgramKind::Absolute,
        };
        Ok(LoadedProgram {
            id: program_id.to_string(),
            store,
            clock,
            kind,
        })
    }

    /// Target temperature in effect now.
    pub async fn active_temperature(&mut self, op_mode: &OperatingMode) -> Result<Scheduled<f64>> {
        Ok(match self.resolve(op_mode).await? {
            Resolution::DeviceProgram => Scheduled::ActiveProgram,
            Resolution::ManualMiss => Scheduled::Undefined,
            Resolution::Manual(def) | Resolution::Level { def, .. } => Scheduled::Value(def.value),
            Resolution::Absolute { temp, .. } => Scheduled::Value(temp),
        })
    }

    /// Name of the setpoint in effect now. In manual mode this is the mode
    /// name itself; on CAN gateways a scheduled "on" is reported as the live
    /// setpoint endpoint, which is where a write must go.
    pub async fn active_setpoint_name(
        &mut self,
        op_mode: &OperatingMode,
    ) -> Result<Scheduled<String>> {
        if op_mode.is_manual() {
            return Ok(Scheduled::Value(op_mode.current_mode().to_string()));
        }
        Ok(match self.resolve(op_mode).await? {
            Resolution::DeviceProgram => Scheduled::ActiveProgram,
            Resolution::ManualMiss | Resolution::Manual(_) => Scheduled::Undefined,
            Resolution::Level { name, .. } => {
                if self.config.bus == BusType::Can && name == SETPOINT_ON {
                    Scheduled::Value(CURRENT_SETPOINT.to_string())
                } else {
                    Scheduled::Value(name)
                }
            }
            Resolution::Absolute { raw, .. } => Scheduled::Value(raw),
        })
    }

    /// Lower bound for the active setpoint.
    pub async fn active_min(&mut self, op_mode: &OperatingMode) -> Result<Scheduled<f64>> {
        Ok(match self.resolve(op_mode).await? {
            Resolution::DeviceProgram => Scheduled::ActiveProgram,
            Resolution::ManualMiss => Scheduled::Undefined,
            Resolution::Manual(def) | Resolution::Level { def, .. } => Scheduled::Value(def.min),
            Resolution::Absolute { .. } => Scheduled::Value(self.config.min_temp),
        })
    }

    /// Upper bound for the active setpoint. When the cached value sits outside
    /// its own bounds (the gateway can transiently report this) the bound is
    /// withheld rather than presented alongside an inconsistent value.
    pub async fn active_max(&mut self, op_mode: &OperatingMode) -> Result<Scheduled<f64>> {
        Ok(match self.resolve(op_mode).await? {
            Resolution::DeviceProgram => Scheduled::ActiveProgram,
            Resolution::ManualMiss => Scheduled::Undefined,
            Resolution::Manual(def) | Resolution::Level { def, .. } => {
                if def.value > def.max || def.value < def.min {
                    Scheduled::Undefined
                } else {
                    Scheduled::Value(def.max)
                }
            }
            Resolution::Absolute { .. } => Scheduled::Value(self.config.max_temp),
        })
    }

    /// Path the active setpoint is written through. Absolute-flavor setpoints
    /// are not independently addressable.
    pub async fn active_uri(&mut self, op_mode: &OperatingMode) -> Result<Scheduled<String>> {
        Ok(match self.resolve(op_mode).await? {
            Resolution::DeviceProgram => Scheduled::ActiveProgram,
            Resolution::ManualMiss | Resolution::Absolute { .. } => Scheduled::Undefined,
            Resolution::Manual(def) | Resolution::Level { def, .. } => Scheduled::Value(def.uri),
        })
    }

    /// Record a user-initiated target change while in manual mode; cache
    /// write-through, no re-fetch. Ignored in auto mode.
    pub fn set_manual_target(&mut self, op_mode: &OperatingMode, value: f64) {
        if !op_mode.is_manual() {
            return;
        }
        if self.setpoints.update_value(op_mode.current_mode(), value) {
            debug!(mode = op_mode.current_mode(), value, "manual target cached");
        }
    }

    async fn resolve(&mut self, op_mode: &OperatingMode) -> Result<Resolution> {
        if op_mode.is_manual() {
            return Ok(self.resolve_manual(op_mode).await);
        }

        let Some(program) = &self.program else {
            return Ok(Resolution::DeviceProgram);
        };
        let point = program.store.resolve_active(program.clock.day, program.clock.minutes)?;
        match &program.kind {
            ProgramKind::Levels { levels_path } => {
                let name = point.setpoint.clone();
                let levels_path = levels_path.clone();
                let def = self
                    .setpoints
                    .get_or_fetch(&self.connector, &self.config, &levels_path, &name)
                    .await?
                    .clone();
                Ok(Resolution::Level { name, def })
            }
            ProgramKind::Absolute => {
                let temp: f64 = point.setpoint.parse().map_err(|_| {
                    Error::Protocol(format!(
                        "absolute setpoint '{}' is not a temperature",
                        point.setpoint
                    ))
                })?;
                Ok(Resolution::Absolute {
                    raw: point.setpoint.clone(),
                    temp,
                })
            }
        }
    }

    /// Manual mode bypasses the schedule: the mode name is itself a level.
    /// An unavailable level is a terminal "undefined", never an error.
    async fn resolve_manual(&mut self, op_mode: &OperatingMode) -> Resolution {
        let Some(program) = &self.program else {
            return Resolution::ManualMiss;
        };
        let ProgramKind::Levels { levels_path } = &program.kind else {
            return Resolution::ManualMiss;
        };
        let levels_path = levels_path.clone();
        match self
            .setpoints
            .get_or_fetch(&self.connector, &self.config, &levels_path, op_mode.current_mode())
            .await
        {
            Ok(def) => Resolution::Manual(def.clone()),
            Err(err) => {
                debug!(
                    mode = op_mode.current_mode(),
                    error = %err,
                    "manual setpoint unavailable"
                );
                Resolution::ManualMiss
            }
        }
    }
}

use chrono::Weekday;

pub const MINUTES_PER_DAY: u16 = 1440;

/// Device-wide fallback bounds for heating-circuit temperatures, used when a
/// setpoint response omits its own and for absolute-flavor programs.
pub const DEFAULT_MIN_HC_TEMP: f64 = 5.0;
pub const DEFAULT_MAX_HC_TEMP: f64 = 30.0;

/// Weekday in the gateway's own Monday-first ordering. The circular schedule
/// comparison depends on this matching the device convention exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn index(&self) -> u32 {
        match self {
            DayOfWeek::Monday => 0,
            DayOfWeek::Tuesday => 1,
            DayOfWeek::Wednesday => 2,
            DayOfWeek::Thursday => 3,
            DayOfWeek::Friday => 4,
            DayOfWeek::Saturday => 5,
            DayOfWeek::Sunday => 6,
        }
    }

    pub fn as_bosch_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Mo",
            DayOfWeek::Tuesday => "Tu",
            DayOfWeek::Wednesday => "We",
            DayOfWeek::Thursday => "Th",
            DayOfWeek::Friday => "Fr",
            DayOfWeek::Saturday => "Sa",
            DayOfWeek::Sunday => "Su",
        }
    }

    pub fn from_bosch_str(s: &str) -> Option<Self> {
        match s {
            "Mo" => Some(DayOfWeek::Monday),
            "Tu" => Some(DayOfWeek::Tuesday),
            "We" => Some(DayOfWeek::Wednesday),
            "Th" => Some(DayOfWeek::Thursday),
            "Fr" => Some(DayOfWeek::Friday),
            "Sa" => Some(DayOfWeek::Saturday),
            "Su" => Some(DayOfWeek::Sunday),
            _ => None,
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// One scheduled transition: from `day`/`time` onward, `setpoint` governs.
/// In absolute-flavor programs `setpoint` is a decimal temperature string.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchPoint {
    pub day: DayOfWeek,
    /// Minutes since midnight, 0..1440.
    pub time: u16,
    pub setpoint: String,
}

impl SwitchPoint {
    pub fn new(day: DayOfWeek, time: u16, setpoint: impl Into<String>) -> Self {
        Self {
            day,
            time,
            setpoint: setpoint.into(),
        }
    }

    /// Position within the circular week, 0..10080.
    pub(crate) fn week_minute(&self) -> u32 {
        self.day.index() * MINUTES_PER_DAY as u32 + self.time as u32
    }
}

/// Named temperature level with its bounds and the path it is written through.
#[derive(Debug, Clone, PartialEq)]
pub struct SetpointDefinition {
    pub name: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFlavor {
    /// Switch points reference named levels ("eco", "comfort", ...).
    Levels,
    /// Switch points embed the temperature directly.
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    Ems,
    Can,
}

/// Static per-device configuration the resolver is constructed with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceConfig {
    pub bus: BusType,
    pub min_temp: f64,
    pub max_temp: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            bus: BusType::Ems,
            min_temp: DEFAULT_MIN_HC_TEMP,
            max_temp: DEFAULT_MAX_HC_TEMP,
        }
    }
}

impl DeviceConfig {
    pub fn for_bus(bus: BusType) -> Self {
        Self {
            bus,
            ..Self::default()
        }
    }
}

/// The circuit's operating mode, read from the device by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatingMode {
    mode: String,
    kind: ModeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModeKind {
    Auto,
    Manual,
}

impl OperatingMode {
    pub fn auto(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            kind: ModeKind::Auto,
        }
    }

    pub fn manual(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            kind: ModeKind::Manual,
        }
    }

    pub fn current_mode(&self) -> &str {
        &self.mode
    }

    pub fn is_auto(&self) -> bool {
        self.kind == ModeKind::Auto
    }

    pub fn is_manual(&self) -> bool {
        self.kind == ModeKind::Manual
    }
}

/// Gateway clock reduced to schedule resolution, parsed from the device's own
/// time string. The device clock is authoritative, never local wall-clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTime {
    pub day: DayOfWeek,
    pub minutes: u16,
}

/// Answer to an active-schedule query. Both non-`Value` variants are valid
/// terminal answers the caller must render, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled<T> {
    Value(T),
    /// No defined value for the current mode (displayed as "unknown").
    Undefined,
    /// No local schedule data; the device-reported active program governs.
    ActiveProgram,
}

impl<T> Scheduled<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Scheduled::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Scheduled::Undefined)
    }

    pub fn is_active_program(&self) -> bool {
        matches!(self, Scheduled::ActiveProgram)
    }
}

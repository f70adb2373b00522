use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Deserialize;

use crate::types::{DayOfWeek, DeviceTime, SwitchPoint, MINUTES_PER_DAY};
use crate::{Error, Result};

pub const DATETIME_PATH: &str = "/gateway/DateTime";

/// Gateway clock string format, device-local.
const CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub const SETPOINT_ON: &str = "on";
pub const SETPOINT_HIGH: &str = "high";
pub const CURRENT_SETPOINT: &str = "currentSetpoint";

pub fn switch_program_path(circuit: &str, program_id: &str) -> String {
    format!("{circuit}/switchPrograms/{program_id}")
}

pub fn setpoint_path(levels_path: &str, name: &str) -> String {
    format!("{levels_path}/{name}")
}

/// Live-setpoint endpoint, a sibling of the temperature-levels resource.
pub fn current_setpoint_path(levels_path: &str) -> String {
    match levels_path.rsplit_once('/') {
        Some((circuit, _)) => format!("{circuit}/{CURRENT_SETPOINT}"),
        None => format!("/{CURRENT_SETPOINT}"),
    }
}

#[derive(Debug, Deserialize)]
pub struct RawSwitchProgram {
    #[serde(rename = "switchPoints", default)]
    pub switch_points: Vec<RawSwitchPoint>,
    /// Present only on named-level programs; its absence marks the
    /// absolute-temperature schema.
    #[serde(rename = "setpointProperty")]
    pub setpoint_property: Option<RawReference>,
}

#[derive(Debug, Deserialize)]
pub struct RawSwitchPoint {
    #[serde(rename = "dayOfWeek")]
    pub day_of_week: String,
    pub setpoint: String,
    pub time: u32,
}

#[derive(Debug, Deserialize)]
pub struct RawReference {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct RawSetpoint {
    pub value: f64,
    #[serde(rename = "minValue")]
    pub min_value: Option<f64>,
    #[serde(rename = "maxValue")]
    pub max_value: Option<f64>,
}

pub fn parse_switch_program(body: serde_json::Value) -> Result<RawSwitchProgram> {
    serde_json::from_value(body).map_err(|e| Error::Protocol(format!("switch program response: {e}")))
}

pub fn parse_setpoint(body: serde_json::Value) -> Result<RawSetpoint> {
    serde_json::from_value(body).map_err(|e| Error::Protocol(format!("setpoint response: {e}")))
}

impl TryFrom<RawSwitchPoint> for SwitchPoint {
    type Error = Error;

    fn try_from(raw: RawSwitchPoint) -> Result<SwitchPoint> {
        let day = DayOfWeek::from_bosch_str(&raw.day_of_week)
            .ok_or_else(|| Error::Protocol(format!("unknown dayOfWeek: {}", raw.day_of_week)))?;
        if raw.time >= MINUTES_PER_DAY as u32 {
            return Err(Error::Protocol(format!("switch point time out of range: {}", raw.time)));
        }
        Ok(SwitchPoint::new(day, raw.time as u16, raw.setpoint))
    }
}

pub fn parse_device_time(raw: &str) -> Result<DeviceTime> {
    let dt = NaiveDateTime::parse_from_str(raw, CLOCK_FORMAT)
        .map_err(|_| Error::InvalidClock(raw.to_string()))?;
    Ok(DeviceTime {
        day: dt.weekday().into(),
        minutes: (dt.hour() * 60 + dt.minute()) as u16,
    })
}

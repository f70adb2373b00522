use crate::types::{DayOfWeek, SwitchPoint, MINUTES_PER_DAY};
use crate::{Error, Result};

/// Switch points of one program, sorted by week position at load time so that
/// each query is a single binary search over the circular week.
#[derive(Debug, Clone, Default)]
pub struct SwitchProgramStore {
    points: Vec<SwitchPoint>,
}

impl SwitchProgramStore {
    /// Takes the device's (unordered) switch-point list. `(day, time)` pairs
    /// must be unique; the gateway never legitimately emits two transitions at
    /// the same instant.
    pub fn load(mut points: Vec<SwitchPoint>) -> Result<Self> {
        points.sort_by_key(SwitchPoint::week_minute);
        for pair in points.windows(2) {
            if pair[0].week_minute() == pair[1].week_minute() {
                return Err(Error::DuplicateEntry {
                    day: pair[1].day,
                    minutes: pair[1].time,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[SwitchPoint] {
        &self.points
    }

    /// The switch point governing `(day, minutes)`: the circularly
    /// nearest-preceding transition. A point exactly at the probe is already
    /// in effect; a probe before the week's first point wraps to its last.
    pub fn resolve_active(&self, day: DayOfWeek, minutes: u16) -> Result<&SwitchPoint> {
        if self.points.is_empty() {
            return Err(Error::EmptySchedule);
        }
        let probe = day.index() * MINUTES_PER_DAY as u32 + minutes as u32;
        let idx = self.points.partition_point(|p| p.week_minute() <= probe);
        let governing = if idx == 0 { self.points.len() - 1 } else { idx - 1 };
        Ok(&self.points[governing])
    }
}

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::connector::Connector;
use crate::protocol::{self, CURRENT_SETPOINT, SETPOINT_HIGH, SETPOINT_ON};
use crate::types::{BusType, DeviceConfig, SetpointDefinition};
use crate::Result;

/// Lazily fetched temperature levels of the active program, keyed by name.
/// One fetch per distinct name per program load; a reload under the levels
/// schema clears everything.
#[derive(Debug, Default)]
pub(crate) struct SetpointCache {
    entries: HashMap<String, SetpointDefinition>,
}

impl SetpointCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch<C: Connector>(
        &mut self,
        connector: &C,
        config: &DeviceConfig,
        levels_path: &str,
        name: &str,
    ) -> Result<&SetpointDefinition> {
        if !self.entries.contains_key(name) {
            let def = fetch_definition(connector, config, levels_path, name).await?;
            self.entries.insert(name.to_string(), def);
        }
        Ok(self
            .entries
            .get(name)
            .expect("entry present after insert"))
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    /// Write-through for a live target change; no re-fetch. Returns whether
    /// `name` was cached.
    pub fn update_value(&mut self, name: &str, value: f64) -> bool {
        match self.entries.get_mut(name) {
            Some(def) => {
                def.value = value;
                true
            }
            None => false,
        }
    }
}

async fn fetch_definition<C: Connector>(
    connector: &C,
    config: &DeviceConfig,
    levels_path: &str,
    name: &str,
) -> Result<SetpointDefinition> {
    let mut path = protocol::setpoint_path(levels_path, name);
    let raw = match fetch_raw(connector, &path).await {
        Ok(raw) => raw,
        // Some non-CAN firmwares expose the "on" level under "high".
        Err(err) if name == SETPOINT_ON && config.bus != BusType::Can => {
            warn!(error = %err, "setpoint 'on' unavailable, retrying as 'high'");
            path = protocol::setpoint_path(levels_path, SETPOINT_HIGH);
            fetch_raw(connector, &path).await?
        }
        Err(err) => return Err(err),
    };

    // CAN quirk: a value of 1 means "read the live setpoint", not 1 degree.
    let raw = if config.bus == BusType::Can && raw.value == 1.0 {
        path = protocol::current_setpoint_path(levels_path);
        debug!(setpoint = name, "CAN sentinel value, deferring to {CURRENT_SETPOINT}");
        fetch_raw(connector, &path).await?
    } else {
        raw
    };

    Ok(SetpointDefinition {
        name: name.to_string(),
        value: raw.value,
        min: raw.min_value.unwrap_or(config.min_temp),
        max: raw.max_value.unwrap_or(config.max_temp),
        uri: path,
    })
}

async fn fetch_raw<C: Connector>(connector: &C, path: &str) -> Result<protocol::RawSetpoint> {
    let body = connector.get(path).await?;
    protocol::parse_setpoint(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct FakeGateway {
        responses: HashMap<String, Value>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeGateway {
        fn new(routes: &[(&str, Value)]) -> Self {
            Self {
                responses: routes
                    .iter()
                    .map(|(p, v)| (p.to_string(), v.clone()))
                    .collect(),
                calls: Mutex::new(vec![]),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Connector for FakeGateway {
        async fn get(&self, path: &str) -> Result<Value> {
            self.calls.lock().unwrap().push(path.to_string());
            self.responses
                .get(path)
                .cloned()
                .ok_or_else(|| Error::Protocol(format!("no route: {path}")))
        }
    }

    const LEVELS: &str = "/heatingCircuits/hc1/temperatureLevels";

    #[tokio::test]
    async fn second_lookup_hits_cache() {
        let gw = FakeGateway::new(&[(
            "/heatingCircuits/hc1/temperatureLevels/eco",
            json!({"value": 16.0, "minValue": 5.0, "maxValue": 30.0}),
        )]);
        let config = DeviceConfig::default();
        let mut cache = SetpointCache::new();

        let def = cache.get_or_fetch(&gw, &config, LEVELS, "eco").await.unwrap();
        assert_eq!(def.value, 16.0);
        cache.get_or_fetch(&gw, &config, LEVELS, "eco").await.unwrap();
        assert_eq!(gw.calls().len(), 1);
    }

    #[tokio::test]
    async fn missing_bounds_fall_back_to_config() {
        let gw = FakeGateway::new(&[(
            "/heatingCircuits/hc1/temperatureLevels/comfort",
            json!({"value": 21.0}),
        )]);
        let config = DeviceConfig::default();
        let mut cache = SetpointCache::new();

        let def = cache
            .get_or_fetch(&gw, &config, LEVELS, "comfort")
            .await
            .unwrap();
        assert_eq!(def.min, config.min_temp);
        assert_eq!(def.max, config.max_temp);
    }

    #[tokio::test]
    async fn on_falls_back_to_high_off_can() {
        let gw = FakeGateway::new(&[(
            "/heatingCircuits/hc1/temperatureLevels/high",
            json!({"value": 24.0, "minValue": 5.0, "maxValue": 30.0}),
        )]);
        let config = DeviceConfig::default();
        let mut cache = SetpointCache::new();

        let def = cache.get_or_fetch(&gw, &config, LEVELS, "on").await.unwrap();
        assert_eq!(def.name, "on");
        assert_eq!(def.value, 24.0);
        assert_eq!(def.uri, "/heatingCircuits/hc1/temperatureLevels/high");
        // later lookups of "on" are cache hits
        cache.get_or_fetch(&gw, &config, LEVELS, "on").await.unwrap();
        assert_eq!(gw.calls().len(), 2);
    }

    #[tokio::test]
    async fn on_failure_propagates_on_can() {
        let gw = FakeGateway::new(&[]);
        let config = DeviceConfig::for_bus(BusType::Can);
        let mut cache = SetpointCache::new();

        let err = cache.get_or_fetch(&gw, &config, LEVELS, "on").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert_eq!(gw.calls().len(), 1);
    }

    #[tokio::test]
    async fn can_sentinel_value_reads_live_setpoint() {
        let gw = FakeGateway::new(&[
            (
                "/heatingCircuits/hc1/temperatureLevels/eco",
                json!({"value": 1.0}),
            ),
            (
                "/heatingCircuits/hc1/currentSetpoint",
                json!({"value": 19.5, "minValue": 5.0, "maxValue": 30.0}),
            ),
        ]);
        let config = DeviceConfig::for_bus(BusType::Can);
        let mut cache = SetpointCache::new();

        let def = cache.get_or_fetch(&gw, &config, LEVELS, "eco").await.unwrap();
        assert_eq!(def.value, 19.5);
        assert_eq!(def.uri, "/heatingCircuits/hc1/currentSetpoint");
    }

    #[tokio::test]
    async fn ems_value_one_is_literal() {
        let gw = FakeGateway::new(&[(
            "/heatingCircuits/hc1/temperatureLevels/eco",
            json!({"value": 1.0, "minValue": 5.0, "maxValue": 30.0}),
        )]);
        let config = DeviceConfig::default();
        let mut cache = SetpointCache::new();

        let def = cache.get_or_fetch(&gw, &config, LEVELS, "eco").await.unwrap();
        assert_eq!(def.value, 1.0);
        assert_eq!(gw.calls().len(), 1);
    }

    #[tokio::test]
    async fn update_value_writes_through_without_fetch() {
        let gw = FakeGateway::new(&[(
            "/heatingCircuits/hc1/temperatureLevels/manual",
            json!({"value": 20.0, "minValue": 5.0, "maxValue": 30.0}),
        )]);
        let config = DeviceConfig::default();
        let mut cache = SetpointCache::new();

        cache.get_or_fetch(&gw, &config, LEVELS, "manual").await.unwrap();
        assert!(cache.update_value("manual", 22.5));
        let def = cache.get_or_fetch(&gw, &config, LEVELS, "manual").await.unwrap();
        assert_eq!(def.value, 22.5);
        assert_eq!(gw.calls().len(), 1);

        assert!(!cache.update_value("ghost", 18.0));
    }

    #[tokio::test]
    async fn invalidate_all_forces_refetch() {
        let gw = FakeGateway::new(&[(
            "/heatingCircuits/hc1/temperatureLevels/eco",
            json!({"value": 16.0}),
        )]);
        let config = DeviceConfig::default();
        let mut cache = SetpointCache::new();

        cache.get_or_fetch(&gw, &config, LEVELS, "eco").await.unwrap();
        cache.invalidate_all();
        cache.get_or_fetch(&gw, &config, LEVELS, "eco").await.unwrap();
        assert_eq!(gw.calls().len(), 2);
    }
}

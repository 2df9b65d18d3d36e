//! Sensor platform: battery level and connection status per lock

use serde_json::Map;

use super::{object_ids, Entity, EntityPlatform, Platform};
use crate::gluehome::Lock;

#[derive(Debug, Clone, Copy, Default)]
pub struct SensorPlatform;

impl SensorPlatform {
    fn battery(lock: &Lock, object_id: &str, healthy: bool) -> Entity {
        Entity {
            unique_id: format!("{}_battery", lock.id),
            entity_id: format!("sensor.{}_battery", object_id),
            platform: Platform::Sensor,
            device_identifier: lock.id.clone(),
            name: format!("{} Battery", lock.description),
            state: lock
                .battery_status
                .map(|b| b.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            unit: Some("%"),
            available: healthy && lock.battery_status.is_some(),
            attributes: Map::new(),
        }
    }

    fn connection(lock: &Lock, object_id: &str, healthy: bool) -> Entity {
        Entity {
            unique_id: format!("{}_connection", lock.id),
            entity_id: format!("sensor.{}_connection", object_id),
            platform: Platform::Sensor,
            device_identifier: lock.id.clone(),
            name: format!("{} Connection", lock.description),
            state: lock
                .connection_status
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            unit: None,
            available: healthy,
            attributes: Map::new(),
        }
    }
}

impl EntityPlatform for SensorPlatform {
    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn entities(&self, locks: &[Lock], healthy: bool) -> Vec<Entity> {
        locks
            .iter()
            .zip(object_ids(locks))
            .flat_map(|(lock, object_id)| {
                [
                    Self::battery(lock, &object_id, healthy),
                    Self::connection(lock, &object_id, healthy),
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_entities() {
        let mut lock = Lock::new("L1", "Front Door");
        lock.battery_status = Some(64);
        lock.connection_status = Some("connected".to_string());

        let entities = SensorPlatform.entities(&[lock], true);
        assert_eq!(entities.len(), 2);

        let battery = &entities[0];
        assert_eq!(battery.entity_id, "sensor.front_door_battery");
        assert_eq!(battery.state, "64");
        assert_eq!(battery.unit, Some("%"));
        assert!(battery.available);

        let connection = &entities[1];
        assert_eq!(connection.unique_id, "L1_connection");
        assert_eq!(connection.state, "connected");
    }

    #[test]
    fn test_duplicate_descriptions_get_distinct_entity_ids() {
        let locks = [Lock::new("A-1", "Garage"), Lock::new("B-2", "Garage")];
        let ids: Vec<String> = SensorPlatform
            .entities(&locks, true)
            .into_iter()
            .map(|e| e.entity_id)
            .collect();

        assert_eq!(
            ids,
            vec![
                "sensor.garage_a_1_battery",
                "sensor.garage_a_1_connection",
                "sensor.garage_b_2_battery",
                "sensor.garage_b_2_connection",
            ]
        );
    }

    #[test]
    fn test_missing_battery_is_unavailable() {
        let entities = SensorPlatform.entities(&[Lock::new("L1", "Front Door")], true);
        assert_eq!(entities[0].state, "unknown");
        assert!(!entities[0].available);
        assert_eq!(entities[1].state, "unknown");
    }
}

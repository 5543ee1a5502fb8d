//! Per-class IN/OUT totals, inventory and capacity alarms.
//!
//! Inventory is `initial + IN - OUT` and may go negative when the tracker
//! loses and re-acquires objects; that is expected, not an error. Each
//! class carries an on/off alarm latch that turns on when inventory goes
//! strictly above capacity and off when it comes back to capacity or
//! below. There is no hysteresis band, so inventory bouncing between
//! `capacity` and `capacity + 1` toggles the alarm every time.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::event::{AlarmChange, CrossingEvent, Direction};
use super::label::ClassLabel;
use super::warning::ObservationWarning;
use crate::config::ClassConfig;
use crate::error::LinecountError;

/// Maximum inventory a class may hold before alarming.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capacity {
    Limited(u64),
    /// Never alarms.
    Unlimited,
}

impl Capacity {
    /// Returns true if `inventory` is strictly above this capacity.
    #[inline]
    pub fn is_exceeded_by(&self, inventory: i64) -> bool {
        match self {
            Capacity::Limited(limit) => i128::from(inventory) > i128::from(*limit),
            Capacity::Unlimited => false,
        }
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Limited(50)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Limited(limit) => write!(f, "{}", limit),
            Capacity::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl FromStr for Capacity {
    type Err = LinecountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") {
            return Ok(Capacity::Unlimited);
        }
        s.parse::<u64>().map(Capacity::Limited).map_err(|_| {
            LinecountError::InvalidConfig(format!(
                "capacity '{}' is neither a non-negative integer nor 'unlimited'",
                s
            ))
        })
    }
}

// Serialized as a plain number, or the string "unlimited".
impl Serialize for Capacity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Capacity::Limited(limit) => serializer.serialize_u64(*limit),
            Capacity::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

impl<'de> Deserialize<'de> for Capacity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum CapacityData {
            Number(u64),
            Text(String),
        }
        match CapacityData::deserialize(deserializer)? {
            CapacityData::Number(limit) => Ok(Capacity::Limited(limit)),
            CapacityData::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Running totals and alarm state for one class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryEntry {
    pub in_count: u64,
    pub out_count: u64,
    pub initial: i64,
    pub capacity: Capacity,
    pub alarm: bool,
}

impl InventoryEntry {
    fn new(config: &ClassConfig) -> Self {
        Self {
            in_count: 0,
            out_count: 0,
            initial: config.initial_inventory,
            capacity: config.capacity,
            alarm: config.capacity.is_exceeded_by(config.initial_inventory),
        }
    }

    /// `initial + IN - OUT`.
    pub fn inventory(&self) -> i64 {
        self.initial
            .saturating_add_unsigned(self.in_count)
            .saturating_sub_unsigned(self.out_count)
    }

    fn reset(&mut self) {
        self.in_count = 0;
        self.out_count = 0;
        self.alarm = self.capacity.is_exceeded_by(self.initial);
    }
}

/// One entry per configured class, created at start and kept for the run.
#[derive(Clone, Debug, Default)]
pub struct ClassInventory {
    entries: BTreeMap<ClassLabel, InventoryEntry>,
}

impl ClassInventory {
    pub fn new<'a>(classes: impl IntoIterator<Item = (&'a ClassLabel, &'a ClassConfig)>) -> Self {
        Self {
            entries: classes
                .into_iter()
                .map(|(label, config)| (label.clone(), InventoryEntry::new(config)))
                .collect(),
        }
    }

    /// Folds one crossing into the totals.
    ///
    /// Returns the alarm transition the event caused, if any. An event for a
    /// class without an entry changes nothing.
    pub fn apply(
        &mut self,
        event: &CrossingEvent,
    ) -> Result<Option<AlarmChange>, ObservationWarning> {
        let entry = self.entries.get_mut(&event.class).ok_or_else(|| {
            ObservationWarning::UnknownClassLabel {
                track: event.track_id,
                label: event.class.clone(),
                frame: event.frame,
            }
        })?;

        match event.direction {
            Direction::In => entry.in_count += 1,
            Direction::Out => entry.out_count += 1,
        }

        let inventory = entry.inventory();
        let over = entry.capacity.is_exceeded_by(inventory);
        if over == entry.alarm {
            return Ok(None);
        }

        entry.alarm = over;
        let change = AlarmChange {
            class: event.class.clone(),
            raised: over,
            inventory,
            frame: event.frame,
        };
        info!(
            class = %change.class,
            inventory,
            capacity = %entry.capacity,
            raised = over,
            "capacity alarm changed"
        );
        Ok(Some(change))
    }

    pub fn get(&self, class: &ClassLabel) -> Option<&InventoryEntry> {
        self.entries.get(class)
    }

    /// The per-class table, ordered by class name. Side-effect free.
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            classes: self
                .entries
                .iter()
                .map(|(label, entry)| ClassSnapshot {
                    class: label.clone(),
                    in_count: entry.in_count,
                    out_count: entry.out_count,
                    inventory: entry.inventory(),
                    capacity: entry.capacity,
                    alarm: entry.alarm,
                })
                .collect(),
        }
    }

    /// Zeroes the counters and restores initial inventories and alarms.
    pub fn reset(&mut self) {
        self.entries.values_mut().for_each(InventoryEntry::reset);
    }
}

/// A point-in-time copy of the inventory table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InventorySnapshot {
    pub classes: Vec<ClassSnapshot>,
}

impl InventorySnapshot {
    pub fn get(&self, class: &str) -> Option<&ClassSnapshot> {
        let label = ClassLabel::new(class);
        self.classes.iter().find(|c| c.class == label)
    }
}

/// One row of an [`InventorySnapshot`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassSnapshot {
    pub class: ClassLabel,
    #[serde(rename = "in")]
    pub in_count: u64,
    #[serde(rename = "out")]
    pub out_count: u64,
    pub inventory: i64,
    pub capacity: Capacity,
    pub alarm: bool,
}

impl fmt::Display for InventorySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.class.as_str().len())
            .max()
            .unwrap_or(5)
            .max(5);
        writeln!(
            f,
            "  {:<width$}  {:>6}  {:>6}  {:>9}  {:>9}",
            "class", "in", "out", "inventory", "capacity"
        )?;
        for row in &self.classes {
            let alarm = if row.alarm { "  ALARM" } else { "" };
            writeln!(
                f,
                "  {:<width$}  {:>6}  {:>6}  {:>9}  {:>9}{}",
                row.class.as_str(),
                row.in_count,
                row.out_count,
                row.inventory,
                row.capacity.to_string(),
                alarm
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::TrackId;

    fn inventory_with(capacity: Capacity, initial: i64) -> ClassInventory {
        let label = ClassLabel::new("car");
        let config = ClassConfig {
            capacity,
            initial_inventory: initial,
        };
        ClassInventory::new([(&label, &config)])
    }

    fn event(direction: Direction, frame: u64) -> CrossingEvent {
        CrossingEvent {
            track_id: TrackId(frame),
            class: ClassLabel::new("car"),
            direction,
            frame,
        }
    }

    #[test]
    fn test_apply_counts() {
        let mut inv = inventory_with(Capacity::Unlimited, 0);
        inv.apply(&event(Direction::In, 1)).unwrap();
        inv.apply(&event(Direction::In, 2)).unwrap();
        inv.apply(&event(Direction::Out, 3)).unwrap();
        let entry = inv.get(&ClassLabel::new("car")).unwrap();
        assert_eq!(entry.in_count, 2);
        assert_eq!(entry.out_count, 1);
        assert_eq!(entry.inventory(), 1);
    }

    #[test]
    fn test_negative_inventory_allowed() {
        let mut inv = inventory_with(Capacity::Limited(2), 0);
        assert_eq!(inv.apply(&event(Direction::Out, 1)).unwrap(), None);
        assert_eq!(inv.get(&ClassLabel::new("car")).unwrap().inventory(), -1);
    }

    #[test]
    fn test_alarm_raises_and_clears_once() {
        let mut inv = inventory_with(Capacity::Limited(2), 0);
        assert_eq!(inv.apply(&event(Direction::In, 1)).unwrap(), None);
        assert_eq!(inv.apply(&event(Direction::In, 2)).unwrap(), None);
        let raised = inv.apply(&event(Direction::In, 3)).unwrap().unwrap();
        assert!(raised.raised);
        assert_eq!(raised.inventory, 3);
        assert_eq!(inv.apply(&event(Direction::In, 4)).unwrap(), None);
        assert_eq!(inv.apply(&event(Direction::Out, 5)).unwrap(), None);
        let cleared = inv.apply(&event(Direction::Out, 6)).unwrap().unwrap();
        assert!(!cleared.raised);
        assert_eq!(cleared.inventory, 2);
    }

    #[test]
    fn test_unlimited_never_alarms() {
        let mut inv = inventory_with(Capacity::Unlimited, 0);
        for frame in 0..1000 {
            assert_eq!(inv.apply(&event(Direction::In, frame)).unwrap(), None);
        }
    }

    #[test]
    fn test_unknown_class_rejected() {
        let mut inv = inventory_with(Capacity::Unlimited, 0);
        let mut ev = event(Direction::In, 1);
        ev.class = ClassLabel::new("bus");
        assert!(inv.apply(&ev).is_err());
        assert_eq!(inv.snapshot().get("car").unwrap().in_count, 0);
    }

    #[test]
    fn test_initial_inventory_and_reset() {
        let mut inv = inventory_with(Capacity::Limited(5), 5);
        let raised = inv.apply(&event(Direction::In, 1)).unwrap().unwrap();
        assert!(raised.raised);
        inv.reset();
        let snap = inv.snapshot();
        let car = snap.get("car").unwrap();
        assert_eq!(car.inventory, 5);
        assert_eq!(car.in_count, 0);
        assert!(!car.alarm);
    }

    #[test]
    fn test_initial_inventory_over_capacity_starts_latched() {
        let inv = inventory_with(Capacity::Limited(1), 3);
        assert!(inv.snapshot().get("car").unwrap().alarm);
    }

    #[test]
    fn test_capacity_parse_and_serde() {
        assert_eq!("12".parse::<Capacity>().unwrap(), Capacity::Limited(12));
        assert_eq!("Unlimited".parse::<Capacity>().unwrap(), Capacity::Unlimited);
        assert!("-3".parse::<Capacity>().is_err());

        let limited: Capacity = serde_yaml::from_str("7").unwrap();
        assert_eq!(limited, Capacity::Limited(7));
        let unlimited: Capacity = serde_yaml::from_str("unlimited").unwrap();
        assert_eq!(unlimited, Capacity::Unlimited);
        assert_eq!(serde_json::to_string(&Capacity::Unlimited).unwrap(), "\"unlimited\"");
    }

    #[test]
    fn test_snapshot_display() {
        let inv = inventory_with(Capacity::Limited(2), 0);
        let text = inv.snapshot().to_string();
        assert!(text.contains("car"));
        assert!(text.contains("capacity"));
    }
}

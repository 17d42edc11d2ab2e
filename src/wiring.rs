//! Wiring tables and their composition.
//!
//! The physical setup is described hop by hop, the way it is plugged
//! together: controller function to DSUB9 pin, pin to cable colour, colour to
//! U3 terminal label, label to DAQ channel. [`compose`] collapses such a
//! chain into one direct table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::daq::{Channel, Register};

/// Errors raised while composing wiring tables.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WiringError {
    /// The chain is too short to describe a mapping.
    #[error("wiring chain needs at least two tables, got {tables}")]
    Configuration { tables: usize },
    /// Values of one table are missing as keys of the next.
    ///
    /// `table` is the position of the table lacking the keys. Every entry
    /// of `unresolved` is one broken chain, e.g. `"bit0 -> 2 -> brown"`.
    #[error("wiring table {table} has no entry for: {}", .unresolved.join(", "))]
    Mismatch {
        table: usize,
        unresolved: Vec<String>,
    },
    /// A line the instrument needs ends on no DAQ channel, or on a reserved
    /// terminal such as `GND`.
    #[error("line `{line}` is not wired to a DAQ channel")]
    Unwired { line: String },
}

/// One hop of the wiring: unique labels mapped to the next hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WiringTable<V = String> {
    entries: BTreeMap<String, V>,
}

impl<V> Default for WiringTable<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for WiringTable<V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<V> WiringTable<V> {
    pub fn get(&self, label: &str) -> Option<&V> {
        self.entries.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// An in-progress composition that remembers every hop taken per key, so a
/// broken link can be reported with its full path.
#[derive(Debug, Clone)]
pub struct WiringChain {
    hops: BTreeMap<String, Vec<String>>,
    tables: usize,
}

impl WiringChain {
    /// Start a chain at `first`.
    pub fn new(first: &WiringTable) -> Self {
        let hops = first
            .iter()
            .map(|(k, v)| (k.to_string(), vec![v.clone()]))
            .collect();
        Self { hops, tables: 1 }
    }

    /// Follow every current value through `next`.
    pub fn then(mut self, next: &WiringTable) -> Result<Self, WiringError> {
        self.check(next)?;
        for hops in self.hops.values_mut() {
            // `check` guarantees the lookup.
            if let Some(value) = hops.last().and_then(|last| next.get(last)) {
                hops.push(value.clone());
            }
        }
        self.tables += 1;
        Ok(self)
    }

    /// Map the first table's keys to the current values.
    pub fn finish(self) -> WiringTable {
        self.hops
            .into_iter()
            .filter_map(|(k, mut hops)| hops.pop().map(|v| (k, v)))
            .collect()
    }

    /// Terminate the chain in a table of typed values.
    pub fn resolve<V: Clone>(self, terminals: &WiringTable<V>) -> Result<WiringTable<V>, WiringError> {
        self.check(terminals)?;
        Ok(self
            .hops
            .iter()
            .filter_map(|(k, hops)| {
                hops.last()
                    .and_then(|last| terminals.get(last))
                    .map(|v| (k.clone(), v.clone()))
            })
            .collect())
    }

    fn check<V>(&self, next: &WiringTable<V>) -> Result<(), WiringError> {
        let unresolved: Vec<String> = self
            .hops
            .iter()
            .filter(|(_, hops)| hops.last().is_some_and(|last| !next.contains(last)))
            .map(|(k, hops)| format!("{} -> {}", k, hops.join(" -> ")))
            .collect();

        if unresolved.is_empty() {
            Ok(())
        } else {
            Err(WiringError::Mismatch {
                table: self.tables,
                unresolved,
            })
        }
    }
}

/// Collapse a chain of tables into one mapping from the first table's keys
/// to the last table's values.
///
/// ```
/// use labjack_piezo::wiring::{compose, WiringTable};
///
/// let d1: WiringTable = [("1", "A1"), ("2", "A2")].into_iter().map(|(k, v)| (k, v.to_string())).collect();
/// let d2: WiringTable = [("A1", "B1"), ("A2", "B2")].into_iter().map(|(k, v)| (k, v.to_string())).collect();
/// let d3: WiringTable = [("B1", "C1"), ("B2", "C2")].into_iter().map(|(k, v)| (k, v.to_string())).collect();
///
/// let direct = compose(&[&d1, &d2, &d3]).unwrap();
/// assert_eq!(direct.get("1").map(String::as_str), Some("C1"));
/// ```
pub fn compose(chain: &[&WiringTable]) -> Result<WiringTable, WiringError> {
    match chain {
        [first, rest @ ..] if !rest.is_empty() => {
            let mut composed = WiringChain::new(first);
            for next in rest {
                composed = composed.then(next)?;
            }
            Ok(composed.finish())
        }
        _ => Err(WiringError::Configuration {
            tables: chain.len(),
        }),
    }
}

/// Last hop of every chain: a numbered DAQ line or a terminal that cannot be
/// addressed, such as `GND`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DaqTerminal {
    Channel(Channel),
    Reserved(String),
}

impl DaqTerminal {
    pub fn channel(&self) -> Option<Channel> {
        match self {
            DaqTerminal::Channel(channel) => Some(*channel),
            DaqTerminal::Reserved(_) => None,
        }
    }
}

impl WiringTable<DaqTerminal> {
    /// The DAQ channel behind `line`.
    pub fn channel(&self, line: &str) -> Result<Channel, WiringError> {
        self.get(line)
            .and_then(DaqTerminal::channel)
            .ok_or_else(|| WiringError::Unwired {
                line: line.to_string(),
            })
    }
}

/// The lab's wiring as it is currently plugged. Adjust when the setup
/// changes.
pub mod setup {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> WiringTable {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Piezo controller function => DSUB9 output pin.
    pub fn controller_pins() -> WiringTable {
        table(&[
            ("GND", "1"),
            ("bit0", "2"),
            ("bit1", "3"),
            ("bit2", "4"),
            ("LED_burst", "7"),
            ("LED_single", "8"),
            ("LED_cont", "9"),
        ])
    }

    /// DSUB9 pin (including the converter plug) => cable colour.
    pub fn dsub9_pins() -> WiringTable {
        table(&[
            ("1", "black"),
            ("2", "brown"),
            ("3", "red"),
            ("4", "orange"),
            ("5", "n.c."),
            ("6", "yellow"),
            ("7", "blue"),
            ("8", "violet"),
            ("9", "green"),
        ])
    }

    /// Cable colour => U3 terminal label.
    pub fn cable_colors() -> WiringTable {
        table(&[
            ("brown", "FIO0"),
            ("red", "FIO1"),
            ("orange", "FIO2"),
            ("blue", "FIO5"),
            ("violet", "FIO6"),
            ("green", "FIO7"),
            ("black", "GND"),
            ("yellow", "n.c."),
        ])
    }

    /// U3 terminal label => DAQ line.
    pub fn u3_terminals() -> WiringTable<DaqTerminal> {
        (0..8u8)
            .map(|i| (format!("FIO{i}"), DaqTerminal::Channel(i)))
            .chain([("GND".to_string(), DaqTerminal::Reserved("GND".to_string()))])
            .collect()
    }

    /// U3 analog output label => register address.
    pub fn u3_dac_registers() -> WiringTable<Register> {
        [("DAC0", 5000), ("DAC1", 5002)].into_iter().collect()
    }

    /// Power supply monitor outputs => U3 terminal label.
    pub fn power_supply_monitors() -> WiringTable {
        table(&[("V_monitor", "FIO0"), ("I_monitor", "FIO1")])
    }

    /// Power supply programming inputs => U3 analog output label.
    pub fn power_supply_programs() -> WiringTable {
        table(&[("I_program", "DAC0")])
    }
}

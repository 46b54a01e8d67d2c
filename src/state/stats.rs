//! Open-ended stat sheets shared by teams and players.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Value stored under a stat id. Only numeric stats take part in arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    /// Flag style stat (e.g. "served first").
    Bool(bool),
    /// Counter style stat.
    Number(i64),
    /// Free-form annotation.
    Text(String),
}

impl StatValue {
    /// Numeric view of the value, if it is a counter.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            StatValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Kind of value held, used when checking declarations.
    pub fn kind(&self) -> StatKind {
        match self {
            StatValue::Bool(_) => StatKind::Boolean,
            StatValue::Number(_) => StatKind::Number,
            StatValue::Text(_) => StatKind::String,
        }
    }
}

/// Declared value type of a stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    /// Integer counter.
    Number,
    /// True/false flag.
    Boolean,
    /// Text value.
    String,
}

/// Declaration of a stat tracked for players or teams.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatDefinition {
    /// Stable identifier, used as the key in stat sheets.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Abbreviation for narrow tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_label: Option<String>,
    /// Value a fresh sheet starts with.
    pub default_value: StatValue,
    /// Declared type; must agree with `default_value`.
    #[serde(rename = "type")]
    pub kind: StatKind,
    /// Whether scoreboards should show the stat in their tables.
    #[serde(default)]
    pub display_in_table: bool,
}

impl StatDefinition {
    /// Numeric counter starting at zero.
    pub fn counter(id: &str, label: &str, short_label: &str) -> Self {
        Self {
            id: id.to_owned(),
            label: label.to_owned(),
            short_label: Some(short_label.to_owned()),
            default_value: StatValue::Number(0),
            kind: StatKind::Number,
            display_in_table: true,
        }
    }

    /// Counter that scoreboards keep out of their tables.
    pub fn hidden_counter(id: &str, label: &str) -> Self {
        Self {
            short_label: None,
            display_in_table: false,
            ..Self::counter(id, label, "")
        }
    }
}

/// Ordered map from stat id to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatSheet(IndexMap<String, StatValue>);

impl StatSheet {
    /// Build a sheet holding every declared stat at its default value.
    pub fn seeded(definitions: &[StatDefinition]) -> Self {
        Self(
            definitions
                .iter()
                .map(|definition| (definition.id.clone(), definition.default_value.clone()))
                .collect(),
        )
    }

    /// Read a stat.
    pub fn get(&self, id: &str) -> Option<&StatValue> {
        self.0.get(id)
    }

    /// Read a numeric stat, treating missing or non-numeric entries as absent.
    pub fn number(&self, id: &str) -> Option<i64> {
        self.0.get(id).and_then(StatValue::as_number)
    }

    /// Overwrite (or insert) a stat.
    pub fn set(&mut self, id: &str, value: StatValue) {
        self.0.insert(id.to_owned(), value);
    }

    /// Add `delta` to a numeric stat. A missing stat starts from zero; non-numeric
    /// stats are left untouched and `None` is returned.
    pub fn add(&mut self, id: &str, delta: i64) -> Option<i64> {
        let entry = self
            .0
            .entry(id.to_owned())
            .or_insert(StatValue::Number(0));
        match entry {
            StatValue::Number(value) => {
                *value += delta;
                Some(*value)
            }
            _ => None,
        }
    }

    /// Iterate over the entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &StatValue)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sheet_keeps_declaration_order() {
        let sheet = StatSheet::seeded(&[
            StatDefinition::counter("points", "Points", "PTS"),
            StatDefinition::counter("fouls", "Fouls", "PF"),
        ]);

        let keys: Vec<_> = sheet.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["points", "fouls"]);
        assert_eq!(sheet.number("points"), Some(0));
    }

    #[test]
    fn add_only_touches_numeric_stats() {
        let mut sheet = StatSheet::default();
        sheet.set("captain", StatValue::Bool(true));

        assert_eq!(sheet.add("points", 3), Some(3));
        assert_eq!(sheet.add("points", -1), Some(2));
        assert_eq!(sheet.add("captain", 1), None);
        assert_eq!(sheet.get("captain"), Some(&StatValue::Bool(true)));
    }

    #[test]
    fn untagged_values_round_trip_through_json() {
        let mut sheet = StatSheet::default();
        sheet.set("points", StatValue::Number(12));
        sheet.set("note", StatValue::Text("hot hand".into()));

        let json = serde_json::to_value(&sheet).unwrap();
        assert_eq!(json, serde_json::json!({ "points": 12, "note": "hot hand" }));
        let back: StatSheet = serde_json::from_value(json).unwrap();
        assert_eq!(back, sheet);
    }
}

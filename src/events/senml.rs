// Copyright (c) 2025 - Cowboy AI, Inc.
//! SenML Measurement Packs (RFC 8428)
//!
//! Only the JSON representation is supported. Base name (`bn`) and base time
//! (`bt`) carry forward to every following record until replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single SenML record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "bn", default, skip_serializing_if = "Option::is_none")]
    pub base_name: Option<String>,

    #[serde(rename = "bt", default, skip_serializing_if = "Option::is_none")]
    pub base_time: Option<f64>,

    #[serde(rename = "bu", default, skip_serializing_if = "Option::is_none")]
    pub base_unit: Option<String>,

    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(rename = "vs", default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,

    #[serde(rename = "vb", default, skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,

    /// Seconds, relative to the base time
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

/// An ordered list of SenML records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pack(pub Vec<Record>);

/// A record with its base fields applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord<'a> {
    /// `bn` + `n`
    pub name: String,
    /// `bt` + `t`, in seconds since the Unix epoch
    pub time: f64,
    pub record: &'a Record,
}

impl ResolvedRecord<'_> {
    /// Numeric value, if the record carries one
    pub fn value(&self) -> Option<f64> {
        self.record.value
    }

    /// Measurement time; a resolved time of zero means the record has none
    pub fn time(&self) -> Option<DateTime<Utc>> {
        if self.time <= 0.0 || !self.time.is_finite() {
            return None;
        }

        let secs = self.time.floor();
        let nanos = ((self.time - secs) * 1e9).round() as u32;
        DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
    }
}

impl Pack {
    /// Records with base name and base time resolved, in pack order
    pub fn resolve(&self) -> Vec<ResolvedRecord<'_>> {
        let mut base_name = String::new();
        let mut base_time = 0.0;

        self.0
            .iter()
            .map(|record| {
                if let Some(bn) = &record.base_name {
                    base_name = bn.clone();
                }
                if let Some(bt) = record.base_time {
                    base_time = bt;
                }

                ResolvedRecord {
                    name: format!("{}{}", base_name, record.name.as_deref().unwrap_or_default()),
                    time: base_time + record.time.unwrap_or_default(),
                    record,
                }
            })
            .collect()
    }

    /// First record whose own name or resolved name equals `name`
    pub fn find_by_name(&self, name: &str) -> Option<ResolvedRecord<'_>> {
        self.resolve()
            .into_iter()
            .find(|r| r.record.name.as_deref() == Some(name) || r.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

//! Drive parameter files.
//!
//! A parameter file lists one-time objects and the raw cyclic entry list:
//!
//! ```toml
//! [[objects]]
//! id = 10
//! index = 0x6060
//! type = "s8"
//! value = 8
//!
//! [[entries]]
//! id = 98            # receive group, PDO 0x1600
//! index = 0x1600
//!
//! [[entries]]
//! id = 0
//! index = 0x6040
//! subindex = 0
//! size = 2
//! type = "u16"
//!
//! [[entries]]
//! id = 99            # transmit group, PDO 0x1A00
//! index = 0x1A00
//!
//! [[entries]]
//! id = 4
//! index = 0x6041
//! subindex = 0
//! type = "u16"
//! ```
//!
//! Order in `entries` is significant: anything before the receive marker
//! is a one-time value, entries between the markers are commands and
//! entries after the transmit marker are feedback.

use crate::config::ConfigLoader;
use crate::entry::{Entry, InterfaceId, ValueType};
use crate::error::ConfigurationError;
use crate::motor::drive::CyclicLayout;
use crate::motor::types::DriveId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of a parameter file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriveParameters {
    /// One-time objects.
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    /// Raw entry list with boundary markers.
    #[serde(default)]
    pub entries: Vec<EntrySpec>,
}

/// One-time object pushed before cyclic exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSpec {
    /// Raw id; drive families derive some values from it.
    pub id: u8,
    /// Object index.
    pub index: u16,
    /// Object subindex.
    #[serde(default)]
    pub subindex: u8,
    /// Declared wire type.
    #[serde(rename = "type")]
    pub value_type: String,
    /// Literal value, absent for derived objects.
    #[serde(default)]
    pub value: Option<i64>,
}

/// Raw entry-list element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntrySpec {
    /// Raw interface id or boundary marker.
    pub id: u8,
    /// Object index (PDO index for markers).
    pub index: u16,
    /// Object subindex.
    #[serde(default)]
    pub subindex: Option<u8>,
    /// Width [bytes]; must match the type when given.
    #[serde(default)]
    pub size: Option<u8>,
    /// Declared wire type.
    #[serde(rename = "type", default)]
    pub value_type: Option<String>,
    /// Literal value, only meaningful before the receive marker.
    #[serde(default)]
    pub value: Option<i64>,
}

/// Parameter file split into one-time objects and the cyclic layout.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionedParameters {
    /// Objects plus entries listed before the receive marker.
    pub objects: Vec<ObjectSpec>,
    /// Commands and feedback.
    pub layout: CyclicLayout,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Group {
    OneTime,
    Commands,
    Feedback,
}

impl DriveParameters {
    /// Load the parameter file of `drive_id`.
    pub fn load_for(drive_id: DriveId, path: &Path) -> Result<Self, ConfigurationError> {
        Self::load(path).map_err(|e| ConfigurationError::Drive {
            drive_id,
            message: format!("parameter file: {e}"),
        })
    }

    /// Partition at the boundary markers.
    pub fn partition(&self, drive_id: DriveId) -> Result<PartitionedParameters, ConfigurationError> {
        let malformed = |message: String| ConfigurationError::Drive { drive_id, message };
        let rx_marker = InterfaceId::RxBoundary.as_u8();
        let tx_marker = InterfaceId::TxBoundary.as_u8();

        let mut objects = self.objects.clone();
        let mut layout = CyclicLayout::default();
        let mut group = Group::OneTime;

        for (position, spec) in self.entries.iter().enumerate() {
            if spec.id == rx_marker {
                if group != Group::OneTime {
                    return Err(malformed(format!(
                        "entries[{position}]: receive marker must appear once, before the transmit marker"
                    )));
                }
                layout.rx_pdo_index = spec.index;
                group = Group::Commands;
                continue;
            }
            if spec.id == tx_marker {
                if group != Group::Commands {
                    return Err(malformed(format!(
                        "entries[{position}]: transmit marker must appear once, after the receive marker"
                    )));
                }
                layout.tx_pdo_index = spec.index;
                group = Group::Feedback;
                continue;
            }

            match group {
                Group::OneTime => objects.push(ObjectSpec {
                    id: spec.id,
                    index: spec.index,
                    subindex: spec.subindex.unwrap_or(0),
                    value_type: spec.value_type.clone().ok_or_else(|| {
                        malformed(format!("entries[{position}] (id {}): missing type", spec.id))
                    })?,
                    value: spec.value,
                }),
                Group::Commands => layout.commands.push(cyclic_entry(drive_id, position, spec)?),
                Group::Feedback => layout.feedback.push(cyclic_entry(drive_id, position, spec)?),
            }
        }

        match group {
            Group::Feedback => Ok(PartitionedParameters { objects, layout }),
            Group::OneTime => Err(malformed("entries: receive marker (id 98) missing".to_string())),
            Group::Commands => Err(malformed("entries: transmit marker (id 99) missing".to_string())),
        }
    }
}

fn cyclic_entry(drive_id: DriveId, position: usize, spec: &EntrySpec) -> Result<Entry, ConfigurationError> {
    let malformed = |what: &str| ConfigurationError::Drive {
        drive_id,
        message: format!("entries[{position}] (id {}): {what}", spec.id),
    };

    let subindex = spec.subindex.ok_or_else(|| malformed("missing subindex"))?;
    let value_type: ValueType = spec
        .value_type
        .as_deref()
        .ok_or_else(|| malformed("missing type"))?
        .parse()?;
    if let Some(size) = spec.size {
        if size as usize != value_type.width() {
            return Err(malformed(&format!(
                "size {size} does not match type {value_type} ({} bytes)",
                value_type.width()
            )));
        }
    }
    Ok(Entry::zeroed(spec.id, spec.index, subindex, value_type))
}

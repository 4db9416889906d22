// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parameter descriptors and their lookup.

use std::{collections::HashMap, fmt};

use crate::frame::*;

/// The type of a single field in a message schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    UInt8,
    UInt16,
    UInt32,
    Int8,
    Int16,
    Int32,
    /// ASCII text of at most `max_len` bytes.
    String { max_len: u8 },
    Uid,
}

impl FieldKind {
    const fn get_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::String { .. } => "string",
            Self::Uid => "uid",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::String { max_len } => write!(f, "{}[0, {max_len}]", self.get_name()),
            kind => f.write_str(kind.get_name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// The schema of a request or response message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// A schema without any fields.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }
}

/// One line per field: `<name>: <kind>`.
impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.fields.is_empty() {
            return writeln!(f, "{}: no arguments", self.name);
        }
        for field in &self.fields {
            writeln!(f, "{}: {}", field.name, field.kind)?;
        }
        Ok(())
    }
}

/// Everything known about a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidDescriptor {
    pub name: String,
    pub value: Pid,
    pub get_request: Option<Descriptor>,
    pub get_response: Option<Descriptor>,
    pub set_request: Option<Descriptor>,
    pub set_response: Option<Descriptor>,
}

impl PidDescriptor {
    /// A parameter that supports neither GET nor SET.
    pub fn new(name: impl Into<String>, value: Pid) -> Self {
        Self {
            name: name.into(),
            value,
            get_request: None,
            get_response: None,
            set_request: None,
            set_response: None,
        }
    }

    #[must_use]
    pub fn with_get(mut self, request: Descriptor, response: Descriptor) -> Self {
        self.get_request = Some(request);
        self.get_response = Some(response);
        self
    }

    #[must_use]
    pub fn with_set(mut self, request: Descriptor, response: Descriptor) -> Self {
        self.set_request = Some(request);
        self.set_response = Some(response);
        self
    }

    #[must_use]
    pub fn request(&self, command_class: CommandClass) -> Option<&Descriptor> {
        match command_class {
            CommandClass::Get => self.get_request.as_ref(),
            CommandClass::Set => self.set_request.as_ref(),
        }
    }

    #[must_use]
    pub fn response(&self, command_class: CommandClass) -> Option<&Descriptor> {
        match command_class {
            CommandClass::Get => self.get_response.as_ref(),
            CommandClass::Set => self.set_response.as_ref(),
        }
    }
}

/// Resolves parameter names and values to descriptors.
pub trait PidResolver {
    fn descriptor_by_name(
        &self,
        name: &str,
        manufacturer_id: ManufacturerId,
    ) -> Option<&PidDescriptor>;

    fn descriptor_by_value(
        &self,
        pid: Pid,
        manufacturer_id: ManufacturerId,
    ) -> Option<&PidDescriptor>;

    /// Names of all parameters available for `manufacturer_id`.
    fn supported_pids(&self, manufacturer_id: ManufacturerId) -> Vec<String>;

    /// Look up `name`, falling back to its numeric value.
    fn resolve(&self, name: &str, manufacturer_id: ManufacturerId) -> Option<&PidDescriptor> {
        self.descriptor_by_name(name, manufacturer_id).or_else(|| {
            parse_pid_value(name).and_then(|pid| self.descriptor_by_value(pid, manufacturer_id))
        })
    }
}

/// Parse a `0x` prefixed hex or a decimal PID value.
#[must_use]
pub fn parse_pid_value(s: &str) -> Option<Pid> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => Pid::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// An in-memory [`PidResolver`].
///
/// Standard parameters are shared by all manufacturers, manufacturer
/// specific ones are only visible for their manufacturer id.
#[derive(Debug, Clone, Default)]
pub struct PidStore {
    standard: Vec<PidDescriptor>,
    manufacturer: HashMap<ManufacturerId, Vec<PidDescriptor>>,
}

impl PidStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the common standard parameters.
    #[must_use]
    pub fn with_standard_pids() -> Self {
        let mut store = Self::new();
        for descriptor in standard_pids() {
            store.insert(descriptor);
        }
        store
    }

    pub fn insert(&mut self, descriptor: PidDescriptor) {
        self.standard.push(descriptor);
    }

    pub fn insert_manufacturer_pid(
        &mut self,
        manufacturer_id: ManufacturerId,
        descriptor: PidDescriptor,
    ) {
        self.manufacturer
            .entry(manufacturer_id)
            .or_default()
            .push(descriptor);
    }

    fn candidates(
        &self,
        manufacturer_id: ManufacturerId,
    ) -> impl Iterator<Item = &PidDescriptor> {
        self.standard.iter().chain(
            self.manufacturer
                .get(&manufacturer_id)
                .into_iter()
                .flatten(),
        )
    }
}

impl PidResolver for PidStore {
    fn descriptor_by_name(
        &self,
        name: &str,
        manufacturer_id: ManufacturerId,
    ) -> Option<&PidDescriptor> {
        self.candidates(manufacturer_id)
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    fn descriptor_by_value(
        &self,
        pid: Pid,
        manufacturer_id: ManufacturerId,
    ) -> Option<&PidDescriptor> {
        self.candidates(manufacturer_id).find(|d| d.value == pid)
    }

    fn supported_pids(&self, manufacturer_id: ManufacturerId) -> Vec<String> {
        self.candidates(manufacturer_id)
            .map(|d| d.name.to_lowercase())
            .collect()
    }
}

fn standard_pids() -> Vec<PidDescriptor> {
    use FieldKind as K;

    let field = FieldDescriptor::new;
    let label = |name: &str| Descriptor::new(name, vec![field("label", K::String { max_len: 32 })]);
    let get_only = |name: &str, value: Pid, fields: Vec<FieldDescriptor>| {
        PidDescriptor::new(name, value).with_get(Descriptor::empty(name), Descriptor::new(name, fields))
    };

    vec![
        PidDescriptor::new("QUEUED_MESSAGE", PID_QUEUED_MESSAGE).with_get(
            Descriptor::new("QUEUED_MESSAGE", vec![field("status_type", K::UInt8)]),
            Descriptor::empty("QUEUED_MESSAGE"),
        ),
        PidDescriptor::new("STATUS_MESSAGES", PID_STATUS_MESSAGES).with_get(
            Descriptor::new("STATUS_MESSAGES", vec![field("status_type", K::UInt8)]),
            Descriptor::new(
                "STATUS_MESSAGES",
                vec![
                    field("sub_device", K::UInt16),
                    field("status_type", K::UInt8),
                    field("message_id", K::UInt16),
                    field("data_value_1", K::Int16),
                    field("data_value_2", K::Int16),
                ],
            ),
        ),
        get_only(
            "SUPPORTED_PARAMETERS",
            0x0050,
            vec![field("param_id", K::UInt16)],
        ),
        get_only(
            "DEVICE_INFO",
            0x0060,
            vec![
                field("protocol_major", K::UInt8),
                field("protocol_minor", K::UInt8),
                field("device_model", K::UInt16),
                field("product_category", K::UInt16),
                field("software_version", K::UInt32),
                field("dmx_footprint", K::UInt16),
                field("current_personality", K::UInt8),
                field("personality_count", K::UInt8),
                field("dmx_start_address", K::UInt16),
                field("sub_device_count", K::UInt16),
                field("sensor_count", K::UInt8),
            ],
        ),
        PidDescriptor::new("MANUFACTURER_LABEL", 0x0081)
            .with_get(Descriptor::empty("MANUFACTURER_LABEL"), label("MANUFACTURER_LABEL")),
        PidDescriptor::new("DEVICE_LABEL", 0x0082)
            .with_get(Descriptor::empty("DEVICE_LABEL"), label("DEVICE_LABEL"))
            .with_set(label("DEVICE_LABEL"), Descriptor::empty("DEVICE_LABEL")),
        PidDescriptor::new("SOFTWARE_VERSION_LABEL", 0x00C0).with_get(
            Descriptor::empty("SOFTWARE_VERSION_LABEL"),
            label("SOFTWARE_VERSION_LABEL"),
        ),
        PidDescriptor::new("DMX_START_ADDRESS", 0x00F0)
            .with_get(
                Descriptor::empty("DMX_START_ADDRESS"),
                Descriptor::new("DMX_START_ADDRESS", vec![field("dmx_address", K::UInt16)]),
            )
            .with_set(
                Descriptor::new("DMX_START_ADDRESS", vec![field("dmx_address", K::UInt16)]),
                Descriptor::empty("DMX_START_ADDRESS"),
            ),
        get_only("DEVICE_HOURS", 0x0400, vec![field("hours", K::UInt32)]),
        PidDescriptor::new("IDENTIFY_DEVICE", 0x1000)
            .with_get(
                Descriptor::empty("IDENTIFY_DEVICE"),
                Descriptor::new("IDENTIFY_DEVICE", vec![field("identify_state", K::Bool)]),
            )
            .with_set(
                Descriptor::new("IDENTIFY_DEVICE", vec![field("identify_state", K::Bool)]),
                Descriptor::empty("IDENTIFY_DEVICE"),
            ),
        PidDescriptor::new("RESET_DEVICE", 0x1001).with_set(
            Descriptor::new("RESET_DEVICE", vec![field("reset_device", K::UInt8)]),
            Descriptor::empty("RESET_DEVICE"),
        ),
    ]
}

// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{fmt, str::FromStr};

use crate::error::Error;

/// Manufacturer IDs are assigned by ESTA (16 bit).
pub type ManufacturerId = u16;

/// Device ID, unique per manufacturer (32 bit).
pub type DeviceId = u32;

/// Device id that addresses every device of a manufacturer.
pub const ALL_DEVICES: DeviceId = 0xFFFF_FFFF;

/// The unique identifier of an RDM device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid {
    manufacturer_id: ManufacturerId,
    device_id: DeviceId,
}

impl Uid {
    #[must_use]
    pub const fn new(manufacturer_id: ManufacturerId, device_id: DeviceId) -> Self {
        Self {
            manufacturer_id,
            device_id,
        }
    }

    #[must_use]
    pub const fn manufacturer_id(&self) -> ManufacturerId {
        self.manufacturer_id
    }

    #[must_use]
    pub const fn device_id(&self) -> DeviceId {
        self.device_id
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:08x}", self.manufacturer_id, self.device_id)
    }
}

impl FromStr for Uid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidUid(s.to_owned());
        let (manufacturer, device) = s.split_once(':').ok_or_else(invalid)?;
        if manufacturer.is_empty() || manufacturer.len() > 4 {
            return Err(invalid());
        }
        if device.is_empty() || device.len() > 8 {
            return Err(invalid());
        }
        let manufacturer_id = u16::from_str_radix(manufacturer, 16).map_err(|_| invalid())?;
        let device_id = u32::from_str_radix(device, 16).map_err(|_| invalid())?;
        Ok(Self::new(manufacturer_id, device_id))
    }
}

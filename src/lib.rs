// SPDX-FileCopyrightText: Copyright (c) 2018-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

#![doc = include_str!("../README.md")]

mod bridge;
mod classify;
mod codec;
mod controller;
mod error;
mod frame;
mod pid;
mod reactor;

pub mod cli;

#[cfg(test)]
mod mock;

pub use bridge::*;
pub use classify::*;
pub use codec::*;
pub use controller::*;
pub use error::*;
pub use frame::*;
pub use pid::*;
pub use reactor::*;

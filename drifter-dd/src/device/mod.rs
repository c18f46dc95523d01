// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Device
//!
//! Controls the deserialization and storage of the layered device description, and the
//! info desk traits which yield the material information needed by the solvers.

/// Material parameters and the per-region information consumed by the solvers
pub mod info_desk;
/// The deserialization and storage of the `Device`
mod reader;

pub use info_desk::{DeviceInfoDesk, Material, MaterialModel, RegionInfoDesk};
pub use reader::{Device, Layer};

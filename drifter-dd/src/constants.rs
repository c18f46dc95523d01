// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Constants
//!
//! Defines physical constants used in the simulation. Lengths are measured in centimetres.

pub const BOLTZMANN: f64 = 1.380662e-23; // The Boltzmann constant in J / K
pub const ELECTRON_CHARGE: f64 = 1.6021892e-19; // Single electron charge in C
pub const EPSILON_0: f64 = 8.854187818e-14; // Permitivitty of free space in F / cm
/// Temperature at which band parameters are quoted in K
pub const REFERENCE_TEMPERATURE: f64 = 300.0;
pub const THERMAL_VOLTAGE_PER_KELVIN: f64 = BOLTZMANN / ELECTRON_CHARGE; // k / q in V / K

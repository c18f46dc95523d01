// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Scalar
//!
//! The floating point type every numerical component is generic over. Carrier densities and
//! potentials differ by tens of orders of magnitude, so the precision of the simulation is chosen
//! by the caller. Wider types can be used by implementing `nalgebra::RealField` and `Scalar` for
//! them.

use nalgebra::RealField;
use std::{fmt::LowerExp, str::FromStr};

/// A real floating point type usable throughout the solver
pub trait Scalar: Copy + Default + RealField + LowerExp + FromStr {
    /// The smallest positive normal value of the type
    fn min_positive() -> Self;

    /// Converts an `f64` constant into the scalar type
    fn from_f64_constant(value: f64) -> Self {
        Self::from_subset(&value)
    }

    /// The nearest `f64`, used for diagnostics and error reports
    fn to_f64_lossy(self) -> f64 {
        self.to_subset().unwrap_or(f64::NAN)
    }
}

impl Scalar for f64 {
    fn min_positive() -> Self {
        f64::MIN_POSITIVE
    }
}

impl Scalar for f32 {
    fn min_positive() -> Self {
        f32::MIN_POSITIVE
    }
}

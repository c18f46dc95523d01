// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Bernoulli
//!
//! The Bernoulli function `B(x) = x / (exp(x) - 1)` and its relatives weight the
//! Scharfetter-Gummel fluxes. All three functions have a removable singularity or a
//! cancellation at the origin, so close to zero they are evaluated from their Taylor series.

use crate::Scalar;

/// Below this magnitude the series are used, their truncation error is below 1e-17
const SERIES_THRESHOLD: f64 = 1e-2;

/// The Bernoulli function `x / (exp(x) - 1)`, equal to one at the origin
#[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
pub fn bernoulli<T: Scalar>(x: T) -> T {
    if x.abs() < T::from_f64_constant(SERIES_THRESHOLD) {
        let x2 = x * x;
        1.0 - x / 2.0 + x2 / 12.0 * (1.0 - x2 / 60.0 * (1.0 - x2 / 42.0))
    } else {
        x / exp_minus_one(x)
    }
}

/// `exp(x) - 1` without cancellation for small arguments
pub fn exp_minus_one<T: Scalar>(x: T) -> T {
    x.exp_m1()
}

/// The derivative of the Bernoulli function, equal to `-1/2` at the origin
///
/// Away from the origin this is `(1 - B(x) exp(x)) / (exp(x) - 1)`, which is evaluated through
/// the identity `B(x) exp(x) = B(-x)` so that large arguments do not overflow.
#[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
pub fn bernoulli_derivative<T: Scalar>(x: T) -> T {
    if x.abs() < T::from_f64_constant(SERIES_THRESHOLD) {
        let x2 = x * x;
        -0.5 + x / 6.0 * (1.0 - x2 / 30.0 * (1.0 - x2 / 28.0))
    } else {
        (1.0 - bernoulli(-x)) / exp_minus_one(x)
    }
}

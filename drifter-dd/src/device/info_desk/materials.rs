// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use super::{thermal_voltage, MaterialModel};
use crate::{constants::EPSILON_0, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[non_exhaustive]
/// Enum with all implemented material types
///
/// As materials may be added in future this is labelled as `non_exhaustive`
pub enum Material {
    #[serde(rename = "Si")]
    Silicon,
    #[serde(rename = "SiO2")]
    SiliconDioxide,
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Material::Silicon => {
                write!(f, "Si")
            }
            Material::SiliconDioxide => {
                write!(f, "SiO2")
            }
        }
    }
}

impl<T: Scalar> MaterialModel<T> for Material {
    fn priority(&self) -> i32 {
        match self {
            Material::Silicon => 0,
            Material::SiliconDioxide => 100,
        }
    }

    fn is_semiconductor(&self) -> bool {
        matches!(self, Material::Silicon)
    }

    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn permittivity(&self) -> T {
        let epsilon_0 = T::from_f64_constant(EPSILON_0);
        match self {
            Material::Silicon => 11.7 * epsilon_0,
            Material::SiliconDioxide => 3.9 * epsilon_0,
        }
    }

    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn electron_mobility(&self) -> T {
        match self {
            Material::Silicon => 1417.0,
            Material::SiliconDioxide => 0.0,
        }
    }

    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn hole_mobility(&self) -> T {
        match self {
            Material::Silicon => 470.5,
            Material::SiliconDioxide => 0.0,
        }
    }

    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn electron_affinity(&self) -> T {
        match self {
            Material::Silicon => 4.17,
            Material::SiliconDioxide => 0.97,
        }
    }

    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn band_gap(&self) -> T {
        match self {
            Material::Silicon => 1.08,
            Material::SiliconDioxide => 9.0,
        }
    }

    /// Slotboom band gap narrowing in the total doping `donor_density + acceptor_density`
    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn band_gap_narrowing(&self, donor_density: T, acceptor_density: T) -> T {
        match self {
            Material::Silicon => {
                let (v1, n0, c) = (9e-3, 1e17, 0.5);
                let total = donor_density + acceptor_density;
                if total <= 0.0 {
                    return 0.0;
                }
                let log_ratio = (total / n0).ln();
                let root = (log_ratio * log_ratio + c).sqrt();
                if log_ratio >= 0.0 {
                    v1 * (log_ratio + root)
                } else {
                    // Equal to v1 * (log_ratio + root)
                    v1 * c / (root - log_ratio)
                }
            }
            Material::SiliconDioxide => 0.0,
        }
    }

    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn intrinsic_density(&self, temperature: T, narrowing: T) -> T {
        match self {
            Material::Silicon => {
                // Nc * Nv overflows single precision
                self.conduction_band_density(temperature).sqrt()
                    * self.valence_band_density(temperature).sqrt()
                    * ((narrowing - MaterialModel::<T>::band_gap(self)) * 0.5
                        / thermal_voltage(temperature))
                    .exp()
            }
            Material::SiliconDioxide => 0.0,
        }
    }

    #[numeric_literals::replace_float_literals(T::from_f64_constant(literal))]
    fn built_in_potential(&self, temperature: T, donor_density: T, acceptor_density: T) -> T {
        match self {
            Material::Silicon => {
                let narrowing = self.band_gap_narrowing(donor_density, acceptor_density);
                let intrinsic = self.intrinsic_density(temperature, narrowing);
                thermal_voltage(temperature)
                    * ((donor_density - acceptor_density) * 0.5 / intrinsic).asinh()
            }
            Material::SiliconDioxide => 0.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Material;
    use crate::device::MaterialModel;
    use approx::assert_relative_eq;

    #[test]
    fn material_names_deserialize() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            materials: Vec<Material>,
        }
        let source = config::Config::builder()
            .add_source(config::File::from_str(
                r#"materials = ["Si", "SiO2"]"#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let wrapper: Wrapper = source.try_deserialize().unwrap();
        assert_eq!(
            wrapper.materials,
            vec![Material::Silicon, Material::SiliconDioxide]
        );
        assert_eq!(Material::SiliconDioxide.to_string(), "SiO2");
    }

    const SILICON: &dyn MaterialModel<f64> = &Material::Silicon;
    const OXIDE: &dyn MaterialModel<f64> = &Material::SiliconDioxide;

    #[test]
    fn silicon_is_governing_over_oxide() {
        assert!(SILICON.priority() < OXIDE.priority());
        assert!(SILICON.is_semiconductor());
        assert_eq!(OXIDE.hole_mobility(), 0.0);
    }

    #[test]
    fn narrowing_is_continuous_at_the_reference_density() {
        let si = SILICON;
        let below = si.band_gap_narrowing(1e17 * (1.0 - 1e-9), 0.0);
        let above = si.band_gap_narrowing(1e17 * (1.0 + 1e-9), 0.0);
        assert_relative_eq!(below, above, max_relative = 1e-6);
        assert_relative_eq!(below, 9e-3 * 0.5_f64.sqrt(), max_relative = 1e-6);
        assert_eq!(si.band_gap_narrowing(0.0, 0.0), 0.0);
        assert!(si.band_gap_narrowing(1e20, 0.0) > si.band_gap_narrowing(1e15, 0.0));
    }

    #[test]
    fn intrinsic_density_of_undoped_silicon() {
        let ni = SILICON.intrinsic_density(300.0, 0.0);
        // sqrt(2.8e19 * 1.04e19) * exp(-1.08 / (2 kT / q))
        assert!(ni > 1e9 && ni < 1e11);
        let narrowed = SILICON.intrinsic_density(300.0, 0.05);
        assert!(narrowed > ni);
    }

    #[test]
    fn built_in_potential_matches_the_majority_carrier() {
        let si = SILICON;
        let temperature = 300.0;
        let nd = 1e18;
        let psi = si.built_in_potential(temperature, nd, 0.0);
        let narrowing = si.band_gap_narrowing(nd, 0.0);
        let ni = si.intrinsic_density(temperature, narrowing);
        let thermal = crate::device::info_desk::thermal_voltage(temperature);
        // n = ni exp(psi / vT) recovers the donor density in the neutral region
        let n = ni * (psi / thermal).exp();
        assert_relative_eq!(n - ni * ni / n, nd, max_relative = 1e-10);
        assert!(si.built_in_potential(temperature, 0.0, nd) < 0.0);
        assert_eq!(OXIDE.built_in_potential(300.0, nd, 0.0), 0.0);
    }

    #[test]
    fn work_function_lies_between_affinity_and_gap() {
        let wf = SILICON.work_function(300.0);
        assert!(wf > 4.17 + 0.5 && wf < 4.17 + 0.6);
        let expected = 0.97 + 4.5 + 0.5 * 0.025852 * (2.8f64 / 1.04).ln();
        assert_relative_eq!(OXIDE.work_function(300.0), expected, max_relative = 1e-3);
    }
}

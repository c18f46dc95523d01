// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Material physics and the per-region information consumed by the solvers
//!
//! The `MaterialModel` trait describes the bulk physics of a single material, the
//! `RegionInfoDesk` trait maps every region of the mesh onto its material, doping and the
//! device temperature.

mod materials;

pub use materials::Material;

use super::Device;
use crate::{
    constants::{REFERENCE_TEMPERATURE, THERMAL_VOLTAGE_PER_KELVIN},
    error::BuildError,
    Scalar,
};

/// The bulk physics of a material
///
/// Energies are in eV, densities in cm^-3, mobilities in cm^2 / Vs and the permittivity in F / cm.
pub trait MaterialModel<T: Scalar> {
    /// The priority of the material when several meet at a node, the lowest value governs
    fn priority(&self) -> i32;
    fn is_semiconductor(&self) -> bool;
    fn permittivity(&self) -> T;
    /// Low field electron mobility, zero in an insulator
    fn electron_mobility(&self) -> T {
        T::zero()
    }
    /// Low field hole mobility, zero in an insulator
    fn hole_mobility(&self) -> T {
        T::zero()
    }
    fn electron_affinity(&self) -> T;
    fn band_gap(&self) -> T;

    /// Effective density of states in the conduction band
    fn conduction_band_density(&self, temperature: T) -> T {
        let reduced = temperature / T::from_f64_constant(REFERENCE_TEMPERATURE);
        T::from_f64_constant(2.8e19) * reduced * reduced.sqrt()
    }

    /// Effective density of states in the valence band
    fn valence_band_density(&self, temperature: T) -> T {
        let reduced = temperature / T::from_f64_constant(REFERENCE_TEMPERATURE);
        T::from_f64_constant(1.04e19) * reduced * reduced.sqrt()
    }

    /// The narrowing of the band gap due to heavy doping
    fn band_gap_narrowing(&self, _donor_density: T, _acceptor_density: T) -> T {
        T::zero()
    }

    /// The intrinsic carrier density for a gap narrowed by `narrowing`
    fn intrinsic_density(&self, _temperature: T, _narrowing: T) -> T {
        T::zero()
    }

    /// The equilibrium electrostatic potential of a neutral region with the given doping
    fn built_in_potential(&self, _temperature: T, _donor_density: T, _acceptor_density: T) -> T {
        T::zero()
    }

    /// The intrinsic Fermi level measured from the valence band edge
    fn intrinsic_fermi_level(&self, temperature: T) -> T {
        let ratio = self.conduction_band_density(temperature)
            / self.valence_band_density(temperature);
        (self.band_gap() + thermal_voltage(temperature) * ratio.ln())
            / T::from_f64_constant(2.0)
    }

    /// The work function measured from the vacuum level
    fn work_function(&self, temperature: T) -> T {
        self.intrinsic_fermi_level(temperature) + self.electron_affinity()
    }
}

/// The thermal voltage `kT / q` in volts
pub(crate) fn thermal_voltage<T: Scalar>(temperature: T) -> T {
    T::from_f64_constant(THERMAL_VOLTAGE_PER_KELVIN) * temperature
}

/// Per-region information required to discretise a device
pub trait RegionInfoDesk<T: Scalar> {
    /// The material model, compared to detect interfaces between different materials
    type Material: MaterialModel<T> + PartialEq;

    fn number_of_regions(&self) -> usize;
    fn material(&self, region: usize) -> &Self::Material;
    fn donor_density(&self, region: usize) -> T;
    fn acceptor_density(&self, region: usize) -> T;
    /// The lattice temperature in Kelvin
    fn temperature(&self) -> T;
}

/// Struct holding the material information of every layer in the device
#[derive(Debug, Clone)]
pub struct DeviceInfoDesk<T> {
    /// The material of each layer in the stack
    materials: Vec<Material>,
    /// The donor density of each layer in the stack
    donor_densities: Vec<T>,
    /// The acceptor density of each layer in the stack
    acceptor_densities: Vec<T>,
    /// The temperature the simulation is to be run at
    temperature: T,
}

impl<T: Scalar> DeviceInfoDesk<T> {
    /// Assembles the info desk from the materials and doping of consecutive layers
    pub fn from_layers(
        materials: Vec<Material>,
        donor_densities: Vec<T>,
        acceptor_densities: Vec<T>,
        temperature: T,
    ) -> Result<Self, BuildError> {
        if materials.is_empty() {
            return Err(BuildError::EmptyDevice);
        }
        if donor_densities.len() != materials.len() {
            return Err(BuildError::MissingMaterial {
                region: donor_densities.len().min(materials.len()),
            });
        }
        if acceptor_densities.len() != materials.len() {
            return Err(BuildError::MissingMaterial {
                region: acceptor_densities.len().min(materials.len()),
            });
        }
        Ok(Self {
            materials,
            donor_densities,
            acceptor_densities,
            temperature,
        })
    }

    /// Builds the info desk for every layer of `device`
    pub fn from_device(device: &Device<T>) -> Result<Self, BuildError> {
        Self::from_layers(
            device.iter().map(|layer| layer.material).collect(),
            device.iter().map(|layer| layer.donor_density).collect(),
            device.iter().map(|layer| layer.acceptor_density).collect(),
            device.temperature,
        )
    }
}

impl<T: Scalar> RegionInfoDesk<T> for DeviceInfoDesk<T> {
    type Material = Material;

    fn number_of_regions(&self) -> usize {
        self.materials.len()
    }

    fn material(&self, region: usize) -> &Material {
        &self.materials[region]
    }

    fn donor_density(&self, region: usize) -> T {
        self.donor_densities[region]
    }

    fn acceptor_density(&self, region: usize) -> T {
        self.acceptor_densities[region]
    }

    fn temperature(&self) -> T {
        self.temperature
    }
}

#[cfg(test)]
mod test {
    use super::{DeviceInfoDesk, Material, MaterialModel, RegionInfoDesk};
    use crate::error::BuildError;

    #[test]
    fn regions_map_onto_their_layers() {
        let info_desk = DeviceInfoDesk::from_layers(
            vec![Material::Silicon, Material::SiliconDioxide],
            vec![1e17, 0.0],
            vec![0.0, 0.0],
            300.0,
        )
        .unwrap();
        assert_eq!(info_desk.number_of_regions(), 2);
        assert!(MaterialModel::<f64>::is_semiconductor(info_desk.material(0)));
        assert!(!MaterialModel::<f64>::is_semiconductor(info_desk.material(1)));
        assert_eq!(info_desk.donor_density(0), 1e17);
        assert_eq!(info_desk.temperature(), 300.0);
    }

    #[test]
    fn inconsistent_layers_are_rejected() {
        assert!(matches!(
            DeviceInfoDesk::<f64>::from_layers(vec![], vec![], vec![], 300.0),
            Err(BuildError::EmptyDevice)
        ));
        assert!(matches!(
            DeviceInfoDesk::from_layers(vec![Material::Silicon], vec![], vec![0.0], 300.0),
            Err(BuildError::MissingMaterial { region: 0 })
        ));
    }
}

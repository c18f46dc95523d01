// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Field
//!
//! Named per-node arrays holding the state of the simulation. The arrays are sized once from
//! the mesh and are updated in place by the Newton solvers.

use crate::{
    device::{info_desk::thermal_voltage, MaterialModel, RegionInfoDesk},
    error::{BuildError, FieldError},
    Scalar,
};
use drifter_mesher::DeviceTopology;
use nalgebra::DVector;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    str::FromStr,
};

/// The quantities stored at every node
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// Intrinsic carrier density `ni`
    IntrinsicDensity,
    /// Electrostatic potential `psi`
    Potential,
    /// Donor density `Nd`
    DonorDensity,
    /// Acceptor density `Na`
    AcceptorDensity,
    /// Electron density `elec`
    ElectronDensity,
    /// Hole density `hole`
    HoleDensity,
    /// Electron quasi-Fermi potential `phiN`
    ElectronQuasiFermiLevel,
    /// Hole quasi-Fermi potential `phiP`
    HoleQuasiFermiLevel,
}

impl Quantity {
    pub const ALL: [Quantity; 8] = [
        Quantity::IntrinsicDensity,
        Quantity::Potential,
        Quantity::DonorDensity,
        Quantity::AcceptorDensity,
        Quantity::ElectronDensity,
        Quantity::HoleDensity,
        Quantity::ElectronQuasiFermiLevel,
        Quantity::HoleQuasiFermiLevel,
    ];

    /// The short name used in output files
    pub fn name(&self) -> &'static str {
        match self {
            Quantity::IntrinsicDensity => "ni",
            Quantity::Potential => "psi",
            Quantity::DonorDensity => "Nd",
            Quantity::AcceptorDensity => "Na",
            Quantity::ElectronDensity => "elec",
            Quantity::HoleDensity => "hole",
            Quantity::ElectronQuasiFermiLevel => "phiN",
            Quantity::HoleQuasiFermiLevel => "phiP",
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Quantity {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::ALL
            .into_iter()
            .find(|quantity| quantity.name() == s)
            .ok_or_else(|| FieldError::UnknownQuantity(s.to_string()))
    }
}

/// The named arrays of the simulation, one value per mesh node
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T: Scalar> {
    pub(crate) intrinsic_density: DVector<T>,
    pub(crate) potential: DVector<T>,
    pub(crate) donor_density: DVector<T>,
    pub(crate) acceptor_density: DVector<T>,
    pub(crate) electron_density: DVector<T>,
    pub(crate) hole_density: DVector<T>,
    pub(crate) electron_quasi_fermi_level: DVector<T>,
    pub(crate) hole_quasi_fermi_level: DVector<T>,
}

impl<T: Scalar> Field<T> {
    /// Initialises the field in local equilibrium
    ///
    /// Every node carries the summed doping of the regions bordering it. The potential is the
    /// built-in potential of the node's governing material, the carrier densities follow from
    /// the Boltzmann relations with both quasi-Fermi levels at zero.
    pub fn build<Mesh, InfoDesk>(mesh: &Mesh, info_desk: &InfoDesk) -> Result<Self, BuildError>
    where
        Mesh: DeviceTopology<T>,
        InfoDesk: RegionInfoDesk<T>,
    {
        let num_nodes = mesh.number_of_nodes();
        let number_of_regions = info_desk.number_of_regions();
        let temperature = info_desk.temperature();
        let thermal = thermal_voltage(temperature);

        let mut field = Self::zeros(num_nodes);
        for node in 0..num_nodes {
            let mut regions: Vec<usize> = mesh
                .node_elements(node)
                .iter()
                .map(|&element| mesh.element_region(element))
                .collect();
            regions.sort_unstable();
            regions.dedup();
            for region in regions {
                if region >= number_of_regions {
                    return Err(BuildError::MissingMaterial { region });
                }
                field.donor_density[node] += info_desk.donor_density(region);
                field.acceptor_density[node] += info_desk.acceptor_density(region);
            }

            let governing = mesh.node_region(node);
            if governing >= number_of_regions {
                return Err(BuildError::MissingMaterial { region: governing });
            }
            let material = info_desk.material(governing);
            let (donor, acceptor) = (field.donor_density[node], field.acceptor_density[node]);

            let potential = material.built_in_potential(temperature, donor, acceptor);
            let narrowing = material.band_gap_narrowing(donor, acceptor);
            let intrinsic_density = material.intrinsic_density(temperature, narrowing);
            let factor = (potential / thermal).exp();

            field.potential[node] = potential;
            field.intrinsic_density[node] = intrinsic_density;
            field.electron_density[node] = intrinsic_density * factor;
            field.hole_density[node] = intrinsic_density / factor;
        }
        tracing::debug!("Initialised the field on {} nodes", num_nodes);
        Ok(field)
    }

    fn zeros(num_nodes: usize) -> Self {
        Self {
            intrinsic_density: DVector::zeros(num_nodes),
            potential: DVector::zeros(num_nodes),
            donor_density: DVector::zeros(num_nodes),
            acceptor_density: DVector::zeros(num_nodes),
            electron_density: DVector::zeros(num_nodes),
            hole_density: DVector::zeros(num_nodes),
            electron_quasi_fermi_level: DVector::zeros(num_nodes),
            hole_quasi_fermi_level: DVector::zeros(num_nodes),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.potential.len()
    }

    pub fn get(&self, quantity: Quantity) -> &DVector<T> {
        match quantity {
            Quantity::IntrinsicDensity => &self.intrinsic_density,
            Quantity::Potential => &self.potential,
            Quantity::DonorDensity => &self.donor_density,
            Quantity::AcceptorDensity => &self.acceptor_density,
            Quantity::ElectronDensity => &self.electron_density,
            Quantity::HoleDensity => &self.hole_density,
            Quantity::ElectronQuasiFermiLevel => &self.electron_quasi_fermi_level,
            Quantity::HoleQuasiFermiLevel => &self.hole_quasi_fermi_level,
        }
    }

    /// Mutable access to a stored array, which can be changed but never resized
    pub fn get_mut(&mut self, quantity: Quantity) -> &mut DVector<T> {
        match quantity {
            Quantity::IntrinsicDensity => &mut self.intrinsic_density,
            Quantity::Potential => &mut self.potential,
            Quantity::DonorDensity => &mut self.donor_density,
            Quantity::AcceptorDensity => &mut self.acceptor_density,
            Quantity::ElectronDensity => &mut self.electron_density,
            Quantity::HoleDensity => &mut self.hole_density,
            Quantity::ElectronQuasiFermiLevel => &mut self.electron_quasi_fermi_level,
            Quantity::HoleQuasiFermiLevel => &mut self.hole_quasi_fermi_level,
        }
    }

    /// Looks an array up by its short name
    pub fn by_name(&self, name: &str) -> Result<&DVector<T>, FieldError> {
        Ok(self.get(name.parse()?))
    }

    /// Writes `quantity` to the file at `path`, or to stdout when no path is given
    ///
    /// The output is headed by `### name` and holds one `index value` line per node.
    pub fn output(&self, quantity: Quantity, path: Option<&Path>) -> Result<(), FieldError> {
        match path {
            Some(path) => {
                let mut writer = BufWriter::new(File::create(path)?);
                self.write(quantity, &mut writer)?;
                writer.flush()?;
            }
            None => {
                let stdout = std::io::stdout();
                let mut writer = stdout.lock();
                self.write(quantity, &mut writer)?;
            }
        }
        Ok(())
    }

    fn write<W: Write>(&self, quantity: Quantity, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "### {}", quantity)?;
        for (node, value) in self.get(quantity).iter().enumerate() {
            writeln!(writer, "{} {:.16e}", node, value)?;
        }
        Ok(())
    }
}

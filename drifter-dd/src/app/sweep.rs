// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The equilibrium solve followed by the two carrier voltage sweep

use super::Configuration;
use crate::{
    device::RegionInfoDesk,
    error::FieldError,
    field::{Field, Quantity},
    newton::{NewtonSolverBuilder, NewtonStep},
    Scalar,
};
use drifter_mesher::DeviceTopology;
use std::path::Path;

const DOPING: [Quantity; 2] = [Quantity::DonorDensity, Quantity::AcceptorDensity];
const SOLUTION: [Quantity; 3] = [
    Quantity::Potential,
    Quantity::ElectronDensity,
    Quantity::HoleDensity,
];

/// Writes each quantity to `{name}_{suffix}` in `directory`
fn write_fields<T: Scalar>(
    field: &Field<T>,
    quantities: &[Quantity],
    suffix: &str,
    directory: &Path,
) -> Result<(), FieldError> {
    for &quantity in quantities {
        let path = directory.join(format!("{}_{}", quantity, suffix));
        field.output(quantity, Some(path.as_path()))?;
    }
    Ok(())
}

/// Relaxes `field` to equilibrium, then steps the bias on the last contact
#[tracing::instrument(name = "sweep", skip_all)]
pub(crate) fn run_sweep<T, Mesh, InfoDesk>(
    config: &Configuration<T>,
    mesh: &Mesh,
    info_desk: &InfoDesk,
    field: &mut Field<T>,
    output: &Path,
) -> color_eyre::Result<()>
where
    T: Scalar,
    Mesh: DeviceTopology<T>,
    InfoDesk: RegionInfoDesk<T>,
{
    write_fields(field, &DOPING, "00", output)?;

    tracing::info!("Single carrier equilibrium");
    let convergence = config.poisson_convergence();
    {
        let mut solver = NewtonSolverBuilder::new()
            .with_mesh(mesh)
            .with_info_desk(info_desk)
            .with_field(&mut *field)
            .with_convergence_settings(&convergence)
            .build_poisson()?;
        solver.set_voltage(T::zero());
        let iterations = solver.run_to_convergence()?;
        tracing::info!("Equilibrium reached in {} iterations", iterations);
    }
    write_fields(field, &SOLUTION, "00", output)?;

    tracing::info!("Two carrier sweep");
    let convergence = config.drift_diffusion_convergence(output);
    let mut solver = NewtonSolverBuilder::new()
        .with_mesh(mesh)
        .with_info_desk(info_desk)
        .with_field(field)
        .with_convergence_settings(&convergence)
        .build_drift_diffusion()?;
    let write_iterations = config.sweep.write_iterations;
    for step in 0..config.sweep.steps {
        let voltage = T::from_f64_constant(step as f64) * config.sweep.voltage_step;
        solver.set_voltage(voltage);
        let iterations = solver.run_to_convergence_with(|iteration, field| {
            if write_iterations {
                write_fields(field, &SOLUTION, &format!("{}_{}", step, iteration), output)?;
            }
            Ok(())
        })?;
        tracing::info!("Step {} converged in {} iterations", step, iterations);
        write_fields(solver.field(), &SOLUTION, &step.to_string(), output)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::write_fields;
    use crate::{field::Field, newton::fixtures};

    #[test]
    fn fields_are_written_with_their_suffix() {
        let (mesh, info_desk) = fixtures::bar(1e17, 5);
        let field = Field::build(&mesh, &info_desk).unwrap();
        let directory = tempfile::tempdir().unwrap();
        write_fields(&field, &super::SOLUTION, "3_1", directory.path()).unwrap();

        for name in ["psi_3_1", "elec_3_1", "hole_3_1"] {
            let contents = std::fs::read_to_string(directory.path().join(name)).unwrap();
            let mut lines = contents.lines();
            assert!(lines.next().unwrap().starts_with("### "));
            assert_eq!(lines.count(), 5);
        }
    }
}

// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use super::{Material, MaterialModel};
use crate::{error::BuildError, Scalar};
use color_eyre::eyre::eyre;
use config::{Config, File};
use drifter_mesher::{create_line_segment_mesh_1d_from_regions, Mesh1d, Region};
use serde::{de::DeserializeOwned, Deserialize};
use std::{ops::Deref, path::PathBuf};

/// A stack of homogeneous layers held at a fixed temperature
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Device<T> {
    /// The lattice temperature in Kelvin
    pub temperature: T,
    pub layers: Vec<Layer<T>>,
}

impl<T> Deref for Device<T> {
    type Target = Vec<Layer<T>>;

    fn deref(&self) -> &Self::Target {
        &self.layers
    }
}

/// A single layer of the device
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Layer<T> {
    pub material: Material,
    /// The thickness of the layer in micrometres
    pub thickness: T,
    /// The number of elements the layer is divided into
    pub divisions: usize,
    /// Donor density in cm^-3
    #[serde(default)]
    pub donor_density: T,
    /// Acceptor density in cm^-3
    #[serde(default)]
    pub acceptor_density: T,
}

impl<T: DeserializeOwned + Default> Device<T> {
    /// Reads a device description from a `.toml` file
    pub fn build(path: PathBuf) -> color_eyre::Result<Self> {
        let s = Config::builder().add_source(File::from(path)).build()?;
        let device: Self = s
            .try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize device: {:?}", e))?;
        if device.layers.is_empty() {
            return Err(BuildError::EmptyDevice.into());
        }
        Ok(device)
    }
}

impl<T: Scalar> Device<T> {
    /// The mesh regions described by the layers, in order from the left contact
    pub fn regions(&self) -> Vec<Region<T>> {
        self.layers
            .iter()
            .map(|layer| Region {
                thickness: layer.thickness,
                divisions: layer.divisions,
                priority: <Material as MaterialModel<T>>::priority(&layer.material),
            })
            .collect()
    }

    /// Meshes the device starting from the origin
    ///
    /// Layer thicknesses are multiplied by `length_scale` to give element lengths, every element
    /// shares the cross-section `cross_section`.
    pub fn build_mesh(&self, length_scale: T, cross_section: T) -> Result<Mesh1d<T>, BuildError> {
        if self.layers.is_empty() {
            return Err(BuildError::EmptyDevice);
        }
        let mesh = create_line_segment_mesh_1d_from_regions(&self.regions(), T::zero())?
            .with_length_scale(length_scale)
            .with_cross_section(cross_section);
        tracing::info!(
            "Meshed {} layers into {} nodes",
            self.layers.len(),
            mesh.num_nodes()
        );
        Ok(mesh)
    }
}

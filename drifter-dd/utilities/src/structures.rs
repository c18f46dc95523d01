use drifter_dd::{
    device::{Device, DeviceInfoDesk, Layer, Material},
    field::Field,
};
use drifter_mesher::Mesh1d;

/// A silicon n+/p/n+ stack with `divisions` elements in every layer
pub fn construct_npn_device(divisions: usize) -> Device<f64> {
    let layer = |donor_density, acceptor_density| Layer {
        material: Material::Silicon,
        thickness: 0.5,
        divisions,
        donor_density,
        acceptor_density,
    };
    Device {
        temperature: 300.0,
        layers: vec![layer(1e20, 0.0), layer(0.0, 1e18), layer(1e20, 0.0)],
    }
}

/// The mesh, info desk and initial field of a device
pub fn construct_problem(device: &Device<f64>) -> (Mesh1d<f64>, DeviceInfoDesk<f64>, Field<f64>) {
    let info_desk = DeviceInfoDesk::from_device(device).unwrap();
    let mesh = device.build_mesh(1e-4, 1.0).unwrap();
    let field = Field::build(&mesh, &info_desk).unwrap();
    (mesh, info_desk, field)
}

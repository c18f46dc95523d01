use miette::Diagnostic;

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Errors raised while generating a mesh
pub enum MeshError {
    #[error("A mesh needs at least one region")]
    NoRegions,
    #[error("Region {region} has no divisions")]
    NoDivisions { region: usize },
    #[error("Region {region} has a non-positive thickness")]
    Thickness { region: usize },
}

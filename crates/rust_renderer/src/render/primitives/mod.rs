//! Geometry and camera primitives

pub mod camera;
pub mod vertex;

pub use camera::Camera;
pub use vertex::Vertex;

//! Scene contents: drawable registry and lighting

pub mod light;
pub mod registry;

pub use light::DirectionalLight;
pub use registry::{Drawable, DrawableSource, Mesh, MeshId, Model, ModelId, SceneError, SceneRegistry};

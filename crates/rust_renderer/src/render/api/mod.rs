//! Collaborator interfaces
//!
//! The renderer talks to the window, the camera and the UI overlay only
//! through the traits in this module.

pub mod frame_data;
pub mod overlay;
pub mod surface;

pub use frame_data::{CameraSource, FrameInput};
pub use overlay::{NullOverlay, OverlayFrame, OverlayRenderer, OverlayState, OverlayTargets};
pub use surface::RenderSurface;

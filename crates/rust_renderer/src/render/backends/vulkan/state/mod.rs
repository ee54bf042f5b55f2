//! Swapchain-dependent state and frame synchronisation

pub mod presentation;
pub mod swapchain;
pub mod sync;

pub use presentation::{PresentationDesc, PresentationTargets, TargetCounts};
pub use swapchain::{AcquireOutcome, PresentOutcome, Swapchain};
pub use sync::{Fence, FrameSync, FrameSyncSet, Semaphore};

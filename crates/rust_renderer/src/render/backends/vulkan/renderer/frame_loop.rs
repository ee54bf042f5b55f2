//! # Frame Loop
//!
//! The per-frame protocol, separated from the Vulkan calls that carry it out.
//! [`FrameLoop`] owns the slot counter and the resize flag and drives a
//! [`FrameBackend`] through wait, acquire, update, record, submit and present.
//!
//! A slot's fence is reset immediately before the submit that signals it.
//! A frame abandoned earlier, for a swapchain rebuild or an error while
//! recording, leaves the fence signalled so the next wait on that slot
//! returns.

use crate::render::backends::vulkan::VulkanResult;

pub use crate::render::backends::vulkan::state::{AcquireOutcome, PresentOutcome};

/// Last phase a frame slot reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Fence waited, nothing in progress
    Idle,
    /// Waiting for a swapchain image
    Acquiring,
    /// Uniforms and command buffers being written
    Recording,
    /// Work submitted to the graphics queue
    Submitted,
    /// Image handed to the presentation engine
    Presenting,
}

/// What a call to [`FrameLoop::run_frame`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame submitted and presented
    Rendered,
    /// Acquire found the swapchain stale; rebuilt without rendering
    SwapchainRebuilt,
    /// Frame presented, then the swapchain was rebuilt
    RenderedAndRebuilt,
}

/// Operations the frame loop sequences
///
/// `slot` indexes frame-in-flight sync objects, `image` indexes swapchain
/// images and everything allocated per image.
pub trait FrameBackend {
    /// Block until the slot's previous submission completed
    fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()>;

    /// Unsignal the slot's fence before it is submitted with
    fn reset_slot(&mut self, slot: usize) -> VulkanResult<()>;

    /// Acquire the next image, signalling the slot's image-available semaphore
    fn acquire(&mut self, slot: usize) -> VulkanResult<AcquireOutcome>;

    /// Wait for whichever slot last used `image` and mark `slot` as its user
    fn wait_for_image(&mut self, image: usize, slot: usize) -> VulkanResult<()>;

    /// Write this frame's uniforms into `image`'s buffers
    fn update_uniforms(&mut self, image: usize) -> VulkanResult<()>;

    /// Record the scene and overlay command buffers for `image`
    fn record(&mut self, image: usize) -> VulkanResult<()>;

    /// Submit `image`'s command buffers with the slot's sync objects
    fn submit(&mut self, slot: usize, image: usize) -> VulkanResult<()>;

    /// Present `image` once the slot's render-finished semaphore signals
    fn present(&mut self, slot: usize, image: usize) -> VulkanResult<PresentOutcome>;

    /// Tear down and rebuild everything that depends on the swapchain
    fn rebuild_swapchain(&mut self) -> VulkanResult<()>;
}

/// Slot counter, per-slot state and resize flag
#[derive(Debug, Clone)]
pub struct FrameLoop {
    slots: Vec<SlotState>,
    current_slot: usize,
    framebuffer_resized: bool,
    frames_presented: u64,
}

impl FrameLoop {
    /// Loop over `slot_count` frames in flight, at least one
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: vec![SlotState::Idle; slot_count.max(1)],
            current_slot: 0,
            framebuffer_resized: false,
            frames_presented: 0,
        }
    }

    /// Slot the next frame will use
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Number of frame slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Last phase reached by `slot`
    pub fn slot_state(&self, slot: usize) -> Option<SlotState> {
        self.slots.get(slot).copied()
    }

    /// Frames presented so far
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Request a rebuild at the next acquire or present
    pub fn notify_framebuffer_resized(&mut self) {
        self.framebuffer_resized = true;
    }

    /// Whether a resize is pending
    pub fn resize_pending(&self) -> bool {
        self.framebuffer_resized
    }

    /// Run one frame against `backend`
    ///
    /// Stale swapchains are rebuilt and reported through the outcome. Any
    /// other failure is returned, leaving the slot where it was.
    pub fn run_frame<B: FrameBackend + ?Sized>(&mut self, backend: &mut B) -> VulkanResult<FrameOutcome> {
        let slot = self.current_slot;

        backend.wait_for_slot(slot)?;
        self.slots[slot] = SlotState::Idle;

        self.slots[slot] = SlotState::Acquiring;
        let image = match backend.acquire(slot)? {
            AcquireOutcome::Acquired { image_index, suboptimal } if !self.framebuffer_resized => {
                if suboptimal {
                    log::trace!("Acquired suboptimal image {}", image_index);
                }
                image_index as usize
            }
            outcome => {
                log::warn!("Swapchain needs rebuilding at acquire ({:?}, resized: {})", outcome, self.framebuffer_resized);
                self.framebuffer_resized = false;
                self.slots[slot] = SlotState::Idle;
                backend.rebuild_swapchain()?;
                return Ok(FrameOutcome::SwapchainRebuilt);
            }
        };

        backend.wait_for_image(image, slot)?;

        self.slots[slot] = SlotState::Recording;
        backend.update_uniforms(image)?;
        backend.record(image)?;

        backend.reset_slot(slot)?;
        backend.submit(slot, image)?;
        self.slots[slot] = SlotState::Submitted;

        let presented = backend.present(slot, image)?;
        self.slots[slot] = SlotState::Presenting;
        self.frames_presented += 1;
        self.current_slot = (slot + 1) % self.slots.len();
        log::trace!("Frame {} presented image {} from slot {}", self.frames_presented, image, slot);

        if presented == PresentOutcome::Stale || self.framebuffer_resized {
            log::warn!("Swapchain needs rebuilding after present ({:?}, resized: {})", presented, self.framebuffer_resized);
            self.framebuffer_resized = false;
            backend.rebuild_swapchain()?;
            return Ok(FrameOutcome::RenderedAndRebuilt);
        }

        Ok(FrameOutcome::Rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DynamicOffsetMode;
    use crate::render::backends::vulkan::rendering::{scene_bindings, DrawList, SetBinding};
    use crate::render::backends::vulkan::resources::DynamicUniformBlock;
    use crate::render::backends::vulkan::state::swapchain::choose_extent;
    use crate::render::backends::vulkan::VulkanError;
    use crate::scene::{Mesh, SceneRegistry};
    use ash::vk::{self, Handle};
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Wait(usize),
        Reset(usize),
        Acquire(usize),
        WaitImage(usize, usize),
        Update(usize),
        Record(usize),
        Submit(usize, usize),
        Present(usize, usize),
        Rebuild,
    }

    /// Scripted backend modelling fences and image rotation
    struct MockBackend {
        calls: Vec<Call>,
        acquires: VecDeque<AcquireOutcome>,
        presents: VecDeque<VulkanResult<PresentOutcome>>,
        image_count: usize,
        next_image: usize,
        fence_signaled: Vec<bool>,
        rebuilds: usize,
        fail_update: bool,
    }

    impl MockBackend {
        fn new(slots: usize, image_count: usize) -> Self {
            Self {
                calls: Vec::new(),
                acquires: VecDeque::new(),
                presents: VecDeque::new(),
                image_count,
                next_image: 0,
                fence_signaled: vec![true; slots],
                rebuilds: 0,
                fail_update: false,
            }
        }

        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(c)).count()
        }
    }

    impl FrameBackend for MockBackend {
        fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()> {
            self.calls.push(Call::Wait(slot));
            // The GPU finishes whatever was submitted on this slot
            self.fence_signaled[slot] = true;
            Ok(())
        }

        fn reset_slot(&mut self, slot: usize) -> VulkanResult<()> {
            assert!(self.fence_signaled[slot], "reset of slot {slot} before its wait");
            self.calls.push(Call::Reset(slot));
            self.fence_signaled[slot] = false;
            Ok(())
        }

        fn acquire(&mut self, slot: usize) -> VulkanResult<AcquireOutcome> {
            self.calls.push(Call::Acquire(slot));
            Ok(self.acquires.pop_front().unwrap_or_else(|| {
                let image_index = self.next_image as u32;
                self.next_image = (self.next_image + 1) % self.image_count;
                AcquireOutcome::Acquired { image_index, suboptimal: false }
            }))
        }

        fn wait_for_image(&mut self, image: usize, slot: usize) -> VulkanResult<()> {
            self.calls.push(Call::WaitImage(image, slot));
            Ok(())
        }

        fn update_uniforms(&mut self, image: usize) -> VulkanResult<()> {
            self.calls.push(Call::Update(image));
            if self.fail_update {
                self.fail_update = false;
                return Err(VulkanError::CapacityExceeded {
                    what: "dynamic uniform block",
                    limit: 1,
                });
            }
            Ok(())
        }

        fn record(&mut self, image: usize) -> VulkanResult<()> {
            self.calls.push(Call::Record(image));
            Ok(())
        }

        fn submit(&mut self, slot: usize, image: usize) -> VulkanResult<()> {
            assert!(!self.fence_signaled[slot], "submit on slot {slot} with a signalled fence");
            self.calls.push(Call::Submit(slot, image));
            Ok(())
        }

        fn present(&mut self, slot: usize, image: usize) -> VulkanResult<PresentOutcome> {
            self.calls.push(Call::Present(slot, image));
            self.presents.pop_front().unwrap_or(Ok(PresentOutcome::Presented))
        }

        fn rebuild_swapchain(&mut self) -> VulkanResult<()> {
            self.calls.push(Call::Rebuild);
            self.rebuilds += 1;
            self.next_image = 0;
            Ok(())
        }
    }

    #[test]
    fn two_slots_over_five_frames() {
        crate::foundation::logging::init_for_tests();
        let mut frame_loop = FrameLoop::new(2);
        let mut backend = MockBackend::new(2, 3);

        let mut used = Vec::new();
        for _ in 0..5 {
            used.push(frame_loop.current_slot());
            assert_eq!(frame_loop.run_frame(&mut backend).expect("frame"), FrameOutcome::Rendered);
        }

        assert_eq!(used, vec![0, 1, 0, 1, 0]);
        assert_eq!(frame_loop.frames_presented(), 5);
        let submitted: Vec<usize> = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Submit(slot, _) => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(submitted, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn slot_fence_waited_before_reuse() {
        let mut frame_loop = FrameLoop::new(2);
        let mut backend = MockBackend::new(2, 3);
        for _ in 0..6 {
            frame_loop.run_frame(&mut backend).expect("frame");
        }

        // Every submit on a slot is preceded by a wait and a reset on it,
        // with no other submit on that slot in between.
        let mut waited = [false; 2];
        for call in &backend.calls {
            match *call {
                Call::Wait(slot) => waited[slot] = true,
                Call::Reset(slot) => assert!(waited[slot]),
                Call::Submit(slot, _) => {
                    assert!(waited[slot], "slot {slot} reused without waiting");
                    waited[slot] = false;
                }
                _ => {}
            }
        }
    }

    #[test]
    fn out_of_date_acquire_rebuilds_once_without_submitting() {
        crate::foundation::logging::init_for_tests();
        let mut frame_loop = FrameLoop::new(2);
        let mut backend = MockBackend::new(2, 3);
        backend.acquires.push_back(AcquireOutcome::OutOfDate);

        let outcome = frame_loop.run_frame(&mut backend).expect("frame");

        assert_eq!(outcome, FrameOutcome::SwapchainRebuilt);
        assert_eq!(backend.rebuilds, 1);
        assert_eq!(backend.count(|c| matches!(c, Call::Submit(..))), 0);
        assert_eq!(backend.count(|c| matches!(c, Call::Present(..))), 0);
        assert_eq!(backend.count(|c| matches!(c, Call::Reset(..))), 0);
        assert_eq!(frame_loop.current_slot(), 0);
        assert_eq!(frame_loop.slot_state(0), Some(SlotState::Idle));

        // The abandoned frame left the fence signalled, so the retry proceeds
        assert_eq!(frame_loop.run_frame(&mut backend).expect("frame"), FrameOutcome::Rendered);
        assert_eq!(frame_loop.current_slot(), 1);
    }

    #[test]
    fn resize_flag_aborts_acquired_frame() {
        let mut frame_loop = FrameLoop::new(2);
        let mut backend = MockBackend::new(2, 3);
        frame_loop.notify_framebuffer_resized();

        assert_eq!(frame_loop.run_frame(&mut backend).expect("frame"), FrameOutcome::SwapchainRebuilt);
        assert!(!frame_loop.resize_pending());
        assert_eq!(backend.rebuilds, 1);
        assert_eq!(backend.count(|c| matches!(c, Call::Submit(..))), 0);
    }

    #[test]
    fn stale_present_rebuilds_after_presenting() {
        let mut frame_loop = FrameLoop::new(2);
        let mut backend = MockBackend::new(2, 3);
        backend.presents.push_back(Ok(PresentOutcome::Stale));

        assert_eq!(frame_loop.run_frame(&mut backend).expect("frame"), FrameOutcome::RenderedAndRebuilt);
        assert_eq!(backend.calls.last(), Some(&Call::Rebuild));
        assert_eq!(frame_loop.current_slot(), 1);
        assert_eq!(frame_loop.slot_state(0), Some(SlotState::Presenting));
    }

    #[test]
    fn fatal_present_error_is_returned() {
        let mut frame_loop = FrameLoop::new(2);
        let mut backend = MockBackend::new(2, 3);
        backend
            .presents
            .push_back(Err(VulkanError::Presentation(vk::Result::ERROR_SURFACE_LOST_KHR)));

        let result = frame_loop.run_frame(&mut backend);

        assert!(matches!(result, Err(VulkanError::Presentation(vk::Result::ERROR_SURFACE_LOST_KHR))));
        assert_eq!(backend.rebuilds, 0);
        assert_eq!(frame_loop.current_slot(), 0);
    }

    #[test]
    fn failed_update_keeps_slot_fence_signalled() {
        let mut frame_loop = FrameLoop::new(2);
        let mut backend = MockBackend::new(2, 3);
        backend.fail_update = true;

        assert!(matches!(
            frame_loop.run_frame(&mut backend),
            Err(VulkanError::CapacityExceeded { .. })
        ));
        assert!(backend.fence_signaled[0]);
        assert_eq!(backend.count(|c| matches!(c, Call::Reset(..))), 0);

        assert_eq!(frame_loop.run_frame(&mut backend).expect("frame"), FrameOutcome::Rendered);
        assert_eq!(frame_loop.current_slot(), 1);
    }

    #[test]
    fn single_frame_runs_every_phase_in_order() {
        let mut frame_loop = FrameLoop::new(2);
        let mut backend = MockBackend::new(2, 3);

        frame_loop.run_frame(&mut backend).expect("frame");

        assert_eq!(
            backend.calls,
            vec![
                Call::Wait(0),
                Call::Acquire(0),
                Call::WaitImage(0, 0),
                Call::Update(0),
                Call::Record(0),
                Call::Reset(0),
                Call::Submit(0, 0),
                Call::Present(0, 0),
            ]
        );
    }

    /// One untextured triangle drawn into an 800x600 swapchain
    struct TriangleBackend {
        registry: SceneRegistry<&'static str>,
        block: DynamicUniformBlock,
        extent: vk::Extent2D,
        binds: Vec<(Vec<SetBinding>, u32)>,
        submits: usize,
        presents: usize,
    }

    const SCENE_SET: u64 = 1;
    const SHADOW_SET: u64 = 3;

    impl TriangleBackend {
        fn new() -> Self {
            let mut registry = SceneRegistry::new(4);
            registry.add_mesh(Mesh::new("triangle", None)).expect("room");
            let capabilities = vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
                min_image_extent: vk::Extent2D { width: 1, height: 1 },
                max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
                ..Default::default()
            };
            Self {
                registry,
                block: DynamicUniformBlock::new(4, 256),
                extent: choose_extent(&capabilities, (800, 600)),
                binds: Vec::new(),
                submits: 0,
                presents: 0,
            }
        }
    }

    impl FrameBackend for TriangleBackend {
        fn wait_for_slot(&mut self, _slot: usize) -> VulkanResult<()> {
            Ok(())
        }

        fn reset_slot(&mut self, _slot: usize) -> VulkanResult<()> {
            Ok(())
        }

        fn acquire(&mut self, _slot: usize) -> VulkanResult<AcquireOutcome> {
            Ok(AcquireOutcome::Acquired { image_index: 0, suboptimal: false })
        }

        fn wait_for_image(&mut self, _image: usize, _slot: usize) -> VulkanResult<()> {
            Ok(())
        }

        fn update_uniforms(&mut self, _image: usize) -> VulkanResult<()> {
            DrawList::build(&self.registry, DynamicOffsetMode::Shared).pack(&mut self.block)
        }

        fn record(&mut self, _image: usize) -> VulkanResult<()> {
            let list = DrawList::build(&self.registry, DynamicOffsetMode::Shared);
            for entry in list.entries() {
                let texture = entry.texture().map(|id| vk::DescriptorSet::from_raw(100 + id.0 as u64));
                let bindings = scene_bindings(
                    vk::DescriptorSet::from_raw(SCENE_SET),
                    texture,
                    vk::DescriptorSet::from_raw(SHADOW_SET),
                );
                self.binds.push((bindings, self.block.offset_of(entry.bound_slot)));
            }
            Ok(())
        }

        fn submit(&mut self, _slot: usize, _image: usize) -> VulkanResult<()> {
            self.submits += 1;
            Ok(())
        }

        fn present(&mut self, _slot: usize, _image: usize) -> VulkanResult<PresentOutcome> {
            self.presents += 1;
            Ok(PresentOutcome::Presented)
        }

        fn rebuild_swapchain(&mut self) -> VulkanResult<()> {
            panic!("fixed-size surface never rebuilds");
        }
    }

    #[test]
    fn untextured_triangle_at_800x600_renders_one_frame() {
        let mut backend = TriangleBackend::new();
        let mut frame_loop = FrameLoop::new(2);
        assert_eq!((backend.extent.width, backend.extent.height), (800, 600));

        assert_eq!(frame_loop.run_frame(&mut backend).expect("frame"), FrameOutcome::Rendered);

        assert_eq!((backend.submits, backend.presents), (1, 1));
        assert_eq!(backend.binds.len(), 1);
        let (bindings, offset) = &backend.binds[0];
        assert_eq!(*offset, 0);
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].first_set, 0);
        assert_eq!(bindings[0].sets, vec![vk::DescriptorSet::from_raw(SCENE_SET)]);
        assert_eq!(bindings[1].first_set, 2);
        assert_eq!(bindings[1].sets, vec![vk::DescriptorSet::from_raw(SHADOW_SET)]);
        assert_eq!(backend.block.read(0).expect("slot").has_texture, 0);
    }
}

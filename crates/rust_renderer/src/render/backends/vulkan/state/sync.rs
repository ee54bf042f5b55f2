//! Semaphores, fences and the per-slot synchronisation triple

use crate::render::backends::vulkan::VulkanResult;
use ash::{vk, Device};

/// Binary semaphore with RAII cleanup
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create an unsignalled semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe { device.create_semaphore(&create_info, None)? };
        Ok(Self { device, semaphore })
    }

    /// Raw handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence with RAII cleanup
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a fence, optionally already signalled
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        let fence = unsafe { device.create_fence(&create_info, None)? };
        Ok(Self { device, fence })
    }

    /// Block until signalled
    pub fn wait(&self, timeout: u64) -> VulkanResult<()> {
        unsafe {
            self.device.wait_for_fences(&[self.fence], true, timeout)?;
        }
        Ok(())
    }

    /// Return to the unsignalled state
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device.reset_fences(&[self.fence])?;
        }
        Ok(())
    }

    /// Raw handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Synchronisation objects for one frame slot
pub struct FrameSync {
    /// Signalled when the acquired image is ready
    pub image_available: Semaphore,
    /// Signalled when rendering finished, waited by present
    pub render_finished: Semaphore,
    /// Signalled when the slot's submission completed
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create a triple with the fence signalled so the first wait passes
    pub fn new(device: &Device) -> VulkanResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            render_finished: Semaphore::new(device.clone())?,
            in_flight: Fence::new(device.clone(), true)?,
        })
    }
}

/// All frame slots plus the per-image owner table
pub struct FrameSyncSet {
    device: Device,
    slots: Vec<FrameSync>,
    images_in_flight: Vec<Option<usize>>,
}

impl FrameSyncSet {
    /// Create `slot_count` triples for a swapchain of `image_count` images
    pub fn new(device: Device, slot_count: usize, image_count: usize) -> VulkanResult<Self> {
        let slots = (0..slot_count)
            .map(|_| FrameSync::new(&device))
            .collect::<VulkanResult<Vec<_>>>()?;
        log::debug!("Created {} frame sync slots", slot_count);
        Ok(Self {
            device,
            slots,
            images_in_flight: owner_table(image_count),
        })
    }

    /// Triple for `slot`
    pub fn slot(&self, slot: usize) -> &FrameSync {
        &self.slots[slot]
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Wait for whichever slot last rendered `image`, then claim it for `slot`
    pub fn claim_image(&mut self, image: usize, slot: usize) -> VulkanResult<()> {
        if let Some(owner) = claim(&mut self.images_in_flight, image, slot) {
            self.slots[owner].in_flight.wait(u64::MAX)?;
        }
        Ok(())
    }

    /// Replace the image-available semaphores and forget image owners
    ///
    /// Must run with the device idle. An acquire that succeeded before a
    /// rebuild leaves its semaphore signalled with nobody waiting on it.
    pub fn reset_for_swapchain(&mut self, image_count: usize) -> VulkanResult<()> {
        for sync in &mut self.slots {
            sync.image_available = Semaphore::new(self.device.clone())?;
        }
        self.images_in_flight = owner_table(image_count);
        Ok(())
    }
}

/// One unowned entry per swapchain image
fn owner_table(image_count: usize) -> Vec<Option<usize>> {
    vec![None; image_count]
}

/// Record `slot` as the owner of `image`
///
/// Returns the previous owner when it is a different slot, whose fence must
/// be waited on before the image is reused. Out-of-range images are ignored.
fn claim(owners: &mut [Option<usize>], image: usize, slot: usize) -> Option<usize> {
    let entry = owners.get_mut(image)?;
    let previous = entry.replace(slot);
    previous.filter(|&owner| owner != slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claim_has_nothing_to_wait_on() {
        let mut owners = owner_table(3);
        assert_eq!(claim(&mut owners, 1, 0), None);
        assert_eq!(owners, vec![None, Some(0), None]);
    }

    #[test]
    fn reclaim_by_other_slot_waits_on_previous_owner() {
        let mut owners = owner_table(3);
        claim(&mut owners, 2, 0);
        assert_eq!(claim(&mut owners, 2, 1), Some(0));
        assert_eq!(owners[2], Some(1));
        // Same slot again: its own fence was already waited on
        assert_eq!(claim(&mut owners, 2, 1), None);
    }

    #[test]
    fn rebuilt_table_forgets_owners() {
        let mut owners = owner_table(2);
        claim(&mut owners, 0, 1);
        claim(&mut owners, 1, 0);

        let mut owners = owner_table(3);
        assert!(owners.iter().all(Option::is_none));
        assert_eq!(claim(&mut owners, 0, 0), None);
        assert_eq!(claim(&mut owners, 2, 1), None);
    }

    #[test]
    fn out_of_range_image_is_ignored() {
        let mut owners = owner_table(2);
        assert_eq!(claim(&mut owners, 5, 0), None);
        assert_eq!(owners, vec![None, None]);
    }
}

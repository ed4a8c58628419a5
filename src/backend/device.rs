// Adapter selection and logical device creation
//
// Selection is deterministic: the first enumerated adapter satisfying
// every requirement wins. No scoring, no ranking among suitable ones.

use std::ffi::{c_char, CStr};

use ash::khr::{surface, swapchain};
use ash::vk;

use super::swapchain::SwapchainSupportDetails;
use crate::error::SetupError;

/// Queue families required for rendering and presentation. The two
/// indices may name the same family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Both indices, or None while the search is incomplete.
    pub fn pair(&self) -> Option<(u32, u32)> {
        Some((self.graphics?, self.present?))
    }

    /// De-duplicated family indices, one queue-create entry each.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::new();
        for family in [self.graphics, self.present].into_iter().flatten() {
            if !families.contains(&family) {
                families.push(family);
            }
        }
        families
    }
}

fn required_device_extensions() -> [&'static CStr; 1] {
    [swapchain::NAME]
}

/// Scan queue families in order, recording the first index per
/// criterion independently. Stops once both are found. This can pick
/// two distinct families even when a single family would satisfy both.
pub fn find_queue_families(
    instance: &ash::Instance,
    adapter: vk::PhysicalDevice,
    surface_loader: &surface::Instance,
    surface: vk::SurfaceKHR,
) -> QueueFamilyIndices {
    let mut indices = QueueFamilyIndices::default();
    let families = unsafe { instance.get_physical_device_queue_family_properties(adapter) };

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;

        if indices.graphics.is_none()
            && family.queue_count > 0
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            indices.graphics = Some(index);
        }

        if indices.present.is_none() && family.queue_count > 0 {
            let supported = unsafe {
                surface_loader
                    .get_physical_device_surface_support(adapter, index, surface)
                    .unwrap_or(false)
            };
            if supported {
                indices.present = Some(index);
            }
        }

        if indices.is_complete() {
            break;
        }
    }

    indices
}

fn supports_required_extensions(instance: &ash::Instance, adapter: vk::PhysicalDevice) -> bool {
    let available = match unsafe { instance.enumerate_device_extension_properties(adapter) } {
        Ok(props) => props,
        Err(_) => return false,
    };

    required_device_extensions().iter().all(|required| {
        available.iter().any(|ext| {
            let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
            name == *required
        })
    })
}

fn is_adapter_suitable(
    instance: &ash::Instance,
    adapter: vk::PhysicalDevice,
    indices: &QueueFamilyIndices,
    surface_loader: &surface::Instance,
    surface: vk::SurfaceKHR,
) -> bool {
    if !indices.is_complete() {
        return false;
    }

    if !supports_required_extensions(instance, adapter) {
        return false;
    }

    // The surface must expose at least one format and one present mode.
    let support = match SwapchainSupportDetails::query(surface_loader, adapter, surface) {
        Ok(support) => support,
        Err(_) => return false,
    };
    if support.formats.is_empty() || support.present_modes.is_empty() {
        return false;
    }

    let features = unsafe { instance.get_physical_device_features(adapter) };
    features.sampler_anisotropy == vk::TRUE
}

/// Select the first suitable adapter in enumeration order.
pub fn pick_physical_device(
    instance: &ash::Instance,
    surface_loader: &surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, QueueFamilyIndices), SetupError> {
    let adapters =
        unsafe { instance.enumerate_physical_devices() }.map_err(SetupError::AdapterQuery)?;

    if adapters.is_empty() {
        return Err(SetupError::NoAdapters);
    }

    for adapter in adapters {
        let indices = find_queue_families(instance, adapter, surface_loader, surface);
        if !is_adapter_suitable(instance, adapter, &indices, surface_loader, surface) {
            continue;
        }

        let props = unsafe { instance.get_physical_device_properties(adapter) };
        log::info!(
            "Selected adapter: {} (graphics family {:?}, present family {:?})",
            unsafe { CStr::from_ptr(props.device_name.as_ptr()) }.to_string_lossy(),
            indices.graphics,
            indices.present,
        );
        return Ok((adapter, indices));
    }

    Err(SetupError::NoSuitableAdapter)
}

/// Create the logical device plus one graphics and one present queue.
///
/// Queue family indices are de-duplicated first; each unique family
/// gets exactly one queue at priority 1.0.
pub fn create_logical_device(
    instance: &ash::Instance,
    adapter: vk::PhysicalDevice,
    indices: &QueueFamilyIndices,
) -> Result<(ash::Device, vk::Queue, vk::Queue), SetupError> {
    let (graphics_family, present_family) =
        indices.pair().ok_or(SetupError::NoSuitableAdapter)?;

    let priorities = [1.0_f32];
    let queue_infos: Vec<vk::DeviceQueueCreateInfo> = indices
        .unique_families()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&priorities)
        })
        .collect();

    let features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

    let extensions: Vec<*const c_char> = required_device_extensions()
        .iter()
        .map(|ext| ext.as_ptr())
        .collect();

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&extensions)
        .enabled_features(&features);

    let device = unsafe { instance.create_device(adapter, &create_info, None) }
        .map_err(SetupError::DeviceCreation)?;

    let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
    let present_queue = unsafe { device.get_device_queue(present_family, 0) };

    Ok((device, graphics_queue, present_queue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_incomplete_without_both_families() {
        let empty = QueueFamilyIndices::default();
        assert!(!empty.is_complete());
        assert_eq!(empty.pair(), None);

        let graphics_only = QueueFamilyIndices {
            graphics: Some(0),
            present: None,
        };
        assert!(!graphics_only.is_complete());

        let present_only = QueueFamilyIndices {
            graphics: None,
            present: Some(1),
        };
        assert!(!present_only.is_complete());
    }

    #[test]
    fn indices_complete_when_both_found() {
        let indices = QueueFamilyIndices {
            graphics: Some(0),
            present: Some(2),
        };
        assert!(indices.is_complete());
        assert_eq!(indices.pair(), Some((0, 2)));
    }

    #[test]
    fn unique_families_dedups_aliased_index() {
        let aliased = QueueFamilyIndices {
            graphics: Some(3),
            present: Some(3),
        };
        assert_eq!(aliased.unique_families(), vec![3]);

        let distinct = QueueFamilyIndices {
            graphics: Some(0),
            present: Some(1),
        };
        assert_eq!(distinct.unique_families(), vec![0, 1]);
    }
}

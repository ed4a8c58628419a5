// Swapchain - window presentation
//
// Support data is queried fresh on every use. The selection policies
// are pure functions over that data so they can be tested without a
// live driver.

use ash::khr::{surface, swapchain};
use ash::vk;

use super::context::VulkanContext;
use crate::error::SetupError;

/// Preferred surface format when the adapter offers a choice.
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

pub struct SwapchainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    pub fn query(
        surface_loader: &surface::Instance,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self, SetupError> {
        unsafe {
            Ok(Self {
                capabilities: surface_loader
                    .get_physical_device_surface_capabilities(adapter, surface)
                    .map_err(SetupError::AdapterQuery)?,
                formats: surface_loader
                    .get_physical_device_surface_formats(adapter, surface)
                    .map_err(SetupError::AdapterQuery)?,
                present_modes: surface_loader
                    .get_physical_device_surface_present_modes(adapter, surface)
                    .map_err(SetupError::AdapterQuery)?,
            })
        }
    }
}

/// Pick the surface format. A lone UNDEFINED entry means the surface
/// has no preference, so the preferred pair is used outright. `formats`
/// is non-empty by the time adapter selection has passed.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    debug_assert!(
        !formats.is_empty(),
        "surface format list must be non-empty after adapter selection"
    );

    if formats.len() == 1 && formats[0].format == vk::Format::UNDEFINED {
        return PREFERRED_SURFACE_FORMAT;
    }

    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == PREFERRED_SURFACE_FORMAT.format
                && f.color_space == PREFERRED_SURFACE_FORMAT.color_space
        })
        .unwrap_or(formats[0])
}

/// MAILBOX when available, IMMEDIATE as the fallback, FIFO otherwise.
/// FIFO is the only mode the spec guarantees on every driver.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else if modes.contains(&vk::PresentModeKHR::IMMEDIATE) {
        vk::PresentModeKHR::IMMEDIATE
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// A defined current extent is used verbatim; otherwise the framebuffer
/// pixel size is clamped per axis into the supported range.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer_width: u32,
    framebuffer_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: framebuffer_width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: framebuffer_height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// min + 1, clamped down to max. A zero max means unbounded.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && count > capabilities.max_image_count {
        count = capabilities.max_image_count;
    }
    count
}

pub struct Swapchain {
    device: ash::Device,
    loader: swapchain::Device,
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    pub fn new(
        context: &VulkanContext,
        framebuffer_width: u32,
        framebuffer_height: u32,
    ) -> Result<Self, SetupError> {
        let support = SwapchainSupportDetails::query(
            &context.surface_loader,
            context.physical_device,
            context.surface,
        )?;

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, framebuffer_width, framebuffer_height);
        let image_count = choose_image_count(&support.capabilities);

        log::info!(
            "Creating swapchain: {}x{}, {:?}, {:?}, {} images requested",
            extent.width,
            extent.height,
            surface_format.format,
            present_mode,
            image_count,
        );

        let (graphics_family, present_family) = context
            .queue_families
            .pair()
            .ok_or(SetupError::NoSuitableAdapter)?;

        // CONCURRENT only when the families actually differ.
        let (sharing_mode, family_indices) = if graphics_family != present_family {
            (
                vk::SharingMode::CONCURRENT,
                vec![graphics_family, present_family],
            )
        } else {
            (vk::SharingMode::EXCLUSIVE, Vec::new())
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(context.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&family_indices)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        let loader = swapchain::Device::new(&context.instance, &context.device);
        let swapchain = unsafe { loader.create_swapchain(&create_info, None) }
            .map_err(SetupError::SwapchainCreation)?;

        // The driver may hand back more images than the requested minimum.
        let images = unsafe { loader.get_swapchain_images(swapchain) }
            .map_err(SetupError::SwapchainCreation)?;

        log::info!("Swapchain created with {} images", images.len());

        let image_views = create_image_views(&context.device, &images, surface_format.format)?;
        debug_assert_eq!(image_views.len(), images.len());

        Ok(Self {
            device: context.device.clone(),
            loader,
            swapchain,
            images,
            image_views,
            format: surface_format.format,
            extent,
        })
    }

    /// Release the views and the swapchain. Safe to call repeatedly;
    /// everything after the first call is a no-op.
    pub fn destroy(&mut self) {
        if self.swapchain == vk::SwapchainKHR::null() {
            return;
        }

        unsafe {
            for view in self.image_views.drain(..) {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }

        self.swapchain = vk::SwapchainKHR::null();
        self.images.clear();
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// One 2D color view per swapchain image, same format, same order.
fn create_image_views(
    device: &ash::Device,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<vk::ImageView>, SetupError> {
    images
        .iter()
        .map(|&image| {
            let create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            unsafe {
                device
                    .create_image_view(&create_info, None)
                    .map_err(SetupError::ImageViewCreation)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(f: vk::Format, cs: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format: f,
            color_space: cs,
        }
    }

    #[test]
    fn surface_format_prefers_exact_pair_anywhere_in_list() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn surface_format_falls_back_to_first_entry() {
        let formats = [
            format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_SRGB);
    }

    #[test]
    fn surface_format_defaults_on_undefined_placeholder() {
        let formats = [format(
            vk::Format::UNDEFINED,
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        )];

        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, PREFERRED_SURFACE_FORMAT.format);
        assert_eq!(chosen.color_space, PREFERRED_SURFACE_FORMAT.color_space);
    }

    #[test]
    #[should_panic(expected = "non-empty")]
    fn surface_format_rejects_empty_list() {
        choose_surface_format(&[]);
    }

    #[test]
    fn present_mode_prefers_mailbox_regardless_of_position() {
        let modes = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
        ];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn present_mode_falls_back_to_immediate_then_fifo() {
        let no_mailbox = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(
            choose_present_mode(&no_mailbox),
            vk::PresentModeKHR::IMMEDIATE
        );

        let fifo_only = [vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&fifo_only), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_uses_defined_current_extent_verbatim() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 1024,
                height: 768,
            },
            ..Default::default()
        };

        let chosen = choose_extent(&capabilities, 1920, 1080);
        assert_eq!(chosen.width, 1024);
        assert_eq!(chosen.height, 768);
    }

    #[test]
    fn extent_clamps_each_axis_when_undefined() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 200,
                height: 200,
            },
            max_image_extent: vk::Extent2D {
                width: 1600,
                height: 900,
            },
            ..Default::default()
        };

        let chosen = choose_extent(&capabilities, 1920, 100);
        assert_eq!(chosen.width, 1600);
        assert_eq!(chosen.height, 200);

        let inside = choose_extent(&capabilities, 800, 600);
        assert_eq!(inside.width, 800);
        assert_eq!(inside.height, 600);
    }

    #[test]
    fn image_count_is_min_plus_one_clamped_to_max() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&capabilities), 3);

        let tight = vk::SurfaceCapabilitiesKHR {
            min_image_count: 3,
            max_image_count: 3,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&tight), 3);
    }

    // Deterministic end-to-end selection over a minimal support answer:
    // one format, FIFO only, fixed current extent.
    #[test]
    fn selection_is_deterministic_for_minimal_support() {
        let support = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: 1024,
                    height: 768,
                },
                ..Default::default()
            },
            formats: vec![format(
                vk::Format::R8G8B8A8_UNORM,
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };

        let chosen_format = choose_surface_format(&support.formats);
        assert_eq!(chosen_format.format, vk::Format::R8G8B8A8_UNORM);

        assert_eq!(
            choose_present_mode(&support.present_modes),
            vk::PresentModeKHR::FIFO
        );

        let extent = choose_extent(&support.capabilities, 640, 480);
        assert_eq!(extent.width, 1024);
        assert_eq!(extent.height, 768);

        assert_eq!(choose_image_count(&support.capabilities), 3);
    }

    #[test]
    fn zero_max_image_count_means_unbounded() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 4,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&capabilities), 5);
    }
}

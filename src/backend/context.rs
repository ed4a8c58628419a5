// Vulkan context - ordered setup and teardown
//
// Creation order: instance -> debug messenger -> surface -> physical
// device -> logical device. Drop runs the exact reverse; the instance
// always goes last.

use ash::khr::surface;
use ash::{vk, Entry};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;

use super::device::{self, QueueFamilyIndices};
use super::instance::{self, DebugMessenger};
use crate::error::SetupError;

pub struct VulkanContext {
    // Field order matters: nothing here is dropped implicitly, but the
    // Drop impl below relies on every handle still being alive.
    _entry: Entry,
    pub instance: ash::Instance,
    debug: Option<DebugMessenger>,
    pub surface_loader: surface::Instance,
    pub surface: vk::SurfaceKHR,
    pub physical_device: vk::PhysicalDevice,
    pub queue_families: QueueFamilyIndices,
    pub device: ash::Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

impl VulkanContext {
    pub fn new(
        window: &Window,
        app_name: &str,
        enable_validation: bool,
    ) -> Result<Self, SetupError> {
        log::info!("Initializing Vulkan (validation: {})", enable_validation);

        let entry = unsafe { Entry::load() }?;

        let display_handle = window.display_handle()?.as_raw();
        let window_handle = window.window_handle()?.as_raw();

        let instance =
            instance::create_instance(&entry, display_handle, app_name, enable_validation)?;

        let debug = if enable_validation {
            DebugMessenger::new(&entry, &instance)
        } else {
            None
        };

        let surface = unsafe {
            ash_window::create_surface(&entry, &instance, display_handle, window_handle, None)
        }
        .map_err(SetupError::SurfaceCreation)?;
        let surface_loader = surface::Instance::new(&entry, &instance);

        let (physical_device, queue_families) =
            device::pick_physical_device(&instance, &surface_loader, surface)?;

        let (device, graphics_queue, present_queue) =
            device::create_logical_device(&instance, physical_device, &queue_families)?;

        log::info!("Vulkan context ready");

        Ok(Self {
            _entry: entry,
            instance,
            debug,
            surface_loader,
            surface,
            physical_device,
            queue_families,
            device,
            graphics_queue,
            present_queue,
        })
    }

    /// Wait for the device to go idle, e.g. before teardown.
    pub fn wait_idle(&self) {
        if let Err(e) = unsafe { self.device.device_wait_idle() } {
            log::warn!("device_wait_idle failed: {}", e);
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan context");

        unsafe {
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            if let Some(mut debug) = self.debug.take() {
                debug.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

// Setup error taxonomy
//
// Every fatal condition during Vulkan setup maps to one variant here.
// Backend code only ever propagates; main() is the single place that
// logs the failure and terminates the process.

use std::io;
use std::path::PathBuf;

use ash::vk;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to load the Vulkan library: {0}")]
    VulkanLoad(#[from] ash::LoadingError),

    #[error("failed to get native window handle: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    #[error("failed to create Vulkan instance: {0}")]
    InstanceCreation(vk::Result),

    #[error("failed to create window surface: {0}")]
    SurfaceCreation(vk::Result),

    #[error("no Vulkan-capable adapters found")]
    NoAdapters,

    #[error("no adapter satisfies the device requirements")]
    NoSuitableAdapter,

    #[error("failed to query adapter capabilities: {0}")]
    AdapterQuery(vk::Result),

    #[error("failed to create logical device: {0}")]
    DeviceCreation(vk::Result),

    #[error("failed to create swapchain: {0}")]
    SwapchainCreation(vk::Result),

    #[error("failed to create swapchain image view: {0}")]
    ImageViewCreation(vk::Result),

    #[error("no supported depth attachment format")]
    NoDepthFormat,

    #[error("failed to create render pass: {0}")]
    RenderPassCreation(vk::Result),

    #[error("failed to create descriptor set layout: {0}")]
    DescriptorSetLayoutCreation(vk::Result),

    #[error("failed to create pipeline layout: {0}")]
    PipelineLayoutCreation(vk::Result),

    #[error("failed to create graphics pipeline: {0}")]
    PipelineCreation(vk::Result),

    #[error("failed to read shader binary {path:?}: {source}")]
    ShaderRead { path: PathBuf, source: io::Error },

    #[error("failed to create shader module: {0}")]
    ShaderModuleCreation(vk::Result),
}

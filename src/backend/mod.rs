// Backend module - Vulkan abstraction layer
//
// Ordered setup: instance -> debug messenger -> surface -> physical
// device -> logical device -> swapchain -> pipeline. Teardown runs in
// exact reverse order; each type destroys only what it created.

pub mod context;
pub mod device;
pub mod instance;
pub mod pipeline;
pub mod shader;
pub mod swapchain;

pub use context::VulkanContext;
pub use pipeline::PipelineBundle;
pub use swapchain::Swapchain;

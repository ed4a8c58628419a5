// Shader module loading
//
// Shaders arrive as precompiled SPIR-V binaries on disk. A failed read
// or an invalid binary is fatal, like every other setup failure.

use std::fs::File;
use std::path::Path;

use ash::vk;

use crate::error::SetupError;

/// Read a SPIR-V binary as a stream of 32-bit words.
pub fn read_spirv(path: &Path) -> Result<Vec<u32>, SetupError> {
    let mut file = File::open(path).map_err(|source| SetupError::ShaderRead {
        path: path.to_path_buf(),
        source,
    })?;

    ash::util::read_spv(&mut file).map_err(|source| SetupError::ShaderRead {
        path: path.to_path_buf(),
        source,
    })
}

pub fn create_shader_module(
    device: &ash::Device,
    code: &[u32],
) -> Result<vk::ShaderModule, SetupError> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);

    unsafe {
        device
            .create_shader_module(&create_info, None)
            .map_err(SetupError::ShaderModuleCreation)
    }
}

//! Shader library: compiled shader modules registered by name.
//!
//! Shader bytecode comes from an external asset loader; the library only
//! turns it into modules and hands out their handles.

use std::collections::HashMap;

use crate::backend::{GpuBackend, ShaderModuleHandle};
use crate::error::GraphicsError;

use super::spirv_words;

/// Collection of shader modules that render effects can reference.
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    modules: HashMap<String, ShaderModuleHandle>,
}

impl ShaderLibrary {
    /// Create an empty shader library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a module from SPIR-V words and register it under `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered.
    pub fn load(
        &mut self,
        backend: &dyn GpuBackend,
        name: &str,
        spirv: &[u32],
    ) -> Result<ShaderModuleHandle, GraphicsError> {
        assert!(
            !self.modules.contains_key(name),
            "Attempted to load shader: '{name}' which already exists!"
        );
        let module = backend.create_shader_module(spirv)?;
        self.modules.insert(name.to_string(), module);
        log::debug!("Loaded shader '{}' ({} words)", name, spirv.len());
        Ok(module)
    }

    /// Like [`load`](Self::load), from raw SPIR-V file contents.
    pub fn load_bytes(
        &mut self,
        backend: &dyn GpuBackend,
        name: &str,
        bytes: &[u8],
    ) -> Result<ShaderModuleHandle, GraphicsError> {
        let words = spirv_words(bytes)?;
        self.load(backend, name, &words)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Get the module registered under `name`.
    pub fn get(&self, name: &str) -> ShaderModuleHandle {
        *self
            .modules
            .get(name)
            .unwrap_or_else(|| panic!("Shader '{name}' does not exist!"))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn destroy(&mut self, backend: &dyn GpuBackend) {
        for (_, module) in self.modules.drain() {
            backend.destroy_shader_module(module);
        }
    }
}

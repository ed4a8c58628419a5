// Scene system placeholder
//
// The render loop already drives a scene every frame; the scene itself
// is not implemented yet, so all of this is intentionally empty.

pub struct Scene;

impl Scene {
    pub fn new() -> Self {
        log::debug!("Scene initialized (no-op)");
        Self
    }

    /// Called once per loop iteration, before exit-condition polling.
    pub fn update(&mut self) {}

    pub fn shutdown(&mut self) {
        log::debug!("Scene shut down (no-op)");
    }
}

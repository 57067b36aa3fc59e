use async_trait::async_trait;

use crate::perception::screenshot::Screenshot;

/// Source of the per-step device observation.
///
/// Both calls must always produce a value: capture failures return
/// [`Screenshot::fallback`], an undetectable foreground app returns a placeholder
/// name such as `"Unknown App"`.
#[async_trait]
pub trait Observer: Send + Sync {
    async fn capture_screen(&self) -> Screenshot;

    async fn current_app(&self) -> String;
}

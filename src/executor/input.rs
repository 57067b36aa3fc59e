use async_trait::async_trait;

/// Physical input and app lifecycle control on the target device.
///
/// Coordinates are device pixels. Every call reports success as a flag; an
/// implementation logs its own failures and never panics across this boundary.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    async fn tap(&self, x: i32, y: i32) -> bool;

    async fn double_tap(&self, x: i32, y: i32) -> bool;

    async fn long_press(&self, x: i32, y: i32, duration_ms: u64) -> bool;

    /// `duration_ms = None` lets the device pick a natural swipe speed.
    async fn swipe(&self, x1: i32, y1: i32, x2: i32, y2: i32, duration_ms: Option<u64>) -> bool;

    async fn back(&self) -> bool;

    async fn home(&self) -> bool;

    /// Launch by display name or package identifier.
    async fn launch(&self, app: &str) -> bool;

    /// Replace the focused input's content with `text`.
    async fn type_text(&self, text: &str) -> bool;

    async fn wait(&self, seconds: f64) -> bool;
}

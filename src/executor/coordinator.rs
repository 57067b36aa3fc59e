// Normalized (0–999) → device pixel mapping.
use crate::agent_engine::state::NormalizedPoint;
use crate::perception::screenshot::Viewport;

/// Extent of the normalized axis; 999 is the last addressable value.
pub const NORMALIZED_SCALE: f64 = 1000.0;

/// `pixel = floor(normalized / 1000 * dimension)` on each axis.
pub fn normalized_to_physical(point: NormalizedPoint, viewport: Viewport) -> (i32, i32) {
    (
        axis_to_physical(point.x, viewport.width),
        axis_to_physical(point.y, viewport.height),
    )
}

fn axis_to_physical(value: f64, dimension: u32) -> i32 {
    ((value / NORMALIZED_SCALE) * dimension as f64).floor() as i32
}

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Resolution assumed when the device cannot be captured.
pub const FALLBACK_WIDTH: u32 = 1080;
pub const FALLBACK_HEIGHT: u32 = 2400;

/// Device screen size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

pub struct Screenshot {
    /// Encoded PNG bytes; empty for a placeholder observation.
    pub image_bytes: Vec<u8>,
    pub viewport: Viewport,
    /// Capture was blocked by a secure window (payment, password).
    pub is_sensitive: bool,
}

impl Screenshot {
    pub fn new(image_bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            image_bytes,
            viewport: Viewport { width, height },
            is_sensitive: false,
        }
    }

    /// Placeholder returned when capture fails so every step still has an observation.
    pub fn fallback(is_sensitive: bool) -> Self {
        tracing::warn!(is_sensitive, "using placeholder screenshot");
        Self {
            image_bytes: Vec::new(),
            viewport: Viewport {
                width: FALLBACK_WIDTH,
                height: FALLBACK_HEIGHT,
            },
            is_sensitive,
        }
    }

    /// Standard base64 of the image, or `None` when there is no image payload.
    pub fn image_base64(&self) -> Option<String> {
        if self.image_bytes.is_empty() {
            None
        } else {
            Some(base64::engine::general_purpose::STANDARD.encode(&self.image_bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_has_default_resolution_and_no_image() {
        let shot = Screenshot::fallback(true);
        assert_eq!(shot.viewport, Viewport { width: 1080, height: 2400 });
        assert!(shot.is_sensitive);
        assert_eq!(shot.image_base64(), None);
    }

    #[test]
    fn image_is_base64_encoded() {
        let shot = Screenshot::new(b"png".to_vec(), 720, 1600);
        assert_eq!(shot.image_base64().as_deref(), Some("cG5n"));
        assert_eq!(shot.viewport.width, 720);
    }
}

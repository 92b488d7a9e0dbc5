use cgmath::{Vector3, Zero};

/// Ring radius of the teleport target marker, meters.
pub const MARKER_RING_RADIUS: f32 = 0.3;
/// Tube thickness of the ring, meters.
pub const MARKER_RING_TUBE: f32 = 0.02;
/// How long a facing choice stays valid after the last arrow update,
/// seconds.
pub const ARROW_UPDATE_WINDOW: f32 = 1.5;

/// Render-ready state of the teleport target marker: a ring at the aimed
/// landing point plus an optional facing arrow. The host draws it however
/// it likes; this struct only tracks placement and visibility.
#[derive(Clone, Copy, Debug)]
pub struct TeleportMarker {
    pub visible: bool,
    pub position: Vector3<f32>,
    pub arrow_visible: bool,
    /// Yaw of the arrow around the marker, radians.
    pub arrow_angle: f32,
    arrow_updated_at: Option<f32>,
}

impl TeleportMarker {
    pub fn hidden() -> TeleportMarker {
        TeleportMarker {
            visible: false,
            position: Vector3::zero(),
            arrow_visible: false,
            arrow_angle: 0.0,
            arrow_updated_at: None,
        }
    }

    pub(crate) fn show_at(&mut self, point: Vector3<f32>) {
        self.visible = true;
        self.position = point;
        self.position.y += MARKER_RING_TUBE / 2.0;
    }

    pub(crate) fn show_arrow(&mut self, angle: f32, now: f32) {
        self.arrow_visible = true;
        self.arrow_angle = angle;
        self.arrow_updated_at = Some(now);
    }

    pub(crate) fn hide_arrow(&mut self) {
        self.arrow_visible = false;
    }

    pub(crate) fn hide(&mut self) {
        self.visible = false;
        self.arrow_visible = false;
    }

    /// Whether the chosen facing is fresh enough to apply at commit time.
    pub(crate) fn arrow_fresh(&self, now: f32) -> bool {
        matches!(self.arrow_updated_at, Some(at) if now - at < ARROW_UPDATE_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::vec3;

    #[test]
    fn test_marker_sits_on_top_of_the_hit_point() {
        let mut marker = TeleportMarker::hidden();
        marker.show_at(vec3(1.0, 0.0, -2.0));
        assert!(marker.visible);
        assert!((marker.position.y - MARKER_RING_TUBE / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_arrow_freshness_window() {
        let mut marker = TeleportMarker::hidden();
        assert!(!marker.arrow_fresh(10.0));

        marker.show_arrow(0.5, 10.0);
        assert!(marker.arrow_fresh(10.0 + ARROW_UPDATE_WINDOW - 0.1));
        assert!(!marker.arrow_fresh(10.0 + ARROW_UPDATE_WINDOW + 0.1));

        // Hiding the arrow does not erase the timestamp; freshness is
        // purely time-based.
        marker.hide_arrow();
        assert!(marker.arrow_fresh(10.5));
    }
}

use cgmath::{vec3, Vector3};

use crate::space::Ray;

/// A raycast intersection with navigable geometry. `normal` is the surface
/// normal in world space, unit length.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceHit {
    pub point: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub distance: f32,
}

/// Raycast service over the host's navigable surfaces. How the query is
/// implemented (brute force, BVH, BSP) is invisible here; the locomotion
/// controller only needs the nearest hit.
pub trait NavigableSurfaceQuery {
    fn raycast(&self, ray: &Ray) -> Option<SurfaceHit>;
}

/// Infinite horizontal plane at a fixed height. Enough for simple scenes
/// and tests.
#[derive(Clone, Copy, Debug)]
pub struct HorizontalPlane {
    pub height: f32,
}

impl NavigableSurfaceQuery for HorizontalPlane {
    fn raycast(&self, ray: &Ray) -> Option<SurfaceHit> {
        if ray.direction.y.abs() <= f32::EPSILON {
            return None;
        }
        let distance = (self.height - ray.origin.y) / ray.direction.y;
        if distance <= 0.0 {
            return None;
        }
        Some(SurfaceHit {
            point: ray.point_at(distance),
            normal: vec3(0.0, 1.0, 0.0),
            distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn test_plane_hit_from_above() {
        let plane = HorizontalPlane { height: 0.0 };
        let ray = Ray::new(vec3(0.0, 2.0, 0.0), vec3(0.0, -1.0, -1.0));
        let hit = plane.raycast(&ray).unwrap();

        assert!((hit.point.y - 0.0).abs() < 1e-6);
        assert!((hit.point.z - (-2.0)).abs() < 1e-5);
        assert!((hit.distance - 2.0 * 2.0_f32.sqrt()).abs() < 1e-5);
        assert!((hit.normal - vec3(0.0, 1.0, 0.0)).magnitude() < 1e-6);
    }

    #[test]
    fn test_ray_away_from_plane_misses() {
        let plane = HorizontalPlane { height: 0.0 };
        let up = Ray::new(vec3(0.0, 2.0, 0.0), vec3(0.0, 1.0, 0.0));
        assert!(plane.raycast(&up).is_none());

        let level = Ray::new(vec3(0.0, 2.0, 0.0), vec3(1.0, 0.0, 0.0));
        assert!(plane.raycast(&level).is_none());
    }
}

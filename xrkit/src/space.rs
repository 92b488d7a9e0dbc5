use cgmath::{vec3, InnerSpace, Matrix4, Quaternion, Rad, Rotation3, Vector3, Zero};

/// Position and orientation of a tracked device, expressed in tracked
/// (reference) space as delivered by the hardware.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
}

impl Pose {
    pub fn identity() -> Pose {
        Pose {
            position: Vector3::zero(),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn new(position: Vector3<f32>, rotation: Quaternion<f32>) -> Pose {
        Pose { position, rotation }
    }

    /// Forward axis of the device (-Z in device space).
    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * vec3(0.0, 0.0, -1.0)
    }
}

/// Origin plus normalized direction. Rays are value snapshots: every event
/// carries its own copy, so a listener can never observe a ray mutating
/// mid-frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Ray {
        let direction = if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            direction
        };
        Ray { origin, direction }
    }

    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }
}

/// Rigid yaw-plus-translation transform placing the virtual world relative
/// to the hardware tracking origin: `p_tracked = rotation * p_world +
/// position`. `rotation` is always a pure rotation about the up axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidTransform {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
}

impl RigidTransform {
    pub fn identity() -> RigidTransform {
        RigidTransform {
            position: Vector3::zero(),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn from_offset_yaw(offset: Vector3<f32>, yaw: Rad<f32>) -> RigidTransform {
        RigidTransform {
            position: offset,
            rotation: Quaternion::from_angle_y(yaw),
        }
    }

    pub fn transform_point(&self, point: Vector3<f32>) -> Vector3<f32> {
        self.rotation * point + self.position
    }

    pub fn transform_vector(&self, vector: Vector3<f32>) -> Vector3<f32> {
        self.rotation * vector
    }

    pub fn transform_ray(&self, ray: &Ray) -> Ray {
        Ray {
            origin: self.transform_point(ray.origin),
            direction: self.rotation * ray.direction,
        }
    }

    pub fn inverse(&self) -> RigidTransform {
        let inverse_rotation = self.rotation.conjugate();
        RigidTransform {
            position: -(inverse_rotation * self.position),
            rotation: inverse_rotation,
        }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position) * Matrix4::from(self.rotation)
    }
}

/// Reference-space sink supplied by the host runtime. The locomotion
/// controller writes the active transform here; the input layer reads it
/// back to express device-space rays in world space.
pub trait ReferenceSpace {
    fn set_transform(&mut self, transform: RigidTransform);
    fn transform(&self) -> RigidTransform;
}

/// In-memory reference space, enough for tests and hosts that apply the
/// transform themselves at render time.
#[derive(Clone, Copy, Debug)]
pub struct OffsetReferenceSpace {
    current: RigidTransform,
}

impl OffsetReferenceSpace {
    pub fn new() -> OffsetReferenceSpace {
        OffsetReferenceSpace {
            current: RigidTransform::identity(),
        }
    }
}

impl Default for OffsetReferenceSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceSpace for OffsetReferenceSpace {
    fn set_transform(&mut self, transform: RigidTransform) {
        self.current = transform;
    }

    fn transform(&self) -> RigidTransform {
        self.current
    }
}

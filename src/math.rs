//! Types, aliases and helper operations for doing math with `ultraviolet`.
pub use ultraviolet as uv;

/// A Pose has a rotation and a translation, no scaling.
///
/// Every rigid body and collider is positioned with one of these.
pub type Pose = uv::DIsometry3;
pub type Vec3 = uv::DVec3;
/// Rotors are the geometric algebra equivalent of unit quaternions.
/// They compose by multiplication and rotate vectors with `rotor * vec`.
pub type Rotor3 = uv::DRotor3;
pub type Bivec3 = uv::DBivec3;

/// Squared lengths below this are treated as zero when normalizing.
pub const NORMALIZE_EPSILON_SQ: f64 = 1e-18;

/// A wrapper type to indicate a vector should always be normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Unit<T>(T);

impl Unit<Vec3> {
    /// Normalize the vector. The caller must make sure it isn't zero,
    /// see [`try_new`][Self::try_new] for a checked version.
    pub fn new_normalize(v: Vec3) -> Self {
        Unit(v.normalized())
    }

    /// Normalize the vector, or return `None` if it's too short to have a direction.
    pub fn try_new(v: Vec3) -> Option<Self> {
        let mag_sq = v.mag_sq();
        if mag_sq < NORMALIZE_EPSILON_SQ {
            None
        } else {
            Some(Unit(v / mag_sq.sqrt()))
        }
    }

    pub const fn new_unchecked(v: Vec3) -> Self {
        Unit(v)
    }

    pub fn unit_x() -> Self {
        Unit(Vec3::unit_x())
    }

    pub fn unit_y() -> Self {
        Unit(Vec3::unit_y())
    }

    pub fn unit_z() -> Self {
        Unit(Vec3::unit_z())
    }

    #[inline]
    pub fn into_inner(self) -> Vec3 {
        self.0
    }
}

impl std::ops::Mul<Unit<Vec3>> for Rotor3 {
    type Output = Unit<Vec3>;

    fn mul(self, rhs: Unit<Vec3>) -> Self::Output {
        Unit(self * rhs.0)
    }
}

impl<T> std::ops::Deref for Unit<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::Neg for Unit<T>
where
    T: std::ops::Neg,
{
    type Output = Unit<<T as std::ops::Neg>::Output>;

    fn neg(self) -> Self::Output {
        Unit(-self.0)
    }
}

/// Build a rotor from an axis scaled by an angle in radians.
///
/// A zero vector gives the identity rotation.
pub fn rotor_from_scaled_axis(scaled_axis: Vec3) -> Rotor3 {
    let angle_sq = scaled_axis.mag_sq();
    if angle_sq < NORMALIZE_EPSILON_SQ {
        return Rotor3::identity();
    }
    let angle = angle_sq.sqrt();
    let axis = scaled_axis / angle;
    Rotor3::from_angle_plane(angle, Bivec3::from_normalized_axis(axis))
}

/// Componentwise product of two vectors.
#[inline]
pub fn mul_elem(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x * b.x, a.y * b.y, a.z * b.z)
}

/// Transform a vector given in a body's local principal frame
/// into world space and back, applying a diagonal matrix in between.
///
/// Used to apply inverse inertia tensors stored as their diagonal.
#[inline]
pub fn apply_diagonal_in_frame(rotation: Rotor3, diagonal: Vec3, v: Vec3) -> Vec3 {
    let local = rotation.reversed() * v;
    rotation * mul_elem(diagonal, local)
}

/// Module to serialize vectors as plain `[x, y, z]` arrays,
/// using the serde attribute `#[serde(with = "serde_vec3")]`.
#[cfg(feature = "serde-types")]
pub mod serde_vec3 {
    use super::*;

    pub fn serialize<S>(v: &Vec3, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::Serialize;
        [v.x, v.y, v.z].serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec3, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::Deserialize;
        <[f64; 3]>::deserialize(deserializer).map(Vec3::from)
    }
}

/// Module to serialize rotors as `[s, xy, xz, yz]` arrays,
/// using the serde attribute `#[serde(with = "serde_rotor3")]`.
///
/// Deserialized rotors are normalized.
#[cfg(feature = "serde-types")]
pub mod serde_rotor3 {
    use super::*;

    pub fn serialize<S>(r: &Rotor3, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::Serialize;
        [r.s, r.bv.xy, r.bv.xz, r.bv.yz].serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Rotor3, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::Deserialize;
        <[f64; 4]>::deserialize(deserializer)
            .map(|[s, xy, xz, yz]| Rotor3::new(s, Bivec3::new(xy, xz, yz)).normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_scaled_axis_is_identity() {
        let r = rotor_from_scaled_axis(Vec3::zero());
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert!((r * v - v).mag() < 1e-12);
    }

    #[test]
    fn rotation_about_own_axis_leaves_vector() {
        let axis = Vec3::new(1.0, 1.0, 0.0).normalized();
        let r = rotor_from_scaled_axis(axis * 1.3);
        assert!((r * axis - axis).mag() < 1e-9);
        // length is preserved for other vectors too
        let v = Vec3::new(0.0, 0.0, 2.0);
        assert!(((r * v).mag() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn half_turn_flips_perpendicular_vector() {
        let r = rotor_from_scaled_axis(Vec3::unit_z() * std::f64::consts::PI);
        let v = r * Vec3::unit_x();
        assert!((v + Vec3::unit_x()).mag() < 1e-9);
    }

    #[test]
    fn try_new_rejects_zero() {
        assert!(Unit::try_new(Vec3::zero()).is_none());
        let u = Unit::try_new(Vec3::new(0.0, 3.0, 4.0)).unwrap();
        assert!((u.mag() - 1.0).abs() < 1e-12);
    }
}

//! Math utilities and types
//!
//! Provides the 2D math types used by the collision scene. Affine transforms
//! are stored as a homogeneous 3x3 matrix whose last row is `[0 0 1]`, which
//! is the 2x3 world matrix handed over by the scene-graph transformer.

pub use nalgebra::{Matrix2, Matrix3, Vector2, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 4D vector type (used for RGBA colors)
pub type Vec4 = Vector4<f32>;

/// 2x2 matrix type (linear part of an affine transform)
pub type Mat2 = Matrix2<f32>;

/// 3x3 homogeneous matrix type (2D affine transform)
pub type Mat3 = Matrix3<f32>;

/// Tolerance used when classifying the linear part of an affine transform
pub const LINEAR_EPSILON: f32 = 1.0e-5;

/// 2D cross product (z component of the 3D cross product)
#[inline]
pub fn cross(a: &Vec2, b: &Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Counter-clockwise perpendicular of a vector
#[inline]
pub fn perp(v: &Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Cross product of a scalar angular velocity with a lever arm
#[inline]
pub fn cross_scalar(w: f32, r: &Vec2) -> Vec2 {
    Vec2::new(-w * r.y, w * r.x)
}

/// Normalize a vector, returning zero for degenerate input
#[inline]
pub fn normalize_or_zero(v: &Vec2) -> Vec2 {
    let length = v.norm();
    if length > f32::EPSILON {
        v / length
    } else {
        Vec2::zeros()
    }
}

/// Map a direction onto a sign-independent representative
///
/// `a` and `-a` canonicalize to the same vector, which makes axis ordering
/// independent of the order in which two shapes are tested.
#[inline]
pub fn canonical_axis(axis: &Vec2) -> Vec2 {
    if axis.x < 0.0 || (axis.x == 0.0 && axis.y < 0.0) {
        -axis
    } else {
        *axis
    }
}

/// Total order on vectors (lexicographic on x then y)
#[inline]
pub fn vec_cmp(a: &Vec2, b: &Vec2) -> std::cmp::Ordering {
    a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
}

/// Apply an affine transform to a point
#[inline]
pub fn transform_point(m: &Mat3, p: &Vec2) -> Vec2 {
    Vec2::new(
        m.m11 * p.x + m.m12 * p.y + m.m13,
        m.m21 * p.x + m.m22 * p.y + m.m23,
    )
}

/// Apply the linear part of an affine transform to a vector
#[inline]
pub fn transform_vector(m: &Mat3, v: &Vec2) -> Vec2 {
    Vec2::new(m.m11 * v.x + m.m12 * v.y, m.m21 * v.x + m.m22 * v.y)
}

/// Extract the linear (upper-left 2x2) part of an affine transform
#[inline]
pub fn linear_part(m: &Mat3) -> Mat2 {
    Mat2::new(m.m11, m.m12, m.m21, m.m22)
}

/// Transform a surface normal (inverse transpose of the linear part)
///
/// Returns `None` when the transform is singular.
pub fn transform_normal(m: &Mat3, n: &Vec2) -> Option<Vec2> {
    let inverse = linear_part(m).try_inverse()?;
    let transformed = inverse.transpose() * n;
    let length = transformed.norm();
    if length > f32::EPSILON {
        Some(transformed / length)
    } else {
        None
    }
}

/// Shape-preserving category of an affine transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffineClass {
    /// Diagonal linear part; `uniform` when both scale factors match
    Scale {
        /// Whether both axes are scaled by the same factor
        uniform: bool,
    },
    /// Rotation combined with a uniform scale (angles are preserved)
    Conformal,
    /// Anything else (shear or non-uniform scale along rotated axes)
    General,
}

/// Classify the linear part of an affine transform
pub fn classify(m: &Mat3) -> AffineClass {
    let eps = LINEAR_EPSILON * (1.0 + m.m11.abs().max(m.m22.abs()));
    if m.m12.abs() <= eps && m.m21.abs() <= eps {
        let uniform = (m.m11 - m.m22).abs() <= eps;
        return AffineClass::Scale { uniform };
    }

    // Columns must be orthogonal and of equal length.
    let c0 = Vec2::new(m.m11, m.m21);
    let c1 = Vec2::new(m.m12, m.m22);
    let scale = c0.norm().max(c1.norm()).max(f32::EPSILON);
    if (c0.dot(&c1) / (scale * scale)).abs() <= LINEAR_EPSILON
        && ((c0.norm() - c1.norm()) / scale).abs() <= LINEAR_EPSILON
        && m.determinant() > 0.0
    {
        AffineClass::Conformal
    } else {
        AffineClass::General
    }
}

/// Uniform scale factor of a conformal or uniform-scale transform
#[inline]
pub fn uniform_scale(m: &Mat3) -> f32 {
    Vec2::new(m.m11, m.m21).norm()
}

/// Rotation angle encoded by a conformal transform
#[inline]
pub fn rotation_angle(m: &Mat3) -> f32 {
    m.m21.atan2(m.m11)
}

/// Transform representing position, rotation, and scale in the plane
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform2D {
    /// Position in world space
    pub position: Vec2,

    /// Rotation in radians (counter-clockwise)
    pub rotation: f32,

    /// Scale factors
    pub scale: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
        }
    }
}

impl Transform2D {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec2, rotation: f32) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a homogeneous transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat3 {
        let (sin, cos) = self.rotation.sin_cos();
        Mat3::new(
            cos * self.scale.x, -sin * self.scale.y, self.position.x,
            sin * self.scale.x, cos * self.scale.y, self.position.y,
            0.0, 0.0, 1.0,
        )
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: &Vec2) -> Vec2 {
        transform_point(&self.to_matrix(), point)
    }
}

/// Owning transform node attached to a transformed shape
///
/// Holds the world matrix supplied by the scene graph plus a dirty flag.
/// Shapes bake their world-space form lazily and clear the flag when done.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformer {
    matrix: Mat3,
    dirty: bool,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(Mat3::identity())
    }
}

impl Transformer {
    /// Create a transformer from a world matrix; starts dirty so the first bake runs
    pub fn new(matrix: Mat3) -> Self {
        Self { matrix, dirty: true }
    }

    /// Create a transformer from a position/rotation/scale transform
    pub fn from_transform(transform: &Transform2D) -> Self {
        Self::new(transform.to_matrix())
    }

    /// Current world matrix
    pub fn matrix(&self) -> &Mat3 {
        &self.matrix
    }

    /// Replace the world matrix and mark dirty
    pub fn set_matrix(&mut self, matrix: Mat3) {
        if self.matrix != matrix {
            self.matrix = matrix;
            self.dirty = true;
        }
    }

    /// Whether the matrix changed since the last bake
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the next bake to run
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Acknowledge a bake
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_transform_matrix_composition() {
        let transform = Transform2D {
            position: Vec2::new(3.0, -1.0),
            rotation: FRAC_PI_2,
            scale: Vec2::new(2.0, 2.0),
        };
        let p = transform.transform_point(&Vec2::new(1.0, 0.0));
        assert_relative_eq!(p, Vec2::new(3.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_classify_transforms() {
        let scale = Transform2D {
            scale: Vec2::new(2.0, 3.0),
            ..Default::default()
        };
        assert_eq!(classify(&scale.to_matrix()), AffineClass::Scale { uniform: false });
        assert_eq!(classify(&Mat3::identity()), AffineClass::Scale { uniform: true });

        let rotated = Transform2D::from_position_rotation(Vec2::new(1.0, 1.0), 0.3);
        assert_eq!(classify(&rotated.to_matrix()), AffineClass::Conformal);

        let shear = Mat3::new(1.0, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        assert_eq!(classify(&shear), AffineClass::General);
    }

    #[test]
    fn test_transform_normal_under_shear() {
        let shear = Mat3::new(1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let n = transform_normal(&shear, &Vec2::new(1.0, 0.0)).unwrap();
        // The image of the line x = 0 is the line x = y; its normal is (1, -1)/sqrt(2).
        assert_relative_eq!(n, Vec2::new(1.0, -1.0).normalize(), epsilon = 1e-5);
    }

    #[test]
    fn test_transformer_dirty_tracking() {
        let mut transformer = Transformer::default();
        assert!(transformer.is_dirty());
        transformer.clear_dirty();
        transformer.set_matrix(Mat3::identity());
        assert!(!transformer.is_dirty());
        transformer.set_matrix(Transform2D::from_position(Vec2::new(1.0, 0.0)).to_matrix());
        assert!(transformer.is_dirty());
    }
}

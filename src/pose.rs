//! Homogeneous transform between two reference frames.
//!
//! A [`Pose`] is a 4x4 matrix whose top-left 3x3 block is a rotation and whose bottom row is
//! [0, 0, 0, 1]. Positions are in millimeters, as robot controllers expect them. Poses are
//! values: composition and inversion produce new poses.
//!
//! Composition follows the usual convention: `frame * target` expresses `target` (given relative
//! to `frame`) in the parent coordinates of `frame`. This is how a target defined in a user frame
//! is brought into robot base coordinates:
//!
//! ```
//! use robot_post::pose::Pose;
//!
//! let frame = Pose::transl(1000.0, 0.0, 0.0) * Pose::rotz(90_f64.to_radians());
//! let target = Pose::transl(100.0, 0.0, 0.0);
//! let in_base = frame * target;
//! let [x, y, z] = in_base.pos();
//! assert!((x - 1000.0).abs() < 1e-9 && (y - 100.0).abs() < 1e-9 && z.abs() < 1e-9);
//! ```

use std::ops::{Index, Mul};

use nalgebra::{Isometry3, Matrix3, Matrix4, Rotation3, Translation3, UnitQuaternion, Vector3};

use crate::mat::Mat;
use crate::pose_error::PoseError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose(Matrix4<f64>);

impl Pose {
    pub fn identity() -> Self {
        Pose(Matrix4::identity())
    }

    /// Pure translation
    pub fn transl(x: f64, y: f64, z: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = x;
        m[(1, 3)] = y;
        m[(2, 3)] = z;
        Pose(m)
    }

    /// Rotation around X, angle in radians
    pub fn rotx(rx: f64) -> Self {
        let (s, c) = rx.sin_cos();
        Self::from_rotation_rows([[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]])
    }

    /// Rotation around Y, angle in radians
    pub fn roty(ry: f64) -> Self {
        let (s, c) = ry.sin_cos();
        Self::from_rotation_rows([[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]])
    }

    /// Rotation around Z, angle in radians
    pub fn rotz(rz: f64) -> Self {
        let (s, c) = rz.sin_cos();
        Self::from_rotation_rows([[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Pose with the given rotation rows and zero translation. The rows are taken as they are;
    /// conversion functions use this with entries they computed from valid angles.
    pub(crate) fn from_rotation_rows(r: [[f64; 3]; 3]) -> Self {
        Pose(Matrix4::new(
            r[0][0], r[0][1], r[0][2], 0.0,
            r[1][0], r[1][1], r[1][2], 0.0,
            r[2][0], r[2][1], r[2][2], 0.0,
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// Wraps the matrix after checking it is homogeneous.
    pub fn from_matrix(m: Matrix4<f64>) -> Result<Self, PoseError> {
        let mat = Mat::from_row_slice(4, 4, m.transpose().as_slice())?;
        mat.inv_h()?;
        Ok(Pose(m))
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    pub fn rotation(&self) -> Matrix3<f64> {
        self.0.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Translation (x, y, z)
    pub fn pos(&self) -> [f64; 3] {
        [self.0[(0, 3)], self.0[(1, 3)], self.0[(2, 3)]]
    }

    /// Same rotation at another position.
    pub fn with_pos(&self, pos: [f64; 3]) -> Self {
        let mut m = self.0;
        m[(0, 3)] = pos[0];
        m[(1, 3)] = pos[1];
        m[(2, 3)] = pos[2];
        Pose(m)
    }

    pub fn set_pos(&mut self, pos: [f64; 3]) {
        *self = self.with_pos(pos);
    }

    /// X axis of the frame (first column)
    pub fn vx(&self) -> [f64; 3] {
        self.column(0)
    }

    /// Y axis of the frame (second column)
    pub fn vy(&self) -> [f64; 3] {
        self.column(1)
    }

    /// Z axis of the frame (third column). For a tool this is the approach direction.
    pub fn vz(&self) -> [f64; 3] {
        self.column(2)
    }

    /// Inverse of the homogeneous transform. Cannot fail: a `Pose` is homogeneous by construction.
    pub fn inv_h(&self) -> Self {
        let rt = self.rotation().transpose();
        let t = Vector3::new(self.0[(0, 3)], self.0[(1, 3)], self.0[(2, 3)]);
        let ti = -(rt * t);
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&rt);
        m[(0, 3)] = ti.x;
        m[(1, 3)] = ti.y;
        m[(2, 3)] = ti.z;
        Pose(m)
    }

    pub fn transform_point(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.0;
        std::array::from_fn(|i| m[(i, 0)] * p[0] + m[(i, 1)] * p[1] + m[(i, 2)] * p[2] + m[(i, 3)])
    }

    /// Rotation angle (radians) that turns the orientation of this pose into the other one.
    pub fn angle_to(&self, other: &Pose) -> f64 {
        let delta = self.rotation().transpose() * other.rotation();
        let cos = ((delta.trace() - 1.0) / 2.0).clamp(-1.0, 1.0);
        cos.acos()
    }

    /// Distance between the positions of the two poses.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        let a = self.pos();
        let b = other.pos();
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
    }

    /// True if all matrix elements are within `tolerance` of the other pose.
    pub fn approx_eq(&self, other: &Pose, tolerance: f64) -> bool {
        (self.0 - other.0).amax() <= tolerance
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        let rotation = Rotation3::from_matrix(&self.rotation());
        let [x, y, z] = self.pos();
        Isometry3::from_parts(Translation3::new(x, y, z), UnitQuaternion::from_rotation_matrix(&rotation))
    }

    pub fn to_mat(&self) -> Mat {
        Mat::from_dmatrix(nalgebra::DMatrix::from_column_slice(4, 4, self.0.as_slice()))
    }

    fn column(&self, c: usize) -> [f64; 3] {
        [self.0[(0, c)], self.0[(1, c)], self.0[(2, c)]]
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::identity()
    }
}

impl From<&Isometry3<f64>> for Pose {
    fn from(isometry: &Isometry3<f64>) -> Self {
        Pose(isometry.to_homogeneous())
    }
}

impl From<Isometry3<f64>> for Pose {
    fn from(isometry: Isometry3<f64>) -> Self {
        Pose::from(&isometry)
    }
}

impl TryFrom<&Mat> for Pose {
    type Error = PoseError;

    fn try_from(mat: &Mat) -> Result<Self, PoseError> {
        if !mat.is_homogeneous() {
            // inv_h reports why the matrix was rejected
            mat.inv_h()?;
        }
        let d = mat.as_dmatrix();
        Ok(Pose(Matrix4::from_fn(|r, c| d[(r, c)])))
    }
}

impl From<Pose> for Mat {
    fn from(pose: Pose) -> Mat {
        pose.to_mat()
    }
}

impl Mul for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Pose {
        Pose(self.0 * rhs.0)
    }
}

impl Mul<&Pose> for &Pose {
    type Output = Pose;

    fn mul(self, rhs: &Pose) -> Pose {
        Pose(self.0 * rhs.0)
    }
}

impl Index<(usize, usize)> for Pose {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &f64 {
        &self.0[index]
    }
}

impl std::fmt::Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [x, y, z] = self.pos();
        let q = self.to_isometry().rotation;
        write!(f, "x: {:.3}, y: {:.3}, z: {:.3},  quat: {:.5},{:.5},{:.5},{:.5}",
               x, y, z, q.w, q.i, q.j, q.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_inv_h_round_trip() {
        let p = Pose::transl(10.0, -20.0, 30.0) * Pose::rotz(0.3) * Pose::roty(-1.1) * Pose::rotx(2.0);
        assert!(p.inv_h().inv_h().approx_eq(&p, 1e-12));
        assert!((p * p.inv_h()).approx_eq(&Pose::identity(), 1e-12));
        assert!((p.inv_h() * p).approx_eq(&Pose::identity(), 1e-12));
        assert_eq!(Pose::identity().inv_h(), Pose::identity());
    }

    #[test]
    fn test_left_multiplication_applies_frame() {
        let frame = Pose::transl(0.0, 0.0, 500.0) * Pose::rotx(FRAC_PI_2);
        let target = Pose::transl(0.0, 100.0, 0.0);
        let [x, y, z] = (frame * target).pos();
        assert!(x.abs() < 1e-9);
        assert!(y.abs() < 1e-9);
        assert!((z - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_axes() {
        let p = Pose::rotz(FRAC_PI_2);
        let vx = p.vx();
        let vz = p.vz();
        assert!((vx[1] - 1.0).abs() < 1e-12);
        assert_eq!(vz, [0.0, 0.0, 1.0]);
        let moved = p.with_pos([1.0, 2.0, 3.0]);
        assert_eq!(moved.pos(), [1.0, 2.0, 3.0]);
        assert_eq!(moved.vx(), p.vx());
    }

    #[test]
    fn test_isometry_conversion() {
        let p = Pose::transl(1.0, 2.0, 3.0) * Pose::roty(0.7);
        let back = Pose::from(p.to_isometry());
        assert!(back.approx_eq(&p, 1e-12));
    }

    #[test]
    fn test_try_from_mat() {
        let pose = Pose::transl(5.0, 6.0, 7.0) * Pose::rotx(0.25);
        let mat = pose.to_mat();
        assert_eq!(mat[(0, 3)], 5.0);
        assert_eq!(Pose::try_from(&mat).unwrap(), pose);
        assert!(Pose::try_from(&Mat::eye(3)).is_err());
        assert!(Pose::from_matrix(Matrix4::identity() * 2.0).is_err());
    }

    #[test]
    fn test_angle_and_distance() {
        let a = Pose::transl(0.0, 0.0, 0.0);
        let b = Pose::transl(3.0, 4.0, 0.0) * Pose::rotz(0.5);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
        assert!((a.angle_to(&b) - 0.5).abs() < 1e-12);
        assert_eq!(b.transform_point([0.0, 0.0, 0.0]), [3.0, 4.0, 0.0]);
    }
}

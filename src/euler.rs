//! Pose to Euler angle (and quaternion, axis-angle) conversions used by robot controllers.
//!
//! Each vendor describes orientation differently. All functions here take and return positions
//! in millimeters. Angles are in degrees unless the function name says otherwise (`txyzrxyz`
//! and `ur` use radians for the rotation part).
//!
//! | Convention | Pose built as | Returned |
//! |---|---|---|
//! | xyzrpw | transl · rotz(w) · roty(p) · rotx(r) | [x, y, z, r, p, w] |
//! | KUKA | transl · rotz(A) · roty(B) · rotx(C) | [x, y, z, A, B, C] |
//! | Fanuc | transl · rotz(R) · roty(P) · rotx(W) | [x, y, z, W, P, R] |
//! | Motoman | transl · rotz(Rz) · roty(Ry) · rotx(Rx) | [x, y, z, Rx, Ry, Rz] |
//! | Nachi | transl · rotz(w) · roty(p) · rotx(r) | [x, y, z, w, p, r] |
//! | Staubli | transl · rotx(rx) · roty(ry) · rotz(rz) | [x, y, z, rx, ry, rz] |
//! | TxyzRxyz | transl · rotx · roty · rotz, radians | [x, y, z, rx, ry, rz] |
//! | Comau | transl · rotz(A) · roty(E) · rotz(R) | [x, y, z, A, E, R] |
//! | UR | rotation vector (axis · angle), radians | [x, y, z, rx, ry, rz] |
//! | ABB | unit quaternion, scalar first | [x, y, z, q1, q2, q3, q4] |
//!
//! Euler decompositions are not unique when two rotation axes align (gimbal lock). Every
//! decomposition checks the matrix element that decides this against its own tolerance and,
//! inside it, fixes one angle (to zero) and recovers the remaining rotation into the other.
//! The recovered pose is then still exact, the angles are just one of the infinitely many
//! valid triples. The tolerances differ between conventions and must stay that way, as moving
//! them shifts the output at boundary poses.
//!
//! ```
//! use robot_post::euler::{kuka_2_pose, pose_2_kuka};
//!
//! let pose = kuka_2_pose(&[200.0, 200.0, 500.0, 180.0, 0.0, 180.0]);
//! let abc = pose_2_kuka(&pose);
//! assert!((abc[3] - 180.0).abs() < 1e-3 && abc[4].abs() < 1e-3 && (abc[5] - 180.0).abs() < 1e-3);
//! ```

use std::f64::consts::{FRAC_PI_2, PI};

use serde::Deserialize;

use crate::pose::Pose;
use crate::pose_error::PoseError;

/// Singularity tolerance of [`pose_2_xyzrpw`].
pub const XYZRPW_TOLERANCE: f64 = 1e-10;
/// Singularity tolerance of [`pose_2_kuka`].
pub const KUKA_TOLERANCE: f64 = 1e-10;
/// Singularity tolerance of [`pose_2_fanuc`].
pub const FANUC_TOLERANCE: f64 = 1e-10;
/// Singularity tolerance of [`pose_2_motoman`].
pub const MOTOMAN_TOLERANCE: f64 = 1e-10;
/// Singularity tolerance of [`pose_2_nachi`].
pub const NACHI_TOLERANCE: f64 = 1e-10;
/// Singularity tolerance of [`pose_2_staubli`].
pub const STAUBLI_TOLERANCE: f64 = 1e-10;
/// Singularity tolerance of [`pose_2_txyzrxyz`].
pub const TXYZRXYZ_TOLERANCE: f64 = 1e-6;
/// Singularity tolerance of [`pose_2_comau`].
pub const COMAU_TOLERANCE: f64 = 1e-6;
/// Below this the UR rotation vector is zero, or the angle is taken as 180 degrees.
pub const UR_TOLERANCE: f64 = 1e-8;

/// Which branch of an Euler decomposition applies to a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gimbal {
    Regular,
    /// Deciding element above `1 - tolerance`
    Positive,
    /// Deciding element below `-1 + tolerance`
    Negative,
}

impl Gimbal {
    pub fn classify(value: f64, tolerance: f64) -> Gimbal {
        if value > 1.0 - tolerance {
            Gimbal::Positive
        } else if value < -1.0 + tolerance {
            Gimbal::Negative
        } else {
            Gimbal::Regular
        }
    }
}

/// transl · rotz(rz) · roty(ry) · rotx(rx), angles in radians
fn compose_zyx(pos: [f64; 3], rx: f64, ry: f64, rz: f64) -> Pose {
    let (sa, ca) = rx.sin_cos();
    let (sb, cb) = ry.sin_cos();
    let (sc, cc) = rz.sin_cos();
    Pose::from_rotation_rows([
        [cb * cc, cc * sa * sb - ca * sc, sa * sc + ca * cc * sb],
        [cb * sc, ca * cc + sa * sb * sc, ca * sb * sc - cc * sa],
        [-sb, cb * sa, ca * cb],
    ])
    .with_pos(pos)
}

/// Inverse of [`compose_zyx`], returns (rx, ry, rz) in radians. Decided by H[2,0] = -sin(ry).
fn decompose_zyx(h: &Pose, tolerance: f64) -> (f64, f64, f64) {
    match Gimbal::classify(h[(2, 0)], tolerance) {
        Gimbal::Positive => (0.0, -FRAC_PI_2, (-h[(1, 2)]).atan2(h[(1, 1)])),
        Gimbal::Negative => (0.0, FRAC_PI_2, h[(1, 2)].atan2(h[(1, 1)])),
        Gimbal::Regular => {
            let ry = (-h[(2, 0)]).atan2((h[(0, 0)] * h[(0, 0)] + h[(1, 0)] * h[(1, 0)]).sqrt());
            let rz = h[(1, 0)].atan2(h[(0, 0)]);
            let rx = h[(2, 1)].atan2(h[(2, 2)]);
            (rx, ry, rz)
        }
    }
}

/// transl · rotx(rx) · roty(ry) · rotz(rz), angles in radians
fn compose_xyz(pos: [f64; 3], rx: f64, ry: f64, rz: f64) -> Pose {
    let (sa, ca) = rx.sin_cos();
    let (sb, cb) = ry.sin_cos();
    let (sc, cc) = rz.sin_cos();
    Pose::from_rotation_rows([
        [cb * cc, -cb * sc, sb],
        [ca * sc + sa * sb * cc, ca * cc - sa * sb * sc, -sa * cb],
        [sa * sc - ca * sb * cc, sa * cc + ca * sb * sc, ca * cb],
    ])
    .with_pos(pos)
}

/// Inverse of [`compose_xyz`], returns (rx, ry, rz) in radians. Decided by H[0,2] = sin(ry).
fn decompose_xyz(h: &Pose, tolerance: f64) -> (f64, f64, f64) {
    match Gimbal::classify(h[(0, 2)], tolerance) {
        Gimbal::Positive => (0.0, FRAC_PI_2, h[(1, 0)].atan2(h[(1, 1)])),
        Gimbal::Negative => (0.0, -FRAC_PI_2, h[(1, 0)].atan2(h[(1, 1)])),
        Gimbal::Regular => {
            let sy = h[(0, 2)];
            let cy = (1.0 - sy * sy).sqrt();
            let rx = (-h[(1, 2)] / cy).atan2(h[(2, 2)] / cy);
            let ry = sy.atan2(cy);
            let rz = (-h[(0, 1)] / cy).atan2(h[(0, 0)] / cy);
            (rx, ry, rz)
        }
    }
}

fn pos_of(v: &[f64; 6]) -> [f64; 3] {
    [v[0], v[1], v[2]]
}

/// Pose from [x, y, z, r, p, w]: transl · rotz(w) · roty(p) · rotx(r), degrees.
pub fn xyzrpw_2_pose(xyzrpw: &[f64; 6]) -> Pose {
    compose_zyx(pos_of(xyzrpw), xyzrpw[3].to_radians(), xyzrpw[4].to_radians(), xyzrpw[5].to_radians())
}

/// [x, y, z, r, p, w] in degrees, inverse of [`xyzrpw_2_pose`].
///
/// At p = ±90 degrees r is set to 0 and the combined rotation is returned in w.
pub fn pose_2_xyzrpw(h: &Pose) -> [f64; 6] {
    let [x, y, z] = h.pos();
    let (r, p, w) = decompose_zyx(h, XYZRPW_TOLERANCE);
    [x, y, z, r.to_degrees(), p.to_degrees(), w.to_degrees()]
}

/// Pose from KUKA [X, Y, Z, A, B, C]: A around Z, then B around Y, then C around X (degrees).
pub fn kuka_2_pose(xyzabc: &[f64; 6]) -> Pose {
    compose_zyx(pos_of(xyzabc), xyzabc[5].to_radians(), xyzabc[4].to_radians(), xyzabc[3].to_radians())
}

/// KUKA [X, Y, Z, A, B, C] in degrees. At B = ±90 degrees C is 0.
pub fn pose_2_kuka(h: &Pose) -> [f64; 6] {
    let [x, y, z] = h.pos();
    let (c, b, a) = decompose_zyx(h, KUKA_TOLERANCE);
    [x, y, z, a.to_degrees(), b.to_degrees(), c.to_degrees()]
}

/// Pose from Fanuc [X, Y, Z, W, P, R] (degrees).
pub fn fanuc_2_pose(xyzwpr: &[f64; 6]) -> Pose {
    compose_zyx(pos_of(xyzwpr), xyzwpr[3].to_radians(), xyzwpr[4].to_radians(), xyzwpr[5].to_radians())
}

/// Fanuc [X, Y, Z, W, P, R] in degrees. At P = ±90 degrees W is 0.
pub fn pose_2_fanuc(h: &Pose) -> [f64; 6] {
    let [x, y, z] = h.pos();
    let (w, p, r) = decompose_zyx(h, FANUC_TOLERANCE);
    [x, y, z, w.to_degrees(), p.to_degrees(), r.to_degrees()]
}

/// Pose from Motoman [X, Y, Z, Rx, Ry, Rz] (degrees).
pub fn motoman_2_pose(xyzrxyz: &[f64; 6]) -> Pose {
    compose_zyx(pos_of(xyzrxyz), xyzrxyz[3].to_radians(), xyzrxyz[4].to_radians(), xyzrxyz[5].to_radians())
}

/// Motoman [X, Y, Z, Rx, Ry, Rz] in degrees. At Ry = ±90 degrees Rx is 0.
pub fn pose_2_motoman(h: &Pose) -> [f64; 6] {
    let [x, y, z] = h.pos();
    let (rx, ry, rz) = decompose_zyx(h, MOTOMAN_TOLERANCE);
    [x, y, z, rx.to_degrees(), ry.to_degrees(), rz.to_degrees()]
}

/// Pose from Nachi [X, Y, Z, w, p, r], where w turns around Z and r around X (degrees).
pub fn nachi_2_pose(xyzwpr: &[f64; 6]) -> Pose {
    compose_zyx(pos_of(xyzwpr), xyzwpr[5].to_radians(), xyzwpr[4].to_radians(), xyzwpr[3].to_radians())
}

/// Nachi [X, Y, Z, w, p, r] in degrees. At p = ±90 degrees r is 0.
pub fn pose_2_nachi(h: &Pose) -> [f64; 6] {
    let [x, y, z] = h.pos();
    let (r, p, w) = decompose_zyx(h, NACHI_TOLERANCE);
    [x, y, z, w.to_degrees(), p.to_degrees(), r.to_degrees()]
}

/// Pose from Staubli [x, y, z, rx, ry, rz]: rotx · roty · rotz (degrees).
pub fn staubli_2_pose(xyzrxyz: &[f64; 6]) -> Pose {
    compose_xyz(pos_of(xyzrxyz), xyzrxyz[3].to_radians(), xyzrxyz[4].to_radians(), xyzrxyz[5].to_radians())
}

/// Staubli [x, y, z, rx, ry, rz] in degrees. At ry = ±90 degrees rx is 0.
pub fn pose_2_staubli(h: &Pose) -> [f64; 6] {
    let [x, y, z] = h.pos();
    let (rx, ry, rz) = decompose_xyz(h, STAUBLI_TOLERANCE);
    [x, y, z, rx.to_degrees(), ry.to_degrees(), rz.to_degrees()]
}

/// Pose from [x, y, z, rx, ry, rz]: rotx · roty · rotz, angles in radians.
pub fn txyzrxyz_2_pose(xyzrxyz: &[f64; 6]) -> Pose {
    compose_xyz(pos_of(xyzrxyz), xyzrxyz[3], xyzrxyz[4], xyzrxyz[5])
}

/// [x, y, z, rx, ry, rz] with angles in radians, inverse of [`txyzrxyz_2_pose`].
pub fn pose_2_txyzrxyz(h: &Pose) -> [f64; 6] {
    let [x, y, z] = h.pos();
    let (rx, ry, rz) = decompose_xyz(h, TXYZRXYZ_TOLERANCE);
    [x, y, z, rx, ry, rz]
}

/// Pose from Comau [X, Y, Z, A, E, R]: rotz(A) · roty(E) · rotz(R) (degrees).
pub fn comau_2_pose(xyzaer: &[f64; 6]) -> Pose {
    let pose = Pose::rotz(xyzaer[3].to_radians())
        * Pose::roty(xyzaer[4].to_radians())
        * Pose::rotz(xyzaer[5].to_radians());
    pose.with_pos(pos_of(xyzaer))
}

/// Comau [X, Y, Z, A, E, R] in degrees with E in [0, 180]. At E = 0 or 180 degrees A is 0.
pub fn pose_2_comau(h: &Pose) -> [f64; 6] {
    let [x, y, z] = h.pos();
    let (a, e, r) = match Gimbal::classify(h[(2, 2)], COMAU_TOLERANCE) {
        Gimbal::Positive => (0.0, 0.0, h[(1, 0)].atan2(h[(0, 0)])),
        Gimbal::Negative => (0.0, PI, h[(1, 0)].atan2(h[(1, 1)])),
        Gimbal::Regular => {
            let e = (h[(0, 2)] * h[(0, 2)] + h[(1, 2)] * h[(1, 2)]).sqrt().atan2(h[(2, 2)]);
            let a = h[(1, 2)].atan2(h[(0, 2)]);
            let r = h[(2, 1)].atan2(-h[(2, 0)]);
            (a, e, r)
        }
    };
    [x, y, z, a.to_degrees(), e.to_degrees(), r.to_degrees()]
}

/// Unit quaternion [q1, q2, q3, q4] = [w, x, y, z] of the rotation block.
///
/// The magnitudes come from the diagonal, the sign of each vector component from the
/// antisymmetric part of the matrix. A zero antisymmetric entry yields a positive sign; for
/// 180 degree rotations (q1 = 0) this picks one of the two equivalent quaternions and may lose
/// the relative sign of the vector components.
pub fn pose_2_quaternion(h: &Pose) -> [f64; 4] {
    let a = h[(0, 0)];
    let b = h[(1, 1)];
    let c = h[(2, 2)];
    let sign = |v: f64| if v < 0.0 { -1.0 } else { 1.0 };
    let sign2 = sign(h[(2, 1)] - h[(1, 2)]);
    let sign3 = sign(h[(0, 2)] - h[(2, 0)]);
    let sign4 = sign(h[(1, 0)] - h[(0, 1)]);
    [
        (a + b + c + 1.0).max(0.0).sqrt() / 2.0,
        sign2 * (a - b - c + 1.0).max(0.0).sqrt() / 2.0,
        sign3 * (-a + b - c + 1.0).max(0.0).sqrt() / 2.0,
        sign4 * (-a - b + c + 1.0).max(0.0).sqrt() / 2.0,
    ]
}

/// Rotation pose of quaternion [q1, q2, q3, q4] (scalar first). The input is normalized.
pub fn quaternion_2_pose(q: &[f64; 4]) -> Result<Pose, PoseError> {
    let norm = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if norm == 0.0 {
        return Err(PoseError::ZeroQuaternion);
    }
    Ok(unit_quaternion_2_pose(&q.map(|v| v / norm)))
}

fn unit_quaternion_2_pose(&[q1, q2, q3, q4]: &[f64; 4]) -> Pose {
    Pose::from_rotation_rows([
        [1.0 - 2.0 * q3 * q3 - 2.0 * q4 * q4, 2.0 * q2 * q3 - 2.0 * q4 * q1, 2.0 * q2 * q4 + 2.0 * q3 * q1],
        [2.0 * q2 * q3 + 2.0 * q4 * q1, 1.0 - 2.0 * q2 * q2 - 2.0 * q4 * q4, 2.0 * q3 * q4 - 2.0 * q2 * q1],
        [2.0 * q2 * q4 - 2.0 * q3 * q1, 2.0 * q3 * q4 + 2.0 * q2 * q1, 1.0 - 2.0 * q2 * q2 - 2.0 * q3 * q3],
    ])
}

/// ABB [x, y, z, q1, q2, q3, q4], as used in RAPID robtargets.
pub fn pose_2_abb(h: &Pose) -> [f64; 7] {
    let [x, y, z] = h.pos();
    let [q1, q2, q3, q4] = pose_2_quaternion(h);
    [x, y, z, q1, q2, q3, q4]
}

pub fn abb_2_pose(xyzq: &[f64; 7]) -> Result<Pose, PoseError> {
    Ok(quaternion_2_pose(&[xyzq[3], xyzq[4], xyzq[5], xyzq[6]])?.with_pos([xyzq[0], xyzq[1], xyzq[2]]))
}

/// UR [x, y, z, rx, ry, rz]: position and rotation vector (axis times angle in radians).
pub fn pose_2_ur(h: &Pose) -> [f64; 6] {
    let [x, y, z] = h.pos();
    let angle = ((h[(0, 0)] + h[(1, 1)] + h[(2, 2)] - 1.0) / 2.0).clamp(-1.0, 1.0).acos();
    let mut rxyz = [h[(2, 1)] - h[(1, 2)], h[(0, 2)] - h[(2, 0)], h[(1, 0)] - h[(0, 1)]];
    let norm = |v: &[f64; 3]| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();

    if angle < UR_TOLERANCE {
        rxyz = [0.0; 3];
    } else if angle.sin().abs() < UR_TOLERANCE || norm(&rxyz) < UR_TOLERANCE {
        // Close to 180 degrees the antisymmetric part vanishes, take the axis from the
        // column of the largest diagonal element instead.
        let diagonal = [h[(0, 0)], h[(1, 1)], h[(2, 2)]];
        let mut id = 0;
        for i in 1..3 {
            if diagonal[i] > diagonal[id] {
                id = i;
            }
        }
        let mx = diagonal[id];
        let mut axis = [h[(0, id)], h[(1, id)], h[(2, id)]];
        axis[id] += 1.0;
        let scale = angle / (2.0 * (1.0 + mx)).max(0.0).sqrt();
        rxyz = axis.map(|v| v * scale);
    } else {
        let n = norm(&rxyz);
        rxyz = rxyz.map(|v| v / n * angle);
    }
    [x, y, z, rxyz[0], rxyz[1], rxyz[2]]
}

/// Pose from UR [x, y, z, rx, ry, rz] (rotation vector in radians).
pub fn ur_2_pose(xyzrv: &[f64; 6]) -> Pose {
    let rv = [xyzrv[3], xyzrv[4], xyzrv[5]];
    let angle = (rv[0] * rv[0] + rv[1] * rv[1] + rv[2] * rv[2]).sqrt();
    let q = if angle == 0.0 {
        [1.0, 0.0, 0.0, 0.0]
    } else {
        let ratio = (0.5 * angle).sin() / angle;
        [(0.5 * angle).cos(), rv[0] * ratio, rv[1] * ratio, rv[2] * ratio]
    };
    unit_quaternion_2_pose(&q).with_pos(pos_of(xyzrv))
}

/// Named orientation convention, for choosing a conversion at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "allow_filesystem", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum EulerConvention {
    Xyzrpw,
    Kuka,
    Fanuc,
    Motoman,
    Nachi,
    Staubli,
    Txyzrxyz,
    Comau,
    Ur,
    Abb,
}

impl EulerConvention {
    pub const ALL: [EulerConvention; 10] = [
        EulerConvention::Xyzrpw,
        EulerConvention::Kuka,
        EulerConvention::Fanuc,
        EulerConvention::Motoman,
        EulerConvention::Nachi,
        EulerConvention::Staubli,
        EulerConvention::Txyzrxyz,
        EulerConvention::Comau,
        EulerConvention::Ur,
        EulerConvention::Abb,
    ];

    /// Number of values of the tuple (6, or 7 for quaternion based conventions)
    pub fn arity(&self) -> usize {
        match self {
            EulerConvention::Abb => 7,
            _ => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EulerConvention::Xyzrpw => "xyzrpw",
            EulerConvention::Kuka => "kuka",
            EulerConvention::Fanuc => "fanuc",
            EulerConvention::Motoman => "motoman",
            EulerConvention::Nachi => "nachi",
            EulerConvention::Staubli => "staubli",
            EulerConvention::Txyzrxyz => "txyzrxyz",
            EulerConvention::Comau => "comau",
            EulerConvention::Ur => "ur",
            EulerConvention::Abb => "abb",
        }
    }

    pub fn to_pose(&self, values: &[f64]) -> Result<Pose, PoseError> {
        if values.len() != self.arity() {
            return Err(PoseError::InvalidLength { expected: self.arity(), found: values.len() });
        }
        let six = || -> [f64; 6] { std::array::from_fn(|i| values[i]) };
        Ok(match self {
            EulerConvention::Xyzrpw => xyzrpw_2_pose(&six()),
            EulerConvention::Kuka => kuka_2_pose(&six()),
            EulerConvention::Fanuc => fanuc_2_pose(&six()),
            EulerConvention::Motoman => motoman_2_pose(&six()),
            EulerConvention::Nachi => nachi_2_pose(&six()),
            EulerConvention::Staubli => staubli_2_pose(&six()),
            EulerConvention::Txyzrxyz => txyzrxyz_2_pose(&six()),
            EulerConvention::Comau => comau_2_pose(&six()),
            EulerConvention::Ur => ur_2_pose(&six()),
            EulerConvention::Abb => abb_2_pose(&std::array::from_fn(|i| values[i]))?,
        })
    }

    pub fn from_pose(&self, pose: &Pose) -> Vec<f64> {
        match self {
            EulerConvention::Xyzrpw => pose_2_xyzrpw(pose).to_vec(),
            EulerConvention::Kuka => pose_2_kuka(pose).to_vec(),
            EulerConvention::Fanuc => pose_2_fanuc(pose).to_vec(),
            EulerConvention::Motoman => pose_2_motoman(pose).to_vec(),
            EulerConvention::Nachi => pose_2_nachi(pose).to_vec(),
            EulerConvention::Staubli => pose_2_staubli(pose).to_vec(),
            EulerConvention::Txyzrxyz => pose_2_txyzrxyz(pose).to_vec(),
            EulerConvention::Comau => pose_2_comau(pose).to_vec(),
            EulerConvention::Ur => pose_2_ur(pose).to_vec(),
            EulerConvention::Abb => pose_2_abb(pose).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_values(actual: &[f64], expected: &[f64], tolerance: f64) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() <= tolerance, "value {}: {} != {} in {:?}", i, a, e, actual);
        }
    }

    #[test]
    fn test_kuka_reference_pose() {
        let xyzabc = [200.0, 200.0, 500.0, 180.0, 0.0, 180.0];
        let pose = kuka_2_pose(&xyzabc);
        assert_values(&pose_2_kuka(&pose), &xyzabc, 1e-3);
        assert_values(&pose_2_xyzrpw(&pose), &[200.0, 200.0, 500.0, 180.0, 0.0, 180.0], 1e-3);
    }

    #[test]
    fn test_xyzrpw_matches_elementary_rotations() {
        let v = [10.0, 20.0, 30.0, 15.0, -25.0, 40.0];
        let expected = Pose::transl(10.0, 20.0, 30.0)
            * Pose::rotz(40_f64.to_radians())
            * Pose::roty((-25_f64).to_radians())
            * Pose::rotx(15_f64.to_radians());
        assert!(xyzrpw_2_pose(&v).approx_eq(&expected, 1e-12));
        let staubli = Pose::transl(10.0, 20.0, 30.0)
            * Pose::rotx(15_f64.to_radians())
            * Pose::roty((-25_f64).to_radians())
            * Pose::rotz(40_f64.to_radians());
        assert!(staubli_2_pose(&v).approx_eq(&staubli, 1e-12));
    }

    #[test]
    fn test_zyx_gimbal_lock_pitch_down() {
        // p = -90: r and w rotate around the same axis, everything is folded into w = w + r
        let pose = xyzrpw_2_pose(&[0.0, 0.0, 0.0, 30.0, -90.0, 40.0]);
        assert_eq!(Gimbal::classify(pose[(2, 0)], XYZRPW_TOLERANCE), Gimbal::Positive);
        let v = pose_2_xyzrpw(&pose);
        assert_values(&v, &[0.0, 0.0, 0.0, 0.0, -90.0, 70.0], 1e-9);
        assert!(xyzrpw_2_pose(&v).approx_eq(&pose, 1e-12));
    }

    #[test]
    fn test_zyx_gimbal_lock_pitch_up() {
        // p = +90: the recovered w is w - r
        let pose = fanuc_2_pose(&[0.0, 0.0, 0.0, 30.0, 90.0, 40.0]);
        let v = pose_2_fanuc(&pose);
        assert_values(&v, &[0.0, 0.0, 0.0, 0.0, 90.0, 10.0], 1e-9);
        assert!(fanuc_2_pose(&v).approx_eq(&pose, 1e-12));
    }

    #[test]
    fn test_tolerance_boundary_differs_per_convention() {
        // sin(ry) = 1 - 1e-8 is inside the 1e-6 band of TxyzRxyz but outside the 1e-10 band of Staubli
        let ry = (1.0_f64 - 1e-8).asin();
        let pose = txyzrxyz_2_pose(&[0.0, 0.0, 0.0, 0.2, ry, 0.3]);
        assert_eq!(Gimbal::classify(pose[(0, 2)], TXYZRXYZ_TOLERANCE), Gimbal::Positive);
        assert_eq!(Gimbal::classify(pose[(0, 2)], STAUBLI_TOLERANCE), Gimbal::Regular);
        assert_eq!(pose_2_txyzrxyz(&pose)[3], 0.0);
        assert!(pose_2_staubli(&pose)[3] != 0.0);
    }

    #[test]
    fn test_staubli_gimbal_lock() {
        let pose = staubli_2_pose(&[1.0, 2.0, 3.0, 20.0, 90.0, 35.0]);
        let v = pose_2_staubli(&pose);
        assert_eq!(v[3], 0.0);
        assert!((v[4] - 90.0).abs() < 1e-9);
        assert!(staubli_2_pose(&v).approx_eq(&pose, 1e-9));
    }

    #[test]
    fn test_comau_round_trip_and_singularity() {
        let v = [100.0, -50.0, 25.0, 30.0, 60.0, -45.0];
        assert_values(&pose_2_comau(&comau_2_pose(&v)), &v, 1e-9);

        let flat = comau_2_pose(&[0.0, 0.0, 0.0, 30.0, 0.0, 20.0]);
        assert_values(&pose_2_comau(&flat), &[0.0, 0.0, 0.0, 0.0, 0.0, 50.0], 1e-9);

        let flipped = comau_2_pose(&[0.0, 0.0, 0.0, 0.0, 180.0, 20.0]);
        let v = pose_2_comau(&flipped);
        assert!((v[4] - 180.0).abs() < 1e-9);
        assert!(comau_2_pose(&v).approx_eq(&flipped, 1e-9));
    }

    #[test]
    fn test_quaternion_unit_norm_and_back() {
        let pose = xyzrpw_2_pose(&[0.0, 0.0, 0.0, 10.0, 20.0, 30.0]);
        let q = pose_2_quaternion(&pose);
        let norm: f64 = q.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!(quaternion_2_pose(&q).unwrap().approx_eq(&pose, 1e-12));
    }

    #[test]
    fn test_quaternion_ties_are_positive() {
        // 180 degrees around X: all antisymmetric differences are zero
        let q = pose_2_quaternion(&Pose::rotx(PI));
        assert!(q[0].abs() < 1e-8);
        assert!((q[1] - 1.0).abs() < 1e-12);
        assert_eq!(pose_2_quaternion(&Pose::identity()), [1.0, 0.0, 0.0, 0.0]);

        // Exactly diagonal matrix, no rounding noise: every sign defaults to +
        let half_turn_z = Pose::from_rotation_rows([[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert_eq!(pose_2_quaternion(&half_turn_z), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_abb() {
        let pose = Pose::transl(1.0, 2.0, 3.0) * Pose::rotz(FRAC_PI_2);
        let v = pose_2_abb(&pose);
        let s = 0.5_f64.sqrt();
        assert_values(&v, &[1.0, 2.0, 3.0, s, 0.0, 0.0, s], 1e-12);
        assert!(abb_2_pose(&v).unwrap().approx_eq(&pose, 1e-12));
    }

    #[test]
    fn test_zero_quaternion_is_rejected() {
        assert_eq!(quaternion_2_pose(&[0.0; 4]), Err(PoseError::ZeroQuaternion));
        assert_eq!(abb_2_pose(&[1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0]), Err(PoseError::ZeroQuaternion));
        assert_eq!(EulerConvention::Abb.to_pose(&[0.0; 7]), Err(PoseError::ZeroQuaternion));

        // Any other norm is scaled to a unit quaternion
        let scaled = quaternion_2_pose(&[0.0, 0.0, 0.0, 4.0]).unwrap();
        assert!(scaled.approx_eq(&Pose::rotz(PI), 1e-12));
    }

    #[test]
    fn test_ur_axis_angle() {
        let pose = Pose::transl(100.0, 0.0, 0.0) * Pose::roty(0.5);
        assert_values(&pose_2_ur(&pose), &[100.0, 0.0, 0.0, 0.0, 0.5, 0.0], 1e-12);
        assert_values(&pose_2_ur(&Pose::identity()), &[0.0; 6], 0.0);

        // Half turn: the axis is taken from the diagonal
        let half_turn = Pose::rotz(PI);
        let v = pose_2_ur(&half_turn);
        assert!((v[5].abs() - PI).abs() < 1e-6, "{:?}", v);
        assert!(ur_2_pose(&v).approx_eq(&half_turn, 1e-6));
    }

    #[test]
    fn test_convention_dispatch() {
        for convention in EulerConvention::ALL {
            let values: Vec<f64> = if convention == EulerConvention::Abb {
                pose_2_abb(&Pose::rotx(0.3)).to_vec()
            } else {
                vec![1.0, 2.0, 3.0, 0.1, 0.2, 0.3]
            };
            let pose = convention.to_pose(&values).unwrap();
            let back = convention.from_pose(&pose);
            assert!(convention.to_pose(&back).unwrap().approx_eq(&pose, 1e-9), "{}", convention.name());
        }
        assert!(EulerConvention::Kuka.to_pose(&[1.0, 2.0]).is_err());
    }
}

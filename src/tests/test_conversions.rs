use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::euler::{pose_2_xyzrpw, xyzrpw_2_pose, EulerConvention};
use crate::mat::Mat;
use crate::pose::Pose;
use crate::tests::test_utils::random_xyzrpw;

#[test]
fn test_all_conventions_reproduce_random_poses() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..200 {
        let pose = xyzrpw_2_pose(&random_xyzrpw(&mut rng));
        for convention in EulerConvention::ALL {
            let values = convention.from_pose(&pose);
            assert_eq!(values.len(), convention.arity());
            let back = convention.to_pose(&values).unwrap();
            assert!(
                back.approx_eq(&pose, 1e-6),
                "{} does not reproduce {:?}, values {:?}",
                convention.name(), pose_2_xyzrpw(&pose), values
            );
        }
    }
}

#[test]
fn test_inverse_of_random_poses() {
    let mut rng = StdRng::seed_from_u64(31);
    for _ in 0..200 {
        let pose = xyzrpw_2_pose(&random_xyzrpw(&mut rng));
        let inverse = pose.inv_h();
        assert!(inverse.inv_h().approx_eq(&pose, 1e-9), "{:?}", pose_2_xyzrpw(&pose));
        assert!((pose * inverse).approx_eq(&Pose::identity(), 1e-9));
        assert!((inverse * pose).approx_eq(&Pose::identity(), 1e-9));

        // The general matrix type agrees with the pose
        let mat = pose.to_mat();
        assert!(mat.is_homogeneous());
        let mat_inverse = mat.inv_h().unwrap();
        assert!(mat_inverse.max_abs_diff(&inverse.to_mat()).unwrap() < 1e-9);
        assert!(mat.try_mul(&mat_inverse).unwrap().max_abs_diff(&Mat::eye(4)).unwrap() < 1e-9);
    }
}

#[test]
fn test_xyzrpw_angles_survive_round_trip() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let xyzrpw = random_xyzrpw(&mut rng);
        let back = pose_2_xyzrpw(&xyzrpw_2_pose(&xyzrpw));
        for i in 0..6 {
            assert!((back[i] - xyzrpw[i]).abs() < 1e-7, "{:?} became {:?}", xyzrpw, back);
        }
    }
}

#[test]
fn test_gimbal_lock_poses_are_reproduced() {
    for pitch in [90.0, -90.0] {
        let pose = Pose::transl(100.0, -200.0, 300.0)
            * Pose::rotz(30f64.to_radians())
            * Pose::roty(f64::to_radians(pitch))
            * Pose::rotx(15f64.to_radians());
        for convention in EulerConvention::ALL {
            let values = convention.from_pose(&pose);
            assert!(values.iter().all(|v| v.is_finite()), "{}: {:?}", convention.name(), values);
            let back = convention.to_pose(&values).unwrap();
            assert!(back.approx_eq(&pose, 1e-6), "{} at pitch {}", convention.name(), pitch);
        }
    }
}

#[test]
fn test_wrong_arity_is_rejected() {
    assert!(EulerConvention::Abb.to_pose(&[0.0; 6]).is_err());
    assert!(EulerConvention::Kuka.to_pose(&[0.0; 7]).is_err());
}

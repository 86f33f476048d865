//! Post processors for industrial robots: render abstract robot programs as controller code.
//!
//! An offline programming session produces a sequence of abstract calls (start a program, move
//! to a joint or Cartesian target, change speed, set a digital output, ...). A post processor
//! receives these calls through the [`post_traits::RobotPost`] trait and turns them into the
//! program text of one controller dialect.
//!
//! # Features
//!
//! - [`pose::Pose`]: homogeneous transforms with composition and inversion, and [`mat::Mat`], a
//!   general dense matrix with checked arithmetic and block access.
//! - Pose conversions from and to the Euler angle, quaternion and rotation vector conventions of
//!   the major robot vendors, with explicit handling of gimbal lock ([`euler`]).
//! - Posts for ABB RAPID, KUKA KRL, Fanuc TP, Motoman INFORM, Universal Robots URScript and
//!   Siemens Sinumerik. Fanuc and Motoman programs that exceed the controller's practical size
//!   are split into pages automatically.
//! - URScript programs can be sent to the robot over the network.
//! - Call sequences and post settings can be read from YAML (`allow_filesystem` feature).
//!
//! # Example
//!
//! ```
//! use robot_post::euler::xyzrpw_2_pose;
//! use robot_post::kuka_krl::KukaKrl;
//! use robot_post::post_settings::PostSettings;
//! use robot_post::post_traits::{RobotPost, Target};
//!
//! let mut post = KukaKrl::new(&PostSettings::default());
//! post.prog_start("main").unwrap();
//! post.move_j(&Target::from_joints(vec![0.0, -90.0, 90.0, 0.0, 45.0, 0.0])).unwrap();
//! post.move_l(&Target::from_pose(xyzrpw_2_pose(&[800.0, 0.0, 600.0, 180.0, 0.0, 180.0]))).unwrap();
//! post.prog_finish("main").unwrap();
//!
//! let files = post.program_files("main").unwrap();
//! assert!(files[0].contents.contains("LIN {X 800.000,Y 0.000,Z 600.000"));
//! ```

pub mod pose_error;
pub mod mat;
pub mod pose;
pub mod euler;

#[path = "utils/utils.rs"]
pub mod utils;

pub mod post_error;
pub mod post_settings;
pub mod post_traits;
pub mod program;

#[path = "posts/abb_rapid.rs"]
pub mod abb_rapid;

#[path = "posts/kuka_krl.rs"]
pub mod kuka_krl;

#[path = "posts/fanuc_tp.rs"]
pub mod fanuc_tp;

#[path = "posts/motoman_inform.rs"]
pub mod motoman_inform;

#[path = "posts/ur_script.rs"]
pub mod ur_script;

#[path = "posts/sinumerik.rs"]
pub mod sinumerik;

pub mod post_kind;
pub mod call_sequence;

#[cfg(test)]
#[cfg(feature = "allow_filesystem")]
mod tests;

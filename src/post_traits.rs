//! The protocol every post processor implements, and the data it is fed with.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::pose::Pose;
use crate::post_error::PostError;
use crate::post_settings::PostSettings;

/// Joint values in degrees (mm for linear axes). Entries beyond the sixth are external axes.
pub type Joints = Vec<f64>;

/// Robot arms handled here have between 6 and 12 axes including external ones.
pub const MIN_AXES: usize = 6;
pub const MAX_AXES: usize = 12;

/// Selects one of the inverse kinematics branches for a Cartesian pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// Wrist center behind the base (back / front)
    pub rear: bool,
    /// Elbow down
    pub lower_arm: bool,
    /// Wrist flipped (J5 negative)
    pub flip: bool,
}

impl Config {
    pub fn new(rear: bool, lower_arm: bool, flip: bool) -> Self {
        Config { rear, lower_arm, flip }
    }

    /// From the [REAR, LOWERARM, FLIP] triple, non-zero meaning set.
    pub fn from_triple(rlf: [i32; 3]) -> Self {
        Config::new(rlf[0] != 0, rlf[1] != 0, rlf[2] != 0)
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rlf = <[i32; 3]>::deserialize(deserializer)?;
        Ok(Config::from_triple(rlf))
    }
}

/// A robot position: Cartesian pose, joint values, or both.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Target {
    pub pose: Option<Pose>,
    pub joints: Joints,
    pub config: Option<Config>,
}

impl Target {
    pub fn new(pose: Option<Pose>, joints: Joints, config: Option<Config>) -> Self {
        Target { pose, joints, config }
    }

    pub fn from_joints(joints: Joints) -> Self {
        Target { pose: None, joints, config: None }
    }

    pub fn from_pose(pose: Pose) -> Self {
        Target { pose: Some(pose), joints: Vec::new(), config: None }
    }

    pub fn with_joints(mut self, joints: Joints) -> Self {
        self.joints = joints;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn has_joints(&self) -> bool {
        !self.joints.is_empty()
    }

    /// Rejects joint vectors that cannot belong to a 6 to 12 axis robot.
    /// An empty vector is fine, it means no joints were given.
    pub fn check(&self) -> Result<(), PostError> {
        check_joints(&self.joints)
    }

    /// Joint values past the sixth (external axes)
    pub fn external_axes(&self) -> &[f64] {
        if self.joints.len() > MIN_AXES { &self.joints[MIN_AXES..] } else { &[] }
    }
}

pub fn check_joints(joints: &[f64]) -> Result<(), PostError> {
    if !joints.is_empty() && !(MIN_AXES..=MAX_AXES).contains(&joints.len()) {
        return Err(PostError::InvalidJoints { found: joints.len() });
    }
    Ok(())
}

/// Digital I/O is addressed either by number or by the name of a controller variable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IoVar {
    Index(u32),
    Name(String),
}

/// Value written to or awaited on a digital I/O.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IoValue {
    Bool(bool),
    Number(f64),
    /// Raw controller expression, emitted as is
    Expr(String),
}

impl IoValue {
    /// Truth value of booleans and numbers, `None` for expressions.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            IoValue::Bool(b) => Some(*b),
            IoValue::Number(n) => Some(*n != 0.0),
            IoValue::Expr(_) => None,
        }
    }

    /// Renders with the controller's spelling of true and false.
    pub fn render(&self, on: &str, off: &str) -> String {
        match self {
            IoValue::Expr(e) => e.clone(),
            _ if self.as_bool() == Some(true) => on.to_string(),
            _ => off.to_string(),
        }
    }
}

impl From<bool> for IoValue {
    fn from(b: bool) -> Self {
        IoValue::Bool(b)
    }
}

/// Speed, acceleration and blending currently applied to new moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionDefaults {
    pub speed_mm_s: f64,
    pub speed_joints_deg_s: f64,
    pub acceleration_mm_s2: f64,
    pub acceleration_joints_deg_s2: f64,
    /// Blending radius, zero or negative for exact stop
    pub zone_mm: f64,
}

impl MotionDefaults {
    pub fn from_settings(settings: &PostSettings) -> Self {
        MotionDefaults {
            speed_mm_s: settings.speed_mm_s,
            speed_joints_deg_s: settings.speed_joints_deg_s,
            acceleration_mm_s2: settings.acceleration_mm_s2,
            acceleration_joints_deg_s2: settings.acceleration_joints_deg_s2,
            zone_mm: settings.zone_mm,
        }
    }

    pub fn is_fine(&self) -> bool {
        self.zone_mm <= 0.0
    }
}

/// One rendered output file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramFile {
    pub file_name: String,
    pub contents: String,
}

/// Renders the abstract robot calls of an offline programming session into the program text
/// of one controller. The calls arrive in program order: `prog_start`, then instructions, then
/// `prog_finish`, possibly repeated for subprograms, and finally `program_files` or
/// `prog_save`.
pub trait RobotPost {
    /// Controller name used in logs and errors
    fn name(&self) -> &'static str;

    /// Extension of the main program file, without the dot
    fn extension(&self) -> &'static str;

    fn prog_start(&mut self, name: &str) -> Result<(), PostError>;

    fn prog_finish(&mut self, name: &str) -> Result<(), PostError>;

    fn move_j(&mut self, target: &Target) -> Result<(), PostError>;

    fn move_l(&mut self, target: &Target) -> Result<(), PostError>;

    /// Circular move through `via` ending at `end`.
    fn move_c(&mut self, _via: &Target, _end: &Target) -> Result<(), PostError> {
        Err(PostError::Unsupported { post: self.name(), instruction: "MoveC".into() })
    }

    fn set_frame(&mut self, pose: &Pose, id: Option<u32>, name: &str) -> Result<(), PostError>;

    fn set_tool(&mut self, pose: &Pose, id: Option<u32>, name: &str) -> Result<(), PostError>;

    /// Linear speed in mm/s
    fn set_speed(&mut self, mm_s: f64) -> Result<(), PostError>;

    /// Joint speed in deg/s
    fn set_speed_joints(&mut self, deg_s: f64) -> Result<(), PostError>;

    /// Linear acceleration in mm/s²
    fn set_acceleration(&mut self, mm_s2: f64) -> Result<(), PostError>;

    /// Joint acceleration in deg/s²
    fn set_acceleration_joints(&mut self, deg_s2: f64) -> Result<(), PostError>;

    /// Blending radius in mm, zero or negative for exact stop
    fn set_zone_data(&mut self, mm: f64) -> Result<(), PostError>;

    fn set_do(&mut self, io: &IoVar, value: &IoValue) -> Result<(), PostError>;

    fn wait_di(&mut self, io: &IoVar, value: &IoValue, timeout_ms: Option<f64>) -> Result<(), PostError>;

    /// Dwell for `ms` milliseconds. `None` or a negative time stops until the operator resumes.
    fn pause(&mut self, ms: Option<f64>) -> Result<(), PostError>;

    /// Calls a subprogram (`is_call`) or inserts `code` verbatim.
    fn run_code(&mut self, code: &str, is_call: bool) -> Result<(), PostError>;

    /// Adds a comment (`is_comment`) or shows `message` to the operator.
    fn run_message(&mut self, message: &str, is_comment: bool) -> Result<(), PostError>;

    /// All files of the generated program set, the main one saved as `name`.
    fn program_files(&self, name: &str) -> Result<Vec<ProgramFile>, PostError>;

    /// Writes the program files into `folder` and returns their paths.
    fn prog_save(&self, folder: &Path, name: &str) -> Result<Vec<PathBuf>, PostError> {
        fs::create_dir_all(folder)?;
        let mut written = Vec::new();
        for file in self.program_files(name)? {
            let path = folder.join(&file.file_name);
            fs::write(&path, file.contents.as_bytes())?;
            info!("{}: saved {}", self.name(), path.display());
            written.push(path);
        }
        Ok(written)
    }

    /// Transfers the program to the controller.
    fn prog_send_robot(&self, _robot_ip: &str, _remote_path: &str, _user: &str, _password: &str)
                       -> Result<(), PostError> {
        Err(PostError::Unsupported { post: self.name(), instruction: "sending programs to the robot".into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_vector_lengths() {
        assert!(check_joints(&[]).is_ok());
        assert!(check_joints(&[0.0; 6]).is_ok());
        assert!(check_joints(&[0.0; 12]).is_ok());
        assert!(matches!(check_joints(&[0.0; 5]), Err(PostError::InvalidJoints { found: 5 })));
        assert!(matches!(check_joints(&[0.0; 13]), Err(PostError::InvalidJoints { found: 13 })));
    }

    #[test]
    fn test_external_axes() {
        let t = Target::from_joints(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 700.0]);
        assert_eq!(t.external_axes(), &[700.0]);
        assert!(Target::from_joints(vec![0.0; 6]).external_axes().is_empty());
    }

    #[test]
    fn test_io_value_render() {
        assert_eq!(IoValue::Bool(true).render("ON", "OFF"), "ON");
        assert_eq!(IoValue::Number(0.0).render("TRUE", "FALSE"), "FALSE");
        assert_eq!(IoValue::Expr("R[1]".into()).render("ON", "OFF"), "R[1]");
    }

    #[test]
    fn test_config_triple() {
        assert_eq!(Config::from_triple([1, 0, 1]), Config::new(true, false, true));
        assert_eq!(Config::default(), Config::new(false, false, false));
    }
}

//! Recorded sequence of robot calls that can be replayed into any post.
//!
//! This is how programs reach the command line tool: a YAML document listing the calls in
//! program order, each call a single-key map named after the [`RobotPost`] method. Cartesian
//! poses are `[x, y, z, r, p, w]` in millimeters and degrees (the xyzrpw convention).
//!
//! ```yaml
//! calls:
//!   - prog_start: { name: Main }
//!   - set_tool: { pose: [0, 0, 150, 0, 0, 0], id: 1, name: Gripper }
//!   - move_j: { joints: [0, -90, 90, 0, 90, 0] }
//!   - set_speed: 250
//!   - move_l: { pose: [500, 0, 400, 180, 0, 180], config: [0, 0, 1] }
//!   - set_do: { io: 3, value: true }
//!   - pause: 500
//!   - prog_finish: { name: Main }
//! ```

use serde::Deserialize;
use tracing::debug;

use crate::euler::xyzrpw_2_pose;
use crate::post_error::PostError;
use crate::post_traits::{Config, IoValue, IoVar, RobotPost, Target};

/// A target as written in call sequences.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    #[serde(default)]
    pub pose: Option<[f64; 6]>,
    #[serde(default)]
    pub joints: Vec<f64>,
    #[serde(default)]
    pub config: Option<Config>,
}

impl TargetSpec {
    pub fn to_target(&self) -> Target {
        Target::new(self.pose.as_ref().map(xyzrpw_2_pose), self.joints.clone(), self.config)
    }
}

/// Reference frame or tool definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameSpec {
    pub pose: [f64; 6],
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Call {
    ProgStart { name: String },
    ProgFinish { name: String },
    MoveJ(TargetSpec),
    MoveL(TargetSpec),
    MoveC { via: TargetSpec, end: TargetSpec },
    SetFrame(FrameSpec),
    SetTool(FrameSpec),
    SetSpeed(f64),
    SetSpeedJoints(f64),
    SetAcceleration(f64),
    SetAccelerationJoints(f64),
    SetZoneData(f64),
    SetDo { io: IoVar, value: IoValue },
    WaitDi {
        io: IoVar,
        value: IoValue,
        #[serde(default)]
        timeout_ms: Option<f64>,
    },
    /// Milliseconds, null to stop until the operator resumes
    Pause(Option<f64>),
    RunCode {
        code: String,
        #[serde(default)]
        call: bool,
    },
    RunMessage {
        message: String,
        #[serde(default)]
        comment: bool,
    },
}

impl Call {
    /// Performs the call on `post`.
    pub fn apply(&self, post: &mut dyn RobotPost) -> Result<(), PostError> {
        match self {
            Call::ProgStart { name } => post.prog_start(name),
            Call::ProgFinish { name } => post.prog_finish(name),
            Call::MoveJ(target) => post.move_j(&target.to_target()),
            Call::MoveL(target) => post.move_l(&target.to_target()),
            Call::MoveC { via, end } => post.move_c(&via.to_target(), &end.to_target()),
            Call::SetFrame(frame) => post.set_frame(&xyzrpw_2_pose(&frame.pose), frame.id, &frame.name),
            Call::SetTool(tool) => post.set_tool(&xyzrpw_2_pose(&tool.pose), tool.id, &tool.name),
            Call::SetSpeed(v) => post.set_speed(*v),
            Call::SetSpeedJoints(v) => post.set_speed_joints(*v),
            Call::SetAcceleration(a) => post.set_acceleration(*a),
            Call::SetAccelerationJoints(a) => post.set_acceleration_joints(*a),
            Call::SetZoneData(z) => post.set_zone_data(*z),
            Call::SetDo { io, value } => post.set_do(io, value),
            Call::WaitDi { io, value, timeout_ms } => post.wait_di(io, value, *timeout_ms),
            Call::Pause(ms) => post.pause(*ms),
            Call::RunCode { code, call } => post.run_code(code, *call),
            Call::RunMessage { message, comment } => post.run_message(message, *comment),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallSequence {
    pub calls: Vec<Call>,
}

impl CallSequence {
    pub fn new(calls: Vec<Call>) -> Self {
        CallSequence { calls }
    }

    /// Name of the first program started, if any.
    pub fn main_program(&self) -> Option<&str> {
        self.calls.iter().find_map(|call| match call {
            Call::ProgStart { name } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Replays all calls into `post`, stopping at the first error.
    pub fn replay(&self, post: &mut dyn RobotPost) -> Result<(), PostError> {
        for (i, call) in self.calls.iter().enumerate() {
            debug!("{}: call {}: {:?}", post.name(), i + 1, call);
            call.apply(post)?;
        }
        Ok(())
    }
}

#[cfg(feature = "allow_filesystem")]
mod from_file {
    use std::path::Path;

    use serde_saphyr::Options;

    use super::CallSequence;
    use crate::post_error::PostError;

    impl CallSequence {
        /// Parses the YAML form. `deg()`/`rad()` angle expressions are accepted in numbers.
        pub fn from_yaml_str(yaml: &str) -> Result<Self, PostError> {
            serde_saphyr::from_str_with_options(
                yaml,
                Options { angle_conversions: true, ..Default::default() },
            ).map_err(|e| PostError::ParseError(format!("{}", e)))
        }

        pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, PostError> {
            let contents = std::fs::read_to_string(path)?;
            Self::from_yaml_str(&contents)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abb_rapid::AbbRapid;
    use crate::post_settings::PostSettings;

    #[test]
    fn test_replay_built_sequence() {
        let sequence = CallSequence::new(vec![
            Call::ProgStart { name: "main".into() },
            Call::MoveJ(TargetSpec { joints: vec![0.0; 6], ..Default::default() }),
            Call::Pause(None),
            Call::ProgFinish { name: "main".into() },
        ]);
        assert_eq!(sequence.main_program(), Some("main"));
        let mut post = AbbRapid::new(&PostSettings::default());
        sequence.replay(&mut post).unwrap();
        let text = &post.program_files("main").unwrap()[0].contents;
        assert!(text.contains("MoveAbsJ"));
        assert!(text.contains("STOP;"));
    }

    #[test]
    fn test_replay_stops_at_first_error() {
        let sequence = CallSequence::new(vec![
            Call::SetSpeed(100.0),
            Call::ProgStart { name: "main".into() },
        ]);
        let mut post = AbbRapid::new(&PostSettings::default());
        assert!(matches!(sequence.replay(&mut post), Err(PostError::NoProgram { instruction: "SetSpeed" })));
    }
}

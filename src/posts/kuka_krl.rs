//! KUKA KRC4 KRL.
//!
//! The first program is the `DEF` of the `.src` file, later ones follow as local subprograms.
//! Frames and tools are assigned to `$BASE` and `$TOOL` directly, speeds and accelerations to
//! the system variables or through `BAS` for joint motion.

use tracing::{debug, warn};

use crate::euler::pose_2_kuka;
use crate::pose::Pose;
use crate::post_error::PostError;
use crate::post_settings::PostSettings;
use crate::post_traits::{IoValue, IoVar, MotionDefaults, ProgramFile, RobotPost, Target};
use crate::program::{ProgramBuffer, ProgramTracker};
use crate::utils::{num, sanitize_name};

const NAME: &str = "KUKA KRL";

pub struct KukaKrl {
    settings: PostSettings,
    motion: MotionDefaults,
    tracker: ProgramTracker,
    body: ProgramBuffer,
}

impl KukaKrl {
    pub fn new(settings: &PostSettings) -> Self {
        KukaKrl {
            settings: settings.clone(),
            motion: MotionDefaults::from_settings(settings),
            tracker: ProgramTracker::default(),
            body: ProgramBuffer::new("  "),
        }
    }

    fn emit(&mut self, instruction: &'static str, line: String) -> Result<(), PostError> {
        self.tracker.current(instruction)?;
        debug!("{}: {}", NAME, line);
        self.body.push(line);
        Ok(())
    }

    /// Approximation suffix of PTP and CP motions.
    fn approximation(&self, ptp: bool) -> &'static str {
        match (self.motion.is_fine(), ptp) {
            (true, _) => "",
            (false, true) => " C_PTP",
            (false, false) => " C_DIS",
        }
    }
}

/// `X 1.000,Y 2.000,Z 3.000,A 0.000,B 0.000,C 0.000`
fn frame_fields(pose: &Pose) -> String {
    let v = pose_2_kuka(pose);
    format!("X {},Y {},Z {},A {},B {},C {}",
            num(v[0], 3), num(v[1], 3), num(v[2], 3), num(v[3], 3), num(v[4], 3), num(v[5], 3))
}

/// `,E1 100.000,...` for external axes
fn external_fields(target: &Target) -> String {
    target.external_axes().iter().enumerate()
        .map(|(i, e)| format!(",E{} {}", i + 1, num(*e, 3)))
        .collect()
}

fn axis_fields(target: &Target) -> String {
    let axes: Vec<String> = target.joints.iter().take(6).enumerate()
        .map(|(i, j)| format!("A{} {}", i + 1, num(*j, 4)))
        .collect();
    format!("{}{}", axes.join(","), external_fields(target))
}

fn cartesian_fields(pose: &Pose, target: &Target) -> String {
    format!("{}{}", frame_fields(pose), external_fields(target))
}

fn io_name(io: &IoVar, array: &str) -> String {
    match io {
        IoVar::Index(n) => format!("{}[{}]", array, n),
        IoVar::Name(name) => name.clone(),
    }
}

impl RobotPost for KukaKrl {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "src"
    }

    fn prog_start(&mut self, name: &str) -> Result<(), PostError> {
        let name = sanitize_name(name, 24, false);
        self.tracker.start(&name)?;
        self.body.push(format!("DEF {}( )", name));
        self.body.indent();
        if self.tracker.in_main() {
            self.body.push(";FOLD INI");
            self.body.push("  BAS (#INITMOV,0 )");
            self.body.push(";ENDFOLD (INI)");
            self.body.push("");
            self.body.push(format!("$VEL.CP = {}", num(self.motion.speed_mm_s / 1000.0, 5)));
            self.body.push(format!("BAS(#VEL_PTP,{})",
                                   num(self.settings.joint_speed_percent(self.motion.speed_joints_deg_s), 0)));
            if !self.motion.is_fine() {
                self.body.push(format!("$APO.CDIS = {}", num(self.motion.zone_mm, 3)));
            }
        }
        Ok(())
    }

    fn prog_finish(&mut self, name: &str) -> Result<(), PostError> {
        self.tracker.finish(&sanitize_name(name, 24, false))?;
        self.body.dedent();
        self.body.push("END");
        self.body.push("");
        Ok(())
    }

    fn move_j(&mut self, target: &Target) -> Result<(), PostError> {
        target.check()?;
        let fields = if target.has_joints() {
            axis_fields(target)
        } else if let Some(pose) = &target.pose {
            cartesian_fields(pose, target)
        } else {
            return Err(PostError::MissingPose { post: NAME, instruction: "MoveJ" });
        };
        let line = format!("PTP {{{}}}{}", fields, self.approximation(true));
        self.emit("MoveJ", line)
    }

    fn move_l(&mut self, target: &Target) -> Result<(), PostError> {
        target.check()?;
        let pose = target.pose.as_ref().ok_or(PostError::MissingPose { post: NAME, instruction: "MoveL" })?;
        let line = format!("LIN {{{}}}{}", cartesian_fields(pose, target), self.approximation(false));
        self.emit("MoveL", line)
    }

    fn move_c(&mut self, via: &Target, end: &Target) -> Result<(), PostError> {
        via.check()?;
        end.check()?;
        let (Some(p1), Some(p2)) = (&via.pose, &end.pose) else {
            return Err(PostError::MissingPose { post: NAME, instruction: "MoveC" });
        };
        let line = format!("CIRC {{{}}},{{{}}}{}",
                           cartesian_fields(p1, via), cartesian_fields(p2, end), self.approximation(false));
        self.emit("MoveC", line)
    }

    fn set_frame(&mut self, pose: &Pose, _id: Option<u32>, name: &str) -> Result<(), PostError> {
        self.tracker.current("SetFrame")?;
        if !name.is_empty() {
            self.body.push(format!("; {}", name));
        }
        self.emit("SetFrame", format!("$BASE = {{FRAME: {}}}", frame_fields(pose)))
    }

    fn set_tool(&mut self, pose: &Pose, _id: Option<u32>, name: &str) -> Result<(), PostError> {
        self.tracker.current("SetTool")?;
        if !name.is_empty() {
            self.body.push(format!("; {}", name));
        }
        self.emit("SetTool", format!("$TOOL = {{FRAME: {}}}", frame_fields(pose)))
    }

    fn set_speed(&mut self, mm_s: f64) -> Result<(), PostError> {
        self.tracker.current("SetSpeed")?;
        self.motion.speed_mm_s = mm_s;
        self.emit("SetSpeed", format!("$VEL.CP = {}", num(mm_s / 1000.0, 5)))
    }

    fn set_speed_joints(&mut self, deg_s: f64) -> Result<(), PostError> {
        self.tracker.current("SetSpeedJoints")?;
        self.motion.speed_joints_deg_s = deg_s;
        let percent = self.settings.joint_speed_percent(deg_s);
        self.emit("SetSpeedJoints", format!("BAS(#VEL_PTP,{})", num(percent, 0)))
    }

    fn set_acceleration(&mut self, mm_s2: f64) -> Result<(), PostError> {
        self.tracker.current("SetAcceleration")?;
        self.motion.acceleration_mm_s2 = mm_s2;
        self.emit("SetAcceleration", format!("$ACC.CP = {}", num(mm_s2 / 1000.0, 5)))
    }

    fn set_acceleration_joints(&mut self, deg_s2: f64) -> Result<(), PostError> {
        self.tracker.current("SetAccelerationJoints")?;
        self.motion.acceleration_joints_deg_s2 = deg_s2;
        let percent = self.settings.joint_acceleration_percent(deg_s2);
        self.emit("SetAccelerationJoints", format!("BAS(#ACC_PTP,{})", num(percent, 0)))
    }

    fn set_zone_data(&mut self, mm: f64) -> Result<(), PostError> {
        self.tracker.current("SetZoneData")?;
        self.motion.zone_mm = mm;
        if mm > 0.0 {
            self.emit("SetZoneData", format!("$APO.CDIS = {}", num(mm, 3)))
        } else {
            Ok(())
        }
    }

    fn set_do(&mut self, io: &IoVar, value: &IoValue) -> Result<(), PostError> {
        let line = format!("{} = {}", io_name(io, "$OUT"), value.render("TRUE", "FALSE"));
        self.emit("SetDO", line)
    }

    fn wait_di(&mut self, io: &IoVar, value: &IoValue, timeout_ms: Option<f64>) -> Result<(), PostError> {
        self.tracker.current("WaitDI")?;
        if let Some(ms) = timeout_ms.filter(|ms| *ms > 0.0) {
            warn!("{}: wait timeout of {} ms is not supported, waiting without timeout", NAME, ms);
            self.body.push(format!("; timeout of {} ms not supported", num(ms, 0)));
        }
        let line = format!("WAIT FOR {} == {}", io_name(io, "$IN"), value.render("TRUE", "FALSE"));
        self.emit("WaitDI", line)
    }

    fn pause(&mut self, ms: Option<f64>) -> Result<(), PostError> {
        let line = match ms {
            Some(ms) if ms >= 0.0 => format!("WAIT SEC {}", num(ms / 1000.0, 3)),
            _ => "HALT".to_string(),
        };
        self.emit("Pause", line)
    }

    fn run_code(&mut self, code: &str, is_call: bool) -> Result<(), PostError> {
        self.tracker.current("RunCode")?;
        if is_call {
            let call = if code.contains('(') { code.to_string() } else { format!("{}()", sanitize_name(code, 24, false)) };
            self.body.push(call);
        } else {
            self.body.push_block(code);
        }
        Ok(())
    }

    fn run_message(&mut self, message: &str, is_comment: bool) -> Result<(), PostError> {
        let line = if is_comment {
            format!("; {}", message)
        } else {
            format!("MsgNotify(\"{}\")", message.replace('"', "'"))
        };
        self.emit("RunMessage", line)
    }

    fn program_files(&self, name: &str) -> Result<Vec<ProgramFile>, PostError> {
        self.tracker.check_finished()?;
        let mut out = ProgramBuffer::new("  ");
        out.push("&ACCESS RVP");
        out.push("&REL 1");
        out.push("&PARAM TEMPLATE = C:\\KRC\\Roboter\\Template\\vorgabe");
        out.push("&PARAM EDITMASK = *");
        out.extend(&self.body);
        // KRL requires the file to be named like the main DEF
        let file_name = match self.tracker.main() {
            Some(main) => main.to_string(),
            None => sanitize_name(name, 24, false),
        };
        Ok(vec![ProgramFile { file_name: format!("{}.{}", file_name, self.extension()), contents: out.text() }])
    }
}

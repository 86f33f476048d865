//! Universal Robots URScript.
//!
//! The whole program set is one script: the first program is the top level `def`, later
//! programs are nested `def`s inside it. Speeds, accelerations and the blend radius are script
//! variables the motion commands refer to. UR controllers have no user frames, so Cartesian
//! targets are composed with the active frame (`frame * pose`) before they are written, in
//! metres and as rotation vectors.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::euler::pose_2_ur;
use crate::pose::Pose;
use crate::post_error::PostError;
use crate::post_settings::PostSettings;
use crate::post_traits::{IoValue, IoVar, MotionDefaults, ProgramFile, RobotPost, Target};
use crate::program::{ProgramBuffer, ProgramTracker};
use crate::utils::{num, num_list, sanitize_name};

const NAME: &str = "UR Script";

/// Polling period of digital input waits, seconds
const WAIT_STEP_S: f64 = 0.008;

pub struct UrScript {
    settings: PostSettings,
    motion: MotionDefaults,
    tracker: ProgramTracker,
    /// Programs in the order they were started
    programs: Vec<(String, ProgramBuffer)>,
    frame: Pose,
}

impl UrScript {
    pub fn new(settings: &PostSettings) -> Self {
        UrScript {
            settings: settings.clone(),
            motion: MotionDefaults::from_settings(settings),
            tracker: ProgramTracker::default(),
            programs: Vec::new(),
            frame: Pose::identity(),
        }
    }

    fn body(&mut self, instruction: &'static str) -> Result<&mut ProgramBuffer, PostError> {
        self.tracker.current(instruction)?;
        self.programs.last_mut().map(|(_, body)| body).ok_or(PostError::NoProgram { instruction })
    }

    fn emit(&mut self, instruction: &'static str, line: String) -> Result<(), PostError> {
        debug!("{}: {}", NAME, line);
        self.body(instruction)?.push(line);
        Ok(())
    }

    /// `p[x,y,z,rx,ry,rz]` of a target in the active frame
    fn pose_value(&self, pose: &Pose) -> String {
        ur_pose(&(self.frame * *pose))
    }

    fn joint_value(target: &Target) -> String {
        if target.joints.len() > 6 {
            warn!("{}: external axes are ignored", NAME);
        }
        let radians: Vec<f64> = target.joints.iter().take(6).map(|j| j.to_radians()).collect();
        format!("[{}]", num_list(&radians, 6, ","))
    }

    fn script(&self) -> ProgramBuffer {
        let mut out = ProgramBuffer::new("  ");
        let Some((main, main_body)) = self.programs.first() else {
            return out;
        };
        out.push(format!("def {}():", main));
        out.indent();
        out.push(format!("global speed_ms = {}", num(self.settings.speed_mm_s / 1000.0, 5)));
        out.push(format!("global speed_rads = {}", num(self.settings.speed_joints_deg_s.to_radians(), 5)));
        out.push(format!("global accel_mss = {}", num(self.settings.acceleration_mm_s2 / 1000.0, 5)));
        out.push(format!("global accel_radss = {}", num(self.settings.acceleration_joints_deg_s2.to_radians(), 5)));
        out.push(format!("global blend_radius_m = {}", num(self.settings.zone_mm.max(0.0) / 1000.0, 5)));
        for (name, body) in self.programs.iter().skip(1) {
            out.push("");
            out.push(format!("def {}():", name));
            out.indent();
            for line in body.lines() {
                out.push(line);
            }
            out.dedent();
            out.push("end");
        }
        out.push("");
        for line in main_body.lines() {
            out.push(line);
        }
        out.dedent();
        out.push("end");
        out.push("");
        out.push(format!("{}()", main));
        out
    }
}

/// `p[x,y,z,rx,ry,rz]` with the position in metres
fn ur_pose(pose: &Pose) -> String {
    let v = pose_2_ur(pose);
    let metric = [v[0] / 1000.0, v[1] / 1000.0, v[2] / 1000.0, v[3], v[4], v[5]];
    format!("p[{}]", num_list(&metric, 6, ","))
}

fn digital_in(io: &IoVar) -> String {
    match io {
        IoVar::Index(n) => format!("get_standard_digital_in({})", n),
        IoVar::Name(name) => name.clone(),
    }
}

impl RobotPost for UrScript {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "script"
    }

    fn prog_start(&mut self, name: &str) -> Result<(), PostError> {
        let name = sanitize_name(name, 64, false);
        self.tracker.start(&name)?;
        self.programs.push((name, ProgramBuffer::new("  ")));
        Ok(())
    }

    fn prog_finish(&mut self, name: &str) -> Result<(), PostError> {
        self.tracker.finish(&sanitize_name(name, 64, false))?;
        Ok(())
    }

    fn move_j(&mut self, target: &Target) -> Result<(), PostError> {
        target.check()?;
        let position = if target.has_joints() {
            Self::joint_value(target)
        } else if let Some(pose) = &target.pose {
            self.pose_value(pose)
        } else {
            return Err(PostError::MissingPose { post: NAME, instruction: "MoveJ" });
        };
        self.emit("MoveJ", format!("movej({},a=accel_radss,v=speed_rads,r=blend_radius_m)", position))
    }

    fn move_l(&mut self, target: &Target) -> Result<(), PostError> {
        target.check()?;
        let position = if let Some(pose) = &target.pose {
            self.pose_value(pose)
        } else if target.has_joints() {
            Self::joint_value(target)
        } else {
            return Err(PostError::MissingPose { post: NAME, instruction: "MoveL" });
        };
        self.emit("MoveL", format!("movel({},a=accel_mss,v=speed_ms,r=blend_radius_m)", position))
    }

    fn move_c(&mut self, via: &Target, end: &Target) -> Result<(), PostError> {
        via.check()?;
        end.check()?;
        let (Some(p1), Some(p2)) = (&via.pose, &end.pose) else {
            return Err(PostError::MissingPose { post: NAME, instruction: "MoveC" });
        };
        let line = format!("movec({},{},a=accel_mss,v=speed_ms,r=blend_radius_m)", self.pose_value(p1), self.pose_value(p2));
        self.emit("MoveC", line)
    }

    fn set_frame(&mut self, pose: &Pose, _id: Option<u32>, name: &str) -> Result<(), PostError> {
        self.tracker.current("SetFrame")?;
        self.frame = *pose;
        self.emit("SetFrame", format!("# frame {}: {}", name, ur_pose(pose)))
    }

    fn set_tool(&mut self, pose: &Pose, _id: Option<u32>, name: &str) -> Result<(), PostError> {
        self.tracker.current("SetTool")?;
        if !name.is_empty() {
            self.emit("SetTool", format!("# tool {}", name))?;
        }
        self.emit("SetTool", format!("set_tcp({})", ur_pose(pose)))
    }

    fn set_speed(&mut self, mm_s: f64) -> Result<(), PostError> {
        self.tracker.current("SetSpeed")?;
        self.motion.speed_mm_s = mm_s;
        self.emit("SetSpeed", format!("speed_ms = {}", num(mm_s / 1000.0, 5)))
    }

    fn set_speed_joints(&mut self, deg_s: f64) -> Result<(), PostError> {
        self.tracker.current("SetSpeedJoints")?;
        self.motion.speed_joints_deg_s = deg_s;
        self.emit("SetSpeedJoints", format!("speed_rads = {}", num(deg_s.to_radians(), 5)))
    }

    fn set_acceleration(&mut self, mm_s2: f64) -> Result<(), PostError> {
        self.tracker.current("SetAcceleration")?;
        self.motion.acceleration_mm_s2 = mm_s2;
        self.emit("SetAcceleration", format!("accel_mss = {}", num(mm_s2 / 1000.0, 5)))
    }

    fn set_acceleration_joints(&mut self, deg_s2: f64) -> Result<(), PostError> {
        self.tracker.current("SetAccelerationJoints")?;
        self.motion.acceleration_joints_deg_s2 = deg_s2;
        self.emit("SetAccelerationJoints", format!("accel_radss = {}", num(deg_s2.to_radians(), 5)))
    }

    fn set_zone_data(&mut self, mm: f64) -> Result<(), PostError> {
        self.tracker.current("SetZoneData")?;
        self.motion.zone_mm = mm;
        self.emit("SetZoneData", format!("blend_radius_m = {}", num(mm.max(0.0) / 1000.0, 5)))
    }

    fn set_do(&mut self, io: &IoVar, value: &IoValue) -> Result<(), PostError> {
        let value = value.render("True", "False");
        let line = match io {
            IoVar::Index(n) => format!("set_standard_digital_out({},{})", n, value),
            IoVar::Name(name) => format!("{} = {}", name, value),
        };
        self.emit("SetDO", line)
    }

    fn wait_di(&mut self, io: &IoVar, value: &IoValue, timeout_ms: Option<f64>) -> Result<(), PostError> {
        let condition = format!("{} != {}", digital_in(io), value.render("True", "False"));
        let body = self.body("WaitDI")?;
        match timeout_ms.filter(|ms| *ms > 0.0) {
            Some(ms) => {
                body.push("wait_s = 0");
                body.push(format!("while ({}) and (wait_s < {}):", condition, num(ms / 1000.0, 3)));
                body.indent();
                body.push(format!("sleep({})", num(WAIT_STEP_S, 3)));
                body.push(format!("wait_s = wait_s + {}", num(WAIT_STEP_S, 3)));
            }
            None => {
                body.push(format!("while ({}):", condition));
                body.indent();
                body.push("sync()");
            }
        }
        body.dedent();
        body.push("end");
        Ok(())
    }

    fn pause(&mut self, ms: Option<f64>) -> Result<(), PostError> {
        let line = match ms {
            Some(ms) if ms >= 0.0 => format!("sleep({})", num(ms / 1000.0, 3)),
            _ => "halt()".to_string(),
        };
        self.emit("Pause", line)
    }

    fn run_code(&mut self, code: &str, is_call: bool) -> Result<(), PostError> {
        if is_call {
            let call = if code.contains('(') { code.to_string() } else { format!("{}()", sanitize_name(code, 64, false)) };
            self.emit("RunCode", call)
        } else {
            self.body("RunCode")?.push_block(code);
            Ok(())
        }
    }

    fn run_message(&mut self, message: &str, is_comment: bool) -> Result<(), PostError> {
        if is_comment {
            return self.emit("RunMessage", format!("# {}", message));
        }
        let quoted = message.replace('"', "'");
        self.emit("RunMessage", format!("textmsg(\"{}\")", quoted))?;
        self.emit("RunMessage", format!("popup(\"{}\",\"Message\",False,False,blocking=True)", quoted))
    }

    fn program_files(&self, name: &str) -> Result<Vec<ProgramFile>, PostError> {
        self.tracker.check_finished()?;
        Ok(vec![ProgramFile { file_name: format!("{}.{}", name, self.extension()), contents: self.script().text() }])
    }

    /// Sends the script to the secondary client interface, which runs it immediately.
    fn prog_send_robot(&self, robot_ip: &str, _remote_path: &str, _user: &str, _password: &str)
                       -> Result<(), PostError> {
        if self.programs.is_empty() {
            return Err(PostError::NoProgram { instruction: "send" });
        }
        self.tracker.check_finished()?;
        let script = self.script().text();
        let port = self.settings.ur_port;
        let timeout = Duration::from_millis(self.settings.connect_timeout_ms);
        let address = (robot_ip, port).to_socket_addrs()
            .map_err(|e| PostError::ConnectionError(format!("{}:{}: {}", robot_ip, port, e)))?
            .next()
            .ok_or_else(|| PostError::ConnectionError(format!("{}:{}: no address", robot_ip, port)))?;
        let mut stream = TcpStream::connect_timeout(&address, timeout)
            .map_err(|e| PostError::ConnectionError(format!("{}: {}", address, e)))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.write_all(script.as_bytes())?;
        stream.flush()?;
        info!("{}: sent {} bytes to {}", NAME, script.len(), address);
        Ok(())
    }
}

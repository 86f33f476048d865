//! ABB IRC5 RAPID module.
//!
//! All programs of a session go into one module; every program becomes a `PROC`. Targets are
//! written inline as robtargets (position, quaternion, configuration and external axes), speed
//! and zone data inline from the current motion defaults. Frames and tools are declared once as
//! `PERS` data at the top of the module and assigned in the procedure where they are selected.

use tracing::debug;

use crate::euler::pose_2_abb;
use crate::pose::Pose;
use crate::post_error::PostError;
use crate::post_settings::PostSettings;
use crate::post_traits::{IoValue, IoVar, MotionDefaults, ProgramFile, RobotPost, Target};
use crate::program::{ProgramBuffer, ProgramTracker};
use crate::utils::{num, num_list, sanitize_name};

const NAME: &str = "ABB RAPID";

/// Value of unused external axes in robtargets
const EAX_UNUSED: &str = "9E9";

pub struct AbbRapid {
    settings: PostSettings,
    motion: MotionDefaults,
    tracker: ProgramTracker,
    /// PERS declarations in order of first use: (name, declaration)
    declarations: Vec<(String, String)>,
    body: ProgramBuffer,
    tool: String,
    wobj: String,
}

impl AbbRapid {
    pub fn new(settings: &PostSettings) -> Self {
        AbbRapid {
            settings: settings.clone(),
            motion: MotionDefaults::from_settings(settings),
            tracker: ProgramTracker::default(),
            declarations: Vec::new(),
            body: ProgramBuffer::new("    "),
            tool: "tool0".into(),
            wobj: "wobj0".into(),
        }
    }

    fn emit(&mut self, instruction: &'static str, line: String) -> Result<(), PostError> {
        self.tracker.current(instruction)?;
        debug!("{}: {}", NAME, line);
        self.body.push(line);
        Ok(())
    }

    fn speeddata(&self) -> String {
        format!("[{},{},5000,1000]", num(self.motion.speed_mm_s, 1), num(self.motion.speed_joints_deg_s, 1))
    }

    fn zonedata(&self) -> String {
        if self.motion.is_fine() {
            "fine".into()
        } else {
            let z = self.motion.zone_mm;
            format!("[FALSE,{},{},{},{},{},{}]",
                    num(z, 1), num(1.5 * z, 1), num(1.5 * z, 1), num(0.15 * z, 2), num(1.5 * z, 1), num(0.15 * z, 2))
        }
    }

    fn tool_wobj(&self) -> String {
        format!("{}\\WObj:={}", self.tool, self.wobj)
    }

    /// Declares `name` once and assigns its value in the running program on every call.
    fn declare(&mut self, instruction: &'static str, name: &str, declaration: String, assignment: String)
               -> Result<(), PostError> {
        self.emit(instruction, assignment)?;
        if !self.declarations.iter().any(|(n, _)| n == name) {
            self.declarations.push((name.to_string(), declaration));
        }
        Ok(())
    }
}

/// `[[x,y,z],[q1,q2,q3,q4]]`
fn pose_data(pose: &Pose) -> String {
    let xyzq = pose_2_abb(pose);
    format!("[[{}],[{}]]", num_list(&xyzq[..3], 3, ","), num_list(&xyzq[3..], 8, ","))
}

/// Quadrant of a joint angle as robtarget configuration data counts it.
fn quadrant(deg: f64) -> i32 {
    (deg / 90.0).floor() as i32
}

/// `[cf1,cf4,cf6,cfx]`, quadrants from joints when known and cfx from the configuration.
fn confdata(target: &Target) -> String {
    let (cf1, cf4, cf6) = if target.joints.len() >= 6 {
        (quadrant(target.joints[0]), quadrant(target.joints[3]), quadrant(target.joints[5]))
    } else {
        (0, 0, 0)
    };
    let cfx = target.config.map_or(0, |c| 4 * c.rear as i32 + 2 * c.lower_arm as i32 + c.flip as i32);
    format!("[{},{},{},{}]", cf1, cf4, cf6, cfx)
}

/// External axes padded with 9E9 to the six robtarget slots.
fn extax(target: &Target) -> String {
    let mut axes: Vec<String> = target.external_axes().iter().map(|&e| num(e, 3)).collect();
    axes.truncate(6);
    while axes.len() < 6 {
        axes.push(EAX_UNUSED.into());
    }
    format!("[{}]", axes.join(","))
}

fn robtarget(pose: &Pose, target: &Target) -> String {
    let xyzq = pose_2_abb(pose);
    format!("[[{}],[{}],{},{}]",
            num_list(&xyzq[..3], 3, ","), num_list(&xyzq[3..], 8, ","), confdata(target), extax(target))
}

fn io_name(io: &IoVar, prefix: &str) -> String {
    match io {
        IoVar::Index(n) => format!("{}{}", prefix, n),
        IoVar::Name(name) => name.clone(),
    }
}

impl RobotPost for AbbRapid {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "mod"
    }

    fn prog_start(&mut self, name: &str) -> Result<(), PostError> {
        let name = sanitize_name(name, 32, false);
        self.tracker.start(&name)?;
        self.body.push(format!("PROC {}()", name));
        self.body.indent();
        if self.tracker.in_main() {
            self.body.push("ConfJ \\Off;");
            self.body.push("ConfL \\Off;");
        }
        Ok(())
    }

    fn prog_finish(&mut self, name: &str) -> Result<(), PostError> {
        self.tracker.finish(&sanitize_name(name, 32, false))?;
        self.body.dedent();
        self.body.push("ENDPROC");
        self.body.push("");
        Ok(())
    }

    fn move_j(&mut self, target: &Target) -> Result<(), PostError> {
        target.check()?;
        let line = match &target.pose {
            Some(pose) => format!("MoveJ {},{},{},{};",
                                  robtarget(pose, target), self.speeddata(), self.zonedata(), self.tool_wobj()),
            None if target.has_joints() => {
                let joints = num_list(&target.joints[..6], 4, ",");
                format!("MoveAbsJ [[{}],{}],{},{},{};",
                        joints, extax(target), self.speeddata(), self.zonedata(), self.tool_wobj())
            }
            None => return Err(PostError::MissingPose { post: NAME, instruction: "MoveJ" }),
        };
        self.emit("MoveJ", line)
    }

    fn move_l(&mut self, target: &Target) -> Result<(), PostError> {
        target.check()?;
        let pose = target.pose.as_ref().ok_or(PostError::MissingPose { post: NAME, instruction: "MoveL" })?;
        let line = format!("MoveL {},{},{},{};",
                           robtarget(pose, target), self.speeddata(), self.zonedata(), self.tool_wobj());
        self.emit("MoveL", line)
    }

    fn move_c(&mut self, via: &Target, end: &Target) -> Result<(), PostError> {
        via.check()?;
        end.check()?;
        let (Some(p1), Some(p2)) = (&via.pose, &end.pose) else {
            return Err(PostError::MissingPose { post: NAME, instruction: "MoveC" });
        };
        let line = format!("MoveC {},{},{},{},{};",
                           robtarget(p1, via), robtarget(p2, end), self.speeddata(), self.zonedata(), self.tool_wobj());
        self.emit("MoveC", line)
    }

    fn set_frame(&mut self, pose: &Pose, id: Option<u32>, name: &str) -> Result<(), PostError> {
        let wobj = match id {
            _ if !name.trim().is_empty() => sanitize_name(name, 32, false),
            Some(id) => format!("wobj{}", id),
            None => "wobj1".to_string(),
        };
        let data = pose_data(pose);
        self.declare("SetFrame", &wobj,
                     format!("PERS wobjdata {} := [FALSE,TRUE,\"\",{},[[0,0,0],[1,0,0,0]]];", wobj, data),
                     format!("{}.uframe := {};", wobj, data))?;
        self.wobj = wobj;
        Ok(())
    }

    fn set_tool(&mut self, pose: &Pose, id: Option<u32>, name: &str) -> Result<(), PostError> {
        let tool = match id {
            _ if !name.trim().is_empty() => sanitize_name(name, 32, false),
            Some(id) => format!("tool{}", id),
            None => "tool1".to_string(),
        };
        let data = pose_data(pose);
        self.declare("SetTool", &tool,
                     format!("PERS tooldata {} := [TRUE,{},[5,[0,0,50],[1,0,0,0],0,0,0]];", tool, data),
                     format!("{}.tframe := {};", tool, data))?;
        self.tool = tool;
        Ok(())
    }

    fn set_speed(&mut self, mm_s: f64) -> Result<(), PostError> {
        self.tracker.current("SetSpeed")?;
        self.motion.speed_mm_s = mm_s;
        Ok(())
    }

    fn set_speed_joints(&mut self, deg_s: f64) -> Result<(), PostError> {
        self.tracker.current("SetSpeedJoints")?;
        self.motion.speed_joints_deg_s = deg_s;
        Ok(())
    }

    fn set_acceleration(&mut self, mm_s2: f64) -> Result<(), PostError> {
        self.tracker.current("SetAcceleration")?;
        self.motion.acceleration_mm_s2 = mm_s2;
        Ok(())
    }

    fn set_acceleration_joints(&mut self, deg_s2: f64) -> Result<(), PostError> {
        self.tracker.current("SetAccelerationJoints")?;
        self.motion.acceleration_joints_deg_s2 = deg_s2;
        let percent = self.settings.joint_acceleration_percent(deg_s2);
        self.emit("SetAccelerationJoints", format!("AccSet {},100;", num(percent, 0)))
    }

    fn set_zone_data(&mut self, mm: f64) -> Result<(), PostError> {
        self.tracker.current("SetZoneData")?;
        self.motion.zone_mm = mm;
        Ok(())
    }

    fn set_do(&mut self, io: &IoVar, value: &IoValue) -> Result<(), PostError> {
        let line = format!("SetDO {},{};", io_name(io, "DO_"), value.render("1", "0"));
        self.emit("SetDO", line)
    }

    fn wait_di(&mut self, io: &IoVar, value: &IoValue, timeout_ms: Option<f64>) -> Result<(), PostError> {
        let line = match timeout_ms {
            Some(ms) if ms > 0.0 =>
                format!("WaitDI {},{}\\MaxTime:={};", io_name(io, "DI_"), value.render("1", "0"), num(ms / 1000.0, 3)),
            _ => format!("WaitDI {},{};", io_name(io, "DI_"), value.render("1", "0")),
        };
        self.emit("WaitDI", line)
    }

    fn pause(&mut self, ms: Option<f64>) -> Result<(), PostError> {
        let line = match ms {
            Some(ms) if ms >= 0.0 => format!("WaitTime {};", num(ms / 1000.0, 3)),
            _ => "STOP;".to_string(),
        };
        self.emit("Pause", line)
    }

    fn run_code(&mut self, code: &str, is_call: bool) -> Result<(), PostError> {
        self.tracker.current("RunCode")?;
        if is_call {
            let call = if code.contains('(') { code.to_string() } else { sanitize_name(code, 32, false) };
            self.body.push(format!("{};", call.trim_end_matches(';')));
        } else {
            self.body.push_block(code);
        }
        Ok(())
    }

    fn run_message(&mut self, message: &str, is_comment: bool) -> Result<(), PostError> {
        let line = if is_comment {
            format!("! {}", message)
        } else {
            format!("TPWrite \"{}\";", message.replace('"', "'"))
        };
        self.emit("RunMessage", line)
    }

    fn program_files(&self, name: &str) -> Result<Vec<ProgramFile>, PostError> {
        self.tracker.check_finished()?;
        let module = sanitize_name(self.tracker.main().unwrap_or(name), 32, false);
        let mut out = ProgramBuffer::new("    ");
        out.push("%%%");
        out.push("  VERSION:1");
        out.push("  LANGUAGE:ENGLISH");
        out.push("%%%");
        out.push("");
        out.push(format!("MODULE MOD_{}", module));
        out.push("");
        out.indent();
        for (_, declaration) in &self.declarations {
            out.push(declaration);
        }
        if !self.declarations.is_empty() {
            out.push("");
        }
        for line in self.body.lines() {
            out.push(line);
        }
        out.dedent();
        out.push("ENDMODULE");
        Ok(vec![ProgramFile { file_name: format!("{}.{}", name, self.extension()), contents: out.text() }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::euler::xyzrpw_2_pose;
    use crate::post_traits::Config;

    fn post() -> AbbRapid {
        AbbRapid::new(&PostSettings::default())
    }

    #[test]
    fn test_module_layout() {
        let mut p = post();
        p.prog_start("Main").unwrap();
        p.set_tool(&Pose::transl(0.0, 0.0, 200.0), Some(1), "Gripper").unwrap();
        p.move_j(&Target::from_joints(vec![0.0, 0.0, 0.0, 0.0, 90.0, 0.0])).unwrap();
        p.set_speed(250.0).unwrap();
        p.set_zone_data(10.0).unwrap();
        let pose = xyzrpw_2_pose(&[1000.0, 0.0, 500.0, 180.0, 0.0, 180.0]);
        p.move_l(&Target::from_pose(pose).with_config(Config::new(false, false, true))).unwrap();
        p.pause(Some(1500.0)).unwrap();
        p.prog_finish("Main").unwrap();
        let files = p.program_files("Main").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "Main.mod");
        let text = &files[0].contents;
        assert!(text.contains("MODULE MOD_Main"));
        assert!(text.contains("PERS tooldata Gripper := [TRUE,[[0.000,0.000,200.000],[1.00000000,0.00000000,0.00000000,0.00000000]]"));
        assert!(text.contains("PROC Main()"));
        assert!(text.contains("MoveAbsJ [[0.0000,0.0000,0.0000,0.0000,90.0000,0.0000],[9E9,9E9,9E9,9E9,9E9,9E9]],[100.0,30.0,5000,1000],fine,Gripper\\WObj:=wobj0;"));
        assert!(text.contains("MoveL [[1000.000,0.000,500.000],"));
        assert!(text.contains("[0,0,0,1],[9E9,9E9,9E9,9E9,9E9,9E9]],[250.0,30.0,5000,1000],[FALSE,10.0,15.0,15.0,1.50,15.0,1.50],Gripper\\WObj:=wobj0;"));
        assert!(text.contains("WaitTime 1.500;"));
        assert!(text.contains("ENDPROC"));
        assert!(text.trim_end().ends_with("ENDMODULE"));
    }

    #[test]
    fn test_io_and_messages() {
        let mut p = post();
        p.prog_start("io").unwrap();
        p.set_do(&IoVar::Index(3), &IoValue::Bool(true)).unwrap();
        p.wait_di(&IoVar::Name("diReady".into()), &IoValue::Number(1.0), Some(2000.0)).unwrap();
        p.run_message("Part \"A\" done", false).unwrap();
        p.run_message("comment", true).unwrap();
        p.run_code("Subroutine", true).unwrap();
        p.pause(None).unwrap();
        p.prog_finish("io").unwrap();
        let text = &p.program_files("io").unwrap()[0].contents;
        assert!(text.contains("SetDO DO_3,1;"));
        assert!(text.contains("WaitDI diReady,1\\MaxTime:=2.000;"));
        assert!(text.contains("TPWrite \"Part 'A' done\";"));
        assert!(text.contains("! comment"));
        assert!(text.contains("Subroutine;"));
        assert!(text.contains("STOP;"));
    }

    #[test]
    fn test_every_frame_change_is_assigned() {
        let mut p = post();
        p.prog_start("main").unwrap();
        p.set_frame(&Pose::transl(100.0, 0.0, 0.0), None, "Table").unwrap();
        p.move_l(&Target::from_pose(Pose::transl(0.0, 0.0, 50.0))).unwrap();
        p.set_frame(&Pose::transl(200.0, 0.0, 0.0), None, "Table").unwrap();
        p.set_tool(&Pose::transl(0.0, 0.0, 120.0), Some(2), "").unwrap();
        p.prog_finish("main").unwrap();
        let text = &p.program_files("main").unwrap()[0].contents;
        assert_eq!(text.matches("PERS wobjdata Table").count(), 1);
        assert!(text.contains("PERS wobjdata Table := [FALSE,TRUE,\"\",[[100.000,0.000,0.000]"));
        assert!(text.contains("PERS tooldata tool2 := [TRUE,[[0.000,0.000,120.000]"));

        let first = text.find("Table.uframe := [[100.000,0.000,0.000]").unwrap();
        let moved = text.find("MoveL ").unwrap();
        let second = text.find("Table.uframe := [[200.000,0.000,0.000]").unwrap();
        let tool = text.find("tool2.tframe := [[0.000,0.000,120.000]").unwrap();
        assert!(text.find("PROC main()").unwrap() < first);
        assert!(first < moved && moved < second && second < tool);
    }

    #[test]
    fn test_invalid_calls() {
        let mut p = post();
        assert!(matches!(p.move_j(&Target::from_joints(vec![0.0; 6])), Err(PostError::NoProgram { .. })));
        p.prog_start("main").unwrap();
        assert!(matches!(p.move_l(&Target::from_joints(vec![0.0; 6])), Err(PostError::MissingPose { .. })));
        assert!(matches!(p.move_j(&Target::from_joints(vec![0.0; 4])), Err(PostError::InvalidJoints { found: 4 })));
        assert!(matches!(p.prog_finish("other"), Err(PostError::ProgramMismatch { .. })));
    }

    #[test]
    fn test_confdata_quadrants() {
        let t = Target::from_joints(vec![-10.0, 0.0, 0.0, 100.0, 0.0, 200.0, 500.0])
            .with_config(Config::new(true, false, true));
        assert_eq!(confdata(&t), "[-1,1,2,5]");
        assert_eq!(extax(&t), "[500.000,9E9,9E9,9E9,9E9,9E9]");
    }
}

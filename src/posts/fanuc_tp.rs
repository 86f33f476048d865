//! Fanuc R-30iB TP program, ASCII `.LS` form.
//!
//! Instructions go to the numbered `/MN` section, the positions they reference to `/POS`.
//! Programs longer than the page size are split: every page is a program of its own, named
//! `NAME_1`, `NAME_2`, ..., and `NAME` only calls them in order. Every page starts with the
//! active user frame and tool so it can also be run alone.

use tracing::{debug, warn};

use crate::euler::pose_2_fanuc;
use crate::pose::Pose;
use crate::post_error::PostError;
use crate::post_settings::PostSettings;
use crate::post_traits::{Config, IoValue, IoVar, MotionDefaults, ProgramFile, RobotPost, Target};
use crate::program::{Page, PagedProgram, ProgramBuffer, ProgramTracker};
use crate::utils::{num, pose_str, sanitize_name, split_text};

const NAME: &str = "Fanuc TP";

/// Lines per page if the settings do not say otherwise
pub const DEFAULT_MAX_LINES: usize = 9999;

const NAME_LENGTH: usize = 30;
const COMMENT_LENGTH: usize = 29;
const MESSAGE_LENGTH: usize = 24;
const CONTINUATION: &str = "    :  ";

pub struct FanucTp {
    settings: PostSettings,
    motion: MotionDefaults,
    tracker: ProgramTracker,
    /// Finished programs, followed by the open one
    programs: Vec<PagedProgram>,
    max_lines: usize,
    uframe: Option<u32>,
    utool: Option<u32>,
    /// Last label used on the current page
    label: usize,
}

impl FanucTp {
    pub fn new(settings: &PostSettings) -> Self {
        FanucTp {
            settings: settings.clone(),
            motion: MotionDefaults::from_settings(settings),
            tracker: ProgramTracker::default(),
            programs: Vec::new(),
            max_lines: settings.max_lines_or(DEFAULT_MAX_LINES),
            uframe: None,
            utool: None,
            label: 0,
        }
    }

    /// Open program, `NoProgram` before `prog_start`.
    fn program(&mut self, instruction: &'static str) -> Result<&mut PagedProgram, PostError> {
        self.tracker.current(instruction)?;
        self.programs.last_mut().ok_or(PostError::NoProgram { instruction })
    }

    /// Makes room for an instruction of `lines` lines, starting a new page if needed.
    fn prepare(&mut self, instruction: &'static str, lines: usize) -> Result<(), PostError> {
        let program = self.program(instruction)?;
        if program.is_full(lines) {
            program.new_page();
            self.label = 0;
            let header = self.frame_header();
            let page = self.page(instruction)?;
            for line in header {
                push_numbered(page, &line, true);
            }
        }
        Ok(())
    }

    fn page(&mut self, instruction: &'static str) -> Result<&mut Page, PostError> {
        Ok(self.program(instruction)?.page())
    }

    /// Frame and tool selection repeated at the top of every new page.
    fn frame_header(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(uf) = self.uframe {
            lines.push(format!("UFRAME_NUM={}", uf));
        }
        if let Some(ut) = self.utool {
            lines.push(format!("UTOOL_NUM={}", ut));
        }
        lines
    }

    /// Emits a complete instruction (continuation lines marked by a leading ':').
    fn emit(&mut self, instruction: &'static str, lines: &[String]) -> Result<(), PostError> {
        self.prepare(instruction, lines.len())?;
        self.write(instruction, lines)
    }

    /// Writes lines to the current page, room must have been made with `prepare`.
    fn write(&mut self, instruction: &'static str, lines: &[String]) -> Result<(), PostError> {
        let page = self.page(instruction)?;
        for (i, line) in lines.iter().enumerate() {
            debug!("{}: {}", NAME, line);
            let continued = lines.get(i + 1).is_some_and(|next| next.starts_with(':'));
            match line.strip_prefix(':') {
                Some(rest) => page.lines.push(format!("{}{} ;", CONTINUATION, rest)),
                None => push_numbered(page, line, !continued),
            }
        }
        Ok(())
    }

    /// `/POS` data of the target, without touching the program.
    fn position_data(&self, instruction: &'static str, target: &Target) -> Result<String, PostError> {
        target.check()?;
        let uf = self.uframe.unwrap_or(0);
        let ut = self.utool.unwrap_or(1);
        match (&target.pose, target.has_joints()) {
            (Some(pose), _) => Ok(cartesian_position(pose, target, uf, ut)),
            (None, true) => Ok(joint_position(target, uf, ut)),
            (None, false) => Err(PostError::MissingPose { post: NAME, instruction }),
        }
    }

    /// Adds a position to `/POS` of the current page and returns its `P[n]` number.
    fn define(&mut self, instruction: &'static str, data: String) -> Result<usize, PostError> {
        let page = self.page(instruction)?;
        let id = page.next_target() + 1;
        page.targets.push(format!("P[{}]{{\n   GP1:\n{}\n}};", id, data));
        Ok(id)
    }

    fn termination(&self) -> String {
        if self.motion.is_fine() {
            "FINE".into()
        } else {
            format!("CNT{}", num(self.motion.zone_mm.clamp(0.0, 100.0), 0))
        }
    }

    fn linear_speed(&self) -> String {
        format!("{}mm/sec", num(self.motion.speed_mm_s, 0))
    }

    fn render_page(&self, name: &str, page: &Page) -> String {
        let mut out = ProgramBuffer::new("");
        let line_count = page.lines.iter().filter(|l| !l.starts_with(CONTINUATION)).count();
        out.push(format!("/PROG  {}", name));
        out.push("/ATTR");
        out.push("OWNER\t\t= MNEDITOR;");
        out.push("COMMENT\t\t= \"\";");
        out.push("PROG_SIZE\t= 0;");
        out.push("FILE_NAME\t= ;");
        out.push("VERSION\t\t= 0;");
        out.push(format!("LINE_COUNT\t= {};", line_count));
        out.push("MEMORY_SIZE\t= 0;");
        out.push("PROTECT\t\t= READ_WRITE;");
        out.push("TCD:  STACK_SIZE\t= 0,");
        out.push("      TASK_PRIORITY\t= 50,");
        out.push("      TIME_SLICE\t= 0,");
        out.push("      BUSY_LAMP_OFF\t= 0,");
        out.push("      ABORT_REQUEST\t= 0,");
        out.push("      PAUSE_REQUEST\t= 0;");
        if page.targets.is_empty() {
            out.push("DEFAULT_GROUP\t= *,*,*,*,*;");
        } else {
            out.push("DEFAULT_GROUP\t= 1,*,*,*,*;");
        }
        out.push("CONTROL_CODE\t= 00000000 00000000;");
        out.push("/MN");
        for line in &page.lines {
            out.push(line);
        }
        out.push("/POS");
        for target in &page.targets {
            out.push(target);
        }
        out.push("/END");
        out.text()
    }

    fn program_files_of(&self, program: &PagedProgram, file_name: &str) -> Vec<ProgramFile> {
        let mut files = Vec::new();
        if program.is_split() {
            let mut caller = Page::default();
            for page_name in program.page_names() {
                push_numbered(&mut caller, &format!("CALL {}", page_name), true);
            }
            files.push(ProgramFile { file_name: format!("{}.LS", file_name), contents: self.render_page(file_name, &caller) });
            for (i, page) in program.pages().iter().enumerate() {
                let page_name = program.page_name(i);
                files.push(ProgramFile { file_name: format!("{}.LS", page_name), contents: self.render_page(&page_name, page) });
            }
        } else if let Some(page) = program.pages().first() {
            files.push(ProgramFile { file_name: format!("{}.LS", file_name), contents: self.render_page(file_name, page) });
        }
        files
    }
}

/// Appends a numbered `/MN` line, without the closing `;` if a continuation line follows.
fn push_numbered(page: &mut Page, line: &str, terminated: bool) {
    let number = page.lines.iter().filter(|l| !l.starts_with(CONTINUATION)).count() + 1;
    if terminated {
        page.lines.push(format!("{:4}:  {} ;", number, line));
    } else {
        page.lines.push(format!("{:4}:  {}", number, line));
    }
}

/// `!` comment lines short enough for the TP editor
fn comment_lines(text: &str) -> Vec<String> {
    split_text(text, COMMENT_LENGTH).into_iter().map(|c| format!("!{}", c)).collect()
}

/// Turn number of a joint angle, as used by the CONFIG string
fn turn(deg: f64) -> i32 {
    ((deg + 180.0) / 360.0).floor() as i32
}

/// `'N U T, 0, 0, 0'`: flip, elbow up/down, front/back and the turn numbers of J1, J4, J6.
fn config_string(config: Option<Config>, joints: &[f64]) -> String {
    let c = config.unwrap_or_default();
    let (t1, t4, t6) = if joints.len() >= 6 { (turn(joints[0]), turn(joints[3]), turn(joints[5])) } else { (0, 0, 0) };
    format!("'{} {} {}, {}, {}, {}'",
            if c.flip { "F" } else { "N" },
            if c.lower_arm { "D" } else { "U" },
            if c.rear { "B" } else { "T" },
            t1, t4, t6)
}

fn external_lines(target: &Target) -> String {
    target.external_axes().iter().enumerate()
        .map(|(i, e)| format!(",\n\tE{}={:>10}  mm", i + 1, num(*e, 3)))
        .collect()
}

fn cartesian_position(pose: &Pose, target: &Target, uf: u32, ut: u32) -> String {
    let v = pose_2_fanuc(pose);
    format!("\tUF : {}, UT : {},\t\tCONFIG : {},\n\
             \tX ={:>10}  mm,\tY ={:>10}  mm,\tZ ={:>10}  mm,\n\
             \tW ={:>10} deg,\tP ={:>10} deg,\tR ={:>10} deg{}",
            uf, ut, config_string(target.config, &target.joints),
            num(v[0], 3), num(v[1], 3), num(v[2], 3),
            num(v[3], 3), num(v[4], 3), num(v[5], 3),
            external_lines(target))
}

fn joint_position(target: &Target, uf: u32, ut: u32) -> String {
    let j = &target.joints;
    format!("\tUF : {}, UT : {},\n\
             \tJ1={:>10} deg,\tJ2={:>10} deg,\tJ3={:>10} deg,\n\
             \tJ4={:>10} deg,\tJ5={:>10} deg,\tJ6={:>10} deg{}",
            uf, ut,
            num(j[0], 3), num(j[1], 3), num(j[2], 3),
            num(j[3], 3), num(j[4], 3), num(j[5], 3),
            external_lines(target))
}

fn io_name(io: &IoVar, array: &str) -> String {
    match io {
        IoVar::Index(n) => format!("{}[{}]", array, n),
        IoVar::Name(name) => name.clone(),
    }
}

impl RobotPost for FanucTp {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "LS"
    }

    fn prog_start(&mut self, name: &str) -> Result<(), PostError> {
        let name = sanitize_name(name, NAME_LENGTH, true);
        self.tracker.start(&name)?;
        self.programs.push(PagedProgram::new(&name, self.max_lines));
        self.label = 0;
        Ok(())
    }

    fn prog_finish(&mut self, name: &str) -> Result<(), PostError> {
        self.tracker.finish(&sanitize_name(name, NAME_LENGTH, true))?;
        if let Some(program) = self.programs.last() {
            if program.is_split() {
                debug!("{}: {} split into {} pages", NAME, program.name, program.pages().len());
            }
            self.tracker.register_split(program);
        }
        Ok(())
    }

    fn move_j(&mut self, target: &Target) -> Result<(), PostError> {
        let joint_target = if target.has_joints() { Target { pose: None, ..target.clone() } } else { target.clone() };
        let data = self.position_data("MoveJ", &joint_target)?;
        self.prepare("MoveJ", 1)?;
        let id = self.define("MoveJ", data)?;
        let percent = self.settings.joint_speed_percent(self.motion.speed_joints_deg_s);
        let line = format!("J P[{}] {}% {}", id, num(percent, 0), self.termination());
        self.write("MoveJ", &[line])
    }

    fn move_l(&mut self, target: &Target) -> Result<(), PostError> {
        let data = self.position_data("MoveL", target)?;
        self.prepare("MoveL", 1)?;
        let id = self.define("MoveL", data)?;
        let line = format!("L P[{}] {} {}", id, self.linear_speed(), self.termination());
        self.write("MoveL", &[line])
    }

    fn move_c(&mut self, via: &Target, end: &Target) -> Result<(), PostError> {
        let via_data = self.position_data("MoveC", via)?;
        let end_data = self.position_data("MoveC", end)?;
        self.prepare("MoveC", 2)?;
        let a = self.define("MoveC", via_data)?;
        let b = self.define("MoveC", end_data)?;
        let lines = [format!("C P[{}]", a), format!(":P[{}] {} {}", b, self.linear_speed(), self.termination())];
        self.write("MoveC", &lines)
    }

    fn set_frame(&mut self, pose: &Pose, id: Option<u32>, name: &str) -> Result<(), PostError> {
        self.tracker.current("SetFrame")?;
        let uf = id.unwrap_or_else(|| {
            warn!("{}: frame {} has no number, using UFRAME 1", NAME, name);
            1
        });
        debug!("{}: UF{} {} = {}", NAME, uf, name, pose_str(pose));
        let mut lines = comment_lines(&format!("UF{} {}", uf, name));
        lines.push(format!("UFRAME_NUM={}", uf));
        // A page break here repeats the previous frame, the new one follows
        self.prepare("SetFrame", lines.len())?;
        self.uframe = Some(uf);
        self.write("SetFrame", &lines)
    }

    fn set_tool(&mut self, pose: &Pose, id: Option<u32>, name: &str) -> Result<(), PostError> {
        self.tracker.current("SetTool")?;
        let ut = id.unwrap_or_else(|| {
            warn!("{}: tool {} has no number, using UTOOL 1", NAME, name);
            1
        });
        debug!("{}: UT{} {} = {}", NAME, ut, name, pose_str(pose));
        let mut lines = comment_lines(&format!("UT{} {}", ut, name));
        lines.push(format!("UTOOL_NUM={}", ut));
        self.prepare("SetTool", lines.len())?;
        self.utool = Some(ut);
        self.write("SetTool", &lines)
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
        Ok(())
    }

    fn set_zone_data(&mut self, mm: f64) -> Result<(), PostError> {
        self.tracker.current("SetZoneData")?;
        self.motion.zone_mm = mm;
        Ok(())
    }

    fn set_do(&mut self, io: &IoVar, value: &IoValue) -> Result<(), PostError> {
        let line = format!("{}={}", io_name(io, "DO"), value.render("ON", "OFF"));
        self.emit("SetDO", &[line])
    }

    fn wait_di(&mut self, io: &IoVar, value: &IoValue, timeout_ms: Option<f64>) -> Result<(), PostError> {
        let condition = format!("{}={}", io_name(io, "DI"), value.render("ON", "OFF"));
        match timeout_ms {
            Some(ms) if ms > 0.0 => {
                self.prepare("WaitDI", 3)?;
                self.label += 1;
                let label = self.label;
                self.write("WaitDI", &[
                    format!("$WAITTMOUT={}", num(ms, 0)),
                    format!("WAIT {} TIMEOUT,LBL[{}]", condition, label),
                    format!("LBL[{}]", label),
                ])
            }
            _ => self.emit("WaitDI", &[format!("WAIT {}", condition)]),
        }
    }

    fn pause(&mut self, ms: Option<f64>) -> Result<(), PostError> {
        let line = match ms {
            Some(ms) if ms >= 0.0 => format!("WAIT {}(sec)", num(ms / 1000.0, 2)),
            _ => "PAUSE".to_string(),
        };
        self.emit("Pause", &[line])
    }

    fn run_code(&mut self, code: &str, is_call: bool) -> Result<(), PostError> {
        if is_call {
            let line = format!("CALL {}", sanitize_name(code, NAME_LENGTH, true));
            self.emit("RunCode", &[line])
        } else {
            let lines: Vec<String> = code.lines().map(|l| l.trim_end_matches(';').trim().to_string()).collect();
            self.emit("RunCode", &lines)
        }
    }

    fn run_message(&mut self, message: &str, is_comment: bool) -> Result<(), PostError> {
        let lines: Vec<String> = if is_comment {
            comment_lines(message)
        } else {
            split_text(message, MESSAGE_LENGTH).into_iter().map(|c| format!("MESSAGE[{}]", c)).collect()
        };
        self.emit("RunMessage", &lines)
    }

    fn program_files(&self, name: &str) -> Result<Vec<ProgramFile>, PostError> {
        self.tracker.check_finished()?;
        let mut files = Vec::new();
        for (i, program) in self.programs.iter().enumerate() {
            // The main program is saved under the requested name
            let file_name = if i == 0 { sanitize_name(name, NAME_LENGTH, true) } else { program.name.clone() };
            files.extend(self.program_files_of(program, &file_name));
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::euler::xyzrpw_2_pose;

    fn post(max_lines: Option<usize>) -> FanucTp {
        FanucTp::new(&PostSettings { max_lines, ..Default::default() })
    }

    #[test]
    fn test_sections() {
        let mut p = post(None);
        p.prog_start("Main").unwrap();
        p.set_frame(&Pose::transl(0.0, 0.0, 0.0), Some(2), "Table").unwrap();
        p.move_j(&Target::from_joints(vec![0.0, 0.0, 0.0, 0.0, -90.0, 0.0])).unwrap();
        p.set_zone_data(50.0).unwrap();
        p.set_speed(200.0).unwrap();
        let pose = xyzrpw_2_pose(&[1000.0, 0.0, 500.0, 180.0, 0.0, 0.0]);
        p.move_l(&Target::from_pose(pose).with_config(Config::new(false, false, true))).unwrap();
        p.set_do(&IoVar::Index(7), &IoValue::Bool(true)).unwrap();
        p.pause(Some(250.0)).unwrap();
        p.prog_finish("Main").unwrap();

        let files = p.program_files("Main").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "MAIN.LS");
        let text = &files[0].contents;
        assert!(text.starts_with("/PROG  MAIN\n/ATTR"));
        assert!(text.contains("   1:  !UF2 Table ;"));
        assert!(text.contains("   2:  UFRAME_NUM=2 ;"));
        assert!(text.contains("   3:  J P[1] 17% FINE ;"));
        assert!(text.contains("   4:  L P[2] 200mm/sec CNT50 ;"));
        assert!(text.contains("   5:  DO[7]=ON ;"));
        assert!(text.contains("   6:  WAIT 0.25(sec) ;"));
        assert!(text.contains("LINE_COUNT\t= 6;"));
        assert!(text.contains("P[1]{\n   GP1:\n\tUF : 2, UT : 1,\n\tJ1=     0.000 deg,"));
        assert!(text.contains("CONFIG : 'F U T, 0, 0, 0'"));
        assert!(text.contains("\tX =  1000.000  mm,\tY =     0.000  mm,\tZ =   500.000  mm,"));
        assert!(text.trim_end().ends_with("/END"));
    }

    #[test]
    fn test_circular_and_wait_with_timeout() {
        let mut p = post(None);
        p.prog_start("circle").unwrap();
        p.move_c(&Target::from_pose(Pose::transl(100.0, 100.0, 0.0)),
                 &Target::from_pose(Pose::transl(200.0, 0.0, 0.0))).unwrap();
        p.wait_di(&IoVar::Index(1), &IoValue::Bool(true), Some(3000.0)).unwrap();
        p.prog_finish("circle").unwrap();
        let text = &p.program_files("circle").unwrap()[0].contents;
        assert!(text.contains("   1:  C P[1]\n    :  P[2] 100mm/sec FINE ;"));
        assert!(text.contains("   2:  $WAITTMOUT=3000 ;"));
        assert!(text.contains("   3:  WAIT DI[1]=ON TIMEOUT,LBL[1] ;"));
        assert!(text.contains("   4:  LBL[1] ;"));
        assert!(text.contains("LINE_COUNT\t= 4;"));
    }

    #[test]
    fn test_comment_is_split() {
        let mut p = post(None);
        p.prog_start("main").unwrap();
        p.run_message(&"x".repeat(40), true).unwrap();
        p.prog_finish("main").unwrap();
        let text = &p.program_files("main").unwrap()[0].contents;
        assert!(text.contains(&format!("   1:  !{} ;", "x".repeat(29))));
        assert!(text.contains(&format!("   2:  !{} ;", "x".repeat(11))));
    }

    #[test]
    fn test_missing_program_and_target() {
        let mut p = post(None);
        assert!(matches!(p.set_do(&IoVar::Index(1), &IoValue::Bool(true)), Err(PostError::NoProgram { .. })));
        p.prog_start("main").unwrap();
        assert!(matches!(p.move_l(&Target::default()), Err(PostError::MissingPose { .. })));
    }

    #[test]
    fn test_frame_change_at_page_break_is_selected_once() {
        let mut p = post(Some(3));
        p.prog_start("Main").unwrap();
        p.set_frame(&Pose::identity(), Some(1), "A").unwrap();
        p.move_l(&Target::from_pose(Pose::transl(0.0, 0.0, 100.0))).unwrap();
        p.set_frame(&Pose::transl(0.0, 500.0, 0.0), Some(2), "B").unwrap();
        p.prog_finish("Main").unwrap();

        let files = p.program_files("Main").unwrap();
        let second = &files.iter().find(|f| f.file_name == "MAIN_2.LS").unwrap().contents;
        assert!(second.contains("   1:  UFRAME_NUM=1 ;\n   2:  !UF2 B ;\n   3:  UFRAME_NUM=2 ;\n/POS"));
        assert_eq!(second.matches("UFRAME_NUM=2").count(), 1);
    }

    #[test]
    fn test_rejected_moves_leave_the_program_unchanged() {
        let mut p = post(Some(1));
        p.prog_start("Main").unwrap();
        p.move_l(&Target::from_pose(Pose::transl(0.0, 0.0, 100.0))).unwrap();
        assert!(matches!(p.move_l(&Target::default()), Err(PostError::MissingPose { .. })));
        let end = Target::from_pose(Pose::transl(100.0, 0.0, 100.0));
        assert!(matches!(p.move_c(&Target::default(), &end), Err(PostError::MissingPose { .. })));
        p.prog_finish("Main").unwrap();

        let files = p.program_files("Main").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].contents.contains("P[1]{"));
        assert!(!files[0].contents.contains("P[2]{"));
    }
}

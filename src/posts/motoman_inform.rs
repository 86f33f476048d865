//! Yaskawa Motoman INFORM job (`.JBI`).
//!
//! Positions are job variables `C00000`, `C00001`, ... in the `//POS` section: Cartesian
//! targets as RECTAN values in the active user frame, joint targets as encoder pulses (which
//! needs `pulses_per_degree` in the settings). Jobs longer than the page size are split like
//! Fanuc programs, into `NAME_1`, `NAME_2`, ... called in order from `NAME`.

use tracing::{debug, warn};

use crate::euler::pose_2_motoman;
use crate::pose::Pose;
use crate::post_error::PostError;
use crate::post_settings::PostSettings;
use crate::post_traits::{IoValue, IoVar, MotionDefaults, ProgramFile, RobotPost, Target};
use crate::program::{Page, PagedProgram, ProgramBuffer, ProgramTracker};
use crate::utils::{num, num_list, pose_str, sanitize_name, split_text};

const NAME: &str = "Motoman INFORM";

/// Lines per page if the settings do not say otherwise
pub const DEFAULT_MAX_LINES: usize = 2000;

const NAME_LENGTH: usize = 28;
const COMMENT_LENGTH: usize = 32;

/// Zone radius corresponding to one position level step
const MM_PER_PL: f64 = 12.5;

pub struct MotomanInform {
    settings: PostSettings,
    motion: MotionDefaults,
    tracker: ProgramTracker,
    programs: Vec<PagedProgram>,
    max_lines: usize,
    user: Option<u32>,
    tool: u32,
    /// Last target with the page and variable it was defined in, start point of MOVC
    last: Option<(Target, usize, usize)>,
}

impl MotomanInform {
    pub fn new(settings: &PostSettings) -> Self {
        MotomanInform {
            settings: settings.clone(),
            motion: MotionDefaults::from_settings(settings),
            tracker: ProgramTracker::default(),
            programs: Vec::new(),
            max_lines: settings.max_lines_or(DEFAULT_MAX_LINES),
            user: None,
            tool: 0,
            last: None,
        }
    }

    fn program(&mut self, instruction: &'static str) -> Result<&mut PagedProgram, PostError> {
        self.tracker.current(instruction)?;
        self.programs.last_mut().ok_or(PostError::NoProgram { instruction })
    }

    fn page(&mut self, instruction: &'static str) -> Result<&mut Page, PostError> {
        Ok(self.program(instruction)?.page())
    }

    /// Number of the current page, counting from 1.
    fn page_number(&self) -> usize {
        self.programs.last().map_or(0, |p| p.pages().len())
    }

    fn prepare(&mut self, instruction: &'static str, lines: usize) -> Result<(), PostError> {
        let program = self.program(instruction)?;
        if program.is_full(lines) {
            program.new_page();
        }
        Ok(())
    }

    fn emit(&mut self, instruction: &'static str, lines: &[String]) -> Result<(), PostError> {
        self.prepare(instruction, lines.len())?;
        self.write(instruction, lines)
    }

    fn write(&mut self, instruction: &'static str, lines: &[String]) -> Result<(), PostError> {
        let page = self.page(instruction)?;
        for line in lines {
            debug!("{}: {}", NAME, line);
            page.lines.push(line.clone());
        }
        Ok(())
    }

    /// Header lines and values of the position variable for `target`, without touching the job.
    /// `joints_first` prefers a pulse position when both representations are available.
    fn position_data(&self, instruction: &'static str, target: &Target, joints_first: bool)
                     -> Result<(Vec<String>, String), PostError> {
        target.check()?;
        let pulses = match &self.settings.pulses_per_degree {
            Some(ppd) if target.has_joints() && ppd.len() >= target.joints.len() => Some(ppd),
            _ => None,
        };
        let position = match (&target.pose, pulses) {
            (Some(_), Some(ppd)) if joints_first => Position::Pulse(ppd),
            (Some(pose), _) => Position::Rectan(pose),
            (None, Some(ppd)) => Position::Pulse(ppd),
            (None, None) if target.has_joints() => {
                return Err(PostError::Unsupported {
                    post: NAME,
                    instruction: format!("{} to joint values without pulses_per_degree", instruction),
                });
            }
            (None, None) => return Err(PostError::MissingPose { post: NAME, instruction }),
        };

        let mut lines = vec![format!("///TOOL {}", self.tool)];
        let values = match position {
            Position::Rectan(pose) => {
                if !target.external_axes().is_empty() {
                    warn!("{}: external axes of Cartesian targets are not written", NAME);
                }
                match self.user {
                    Some(user) => {
                        lines.push(format!("///USER {}", user));
                        lines.push("///POSTYPE USER".into());
                    }
                    None => lines.push("///POSTYPE BASE".into()),
                }
                lines.push("///RECTAN".into());
                lines.push(rconf(target));
                num_list(&pose_2_motoman(pose), 3, ",")
            }
            Position::Pulse(ppd) => {
                lines.push("///POSTYPE PULSE".into());
                lines.push("///PULSE".into());
                target.joints.iter().zip(ppd)
                    .map(|(deg, ppd)| format!("{}", (deg * ppd).round() as i64))
                    .collect::<Vec<_>>().join(",")
            }
        };
        Ok((lines, values))
    }

    /// Adds a position variable to the current page and returns its number.
    fn define(&mut self, instruction: &'static str, target: &Target, data: (Vec<String>, String))
              -> Result<usize, PostError> {
        let (mut lines, values) = data;
        let page_number = self.page_number();
        let page = self.page(instruction)?;
        let id = page.next_target();
        lines.push(format!("C{:05}={}", id, values));
        page.targets.extend(lines);
        self.last = Some((target.clone(), page_number, id));
        Ok(id)
    }

    fn position_level(&self) -> String {
        if self.motion.is_fine() {
            String::new()
        } else {
            let pl = (self.motion.zone_mm / MM_PER_PL).ceil().clamp(1.0, 8.0);
            format!(" PL={}", num(pl, 0))
        }
    }

    fn joint_speed(&self) -> String {
        format!("VJ={}", num(self.settings.joint_speed_percent(self.motion.speed_joints_deg_s), 2))
    }

    fn linear_speed(&self) -> String {
        format!("V={}", num(self.motion.speed_mm_s, 1))
    }

    fn render_job(&self, name: &str, page: &Page) -> String {
        let mut out = ProgramBuffer::new("");
        out.push("/JOB");
        out.push(format!("//NAME {}", name));
        out.push("//POS");
        out.push(format!("///NPOS {},0,0,0,0,0", page.target_count));
        for line in &page.targets {
            out.push(line);
        }
        out.push("//INST");
        out.push("///ATTR SC,RW");
        if page.target_count > 0 {
            out.push("///GROUP1 RB1");
        }
        out.push("NOP");
        for line in &page.lines {
            out.push(line);
        }
        out.push("END");
        out.text()
    }

    fn program_files_of(&self, program: &PagedProgram, file_name: &str) -> Vec<ProgramFile> {
        let mut files = Vec::new();
        if program.is_split() {
            let caller = Page {
                lines: program.page_names().iter().map(|p| format!("CALL JOB:{}", p)).collect(),
                ..Page::default()
            };
            files.push(ProgramFile { file_name: format!("{}.JBI", file_name), contents: self.render_job(file_name, &caller) });
            for (i, page) in program.pages().iter().enumerate() {
                let page_name = program.page_name(i);
                files.push(ProgramFile { file_name: format!("{}.JBI", page_name), contents: self.render_job(&page_name, page) });
            }
        } else if let Some(page) = program.pages().first() {
            files.push(ProgramFile { file_name: format!("{}.JBI", file_name), contents: self.render_job(file_name, page) });
        }
        files
    }
}

/// How a position variable is stored
enum Position<'a> {
    Rectan(&'a Pose),
    Pulse(&'a Vec<f64>),
}

/// `///RCONF flip,lower arm,rear,0,0,0,0,0`
fn rconf(target: &Target) -> String {
    let c = target.config.unwrap_or_default();
    format!("///RCONF {},{},{},0,0,0,0,0", c.flip as i32, c.lower_arm as i32, c.rear as i32)
}

fn io_name(io: &IoVar, array: &str) -> String {
    match io {
        IoVar::Index(n) => format!("{}#({})", array, n),
        IoVar::Name(name) => name.clone(),
    }
}

impl RobotPost for MotomanInform {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "JBI"
    }

    fn prog_start(&mut self, name: &str) -> Result<(), PostError> {
        let name = sanitize_name(name, NAME_LENGTH, true);
        self.tracker.start(&name)?;
        self.programs.push(PagedProgram::new(&name, self.max_lines));
        self.last = None;
        Ok(())
    }

    fn prog_finish(&mut self, name: &str) -> Result<(), PostError> {
        self.tracker.finish(&sanitize_name(name, NAME_LENGTH, true))?;
        if let Some(program) = self.programs.last() {
            self.tracker.register_split(program);
        }
        Ok(())
    }

    fn move_j(&mut self, target: &Target) -> Result<(), PostError> {
        let data = self.position_data("MoveJ", target, true)?;
        self.prepare("MoveJ", 1)?;
        let id = self.define("MoveJ", target, data)?;
        let line = format!("MOVJ C{:05} {}{}", id, self.joint_speed(), self.position_level());
        self.write("MoveJ", &[line])
    }

    fn move_l(&mut self, target: &Target) -> Result<(), PostError> {
        let data = self.position_data("MoveL", target, false)?;
        self.prepare("MoveL", 1)?;
        let id = self.define("MoveL", target, data)?;
        let line = format!("MOVL C{:05} {}{}", id, self.linear_speed(), self.position_level());
        self.write("MoveL", &[line])
    }

    fn move_c(&mut self, via: &Target, end: &Target) -> Result<(), PostError> {
        self.tracker.current("MoveC")?;
        let (start, page, id) = self.last.clone().ok_or_else(|| PostError::Unsupported {
            post: NAME,
            instruction: "MOVC without a preceding target".into(),
        })?;
        let start_data = self.position_data("MoveC", &start, false)?;
        let via_data = self.position_data("MoveC", via, false)?;
        let end_data = self.position_data("MoveC", end, false)?;
        self.prepare("MoveC", 3)?;
        // Variables are numbered per page, a start point on a previous page is defined again
        let start_id = if page == self.page_number() { id } else { self.define("MoveC", &start, start_data)? };
        let via_id = self.define("MoveC", via, via_data)?;
        let end_id = self.define("MoveC", end, end_data)?;
        let speed = self.linear_speed();
        let pl = self.position_level();
        let lines = [
            format!("MOVC C{:05} {}", start_id, speed),
            format!("MOVC C{:05} {}", via_id, speed),
            format!("MOVC C{:05} {}{}", end_id, speed, pl),
        ];
        self.write("MoveC", &lines)
    }

    fn set_frame(&mut self, pose: &Pose, id: Option<u32>, name: &str) -> Result<(), PostError> {
        self.tracker.current("SetFrame")?;
        let user = id.unwrap_or_else(|| {
            warn!("{}: frame {} has no number, using user frame 1", NAME, name);
            1
        });
        self.user = Some(user);
        debug!("{}: user frame {} {} = {}", NAME, user, name, pose_str(pose));
        self.run_message(&format!("USER FRAME {} {}", user, name), true)
    }

    fn set_tool(&mut self, pose: &Pose, id: Option<u32>, name: &str) -> Result<(), PostError> {
        self.tracker.current("SetTool")?;
        let tool = id.unwrap_or_else(|| {
            warn!("{}: tool {} has no number, using tool 0", NAME, name);
            0
        });
        self.tool = tool;
        debug!("{}: tool {} {} = {}", NAME, tool, name, pose_str(pose));
        self.run_message(&format!("TOOL {} {}", tool, name), true)
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
        let line = format!("DOUT {} {}", io_name(io, "OT"), value.render("ON", "OFF"));
        self.emit("SetDO", &[line])
    }

    fn wait_di(&mut self, io: &IoVar, value: &IoValue, timeout_ms: Option<f64>) -> Result<(), PostError> {
        let mut line = format!("WAIT {}={}", io_name(io, "IN"), value.render("ON", "OFF"));
        if let Some(ms) = timeout_ms.filter(|ms| *ms > 0.0) {
            line.push_str(&format!(" T={}", num(ms / 1000.0, 2)));
        }
        self.emit("WaitDI", &[line])
    }

    fn pause(&mut self, ms: Option<f64>) -> Result<(), PostError> {
        let line = match ms {
            Some(ms) if ms >= 0.0 => format!("TIMER T={}", num(ms / 1000.0, 2)),
            _ => "PAUSE".to_string(),
        };
        self.emit("Pause", &[line])
    }

    fn run_code(&mut self, code: &str, is_call: bool) -> Result<(), PostError> {
        if is_call {
            let line = format!("CALL JOB:{}", sanitize_name(code, NAME_LENGTH, true));
            self.emit("RunCode", &[line])
        } else {
            let lines: Vec<String> = code.lines().map(str::to_string).collect();
            self.emit("RunCode", &lines)
        }
    }

    fn run_message(&mut self, message: &str, is_comment: bool) -> Result<(), PostError> {
        let lines: Vec<String> = if is_comment {
            split_text(message, COMMENT_LENGTH).into_iter().map(|c| format!("'{}", c)).collect()
        } else {
            split_text(message, COMMENT_LENGTH).into_iter().map(|c| format!("MSG \"{}\"", c.replace('"', "'"))).collect()
        };
        self.emit("RunMessage", &lines)
    }

    fn program_files(&self, name: &str) -> Result<Vec<ProgramFile>, PostError> {
        self.tracker.check_finished()?;
        let mut files = Vec::new();
        for (i, program) in self.programs.iter().enumerate() {
            let file_name = if i == 0 { sanitize_name(name, NAME_LENGTH, true) } else { program.name.clone() };
            files.extend(self.program_files_of(program, &file_name));
        }
        Ok(files)
    }
}

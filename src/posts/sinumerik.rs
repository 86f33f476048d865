//! Siemens Sinumerik 840D G-code.
//!
//! The first program is the main program (`.mpf`, ends with `M30`), later ones are
//! subprograms (`.spf`, ending with `M17`). Blocks are numbered per file. The robot is driven
//! as a 5-axis machine with orientation transformation: positions are X/Y/Z, the tool
//! direction is the A3/B3/C3 vector. Joint targets cannot be expressed.

use tracing::{debug, warn};

use crate::euler::pose_2_xyzrpw;
use crate::pose::Pose;
use crate::post_error::PostError;
use crate::post_settings::PostSettings;
use crate::post_traits::{IoValue, IoVar, MotionDefaults, ProgramFile, RobotPost, Target};
use crate::program::{ProgramBuffer, ProgramTracker};
use crate::utils::{num, sanitize_name};

const NAME: &str = "Sinumerik";

const BLOCK_STEP: usize = 10;

struct NcProgram {
    name: String,
    main: bool,
    blocks: ProgramBuffer,
    next_block: usize,
}

impl NcProgram {
    fn new(name: &str, main: bool) -> Self {
        NcProgram { name: name.to_string(), main, blocks: ProgramBuffer::new(""), next_block: BLOCK_STEP }
    }

    fn block(&mut self, text: &str) {
        let line = format!("N{} {}", self.next_block, text);
        debug!("{}: {}", NAME, line);
        self.blocks.push(line);
        self.next_block += BLOCK_STEP;
    }

    fn comment(&mut self, text: &str) {
        self.blocks.push(format!("; {}", text));
    }
}

pub struct Sinumerik {
    motion: MotionDefaults,
    tracker: ProgramTracker,
    programs: Vec<NcProgram>,
}

impl Sinumerik {
    pub fn new(settings: &PostSettings) -> Self {
        Sinumerik {
            motion: MotionDefaults::from_settings(settings),
            tracker: ProgramTracker::default(),
            programs: Vec::new(),
        }
    }

    fn program(&mut self, instruction: &'static str) -> Result<&mut NcProgram, PostError> {
        self.tracker.current(instruction)?;
        self.programs.last_mut().ok_or(PostError::NoProgram { instruction })
    }

    fn block(&mut self, instruction: &'static str, text: &str) -> Result<(), PostError> {
        self.program(instruction)?.block(text);
        Ok(())
    }

    /// Feed in mm/min
    fn feed(&self) -> String {
        format!("F{}", num(self.motion.speed_mm_s * 60.0, 1))
    }

    fn pose_of<'a>(target: &'a Target, instruction: &'static str) -> Result<&'a Pose, PostError> {
        target.check()?;
        match &target.pose {
            Some(pose) => Ok(pose),
            None if target.has_joints() => Err(PostError::Unsupported {
                post: NAME,
                instruction: format!("{} to joint values", instruction),
            }),
            None => Err(PostError::MissingPose { post: NAME, instruction }),
        }
    }
}

/// `X.. Y.. Z.. A3=.. B3=.. C3=..`: position and tool direction
fn position(pose: &Pose) -> String {
    let [x, y, z] = pose.pos();
    let [a3, b3, c3] = pose.vz();
    format!("X{} Y{} Z{} A3={} B3={} C3={}",
            num(x, 3), num(y, 3), num(z, 3), num(a3, 5), num(b3, 5), num(c3, 5))
}

fn io_name(io: &IoVar, array: &str) -> String {
    match io {
        IoVar::Index(n) => format!("{}[{}]", array, n),
        IoVar::Name(name) => name.clone(),
    }
}

impl RobotPost for Sinumerik {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "mpf"
    }

    fn prog_start(&mut self, name: &str) -> Result<(), PostError> {
        let name = sanitize_name(name, 24, true);
        self.tracker.start(&name)?;
        let mut program = NcProgram::new(&name, self.tracker.in_main());
        program.comment(&format!("Program: {}", name));
        if program.main {
            program.block("G90 G94 G71 G17");
            program.block("TRAORI");
            if self.motion.is_fine() {
                program.block("G60");
            } else {
                program.block(&format!("G64 ADIS={}", num(self.motion.zone_mm, 3)));
            }
        }
        self.programs.push(program);
        Ok(())
    }

    fn prog_finish(&mut self, name: &str) -> Result<(), PostError> {
        self.tracker.finish(&sanitize_name(name, 24, true))?;
        if let Some(program) = self.programs.last_mut() {
            let end = if program.main { "M30" } else { "M17" };
            program.block(end);
        }
        Ok(())
    }

    fn move_j(&mut self, target: &Target) -> Result<(), PostError> {
        let pose = Self::pose_of(target, "MoveJ")?;
        self.block("MoveJ", &format!("G0 {}", position(pose)))
    }

    fn move_l(&mut self, target: &Target) -> Result<(), PostError> {
        let pose = Self::pose_of(target, "MoveL")?;
        let text = format!("G1 {} {}", position(pose), self.feed());
        self.block("MoveL", &text)
    }

    fn move_c(&mut self, via: &Target, end: &Target) -> Result<(), PostError> {
        let p1 = Self::pose_of(via, "MoveC")?;
        let p2 = Self::pose_of(end, "MoveC")?;
        let [i, j, k] = p1.pos();
        let text = format!("CIP {} I1={} J1={} K1={} {}", position(p2), num(i, 3), num(j, 3), num(k, 3), self.feed());
        self.block("MoveC", &text)
    }

    fn set_frame(&mut self, pose: &Pose, _id: Option<u32>, name: &str) -> Result<(), PostError> {
        let [x, y, z, r, p, w] = pose_2_xyzrpw(pose);
        let program = self.program("SetFrame")?;
        if !name.is_empty() {
            program.comment(&format!("Frame {}", name));
        }
        program.block(&format!("TRANS X{} Y{} Z{}", num(x, 3), num(y, 3), num(z, 3)));
        program.block(&format!("AROT Z{}", num(w, 4)));
        program.block(&format!("AROT Y{}", num(p, 4)));
        program.block(&format!("AROT X{}", num(r, 4)));
        Ok(())
    }

    fn set_tool(&mut self, pose: &Pose, id: Option<u32>, name: &str) -> Result<(), PostError> {
        let program = self.program("SetTool")?;
        program.comment(&format!("Tool {}: {}", name, position(pose)));
        match id {
            Some(id) => program.block(&format!("T{} D1", id)),
            None => warn!("{}: tool {} has no number, tool change not written", NAME, name),
        }
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
        Ok(())
    }

    fn set_zone_data(&mut self, mm: f64) -> Result<(), PostError> {
        self.tracker.current("SetZoneData")?;
        self.motion.zone_mm = mm;
        if mm > 0.0 {
            self.block("SetZoneData", &format!("G64 ADIS={}", num(mm, 3)))
        } else {
            self.block("SetZoneData", "G60")
        }
    }

    fn set_do(&mut self, io: &IoVar, value: &IoValue) -> Result<(), PostError> {
        let text = format!("{}={}", io_name(io, "$A_OUT"), value.render("1", "0"));
        self.block("SetDO", &text)
    }

    fn wait_di(&mut self, io: &IoVar, value: &IoValue, timeout_ms: Option<f64>) -> Result<(), PostError> {
        let program = self.program("WaitDI")?;
        if let Some(ms) = timeout_ms.filter(|ms| *ms > 0.0) {
            warn!("{}: wait timeout of {} ms is not supported, waiting without timeout", NAME, ms);
            program.comment(&format!("timeout of {} ms not supported", num(ms, 0)));
        }
        program.block(&format!("WHILE {}<>{}", io_name(io, "$A_IN"), value.render("1", "0")));
        program.block("ENDWHILE");
        Ok(())
    }

    fn pause(&mut self, ms: Option<f64>) -> Result<(), PostError> {
        match ms {
            Some(ms) if ms >= 0.0 => self.block("Pause", &format!("G4 F{}", num(ms / 1000.0, 3))),
            _ => self.block("Pause", "M0"),
        }
    }

    fn run_code(&mut self, code: &str, is_call: bool) -> Result<(), PostError> {
        let program = self.program("RunCode")?;
        if is_call {
            program.block(&sanitize_name(code, 24, true));
        } else {
            program.blocks.push_block(code);
        }
        Ok(())
    }

    fn run_message(&mut self, message: &str, is_comment: bool) -> Result<(), PostError> {
        let program = self.program("RunMessage")?;
        if is_comment {
            program.comment(message);
        } else {
            program.block(&format!("MSG(\"{}\")", message.replace('"', "'")));
        }
        Ok(())
    }

    fn program_files(&self, name: &str) -> Result<Vec<ProgramFile>, PostError> {
        self.tracker.check_finished()?;
        Ok(self.programs.iter().map(|program| {
            let file_name = if program.main {
                format!("{}.mpf", sanitize_name(name, 24, true))
            } else {
                format!("{}.spf", program.name)
            };
            ProgramFile { file_name, contents: program.blocks.text() }
        }).collect())
    }
}

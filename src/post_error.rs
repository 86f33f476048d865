//! Errors raised while generating, saving or sending robot programs

use std::io;

use crate::pose_error::PoseError;

/// Unified error of all post processors. Apart from I/O and connection failures, every variant
/// indicates a call sequence the target controller cannot express; generation stops there.
#[derive(Debug)]
pub enum PostError {
    IoError(io::Error),
    Pose(PoseError),
    /// An instruction arrived before any program was started.
    NoProgram { instruction: &'static str },
    /// `prog_finish` for a program that is not the open one, or `prog_start` while
    /// another program is still open.
    ProgramMismatch { expected: Option<String>, found: String },
    /// Output was requested while a program was still open.
    Unfinished { program: String },
    /// The controller (or this combination of arguments) has no such instruction.
    Unsupported { post: &'static str, instruction: String },
    /// The dialect needs a Cartesian pose for this instruction but only joints were given.
    MissingPose { post: &'static str, instruction: &'static str },
    /// A program name collides with a page of a program that was already split.
    AlreadySplit { program: String, page: String },
    /// Joint vector of unsupported length.
    InvalidJoints { found: usize },
    SettingsError(String),
    ParseError(String),
    ConnectionError(String),
}

impl std::fmt::Display for PostError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            PostError::IoError(ref err) =>
                write!(f, "IO Error: {}", err),
            PostError::Pose(ref err) =>
                write!(f, "Pose Error: {}", err),
            PostError::NoProgram { instruction } =>
                write!(f, "{} called before any program was started", instruction),
            PostError::ProgramMismatch { ref expected, ref found } => match expected {
                Some(expected) => write!(f, "Program {} does not match the open program {}", found, expected),
                None => write!(f, "Cannot finish program {}: no program is open", found),
            },
            PostError::Unfinished { ref program } =>
                write!(f, "Program {} was started but not finished", program),
            PostError::Unsupported { post, ref instruction } =>
                write!(f, "{} does not support {}", post, instruction),
            PostError::MissingPose { post, instruction } =>
                write!(f, "{} requires a Cartesian pose for {}", post, instruction),
            PostError::AlreadySplit { ref program, ref page } =>
                write!(f, "Program {} collides with page {} of an already split program", program, page),
            PostError::InvalidJoints { found } =>
                write!(f, "Invalid joint vector: expected 6 to 12 values, found {}", found),
            PostError::SettingsError(ref msg) =>
                write!(f, "Settings Error: {}", msg),
            PostError::ParseError(ref msg) =>
                write!(f, "Parse Error: {}", msg),
            PostError::ConnectionError(ref msg) =>
                write!(f, "Connection Error: {}", msg),
        }
    }
}

impl std::error::Error for PostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PostError::IoError(err) => Some(err),
            PostError::Pose(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for PostError {
    fn from(err: io::Error) -> Self {
        PostError::IoError(err)
    }
}

impl From<PoseError> for PostError {
    fn from(err: PoseError) -> Self {
        PostError::Pose(err)
    }
}

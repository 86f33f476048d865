use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::Rng;

use crate::call_sequence::CallSequence;
use crate::post_kind::PostKind;
use crate::post_settings::PostSettings;
use crate::post_traits::ProgramFile;

pub(crate) const CALLS: &str = "src/tests/data/calls.yaml";
pub(crate) const SETTINGS: &str = "src/tests/data/settings.yaml";

/// Load a call sequence from YAML.
pub(crate) fn load_calls(file_path: impl AsRef<Path>) -> Result<CallSequence> {
    let p = file_path.as_ref();
    CallSequence::from_yaml_file(p)
        .with_context(|| format!("Failed to load call sequence: {}", p.display()))
}

pub(crate) fn load_settings(file_path: impl AsRef<Path>) -> Result<PostSettings> {
    let p = file_path.as_ref();
    PostSettings::from_yaml_file(p)
        .with_context(|| format!("Failed to load post settings: {}", p.display()))
}

/// Replays `sequence` into a fresh post of `kind` and renders the files of `name`.
pub(crate) fn render(kind: PostKind, settings: &PostSettings, sequence: &CallSequence, name: &str)
                     -> Result<Vec<ProgramFile>> {
    let mut post = kind.create(settings);
    sequence.replay(post.as_mut())
        .with_context(|| format!("{:?} failed to replay the sequence", kind))?;
    post.program_files(name)
        .with_context(|| format!("{:?} failed to render {}", kind, name))
}

/// Contents of the file called `file_name`, panics if it was not rendered.
pub(crate) fn contents<'a>(files: &'a [ProgramFile], file_name: &str) -> &'a str {
    match files.iter().find(|f| f.file_name == file_name) {
        Some(file) => &file.contents,
        None => panic!(
            "{} not rendered, have {:?}",
            file_name,
            files.iter().map(|f| f.file_name.as_str()).collect::<Vec<_>>()
        ),
    }
}

/// Random xyzrpw tuple away from the pitch singularity.
pub(crate) fn random_xyzrpw(rng: &mut StdRng) -> [f64; 6] {
    [
        rng.random_range(-1500.0..1500.0),
        rng.random_range(-1500.0..1500.0),
        rng.random_range(-500.0..2000.0),
        rng.random_range(-179.0..179.0),
        rng.random_range(-80.0..80.0),
        rng.random_range(-179.0..179.0),
    ]
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use robot_post::call_sequence::CallSequence;
use robot_post::euler::EulerConvention;
use robot_post::post_kind::PostKind;
use robot_post::post_settings::PostSettings;
use robot_post::utils::num_list;

/// Renders robot programs for industrial controllers.
#[derive(Parser)]
#[command(name = "robot-post", version)]
struct Cli {
    /// Log every emitted instruction
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a YAML call sequence with the chosen post and save the program files
    Render {
        #[arg(long, value_enum)]
        post: PostKind,

        /// Call sequence (YAML)
        #[arg(long)]
        input: PathBuf,

        /// Folder for the program files
        #[arg(long)]
        output: PathBuf,

        /// Post settings (YAML)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Name of the main program file, defaults to the first program of the sequence
        #[arg(long)]
        name: Option<String>,

        /// Also send the program to the robot at this address
        #[arg(long)]
        send: Option<String>,
    },
    /// Convert a pose between orientation conventions
    Convert {
        #[arg(long, value_enum)]
        from: EulerConvention,

        #[arg(long, value_enum)]
        to: EulerConvention,

        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
    },
    /// List the available posts
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match cli.command {
        Command::Render { post, input, output, settings, name, send } => {
            let settings = match settings {
                Some(path) => PostSettings::from_yaml_file(&path)
                    .with_context(|| format!("Failed to read settings {}", path.display()))?,
                None => PostSettings::default(),
            };
            let sequence = CallSequence::from_yaml_file(&input)
                .with_context(|| format!("Failed to read call sequence {}", input.display()))?;
            let name = name
                .or_else(|| sequence.main_program().map(str::to_string))
                .unwrap_or_else(|| "program".to_string());

            let mut robot_post = post.create(&settings);
            sequence.replay(robot_post.as_mut())
                .with_context(|| format!("{} cannot render {}", robot_post.name(), input.display()))?;
            let written = robot_post.prog_save(&output, &name)?;
            info!("{} files written to {}", written.len(), output.display());

            if let Some(robot_ip) = send {
                robot_post.prog_send_robot(&robot_ip, "", "", "")
                    .with_context(|| format!("Failed to send the program to {}", robot_ip))?;
            }
        }
        Command::Convert { from, to, values } => {
            let pose = from.to_pose(&values)
                .with_context(|| format!("{} expects {} values", from.name(), from.arity()))?;
            println!("{}: [{}]", to.name(), num_list(&to.from_pose(&pose), 6, ", "));
        }
        Command::List => {
            for kind in PostKind::ALL {
                println!("{:?}: {}", kind, kind.description());
            }
        }
    }
    Ok(())
}

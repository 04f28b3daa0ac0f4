use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

pub mod analyze;

pub use analyze::handle_analyze_video_command;

#[derive(Parser, Debug)]
#[command(name = "quantum")]
#[command(about = "Meeting intelligence backend with real-time emotion analysis", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Run emotion analysis on a local video file and print the summary
    AnalyzeVideo(AnalyzeVideoArgs),
}

#[derive(ClapArgs, Debug)]
pub struct AnalyzeVideoArgs {
    /// Video file to analyse
    pub path: PathBuf,
    /// Frames sampled per second (default: emotion.video_sample_fps)
    #[arg(long)]
    pub fps: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_video() {
        let cli = Cli::parse_from(["quantum", "-v", "analyze-video", "call.mp4", "--fps", "2"]);
        assert!(cli.verbose);
        match cli.command {
            Some(CliCommand::AnalyzeVideo(args)) => {
                assert_eq!(args.path, PathBuf::from("call.mp4"));
                assert_eq!(args.fps, Some(2.0));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_runs_service() {
        let cli = Cli::parse_from(["quantum"]);
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }
}

mod error;
mod media;
mod parser;
mod pipeline;
mod processor;
mod serialiser;
mod slideshow;
mod timeline;

use crate::pipeline::CastOpts;
use crate::timeline::Tolerance;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser as ClapParser;
use log::LevelFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => (),
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            std::process::exit(1);
        }
    }
}

#[derive(ClapParser)]
#[command(about = "Build a video cast from PDF slides, an audio track, a slide timeline and cuts")]
struct Cli {
    #[arg(short, long, value_name = "FILE", help = "PDF with the slides.")]
    pdf: PathBuf,
    #[arg(short, long, value_name = "FILE", help = "The original audio track.")]
    audio: PathBuf,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "JSON file with slide change times: [12.3, \"1:05\", ...] or [{\"t\": 12.3, \"page\": 2}, ...]."
    )]
    timeline: PathBuf,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "JSON file with [[start, end], ...] intervals to remove from the audio."
    )]
    cuts: Option<PathBuf>,
    #[arg(short, long, value_name = "FILE", help = "Where to write the final .mp4 video.")]
    out: PathBuf,
    #[arg(
        short,
        long,
        value_name = "DIR",
        help = "Working directory for slide images, cleaned audio and intermediate video.",
        default_value = "./_cast_build"
    )]
    workdir: PathBuf,
    #[arg(
        long,
        value_name = "SECONDS",
        help = "Shift every slide change and cut by this many seconds.",
        default_value_t = 0.0,
        allow_hyphen_values = true
    )]
    skew: f64,
    #[arg(short, long, help = "Log debug output and show the output of ffmpeg.")]
    verbose: bool,
    #[arg(long, help = "Check the inputs and log the commands without running them.")]
    dry_run: bool,
    #[arg(long, help = "Reuse the cleaned audio from the working directory if present.")]
    keep_audio: bool,
    #[arg(long, help = "Reuse the slide images from the working directory.")]
    keep_pdf: bool,
    #[arg(
        long,
        value_name = "PIXELS",
        help = "Height of the rendered slides.",
        default_value_t = 720
    )]
    slide_height: u32,
    #[arg(
        long,
        value_name = "SECONDS",
        help = "Slide changes closer than this after cutting are dropped.",
        default_value_t = Tolerance::DEFAULT_MONOTONIC,
        value_parser = parse_epsilon
    )]
    dedup_epsilon: f64,
}

fn parse_epsilon(arg: &str) -> Result<f64, String> {
    let secs: f64 = arg.parse().map_err(|e| format!("{}", e))?;
    if secs.is_finite() && secs >= 0.0 {
        Ok(secs)
    } else {
        Err(format!("expected a non-negative number of seconds, got '{}'", arg))
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let opts = CastOpts {
        pdf: cli.pdf,
        audio: cli.audio,
        timeline: cli.timeline,
        cuts: cli.cuts,
        out: cli.out,
        workdir: cli.workdir,
        skew: cli.skew,
        verbose: cli.verbose,
        dry_run: cli.dry_run,
        keep_audio: cli.keep_audio,
        keep_pdf: cli.keep_pdf,
        slide_height: cli.slide_height,
        tolerance: Tolerance {
            monotonic: cli.dedup_epsilon,
            ..Tolerance::default()
        },
    };
    pipeline::run(opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from([
            "slidecast", "-p", "deck.pdf", "-a", "talk.mp3", "-t", "slides.json", "-o", "out.mp4",
        ])
        .unwrap();

        assert_eq!(cli.workdir, PathBuf::from("./_cast_build"));
        assert_eq!(cli.skew, 0.0);
        assert_eq!(cli.slide_height, 720);
        assert_eq!(cli.dedup_epsilon, Tolerance::DEFAULT_MONOTONIC);
        assert!(cli.cuts.is_none());
        assert!(!cli.dry_run);
    }

    macro_rules! test_bad_epsilon {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let epsilon: &str = $value;

                let parsed = Cli::try_parse_from([
                    "slidecast", "-p", "d.pdf", "-a", "a.wav", "-t", "t.json", "-o", "o.mp4",
                    &format!("--dedup-epsilon={}", epsilon),
                ]);

                assert!(parsed.is_err(), "accepted {}", epsilon);
            }
        )*
        }
    }

    test_bad_epsilon! {
        cli_bad_epsilon_0: "-1",
        cli_bad_epsilon_1: "nan",
        cli_bad_epsilon_2: "inf",
        cli_bad_epsilon_3: "tiny",
    }

    #[test]
    fn cli_zero_epsilon() {
        let cli = Cli::try_parse_from([
            "slidecast", "-p", "d.pdf", "-a", "a.wav", "-t", "t.json", "-o", "o.mp4",
            "--dedup-epsilon", "0",
        ])
        .unwrap();

        assert_eq!(cli.dedup_epsilon, 0.0);
    }

    #[test]
    fn cli_negative_skew() {
        let cli = Cli::try_parse_from([
            "slidecast", "-p", "d.pdf", "-a", "a.wav", "-t", "t.json", "-o", "o.mp4", "-c",
            "cuts.json", "--skew", "-1.5", "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.skew, -1.5);
        assert_eq!(cli.cuts, Some(PathBuf::from("cuts.json")));
        assert!(cli.dry_run);
    }
}

use crate::error::SlidecastError;
use crate::serialiser::format_secs;
use crate::timeline::Fragment;

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use log::{debug, error};
use regex::Regex;

/// Audio containers ffmpeg can cut with `-c copy` and concatenate back.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "aac", "m4a", "flac", "ogg"];

const SLIDE_PATTERN: &str = r"^slide-(\d+)\.png$";
const SLIDE_PREFIX: &str = "slide";

/// Runs an external tool to completion.
///
/// With `verbose` the tool talks straight to the terminal, otherwise its
/// output is captured and stderr is reported on failure.
pub fn run_tool(cmd: &mut Command, verbose: bool) -> Result<()> {
    let tool = cmd.get_program().to_string_lossy().into_owned();
    debug!("Running {:?}", cmd);

    let (status, stderr) = if verbose {
        let status = cmd
            .status()
            .context(format!("Failed to execute {}", tool))?;
        (status, String::new())
    } else {
        let output = cmd
            .output()
            .context(format!("Failed to execute {}", tool))?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        (output.status, stderr)
    };

    if !status.success() {
        error!("{} failed: {}", tool, stderr);
        return Err(SlidecastError::Tool {
            tool,
            status: status.to_string(),
            stderr,
        }
        .into());
    }
    Ok(())
}

/// Duration of a media file in seconds, as reported by ffprobe.
pub fn probe_duration(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args(["-v", "error"])
        .args(["-show_entries", "format=duration"])
        .args(["-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(path)
        .output()
        .context("Failed to execute ffprobe")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("ffprobe failed: {}", stderr);
        return Err(SlidecastError::Tool {
            tool: "ffprobe".to_string(),
            status: output.status.to_string(),
            stderr,
        }
        .into());
    }
    parse_duration(&String::from_utf8_lossy(&output.stdout))
        .context(format!("Unexpected ffprobe output for '{}'", path.display()))
}

fn parse_duration(stdout: &str) -> Result<f64> {
    let secs: f64 = stdout.trim().parse()?;
    Ok(secs)
}

/// ffmpeg invocation copying `fragment` of `audio` into `target`.
pub fn extract_fragment(audio: &Path, fragment: &Fragment, target: &Path) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .arg("-i")
        .arg(audio)
        .args(["-ss", &format_secs(fragment.start)])
        .args(["-to", &format_secs(fragment.end)])
        .args(["-c", "copy"])
        .arg(target);
    cmd
}

/// ffmpeg invocation joining the files of a concat list without re-encoding.
pub fn concat_copy(list: &Path, target: &Path) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .args(["-f", "concat", "-safe", "0"])
        .arg("-i")
        .arg(list)
        .args(["-c", "copy"])
        .arg(target);
    cmd
}

/// ffmpeg invocation encoding a slide concat list into a silent video.
///
/// One frame per second is plenty for still images, and a long GOP keeps
/// the stream small.
pub fn encode_slides(list: &Path, target: &Path) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .args(["-f", "concat", "-safe", "0"])
        .arg("-i")
        .arg(list)
        .args(["-r", "1"])
        .args(["-c:v", "libx264", "-preset", "ultrafast", "-crf", "28"])
        .args(["-g", "300", "-sc_threshold", "0"])
        .args(["-x264-params", "keyint=300:min-keyint=300:no-scenecut=1"])
        .args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2", "-pix_fmt", "yuv420p"])
        .args(["-threads", "0"])
        .arg(target);
    cmd
}

/// ffmpeg invocation muxing `video` and `audio` without re-encoding.
pub fn mux(video: &Path, audio: &Path, target: &Path) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .arg("-i")
        .arg(video)
        .arg("-i")
        .arg(audio)
        .args(["-c:v", "copy", "-c:a", "copy"])
        .arg(target);
    cmd
}

/// pdftoppm invocation rendering every page of `pdf` to `slide-N.png` in
/// `out_dir`, `height` pixels tall.
pub fn rasterize_pdf(pdf: &Path, out_dir: &Path, height: u32) -> Command {
    let mut cmd = Command::new("pdftoppm");
    cmd.arg("-png")
        .args(["-scale-to-y", &height.to_string()])
        .args(["-scale-to-x", "-1"])
        .arg(pdf)
        .arg(out_dir.join(SLIDE_PREFIX));
    cmd
}

/// Slide images in `dir`, ordered by page number.
pub fn list_slides(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = Regex::new(SLIDE_PATTERN).context("Invalid slide pattern.")?;
    let mut slides = Vec::new();
    let entries =
        std::fs::read_dir(dir).context(format!("Failed to read directory: '{}'", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let page = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| pattern.captures(name))
            .and_then(|caps| caps[1].parse::<u64>().ok());
        if let Some(page) = page {
            slides.push((page, path));
        }
    }
    slides.sort();
    Ok(slides.into_iter().map(|(_, path)| path).collect())
}

/// Removes slide images left over from an earlier render.
pub fn clear_slides(dir: &Path) -> Result<()> {
    for slide in list_slides(dir)? {
        std::fs::remove_file(&slide)
            .context(format!("Failed to remove stale slide: '{}'", slide.display()))?;
    }
    Ok(())
}

/// Lower-cased extension of `audio` if it is one ffmpeg can cut losslessly.
pub fn audio_extension(audio: &Path) -> Result<String, SlidecastError> {
    let ext = audio
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase();
    if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(SlidecastError::UnsupportedAudio(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn parse_ffprobe_duration() {
        assert_eq!(parse_duration("123.456000\n").unwrap(), 123.456);
        assert!(parse_duration("N/A\n").is_err());
    }

    #[test]
    fn fragment_command_uses_millisecond_times() {
        let cmd = extract_fragment(
            Path::new("/in/talk.mp3"),
            &Fragment::new(20.0, 50.12345),
            Path::new("/w/frag_001.mp3"),
        );

        assert_eq!(cmd.get_program(), "ffmpeg");
        assert_eq!(
            args(&cmd),
            vec![
                "-y", "-i", "/in/talk.mp3", "-ss", "20.000", "-to", "50.123", "-c", "copy",
                "/w/frag_001.mp3"
            ]
        );
    }

    #[test]
    fn rasterize_command_targets_slide_prefix() {
        let cmd = rasterize_pdf(Path::new("/in/deck.pdf"), Path::new("/w/slides"), 720);

        assert_eq!(cmd.get_program(), "pdftoppm");
        assert_eq!(
            args(&cmd),
            vec![
                "-png", "-scale-to-y", "720", "-scale-to-x", "-1", "/in/deck.pdf",
                "/w/slides/slide"
            ]
        );
    }

    #[test]
    fn list_slides_orders_by_page() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["slide-10.png", "slide-2.png", "slide-1.png", "notes.txt", "slide-x.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let slides = list_slides(dir.path()).unwrap();

        let names: Vec<_> = slides
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["slide-1.png", "slide-2.png", "slide-10.png"]);
    }

    #[test]
    fn clear_slides_keeps_other_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["slide-01.png", "slide-02.png", "img_list.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        clear_slides(dir.path()).unwrap();

        assert!(list_slides(dir.path()).unwrap().is_empty());
        assert!(dir.path().join("img_list.txt").exists());
    }

    #[test]
    fn audio_extensions() {
        assert_eq!(audio_extension(Path::new("talk.MP3")).unwrap(), "mp3");
        assert_eq!(audio_extension(Path::new("/a/b.flac")).unwrap(), "flac");
        assert!(matches!(
            audio_extension(Path::new("talk.mp4")),
            Err(SlidecastError::UnsupportedAudio(_))
        ));
        assert!(audio_extension(Path::new("talk")).is_err());
    }
}

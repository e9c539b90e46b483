use crate::error::SlidecastError;
use crate::media;
use crate::parser;
use crate::processor;
use crate::serialiser;
use crate::slideshow;
use crate::timeline::{AdjustedSlideChange, Fragment, Interval, Page, SlideChange, Tolerance};

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};

#[derive(Debug)]
pub struct CastOpts {
    pub pdf: PathBuf,
    pub audio: PathBuf,
    pub timeline: PathBuf,
    pub cuts: Option<PathBuf>,
    pub out: PathBuf,
    pub workdir: PathBuf,
    /// Seconds added to every slide change and cut.
    pub skew: f64,
    pub verbose: bool,
    pub dry_run: bool,
    pub keep_audio: bool,
    pub keep_pdf: bool,
    pub slide_height: u32,
    pub tolerance: Tolerance,
}

pub fn run(opts: CastOpts) -> Result<()> {
    let opts = resolve_paths(opts)?;
    let audio_ext = media::audio_extension(&opts.audio)?;
    std::fs::create_dir_all(&opts.workdir).context(format!(
        "Failed to create working directory: '{}'",
        opts.workdir.display()
    ))?;
    info!("Working directory: {}", opts.workdir.display());

    let changes = load_timeline(&opts)?;
    info!("Timeline loaded: {} slide changes", changes.len());

    let cuts = load_cuts(&opts)?;
    info!("Cuts loaded: {} intervals", cuts.len());
    debug!("Cuts: {:?}", cuts);

    let audio_len = media::probe_duration(&opts.audio)?;
    info!("Original audio: {:.2}s", audio_len);

    let fragments = processor::split_fragments(&cuts, audio_len);
    debug!("Fragments to keep: {:?}", fragments);
    let audio = clean_audio(&opts, &cuts, &fragments, &audio_ext)?;
    let clean_len = if audio == opts.audio {
        audio_len
    } else if opts.dry_run {
        fragments.iter().map(|f| f.duration()).sum()
    } else {
        media::probe_duration(&audio)?
    };
    info!("Cleaned audio: {:.2}s", clean_len);

    let adjusted = processor::adjust_timeline(&changes, &cuts, audio_len, &opts.tolerance);
    if adjusted.dropped > 0 {
        warn!(
            "{} slide changes collapsed onto an earlier change and were dropped",
            adjusted.dropped
        );
    }
    debug!("Slide changes after cuts: {:?}", adjusted.changes);

    let slides = prepare_slides(&opts, &changes)?;
    build_video(&opts, &audio, &slides, &adjusted.changes, clean_len)
}

fn resolve_paths(mut opts: CastOpts) -> Result<CastOpts> {
    opts.pdf = absolute(&opts.pdf)?;
    opts.audio = absolute(&opts.audio)?;
    opts.timeline = absolute(&opts.timeline)?;
    opts.cuts = opts.cuts.as_deref().map(absolute).transpose()?;
    opts.out = absolute(&opts.out)?;
    opts.workdir = absolute(&opts.workdir)?;

    require_file(&opts.audio, "Audio file")?;
    require_file(&opts.pdf, "PDF file")?;
    require_file(&opts.timeline, "Timeline file")?;
    if let Some(cuts) = &opts.cuts {
        require_file(cuts, "Cuts file")?;
    }
    Ok(opts)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir().context("Failed to read the current directory")?;
        Ok(cwd.join(path))
    }
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(anyhow!("{} not found: '{}'", what, path.display()))
    }
}

fn load_timeline(opts: &CastOpts) -> Result<Vec<SlideChange>> {
    let json = std::fs::read_to_string(&opts.timeline).context(format!(
        "Failed to open timeline file: '{}'",
        opts.timeline.display()
    ))?;
    let mut changes = parser::parse_timeline(&json).context(format!(
        "Failed to parse timeline file: '{}'",
        opts.timeline.display()
    ))?;
    debug!("Raw slide changes: {:?}", changes);

    for change in changes.iter_mut() {
        change.t += opts.skew;
    }
    changes.sort_by(|a, b| a.t.total_cmp(&b.t));
    Ok(changes)
}

fn load_cuts(opts: &CastOpts) -> Result<Vec<Interval>> {
    let raw = match &opts.cuts {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .context(format!("Failed to open cuts file: '{}'", path.display()))?;
            parser::parse_cuts(&json)
                .context(format!("Failed to parse cuts file: '{}'", path.display()))?
        }
        None => Vec::new(),
    };
    let skewed: Vec<(f64, f64)> = raw
        .into_iter()
        .map(|(a, b)| (a + opts.skew, b + opts.skew))
        .collect();
    Ok(processor::normalize_cuts(&skewed, &opts.tolerance))
}

/// Runs `cmd`, or only logs it on a dry run.
fn execute(opts: &CastOpts, cmd: &mut Command) -> Result<()> {
    if opts.dry_run {
        info!("Dry run, skipping: {:?}", cmd);
        Ok(())
    } else {
        media::run_tool(cmd, opts.verbose)
    }
}

/// Produces the audio track with the cuts removed and returns its path.
fn clean_audio(
    opts: &CastOpts,
    cuts: &[Interval],
    fragments: &[Fragment],
    ext: &str,
) -> Result<PathBuf> {
    if cuts.is_empty() {
        info!("No cuts given, using the audio as is");
        return Ok(opts.audio.clone());
    }
    if fragments.is_empty() {
        return Err(anyhow!("The cuts remove the whole audio track"));
    }

    let audio_dir = opts.workdir.join("audio");
    let target = audio_dir.join(format!("cleaned_audio.{}", ext));
    if opts.keep_audio && target.is_file() {
        info!("Reusing cleaned audio: {}", target.display());
        return Ok(target);
    }
    std::fs::create_dir_all(&audio_dir).context(format!(
        "Failed to create directory: '{}'",
        audio_dir.display()
    ))?;

    info!("Cutting audio into {} fragments", fragments.len());
    let mut files = Vec::with_capacity(fragments.len());
    for (i, fragment) in fragments.iter().enumerate() {
        let file = audio_dir.join(format!("frag_{:03}.{}", i, ext));
        debug!(
            "Extracting fragment {}: {:.3} - {:.3}",
            i, fragment.start, fragment.end
        );
        execute(opts, &mut media::extract_fragment(&opts.audio, fragment, &file))?;
        files.push(file);
    }

    let list = audio_dir.join("concat_list.txt");
    serialiser::save_fragment_list(&files, &list)?;
    info!("Concatenating fragments into {}", target.display());
    execute(opts, &mut media::concat_copy(&list, &target))?;
    Ok(target)
}

/// Slide images, one per page, in page order.
fn prepare_slides(opts: &CastOpts, changes: &[SlideChange]) -> Result<Vec<PathBuf>> {
    let slides_dir = opts.workdir.join("slides");
    std::fs::create_dir_all(&slides_dir).context(format!(
        "Failed to create directory: '{}'",
        slides_dir.display()
    ))?;

    let slides = if opts.keep_pdf {
        info!("Reusing slides from {}", slides_dir.display());
        media::list_slides(&slides_dir)?
    } else if opts.dry_run {
        execute(
            opts,
            &mut media::rasterize_pdf(&opts.pdf, &slides_dir, opts.slide_height),
        )?;
        let existing = media::list_slides(&slides_dir)?;
        if existing.is_empty() {
            let pages = assumed_page_count(changes);
            info!("Dry run, assuming {} slides", pages);
            (1..=pages)
                .map(|page| slides_dir.join(format!("slide-{}.png", page)))
                .collect()
        } else {
            existing
        }
    } else {
        media::clear_slides(&slides_dir)?;
        info!("Rendering slides from {}", opts.pdf.display());
        media::run_tool(
            &mut media::rasterize_pdf(&opts.pdf, &slides_dir, opts.slide_height),
            opts.verbose,
        )?;
        let slides = media::list_slides(&slides_dir)?;
        info!("Slides rendered: {} pages", slides.len());
        slides
    };

    if slides.is_empty() {
        return Err(SlidecastError::NoSlides(slides_dir.display().to_string()).into());
    }
    debug!("Slides: {:?}", slides);
    Ok(slides)
}

/// Enough pages for every change in the timeline to resolve.
fn assumed_page_count(changes: &[SlideChange]) -> usize {
    changes
        .iter()
        .filter_map(|change| match change.page {
            Page::Explicit(page) => usize::try_from(page).ok(),
            Page::Sequential => None,
        })
        .chain(std::iter::once(changes.len()))
        .max()
        .unwrap_or_default()
        .max(1)
}

fn build_video(
    opts: &CastOpts,
    audio: &Path,
    slides: &[PathBuf],
    changes: &[AdjustedSlideChange],
    total: f64,
) -> Result<()> {
    let video_dir = opts.workdir.join("video");
    std::fs::create_dir_all(&video_dir).context(format!(
        "Failed to create directory: '{}'",
        video_dir.display()
    ))?;

    let segments = slideshow::plan_slides(changes, slides, total);
    let list = video_dir.join("img_list.txt");
    serialiser::save_slide_list(&segments, &list)?;
    debug!("Slide list written to {}", list.display());

    let silent = video_dir.join("video_no_audio.mp4");
    let target = video_dir.join("final_video.mp4");
    info!("Creating video from {} slide segments", segments.len());
    execute(opts, &mut media::encode_slides(&list, &silent))?;
    info!("Merging video with audio");
    execute(opts, &mut media::mux(&silent, audio, &target))?;

    if opts.dry_run {
        info!("Dry run, nothing written to {}", opts.out.display());
        return Ok(());
    }
    if !target.is_file() {
        return Err(anyhow!("Failed to create video: '{}'", target.display()));
    }
    move_file(&target, &opts.out)?;
    info!("Result saved: {}", opts.out.display());
    Ok(())
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create directory: '{}'", parent.display()))?;
    }
    if std::fs::rename(from, to).is_err() {
        // Probably a different file system.
        std::fs::copy(from, to).context(format!(
            "Failed to copy '{}' to '{}'",
            from.display(),
            to.display()
        ))?;
        std::fs::remove_file(from)
            .context(format!("Failed to remove '{}'", from.display()))?;
    }
    Ok(())
}

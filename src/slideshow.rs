use crate::timeline::{AdjustedSlideChange, Page};

use std::path::{Path, PathBuf};

use log::warn;

/// One image shown for `duration` seconds of the final video.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideSegment {
    pub(crate) image: PathBuf,
    pub(crate) duration: f64,
}

/// Lays out slide images along the cut axis.
///
/// Pages are resolved against `images` here: a sequential page is the one
/// after the previously shown page, and changes naming a page with no image
/// are skipped, leaving the previous slide on screen. The last slide runs
/// until `total`, the duration of the cleaned audio.
pub fn plan_slides(
    changes: &[AdjustedSlideChange],
    images: &[PathBuf],
    total: f64,
) -> Vec<SlideSegment> {
    if images.is_empty() {
        return Vec::new();
    }

    let mut shown: Vec<(f64, &Path)> = Vec::with_capacity(changes.len());
    let mut previous: Option<i64> = None;
    for change in changes {
        let page = match change.page {
            Page::Explicit(page) => page,
            Page::Sequential => previous.map_or(1, |p| p + 1),
        };
        let image = usize::try_from(page)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .and_then(|idx| images.get(idx));
        match image {
            Some(image) => {
                shown.push((change.t, image.as_path()));
                previous = Some(page);
            }
            None => warn!("Invalid page number {} at {:.2}s, skipping", page, change.t),
        }
    }
    if shown.is_empty() {
        warn!("No usable slide changes, showing the first slide throughout");
        shown.push((0.0, images[0].as_path()));
    }

    let mut segments = Vec::with_capacity(shown.len() + 1);
    if shown[0].0 > 0.0 {
        segments.push(SlideSegment {
            image: images[0].clone(),
            duration: shown[0].0,
        });
    }
    for (i, &(t, image)) in shown.iter().enumerate() {
        let until = shown.get(i + 1).map_or(total, |next| next.0);
        segments.push(SlideSegment {
            image: image.to_path_buf(),
            duration: (until - t).max(0.0),
        });
    }
    segments
}

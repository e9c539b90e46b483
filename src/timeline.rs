/// A half-open span of seconds on the original time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Audio kept between two cuts, on the original axis.
pub type Fragment = Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// 1-based page of the slide deck. Not range checked until the page is
    /// resolved to an image.
    Explicit(i64),
    /// Follows whatever page was shown before.
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideChange {
    pub(crate) t: f64,
    pub(crate) page: Page,
}

/// A slide change moved onto the cut axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedSlideChange {
    pub(crate) t: f64,
    pub(crate) page: Page,
}

#[derive(Debug, Default, PartialEq)]
pub struct AdjustedTimeline {
    pub(crate) changes: Vec<AdjustedSlideChange>,
    /// Events that collapsed onto an earlier event's instant.
    pub(crate) dropped: usize,
}

/// Comparison slack for floating point times.
///
/// Times come out of decimal labels, so exact equality is too strict for
/// deciding whether two instants coincide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Cuts closer than this are merged.
    pub merge: f64,
    /// An event this close to a cut start snaps to it.
    pub snap: f64,
    /// Minimum spacing between two kept slide changes on the cut axis.
    pub monotonic: f64,
}

impl Tolerance {
    pub const DEFAULT_MERGE: f64 = 1e-9;
    pub const DEFAULT_SNAP: f64 = 1e-9;
    pub const DEFAULT_MONOTONIC: f64 = 1e-6;
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            merge: Self::DEFAULT_MERGE,
            snap: Self::DEFAULT_SNAP,
            monotonic: Self::DEFAULT_MONOTONIC,
        }
    }
}

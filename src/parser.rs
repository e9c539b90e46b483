use crate::error::SlidecastError;
use crate::timeline::{Page, SlideChange};

use nom::character::complete::{char, multispace0};
use nom::error::{convert_error, ErrorKind, VerboseError};
use nom::multi::many_m_n;
use nom::number::complete::double;
use nom::sequence::preceded;
use nom::{error_position, Err, IResult};
use serde::Deserialize;
use serde_json::Value;

/// A time label as it appears in the JSON inputs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeLabel {
    Seconds(f64),
    Text(String),
}

impl TimeLabel {
    fn seconds(&self) -> Result<f64, SlidecastError> {
        match self {
            TimeLabel::Seconds(secs) => Ok(*secs),
            TimeLabel::Text(text) => parse_time_label(text),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TimelineEntry {
    t: TimeLabel,
    #[serde(default)]
    page: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimelineDoc {
    Labels(Vec<TimeLabel>),
    Entries(Vec<TimelineEntry>),
}

/// Parses `SS.s`, `MM:SS.s` or `HH:MM:SS.s` into seconds.
pub fn parse_time_label(input: &str) -> Result<f64, SlidecastError> {
    let secs = match time_label(input) {
        Ok((_, secs)) => secs,
        Err(Err::Error(err)) | Err(Err::Failure(err)) => {
            return Err(SlidecastError::TimeLabel {
                label: input.to_string(),
                msg: convert_error(input, err),
            })
        }
        Err(Err::Incomplete(_)) => {
            unreachable!("Incomplete data received by non-streaming parser.")
        }
    };
    if !secs.is_finite() {
        return Err(SlidecastError::TimeLabel {
            label: input.to_string(),
            msg: "not a finite number of seconds".to_string(),
        });
    }
    Ok(secs)
}

/// Reads slide changes from timeline JSON.
///
/// A flat list of labels numbers the pages 1, 2, 3... in input order. A
/// list of `{"t": .., "page": ..}` objects takes the page from each object,
/// and an object without a page follows on from the previous slide.
pub fn parse_timeline(json: &str) -> Result<Vec<SlideChange>, SlidecastError> {
    let value: Value = serde_json::from_str(json)?;
    let doc: TimelineDoc =
        serde_json::from_value(value).map_err(SlidecastError::TimelineFormat)?;

    match doc {
        TimelineDoc::Labels(labels) => labels
            .iter()
            .zip(1..)
            .map(|(label, page)| -> Result<SlideChange, SlidecastError> {
                Ok(SlideChange {
                    t: label.seconds()?,
                    page: Page::Explicit(page),
                })
            })
            .collect(),
        TimelineDoc::Entries(entries) => entries
            .iter()
            .map(|entry| -> Result<SlideChange, SlidecastError> {
                Ok(SlideChange {
                    t: entry.t.seconds()?,
                    page: entry.page.map_or(Page::Sequential, Page::Explicit),
                })
            })
            .collect(),
    }
}

/// Reads `[[start, end], ...]` cut pairs. Pairs are returned as written;
/// ordering and overlaps are dealt with by normalization.
pub fn parse_cuts(json: &str) -> Result<Vec<(f64, f64)>, SlidecastError> {
    let value: Value = serde_json::from_str(json)?;
    let pairs: Vec<(TimeLabel, TimeLabel)> =
        serde_json::from_value(value).map_err(SlidecastError::CutsFormat)?;
    pairs
        .iter()
        .map(|(a, b)| -> Result<(f64, f64), SlidecastError> { Ok((a.seconds()?, b.seconds()?)) })
        .collect()
}

fn time_label(input: &str) -> IResult<&str, f64, VerboseError<&str>> {
    let (input, _) = multispace0(input)?;
    let (input, first) = double(input)?;
    let (input, rest) = many_m_n(0, 2, preceded(char(':'), double))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = end_of_label(input)?;

    let secs = rest.into_iter().fold(first, |acc, part| acc * 60.0 + part);
    Ok((input, secs))
}

fn end_of_label(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    if input.is_empty() {
        Ok((input, input))
    } else {
        std::result::Result::Err(Err::Error(error_position!(input, ErrorKind::Eof)))
    }
}

use crate::slideshow::SlideSegment;

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Writes an ffmpeg concat-demuxer list showing each segment's image for
/// its duration.
pub fn save_slide_list<P: AsRef<Path>>(segments: &[SlideSegment], output: P) -> Result<()> {
    save(output, |buf| write_slide_list(buf, segments))
}

/// Writes an ffmpeg concat-demuxer list joining `files` in order.
pub fn save_fragment_list<P: AsRef<Path>>(files: &[PathBuf], output: P) -> Result<()> {
    save(output, |buf| write_fragment_list(buf, files))
}

fn save<P, F>(output: P, write: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<std::fs::File>) -> Result<()>,
{
    let output = output.as_ref();
    let file = std::fs::File::create(output)
        .context(format!("Failed to create file: '{}'", output.display()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer).context("Failed to write to output file.")?;
    writer.flush().context("Failed to write to output file.")?;
    Ok(())
}

fn write_slide_list<W: Write>(buf: &mut W, segments: &[SlideSegment]) -> Result<()> {
    for segment in segments {
        write_file(buf, &segment.image)?;
        write!(buf, "duration ")?;
        write_secs(buf, segment.duration)?;
        writeln!(buf)?;
    }
    // The concat demuxer drops the duration of the final entry unless the
    // last file is listed once more.
    if let Some(last) = segments.last() {
        write_file(buf, &last.image)?;
    }
    Ok(())
}

fn write_fragment_list<W: Write>(buf: &mut W, files: &[PathBuf]) -> Result<()> {
    for file in files {
        write_file(buf, file)?;
    }
    Ok(())
}

fn write_file<W: Write>(buf: &mut W, path: &Path) -> Result<()> {
    let quoted = path.display().to_string().replace('\'', r"'\''");
    writeln!(buf, "file '{}'", quoted)?;
    Ok(())
}

fn write_secs<W: Write>(buf: &mut W, secs: f64) -> Result<()> {
    write!(buf, "{}", format_secs(secs))?;
    Ok(())
}

/// Seconds with millisecond precision, as ffmpeg takes them.
pub fn format_secs(secs: f64) -> String {
    format!("{:.3}", secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    macro_rules! test_write_secs {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (input, expected) = $value;

                let mut buf = Cursor::new(vec![]);

                write_secs(&mut buf, input).expect("Failed to write to buffer");

                assert_eq!(String::from_utf8(buf.into_inner()).unwrap(), expected);
            }
        )*
        }
    }

    test_write_secs! {
        test_write_secs_0: (0.0, "0.000"),
        test_write_secs_1: (0.0004, "0.000"),
        test_write_secs_2: (1.5, "1.500"),
        test_write_secs_3: (59.9999, "60.000"),
        test_write_secs_4: (3661.25, "3661.250"),
    }

    #[test]
    fn slide_list_repeats_last_file() {
        let segments = vec![
            SlideSegment {
                image: PathBuf::from("/w/slides/slide-1.png"),
                duration: 4.0,
            },
            SlideSegment {
                image: PathBuf::from("/w/slides/slide-2.png"),
                duration: 12.25,
            },
        ];
        let mut buf = Cursor::new(vec![]);

        write_slide_list(&mut buf, &segments).unwrap();

        assert_eq!(
            String::from_utf8(buf.into_inner()).unwrap(),
            "file '/w/slides/slide-1.png'\n\
             duration 4.000\n\
             file '/w/slides/slide-2.png'\n\
             duration 12.250\n\
             file '/w/slides/slide-2.png'\n"
        );
    }

    #[test]
    fn empty_slide_list() {
        let mut buf = Cursor::new(vec![]);

        write_slide_list(&mut buf, &[]).unwrap();

        assert!(buf.into_inner().is_empty());
    }

    #[test]
    fn fragment_list_escapes_quotes() {
        let files = vec![
            PathBuf::from("/w/audio/frag_000.mp3"),
            PathBuf::from("/w/it's/frag_001.mp3"),
        ];
        let mut buf = Cursor::new(vec![]);

        write_fragment_list(&mut buf, &files).unwrap();

        assert_eq!(
            String::from_utf8(buf.into_inner()).unwrap(),
            "file '/w/audio/frag_000.mp3'\nfile '/w/it'\\''s/frag_001.mp3'\n"
        );
    }

    #[test]
    fn save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("concat_list.txt");

        save_fragment_list(&[PathBuf::from("a.wav")], &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "file 'a.wav'\n");
    }

    #[test]
    fn format_secs_for_ffmpeg() {
        assert_eq!(format_secs(12.3456), "12.346");
    }
}

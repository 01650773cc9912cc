// THEORY:
// `CommandRecognizer` adapts any external OCR program to the engine's
// `TextLineRecognizer` seam. The frame goes to the program's stdin as a PNG;
// the program answers with one recognized line per stdout line:
//
//     TEXT<TAB>x1,y1,x2,y2,x3,y3,x4,y4
//
// The program runs once per frame, so each call is independent and the
// pipeline's blocking pool can run several at once.

use mrz_vision::{ArtifactSink, Frame, LineItem, Point, Quad, RecognizerError, TextLineRecognizer};
use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

fn encode_png(frame: &Frame) -> Result<Vec<u8>, RecognizerError> {
    let mut png = Cursor::new(Vec::new());
    frame
        .image()
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| RecognizerError::Failed(format!("PNG encoding failed: {e}")))?;
    Ok(png.into_inner())
}

/// Parses one stdout line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<LineItem>, RecognizerError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let (text, coords) = line
        .split_once('\t')
        .ok_or_else(|| RecognizerError::Output(format!("missing location in {line:?}")))?;
    let values = coords
        .split(',')
        .map(|v| v.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RecognizerError::Output(format!("bad coordinate in {line:?}: {e}")))?;
    let &[x1, y1, x2, y2, x3, y3, x4, y4] = values.as_slice() else {
        return Err(RecognizerError::Output(format!("expected 8 coordinates in {line:?}")));
    };
    let quad = Quad::new([
        Point::new(x1, y1),
        Point::new(x2, y2),
        Point::new(x3, y3),
        Point::new(x4, y4),
    ]);
    Ok(Some(LineItem::new(text.trim(), quad)))
}

impl TextLineRecognizer for CommandRecognizer {
    fn recognize(&self, frame: &Frame, _artifacts: &ArtifactSink) -> Result<Vec<LineItem>, RecognizerError> {
        let png = encode_png(frame)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RecognizerError::Failed(format!("cannot start {}: {e}", self.program)))?;

        // Fed from another thread so a chatty program cannot deadlock on a full pipe.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RecognizerError::Failed("stdin not captured".into()))?;
        let writer = std::thread::spawn(move || stdin.write_all(&png));

        let output = child
            .wait_with_output()
            .map_err(|e| RecognizerError::Failed(format!("{} did not finish: {e}", self.program)))?;
        if let Ok(Err(e)) = writer.join() {
            log::debug!("[ENGINE] stdin closed early: {e}");
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognizerError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = Vec::new();
        for line in stdout.lines() {
            if let Some(item) = parse_line(line)? {
                lines.push(item);
            }
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_and_quad() {
        let item = parse_line("P<UTOERIKSSON<<ANNA\t10,20,110,20,110,40,10,40")
            .expect("parse")
            .expect("item");
        assert_eq!(item.text, "P<UTOERIKSSON<<ANNA");
        assert_eq!(item.location, Quad::rect(10, 20, 100, 20));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_line("   ").expect("parse").is_none());
    }

    #[test]
    fn malformed_lines_are_output_errors() {
        assert!(matches!(parse_line("NO TAB HERE"), Err(RecognizerError::Output(_))));
        assert!(matches!(parse_line("TEXT\t1,2,3"), Err(RecognizerError::Output(_))));
        assert!(matches!(parse_line("TEXT\t1,2,3,4,5,6,7,x"), Err(RecognizerError::Output(_))));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_a_failure() {
        let recognizer = CommandRecognizer::new("sh", vec!["-c".into(), "cat >/dev/null; exit 3".into()]);
        let frame = Frame::new(image::RgbImage::new(2, 2));
        let result = recognizer.recognize(&frame, &ArtifactSink::discard());
        assert!(matches!(result, Err(RecognizerError::Failed(_))));
    }

    #[cfg(unix)]
    #[test]
    fn reads_lines_from_program_output() {
        let script = "cat >/dev/null; printf 'ABC\\t0,0,3,0,3,1,0,1\\n\\nDEF\\t0,1,3,1,3,2,0,2\\n'";
        let recognizer = CommandRecognizer::new("sh", vec!["-c".into(), script.into()]);
        let frame = Frame::new(image::RgbImage::new(2, 2));
        let lines = recognizer.recognize(&frame, &ArtifactSink::discard()).expect("recognize");
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["ABC", "DEF"]);
    }
}

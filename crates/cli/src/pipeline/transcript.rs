//! Markdown transcript - sections are appended as they arrive

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use contracts::{SessionParameters, StageOutput};
use tracing::debug;

use super::RunStats;

/// Writes a session transcript to disk
pub struct TranscriptWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TranscriptWriter {
    /// Create the file (and parent directories) and write the session header
    pub fn create(path: &Path, params: &SessionParameters) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "# {} in {}", params.topic, params.course)?;
        writeln!(writer)?;
        writeln!(
            writer,
            "- Learner: {} ({})",
            params.name, params.course_expertise
        )?;
        writeln!(writer, "- Background: {}", params.background)?;
        writeln!(writer, "- Language: {}", params.primary_language)?;
        writeln!(
            writer,
            "- Generated: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S %:z")
        )?;
        writer.flush()?;

        debug!(path = %path.display(), "Transcript created");

        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    /// Append one section and flush
    pub fn write_section(&mut self, output: &StageOutput) -> std::io::Result<()> {
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "## Section {}: {}",
            output.index, output.title
        )?;
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", output.text.trim_end())?;
        self.writer.flush()
    }

    /// Write the closing timing table
    pub fn finish(mut self, stats: &RunStats) -> std::io::Result<PathBuf> {
        writeln!(self.writer)?;
        writeln!(self.writer, "---")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| # | Section | Time (s) |")?;
        writeln!(self.writer, "|---|---------|----------|")?;
        for timing in &stats.stages {
            writeln!(
                self.writer,
                "| {} | {} | {:.2} |",
                timing.index,
                timing.title,
                timing.elapsed.as_secs_f64()
            )?;
        }
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "Total time: {:.2}s",
            stats.duration.as_secs_f64()
        )?;
        if let Some(ref failure) = stats.failure {
            writeln!(
                self.writer,
                "Run halted at {}: {}",
                failure.stage, failure.message
            )?;
        }
        self.writer.flush()?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn output(index: usize, title: &str, text: &str) -> StageOutput {
        StageOutput {
            index,
            stage: title.replace(' ', ""),
            title: title.to_string(),
            output_key: "k".to_string(),
            text: text.to_string(),
            elapsed: Duration::from_millis(1200),
        }
    }

    #[test]
    fn test_transcript_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions").join("p-values.md");

        let mut writer = TranscriptWriter::create(&path, &SessionParameters::default()).unwrap();
        let first = output(1, "Introduction", "P-values measure surprise.\n");
        let second = output(2, "Key Concepts", "1. Null hypothesis");
        writer.write_section(&first).unwrap();
        writer.write_section(&second).unwrap();

        let mut stats = RunStats::new("echo", "gpt-4");
        stats.record(&first);
        stats.record(&second);
        stats.duration = Duration::from_millis(2500);
        let written = writer.finish(&stats).unwrap();

        let content = fs::read_to_string(written).unwrap();
        assert!(content.starts_with("# p-values in Data Analytics"));
        assert!(content.contains("- Learner: Raj (Novice)"));
        assert!(content.contains("## Section 1: Introduction\n\nP-values measure surprise.\n"));
        assert!(content.contains("## Section 2: Key Concepts"));
        assert!(content.contains("| 2 | Key Concepts | 1.20 |"));
        assert!(content.contains("Total time: 2.50s"));
    }

    #[test]
    fn test_sections_flushed_incrementally() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.md");

        let mut writer = TranscriptWriter::create(&path, &SessionParameters::default()).unwrap();
        writer
            .write_section(&output(1, "Introduction", "hello"))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("## Section 1: Introduction"));
    }
}

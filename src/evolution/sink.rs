//! Per-generation statistics output.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::schema::GenerationRecord;

/// Receives one record per completed generation.
pub trait StatisticsSink: Send {
    fn record(&mut self, record: &GenerationRecord) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes each record as one line of JSON.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<BufWriter<File>> {
    /// Create (or truncate) a file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> StatisticsSink for JsonLinesSink<W> {
    fn record(&mut self, record: &GenerationRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ComplexityRegulationMode;
    use std::io::{BufRead, BufReader};

    fn record(generation: u64) -> GenerationRecord {
        GenerationRecord {
            generation,
            population_size: 10,
            specie_count: 2,
            evaluation_count: generation * 10,
            best_fitness: 1.5,
            mean_fitness: 0.5,
            min_complexity: 1.0,
            max_complexity: 4.0,
            mean_complexity: 2.0,
            mode: ComplexityRegulationMode::Complexifying,
        }
    }

    #[test]
    fn test_one_line_per_record() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.record(&record(1)).unwrap();
        sink.record(&record(2)).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: GenerationRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, record(2));
    }

    #[test]
    fn test_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.jsonl");
        {
            let mut sink = JsonLinesSink::create(&path).unwrap();
            for generation in 0..3 {
                sink.record(&record(generation)).unwrap();
            }
            sink.flush().unwrap();
        }

        let reader = BufReader::new(File::open(&path).unwrap());
        let generations: Vec<u64> = reader
            .lines()
            .map(|line| serde_json::from_str::<GenerationRecord>(&line.unwrap()).unwrap().generation)
            .collect();
        assert_eq!(generations, vec![0, 1, 2]);
    }
}

//! Length-framed record files.
//!
//! Each category gets its own append-only file. A file is a plain sequence
//! of frames:
//!
//! ```text
//! [u64 little-endian payload length][bincode-encoded OutputRecord]
//! ```
//!
//! Frames are independent, so a reader can stop at any boundary.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::{Error, Result};

/// File extension used for record files.
pub const RECORD_EXTENSION: &str = "rec";

/// One labeled training patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Grayscale pixels, row-major.
    pub image: Vec<u8>,
    pub label: [i64; Category::LABEL_LEN],
}

impl OutputRecord {
    pub fn new(image: Vec<u8>, category: Category) -> Self {
        Self {
            image,
            label: category.label(),
        }
    }

    pub fn category(&self) -> Option<Category> {
        Category::from_label(&self.label)
    }
}

/// Path of the record file for `category` inside `dir`.
pub fn record_path(dir: &Path, category: Category) -> PathBuf {
    dir.join(format!("{}.{}", category.name(), RECORD_EXTENSION))
}

/// Appends framed records to a byte sink.
pub struct RecordWriter<W: Write> {
    writer: W,
    count: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, count: 0 }
    }

    pub fn write(&mut self, record: &OutputRecord) -> Result<()> {
        let bytes = bincode::serialize(record)?;
        self.writer.write_all(&(bytes.len() as u64).to_le_bytes())?;
        self.writer.write_all(&bytes)?;
        self.count += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Reads framed records back, one per iteration.
pub struct RecordReader<R: Read> {
    reader: R,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    /// Fill `buf` completely, or report how many bytes were available.
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    /// Read the next record. Returns `None` at a clean end of stream.
    pub fn read_record(&mut self) -> Result<Option<OutputRecord>> {
        let mut len_buf = [0u8; 8];
        match self.read_full(&mut len_buf)? {
            0 => return Ok(None),
            8 => {}
            n => {
                return Err(Error::TruncatedRecord {
                    expected: 8,
                    found: n as u64,
                })
            }
        }

        let len = u64::from_le_bytes(len_buf);
        let mut payload = Vec::new();
        let found = (&mut self.reader).take(len).read_to_end(&mut payload)? as u64;
        if found < len {
            return Err(Error::TruncatedRecord {
                expected: len,
                found,
            });
        }

        Ok(Some(bincode::deserialize(&payload)?))
    }
}

impl RecordReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<OutputRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.read_record().transpose();
        // Stop after the end of stream or the first error.
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// One open writer per category.
///
/// Buffered data is flushed by [`RecordSink::finish`]; if the sink is
/// dropped early (for example when an error propagates) the buffered
/// writers still flush on drop.
pub struct RecordSink<W: Write = BufWriter<File>> {
    writers: [RecordWriter<W>; 5],
}

impl<W: Write> RecordSink<W> {
    /// Build a sink from a writer factory called once per category, in
    /// [`Category::ALL`] order.
    pub fn from_fn<F>(mut make: F) -> Result<Self>
    where
        F: FnMut(Category) -> Result<W>,
    {
        let [a, b, c, d, e] = Category::ALL;
        Ok(Self {
            writers: [
                RecordWriter::new(make(a)?),
                RecordWriter::new(make(b)?),
                RecordWriter::new(make(c)?),
                RecordWriter::new(make(d)?),
                RecordWriter::new(make(e)?),
            ],
        })
    }

    pub fn write(&mut self, category: Category, record: &OutputRecord) -> Result<()> {
        self.writers[category.index()].write(record)
    }

    pub fn count(&self, category: Category) -> usize {
        self.writers[category.index()].count()
    }

    pub fn flush(&mut self) -> Result<()> {
        for writer in &mut self.writers {
            writer.flush()?;
        }
        Ok(())
    }

    /// Flush every stream and hand back the underlying writers.
    pub fn finish(mut self) -> Result<[W; 5]> {
        self.flush()?;
        Ok(self.writers.map(RecordWriter::into_inner))
    }
}

impl RecordSink<BufWriter<File>> {
    /// Create (or truncate) one record file per category in `dir`.
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Self::from_fn(|category| {
            let file = File::create(record_path(dir, category))?;
            Ok(BufWriter::new(file))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(category: Category, fill: u8) -> OutputRecord {
        OutputRecord::new(vec![fill; 54], category)
    }

    #[test]
    fn frames_are_length_prefixed() {
        let mut writer = RecordWriter::new(Vec::<u8>::new());
        writer.write(&sample(Category::Nose, 3)).unwrap();
        let bytes = writer.into_inner();

        let len = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
        assert_eq!(bytes.len(), 8 + len);
    }

    #[test]
    fn reads_back_in_order() {
        let mut writer = RecordWriter::new(Vec::<u8>::new());
        writer.write(&sample(Category::LeftEye, 1)).unwrap();
        writer.write(&sample(Category::Negative, 2)).unwrap();
        assert_eq!(writer.count(), 2);

        let bytes = writer.into_inner();
        let records: Vec<_> = RecordReader::new(bytes.as_slice())
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].category(), Some(Category::LeftEye));
        assert_eq!(records[0].image, vec![1; 54]);
        assert_eq!(records[1].label, [0, 0, 0, 0]);
    }

    #[test]
    fn empty_stream_has_no_records() {
        let mut reader = RecordReader::new(&[0u8; 0][..]);
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn truncated_payload_is_reported() {
        let mut writer = RecordWriter::new(Vec::<u8>::new());
        writer.write(&sample(Category::Mouth, 9)).unwrap();
        let mut bytes = writer.into_inner();
        bytes.truncate(bytes.len() - 5);

        let mut reader = RecordReader::new(bytes.as_slice());
        assert!(matches!(
            reader.read_record(),
            Err(Error::TruncatedRecord { .. })
        ));
    }

    #[test]
    fn truncated_header_is_reported() {
        let mut reader = RecordReader::new(&[1u8, 2, 3][..]);
        assert!(matches!(
            reader.read_record(),
            Err(Error::TruncatedRecord {
                expected: 8,
                found: 3
            })
        ));
    }

    #[test]
    fn sink_routes_by_category() {
        let mut sink = RecordSink::from_fn(|_| Ok(Vec::<u8>::new())).unwrap();
        sink.write(Category::Nose, &sample(Category::Nose, 1)).unwrap();
        sink.write(Category::Nose, &sample(Category::Nose, 2)).unwrap();
        sink.write(Category::Mouth, &sample(Category::Mouth, 3)).unwrap();

        assert_eq!(sink.count(Category::Nose), 2);
        assert_eq!(sink.count(Category::Mouth), 1);
        assert_eq!(sink.count(Category::Negative), 0);

        let buffers = sink.finish().unwrap();
        let nose: Vec<_> = RecordReader::new(buffers[Category::Nose.index()].as_slice())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(nose.len(), 2);
        assert!(buffers[Category::LeftEye.index()].is_empty());
    }

    #[test]
    fn record_file_names() {
        let path = record_path(Path::new("/out"), Category::RightEye);
        assert_eq!(path, PathBuf::from("/out/right_eye.rec"));
    }
}

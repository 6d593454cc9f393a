//! Loader for the UMDFaces annotation database.
//!
//! The database is split into three batches, each living in its own folder
//! under a common root:
//!
//! ```text
//! <root>/umdfaces_batch1/umdfaces_batch1_ultraface.csv
//! <root>/umdfaces_batch1/<subject>/<image>.jpg
//! <root>/umdfaces_batch2/...
//! <root>/umdfaces_batch3/...
//! ```
//!
//! Every CSV row describes one face. Only the columns needed for crop
//! generation are read; the rest are ignored.
//!
//! # Example
//!
//! ```ignore
//! use landmark_crops::{AnnotationStore, Batch};
//!
//! let store = AnnotationStore::open("/data/umdfaces")?;
//! println!("{} faces", store.size());
//! for face in store.faces(&[Batch::One]) {
//!     println!("{}", face.path.display());
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{BoundingBox, Landmark, Orientation};

/// One of the three fixed partitions of the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Batch {
    One,
    Two,
    Three,
}

impl Batch {
    pub const ALL: [Batch; 3] = [Batch::One, Batch::Two, Batch::Three];

    pub const fn number(self) -> u8 {
        match self {
            Batch::One => 1,
            Batch::Two => 2,
            Batch::Three => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.number() == n)
    }

    /// Folder holding this batch's images and annotation file.
    pub fn folder_name(self) -> String {
        format!("umdfaces_batch{}", self.number())
    }

    pub fn annotation_file_name(self) -> String {
        format!("{}_ultraface.csv", self.folder_name())
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl FromStr for Batch {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Batch::from_number)
            .ok_or_else(|| Error::UnknownBatch(s.to_string()))
    }
}

/// One face instance observed in one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Image location, already joined with the batch folder.
    pub path: PathBuf,
    pub batch: Batch,
    pub subject: String,
    pub orientation: Orientation,
    pub bbox: BoundingBox,
    pub left_eye: Landmark,
    pub right_eye: Landmark,
    pub nose: Landmark,
    pub left_mouth: Landmark,
    pub right_mouth: Landmark,
}

/// Raw CSV row. Landmark numbering follows the UMDFaces 21-point scheme.
#[derive(Debug, Deserialize)]
struct AnnotationRow {
    #[serde(rename = "SUBJECT_ID")]
    subject_id: String,
    #[serde(rename = "FILE")]
    file: String,

    #[serde(rename = "FACE_X")]
    face_x: f64,
    #[serde(rename = "FACE_Y")]
    face_y: f64,
    #[serde(rename = "FACE_WIDTH")]
    face_width: f64,
    #[serde(rename = "FACE_HEIGHT")]
    face_height: f64,

    #[serde(rename = "ROLL")]
    roll: f64,
    #[serde(rename = "PITCH")]
    pitch: f64,
    #[serde(rename = "YAW")]
    yaw: f64,

    #[serde(rename = "P8X")]
    p8x: f64,
    #[serde(rename = "P8Y")]
    p8y: f64,
    #[serde(rename = "VIS8")]
    vis8: f64,

    #[serde(rename = "P11X")]
    p11x: f64,
    #[serde(rename = "P11Y")]
    p11y: f64,
    #[serde(rename = "VIS11")]
    vis11: f64,

    #[serde(rename = "P15X")]
    p15x: f64,
    #[serde(rename = "P15Y")]
    p15y: f64,
    #[serde(rename = "VIS15")]
    vis15: f64,

    #[serde(rename = "P18X")]
    p18x: f64,
    #[serde(rename = "P18Y")]
    p18y: f64,
    #[serde(rename = "VIS18")]
    vis18: f64,

    #[serde(rename = "P20X")]
    p20x: f64,
    #[serde(rename = "P20Y")]
    p20y: f64,
    #[serde(rename = "VIS20")]
    vis20: f64,
}

impl AnnotationRow {
    fn into_annotation(self, batch: Batch, batch_dir: &Path) -> Annotation {
        Annotation {
            path: batch_dir.join(&self.file),
            batch,
            subject: self.subject_id,
            orientation: Orientation::new(self.roll, self.pitch, self.yaw),
            bbox: BoundingBox::new(self.face_x, self.face_y, self.face_width, self.face_height),
            left_eye: Landmark::new(self.p8x, self.p8y, self.vis8),
            right_eye: Landmark::new(self.p11x, self.p11y, self.vis11),
            nose: Landmark::new(self.p15x, self.p15y, self.vis15),
            left_mouth: Landmark::new(self.p18x, self.p18y, self.vis18),
            right_mouth: Landmark::new(self.p20x, self.p20y, self.vis20),
        }
    }
}

/// Parse one batch's annotation CSV.
///
/// `batch_dir` is the folder image paths are resolved against. Rows come back
/// in file order.
pub fn parse_annotations<R: Read>(
    reader: R,
    batch: Batch,
    batch_dir: &Path,
) -> Result<Vec<Annotation>> {
    let source = batch_dir.join(batch.annotation_file_name());
    let csv_err = |source_err: csv::Error| Error::Csv {
        path: source.clone(),
        source: source_err,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut annotations = Vec::new();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record).map_err(csv_err)? {
        let row: AnnotationRow = record.deserialize(Some(&headers)).map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());

        if !(row.face_width > 0.0 && row.face_height > 0.0) {
            return Err(Error::InvalidAnnotation {
                path: source.clone(),
                line,
                reason: format!(
                    "face box must have positive size, got {}x{}",
                    row.face_width, row.face_height
                ),
            });
        }

        annotations.push(row.into_annotation(batch, batch_dir));
    }

    Ok(annotations)
}

/// All annotations of one subject, in CSV row order.
#[derive(Debug, Clone, Default)]
pub struct SubjectGroup {
    pub id: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Default)]
struct BatchData {
    /// Subjects in order of first appearance.
    subjects: Vec<SubjectGroup>,
    len: usize,
}

impl BatchData {
    fn from_annotations(annotations: Vec<Annotation>) -> Self {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut subjects: Vec<SubjectGroup> = Vec::new();
        let len = annotations.len();

        for annotation in annotations {
            let slot = *index.entry(annotation.subject.clone()).or_insert_with(|| {
                subjects.push(SubjectGroup {
                    id: annotation.subject.clone(),
                    annotations: Vec::new(),
                });
                subjects.len() - 1
            });
            subjects[slot].annotations.push(annotation);
        }

        Self { subjects, len }
    }
}

/// In-memory copy of every annotation in the database, grouped by batch and
/// subject. Built once, then only read.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    root: PathBuf,
    batches: [BatchData; 3],
    size: usize,
}

impl AnnotationStore {
    /// Load all three batches under `root`.
    ///
    /// Any missing file, missing column or malformed row aborts the load.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut batches: [BatchData; 3] = Default::default();
        let mut size = 0;

        for batch in Batch::ALL {
            let batch_dir = root.join(batch.folder_name());
            let path = batch_dir.join(batch.annotation_file_name());
            if !path.is_file() {
                return Err(Error::MissingAnnotationFile {
                    batch: batch.number(),
                    path,
                });
            }

            let file = File::open(&path)?;
            let annotations = parse_annotations(file, batch, &batch_dir)?;
            let data = BatchData::from_annotations(annotations);
            log::info!(
                "Loaded batch {}: {} faces across {} subjects",
                batch,
                data.len,
                data.subjects.len()
            );

            size += data.len;
            batches[batch.index()] = data;
        }

        Ok(Self {
            root,
            batches,
            size,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Total number of parsed rows across every batch.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn batch_len(&self, batch: Batch) -> usize {
        self.batches[batch.index()].len
    }

    pub fn subject_count(&self, batch: Batch) -> usize {
        self.batches[batch.index()].subjects.len()
    }

    pub fn subjects(&self, batch: Batch) -> &[SubjectGroup] {
        &self.batches[batch.index()].subjects
    }

    /// Walk the annotations of the given batches: batch by batch, subject by
    /// subject, then row order. Calling it again starts over.
    pub fn faces<'a>(&'a self, batches: &'a [Batch]) -> impl Iterator<Item = &'a Annotation> + 'a {
        batches
            .iter()
            .flat_map(move |batch| self.subjects(*batch).iter())
            .flat_map(|subject| subject.annotations.iter())
    }

    pub fn faces_all(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.faces(&Batch::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "SUBJECT_ID,FILE,FACE_X,FACE_Y,FACE_WIDTH,FACE_HEIGHT,YAW,PITCH,ROLL,\
        P8X,P8Y,VIS8,P11X,P11Y,VIS11,P15X,P15Y,VIS15,P18X,P18Y,VIS18,P20X,P20Y,VIS20,GENDER";

    fn row(subject: &str, file: &str, x: f64) -> String {
        format!(
            "{subject},{file},{x},100.25,70,71.5,-3.5,2,1.125,\
             120,115,0.9,150,115.5,0.8,135,130,0.3,125,150,0.95,145,150,0.7,male"
        )
    }

    fn parse(body: &str) -> Result<Vec<Annotation>> {
        parse_annotations(body.as_bytes(), Batch::Two, Path::new("/db/umdfaces_batch2"))
    }

    #[test]
    fn parses_named_columns() {
        let csv = format!("{HEADER}\n{}\n", row("17", "17/a.jpg", 100.5));
        let annotations = parse(&csv).unwrap();
        assert_eq!(annotations.len(), 1);

        let a = &annotations[0];
        assert_eq!(a.path, PathBuf::from("/db/umdfaces_batch2/17/a.jpg"));
        assert_eq!(a.batch, Batch::Two);
        assert_eq!(a.subject, "17");
        assert_eq!(a.bbox, BoundingBox::new(100.5, 100.25, 70.0, 71.5));
        assert_eq!(a.orientation, Orientation::new(1.125, 2.0, -3.5));
        assert_eq!(a.left_eye, Landmark::new(120.0, 115.0, 0.9));
        assert_eq!(a.right_eye, Landmark::new(150.0, 115.5, 0.8));
        assert_eq!(a.nose, Landmark::new(135.0, 130.0, 0.3));
        assert_eq!(a.left_mouth, Landmark::new(125.0, 150.0, 0.95));
        assert_eq!(a.right_mouth, Landmark::new(145.0, 150.0, 0.7));
    }

    #[test]
    fn keeps_full_float_precision() {
        let csv = format!("{HEADER}\n{}\n", row("1", "1/a.jpg", 123.456789012345));
        let annotations = parse(&csv).unwrap();
        assert_eq!(annotations[0].bbox.x, 123.456789012345);
    }

    #[test]
    fn missing_column_is_an_error() {
        let header = HEADER.replace("VIS15,", "");
        let body = row("1", "1/a.jpg", 1.0).replacen(",0.3,", ",", 1);
        let csv = format!("{header}\n{body}\n");
        let err = parse(&csv).unwrap_err();
        assert!(matches!(err, Error::Csv { .. }), "got {err:?}");
    }

    #[test]
    fn non_numeric_field_is_an_error() {
        let csv = format!("{HEADER}\n{}\n", row("1", "1/a.jpg", 1.0).replace("100.25", "abc"));
        assert!(matches!(parse(&csv), Err(Error::Csv { .. })));
    }

    #[test]
    fn rejects_empty_face_box() {
        let body = row("1", "1/a.jpg", 1.0).replace(",70,", ",0,");
        let csv = format!("{HEADER}\n{}\n{body}\n", row("1", "1/b.jpg", 1.0));
        match parse(&csv) {
            Err(Error::InvalidAnnotation { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected InvalidAnnotation, got {other:?}"),
        }
    }

    #[test]
    fn groups_subjects_in_first_seen_order() {
        let csv = format!(
            "{HEADER}\n{}\n{}\n{}\n{}\n",
            row("9", "9/a.jpg", 1.0),
            row("3", "3/a.jpg", 2.0),
            row("9", "9/b.jpg", 3.0),
            row("3", "3/b.jpg", 4.0),
        );
        let data = BatchData::from_annotations(parse(&csv).unwrap());

        assert_eq!(data.len, 4);
        let ids: Vec<_> = data.subjects.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["9", "3"]);

        let xs: Vec<_> = data.subjects[0].annotations.iter().map(|a| a.bbox.x).collect();
        assert_eq!(xs, [1.0, 3.0]);
        let xs: Vec<_> = data.subjects[1].annotations.iter().map(|a| a.bbox.x).collect();
        assert_eq!(xs, [2.0, 4.0]);
    }

    #[test]
    fn batch_parsing() {
        assert_eq!("2".parse::<Batch>().unwrap(), Batch::Two);
        assert_eq!(" 3 ".parse::<Batch>().unwrap(), Batch::Three);
        assert!("4".parse::<Batch>().is_err());
        assert!("one".parse::<Batch>().is_err());
        assert_eq!(Batch::One.annotation_file_name(), "umdfaces_batch1_ultraface.csv");
    }
}

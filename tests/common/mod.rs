#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{GrayImage, Luma};
use landmark_crops::Batch;

pub const HEADER: &str = "SUBJECT_ID,FILE,FACE_X,FACE_Y,FACE_WIDTH,FACE_HEIGHT,YAW,PITCH,ROLL,\
P8X,P8Y,VIS8,P11X,P11Y,VIS11,P15X,P15Y,VIS15,P18X,P18Y,VIS18,P20X,P20Y,VIS20";

/// Row with the reference face: box (100, 100, 70, 70), eyes and mouth
/// visible, nose below threshold.
pub fn reference_row(subject: &str, file: &str) -> String {
    format!(
        "{subject},{file},100,100,70,70,0,0,0,\
         120,115,0.9,150,115,0.9,135,130,0.3,125,150,0.9,145,150,0.9"
    )
}

/// Write a 300x300 gradient PNG at `path`, creating parent folders.
pub fn write_image(path: &Path) {
    fs::create_dir_all(path.parent().expect("image has a parent")).expect("create image dir");
    let img = GrayImage::from_fn(300, 300, |x, y| Luma([((x + 2 * y) % 256) as u8]));
    img.save(path).expect("save image");
}

/// Create a database under `root` with the given rows per batch. Every
/// `FILE` referenced by a row gets a real image.
pub fn write_database(root: &Path, rows: &[(Batch, Vec<(&str, &str)>)]) {
    for (batch, entries) in rows {
        let dir = root.join(batch.folder_name());
        fs::create_dir_all(&dir).expect("create batch dir");

        let mut csv = String::from(HEADER);
        csv.push('\n');
        for (subject, file) in entries {
            csv.push_str(&reference_row(subject, file));
            csv.push('\n');
            write_image(&dir.join(file));
        }
        fs::write(dir.join(batch.annotation_file_name()), csv).expect("write csv");
    }
}

/// Database with faces spread over every batch:
/// batch 1 has subjects 7 and 2, batch 2 one face, batch 3 none.
pub fn small_database(root: &Path) {
    write_database(
        root,
        &[
            (
                Batch::One,
                vec![("7", "7/a.png"), ("2", "2/a.png"), ("7", "7/b.png")],
            ),
            (Batch::Two, vec![("11", "11/a.png")]),
            (Batch::Three, vec![]),
        ],
    );
}

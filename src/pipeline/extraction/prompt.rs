use crate::pipeline::model::Schema;

/// Instruction sent with every test paper image.
pub const EXTRACTION_PROMPT: &str = "\
This image is a photographed or scanned Vietnamese test paper. \
Find the student's full name (họ và tên / tên học sinh) and the final score (điểm) written on it. \
Return the name exactly as written, with Vietnamese diacritics, in the field ten_hoc_sinh. \
Return the score exactly as written, without units or comments, in the field diem_so. \
If a value cannot be read, return an empty string for that field.";

/// Response contract: `{ten_hoc_sinh: string, diem_so: string}`.
pub fn score_schema() -> Schema {
    Schema::object(vec![
        ("ten_hoc_sinh", Schema::String, true),
        ("diem_so", Schema::String, true),
    ])
}

use std::io::{Read, Write};
use std::path::PathBuf;

use crate::models::FeatureRecord;
use crate::normalize::{FieldError, FEATURE_COLUMNS};

pub const PROBABILITY_COLUMN: &str = "pred_probability";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("cannot create {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unexpected header: {0}")]
    Header(String),
    #[error("export contains no data row")]
    MissingRow,
    #[error("export holds {0} data rows, expected exactly one")]
    ExtraRows(usize),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("cannot parse probability {0:?}")]
    Probability(String),
}

pub fn export_header() -> Vec<&'static str> {
    let mut header = FEATURE_COLUMNS.to_vec();
    header.push(PROBABILITY_COLUMN);
    header
}

/// Write one header row and one data row.
pub fn write_export<W: Write>(
    writer: W,
    features: &FeatureRecord,
    probability: f64,
) -> Result<(), ExportError> {
    write_export_rows(writer, std::iter::once((features, probability)))
}

/// Same layout as [`write_export`], one data row per record.
pub fn write_export_rows<'a, W, I>(writer: W, rows: I) -> Result<(), ExportError>
where
    W: Write,
    I: IntoIterator<Item = (&'a FeatureRecord, f64)>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(export_header())?;

    for (features, probability) in rows {
        let mut row = features.to_fields();
        row.push(probability.to_string());
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn parse_export<R: Read>(reader: R) -> Result<(FeatureRecord, f64), ExportError> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let expected = export_header();
    if headers.iter().ne(expected.iter().copied()) {
        return Err(ExportError::Header(headers.iter().collect::<Vec<_>>().join(",")));
    }

    let mut records = csv_reader.records();
    let record = records.next().ok_or(ExportError::MissingRow)??;
    let extra = records.count();
    if extra > 0 {
        return Err(ExportError::ExtraRows(extra + 1));
    }

    let fields: Vec<&str> = record.iter().collect();
    let (probability, features) = fields
        .split_last()
        .ok_or(ExportError::MissingRow)?;
    let features = FeatureRecord::from_fields(features)?;
    let probability = probability
        .trim()
        .parse::<f64>()
        .map_err(|_| ExportError::Probability(probability.to_string()))?;

    Ok((features, probability))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawSubmission;
    use crate::normalize::normalize;

    fn export_to_string(features: &FeatureRecord, probability: f64) -> String {
        let mut buffer = Vec::new();
        write_export(&mut buffer, features, probability).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn batch_rows_share_one_header() {
        let first = normalize(&RawSubmission::default());
        let second = normalize(&RawSubmission::demo());
        let mut buffer = Vec::new();
        write_export_rows(&mut buffer, [(&first, 0.1), (&second, 0.9)]).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(2).unwrap().starts_with("123,"));
    }

    #[test]
    fn multi_row_file_is_not_a_single_export() {
        let first = normalize(&RawSubmission::default());
        let second = normalize(&RawSubmission::demo());
        let mut buffer = Vec::new();
        write_export_rows(&mut buffer, [(&first, 0.1), (&second, 0.9)]).unwrap();

        assert!(matches!(
            parse_export(buffer.as_slice()),
            Err(ExportError::ExtraRows(2))
        ));
    }

    #[test]
    fn export_has_header_and_one_row() {
        let features = normalize(&RawSubmission::demo());
        let text = export_to_string(&features, 0.73);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,Gender,Age,City,Profession,"));
        assert!(lines[0].ends_with(",Family History of Mental Illness,pred_probability"));
        assert_eq!(
            lines[1],
            "123,1,21,Indore,Student,4,3,7.8,2,1,5.5,0,B.Tech,0,25,3,0,0.73"
        );
    }

    #[test]
    fn export_parses_back() {
        let raw = RawSubmission {
            city: "New Delhi, IN".to_string(),
            ..RawSubmission::demo()
        };
        let features = normalize(&raw);
        let text = export_to_string(&features, 0.4127);

        let (parsed, probability) = parse_export(text.as_bytes()).unwrap();
        assert_eq!(parsed, features);
        assert!((probability - 0.4127).abs() < 0.005);
    }

    #[test]
    fn rejects_foreign_header() {
        let text = "id,Gender\n1,0\n";
        assert!(matches!(parse_export(text.as_bytes()), Err(ExportError::Header(_))));
    }

    #[test]
    fn rejects_header_only() {
        let text = format!("{}\n", export_header().join(","));
        assert!(matches!(parse_export(text.as_bytes()), Err(ExportError::MissingRow)));
    }

    #[test]
    fn rejects_bad_probability() {
        let features = normalize(&RawSubmission::demo());
        let text = export_to_string(&features, 0.5).replace(",0.5\n", ",half\n");
        assert!(matches!(
            parse_export(text.as_bytes()),
            Err(ExportError::Probability(value)) if value == "half"
        ));
    }
}

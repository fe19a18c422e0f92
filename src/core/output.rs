use crate::domain::model::{AddressOutcome, ZipSummary};
use crate::utils::error::Result;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const SUMMARY_HEADER: [&str; 3] = ["ZipCode", " Has Layer", " No Layers"];

/// 完整的逐筆結果（含失敗），兩格縮排 JSON
pub fn render_results_json(results: &[AddressOutcome]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// 郵遞區號彙總表
///
/// 標頭固定為 `ZipCode, Has Layer, No Layers`，資料列依彙總的桶順序輸出，
/// 最後一列不帶換行。缺少郵遞區號的桶輸出為空欄位。
pub fn render_summary_csv(summary: &ZipSummary) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SUMMARY_HEADER)?;

    for (zip, counts) in summary.iter() {
        writer.write_record([
            zip.unwrap_or_default().to_string(),
            counts.layers.to_string(),
            counts.no_layers.to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.trim_end_matches('\n').to_string())
}

/// 將多個輸出檔打包成 ZIP
pub fn build_archive(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, data) in entries {
        zip.start_file::<_, ()>(*name, FileOptions::default())?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::aggregate;
    use crate::domain::model::{FailedAddress, LayerQueryResult};
    use std::io::Read;

    fn reference_results() -> Vec<AddressOutcome> {
        vec![
            AddressOutcome::Matched(LayerQueryResult {
                address: "3631 Beta St, San Diego, CA 92113".to_string(),
                zip: Some("92113".to_string()),
                lat: 32.70,
                lon: -117.12,
                layers: vec![
                    "Disadvantaged_Communities_TribalLands".to_string(),
                    "Low_income_Communities".to_string(),
                ],
            }),
            AddressOutcome::Failed(FailedAddress {
                address: "bogus unresolvable address".to_string(),
                error: "Address not found: bogus unresolvable address".to_string(),
            }),
        ]
    }

    #[test]
    fn test_summary_csv_matches_reference_output() {
        let csv = render_summary_csv(&aggregate(&reference_results())).unwrap();
        assert_eq!(csv, "ZipCode, Has Layer, No Layers\n92113,1,0");
    }

    #[test]
    fn test_summary_csv_is_header_only_when_everything_failed() {
        let results = vec![reference_results().remove(1)];
        let csv = render_summary_csv(&aggregate(&results)).unwrap();
        assert_eq!(csv, "ZipCode, Has Layer, No Layers");
    }

    #[test]
    fn test_missing_zip_renders_as_empty_field() {
        let results = vec![AddressOutcome::Matched(LayerQueryResult {
            address: "a".to_string(),
            zip: None,
            lat: 0.0,
            lon: 0.0,
            layers: vec![],
        })];
        let csv = render_summary_csv(&aggregate(&results)).unwrap();
        assert_eq!(csv, "ZipCode, Has Layer, No Layers\n,0,1");
    }

    #[test]
    fn test_missing_and_blank_zip_render_as_single_row() {
        let result = |zip: Option<&str>| {
            AddressOutcome::Matched(LayerQueryResult {
                address: "a".to_string(),
                zip: zip.map(str::to_string),
                lat: 0.0,
                lon: 0.0,
                layers: vec![],
            })
        };
        let results = vec![result(None), result(Some("")), result(Some("92113"))];

        let csv = render_summary_csv(&aggregate(&results)).unwrap();
        assert_eq!(csv, "ZipCode, Has Layer, No Layers\n,0,2\n92113,0,1");
    }

    #[test]
    fn test_results_json_keeps_error_entries() {
        let json = render_results_json(&reference_results()).unwrap();
        let parsed: Vec<AddressOutcome> = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, reference_results());
        assert!(json.contains("\"error\": \"Address not found: bogus unresolvable address\""));
        assert!(json.contains("\n  {\n    \"address\""));
    }

    #[test]
    fn test_archive_contains_every_entry() {
        let archive = build_archive(&[
            ("results.json", b"[]".as_slice()),
            ("results.csv", b"ZipCode, Has Layer, No Layers".as_slice()),
        ])
        .unwrap();

        let mut zip = zip::ZipArchive::new(std::io::Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 2);

        let mut csv = String::new();
        zip.by_name("results.csv").unwrap().read_to_string(&mut csv).unwrap();
        assert_eq!(csv, "ZipCode, Has Layer, No Layers");
    }
}

use crate::config::toml_config::ZipNormalization;
use crate::domain::model::{AddressOutcome, ZipSummary};

/// 依郵遞區號彙總：有圖層 / 無圖層的地址數，略過失敗的地址
pub fn aggregate(results: &[AddressOutcome]) -> ZipSummary {
    aggregate_with(results, ZipNormalization::Raw)
}

pub fn aggregate_with(results: &[AddressOutcome], normalization: ZipNormalization) -> ZipSummary {
    let mut summary = ZipSummary::new();

    for result in results {
        let AddressOutcome::Matched(matched) = result else {
            continue;
        };

        // 空白郵遞區號與缺少郵遞區號併入同一桶，CSV 中才不會出現兩列空欄位
        let key = matched
            .zip
            .as_deref()
            .filter(|zip| !zip.trim().is_empty())
            .map(|zip| normalize_zip(zip, normalization));
        let bucket = summary.bucket_mut(key);
        if matched.layers.is_empty() {
            bucket.no_layers += 1;
        } else {
            bucket.layers += 1;
        }
    }

    summary
}

pub fn normalize_zip(zip: &str, normalization: ZipNormalization) -> String {
    match normalization {
        ZipNormalization::Raw => zip.to_string(),
        ZipNormalization::FiveDigit => {
            let trimmed = zip.trim();
            // 只處理 ZIP+4 形式，其他格式原樣保留
            match trimmed.split_once('-') {
                Some((head, tail))
                    if head.len() == 5
                        && head.chars().all(|c| c.is_ascii_digit())
                        && tail.chars().all(|c| c.is_ascii_digit()) =>
                {
                    head.to_string()
                }
                _ => trimmed.to_string(),
            }
        }
    }
}

//! Product export to CSV files under the data directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::format::{cell_text, first_present, PRODUCT_FIELDS};
use crate::ingest::IngestError;

/// Column titles, in write order. `ID` comes from the product itself.
pub const PRODUCT_CSV_HEADER: [&str; 11] = [
    "ID",
    "Nome",
    "Descrição",
    "Preço",
    "Categoria",
    "Marca",
    "Estoque",
    "Ativo",
    "SKU",
    "Data de Criação",
    "Data de Atualização",
];

/// Where an export landed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExportResult {
    pub filename: String,
    pub path: String,
    pub total: usize,
}

/// `produtos_<RFC 3339 timestamp>.csv` with `:` and `.` replaced by `-`.
pub fn export_filename() -> String {
    let stamp = Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("produtos_{}.csv", stamp)
}

/// Flatten one product into a CSV row.
///
/// Attributes are read from `product.attributes` when present, otherwise
/// from the product object itself.
pub fn product_row(product: &Value) -> Vec<String> {
    let attributes = match product.get("attributes") {
        Some(Value::Object(map)) => Some(map),
        _ => product.as_object(),
    };

    let mut row = Vec::with_capacity(PRODUCT_CSV_HEADER.len());
    row.push(cell_text(product.get("id")));
    for (_, aliases) in PRODUCT_FIELDS {
        row.push(cell_text(attributes.and_then(|a| first_present(a, aliases))));
    }
    row
}

/// Write `products` to `data_dir/filename`, creating the directory.
pub fn write_products_csv(
    data_dir: impl AsRef<Path>,
    filename: &str,
    products: &[Value],
) -> Result<ExportResult, IngestError> {
    let dir = data_dir.as_ref();
    fs::create_dir_all(dir)?;

    let path: PathBuf = dir.join(filename);
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(PRODUCT_CSV_HEADER)?;
    for product in products {
        writer.write_record(product_row(product))?;
    }
    writer.flush()?;

    let result = ExportResult {
        filename: filename.to_string(),
        path: path.display().to_string(),
        total: products.len(),
    };

    info!(
        filename = %result.filename,
        path = %result.path,
        total = result.total,
        "products_exported"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filename_shape() {
        let name = export_filename();
        assert!(name.starts_with("produtos_"));
        assert!(name.ends_with(".csv"));
        let stamp = &name["produtos_".len()..name.len() - ".csv".len()];
        assert!(!stamp.contains(':'));
        assert!(!stamp.contains('.'));
    }

    #[test]
    fn test_row_reads_nested_attributes() {
        let product = json!({
            "id": 7,
            "attributes": {
                "name": "Painel Solar 550W",
                "preco": 899.9,
                "brand": "Sunny",
                "sku": "PS-550",
                "active": true
            }
        });
        let row = product_row(&product);

        assert_eq!(row.len(), PRODUCT_CSV_HEADER.len());
        assert_eq!(row[0], "7");
        assert_eq!(row[1], "Painel Solar 550W");
        assert_eq!(row[3], "899.9");
        assert_eq!(row[5], "Sunny");
        assert_eq!(row[7], "true");
        assert_eq!(row[8], "PS-550");
        assert_eq!(row[2], "");
    }

    #[test]
    fn test_row_reads_flat_product() {
        let row = product_row(&json!({"id": "a1", "nome": "Inversor", "estoque": 12}));
        assert_eq!(row[0], "a1");
        assert_eq!(row[1], "Inversor");
        assert_eq!(row[6], "12");
    }

    #[test]
    fn test_write_creates_dir_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("data");
        let products = vec![
            json!({"id": 1, "attributes": {"nome": "A, com vírgula"}}),
            json!({"id": 2, "attributes": {"nome": "B"}}),
        ];

        let result = write_products_csv(&dir, "produtos_test.csv", &products).unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.filename, "produtos_test.csv");

        let mut reader = csv::Reader::from_path(dir.join("produtos_test.csv")).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, PRODUCT_CSV_HEADER);

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "A, com vírgula");
        assert_eq!(&rows[1][0], "2");
    }
}

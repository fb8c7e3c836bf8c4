use super::errors::PipelineError;
use super::extractor::extract_all;
use super::pipeline::PricingPipeline;
use crate::connectors::{ConnectorError, ObjectStore};
use crate::models::{PricedInstance, RawRequirement};
use calamine::Reader;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

pub const NO_ROWS_MESSAGE: &str = "No requirements found in the file.";
pub const NO_VALID_ROWS_MESSAGE: &str = "No valid CPU/RAM data found.";

/// Columns of a price sheet, in order.
pub const PRICE_SHEET_COLUMNS: [&str; 10] = [
    "Server Name",
    "CPU",
    "RAM",
    "InstanceType",
    "Storage",
    "Database",
    "Monthly Server Cost",
    "Monthly Storage Cost",
    "Monthly Database Cost",
    "Total Pricing",
];

const CSV_CONTENT_TYPE: &str = "text/csv";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";
const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Where a price sheet was written and how many rows it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub bucket: String,
    pub key: String,
    pub rows: usize,
}

impl BatchOutcome {
    pub fn message(&self) -> String {
        format!("CSV stored at {}/{}", self.bucket, self.key)
    }
}

/// Prices an uploaded requirements spreadsheet and stores the result next
/// to it in the output bucket.
pub struct BatchService {
    store: Arc<dyn ObjectStore>,
    pipeline: Arc<PricingPipeline>,
    output_bucket: String,
    utc_offset: FixedOffset,
}

impl BatchService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        pipeline: Arc<PricingPipeline>,
        output_bucket: impl Into<String>,
        utc_offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            pipeline,
            output_bucket: output_bucket.into(),
            utc_offset,
        }
    }

    /// Offset given in minutes east of UTC; out of range values fall back to UTC.
    pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!(minutes, "UTC offset out of range, using UTC");
                Utc.fix()
            })
    }

    #[tracing::instrument(name = "Process spreadsheet.", skip(self))]
    pub async fn process(&self, bucket: &str, key: &str) -> Result<BatchOutcome, PipelineError> {
        let body = self.store.get(bucket, key).await.map_err(PipelineError::Storage)?;

        let rows = read_spreadsheet_rows(key, &body)?;
        if rows.is_empty() {
            return Err(PipelineError::InvalidInput(NO_ROWS_MESSAGE.to_string()));
        }
        tracing::info!(rows = rows.len(), "Spreadsheet rows read");

        let extraction = extract_all(rows);
        if extraction.requirements.is_empty() {
            return Err(PipelineError::InvalidInput(NO_VALID_ROWS_MESSAGE.to_string()));
        }

        let priced = self.pipeline.calculate(&extraction.requirements).await?;
        let sheet = write_price_sheet(&priced)?;

        let now = Utc::now().with_timezone(&self.utc_offset);
        let output_key = artifact_key(key, now);
        self.store
            .put(&self.output_bucket, &output_key, sheet, CSV_CONTENT_TYPE)
            .await
            .map_err(|err| match err {
                // a missing source is the caller's problem, a failed write is ours
                ConnectorError::NotFound(detail) => {
                    PipelineError::Storage(ConnectorError::Internal(detail))
                }
                other => PipelineError::Storage(other),
            })?;

        Ok(BatchOutcome {
            bucket: self.output_bucket.clone(),
            key: output_key,
            rows: priced.len(),
        })
    }
}

/// Rows of an uploaded spreadsheet, read as a workbook when the key or the
/// leading bytes say so and as CSV otherwise.
pub fn read_spreadsheet_rows(
    key: &str,
    body: &[u8],
) -> Result<Vec<RawRequirement>, PipelineError> {
    if is_workbook(key, body) {
        read_workbook_rows(body)
    } else {
        Ok(read_requirement_rows(body)?)
    }
}

pub fn is_workbook(key: &str, body: &[u8]) -> bool {
    let by_extension = Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| WORKBOOK_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false);
    by_extension || body.starts_with(ZIP_MAGIC) || body.starts_with(OLE_MAGIC)
}

/// Rows of the first worksheet, keyed by its first row.
pub fn read_workbook_rows(body: &[u8]) -> Result<Vec<RawRequirement>, PipelineError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(body.to_vec()))
        .map_err(|err| PipelineError::Workbook(err.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::Workbook("workbook has no worksheets".to_string()))?
        .map_err(|err| PipelineError::Workbook(err.to_string()))?;

    let mut lines = range.rows();
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for line in lines {
        let cells: Vec<String> = line.iter().map(|cell| cell.to_string()).collect();
        if cells.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(RawRequirement::from_fields(
            headers
                .iter()
                .map(String::as_str)
                .zip(cells.iter().map(String::as_str)),
        ));
    }
    Ok(rows)
}

/// Rows of a CSV spreadsheet keyed by its header line.
pub fn read_requirement_rows(body: &[u8]) -> Result<Vec<RawRequirement>, csv::Error> {
    let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body);

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(RawRequirement::from_fields(headers.iter().zip(record.iter())));
    }
    Ok(rows)
}

/// CSV with one header line followed by one line per priced instance. The
/// header is written even when there are no rows.
pub fn write_price_sheet(priced: &[PricedInstance]) -> Result<Vec<u8>, PipelineError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(PRICE_SHEET_COLUMNS)
        .map_err(|err| PipelineError::Internal(format!("CSV header: {}", err)))?;
    for instance in priced {
        writer
            .serialize(instance)
            .map_err(|err| PipelineError::Internal(format!("CSV row: {}", err)))?;
    }
    writer
        .into_inner()
        .map_err(|err| PipelineError::Internal(format!("CSV buffer: {}", err)))
}

/// `Price_<stem>_<HH:MM:SS_DD-MM-YYYY>.csv` for a source object key.
pub fn artifact_key(source_key: &str, at: DateTime<FixedOffset>) -> String {
    let stem = Path::new(source_key)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("requirements");
    format!("Price_{}_{}.csv", stem, at.format("%H:%M:%S_%d-%m-%Y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::{LocalObjectStore, StaticInstanceCatalog, StaticPriceCatalog};
    use crate::models::InstanceType;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    const SHEET: &str = "\u{feff}Server Name,IP Address,CPU,RAM,Storage,Database\n\
        web1,10.0.0.1,4 Cores,8GB,50GB SSD,None\n\
        db1,10.0.0.2,8 cores,32 GB,1TB HDD,PostgreSQL\n\
        broken,10.0.0.3,unknown,8GB,,\n";

    fn service(root: &Path) -> BatchService {
        let catalog = StaticInstanceCatalog::new(vec![
            InstanceType::from_mib("t3.xlarge", 4, 16384),
            InstanceType::from_mib("r5.2xlarge", 8, 65536),
        ]);
        let prices = StaticPriceCatalog::new(HashMap::from([(
            "t3.xlarge".to_string(),
            Decimal::new(1664, 4),
        )]));
        let pipeline = Arc::new(PricingPipeline::new(Arc::new(catalog), Arc::new(prices)));
        BatchService::new(
            Arc::new(LocalObjectStore::new(root)),
            pipeline,
            "price--inventory",
            BatchService::offset_from_minutes(330),
        )
    }

    #[test]
    fn test_read_rows_strips_bom_and_ignores_extra_columns() {
        let rows = read_requirement_rows(SHEET.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].server_name.as_deref(), Some("web1"));
        assert_eq!(rows[1].ram.as_deref(), Some("32 GB"));
        assert_eq!(rows[2].storage, None);
    }

    #[test]
    fn test_artifact_key_uses_stem_and_local_time() {
        let ist = BatchService::offset_from_minutes(330);
        let at = ist.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            artifact_key("uploads/servers.csv", at),
            "Price_servers_14:05:07_09-03-2024.csv"
        );
    }

    const WORKBOOK: &[u8] = include_bytes!("../../tests/fixtures/servers.xlsx");

    #[test]
    fn test_empty_price_sheet_keeps_header() {
        let sheet = write_price_sheet(&[]).unwrap();
        let text = String::from_utf8(sheet).unwrap();
        assert_eq!(text, format!("{}\n", PRICE_SHEET_COLUMNS.join(",")));
    }

    #[test]
    fn test_workbook_detected_by_extension_or_magic() {
        assert!(is_workbook("uploads/servers.XLSX", b""));
        assert!(is_workbook("uploads/legacy.xls", b""));
        assert!(is_workbook("uploads/servers", WORKBOOK));
        assert!(is_workbook("uploads/renamed.csv", WORKBOOK));
        assert!(!is_workbook("uploads/servers.csv", SHEET.as_bytes()));
    }

    #[test]
    fn test_read_workbook_rows_keys_cells_by_header() {
        let rows = read_workbook_rows(WORKBOOK).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].server_name.as_deref(), Some("web1"));
        assert_eq!(rows[0].cpu.as_deref(), Some("4 Cores"));
        assert_eq!(rows[1].ram.as_deref(), Some("32 GB"));
        assert_eq!(rows[1].database.as_deref(), Some("PostgreSQL"));
        assert_eq!(rows[2].server_name.as_deref(), Some("42"));
        assert_eq!(rows[2].storage, None);
    }

    #[test]
    fn test_read_workbook_rejects_garbage_zip() {
        let err =
            read_spreadsheet_rows("servers.xlsx", b"PK\x03\x04not really a zip").unwrap_err();
        assert!(matches!(err, PipelineError::Workbook(_)));
    }

    #[tokio::test]
    async fn test_process_prices_workbook_upload() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        svc.store
            .put("uploads", "servers.xlsx", WORKBOOK.to_vec(), "application/octet-stream")
            .await
            .unwrap();

        let outcome = svc.process("uploads", "servers.xlsx").await.unwrap();
        assert!(outcome.key.starts_with("Price_servers_"));
        assert!(outcome.key.ends_with(".csv"));
        assert_eq!(outcome.rows, 3);

        let written = svc.store.get(&outcome.bucket, &outcome.key).await.unwrap();
        let text = String::from_utf8(written).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(PRICE_SHEET_COLUMNS.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("web1,4,16,t3.xlarge,50GB SSD,None,$119.81,$4.00,$0.00,$123.81")
        );
    }

    #[tokio::test]
    async fn test_process_writes_priced_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        svc.store
            .put("uploads", "servers.csv", SHEET.as_bytes().to_vec(), "text/csv")
            .await
            .unwrap();

        let outcome = svc.process("uploads", "servers.csv").await.unwrap();
        assert_eq!(outcome.bucket, "price--inventory");
        assert!(outcome.key.starts_with("Price_servers_"));
        assert_eq!(outcome.rows, 2);

        let written = svc.store.get(&outcome.bucket, &outcome.key).await.unwrap();
        let text = String::from_utf8(written).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Server Name,CPU,RAM,InstanceType,Storage,Database,Monthly Server Cost,Monthly Storage Cost,Monthly Database Cost,Total Pricing")
        );
        assert_eq!(
            lines.next(),
            Some("web1,4,16,t3.xlarge,50GB SSD,None,$119.81,$4.00,$0.00,$123.81")
        );
        assert_eq!(
            lines.next(),
            Some("db1,8,64,r5.2xlarge,1TB HDD,PostgreSQL,Price Not Available,$46.08,$102.40,")
        );
    }

    #[tokio::test]
    async fn test_process_without_valid_rows_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        svc.store
            .put("uploads", "bad.csv", b"Server Name,CPU,RAM\nx,fast,lots\n".to_vec(), "text/csv")
            .await
            .unwrap();

        let err = svc.process("uploads", "bad.csv").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(ref m) if m == NO_VALID_ROWS_MESSAGE));
    }

    #[tokio::test]
    async fn test_process_missing_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = service(dir.path()).process("uploads", "nope.csv").await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage(ConnectorError::NotFound(_))));
    }
}

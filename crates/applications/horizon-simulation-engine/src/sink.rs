//! Telemetry sinks
//!
//! Sinks only ever see a table that passed exit validation. Each one stages
//! the full dataset next to its destination and swaps it in on commit, so a
//! run replaces everything the previous run published or leaves it alone.
//!
//! - [`JsonLinesSink`]: one JSON record per line
//! - [`MonthlyCsvSink`]: legacy monthly feed, `root/YYYY/MM/{prefix}_{YYYYMM}.csv`

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Datelike;
use horizon_core::{
    HorizonError, IntegrityCheck, Resource, Result, SinkReceipt, TelemetryRecord, TelemetrySink,
    TelemetryTable,
};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Directory that holds `target`; staging files are created there so the
/// final swap is a same-filesystem rename
fn staging_parent(target: &Path) -> Result<PathBuf> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;
    Ok(parent)
}

fn nothing_staged(sink: &str) -> HorizonError {
    HorizonError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{sink}: commit without a staged dataset"),
    ))
}

/// Newline-delimited JSON file
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    staged: Option<NamedTempFile>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            staged: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for JsonLinesSink {
    fn stage(&mut self, table: &TelemetryTable) -> Result<SinkReceipt> {
        let parent = staging_parent(&self.path)?;
        let mut staged = tempfile::Builder::new()
            .prefix(".horizon-master-")
            .tempfile_in(&parent)?;
        {
            let mut writer = BufWriter::new(staged.as_file_mut());
            for record in table.iter() {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }

        let bytes = staged.as_file().metadata()?.len();
        debug!(
            path = %staged.path().display(),
            rows = table.len(),
            bytes,
            "Staged JSON lines"
        );
        self.staged = Some(staged);
        Ok(SinkReceipt {
            rows: table.len(),
            files: 1,
            bytes,
        })
    }

    fn commit(&mut self) -> Result<()> {
        let staged = self.staged.take().ok_or_else(|| nothing_staged(self.name()))?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        info!(path = %self.path.display(), "Master table published");
        Ok(())
    }

    fn abort(&mut self) {
        self.staged = None;
    }

    fn name(&self) -> &str {
        "json-lines"
    }
}

/// File prefix of a resource's legacy feed
pub fn feed_prefix(resource: Resource) -> &'static str {
    match resource {
        Resource::Cpu => "cpu_util",
        Resource::Memory => "mem_util",
        Resource::Disk => "disk_util",
        Resource::Network => "net_util",
    }
}

/// Capacity column header of a resource's legacy feed
pub fn capacity_label(resource: Resource) -> &'static str {
    resource
        .capacity_field()
        .map(|field| field.column_name())
        .unwrap_or("capacity")
}

/// Feed file for a (year, month, resource) partition under `root`
pub fn feed_path(root: &Path, year: i32, month: u32, resource: Resource) -> PathBuf {
    root.join(format!("{year:04}"))
        .join(format!("{month:02}"))
        .join(format!("{}_{year:04}{month:02}.csv", feed_prefix(resource)))
}

/// Count feed files and their data rows under `root`
///
/// Rows are parsed records, so quoted fields spanning several lines count once.
pub fn count_feed_rows(root: &Path) -> Result<(usize, usize)> {
    let mut files = 0;
    let mut rows = 0;
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(io::Error::from)?;
        let is_feed = entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "csv");
        if !is_feed {
            continue;
        }
        files += 1;
        let mut reader = csv::Reader::from_path(entry.path())?;
        for record in reader.records() {
            record?;
            rows += 1;
        }
    }
    Ok((files, rows))
}

/// Every row of the table must be readable back from the feeds under `root`
pub fn check_export_parity(root: &Path, expected_rows: usize) -> Result<usize> {
    let (files, rows) = count_feed_rows(root)?;
    if rows != expected_rows {
        return Err(HorizonError::integrity(
            IntegrityCheck::ExportParity,
            format!("expected {expected_rows} rows across {files} feeds, found {rows}"),
        ));
    }
    Ok(files)
}

fn write_partition(path: &Path, resource: Resource, rows: &[&TelemetryRecord]) -> Result<u64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));
    let value_column = format!("{resource}_p95");
    writer.write_record(["date", "host_id", value_column.as_str(), capacity_label(resource)])?;
    for record in rows {
        let date = record.date.format("%Y-%m-%d").to_string();
        let utilization = record.utilization.to_string();
        let capacity = record.capacity.map(|c| c.to_string()).unwrap_or_default();
        writer.write_record([
            date.as_str(),
            &*record.host_id,
            utilization.as_str(),
            capacity.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(fs::metadata(path)?.len())
}

/// Legacy feed: one CSV per (month, resource)
///
/// The feed tree is owned by the sink: a commit replaces `root` as a whole.
#[derive(Debug)]
pub struct MonthlyCsvSink {
    root: PathBuf,
    staged: Option<TempDir>,
}

impl MonthlyCsvSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            staged: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Live feed file for a (year, month, resource) partition
    pub fn file_path(&self, year: i32, month: u32, resource: Resource) -> PathBuf {
        feed_path(&self.root, year, month, resource)
    }
}

impl TelemetrySink for MonthlyCsvSink {
    fn stage(&mut self, table: &TelemetryTable) -> Result<SinkReceipt> {
        let mut partitions: BTreeMap<(i32, u32, Resource), Vec<&TelemetryRecord>> =
            BTreeMap::new();
        for record in table.iter() {
            partitions
                .entry((record.date.year(), record.date.month(), record.resource))
                .or_default()
                .push(record);
        }

        let parent = staging_parent(&self.root)?;
        let staging = tempfile::Builder::new()
            .prefix(".horizon-feeds-")
            .tempdir_in(&parent)?;

        let mut bytes = 0;
        for ((year, month, resource), rows) in &partitions {
            let path = feed_path(staging.path(), *year, *month, *resource);
            bytes += write_partition(&path, *resource, rows)?;
            debug!(path = %path.display(), rows = rows.len(), "Staged monthly feed");
        }

        let files = check_export_parity(staging.path(), table.len())?;
        info!(
            staging = %staging.path().display(),
            files,
            rows = table.len(),
            "Monthly feeds staged"
        );

        self.staged = Some(staging);
        Ok(SinkReceipt {
            rows: table.len(),
            files,
            bytes,
        })
    }

    fn commit(&mut self) -> Result<()> {
        let staging = self.staged.take().ok_or_else(|| nothing_staged(self.name()))?;
        let parent = staging_parent(&self.root)?;

        // The previous tree is parked in a temp dir and deleted when it drops
        let retired = tempfile::Builder::new()
            .prefix(".horizon-retired-")
            .tempdir_in(&parent)?;
        let parked = retired.path().join("feeds");
        let had_previous = self.root.exists();
        if had_previous {
            fs::rename(&self.root, &parked)?;
        }

        if let Err(e) = fs::rename(staging.path(), &self.root) {
            if had_previous {
                if let Err(restore) = fs::rename(&parked, &self.root) {
                    warn!(
                        root = %self.root.display(),
                        error = %restore,
                        "Could not restore previous feeds"
                    );
                }
            }
            return Err(e.into());
        }

        info!(root = %self.root.display(), replaced = had_previous, "Monthly feeds published");
        Ok(())
    }

    fn abort(&mut self) {
        self.staged = None;
    }

    fn name(&self) -> &str {
        "monthly-csv"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;

    fn record(
        host: &str,
        date: NaiveDate,
        resource: Resource,
        capacity: Option<f64>,
    ) -> TelemetryRecord {
        TelemetryRecord {
            date,
            host_id: Arc::from(host),
            resource,
            utilization: 12.5,
            capacity,
        }
    }

    fn table() -> TelemetryTable {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        TelemetryTable::new(vec![
            record("host-1", jan, Resource::Cpu, Some(8.0)),
            record("host-1", feb, Resource::Cpu, Some(8.0)),
            record("host-1", jan, Resource::Network, None),
            record("host-1", feb, Resource::Network, None),
        ])
    }

    fn single(host: &str, date: NaiveDate) -> TelemetryTable {
        TelemetryTable::new(vec![record(host, date, Resource::Cpu, Some(4.0))])
    }

    /// Entries in `dir` other than `keep`
    fn leftovers(dir: &Path, keep: &str) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name != keep)
            .collect()
    }

    #[test]
    fn test_prefixes_and_labels() {
        assert_eq!(feed_prefix(Resource::Memory), "mem_util");
        assert_eq!(feed_prefix(Resource::Network), "net_util");
        assert_eq!(capacity_label(Resource::Disk), "storage_capacity_mb");
        assert_eq!(capacity_label(Resource::Network), "capacity");
    }

    #[test]
    fn test_json_lines_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/master.jsonl");
        let mut sink = JsonLinesSink::new(&path);

        let receipt = sink.publish(&table()).unwrap();
        assert_eq!(receipt.rows, 4);
        assert_eq!(receipt.files, 1);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
        let first_line = content.lines().next().unwrap();
        let first: TelemetryRecord = serde_json::from_str(first_line).unwrap();
        assert_eq!(first, table().records()[0]);
        assert_eq!(receipt.bytes, content.len() as u64);
        assert!(leftovers(&dir.path().join("nested"), "master.jsonl").is_empty());
    }

    #[test]
    fn test_json_lines_stage_keeps_previous_until_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.jsonl");
        fs::write(&path, "previous run\n").unwrap();
        let mut sink = JsonLinesSink::new(&path);

        sink.stage(&table()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous run\n");

        sink.abort();
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous run\n");
        assert!(leftovers(dir.path(), "master.jsonl").is_empty());

        sink.stage(&table()).unwrap();
        sink.commit().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 4);
        assert!(sink.commit().is_err());
    }

    #[test]
    fn test_monthly_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = MonthlyCsvSink::new(dir.path().join("legacy"));

        let receipt = sink.publish(&table()).unwrap();
        assert_eq!(receipt.rows, 4);
        assert_eq!(receipt.files, 4);

        let cpu = fs::read_to_string(sink.file_path(2024, 1, Resource::Cpu)).unwrap();
        assert_eq!(cpu, "date,host_id,cpu_p95,cpu_cores\n2024-01-31,host-1,12.5,8\n");

        let net = fs::read_to_string(sink.file_path(2024, 2, Resource::Network)).unwrap();
        assert_eq!(net, "date,host_id,network_p95,capacity\n2024-02-01,host-1,12.5,\n");
        assert!(leftovers(dir.path(), "legacy").is_empty());
    }

    #[test]
    fn test_quoted_host_ids_read_back_as_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = MonthlyCsvSink::new(dir.path().join("legacy"));
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let table = TelemetryTable::new(vec![
            record("rack-1\nnode-2", jan, Resource::Cpu, Some(4.0)),
            record("db, \"primary\"", jan, Resource::Cpu, Some(4.0)),
        ]);

        let receipt = sink.publish(&table).unwrap();
        assert_eq!(receipt.rows, 2);

        let mut reader = csv::Reader::from_path(sink.file_path(2024, 1, Resource::Cpu)).unwrap();
        let hosts: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[1].to_string())
            .collect();
        assert_eq!(hosts, vec!["rack-1\nnode-2", "db, \"primary\""]);
    }

    #[test]
    fn test_republish_replaces_previous_feeds() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("legacy");
        let mut sink = MonthlyCsvSink::new(&root);

        sink.publish(&single("h", NaiveDate::from_ymd_opt(2023, 6, 10).unwrap()))
            .unwrap();
        assert!(sink.file_path(2023, 6, Resource::Cpu).exists());

        let receipt = sink
            .publish(&single("h", NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()))
            .unwrap();
        assert_eq!(receipt.files, 1);
        assert!(!root.join("2023").exists());
        assert!(sink.file_path(2024, 1, Resource::Cpu).exists());
        assert_eq!(count_feed_rows(&root).unwrap(), (1, 1));
        assert!(leftovers(dir.path(), "legacy").is_empty());
    }

    #[test]
    fn test_abort_leaves_live_feeds_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("legacy");
        let mut sink = MonthlyCsvSink::new(&root);
        let june = NaiveDate::from_ymd_opt(2023, 6, 10).unwrap();
        sink.publish(&single("h", june)).unwrap();

        sink.stage(&table()).unwrap();
        sink.abort();

        assert_eq!(count_feed_rows(&root).unwrap(), (1, 1));
        assert!(sink.file_path(2023, 6, Resource::Cpu).exists());
        assert!(leftovers(dir.path(), "legacy").is_empty());
    }

    #[test]
    fn test_export_parity_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let path = feed_path(dir.path(), 2024, 1, Resource::Cpu);
        let rows = table();
        let records: Vec<&TelemetryRecord> = rows.iter().collect();
        write_partition(&path, Resource::Cpu, &records).unwrap();
        // a stray feed from somewhere else in the tree is counted too
        write_partition(
            &feed_path(dir.path(), 2024, 2, Resource::Disk),
            Resource::Disk,
            &[&record("h", jan, Resource::Disk, Some(1.0))],
        )
        .unwrap();

        assert_eq!(check_export_parity(dir.path(), 5).unwrap(), 2);
        match check_export_parity(dir.path(), 4).unwrap_err() {
            HorizonError::Integrity { check, detail } => {
                assert_eq!(check, IntegrityCheck::ExportParity);
                assert!(detail.contains("found 5"));
            }
            other => panic!("expected parity failure, got {other}"),
        }
    }
}

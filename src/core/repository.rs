use crate::domain::model::{Lead, Record};
use crate::domain::ports::{ContactView, LeadStore};
use crate::utils::error::{CrmError, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DATABASE_FILE: &str = "leads.json";
pub const EXPORT_FILE: &str = "leads.csv";
pub const CSV_COLUMNS: [&str; 5] = ["name", "company", "email", "stage", "created"];

/// Lead store backed by a single JSON array at `<data_dir>/leads.json`.
///
/// Every operation reads the whole file, changes the list in memory and writes
/// the whole file back. Only one repository should target a directory at a
/// time: concurrent writers lose updates (last write wins).
#[derive(Debug, Clone)]
pub struct JsonLeadRepository {
    data_dir: PathBuf,
    db_path: PathBuf,
}

impl JsonLeadRepository {
    /// 建立資料目錄（已存在也沒關係）並固定資料庫路徑
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        let db_path = data_dir.join(DATABASE_FILE);
        tracing::debug!("Lead database at {}", db_path.display());

        Ok(Self { data_dir, db_path })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn default_export_path(&self) -> PathBuf {
        self.data_dir.join(EXPORT_FILE)
    }

    /// Checks that the database parses, returning the number of records.
    ///
    /// The other operations treat a corrupt file as empty; this surfaces the
    /// problem so a front end can warn before the next write replaces it.
    pub fn verify(&self) -> Result<usize> {
        self.read_records().map(|records| records.len())
    }

    fn read_records(&self) -> Result<Vec<Record>> {
        if !self.db_path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.db_path)?;
        serde_json::from_slice(&bytes).map_err(|e| CrmError::CorruptStore {
            path: self.db_path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn load(&self) -> Result<Vec<Record>> {
        match self.read_records() {
            Err(CrmError::CorruptStore { path, message }) => {
                tracing::warn!("⚠️ Ignoring unreadable lead database {}: {}", path, message);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// 先寫入同目錄的暫存檔，再以 rename 取代資料庫檔案
    fn save(&self, records: &[Record]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;

        let mut tmp = NamedTempFile::new_in(&self.data_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.db_path)
            .map_err(|e| CrmError::IoError(e.error))?;

        tracing::debug!(
            "Saved {} lead(s) ({} bytes) to {}",
            records.len(),
            json.len(),
            self.db_path.display()
        );
        Ok(())
    }
}

impl LeadStore for JsonLeadRepository {
    fn create(&self, lead: &Lead) -> Result<()> {
        let mut records = self.load()?;
        records.push(lead.to_record());
        self.save(&records)?;

        tracing::info!("Lead '{}' created ({} total)", lead.name(), records.len());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Lead>> {
        Ok(self.load()?.iter().map(Lead::from_record).collect())
    }

    fn export_to_csv(&self, path: Option<&Path>) -> Result<Option<PathBuf>> {
        let csv_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_export_path());
        let records = self.load()?;

        match write_csv(&csv_path, &records) {
            Ok(()) => {
                tracing::info!(
                    "Exported {} lead(s) to {}",
                    records.len(),
                    csv_path.display()
                );
                Ok(Some(csv_path))
            }
            Err(e) if is_unwritable(&e) => {
                tracing::warn!("⚠️ Cannot write CSV export {}: {}", csv_path.display(), e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn update(&self, index: usize, lead: &Lead) -> Result<bool> {
        let mut records = self.load()?;
        let Some(slot) = records.get_mut(index) else {
            tracing::debug!("Update rejected: index {} out of range", index);
            return Ok(false);
        };

        *slot = lead.to_record();
        self.save(&records)?;

        tracing::info!("Lead {} updated", index);
        Ok(true)
    }

    fn delete(&self, index: usize) -> Result<bool> {
        let mut records = self.load()?;
        if index >= records.len() {
            tracing::debug!("Delete rejected: index {} out of range", index);
            return Ok(false);
        }

        records.remove(index);
        self.save(&records)?;

        tracing::info!("Lead {} deleted ({} remaining)", index, records.len());
        Ok(true)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }
}

/// An empty collection produces an empty file, without a header.
fn write_csv(path: &Path, records: &[Record]) -> Result<()> {
    let file = fs::File::create(path)?;
    if records.is_empty() {
        return Ok(());
    }

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(CSV_COLUMNS)?;
    for record in records {
        writer.write_record(CSV_COLUMNS.iter().map(|column| record.field_text(column)))?;
    }
    writer.flush()?;
    Ok(())
}

fn is_unwritable(err: &CrmError) -> bool {
    let io_err = match err {
        CrmError::IoError(e) => e,
        CrmError::CsvError(e) => match e.kind() {
            csv::ErrorKind::Io(e) => e,
            _ => return false,
        },
        _ => return false,
    };

    // 32/33: sharing and lock violations on Windows
    io_err.kind() == io::ErrorKind::PermissionDenied
        || (cfg!(windows) && matches!(io_err.raw_os_error(), Some(32) | Some(33)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Stage;
    use tempfile::TempDir;

    fn setup() -> (TempDir, JsonLeadRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = JsonLeadRepository::new(temp_dir.path().join("data")).unwrap();
        (temp_dir, repo)
    }

    fn lead(name: &str, company: &str, email: &str) -> Lead {
        Lead::new(name, company, email).with_created("2024-01-15")
    }

    #[test]
    fn test_new_creates_data_dir_idempotently() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("data");

        let repo = JsonLeadRepository::new(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(repo.db_path(), dir.join("leads.json"));
        assert!(!repo.db_path().exists());

        assert!(JsonLeadRepository::new(&dir).is_ok());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_temp_dir, repo) = setup();
        assert_eq!(repo.count().unwrap(), 0);
        assert!(repo.read_all().unwrap().is_empty());
        assert_eq!(repo.verify().unwrap(), 0);
    }

    #[test]
    fn test_create_appends_in_order() {
        let (_temp_dir, repo) = setup();
        let ana = lead("Ana", "Acme", "ana@x.com");
        let bo = lead("Bo", "Beta", "bo@y.com").with_stage(Stage::Contacted);

        repo.create(&ana).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
        repo.create(&bo).unwrap();
        assert_eq!(repo.count().unwrap(), 2);

        let leads = repo.read_all().unwrap();
        assert_eq!(leads, vec![ana, bo]);
    }

    #[test]
    fn test_saved_file_is_pretty_json_array() {
        let (_temp_dir, repo) = setup();
        repo.create(&lead("João", "Ação Ltda", "joao@x.com")).unwrap();

        let content = fs::read_to_string(repo.db_path()).unwrap();
        assert!(content.starts_with("[\n  {\n    \"name\": \"João\""));
        assert!(content.contains("Ação Ltda"));

        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert_eq!(first["stage"], "new");
        assert_eq!(first["created"], "2024-01-15");
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let (_temp_dir, repo) = setup();
        repo.create(&lead("Ana", "Acme", "ana@x.com")).unwrap();
        repo.create(&lead("Bo", "Beta", "bo@y.com")).unwrap();
        repo.delete(0).unwrap();

        let names: Vec<String> = fs::read_dir(repo.data_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["leads.json".to_string()]);
    }

    #[test]
    fn test_corrupt_file_is_treated_as_empty() {
        let (_temp_dir, repo) = setup();
        fs::write(repo.db_path(), "{ not json").unwrap();

        assert!(repo.read_all().unwrap().is_empty());
        assert_eq!(repo.count().unwrap(), 0);
        assert!(repo.search("a").unwrap().is_empty());
        assert!(!repo.delete(0).unwrap());
    }

    #[test]
    fn test_verify_reports_corruption() {
        let (_temp_dir, repo) = setup();
        fs::write(repo.db_path(), "{\"name\": \"Ana\"}").unwrap();

        match repo.verify() {
            Err(CrmError::CorruptStore { path, .. }) => assert!(path.ends_with("leads.json")),
            other => panic!("expected CorruptStore, got {:?}", other),
        }
    }

    #[test]
    fn test_create_over_corrupt_file_starts_fresh() {
        let (_temp_dir, repo) = setup();
        fs::write(repo.db_path(), [0xff, 0xfe, 0x00]).unwrap();

        repo.create(&lead("Ana", "Acme", "ana@x.com")).unwrap();
        assert_eq!(repo.verify().unwrap(), 1);
    }

    #[test]
    fn test_permissive_records_on_load() {
        let (_temp_dir, repo) = setup();
        fs::write(
            repo.db_path(),
            r#"[{"name": "Ana", "stage": "won", "source": "fair"}, {}]"#,
        )
        .unwrap();

        assert_eq!(repo.count().unwrap(), 2);
        let leads = repo.read_all().unwrap();
        assert_eq!(leads[0].name(), "Ana");
        assert_eq!(leads[0].stage(), Stage::New);
        assert_eq!(leads[1].name(), "");
    }

    #[test]
    fn test_search_returns_full_list_positions() {
        let (_temp_dir, repo) = setup();
        repo.create(&lead("Ana", "Acme", "ana@x.com")).unwrap();
        repo.create(&lead("Bo", "Beta", "bo@y.com")).unwrap();
        repo.create(&lead("Caio", "ACME Labs", "caio@z.com")).unwrap();

        let results = repo.search("acme").unwrap();
        let indices: Vec<usize> = results.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(results[1].1.name(), "Caio");

        assert_eq!(repo.search("Y.COM").unwrap()[0].0, 1);
        assert!(repo.search("zeta").unwrap().is_empty());
        assert_eq!(repo.search("").unwrap().len(), 3);
    }

    #[test]
    fn test_update_in_and_out_of_bounds() {
        let (_temp_dir, repo) = setup();
        let ana = lead("Ana", "Acme", "ana@x.com");
        repo.create(&ana).unwrap();
        repo.create(&lead("Bo", "Beta", "bo@y.com")).unwrap();

        let qualified = lead("Bo", "Beta", "bo@y.com").with_stage(Stage::Qualified);
        assert!(repo.update(1, &qualified).unwrap());

        let leads = repo.read_all().unwrap();
        assert_eq!(leads[0], ana);
        assert_eq!(leads[1].stage(), Stage::Qualified);

        let before = fs::read_to_string(repo.db_path()).unwrap();
        assert!(!repo.update(2, &ana).unwrap());
        assert_eq!(fs::read_to_string(repo.db_path()).unwrap(), before);
    }

    #[test]
    fn test_delete_shifts_later_records() {
        let (_temp_dir, repo) = setup();
        for name in ["Ana", "Bo", "Caio"] {
            repo.create(&lead(name, "Acme", &format!("{}@x.com", name))).unwrap();
        }

        assert!(repo.delete(1).unwrap());
        assert_eq!(repo.count().unwrap(), 2);
        let names: Vec<String> = repo
            .read_all()
            .unwrap()
            .iter()
            .map(|l| l.name().to_string())
            .collect();
        assert_eq!(names, vec!["Ana", "Caio"]);

        assert!(!repo.delete(2).unwrap());
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn test_export_empty_collection_writes_empty_file() {
        let (_temp_dir, repo) = setup();

        let path = repo.export_to_csv(None).unwrap().unwrap();
        assert_eq!(path, repo.default_export_path());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let (temp_dir, repo) = setup();
        repo.create(&lead("Ana", "Acme, Inc.", "ana@x.com")).unwrap();
        repo.create(&lead("Bo", "Beta \"B\"", "bo@y.com").with_stage(Stage::Lost))
            .unwrap();

        let target = temp_dir.path().join("out.csv");
        let path = repo.export_to_csv(Some(&target)).unwrap().unwrap();
        assert_eq!(path, target);

        let content = fs::read_to_string(&target).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "name,company,email,stage,created");
        assert_eq!(lines[1], "Ana,\"Acme, Inc.\",ana@x.com,new,2024-01-15");
        assert_eq!(lines[2], "Bo,\"Beta \"\"B\"\"\",bo@y.com,lost,2024-01-15");
    }

    #[test]
    fn test_export_overwrites_previous_file() {
        let (_temp_dir, repo) = setup();
        repo.create(&lead("Ana", "Acme", "ana@x.com")).unwrap();
        repo.export_to_csv(None).unwrap();

        repo.delete(0).unwrap();
        let path = repo.export_to_csv(None).unwrap().unwrap();
        assert!(fs::read_to_string(path).unwrap().is_empty());
    }

    #[test]
    fn test_export_to_missing_directory_is_an_error() {
        let (temp_dir, repo) = setup();
        let target = temp_dir.path().join("missing").join("out.csv");

        assert!(matches!(
            repo.export_to_csv(Some(&target)),
            Err(CrmError::IoError(_))
        ));
    }

    #[test]
    fn test_is_unwritable() {
        let denied = || io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(is_unwritable(&CrmError::IoError(denied())));
        assert!(is_unwritable(&CrmError::CsvError(csv::Error::from(denied()))));
        assert!(!is_unwritable(&CrmError::IoError(io::Error::from(
            io::ErrorKind::NotFound
        ))));
        assert!(!is_unwritable(&CrmError::validation("bad lead")));
    }

    #[cfg(unix)]
    #[test]
    fn test_export_to_read_only_file_reports_failure() {
        use std::os::unix::fs::PermissionsExt;

        let (temp_dir, repo) = setup();
        repo.create(&lead("Ana", "Acme", "ana@x.com")).unwrap();
        let store_before = fs::read_to_string(repo.db_path()).unwrap();

        let target = temp_dir.path().join("locked.csv");
        fs::write(&target, "old export").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o444)).unwrap();

        // Privileged users (root) ignore file modes
        if fs::OpenOptions::new().write(true).open(&target).is_ok() {
            return;
        }

        assert_eq!(repo.export_to_csv(Some(&target)).unwrap(), None);
        assert_eq!(fs::read_to_string(&target).unwrap(), "old export");
        assert_eq!(fs::read_to_string(repo.db_path()).unwrap(), store_before);
        assert_eq!(repo.count().unwrap(), 1);
    }
}

use crate::domain::model::{Contact, Lead, Record};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Behaviour every contact variant provides.
pub trait ContactView {
    fn contact(&self) -> &Contact;

    /// Base fields first, variant fields appended.
    fn to_record(&self) -> Record;

    /// Fixed-width summary line for tabular listings.
    fn display_line(&self) -> String;

    fn is_valid(&self) -> bool {
        self.contact().is_valid()
    }
}

/// Persistent collection of leads, addressed by position.
///
/// Recoverable outcomes are values inside `Ok`: `false` for an out-of-range
/// index, `None` for an export target that cannot be written. `Err` is left for
/// I/O faults nobody expected.
pub trait LeadStore {
    fn create(&self, lead: &Lead) -> Result<()>;

    fn read_all(&self) -> Result<Vec<Lead>>;

    fn export_to_csv(&self, path: Option<&Path>) -> Result<Option<PathBuf>>;

    fn update(&self, index: usize, lead: &Lead) -> Result<bool>;

    fn delete(&self, index: usize) -> Result<bool>;

    fn count(&self) -> Result<usize>;

    /// 不分大小寫比對姓名、公司與 email，回傳在完整列表中的位置
    fn search(&self, query: &str) -> Result<Vec<(usize, Lead)>> {
        let query = query.to_lowercase();
        Ok(self
            .read_all()?
            .into_iter()
            .enumerate()
            .filter(|(_, lead)| lead.search_text().to_lowercase().contains(&query))
            .collect())
    }
}

use crate::domain::model::{Lead, Stage};
use crate::domain::ports::{ContactView, LeadStore};
use crate::domain::services::StageStatistics;
use crate::utils::error::{CrmError, Result};
use crate::utils::validation::validate_non_empty_string;
use std::path::{Path, PathBuf};

/// Front-end facade over a lead store: validates input before it reaches storage.
pub struct CrmEngine<S: LeadStore> {
    store: S,
}

impl<S: LeadStore> CrmEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 新增前先驗證；無效的 lead 不會寫入
    pub fn add_lead(&self, lead: &Lead) -> Result<()> {
        if !lead.is_valid() {
            return Err(CrmError::validation("Name and a valid e-mail are required"));
        }
        self.store.create(lead)
    }

    pub fn list(&self) -> Result<Vec<Lead>> {
        self.store.read_all()
    }

    pub fn search(&self, query: &str) -> Result<Vec<(usize, Lead)>> {
        validate_non_empty_string("query", query)
            .map_err(|_| CrmError::validation("Empty search query"))?;
        self.store.search(query.trim())
    }

    pub fn export(&self, path: Option<&Path>) -> Result<Option<PathBuf>> {
        self.store.export_to_csv(path)
    }

    /// Moves the stored lead at `index` to `stage`. `Ok(false)` when the index is
    /// out of range; an unknown stage is a validation error.
    pub fn change_stage(&self, index: usize, stage: &str) -> Result<bool> {
        let stage: Stage = stage.parse()?;
        let Some(lead) = self.store.read_all()?.into_iter().nth(index) else {
            return Ok(false);
        };

        self.store.update(index, &lead.with_stage(stage))
    }

    pub fn remove(&self, index: usize) -> Result<bool> {
        self.store.delete(index)
    }

    pub fn count(&self) -> Result<usize> {
        self.store.count()
    }

    pub fn statistics(&self) -> Result<StageStatistics> {
        Ok(StageStatistics::from_leads(&self.store.read_all()?))
    }
}

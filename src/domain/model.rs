use crate::domain::ports::ContactView;
use crate::utils::error::{CrmError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Position of a lead in the sales pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::New,
        Stage::Contacted,
        Stage::Qualified,
        Stage::Converted,
        Stage::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::New => "new",
            Stage::Contacted => "contacted",
            Stage::Qualified => "qualified",
            Stage::Converted => "converted",
            Stage::Lost => "lost",
        }
    }

    /// 只接受固定集合中的值
    pub fn parse(value: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| stage.as_str() == value)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self> {
        Stage::parse(s).ok_or_else(|| {
            let valid: Vec<&str> = Stage::ALL.iter().map(Stage::as_str).collect();
            CrmError::validation(format!(
                "Unknown stage '{}'. Valid stages: {}",
                s,
                valid.join(", ")
            ))
        })
    }
}

/// Flat field mapping of a contact, in insertion order. This is the on-disk shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// 轉成 CSV 欄位文字；缺少的欄位為空字串
    pub fn field_text(&self, key: &str) -> String {
        match self.0.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fields shared by every contact variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub company: String,
    pub email: String,
    pub created: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, company: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            company: company.into(),
            email: email.into(),
            created: today(),
        }
    }

    /// Replaces the creation date; an empty value keeps today's date.
    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        let created = created.into();
        if !created.is_empty() {
            self.created = created;
        }
        self
    }

    pub fn base_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("name", self.name.as_str());
        record.insert("company", self.company.as_str());
        record.insert("email", self.email.as_str());
        record.insert("created", self.created.as_str());
        record
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && !self.email.is_empty() && self.email.contains('@')
    }

    fn from_record(record: &Record) -> Self {
        Contact::new(
            record.get_str("name").unwrap_or_default(),
            record.get_str("company").unwrap_or_default(),
            record.get_str("email").unwrap_or_default(),
        )
        .with_created(record.get_str("created").unwrap_or_default())
    }
}

/// Current local calendar date, ISO 8601.
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    pub contact: Contact,
    stage: Stage,
}

impl Lead {
    pub fn new(name: impl Into<String>, company: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            contact: Contact::new(name, company, email),
            stage: Stage::New,
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        self.contact = self.contact.with_created(created);
        self
    }

    pub fn name(&self) -> &str {
        &self.contact.name
    }

    pub fn company(&self) -> &str {
        &self.contact.company
    }

    pub fn email(&self) -> &str {
        &self.contact.email
    }

    pub fn created(&self) -> &str {
        &self.contact.created
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// 變更階段；不在固定集合中的值不會改變狀態
    pub fn update_stage(&mut self, new_stage: &str) -> bool {
        match Stage::parse(new_stage) {
            Some(stage) => {
                self.stage = stage;
                true
            }
            None => false,
        }
    }

    /// Rebuilds a lead from a stored record. Missing text fields become empty,
    /// a missing or unknown stage becomes `new`, a missing date becomes today.
    pub fn from_record(record: &Record) -> Self {
        Self {
            contact: Contact::from_record(record),
            stage: record
                .get_str("stage")
                .and_then(Stage::parse)
                .unwrap_or_default(),
        }
    }

    /// Text matched by search: name, company and email.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.contact.name, self.contact.company, self.contact.email
        )
    }
}

impl ContactView for Lead {
    fn contact(&self) -> &Contact {
        &self.contact
    }

    fn to_record(&self) -> Record {
        let mut record = self.contact.base_record();
        record.insert("stage", self.stage.as_str());
        record
    }

    fn display_line(&self) -> String {
        format!(
            "{:<20.20} | {:<17.17} | {:<21.21} | {}",
            self.contact.name, self.contact.company, self.contact.email, self.stage
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub contact: Contact,
    total_purchases: f64,
}

impl Customer {
    pub fn new(name: impl Into<String>, company: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            contact: Contact::new(name, company, email),
            total_purchases: 0.0,
        }
    }

    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        self.contact = self.contact.with_created(created);
        self
    }

    pub fn total_purchases(&self) -> f64 {
        self.total_purchases
    }

    /// 累加購買金額；負數或非有限值會被拒絕
    pub fn add_purchase(&mut self, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(CrmError::validation(format!(
                "Purchase amount must be a non-negative number, got {}",
                amount
            )));
        }
        self.total_purchases += amount;
        Ok(())
    }
}

impl ContactView for Customer {
    fn contact(&self) -> &Contact {
        &self.contact
    }

    fn to_record(&self) -> Record {
        let mut record = self.contact.base_record();
        record.insert("total_purchases", self.total_purchases);
        record
    }

    fn display_line(&self) -> String {
        format!(
            "{:<20.20} | {:<17.17} | {:<21.21} | R$ {:.2}",
            self.contact.name, self.contact.company, self.contact.email, self.total_purchases
        )
    }
}

/// Any contact variant, for code that handles leads and customers uniformly.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyContact {
    Lead(Lead),
    Customer(Customer),
}

impl ContactView for AnyContact {
    fn contact(&self) -> &Contact {
        match self {
            AnyContact::Lead(lead) => lead.contact(),
            AnyContact::Customer(customer) => customer.contact(),
        }
    }

    fn to_record(&self) -> Record {
        match self {
            AnyContact::Lead(lead) => lead.to_record(),
            AnyContact::Customer(customer) => customer.to_record(),
        }
    }

    fn display_line(&self) -> String {
        match self {
            AnyContact::Lead(lead) => lead.display_line(),
            AnyContact::Customer(customer) => customer.display_line(),
        }
    }
}

impl From<Lead> for AnyContact {
    fn from(lead: Lead) -> Self {
        AnyContact::Lead(lead)
    }
}

impl From<Customer> for AnyContact {
    fn from(customer: Customer) -> Self {
        AnyContact::Customer(customer)
    }
}

impl fmt::Display for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_line())
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_line())
    }
}

impl fmt::Display for AnyContact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_line())
    }
}

/// Column header aligned with `display_line` rows produced by `listing_row`.
pub fn listing_header() -> String {
    format!(
        "{:<3} | {:<20} | {:<17} | {:<21} | Stage",
        "#", "Name", "Company", "E-mail"
    )
}

pub fn listing_row(index: usize, contact: &impl ContactView) -> String {
    format!("{:02}  | {}", index, contact.display_line())
}

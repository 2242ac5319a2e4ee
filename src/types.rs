use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One pull request row as read from the primary CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryRecord {
    pub id: String,
    pub agent_label: String,
    pub title_text: String,
    pub body_text: String,
}

impl PrimaryRecord {
    /// Title and body joined by a single space, the text the classifier scans.
    pub fn combined_text(&self) -> String {
        let mut text = String::with_capacity(self.title_text.len() + self.body_text.len() + 1);
        text.push_str(&self.title_text);
        text.push(' ');
        text.push_str(&self.body_text);
        text
    }
}

/// One task type row as read from the lookup CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRecord {
    pub id: String,
    pub class_label: String,
    /// Kept as text; never parsed as a number.
    pub confidence_value: String,
}

/// One row of the security summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub id: String,
    pub agent_label: String,
    pub class_label: String,
    pub confidence_value: String,
    pub security_flag: bool,
}

impl OutputRecord {
    pub fn security_field(&self) -> &'static str {
        if self.security_flag {
            "1"
        } else {
            "0"
        }
    }

    /// Fields in summary column order.
    pub fn to_row(&self) -> [&str; 5] {
        [
            &self.id,
            &self.agent_label,
            &self.class_label,
            &self.confidence_value,
            self.security_field(),
        ]
    }
}

/// Destination for joined rows.
pub trait RecordSink {
    fn emit(&mut self, record: &OutputRecord) -> Result<()>;
}

impl RecordSink for Vec<OutputRecord> {
    fn emit(&mut self, record: &OutputRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

//! Job domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::package::PackedWorkPackage;
use crate::domain::status::Status;

/// Job record as returned by the remote service
///
/// `agenda` is only populated when detail was requested; entries are
/// addressed by their position in the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub agenda: Vec<WorkItem>,
    /// Any further job-level attributes the service reports
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl JobRecord {
    /// Job-level view handed to the sandbox, without the sibling work items
    pub fn metadata(&self) -> JobMetadata {
        JobMetadata {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            attributes: self.attributes.clone(),
        }
    }
}

/// Job record minus its agenda
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub status: Status,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// One unit of work within a job (an agenda entry)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Position of this item in the job's agenda
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub status: Status,
    /// Work package, still packed; absent on items handed out only to
    /// signal a status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackedWorkPackage>,
    /// Packed result package, set once the item has run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_package: Option<String>,
}

impl WorkItem {
    pub fn new(id: u64, status: Status) -> Self {
        Self {
            id,
            name: id.to_string(),
            status,
            package: None,
            result_package: None,
        }
    }

    pub fn with_package(mut self, package: PackedWorkPackage) -> Self {
        self.package = Some(package);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_strips_agenda() {
        let record: JobRecord = serde_json::from_value(json!({
            "id": 7,
            "name": "render",
            "status": "running",
            "priority": 500,
            "agenda": [
                {"id": 0, "name": "0", "status": "complete"},
                {"id": 1, "name": "1", "status": "running"}
            ]
        }))
        .unwrap();

        assert_eq!(record.agenda.len(), 2);

        let metadata = record.metadata();
        assert_eq!(metadata.id, 7);
        assert_eq!(metadata.attributes.get("priority"), Some(&json!(500)));

        let wire = serde_json::to_value(&metadata).unwrap();
        assert!(wire.get("agenda").is_none());
    }

    #[test]
    fn test_agenda_defaults_to_empty() {
        let record: JobRecord =
            serde_json::from_value(json!({"id": 3, "status": "complete"})).unwrap();
        assert!(record.agenda.is_empty());
        assert!(record.name.is_none());
    }
}

//! Catalog record model

use serde::{Deserialize, Serialize};

/// Stable identifier of a catalog record
pub type RecordId = u64;

/// Wire names of every descriptive field, in display order
pub const FULL_FIELDS: [&str; 7] = [
    "id",
    "title",
    "place_of_origin",
    "artist_display",
    "inscriptions",
    "date_start",
    "date_end",
];

/// One artwork as returned by the catalog.
///
/// Records are immutable once fetched. When only the identifier field was
/// requested every descriptive field is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub place_of_origin: Option<String>,

    #[serde(default)]
    pub artist_display: Option<String>,

    #[serde(default)]
    pub inscriptions: Option<String>,

    #[serde(default)]
    pub date_start: Option<i64>,

    #[serde(default)]
    pub date_end: Option<i64>,
}

impl Record {
    /// Create a record carrying only its identifier
    pub fn id_only(id: RecordId) -> Self {
        Self {
            id,
            title: None,
            place_of_origin: None,
            artist_display: None,
            inscriptions: None,
            date_start: None,
            date_end: None,
        }
    }
}

/// The set of fields requested from the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldSet {
    /// Identifier only, used when collecting ids for large selections
    IdOnly,
    /// Every descriptive field
    Full,
}

impl FieldSet {
    /// Comma separated field list as sent on the wire
    pub fn as_csv(&self) -> String {
        match self {
            FieldSet::IdOnly => "id".to_string(),
            FieldSet::Full => FULL_FIELDS.join(","),
        }
    }
}

/// Result of a paginated list request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPage {
    pub records: Vec<Record>,
    pub total_count: usize,
}

impl ListPage {
    /// Identifiers of the page in catalog order
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id).collect()
    }
}

/// Number of pages needed to hold `count` records
pub fn pages_for(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_set_csv() {
        assert_eq!(FieldSet::IdOnly.as_csv(), "id");
        assert_eq!(
            FieldSet::Full.as_csv(),
            "id,title,place_of_origin,artist_display,inscriptions,date_start,date_end"
        );
    }

    #[test]
    fn test_id_only_payload_deserializes() {
        let record: Record = serde_json::from_str(r#"{"id": 27992}"#).unwrap();
        assert_eq!(record, Record::id_only(27992));
    }

    #[test]
    fn test_full_payload_deserializes() {
        let json = r#"{
            "id": 4,
            "title": "Priest and Boy",
            "place_of_origin": "Paris",
            "artist_display": "Lawrence Carmichael Earle",
            "inscriptions": null,
            "date_start": 1880,
            "date_end": 1885
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.title.as_deref(), Some("Priest and Boy"));
        assert_eq!(record.inscriptions, None);
        assert_eq!(record.date_end, Some(1885));
    }

    #[test]
    fn test_pages_for() {
        assert_eq!(pages_for(0, 12), 0);
        assert_eq!(pages_for(12, 12), 1);
        assert_eq!(pages_for(13, 12), 2);
        assert_eq!(pages_for(5, 0), 0);
    }
}

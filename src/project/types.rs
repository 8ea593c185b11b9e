//! Project record types
//!
//! `NewProject` is what callers hand in: free-form JSON fields plus an
//! optional image file. `ProjectRecord` is what gets persisted and mirrored:
//! the caller's fields, the generated `id`, and `imageURL` when an image was
//! uploaded.

use crate::database::Record;
use crate::storage::ImageFile;
use serde::Serialize;
use serde_json::Value;

/// Generated database key
pub const ID_FIELD: &str = "id";
/// Binary image handle; never persisted
pub const IMAGE_FIELD: &str = "image";
/// Download URL of the uploaded image
pub const IMAGE_URL_FIELD: &str = "imageURL";
/// Transient upload percentage; delivered over the progress channel instead
pub const UPLOAD_PROGRESS_FIELD: &str = "uploadProgress";

/// Fields owned by the writer; caller values for these are dropped
pub const RESERVED_FIELDS: [&str; 4] = [ID_FIELD, IMAGE_FIELD, IMAGE_URL_FIELD, UPLOAD_PROGRESS_FIELD];

/// A project as supplied by the caller, before persistence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProject {
    fields: Record,
    image: Option<ImageFile>,
}

impl NewProject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing JSON object
    pub fn from_fields(fields: Record) -> Self {
        Self { fields, image: None }
    }

    /// Set a field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Attach an image to upload alongside the record
    pub fn with_image(mut self, image: ImageFile) -> Self {
        self.image = Some(image);
        self
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn image(&self) -> Option<&ImageFile> {
        self.image.as_ref()
    }

    /// Caller fields with the reserved names removed
    ///
    /// `null` fields are dropped too: a merge-write would delete them, so
    /// keeping them would make the mirrored record differ from the stored one.
    pub fn persistable_fields(&self) -> Record {
        self.fields
            .iter()
            .filter(|(name, value)| !RESERVED_FIELDS.contains(&name.as_str()) && !value.is_null())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl TryFrom<Value> for NewProject {
    type Error = anyhow::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self::from_fields(fields)),
            other => Err(anyhow::anyhow!("Project must be a JSON object, got {}", other)),
        }
    }
}

/// A persisted project record
///
/// Always carries a string `id`; serializes as the plain JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProjectRecord(Record);

impl ProjectRecord {
    /// Build the output record: {id, ...fields, imageURL?}
    ///
    /// Reserved and `null` fields in `fields` are dropped.
    pub fn assemble(key: &str, fields: Record, image_url: Option<String>) -> Self {
        let mut record: Record = fields.into_iter().filter(|(_, value)| !value.is_null()).collect();
        for reserved in RESERVED_FIELDS {
            record.remove(reserved);
        }
        record.insert(ID_FIELD.to_string(), Value::String(key.to_string()));
        if let Some(url) = image_url {
            record.insert(IMAGE_URL_FIELD.to_string(), Value::String(url));
        }
        Self(record)
    }

    /// Generated database key
    pub fn id(&self) -> &str {
        self.0
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Download URL of the project image, if one was uploaded
    pub fn image_url(&self) -> Option<&str> {
        self.0.get(IMAGE_URL_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Record {
        &self.0
    }

    pub fn into_fields(self) -> Record {
        self.0
    }
}

impl TryFrom<Record> for ProjectRecord {
    type Error = anyhow::Error;

    fn try_from(record: Record) -> Result<Self, Self::Error> {
        match record.get(ID_FIELD) {
            Some(Value::String(_)) => Ok(Self(record)),
            _ => Err(anyhow::anyhow!("Project record has no string '{}' field", ID_FIELD)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reserved_fields_are_not_persisted() {
        let project = NewProject::new()
            .with_field("name", "Alpha")
            .with_field("id", "caller-id")
            .with_field("image", "not-a-file")
            .with_field("imageURL", "https://elsewhere")
            .with_field("uploadProgress", 40);

        assert_eq!(Value::Object(project.persistable_fields()), json!({ "name": "Alpha" }));
    }

    #[test]
    fn assemble_sets_generated_id_and_optional_url() {
        let fields = NewProject::new().with_field("name", "Alpha").persistable_fields();

        let with_image = ProjectRecord::assemble("k1", fields.clone(), Some("https://store/pic.png".into()));
        assert_eq!(
            serde_json::to_value(&with_image).unwrap(),
            json!({ "id": "k1", "name": "Alpha", "imageURL": "https://store/pic.png" })
        );

        let without_image = ProjectRecord::assemble("k2", fields, None);
        assert_eq!(without_image.id(), "k2");
        assert_eq!(without_image.image_url(), None);
        assert!(without_image.get("imageURL").is_none());
    }

    #[test]
    fn null_fields_are_dropped() {
        let project = NewProject::new()
            .with_field("name", "A")
            .with_field("note", Value::Null);
        assert_eq!(Value::Object(project.persistable_fields()), json!({ "name": "A" }));

        let mut fields = Record::new();
        fields.insert("note".into(), Value::Null);
        let record = ProjectRecord::assemble("k1", fields, None);
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({ "id": "k1" }));
    }

    #[test]
    fn new_project_from_json() {
        let project = NewProject::try_from(json!({ "name": "Beta" })).unwrap();
        assert_eq!(project.fields().get("name"), Some(&json!("Beta")));
        assert!(project.image().is_none());
        assert!(NewProject::try_from(json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn record_requires_string_id() {
        let ok = json!({ "id": "k1" }).as_object().cloned().unwrap();
        let bad = json!({ "id": 7 }).as_object().cloned().unwrap();
        assert!(ProjectRecord::try_from(ok).is_ok());
        assert!(ProjectRecord::try_from(bad).is_err());
    }
}

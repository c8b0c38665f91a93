//! Document model
//!
//! One document per `(tenant, source_type, source_id)`, holding the canonical
//! text composed from the authored entity.

use super::SourceType;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub source_type: SourceType,
    pub source_id: Uuid,
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document with a fresh identifier and timestamps
    pub fn new(
        tenant_id: Uuid,
        source_type: SourceType,
        source_id: Uuid,
        title: Option<String>,
        content: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            source_type,
            source_id,
            title,
            content,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate invariants before persistence
    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.is_nil() {
            return Err(AppError::MissingField {
                field: "tenant_id".into(),
            });
        }
        if self.source_id.is_nil() {
            return Err(AppError::MissingField {
                field: "source_id".into(),
            });
        }
        if self.content.is_empty() {
            return Err(AppError::MissingField {
                field: "content".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document() {
        let tenant_id = Uuid::new_v4();
        let source_id = Uuid::new_v4();
        let doc = Document::new(
            tenant_id,
            SourceType::Story,
            source_id,
            Some("Title".into()),
            "Content".into(),
        );

        assert!(!doc.id.is_nil());
        assert_eq!(doc.tenant_id, tenant_id);
        assert_eq!(doc.source_type, SourceType::Story);
        assert_eq!(doc.source_id, source_id);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_tenant() {
        let doc = Document::new(
            Uuid::nil(),
            SourceType::Story,
            Uuid::new_v4(),
            None,
            "Content".into(),
        );
        assert!(matches!(
            doc.validate(),
            Err(AppError::MissingField { field }) if field == "tenant_id"
        ));
    }

    #[test]
    fn test_validate_empty_content() {
        let doc = Document::new(
            Uuid::new_v4(),
            SourceType::Chapter,
            Uuid::new_v4(),
            Some("Title".into()),
            String::new(),
        );
        assert!(matches!(
            doc.validate(),
            Err(AppError::MissingField { field }) if field == "content"
        ));
    }

    #[test]
    fn test_all_source_types_validate() {
        for st in SourceType::ALL {
            let doc = Document::new(Uuid::new_v4(), st, Uuid::new_v4(), None, "Content".into());
            assert!(doc.validate().is_ok(), "source type {st} should validate");
        }
    }
}

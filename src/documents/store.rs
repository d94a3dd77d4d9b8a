// src/documents/store.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use super::{Document, DocumentType, DocumentUpdate, NewDocument};

const DOCUMENT_COLUMNS: &str = "id, doc_type, title, file_path, external_url, description, original_name, size_bytes, uploaded_at";

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: i64,
    doc_type: String,
    title: String,
    file_path: Option<String>,
    external_url: String,
    description: String,
    original_name: String,
    size_bytes: i64,
    uploaded_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = anyhow::Error;

    fn try_from(row: DocumentRow) -> Result<Self> {
        Ok(Document {
            id: row.id,
            doc_type: row.doc_type.parse()?,
            title: row.title,
            file_path: row.file_path,
            external_url: row.external_url,
            description: row.description,
            original_name: row.original_name,
            size_bytes: row.size_bytes,
            uploaded_at: row.uploaded_at,
        })
    }
}

/// Listing filter; both fields are optional
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub doc_type: Option<DocumentType>,
    /// Matched against title, original name and description
    pub search: Option<String>,
}

pub struct DocumentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: &NewDocument) -> Result<Document> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO documents (doc_type, title, file_path, external_url, description, original_name, size_bytes, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.doc_type.as_str())
        .bind(&new.title)
        .bind(&new.file_path)
        .bind(&new.external_url)
        .bind(&new.description)
        .bind(&new.original_name)
        .bind(new.size_bytes)
        .bind(now)
        .execute(self.pool)
        .await
        .context("Failed to insert document")?;

        let document = Document {
            id: result.last_insert_rowid(),
            doc_type: new.doc_type,
            title: new.title.clone(),
            file_path: new.file_path.clone(),
            external_url: new.external_url.clone(),
            description: new.description.clone(),
            original_name: new.original_name.clone(),
            size_bytes: new.size_bytes,
            uploaded_at: now,
        };

        info!(
            "Stored document #{} [{}] {}",
            document.id,
            document.doc_type,
            document.display_name()
        );
        Ok(document)
    }

    /// Most recently uploaded document of the given type
    pub async fn latest(&self, doc_type: DocumentType) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE doc_type = ? ORDER BY uploaded_at DESC, id DESC LIMIT 1",
            DOCUMENT_COLUMNS
        ))
        .bind(doc_type.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Document::try_from).transpose()
    }

    /// Latest profile image, falling back to any uploaded picture
    pub async fn latest_image(&self) -> Result<Option<Document>> {
        if let Some(doc) = self.latest(DocumentType::ProfileImage).await? {
            if doc.file_path.is_some() {
                return Ok(Some(doc));
            }
        }

        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            SELECT {} FROM documents
            WHERE file_path IS NOT NULL AND (
                lower(file_path) LIKE '%.png' OR lower(file_path) LIKE '%.jpg' OR lower(file_path) LIKE '%.jpeg'
            )
            ORDER BY uploaded_at DESC, id DESC
            LIMIT 1
            "#,
            DOCUMENT_COLUMNS
        ))
        .fetch_optional(self.pool)
        .await?;

        row.map(Document::try_from).transpose()
    }

    /// Newest first
    pub async fn list(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM documents WHERE 1 = 1",
            DOCUMENT_COLUMNS
        ));

        if let Some(doc_type) = filter.doc_type {
            builder.push(" AND doc_type = ").push_bind(doc_type.as_str());
        }

        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term);
            builder
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" OR original_name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR description LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder.push(" ORDER BY uploaded_at DESC, id DESC");

        let rows = builder
            .build_query_as::<DocumentRow>()
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Document::try_from).collect()
    }

    pub async fn get(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Document::try_from).transpose()
    }

    /// Apply the fields present in `changes`; `None` when the id is unknown
    pub async fn update(&self, id: i64, changes: &DocumentUpdate) -> Result<Option<Document>> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                external_url = COALESCE(?, external_url)
            WHERE id = ?
            "#,
        )
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.external_url)
        .bind(id)
        .execute(self.pool)
        .await
        .context("Failed to update document")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        info!("Updated document #{}", id);
        self.get(id).await
    }

    /// Delete the row and hand it back so the caller can clean up the file
    pub async fn delete(&self, id: i64) -> Result<Option<Document>> {
        let Some(document) = self.get(id).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to delete document")?;

        info!("Deleted document #{}", id);
        Ok(Some(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;

    fn new_doc(doc_type: DocumentType, title: &str, file_path: Option<&str>) -> NewDocument {
        NewDocument {
            doc_type,
            title: title.to_string(),
            file_path: file_path.map(str::to_string),
            original_name: file_path
                .and_then(|p| p.rsplit('/').next())
                .unwrap_or_default()
                .to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn latest_returns_newest_of_type() {
        let db = Database::in_memory().await.unwrap();
        let repo = DocumentRepository::new(db.pool());

        assert!(repo.latest(DocumentType::Cv).await.unwrap().is_none());

        repo.create(&new_doc(DocumentType::Cv, "old", Some("uploads/a.pdf")))
            .await
            .unwrap();
        repo.create(&new_doc(DocumentType::Certificate, "cert", Some("uploads/c.pdf")))
            .await
            .unwrap();
        let newest = repo
            .create(&new_doc(DocumentType::Cv, "new", Some("uploads/b.pdf")))
            .await
            .unwrap();

        let latest = repo.latest(DocumentType::Cv).await.unwrap().unwrap();
        assert_eq!(latest.id, newest.id);
        assert_eq!(latest.title, "new");
    }

    #[tokio::test]
    async fn list_filters_by_type_and_search() {
        let db = Database::in_memory().await.unwrap();
        let repo = DocumentRepository::new(db.pool());

        repo.create(&new_doc(DocumentType::Cv, "Backend resume", Some("uploads/cv.pdf")))
            .await
            .unwrap();
        repo.create(&new_doc(DocumentType::Certificate, "AWS cert", Some("uploads/aws.pdf")))
            .await
            .unwrap();
        repo.create(&NewDocument {
            doc_type: DocumentType::Project,
            title: "Portfolio site".to_string(),
            external_url: "https://github.com/someone/site".to_string(),
            description: "Built with rocket".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        let all = repo.list(&DocumentFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].doc_type, DocumentType::Project);

        let certs = repo
            .list(&DocumentFilter {
                doc_type: Some(DocumentType::Certificate),
                search: None,
            })
            .await
            .unwrap();
        assert_eq!(certs.len(), 1);

        let rocket = repo
            .list(&DocumentFilter {
                doc_type: None,
                search: Some("ROCKET".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(rocket.len(), 1);
        assert!(rocket[0].file_path.is_none());
    }

    #[tokio::test]
    async fn latest_image_falls_back_to_any_picture() {
        let db = Database::in_memory().await.unwrap();
        let repo = DocumentRepository::new(db.pool());

        assert!(repo.latest_image().await.unwrap().is_none());

        let photo = repo
            .create(&new_doc(DocumentType::Other, "me", Some("uploads/other_me.JPG")))
            .await
            .unwrap();
        assert_eq!(repo.latest_image().await.unwrap().unwrap().id, photo.id);

        let avatar = repo
            .create(&new_doc(DocumentType::ProfileImage, "avatar", Some("uploads/p.png")))
            .await
            .unwrap();
        repo.create(&new_doc(DocumentType::Other, "later", Some("uploads/x.jpeg")))
            .await
            .unwrap();
        assert_eq!(repo.latest_image().await.unwrap().unwrap().id, avatar.id);
    }

    #[tokio::test]
    async fn delete_returns_removed_document() {
        let db = Database::in_memory().await.unwrap();
        let repo = DocumentRepository::new(db.pool());
        let doc = repo
            .create(&new_doc(DocumentType::Cv, "cv", Some("uploads/cv.txt")))
            .await
            .unwrap();

        let removed = repo.delete(doc.id).await.unwrap().unwrap();
        assert_eq!(removed.id, doc.id);
        assert!(repo.get(doc.id).await.unwrap().is_none());
        assert!(repo.delete(doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let db = Database::in_memory().await.unwrap();
        let repo = DocumentRepository::new(db.pool());
        let doc = repo
            .create(&NewDocument {
                description: "Issued 2023".to_string(),
                ..new_doc(DocumentType::Certificate, "AWS", Some("uploads/aws.pdf"))
            })
            .await
            .unwrap();

        let renamed = repo
            .update(
                doc.id,
                &DocumentUpdate {
                    title: Some("AWS Solutions Architect".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(renamed.title, "AWS Solutions Architect");
        assert_eq!(renamed.description, "Issued 2023");
        assert_eq!(renamed.file_path.as_deref(), Some("uploads/aws.pdf"));

        assert!(repo
            .update(9999, &DocumentUpdate::default())
            .await
            .unwrap()
            .is_none());
    }
}

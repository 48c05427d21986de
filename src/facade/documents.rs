use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::students::StudentLookup;
use crate::config::{DocumentConfig, DocumentPolicy};
use crate::gateway::{DriveFile, FileUpload, RemoteGateway};
use crate::session::SessionContext;
use crate::validators::ValidationError;
use crate::{AuthorizationPolicy, CrmError, LOG_TARGET, Permission, SessionUser, SharedClock};

/// Kinds of student documents, each with its own upload policy and folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    TzPhoto,
    Voucher,
    #[serde(rename = "PAYMENT_200")]
    Payment200,
    IshurArshama,
    IshurTkhilat,
    #[serde(rename = "RECEIPT_5000")]
    Receipt5000,
    #[serde(rename = "RECEIPT_200")]
    Receipt200,
}

impl DocumentType {
    pub const ALL: [DocumentType; 7] = [
        Self::TzPhoto,
        Self::Voucher,
        Self::Payment200,
        Self::IshurArshama,
        Self::IshurTkhilat,
        Self::Receipt5000,
        Self::Receipt200,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TzPhoto => "TZ_PHOTO",
            Self::Voucher => "VOUCHER",
            Self::Payment200 => "PAYMENT_200",
            Self::IshurArshama => "ISHUR_ARSHAMA",
            Self::IshurTkhilat => "ISHUR_TKHILAT",
            Self::Receipt5000 => "RECEIPT_5000",
            Self::Receipt200 => "RECEIPT_200",
        }
    }
}

/// Only the exact type names parse.
impl FromStr for DocumentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|doc_type| doc_type.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownDocumentType(s.to_owned()))
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedDocument {
    pub file_id: String,
    pub file_name: String,
    pub web_view_link: Option<String>,
    pub document_type: DocumentType,
    pub uploaded_at: DateTime<Utc>,
    pub size: u64,
}

/// A stored file attributed to a student.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentDocument {
    pub document_type: DocumentType,
    pub file: DriveFile,
}

/// Uploads, lists and deletes student documents in file storage.
///
/// Uploads are checked against the type's policy before any network call.
/// Every operation resolves the student through `students` first, so
/// ulpan-scoped users only reach documents of students they can see.
pub struct DocumentManager<G: RemoteGateway> {
    gateway: Arc<G>,
    students: Arc<dyn StudentLookup>,
    session: Arc<dyn SessionContext>,
    policy: Arc<AuthorizationPolicy>,
    config: DocumentConfig,
    clock: SharedClock,
}

fn mime_type(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

impl<G: RemoteGateway> DocumentManager<G> {
    pub fn new(
        gateway: Arc<G>,
        students: Arc<dyn StudentLookup>,
        session: Arc<dyn SessionContext>,
        policy: Arc<AuthorizationPolicy>,
        config: DocumentConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            gateway,
            students,
            session,
            policy,
            config,
            clock,
        }
    }

    async fn authorize(&self, permission: Permission) -> Result<SessionUser, CrmError> {
        let user = self.session.authenticated_user().await?;
        self.policy.require_permission(Some(&user), permission)?;
        Ok(user)
    }

    fn doc_policy(&self, doc_type: DocumentType) -> Result<&DocumentPolicy, ValidationError> {
        self.config
            .policy(doc_type)
            .ok_or_else(|| ValidationError::UnknownDocumentType(doc_type.as_str().to_owned()))
    }

    /// Checks size, extension and folder. Returns the lowercase extension
    /// and the destination folder.
    fn validate_upload<'a>(
        &'a self,
        doc_type: DocumentType,
        file_name: &str,
        size: u64,
    ) -> Result<(String, &'a str), ValidationError> {
        let policy = self.doc_policy(doc_type)?;

        if size > policy.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                max_bytes: policy.max_size_bytes,
            });
        }

        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        if !policy.allowed_extensions.contains(&extension) {
            return Err(ValidationError::UnsupportedFormat {
                allowed: policy.allowed_extensions.clone(),
            });
        }

        let folder = policy
            .folder_id
            .as_deref()
            .ok_or_else(|| ValidationError::FolderNotConfigured(doc_type.as_str().to_owned()))?;
        Ok((extension, folder))
    }

    /// Stores `bytes` as `<student_id>_<TYPE>_<YYYY-MM-DD>.<ext>` in the
    /// type's folder.
    ///
    /// # Errors
    ///
    /// Validation errors for an oversized file, a disallowed extension or a
    /// type without a folder; none of these reach the backend.
    /// `StudentNotFound` when the caller cannot see the student.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "upload_document", skip_all, err)
    )]
    pub async fn upload_document(
        &self,
        student_id: &str,
        doc_type: DocumentType,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedDocument, CrmError> {
        let user = self.authorize(Permission::Write).await?;
        if student_id.trim().is_empty() {
            return Err(ValidationError::RequiredField("student_id".to_owned()).into());
        }

        let size = bytes.len() as u64;
        let (extension, folder) = self.validate_upload(doc_type, file_name, size)?;
        let policy = self.doc_policy(doc_type)?;
        self.students.find_student(student_id).await?;

        let now = self.clock.utc();
        let stored_name = format!(
            "{student_id}_{}_{}.{extension}",
            doc_type.as_str(),
            now.format("%Y-%m-%d")
        );
        let upload = FileUpload {
            folder_id: folder.to_owned(),
            file_name: stored_name.clone(),
            mime_type: mime_type(&extension).to_owned(),
            bytes,
            description: Some(format!(
                "{} для студента {student_id}.",
                policy.display_name
            )),
        };

        let uploaded = self.gateway.upload_file(&upload).await?;
        log::info!(
            target: LOG_TARGET,
            "msg=\"document uploaded\", student_id={student_id}, type={doc_type}, file_id={}, by={}",
            uploaded.file_id,
            user.id
        );

        Ok(UploadedDocument {
            file_id: uploaded.file_id,
            file_name: stored_name,
            web_view_link: uploaded.web_view_link,
            document_type: doc_type,
            uploaded_at: now,
            size,
        })
    }

    /// All of a student's files across the configured folders, newest first.
    ///
    /// A folder that cannot be listed is skipped with a warning.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "list_student_documents", skip_all, err)
    )]
    pub async fn list_student_documents(
        &self,
        student_id: &str,
    ) -> Result<Vec<StudentDocument>, CrmError> {
        self.authorize(Permission::Read).await?;
        self.students.find_student(student_id).await?;
        Ok(self.collect_documents(student_id).await)
    }

    async fn collect_documents(&self, student_id: &str) -> Vec<StudentDocument> {
        let prefix = format!("{student_id}_");

        let mut documents = Vec::new();
        for doc_type in DocumentType::ALL {
            let Some(folder) = self
                .config
                .policy(doc_type)
                .and_then(|policy| policy.folder_id.as_deref())
            else {
                continue;
            };

            match self.gateway.list_files(folder).await {
                Ok(files) => documents.extend(
                    files
                        .into_iter()
                        .filter(|file| file.name.starts_with(&prefix))
                        .map(|file| StudentDocument {
                            document_type: doc_type,
                            file,
                        }),
                ),
                Err(e) => log::warn!(
                    target: LOG_TARGET,
                    "msg=\"document folder skipped\", type={doc_type}, error={e:?}"
                ),
            }
        }

        // undated files last
        documents.sort_by(|a, b| b.file.created_time.cmp(&a.file.created_time));
        documents
    }

    /// Deletes one of the student's files.
    ///
    /// # Errors
    ///
    /// `DocumentNotFound` when `file_id` is not among the student's listed
    /// documents.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "delete_document", skip_all, err)
    )]
    pub async fn delete_document(&self, student_id: &str, file_id: &str) -> Result<(), CrmError> {
        let user = self.authorize(Permission::Delete).await?;
        self.students.find_student(student_id).await?;
        let owned = self
            .collect_documents(student_id)
            .await
            .iter()
            .any(|doc| doc.file.id == file_id);
        if !owned {
            return Err(CrmError::DocumentNotFound(file_id.to_owned()));
        }

        self.gateway.delete_file(file_id).await?;
        log::info!(
            target: LOG_TARGET,
            "msg=\"document deleted\", student_id={student_id}, file_id={file_id}, by={}",
            user.id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;

    use std::collections::HashMap;

    use super::*;
    use crate::facade::{StudentField, StudentRecord};
    use crate::gateway::MockGateway;
    use crate::test_support::MutableClock;
    use crate::Role;

    struct FixedSession(SessionUser);

    #[async_trait]
    impl SessionContext for FixedSession {
        async fn authenticated_user(&self) -> Result<SessionUser, CrmError> {
            Ok(self.0.clone())
        }
    }

    /// Students visible to the session.
    struct Roster(&'static [&'static str]);

    #[async_trait]
    impl StudentLookup for Roster {
        async fn find_student(&self, student_id: &str) -> Result<StudentRecord, CrmError> {
            if !self.0.contains(&student_id) {
                return Err(CrmError::StudentNotFound(student_id.to_owned()));
            }
            Ok(StudentRecord {
                row_index: 2,
                values: HashMap::from([(
                    StudentField::Id.header().to_owned(),
                    student_id.to_owned(),
                )]),
            })
        }
    }

    fn setup(role: Role) -> (DocumentManager<MockGateway>, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::new());
        let config = DocumentConfig::default()
            .with_folder(DocumentType::TzPhoto, "folder-tz")
            .with_folder(DocumentType::Voucher, "folder-voucher")
            .with_folder(DocumentType::Payment200, "folder-pay");
        let session = FixedSession(SessionUser {
            id: 3,
            username: "ulpan1".to_owned(),
            name: "Ульпан Шалом".to_owned(),
            email: None,
            role,
            ulpan: Some("Шалом".to_owned()),
        });
        let manager = DocumentManager::new(
            Arc::clone(&gateway),
            Arc::new(Roster(&["STD_1", "STD_1_AAAAA"])),
            Arc::new(session),
            Arc::new(AuthorizationPolicy::default()),
            config,
            Arc::new(MutableClock::default()),
        );
        (manager, gateway)
    }

    fn file(id: &str, name: &str, created: DateTime<Utc>) -> DriveFile {
        DriveFile {
            id: id.to_owned(),
            name: name.to_owned(),
            mime_type: None,
            created_time: Some(created),
            size: None,
            web_view_link: None,
        }
    }

    #[test]
    fn test_document_type_names() {
        for doc_type in DocumentType::ALL {
            assert_eq!(doc_type.as_str().parse(), Ok(doc_type));
            let json = serde_json::to_string(&doc_type).unwrap();
            assert_eq!(json, format!("\"{}\"", doc_type.as_str()));
        }
        assert!("passport".parse::<DocumentType>().is_err());
    }

    #[tokio::test]
    async fn test_upload_names_file() {
        let (manager, gateway) = setup(Role::Ulpan);

        let uploaded = manager
            .upload_document("STD_1_AAAAA", DocumentType::Voucher, "scan.PDF", vec![1, 2, 3])
            .await
            .unwrap();

        assert_eq!(uploaded.file_name, "STD_1_AAAAA_VOUCHER_2024-03-10.pdf");
        assert_eq!(uploaded.size, 3);
        let uploads = gateway.uploads.lock().unwrap();
        assert_eq!(uploads[0].folder_id, "folder-voucher");
        assert_eq!(uploads[0].mime_type, "application/pdf");
        assert_eq!(
            uploads[0].description.as_deref(),
            Some("Ваучер для студента STD_1_AAAAA.")
        );
    }

    #[tokio::test]
    async fn test_tz_photo_allows_five_megabytes() {
        let (manager, _) = setup(Role::Ulpan);

        let ok = manager
            .upload_document("STD_1", DocumentType::TzPhoto, "tz.jpg", vec![0; 4 * 1024 * 1024])
            .await;
        assert!(ok.is_ok());

        let too_big = manager
            .upload_document("STD_1", DocumentType::TzPhoto, "tz.jpg", vec![0; 5 * 1024 * 1024 + 1])
            .await;
        assert_eq!(
            too_big.unwrap_err().to_string(),
            "File too large. Maximum: 5.0MB"
        );
    }

    #[tokio::test]
    async fn test_rejected_format_never_uploads() {
        let (manager, gateway) = setup(Role::Ulpan);

        let result = manager
            .upload_document("STD_1", DocumentType::Voucher, "voucher.docx", vec![1])
            .await;

        assert!(matches!(
            result,
            Err(CrmError::Validation(ValidationError::UnsupportedFormat { .. }))
        ));
        assert_eq!(gateway.calls.total(), 0);
    }

    #[tokio::test]
    async fn test_missing_folder() {
        let (manager, gateway) = setup(Role::Ulpan);

        let result = manager
            .upload_document("STD_1", DocumentType::Receipt200, "r.png", vec![1])
            .await;

        assert_eq!(
            result.unwrap_err(),
            CrmError::Validation(ValidationError::FolderNotConfigured("RECEIPT_200".to_owned()))
        );
        assert_eq!(gateway.calls.total(), 0);
    }

    #[tokio::test]
    async fn test_list_documents_newest_first_skipping_failures() {
        let (manager, gateway) = setup(Role::Curator);
        let base = MutableClock::default().now();
        gateway.add_file("folder-tz", file("a", "STD_1_TZ_PHOTO_2024-03-01.jpg", base));
        gateway.add_file(
            "folder-voucher",
            file("b", "STD_1_VOUCHER_2024-03-05.pdf", base + Duration::days(4)),
        );
        gateway.add_file(
            "folder-voucher",
            file("c", "STD_10_VOUCHER_2024-03-05.pdf", base + Duration::days(5)),
        );
        gateway.fail_folder("folder-pay");

        let docs = manager.list_student_documents("STD_1").await.unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d.file.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(docs[0].document_type, DocumentType::Voucher);
    }

    #[tokio::test]
    async fn test_delete_document_requires_delete() {
        let (manager, gateway) = setup(Role::Ulpan);
        gateway.add_file("folder-tz", file("a", "STD_1_TZ_PHOTO.jpg", Utc::now()));

        assert_eq!(
            manager.delete_document("STD_1", "a").await.unwrap_err(),
            CrmError::PermissionDenied("delete".to_owned())
        );

        let (admin, gateway) = setup(Role::Admin);
        gateway.add_file("folder-tz", file("a", "STD_1_TZ_PHOTO.jpg", Utc::now()));
        admin.delete_document("STD_1", "a").await.unwrap();
        assert!(gateway.folders.lock().unwrap()["folder-tz"].is_empty());
    }

    #[tokio::test]
    async fn test_delete_refuses_another_students_file() {
        let (admin, gateway) = setup(Role::Admin);
        gateway.add_file("folder-tz", file("a", "STD_2_TZ_PHOTO.jpg", Utc::now()));

        assert_eq!(
            admin.delete_document("STD_1", "a").await.unwrap_err(),
            CrmError::DocumentNotFound("a".to_owned())
        );
        assert_eq!(gateway.folders.lock().unwrap()["folder-tz"].len(), 1);
        assert_eq!(
            admin.delete_document("STD_2", "a").await.unwrap_err(),
            CrmError::StudentNotFound("STD_2".to_owned())
        );
        assert_eq!(gateway.calls.file_deletes.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_student_never_reaches_storage() {
        let (manager, gateway) = setup(Role::Ulpan);

        let result = manager
            .upload_document("STD_2", DocumentType::Voucher, "v.pdf", vec![1])
            .await;
        assert_eq!(result.unwrap_err(), CrmError::StudentNotFound("STD_2".to_owned()));

        let result = manager.list_student_documents("STD_2").await;
        assert_eq!(result.unwrap_err(), CrmError::StudentNotFound("STD_2".to_owned()));
        assert_eq!(gateway.calls.total(), 0);
    }
}

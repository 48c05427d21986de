//! Document uploads validated before any backend call.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Duration;
use common::{header_row, student_row, Deployment};
use ulpan_crm::cache::{SheetCache, SheetClient};
use ulpan_crm::config::{DocumentConfig, SheetConfig};
use ulpan_crm::facade::{DocumentManager, DocumentType, StudentsManager};
use ulpan_crm::gateway::MockGateway;
use ulpan_crm::{AuthorizationPolicy, CrmError, SecretString, ValidationError};

async fn documents() -> (DocumentManager<MockGateway>, Arc<MockGateway>) {
    let deployment = Deployment::new().await;
    let session = Arc::new(deployment.open_tab());
    session
        .login("ulpan_alef", &SecretString::new("alef123"), false)
        .await
        .unwrap();

    let gateway = Arc::new(MockGateway::new().with_sheet(
        "Ученики",
        vec![
            header_row(),
            student_row("STD_1_AAAAA", "Анна Леви", "Алеф"),
            student_row("STD_2_BBBBB", "Борис Шапиро", "Шалом"),
        ],
    ));
    let policy = Arc::new(AuthorizationPolicy::default());
    let client = Arc::new(SheetClient::new(
        Arc::clone(&gateway),
        SheetCache::new(Duration::minutes(10), deployment.clock.clone()),
        deployment.clock.clone(),
    ));
    let students = Arc::new(StudentsManager::new(
        client,
        session.clone(),
        Arc::clone(&policy),
        SheetConfig::default(),
        deployment.clock.clone(),
    ));

    let config = DocumentConfig::default()
        .with_folder(DocumentType::Payment200, "folder-payment-200")
        .with_folder(DocumentType::Receipt5000, "folder-receipt-5000");
    let manager = DocumentManager::new(
        Arc::clone(&gateway),
        students,
        session,
        policy,
        config,
        deployment.clock.clone(),
    );
    (manager, gateway)
}

#[tokio::test]
async fn oversized_payment_proof_rejected_before_network() {
    let (documents, gateway) = documents().await;

    let result = documents
        .upload_document(
            "STD_1_AAAAA",
            DocumentType::Payment200,
            "payment.pdf",
            vec![0; 4 * 1024 * 1024],
        )
        .await;

    let err = result.unwrap_err();
    assert_eq!(
        err,
        CrmError::Validation(ValidationError::FileTooLarge {
            max_bytes: 3 * 1024 * 1024
        })
    );
    assert_eq!(err.to_string(), "File too large. Maximum: 3.0MB");
    assert_eq!(gateway.calls.total(), 0);
}

#[tokio::test]
async fn upload_then_list() {
    let (documents, gateway) = documents().await;

    let uploaded = documents
        .upload_document(
            "STD_1_AAAAA",
            DocumentType::Receipt5000,
            "receipt.JPG",
            vec![0; 1024],
        )
        .await
        .unwrap();
    assert_eq!(uploaded.file_name, "STD_1_AAAAA_RECEIPT_5000_2024-03-10.jpg");
    assert_eq!(gateway.uploads.lock().unwrap()[0].mime_type, "image/jpeg");

    let listed = documents
        .list_student_documents("STD_1_AAAAA")
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].file.id, uploaded.file_id);
    assert_eq!(listed[0].document_type, DocumentType::Receipt5000);
}

#[tokio::test]
async fn unsupported_extension_lists_allowed_formats() {
    let (documents, gateway) = documents().await;

    let err = documents
        .upload_document("STD_1_AAAAA", DocumentType::Payment200, "payment.heic", vec![1])
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Unsupported file format. Supported: pdf, jpg, jpeg, png"
    );
    assert_eq!(gateway.calls.total(), 0);
}

#[tokio::test]
async fn other_ulpans_documents_are_out_of_reach() {
    let (documents, gateway) = documents().await;
    gateway.add_file(
        "folder-payment-200",
        ulpan_crm::gateway::DriveFile {
            id: "shalom-file".to_owned(),
            name: "STD_2_BBBBB_PAYMENT_200_2024-03-01.pdf".to_owned(),
            mime_type: None,
            created_time: None,
            size: None,
            web_view_link: None,
        },
    );
    let hidden = CrmError::StudentNotFound("STD_2_BBBBB".to_owned());

    let upload = documents
        .upload_document("STD_2_BBBBB", DocumentType::Payment200, "p.pdf", vec![1])
        .await;
    assert_eq!(upload.unwrap_err(), hidden);
    assert_eq!(
        documents.list_student_documents("STD_2_BBBBB").await.unwrap_err(),
        hidden
    );

    assert!(gateway.uploads.lock().unwrap().is_empty());
    assert_eq!(gateway.calls.lists.load(Ordering::SeqCst), 0);
    assert_eq!(gateway.folders.lock().unwrap()["folder-payment-200"].len(), 1);
}

use shared::catalog::descriptor;

use super::*;
use crate::fixtures::{pdf, png_bytes};

fn passport_slot_with_limit(max_bytes: u64) -> DocumentTypeDescriptor {
    DocumentTypeDescriptor {
        max_bytes,
        ..*descriptor(DocumentKind::Passport)
    }
}

#[test]
fn rejects_unsupported_mime_type() {
    let file = RawFile::new("notes.txt", "text/plain", b"hello".to_vec());
    let err = check_file(&file, descriptor(DocumentKind::Passport)).expect_err("should reject");
    assert!(matches!(err, IntakeError::UnsupportedType { .. }));
    assert!(err.to_string().contains("notes.txt"));
}

#[test]
fn size_limit_comes_from_the_descriptor() {
    let slot = passport_slot_with_limit(100);
    assert!(check_file(&pdf("small.pdf", 100), &slot).is_ok());
    let err = check_file(&pdf("big.pdf", 101), &slot).expect_err("should reject");
    assert_eq!(
        err,
        IntakeError::TooLarge {
            filename: "big.pdf".into(),
            slot: DocumentKind::Passport,
            size: 101,
            max: 100,
        }
    );
}

#[test]
fn default_catalog_allows_ten_megabytes() {
    let slot = descriptor(DocumentKind::ProofOfAddress);
    assert!(check_file(&pdf("limit.pdf", 10 * 1024 * 1024), slot).is_ok());
    assert!(check_file(&pdf("over.pdf", 10 * 1024 * 1024 + 1), slot).is_err());
}

#[tokio::test]
async fn batch_keeps_valid_files_when_one_is_oversized() {
    let slot = passport_slot_with_limit(1024);
    let files = vec![
        pdf("a.pdf", 200),
        pdf("b.pdf", 300),
        pdf("huge.pdf", 4096),
        pdf("c.pdf", 1024),
    ];

    let outcome = intake_batch(files, &slot, &DocumentIds::default(), &PreviewTasks::default()).await;

    assert_eq!(outcome.accepted.len(), 3);
    assert_eq!(outcome.rejected.len(), 1);
    assert!(matches!(
        &outcome.rejected[0],
        IntakeError::TooLarge { filename, .. } if filename == "huge.pdf"
    ));
    assert!(!outcome.cancelled);
    let names: Vec<_> = outcome
        .accepted
        .iter()
        .map(|doc| doc.file.name.as_str())
        .collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
}

#[tokio::test]
async fn batch_assigns_distinct_ids() {
    let ids = DocumentIds::default();
    let slot = descriptor(DocumentKind::DriversLicense);
    let outcome = intake_batch(
        vec![pdf("front.pdf", 32), pdf("back.pdf", 32)],
        slot,
        &ids,
        &PreviewTasks::default(),
    )
    .await;
    assert_ne!(outcome.accepted[0].id, outcome.accepted[1].id);
    assert!(outcome
        .accepted
        .iter()
        .all(|doc| doc.document_type_key() == "drivers_license"));
}

#[tokio::test]
async fn image_gets_png_data_uri_preview() {
    let file = RawFile::new("selfie.png", "image/png", png_bytes(640, 480));
    let document = intake_file(file, descriptor(DocumentKind::NationalId), DocumentId(7))
        .await
        .expect("accepted");
    let preview = document.preview_data_uri.expect("preview");
    assert!(preview.starts_with("data:image/png;base64,"));
    assert_eq!(document.id, DocumentId(7));
}

#[tokio::test]
async fn pdf_has_no_preview() {
    let document = intake_file(
        pdf("statement.pdf", 128),
        descriptor(DocumentKind::BankStatement),
        DocumentId(1),
    )
    .await
    .expect("accepted");
    assert!(document.preview_data_uri.is_none());
}

#[tokio::test]
async fn undecodable_image_is_accepted_without_preview() {
    let file = RawFile::new("broken.jpg", "image/jpeg", b"not really a jpeg".to_vec());
    let document = intake_file(file, descriptor(DocumentKind::Passport), DocumentId(1))
        .await
        .expect("preview failure must not reject the file");
    assert!(document.preview_data_uri.is_none());
}

#[test]
fn render_preview_bounds_thumbnail_size() {
    let uri = render_preview(&png_bytes(1200, 300)).expect("preview");
    let encoded = uri.trim_start_matches("data:image/png;base64,");
    let bytes = STANDARD.decode(encoded).expect("base64");
    let thumb = image::load_from_memory(&bytes).expect("png");
    assert!(thumb.width() <= PREVIEW_MAX_DIMENSION);
    assert!(thumb.height() <= PREVIEW_MAX_DIMENSION);
}

#[tokio::test]
async fn aborted_batch_is_flagged_cancelled() {
    let tasks = PreviewTasks::default();
    tasks.abort_all();
    let file = RawFile::new("late.png", "image/png", png_bytes(8, 8));
    let outcome = intake_batch(
        vec![file],
        descriptor(DocumentKind::Passport),
        &DocumentIds::default(),
        &tasks,
    )
    .await;
    assert!(outcome.cancelled);
}

use chrono::NaiveDate;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use helpdesk::attachments::{AttachmentPolicy, AttachmentUpload, AttachmentValidator, detect_mime};
use helpdesk::core::{generate_ticket_number, is_ticket_number};

fn upload_batch() -> Vec<AttachmentUpload> {
    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    png.resize(256 * 1024, 0);
    let mut pdf = b"%PDF-1.7\n".to_vec();
    pdf.resize(512 * 1024, b' ');

    vec![
        AttachmentUpload::new("screen.png", "image/png", png.clone()),
        AttachmentUpload::new("report.pdf", "application/pdf", pdf),
        AttachmentUpload::new("photo.png", "image/png", png),
    ]
}

/// Two stored zip entries, the second under word/
fn docx_package() -> Vec<u8> {
    let mut package = Vec::new();
    for (name, body) in [("[Content_Types].xml", &b"<Types/>"[..]), ("word/document.xml", &b"<w:document/>"[..])] {
        package.extend(b"PK\x03\x04");
        package.extend([0u8; 22]);
        package.extend(u16::try_from(name.len()).unwrap_or_default().to_le_bytes());
        package.extend([0u8; 2]);
        package.extend(name.as_bytes());
        package.extend(body);
    }
    package
}

fn bench_validation(c: &mut Criterion) {
    let validator = AttachmentValidator::new(AttachmentPolicy::default());
    let batch = upload_batch();

    c.bench_function("validate_three_attachments", |b| {
        b.iter(|| validator.validate(black_box(&batch)).map(|accepted| accepted.len()))
    });

    let docx = docx_package();
    c.bench_function("detect_mime_docx", |b| b.iter(|| detect_mime(black_box(&docx))));
}

fn bench_ticket_numbers(c: &mut Criterion) {
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default();

    c.bench_function("generate_ticket_number", |b| {
        b.iter(|| generate_ticket_number(black_box(date)))
    });

    let number = generate_ticket_number(date);
    c.bench_function("is_ticket_number", |b| b.iter(|| is_ticket_number(black_box(&number))));
}

criterion_group!(benches, bench_validation, bench_ticket_numbers);
criterion_main!(benches);

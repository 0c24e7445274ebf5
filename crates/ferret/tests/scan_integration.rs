//! End-to-end scan scenarios through the public API.

use ferret::bridge::ValidatorBridge;
use ferret::confidence::ConfidenceEngine;
use ferret::processor::{ParallelProcessor, discover_files};
use ferret::report::{ReportOptions, formatter_for};
use ferret::router::FileRouter;
use ferret::suppression::{SuppressionFilter, SuppressionRule};
use ferret::validators::{MetadataValidator, default_validators};
use ferret::{RedactionConfig, RedactionEngine};
use std::io::Write;
use std::sync::Arc;

fn processor() -> ParallelProcessor {
    let router = FileRouter::new();
    let capabilities = router.metadata_capable_types();
    let metadata_validator = MetadataValidator::new(Arc::new(move |t| capabilities.contains(&t)));
    let bridge = ValidatorBridge::new(default_validators(), Arc::new(metadata_validator));
    ParallelProcessor::new(router, bridge, ConfidenceEngine::new())
}

fn boxed(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&((payload.len() as u32 + 8).to_be_bytes()));
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
        body
    );
    let content_types = "<?xml version=\"1.0\"?><Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\"><Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/></Types>";
    let core = "<?xml version=\"1.0\"?><cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\"><dc:creator>Jordan Smith</dc:creator></cp:coreProperties>";

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(content_types.as_bytes()).unwrap();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(document.as_bytes()).unwrap();
        writer.start_file("docProps/core.xml", options).unwrap();
        writer.write_all(core.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

#[tokio::test]
async fn luhn_valid_card_in_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payment.txt");
    std::fs::write(&path, "Pay to card 4111 1111 1111 1111\n").unwrap();

    let outcome = processor().run(vec![path]).await;
    let report = &outcome.reports[0];
    assert_eq!(report.matches.len(), 1);
    let m = &report.matches[0];
    assert_eq!(m.match_type, "CREDIT_CARD");
    assert_eq!(m.line_number, Some(1));
    assert!(m.confidence >= 90.0, "confidence was {}", m.confidence);
    assert!(report.suppressed.is_empty());
}

#[tokio::test]
async fn invalid_luhn_candidate_scores_low_or_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "Number 4111 1111 1111 1112\n").unwrap();

    let outcome = processor().run(vec![path]).await;
    for m in &outcome.reports[0].matches {
        assert!(m.confidence < 40.0, "confidence was {}", m.confidence);
    }
}

#[tokio::test]
async fn gps_inside_mp4_atom_surfaces_as_video_metadata_match() {
    let fixed = |v: f64| (((v * 65536.0).round()) as i32).to_be_bytes();
    let mut payload = Vec::new();
    payload.extend_from_slice(&fixed(36.3506));
    payload.extend_from_slice(&fixed(-82.6985));
    payload.extend_from_slice(&fixed(447.403));
    let moov = boxed(b"moov", &boxed(b"udta", &boxed(&[0xA9, b'x', b'y', b'z'], &payload)));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trip.mov");
    std::fs::write(&path, &moov).unwrap();

    let outcome = processor().run(vec![path]).await;
    let report = &outcome.reports[0];
    assert_eq!(report.matches.len(), 1);
    let m = &report.matches[0];
    assert_eq!(m.match_type, "METADATA");
    assert_eq!(m.text, "36.350600, -82.698500, 447.403");
    assert_eq!(m.meta("preprocessor_type").and_then(|v| v.as_str()), Some("video"));
    assert_eq!(m.line_number, None);
}

#[tokio::test]
async fn ooxml_redaction_preserves_structure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.docx");
    std::fs::write(&path, build_docx(&["SSN 123-45-6789"])).unwrap();

    let engine = RedactionEngine::new(RedactionConfig::new(dir.path().join("out"))).unwrap();
    let outcome = processor().with_redaction(engine).run(vec![path.clone()]).await;
    let report = &outcome.reports[0];
    assert!(report.matches.iter().any(|m| m.match_type == "SSN"));

    let redaction = report.redaction.as_ref().expect("redaction result");
    assert!(redaction.success, "error: {:?}", redaction.error);
    let output_path = redaction.output_path.as_ref().unwrap();

    let entry_list = |bytes: &[u8]| -> Vec<String> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
        (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_string()).collect()
    };
    let original = std::fs::read(&path).unwrap();
    let redacted = std::fs::read(output_path).unwrap();
    assert_eq!(entry_list(&original), entry_list(&redacted));

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(redacted)).unwrap();
    let mut document = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("word/document.xml").unwrap(), &mut document).unwrap();
    assert!(document.contains("SSN [SSN-REDACTED]"), "document was: {}", document);
    assert!(!document.contains("123-45-6789"));
    // Still well-formed XML around the replacement.
    assert!(document.contains("<w:t>") && document.contains("</w:t>"));
}

#[tokio::test]
async fn dual_path_correlation_boost_applied_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.docx");
    std::fs::write(&path, build_docx(&["Pay to card 4242 4242 4242 4242"])).unwrap();

    let outcome = processor().run(vec![path]).await;
    let report = &outcome.reports[0];

    let card = report.matches.iter().find(|m| m.match_type == "CREDIT_CARD").expect("card match");
    let metadata = report.matches.iter().find(|m| m.match_type == "METADATA").expect("metadata match");
    assert_eq!(card.meta("cross_path_correlation").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(metadata.meta("cross_path_correlation").and_then(|v| v.as_bool()), Some(true));
}

#[tokio::test]
async fn suppression_with_expired_rule_flags_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hr.txt");
    std::fs::write(&path, "SSN 123-45-6789\n").unwrap();

    let rule = SuppressionRule {
        id: "expired-seed".to_string(),
        match_type: Some("SSN".to_string()),
        pattern: Some(r"123-45-\d{4}".to_string()),
        file: None,
        reason: Some("seed data".to_string()),
        enabled: true,
        expires_at: Some(chrono::Utc::now() - chrono::Duration::days(1)),
    };
    let suppression = SuppressionFilter::from_rules(vec![rule]).unwrap();

    let outcome = processor().with_suppression(suppression).run(vec![path]).await;
    let report = &outcome.reports[0];
    assert!(report.matches.iter().all(|m| m.match_type != "SSN"));
    let suppressed = report.suppressed.iter().find(|s| s.matched.match_type == "SSN").unwrap();
    assert!(suppressed.expired);

    // Default formatter hides the suppressed match; show_suppressed reveals
    // it with the expiry warning.
    let formatter = formatter_for("text").unwrap();
    let options = ReportOptions {
        no_color: true,
        ..ReportOptions::default()
    };
    let hidden = formatter.format(&report.matches, &report.suppressed, &options);
    assert!(!hidden.contains("expired-seed"));

    let options = ReportOptions {
        no_color: true,
        show_suppressed: true,
        ..ReportOptions::default()
    };
    let shown = formatter.format(&report.matches, &report.suppressed, &options);
    assert!(shown.contains("expired-seed"));
    assert!(shown.contains("EXPIRED"));
}

#[tokio::test]
async fn empty_files_produce_no_matches_and_no_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.txt");
    std::fs::write(&path, "").unwrap();

    let outcome = processor().run(vec![path]).await;
    let report = &outcome.reports[0];
    assert!(report.matches.is_empty());
    assert!(report.partial_failure.is_none());
}

#[tokio::test]
async fn all_emitted_confidences_are_in_range() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("everything.txt"),
        "card 4111 1111 1111 1111\nssn 123-45-6789\nmail maria@acme.io\ncall 423-733-9140\nhost 52.94.133.10\n",
    )
    .unwrap();

    let outcome = processor().run(discover_files(&[dir.path().to_path_buf()], false)).await;
    let matches: Vec<_> = outcome.reports.iter().flat_map(|r| r.matches.iter()).collect();
    assert!(!matches.is_empty());
    for m in matches {
        assert!(m.confidence > 0.0 && m.confidence <= 100.0, "{} out of range", m.confidence);
    }
}

#[tokio::test]
async fn preprocess_only_then_full_scan_agrees_on_body_matches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hr.txt");
    std::fs::write(&path, "SSN 123-45-6789 and mail maria@acme.io\n").unwrap();

    let preprocessed = processor().preprocess_only(true).run(vec![path.clone()]).await;
    let extracted = preprocessed.reports[0].processed.as_ref().unwrap().text.clone();

    // Re-scan the extracted text written to a new file.
    let replay = dir.path().join("replay.txt");
    std::fs::write(&replay, &extracted).unwrap();
    let second = processor().run(vec![replay]).await;
    let full = processor().run(vec![path]).await;

    let tags = |reports: &[ferret::processor::FileReport]| -> Vec<String> {
        let mut tags: Vec<String> = reports
            .iter()
            .flat_map(|r| r.matches.iter())
            .filter(|m| m.line_number.is_some())
            .map(|m| m.match_type.clone())
            .collect();
        tags.sort();
        tags
    };
    assert_eq!(tags(&second.reports), tags(&full.reports));
}

#[test]
fn mov_parser_bounded_on_pathological_input() {
    // A buffer full of max-size boxes must parse without unbounded work.
    let mut buf = Vec::new();
    for _ in 0..1000 {
        buf.extend_from_slice(&u32::MAX.to_be_bytes());
        buf.extend_from_slice(b"mdat");
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evil.mp4");
    std::fs::write(&path, &buf).unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let outcome = runtime.block_on(processor().run(vec![path]));
    assert_eq!(outcome.reports.len(), 1);
    assert!(outcome.reports[0].matches.is_empty());
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drive the built binaries end to end.

use std::io::{Cursor, Write};
use std::path::Path;
use std::process::{Command, Output};

use zip::write::{SimpleFileOptions, ZipWriter};

fn run(binary: &str, args: &[&std::ffi::OsStr]) -> Output {
    Command::new(binary)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn clean_text(args: &[&std::ffi::OsStr]) -> Output {
    run(env!("CARGO_BIN_EXE_clean-text"), args)
}

fn recover_text(args: &[&std::ffi::OsStr]) -> Output {
    run(env!("CARGO_BIN_EXE_recover-text"), args)
}

/// Config that keeps every external converter and OCR engine out of reach.
fn offline_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("offline.json");
    std::fs::write(
        &path,
        r#"{
            "service": { "program": "salvage-test-no-service", "args": [] },
            "raster": { "dpi": 150, "pdftoppm": "salvage-test-no-pdftoppm", "soffice": "salvage-test-no-soffice" },
            "ocr": { "engine": "tesseract", "tesseract": "salvage-test-no-tesseract", "language": "eng" }
        }"#,
    )
    .unwrap();
    path
}

#[test]
fn clean_text_writes_beside_the_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("slides.txt");
    std::fs::write(&input, "•Item one\r\n•Item  two\r\n").unwrap();

    let output = clean_text(&[input.as_os_str(), "-b".as_ref()]);
    assert!(output.status.success(), "{output:?}");

    let cleaned = std::fs::read_to_string(dir.path().join("slides_cleaned.txt")).unwrap();
    assert_eq!(cleaned, "•Item one\n•Item two\n");
}

#[test]
fn clean_text_honours_output_and_nlp() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ocr.txt");
    let target = dir.path().join("out/clean.txt");
    std::fs::write(&input, b"The exam-\nple was\nbroken.\n12\n").unwrap();

    let output = clean_text(&[
        input.as_os_str(),
        "-o".as_ref(),
        target.as_os_str(),
        "-a".as_ref(),
        "-n".as_ref(),
    ]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        std::fs::read_to_string(&target).unwrap(),
        "The example was broken.\n"
    );
}

#[test]
fn clean_text_fails_on_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let output = clean_text(&[dir.path().join("absent.txt").as_os_str()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not be found"));
}

#[test]
fn recover_text_repairs_a_deck_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("ppt/slides/slide1.xml", SimpleFileOptions::default())
        .unwrap();
    writer
        .write_all(
            br#"<p:sld xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree><p:sp><p:txBody>
<a:p><a:r><a:t>Quarterly revenue grew across every region this year</a:t></a:r></a:p>
</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
        )
        .unwrap();
    let mut bytes = writer.finish().unwrap().into_inner();
    let directory = bytes.windows(4).position(|w| w == b"PK\x01\x02").unwrap();
    bytes.truncate(directory);

    let input = dir.path().join("deck.pptx");
    std::fs::write(&input, bytes).unwrap();
    let config = offline_config(dir.path());

    let output = recover_text(&[
        input.as_os_str(),
        "--config".as_ref(),
        config.as_os_str(),
        "-w".as_ref(),
        dir.path().join("scratch").as_os_str(),
        "--report".as_ref(),
    ]);
    assert!(output.status.success(), "{output:?}");

    let text = std::fs::read_to_string(dir.path().join("deck.txt")).unwrap();
    assert!(text.contains("Quarterly revenue grew across every region"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("from 1 of 1 slide with structural-parse"), "{stderr}");

    // stdout is the report alone, ready for a JSON consumer.
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(report.get("accepted_strategy").is_some(), "{report}");
}

#[test]
fn recover_text_writes_nothing_for_empty_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.pdf");
    std::fs::write(&input, b"").unwrap();

    let output = recover_text(&[input.as_os_str()]);
    assert!(!output.status.success());
    assert!(!dir.path().join("empty.txt").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot be recovered"));
}

#[test]
fn recover_text_writes_nothing_when_every_strategy_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("noise.pptx");
    let mut bytes = b"PK\x03\x04".to_vec();
    bytes.extend((0..2048u32).map(|i| (i.wrapping_mul(2654435761) >> 24) as u8 | 0x80));
    std::fs::write(&input, &bytes).unwrap();
    let config = offline_config(dir.path());

    let output = recover_text(&[
        input.as_os_str(),
        "--config".as_ref(),
        config.as_os_str(),
        "-w".as_ref(),
        dir.path().join("scratch").as_os_str(),
    ]);
    assert!(!output.status.success(), "{output:?}");
    assert!(!dir.path().join("noise.txt").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No text could be recovered"));
    assert!(output.stdout.is_empty());
}

#[test]
fn recover_text_rejects_out_of_range_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("deck.pptx");
    std::fs::write(&input, b"PK\x03\x04junk").unwrap();

    let output = recover_text(&[input.as_os_str(), "--threshold".as_ref(), "1.5".as_ref()]);
    assert!(!output.status.success());
    assert!(!dir.path().join("deck.txt").exists());
}

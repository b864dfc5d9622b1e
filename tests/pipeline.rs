//! End-to-end conversion tests over in-memory archives.
//!
//! Every test builds a synthetic room export (manifest + token + assets),
//! runs the pipeline, and checks the output collection directly.

use room_minify::pipeline::{self, MinifyConfig, PipelineError};
use room_minify::recode::{self, RecodeConfig};
use room_minify::{archive, manifest, naming};

const MANIFEST: &str = "__data.json";
const TOKEN: &str = ".token";

/// A small real PNG, encoded with the image crate.
fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 13 % 256) as u8, (y * 7 % 256) as u8, 160, 255])
    });
    let mut out = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

/// A fake animated PNG: valid signature and chunk structure with an acTL
/// chunk. Never decoded — the sniffer routes it to pass-through first.
fn apng_bytes() -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    for (tag, payload_len) in [(b"IHDR", 13usize), (b"acTL", 8)] {
        data.extend_from_slice(&(payload_len as u32).to_be_bytes());
        data.extend_from_slice(tag);
        data.extend_from_slice(&vec![0u8; payload_len + 4]);
    }
    data
}

fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let map: archive::Entries = entries
        .iter()
        .map(|(name, bytes)| (name.to_string(), bytes.to_vec()))
        .collect();
    archive::write_entries(&map).unwrap()
}

fn convert(entries: &[(&str, &[u8])]) -> archive::Entries {
    let blob = build_archive(entries);
    let out = pipeline::minify_archive(&blob, &MinifyConfig::default(), None).unwrap();
    archive::read_entries(&out).unwrap()
}

#[test]
fn scenario_single_png_is_recoded_and_rewired() {
    let png = png_bytes(24, 24);
    let out = convert(&[
        (MANIFEST, br#"{"resources":{"a.png":{"type":"image/png"}}}"#),
        (TOKEN, b"0.original-token"),
        ("a.png", &png),
    ]);

    // Original name gone, exactly one recoded entry present
    assert!(!out.contains_key("a.png"));
    let webp_names: Vec<&String> = out.keys().filter(|n| n.ends_with(".webp")).collect();
    assert_eq!(webp_names.len(), 1);
    let new_name = webp_names[0].clone();

    // Entry is named by the digest of its own bytes, and matches an
    // independent recode of the input
    assert_eq!(new_name, naming::content_address(&out[&new_name]));
    let expected = recode::recode(&png, &RecodeConfig::default()).unwrap();
    assert_eq!(out[&new_name], expected);

    // Manifest rewired to the new name with the recoded media type
    let doc: serde_json::Value = serde_json::from_slice(&out[MANIFEST]).unwrap();
    let resources = doc["resources"].as_object().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(
        resources[new_name.as_str()],
        serde_json::json!({"type": "image/webp"})
    );

    // Token derived from the final manifest bytes
    assert_eq!(
        String::from_utf8(out[TOKEN].clone()).unwrap(),
        manifest::derive_token(&out[MANIFEST])
    );
}

#[test]
fn missing_manifest_is_a_precondition_failure() {
    let blob = build_archive(&[(TOKEN, b"0.x"), ("a.png", &png_bytes(4, 4))]);
    let result = pipeline::minify_archive(&blob, &MinifyConfig::default(), None);
    assert!(matches!(result, Err(PipelineError::MissingEntry(MANIFEST))));
}

#[test]
fn missing_token_is_a_precondition_failure() {
    let blob = build_archive(&[(MANIFEST, b"{}"), ("a.png", &png_bytes(4, 4))]);
    let result = pipeline::minify_archive(&blob, &MinifyConfig::default(), None);
    assert!(matches!(result, Err(PipelineError::MissingEntry(TOKEN))));
}

#[test]
fn animated_png_passes_through_unchanged() {
    let apng = apng_bytes();
    let out = convert(&[
        (MANIFEST, br#"{"resources":{"b.png":{"type":"image/png"}}}"#),
        (TOKEN, b"0.x"),
        ("b.png", &apng),
    ]);

    assert_eq!(out["b.png"], apng);
    assert!(!out.keys().any(|n| n.ends_with(".webp")));

    // No rename happened, so the manifest still references b.png
    let doc: serde_json::Value = serde_json::from_slice(&out[MANIFEST]).unwrap();
    assert_eq!(doc["resources"]["b.png"], serde_json::json!({"type": "image/png"}));
}

#[test]
fn bad_png_magic_aborts_the_run() {
    let blob = build_archive(&[
        (MANIFEST, b"{}"),
        (TOKEN, b"0.x"),
        ("broken.png", b"GIF89a pretending to be a png"),
    ]);
    let result = pipeline::minify_archive(&blob, &MinifyConfig::default(), None);
    match result {
        Err(PipelineError::Format { name, .. }) => assert_eq!(name, "broken.png"),
        other => panic!("expected Format error, got {other:?}"),
    }
}

#[test]
fn undecodable_png_aborts_the_run() {
    // Valid signature and chunk structure, garbage image data: passes the
    // animation sniff, fails pixel decode.
    let mut fake = b"\x89PNG\r\n\x1a\n".to_vec();
    fake.extend_from_slice(&13u32.to_be_bytes());
    fake.extend_from_slice(b"IHDR");
    fake.extend_from_slice(&[0u8; 17]);

    let good = png_bytes(8, 8);
    let blob = build_archive(&[
        (MANIFEST, b"{}"),
        (TOKEN, b"0.x"),
        ("good.png", &good),
        ("fake.png", &fake),
    ]);
    let result = pipeline::minify_archive(&blob, &MinifyConfig::default(), None);
    match result {
        Err(PipelineError::Recode { name, .. }) => assert_eq!(name, "fake.png"),
        other => panic!("expected Recode error, got {other:?}"),
    }
}

#[test]
fn opaque_entries_are_byte_identical() {
    let notes = b"session notes, mentions a.png in passing".as_slice();
    let blob_data = [0u8, 159, 146, 150].as_slice();
    let out = convert(&[
        (MANIFEST, b"{}"),
        (TOKEN, b"0.x"),
        ("notes.txt", notes),
        ("audio/theme.ogg", blob_data),
    ]);

    assert_eq!(out["notes.txt"], notes);
    assert_eq!(out["audio/theme.ogg"], blob_data);
}

#[test]
fn identical_images_deduplicate_to_one_entry() {
    let png = png_bytes(16, 16);
    let out = convert(&[
        (
            MANIFEST,
            br#"{"resources":{"a.png":{"type":"image/png"},"copy/b.png":{"type":"image/png"}}}"#,
        ),
        (TOKEN, b"0.x"),
        ("a.png", &png),
        ("copy/b.png", &png),
    ]);

    assert!(!out.contains_key("a.png"));
    assert!(!out.contains_key("copy/b.png"));
    let webp_names: Vec<&String> = out.keys().filter(|n| n.ends_with(".webp")).collect();
    assert_eq!(webp_names.len(), 1, "identical assets share one address");

    // Both manifest references point at the shared entry
    let doc: serde_json::Value = serde_json::from_slice(&out[MANIFEST]).unwrap();
    let resources = doc["resources"].as_object().unwrap();
    assert_eq!(resources.len(), 1);
    assert!(resources.contains_key(webp_names[0].as_str()));
}

#[test]
fn conversion_is_reproducible() {
    let png = png_bytes(12, 20);
    let entries: &[(&str, &[u8])] = &[
        (MANIFEST, br#"{"resources":{"a.png":{"type":"image/png"}}}"#),
        (TOKEN, b"0.x"),
        ("a.png", &png),
        ("notes.txt", b"hello"),
    ];
    let blob = build_archive(entries);
    let config = MinifyConfig::default();
    let first = pipeline::minify_archive(&blob, &config, None).unwrap();
    let second = pipeline::minify_archive(&blob, &config, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn token_is_always_replaced() {
    let out = convert(&[(MANIFEST, br#"{"name":"room"}"#), (TOKEN, b"garbage-token")]);
    let token = String::from_utf8(out[TOKEN].clone()).unwrap();
    assert_ne!(token, "garbage-token");
    assert_eq!(token, manifest::derive_token(&out[MANIFEST]));
}

#[test]
fn progress_counts_candidates_monotonically() {
    let png = png_bytes(8, 8);
    let apng = apng_bytes();
    let blob = build_archive(&[
        (MANIFEST, b"{}"),
        (TOKEN, b"0.x"),
        ("a.png", &png),
        ("b.png", &apng),
        ("c.jpg", &png), // png bytes under a jpg name still decode
        ("notes.txt", b"not a candidate"),
    ]);

    let (tx, rx) = std::sync::mpsc::channel();
    pipeline::minify_archive(&blob, &MinifyConfig::default(), Some(tx)).unwrap();

    let mut events: Vec<_> = rx.iter().collect();
    assert_eq!(events.len(), 3, "one event per candidate, none for notes.txt");
    assert!(events.iter().all(|e| e.total == 3));

    events.sort_by_key(|e| e.completed);
    let completed: Vec<usize> = events.iter().map(|e| e.completed).collect();
    assert_eq!(completed, vec![1, 2, 3]);

    let animated = events.iter().find(|e| e.name == "b.png").unwrap();
    assert!(animated.output_len.is_none());
    assert!(events.iter().filter(|e| e.name != "b.png").all(|e| e.output_len.is_some()));
}

#[test]
fn embedding_entry_point_round_trips_through_disk() {
    let png = png_bytes(10, 10);
    let blob = build_archive(&[
        (MANIFEST, br#"{"resources":{"a.png":{"type":"image/png"}}}"#),
        (TOKEN, b"0.x"),
        ("a.png", &png),
    ]);

    let converted = room_minify::minify(&blob).unwrap();

    // Persist and re-read as the CLI would
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("room_compressed.zip");
    std::fs::write(&path, &converted).unwrap();
    let reread = std::fs::read(&path).unwrap();

    let out = archive::read_entries(&reread).unwrap();
    assert!(out.contains_key(MANIFEST));
    assert!(out.contains_key(TOKEN));
    assert!(out.keys().any(|n| n.ends_with(".webp")));
}

#[test]
fn embedding_entry_point_flattens_errors_to_strings() {
    let blob = build_archive(&[(TOKEN, b"0.x")]);
    let error = room_minify::minify(&blob).unwrap_err();
    assert_eq!(error, "__data.json not found");
}

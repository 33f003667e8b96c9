//! Integration tests for the register and compare flows.
//!
//! These tests run the service against the on-disk stores:
//! - SQLite record store and filesystem blob store from a config file
//! - Identical and alpha-carrying copies of a reference
//! - Persistence across service instances
//! - Corrupt stored fingerprints
//! - WEBP, re-encoded JPEG and truncated JPEG inputs

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, Rgba};
use image_similarity_checker::core::service::{
    CompareRequest, ImageUpload, RegisterRequest, SimilarityService,
};
use image_similarity_checker::core::store::{RecordStore, SqliteRecordStore};
use image_similarity_checker::core::MatchType;
use image_similarity_checker::AppConfig;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

fn pattern(seed: u32) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    ImageBuffer::from_fn(96, 96, |x, y| {
        let band = ((x / 12 + y / 16 * seed) % 2) as u8;
        let v = ((x * (seed + 2) + y * (seed + 5)) % 200) as u8;
        Rgb([v / 2 + band * 120, v, 255 - v])
    })
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

fn png(seed: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(pattern(seed)), ImageFormat::Png)
}

fn opaque_rgba_png(seed: u32) -> Vec<u8> {
    let rgb = pattern(seed);
    let rgba = ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        Rgba([p[0], p[1], p[2], 255])
    });
    encode(DynamicImage::ImageRgba8(rgba), ImageFormat::Png)
}

fn textured() -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(256, 192, |x, y| {
        let fx = x as f32 / 256.0;
        let fy = y as f32 / 192.0;
        let v = 128.0 + 100.0 * (fx * 9.0).sin() * (fy * 5.0).cos();
        let w = 128.0 + 90.0 * (fx * 4.0 + fy * 7.0).cos();
        Rgb([v as u8, w as u8, ((v + w) / 2.0) as u8])
    }))
}

fn jpeg(image: &DynamicImage, quality: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
        .unwrap();
    bytes
}

fn write_config(dir: &Path) -> AppConfig {
    let path = dir.join("imgsim.toml");
    fs::write(
        &path,
        format!(
            "database_path = {:?}\nblob_root = {:?}\ndefault_top_k = 3\n",
            dir.join("db").join("references.db").display().to_string(),
            dir.join("blobs").display().to_string(),
        ),
    )
    .unwrap();
    AppConfig::load(Some(&path)).unwrap()
}

#[test]
fn identical_image_scores_one_hundred() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let service = SimilarityService::from_config(&config).unwrap();

    let report = service
        .register(RegisterRequest::new(
            vec![
                ImageUpload::new("first.png", png(1)),
                ImageUpload::new("second.png", png(7)),
            ],
            Some("catalogue / spring".to_string()),
        ))
        .unwrap();
    assert_eq!(report.registered.len(), 2);
    assert!(report.failed.is_empty());

    let result = service
        .compare(CompareRequest::new(
            ImageUpload::new("query.png", png(1)),
            0.0,
            config.default_top_k,
        ))
        .unwrap();

    assert_eq!(result.total_references, 2);
    let best = &result.outcome.matches[0];
    assert_eq!(best.file_name, "first.png");
    assert_eq!(best.similarity, 100.0);
    assert_eq!(best.distance, 0);
    assert_eq!(best.match_type, MatchType::Exact);
    assert_eq!(best.annotation.as_deref(), Some("catalogue / spring"));
}

#[test]
fn opaque_alpha_copy_matches_its_reference() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let service = SimilarityService::from_config(&config).unwrap();

    service
        .register(RegisterRequest::new(
            vec![ImageUpload::new("reference.png", png(3))],
            None,
        ))
        .unwrap();

    let result = service
        .compare(CompareRequest::new(
            ImageUpload::new("with-alpha.png", opaque_rgba_png(3)),
            40.0,
            5,
        ))
        .unwrap();

    assert_eq!(result.outcome.matches.len(), 1);
    assert_eq!(result.outcome.matches[0].similarity, 100.0);
}

#[test]
fn reencoded_copy_ranks_above_unrelated_image() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let service = SimilarityService::from_config(&config).unwrap();

    service
        .register(RegisterRequest::new(
            vec![
                ImageUpload::new("target.png", png(4)),
                ImageUpload::new("other.png", png(11)),
            ],
            None,
        ))
        .unwrap();

    let query = jpeg(&DynamicImage::ImageRgb8(pattern(4)), 85);
    let result = service
        .compare(CompareRequest::new(
            ImageUpload::new("query.jpg", query),
            0.0,
            2,
        ))
        .unwrap();

    assert_eq!(result.outcome.matches.len(), 2);
    assert_eq!(result.outcome.matches[0].file_name, "target.png");
    assert!(result.outcome.matches[0].similarity >= result.outcome.matches[1].similarity);
}

#[test]
fn references_survive_reopening_the_stores() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());

    let locator = {
        let service = SimilarityService::from_config(&config).unwrap();
        let report = service
            .register(RegisterRequest::new(
                vec![ImageUpload::new("kept.png", png(5))],
                Some("keep me".to_string()),
            ))
            .unwrap();
        report.registered[0].locator.clone()
    };

    assert!(locator.starts_with("source-images/"));
    assert!(locator.ends_with(".png"));

    let service = SimilarityService::from_config(&config).unwrap();
    let references = service.list_references().unwrap();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].annotation.as_deref(), Some("keep me"));

    let stored = service.fetch_image(&locator).unwrap();
    assert_eq!(stored, png(5));
    assert!(config.blob_root.join(&locator).exists());

    service.update_annotation(references[0].id, Some("   ")).unwrap();
    assert_eq!(service.reference(references[0].id).unwrap().annotation, None);
}

#[test]
fn corrupt_stored_fingerprint_is_skipped_not_scored() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());

    {
        let service = SimilarityService::from_config(&config).unwrap();
        service
            .register(RegisterRequest::new(
                vec![ImageUpload::new("good.png", png(6))],
                None,
            ))
            .unwrap();
    }

    {
        let records = SqliteRecordStore::open(&config.database_path).unwrap();
        records
            .insert(image_similarity_checker::core::store::NewReference {
                file_name: "bad.png".to_string(),
                locator: "source-images/missing.png".to_string(),
                fingerprint: "not-a-hash".to_string(),
                annotation: None,
            })
            .unwrap();
    }

    let service = SimilarityService::from_config(&config).unwrap();
    let result = service
        .compare(CompareRequest::new(
            ImageUpload::new("query.png", png(6)),
            0.0,
            5,
        ))
        .unwrap();

    assert_eq!(result.total_references, 2);
    assert_eq!(result.outcome.matches.len(), 1);
    assert_eq!(result.outcome.matches[0].file_name, "good.png");
    assert_eq!(result.outcome.skipped.len(), 1);
    assert_eq!(result.outcome.skipped[0].file_name, "bad.png");
}

#[test]
fn compare_with_no_references_returns_empty() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let service = SimilarityService::from_config(&config).unwrap();

    let result = service
        .compare(CompareRequest::new(
            ImageUpload::new("query.png", png(2)),
            40.0,
            5,
        ))
        .unwrap();

    assert_eq!(result.total_references, 0);
    assert!(result.outcome.matches.is_empty());
    assert!(result.outcome.skipped.is_empty());
}

#[test]
fn jpeg_reencode_of_textured_image_stays_near_duplicate() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let service = SimilarityService::from_config(&config).unwrap();

    let source = textured();
    service
        .register(RegisterRequest::new(
            vec![ImageUpload::new("master.png", encode(source.clone(), ImageFormat::Png))],
            None,
        ))
        .unwrap();

    let result = service
        .compare(CompareRequest::new(
            ImageUpload::new("reencoded.jpg", jpeg(&source, 80)),
            0.0,
            1,
        ))
        .unwrap();

    assert_eq!(result.outcome.matches.len(), 1);
    assert!(
        result.outcome.matches[0].similarity >= 90.0,
        "re-encoded copy scored {}",
        result.outcome.matches[0].similarity
    );
}

#[test]
fn webp_copy_scores_one_hundred() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let service = SimilarityService::from_config(&config).unwrap();

    service
        .register(RegisterRequest::new(
            vec![ImageUpload::new("reference.png", png(8))],
            None,
        ))
        .unwrap();

    let webp = encode(DynamicImage::ImageRgb8(pattern(8)), ImageFormat::WebP);
    let result = service
        .compare(CompareRequest::new(
            ImageUpload::new("copy.webp", webp),
            40.0,
            5,
        ))
        .unwrap();

    assert_eq!(result.outcome.matches.len(), 1);
    assert_eq!(result.outcome.matches[0].similarity, 100.0);
}

#[test]
fn truncated_jpeg_is_reported_not_registered() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let service = SimilarityService::from_config(&config).unwrap();

    let full = jpeg(&textured(), 90);
    let truncated = full[..full.len() / 3].to_vec();

    let report = service
        .register(RegisterRequest::new(
            vec![
                ImageUpload::new("cut.jpg", truncated.clone()),
                ImageUpload::new("whole.jpg", full),
            ],
            None,
        ))
        .unwrap();

    assert_eq!(report.registered.len(), 1);
    assert_eq!(report.registered[0].file_name, "whole.jpg");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].file_name, "cut.jpg");
    assert!(report.failed[0].reason.contains("truncated JPEG"));

    let compared = service.compare(CompareRequest::new(
        ImageUpload::new("cut.jpg", truncated),
        0.0,
        5,
    ));
    assert!(compared.is_err());
}

use chrono::{NaiveDate, NaiveDateTime};
use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use panchayat_core::db::open_db_in_memory;
use panchayat_core::integrity::{
    content_hash, exceeds_radius, haversine_km, PhotoSubmission, DUPLICATE_REASON,
};
use panchayat_core::model::feedback::NewFeedback;
use panchayat_core::model::location::{GeoPoint, Village};
use panchayat_core::model::project::NewProject;
use panchayat_core::repo::feedback_repo::{FeedbackRepository, SqliteFeedbackRepository};
use panchayat_core::repo::location_repo::{LocationRepository, SqliteLocationRepository};
use panchayat_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use panchayat_core::storage::{FileStore, LocalFileStore};
use panchayat_core::{IntegrityChecker, IntegrityGate, IntegrityPolicy};
use rusqlite::Connection;
use std::io::Cursor;

const VILLAGE_POINT: GeoPoint = GeoPoint {
    latitude: 25.0,
    longitude: 85.0,
};

#[test]
fn byte_identical_second_upload_is_flagged_as_duplicate() {
    let (conn, project_id) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::open(dir.path()).unwrap();
    let feedback = SqliteFeedbackRepository::new(&conn);
    let checker = IntegrityChecker::default();
    let photo = camera_jpeg(64, 48, "Camera 1.0");

    let first = checker
        .check(&feedback, &store, &submission("site.jpg", &photo, None, None))
        .unwrap();
    assert!(!first.flagged);
    persist(&feedback, project_id, &first.image_hash);

    let second = checker
        .check(&feedback, &store, &submission("site.jpg", &photo, None, None))
        .unwrap();
    assert!(second.flagged);
    assert_eq!(second.flagged_by, Some(IntegrityGate::Duplicate));
    assert_eq!(second.flag_reason.as_deref(), Some(DUPLICATE_REASON));
    assert_eq!(second.image_hash, first.image_hash);
    assert_ne!(second.stored_path, first.stored_path);
}

#[test]
fn one_extra_byte_is_not_a_duplicate() {
    let (conn, project_id) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::open(dir.path()).unwrap();
    let feedback = SqliteFeedbackRepository::new(&conn);
    let checker = IntegrityChecker::default();

    let photo = camera_jpeg(64, 48, "Camera 1.0");
    let first = checker
        .check(&feedback, &store, &submission("a.jpg", &photo, None, None))
        .unwrap();
    persist(&feedback, project_id, &first.image_hash);

    let mut altered = photo.clone();
    let last = altered.len() - 1;
    altered.push(altered[last]);
    let second = checker
        .check(&feedback, &store, &submission("b.jpg", &altered, None, None))
        .unwrap();

    assert_ne!(second.image_hash, first.image_hash);
    assert_ne!(second.flagged_by, Some(IntegrityGate::Duplicate));
}

#[test]
fn editing_software_in_exif_is_flagged() {
    let (conn, _) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::open(dir.path()).unwrap();
    let feedback = SqliteFeedbackRepository::new(&conn);

    let photo = camera_jpeg(64, 48, "GIMP 2.10");
    let verdict = IntegrityChecker::default()
        .check(&feedback, &store, &submission("edit.jpg", &photo, None, None))
        .unwrap();

    assert!(verdict.flagged);
    assert_eq!(verdict.flagged_by, Some(IntegrityGate::Manipulation));
    assert_eq!(verdict.flag_reason.as_deref(), Some("AI Flag: Edited with GIMP 2.10"));
}

#[test]
fn photo_without_exif_at_generator_size_lists_both_reasons() {
    let (conn, _) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::open(dir.path()).unwrap();
    let feedback = SqliteFeedbackRepository::new(&conn);

    let verdict = IntegrityChecker::default()
        .check(&feedback, &store, &submission("gen.png", &plain_png(1024, 1024), None, None))
        .unwrap();

    assert_eq!(
        verdict.flag_reason.as_deref(),
        Some("AI Flag: Missing EXIF Metadata (Possible Edit/AI), Suspicious Dimensions (1024x1024)")
    );
}

#[test]
fn photo_far_from_village_is_out_of_bounds() {
    let (conn, _) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::open(dir.path()).unwrap();
    let feedback = SqliteFeedbackRepository::new(&conn);
    let village = village();

    let photo = camera_jpeg(64, 48, "Camera 1.0");
    let far = GeoPoint::new(25.01, 85.0);
    let verdict = IntegrityChecker::default()
        .check(
            &feedback,
            &store,
            &submission("far.jpg", &photo, Some(far), Some(&village)),
        )
        .unwrap();

    assert!(verdict.flagged);
    assert_eq!(verdict.flagged_by, Some(IntegrityGate::Geofence));
    assert_eq!(
        verdict.flag_reason.as_deref(),
        Some("Out of Bounds: Photo taken 1.11km away from Rampur")
    );
}

#[test]
fn photo_inside_radius_passes_every_gate() {
    let (conn, _) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::open(dir.path()).unwrap();
    let feedback = SqliteFeedbackRepository::new(&conn);
    let village = village();

    let photo = camera_jpeg(64, 48, "Camera 1.0");
    let near = GeoPoint::new(25.002, 85.0);
    let verdict = IntegrityChecker::default()
        .check(
            &feedback,
            &store,
            &submission("near.jpg", &photo, Some(near), Some(&village)),
        )
        .unwrap();

    assert!(!verdict.flagged);
    assert_eq!(verdict.flag_reason, None);
    assert!(verdict.annotated);
}

#[test]
fn geofence_boundary_is_exclusive() {
    assert!(!exceeds_radius(0.5, 0.5));
    assert!(exceeds_radius(0.500_001, 0.5));

    let d = haversine_km(VILLAGE_POINT, GeoPoint::new(25.004, 85.0));
    assert!(d < 0.5 && !exceeds_radius(d, 0.5));
}

#[test]
fn photo_exactly_on_the_radius_is_not_flagged() {
    let (conn, _) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::open(dir.path()).unwrap();
    let feedback = SqliteFeedbackRepository::new(&conn);
    let village = village();

    let photo_point = GeoPoint::new(25.0045, 85.0);
    let distance = haversine_km(photo_point, VILLAGE_POINT);
    let on_edge = IntegrityChecker::new(IntegrityPolicy {
        geofence_radius_km: distance,
        ..IntegrityPolicy::default()
    });
    let photo = camera_jpeg(64, 48, "Camera 1.0");

    let verdict = on_edge
        .check(
            &feedback,
            &store,
            &submission("edge.jpg", &photo, Some(photo_point), Some(&village)),
        )
        .unwrap();
    assert!(!verdict.flagged);
    assert_eq!(verdict.flagged_by, None);

    let just_inside = IntegrityChecker::new(IntegrityPolicy {
        geofence_radius_km: distance - 1e-9,
        ..IntegrityPolicy::default()
    });
    let verdict = just_inside
        .check(
            &feedback,
            &store,
            &submission("edge.jpg", &photo, Some(photo_point), Some(&village)),
        )
        .unwrap();
    assert!(verdict.flagged);
    assert_eq!(verdict.flagged_by, Some(IntegrityGate::Geofence));
}

#[test]
fn wider_policy_radius_accepts_distant_photo() {
    let (conn, _) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::open(dir.path()).unwrap();
    let feedback = SqliteFeedbackRepository::new(&conn);
    let village = village();
    let checker = IntegrityChecker::new(IntegrityPolicy {
        geofence_radius_km: 2.0,
        ..IntegrityPolicy::default()
    });

    let photo = camera_jpeg(64, 48, "Camera 1.0");
    let verdict = checker
        .check(
            &feedback,
            &store,
            &submission("far.jpg", &photo, Some(GeoPoint::new(25.01, 85.0)), Some(&village)),
        )
        .unwrap();
    assert!(!verdict.flagged);
}

#[test]
fn stored_copy_is_annotated_but_hash_covers_raw_upload() {
    let (conn, _) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::open(dir.path()).unwrap();
    let feedback = SqliteFeedbackRepository::new(&conn);

    let photo = plain_png(240, 120);
    let verdict = IntegrityChecker::default()
        .check(
            &feedback,
            &store,
            &submission("site.png", &photo, Some(VILLAGE_POINT), None),
        )
        .unwrap();

    assert!(verdict.annotated);
    assert_eq!(verdict.image_hash, content_hash(&photo));

    let stored = store.read(&verdict.stored_path).unwrap();
    assert_ne!(stored, photo);
    let decoded = image::load_from_memory(&stored).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (240, 120));
}

#[test]
fn corrupt_upload_is_stored_without_heuristic_flag() {
    let (conn, _) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore::open(dir.path()).unwrap();
    let feedback = SqliteFeedbackRepository::new(&conn);

    let verdict = IntegrityChecker::default()
        .check(&feedback, &store, &submission("junk.jpg", b"\xFF\xD8 truncated", None, None))
        .unwrap();

    assert!(!verdict.flagged);
    assert!(!verdict.annotated);
    assert_eq!(store.read(&verdict.stored_path).unwrap(), b"\xFF\xD8 truncated");
}

fn captured_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn submission<'a>(
    file_name: &'a str,
    bytes: &'a [u8],
    location: Option<GeoPoint>,
    village: Option<&'a Village>,
) -> PhotoSubmission<'a> {
    PhotoSubmission {
        file_name,
        bytes,
        location,
        village,
        captured_at: captured_at(),
    }
}

fn village() -> Village {
    Village {
        id: 1,
        name: "Rampur".to_string(),
        block_id: 1,
        location: Some(VILLAGE_POINT),
    }
}

fn seeded_db() -> (Connection, i64) {
    let conn = open_db_in_memory().unwrap();
    let locations = SqliteLocationRepository::new(&conn);
    let state = locations.create_state("Bihar").unwrap();
    let district = locations.create_district(state, "Patna").unwrap();
    let block = locations.create_block(district, "Danapur").unwrap();
    let village = locations
        .create_village(block, "Rampur", Some(VILLAGE_POINT))
        .unwrap();
    let project_id = SqliteProjectRepository::new(&conn)
        .create_project(&NewProject::new(village, "Village road"))
        .unwrap();
    (conn, project_id)
}

fn persist(feedback: &SqliteFeedbackRepository<'_>, project_id: i64, image_hash: &str) {
    feedback
        .create_feedback(&NewFeedback {
            project_id,
            rating: 4,
            comment: String::new(),
            image_path: None,
            image_hash: Some(image_hash.to_string()),
            is_flagged: false,
            flag_reason: None,
            location: None,
        })
        .unwrap();
}

fn plain_png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 120, 60])));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// JPEG carrying an APP1 EXIF segment with the given `Software` tag.
fn camera_jpeg(width: u32, height: u32, software: &str) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 90, 200])));
    let mut jpeg = Cursor::new(Vec::new());
    image.write_to(&mut jpeg, ImageFormat::Jpeg).unwrap();
    let jpeg = jpeg.into_inner();

    let field = Field {
        tag: Tag::Software,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![software.as_bytes().to_vec()]),
    };
    let mut writer = Writer::new();
    writer.push_field(&field);
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let segment_len = u16::try_from(2 + 6 + tiff.len()).unwrap();
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

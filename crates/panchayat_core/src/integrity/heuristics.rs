//! Manipulation heuristics over image geometry and EXIF metadata.
//!
//! Each heuristic is an independent predicate yielding an optional reason;
//! non-empty reasons are joined in declaration order.

use super::IntegrityPolicy;
use exif::{Exif, In, Tag, Value};
use log::warn;
use std::io::Cursor;

type Heuristic = fn(&PhotoFacts, &IntegrityPolicy) -> Option<String>;

const HEURISTICS: &[Heuristic] = &[missing_metadata, suspicious_dimensions, editing_software];

enum Metadata {
    Present(Exif),
    Missing,
    /// Container has an EXIF block that failed to parse.
    Unreadable,
}

struct PhotoFacts {
    width: u32,
    height: u32,
    metadata: Metadata,
}

/// Returns the joined reasons when any heuristic fires.
///
/// An undecodable image yields `None`: the gate degrades instead of failing.
pub fn inspect_photo(bytes: &[u8], policy: &IntegrityPolicy) -> Option<String> {
    let facts = match read_facts(bytes) {
        Ok(facts) => facts,
        Err(err) => {
            warn!("event=photo_inspect module=integrity status=error error={err}");
            return None;
        }
    };

    let reasons: Vec<String> = HEURISTICS
        .iter()
        .filter_map(|heuristic| heuristic(&facts, policy))
        .collect();

    if reasons.is_empty() {
        None
    } else {
        Some(reasons.join(", "))
    }
}

fn read_facts(bytes: &[u8]) -> Result<PhotoFacts, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;

    let metadata = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) if exif.fields().next().is_some() => Metadata::Present(exif),
        Ok(_) | Err(exif::Error::NotFound(_)) => Metadata::Missing,
        Err(err) => {
            warn!("event=exif_read module=integrity status=error error={err}");
            Metadata::Unreadable
        }
    };

    Ok(PhotoFacts {
        width: decoded.width(),
        height: decoded.height(),
        metadata,
    })
}

fn missing_metadata(facts: &PhotoFacts, _: &IntegrityPolicy) -> Option<String> {
    matches!(facts.metadata, Metadata::Missing)
        .then(|| "Missing EXIF Metadata (Possible Edit/AI)".to_string())
}

fn suspicious_dimensions(facts: &PhotoFacts, policy: &IntegrityPolicy) -> Option<String> {
    let square = facts.width == facts.height;
    (square && policy.suspicious_dimensions.contains(&facts.width))
        .then(|| format!("Suspicious Dimensions ({}x{})", facts.width, facts.height))
}

fn editing_software(facts: &PhotoFacts, policy: &IntegrityPolicy) -> Option<String> {
    let Metadata::Present(exif) = &facts.metadata else {
        return None;
    };
    let software = software_tag(exif)?;
    let lowered = software.to_ascii_lowercase();
    policy
        .editing_tools
        .iter()
        .any(|tool| lowered.contains(tool.to_ascii_lowercase().as_str()))
        .then(|| format!("Edited with {software}"))
}

fn software_tag(exif: &Exif) -> Option<String> {
    let field = exif.get_field(Tag::Software, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => {
            let text = parts
                .iter()
                .map(|part| String::from_utf8_lossy(part).trim_end_matches('\0').to_string())
                .collect::<Vec<_>>()
                .join(" ");
            let text = text.trim().to_string();
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::inspect_photo;
    use crate::integrity::IntegrityPolicy;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn garbage_bytes_do_not_flag() {
        assert_eq!(inspect_photo(b"not an image", &IntegrityPolicy::default()), None);
    }

    #[test]
    fn square_generator_size_adds_dimension_reason_after_missing_exif() {
        let reasons = inspect_photo(&png(512, 512), &IntegrityPolicy::default()).unwrap();
        assert_eq!(
            reasons,
            "Missing EXIF Metadata (Possible Edit/AI), Suspicious Dimensions (512x512)"
        );
    }

    #[test]
    fn non_generator_square_only_reports_missing_exif() {
        let reasons = inspect_photo(&png(300, 300), &IntegrityPolicy::default()).unwrap();
        assert_eq!(reasons, "Missing EXIF Metadata (Possible Edit/AI)");
    }
}

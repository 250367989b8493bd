use chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeZone};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// Folder label for images whose date cannot be resolved.
pub const UNKNOWN_DATE_LABEL: &str = "Unknown_Date";

/// Best-effort "date taken" for an image file. Linear fallback chain,
/// terminal on first success: EXIF capture time, then mtime, then creation
/// time (both only when the year is after 1970, guarding against sentinel
/// timestamps), then none. Never returns an error and never panics.
pub fn resolve_date_taken(path: &Path) -> Option<DateTime<Local>> {
    if !path.exists() {
        return None;
    }

    if let Some(taken) = exif_capture_time(path) {
        return Some(taken);
    }

    let meta = std::fs::metadata(path).ok()?;

    if let Some(modified) = meta
        .modified()
        .ok()
        .map(to_local)
        .filter(|d| d.year() > 1970)
    {
        return Some(modified);
    }

    if let Some(created) = meta
        .created()
        .ok()
        .map(to_local)
        .filter(|d| d.year() > 1970)
    {
        return Some(created);
    }

    None
}

/// Date-folder label: `YYYY-MM-DD`, or the unknown sentinel.
pub fn date_folder_label(taken: Option<DateTime<Local>>) -> String {
    match taken {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => UNKNOWN_DATE_LABEL.to_string(),
    }
}

fn to_local(time: SystemTime) -> DateTime<Local> {
    DateTime::<Local>::from(time)
}

/// EXIF `DateTimeOriginal` (falling back to `DateTime`), swallowing every
/// failure along the way.
fn exif_capture_time(path: &Path) -> Option<DateTime<Local>> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let data = exif::Reader::new().read_from_container(&mut reader).ok()?;

    let field = data
        .get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)
        .or_else(|| data.get_field(exif::Tag::DateTime, exif::In::PRIMARY))?;

    let text = field.display_value().to_string();
    let naive = NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&text, "%Y:%m:%d %H:%M:%S"))
        .ok()?;

    debug!("EXIF capture time for {}: {}", path.display(), naive);
    Local.from_local_datetime(&naive).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use filetime::FileTime;

    #[test]
    fn nonexistent_path_has_no_date() {
        assert_eq!(
            resolve_date_taken(Path::new("/definitely/not/here.jpg")),
            None
        );
    }

    #[test]
    fn falls_back_to_mtime_without_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.jpg");
        std::fs::write(&file, b"not a real jpeg").unwrap();

        let forced = Utc.with_ymd_and_hms(2023, 1, 15, 12, 0, 0).unwrap();
        filetime::set_file_mtime(&file, FileTime::from_unix_time(forced.timestamp(), 0)).unwrap();

        let taken = resolve_date_taken(&file).expect("mtime fallback should resolve");
        assert!((taken.timestamp() - forced.timestamp()).abs() <= 1);
    }

    #[test]
    fn unknown_date_label() {
        assert_eq!(date_folder_label(None), UNKNOWN_DATE_LABEL);
        let d = Local.with_ymd_and_hms(2023, 10, 20, 8, 30, 0).unwrap();
        assert_eq!(date_folder_label(Some(d)), "2023-10-20");
    }
}

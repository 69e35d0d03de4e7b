//! Writing takes to disk.

use chrono::{DateTime, Utc};
use ls_formats::{smf_to_bytes, FormatError};
use ls_ir::{LoopGeometry, Tempo, TrackBank};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("failed to encode: {0}")]
    Encode(#[from] FormatError),
    #[error("failed to write {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}

/// `20240131_235959_GMT.mid`
pub fn file_name(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S_GMT.mid").to_string()
}

/// First path under `dir` named after `at` that does not exist yet. A second
/// save within the same second gets a `_2`, `_3`... suffix.
fn unused_path(dir: &Path, at: DateTime<Utc>) -> PathBuf {
    let path = dir.join(file_name(at));
    if !path.exists() {
        return path;
    }
    let stem = at.format("%Y%m%d_%H%M%S_GMT").to_string();
    (2u32..)
        .map(|n| dir.join(format!("{}_{}.mid", stem, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(path)
}

/// Save `tracks` under `dir`, named after `at`.
///
/// The bytes go to a `.part` file first and are renamed into place, so a
/// failed save never leaves a truncated `.mid` behind. Earlier saves are
/// never replaced.
pub fn save_to(
    dir: &Path,
    at: DateTime<Utc>,
    tracks: &TrackBank,
    tempo: Tempo,
    geometry: &LoopGeometry,
) -> Result<PathBuf, SaveError> {
    let bytes = smf_to_bytes(tracks, tempo, geometry)?;

    let path = unused_path(dir, at);
    let part = path.with_extension("mid.part");
    let result = fs::write(&part, &bytes).and_then(|()| fs::rename(&part, &path));
    if let Err(source) = result {
        let _ = fs::remove_file(&part);
        return Err(SaveError::Io { path, source });
    }

    log::info!(
        target: "save",
        "saved {} events on {} tracks to {}",
        tracks.total_events(),
        tracks.non_empty().count(),
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ls_ir::Event;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap()
    }

    #[test]
    fn name_is_utc_timestamp() {
        assert_eq!(file_name(at()), "20240309_070501_GMT.mid");
    }

    #[test]
    fn empty_bank_saves_conductor_track() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_to(dir.path(), at(), &TrackBank::new(4), Tempo::default(), &LoopGeometry::default()).unwrap();
        let file = ls_formats::read_smf(&fs::read(path).unwrap()).unwrap();
        assert_eq!(file.tracks.len(), 1);
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir");
        let mut bank = TrackBank::new(4);
        bank.get_mut(0).unwrap().push(Event::note_on(0, 60, 100));
        let result = save_to(&missing, at(), &bank, Tempo::default(), &LoopGeometry::default());
        assert!(matches!(result, Err(SaveError::Io { .. })));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn writes_the_encoded_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut bank = TrackBank::new(4);
        bank.get_mut(1).unwrap().push(Event::note_on(0, 60, 100));
        let path = save_to(dir.path(), at(), &bank, Tempo::default(), &LoopGeometry::default()).unwrap();
        assert_eq!(path, dir.path().join("20240309_070501_GMT.mid"));
        assert_eq!(
            fs::read(&path).unwrap(),
            smf_to_bytes(&bank, Tempo::default(), &LoopGeometry::default()).unwrap()
        );
        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn same_second_saves_get_a_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut bank = TrackBank::new(4);
        bank.get_mut(0).unwrap().push(Event::note_on(0, 60, 100));
        let first = save_to(dir.path(), at(), &bank, Tempo::default(), &LoopGeometry::default()).unwrap();
        let first_bytes = fs::read(&first).unwrap();

        bank.get_mut(0).unwrap().push(Event::note_off(240, 60));
        let second = save_to(dir.path(), at(), &bank, Tempo::default(), &LoopGeometry::default()).unwrap();
        let third = save_to(dir.path(), at(), &bank, Tempo::default(), &LoopGeometry::default()).unwrap();

        assert_eq!(second, dir.path().join("20240309_070501_GMT_2.mid"));
        assert_eq!(third, dir.path().join("20240309_070501_GMT_3.mid"));
        assert_eq!(fs::read(&first).unwrap(), first_bytes);
        assert_ne!(fs::read(&second).unwrap(), first_bytes);
    }
}

use std::fs;
use std::path::{Path, PathBuf};

/// Next free numeric suffix for `<stem>_<n>[.<ext>]` given sibling names.
///
/// One past the highest suffix found, or 1 when none match. Suffixes that
/// are not plain decimal digits are ignored.
pub fn next_suffix<I, S>(stem: &str, ext: Option<&str>, existing: I) -> u32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    existing
        .into_iter()
        .filter_map(|name| parse_suffix(name.as_ref(), stem, ext))
        .max()
        .map_or(1, |n| n.saturating_add(1))
}

fn parse_suffix(name: &str, stem: &str, ext: Option<&str>) -> Option<u32> {
    let without_ext = match ext {
        Some(ext) => name.strip_suffix(ext)?.strip_suffix('.')?,
        None => name,
    };
    let digits = without_ext.strip_prefix(stem)?.strip_prefix('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn target_name(stem: &str, n: u32, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{stem}_{n}.{ext}"),
        None => format!("{stem}_{n}"),
    }
}

/// Picks an unused output path next to `base`.
///
/// Re-reads the parent directory on every call and holds no lock, so two
/// concurrent resolutions against the same base can return the same path.
/// A missing parent directory is treated as empty. Returns `None` only when
/// every suffix up to `u32::MAX` is taken.
pub fn resolve_target(base: &Path, ext: Option<&str>) -> Option<PathBuf> {
    let parent = base.parent().unwrap_or_else(|| Path::new(""));
    let listing_dir = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    let file_name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = match ext {
        Some(ext) => file_name
            .strip_suffix(ext)
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(file_name.as_str()),
        None => file_name.as_str(),
    };

    let existing: Vec<String> = fs::read_dir(listing_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    let mut n = next_suffix(stem, ext, &existing);
    loop {
        let candidate = parent.join(target_name(stem, n, ext));
        if !candidate.exists() {
            return Some(candidate);
        }
        n = n.checked_add(1)?;
    }
}

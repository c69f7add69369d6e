//! Page pairing: by drawing name when every page on both sides carries a
//! recognized name, by index otherwise.

use ddc_common::PairingMode;

#[derive(Debug, Clone)]
pub struct PagePair {
    pub page_number: u32,
    pub old_index: u32,
    pub new_index: u32,
    pub drawing_name: Option<String>,
}

/// Chooses `ByDrawingName` only when every page of both documents carries a
/// `Some` name; any missing name on either side falls back to `ByIndex`.
#[must_use]
pub fn choose_pairing_mode(old_names: &[Option<String>], new_names: &[Option<String>]) -> PairingMode {
    let all_named = !old_names.is_empty()
        && !new_names.is_empty()
        && old_names.iter().all(Option::is_some)
        && new_names.iter().all(Option::is_some);
    if all_named {
        PairingMode::ByDrawingName
    } else {
        PairingMode::ByIndex
    }
}

/// Builds the page pairs per the chosen mode. `ByIndex` pairs `min(old,
/// new)` pages positionally. `ByDrawingName` pairs old pages, in order,
/// against the new page carrying the same name; old pages with no matching
/// name in `new_names` are dropped (the mismatch is the caller's to log onto
/// the Job).
#[must_use]
pub fn pair_pages(
    old_names: &[Option<String>],
    new_names: &[Option<String>],
    mode: PairingMode,
) -> Vec<PagePair> {
    match mode {
        PairingMode::ByIndex => {
            let count = old_names.len().min(new_names.len());
            (0..count)
                .map(|i| PagePair {
                    page_number: i as u32 + 1,
                    old_index: i as u32,
                    new_index: i as u32,
                    drawing_name: old_names[i].clone(),
                })
                .collect()
        }
        PairingMode::ByDrawingName => {
            let mut pairs = Vec::new();
            let mut page_number = 1u32;
            for (old_index, name) in old_names.iter().enumerate() {
                let Some(name) = name else { continue };
                let Some(new_index) = new_names.iter().position(|n| n.as_deref() == Some(name.as_str())) else {
                    continue;
                };
                pairs.push(PagePair {
                    page_number,
                    old_index: old_index as u32,
                    new_index: new_index as u32,
                    drawing_name: Some(name.clone()),
                });
                page_number += 1;
            }
            pairs
        }
    }
}

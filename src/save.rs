use std::fs;
use std::path::Path;

use regex::Regex;

use crate::domain::{RequiredMod, WorkshopId};
use crate::error::SyncError;

/// Package ids shipped with the base game and its expansions. Entries in
/// the save's mod list matching one of these never need downloading.
pub const OFFICIAL_PACKAGE_IDS: &[&str] = &[
    "ludeon.rimworld",
    "ludeon.rimworld.royalty",
    "ludeon.rimworld.ideology",
    "ludeon.rimworld.biotech",
    "ludeon.rimworld.anomaly",
    "ludeon.rimworld.odyssey",
];

pub fn load_required_mods(path: &Path) -> Result<Vec<RequiredMod>, SyncError> {
    let text = fs::read_to_string(path).map_err(|_| SyncError::SaveRead(path.to_path_buf()))?;
    parse_required_mods(&text)
}

/// Extracts the parallel mod id / steam id / name lists from the save and
/// zips them into `RequiredMod` entries, dropping official content. A steam
/// id that is "0" or unparseable becomes an unknown id and is later resolved
/// by name.
pub fn parse_required_mods(save_text: &str) -> Result<Vec<RequiredMod>, SyncError> {
    let package_ids = list_block(save_text, "modIds")?;
    let steam_ids = list_block(save_text, "modSteamIds")?;
    let names = list_block(save_text, "modNames")?;

    if package_ids.len() != steam_ids.len() || package_ids.len() != names.len() {
        return Err(SyncError::SaveParse(format!(
            "mod list lengths disagree: {} ids, {} steam ids, {} names",
            package_ids.len(),
            steam_ids.len(),
            names.len()
        )));
    }

    let mut mods = Vec::new();
    for ((package_id, steam_id), name) in package_ids.into_iter().zip(steam_ids).zip(names) {
        if is_official(&package_id) {
            continue;
        }
        mods.push(RequiredMod {
            package_id,
            steam_id: steam_id.parse::<WorkshopId>().ok(),
            name: decode_entities(&name),
        });
    }
    Ok(mods)
}

fn list_block(text: &str, tag: &str) -> Result<Vec<String>, SyncError> {
    let block_re = Regex::new(&format!(r"(?s)<{tag}>(.*?)</{tag}>")).unwrap();
    let li_re = Regex::new(r"<li>([^<]*)</li>").unwrap();
    let block = block_re
        .captures(text)
        .ok_or_else(|| SyncError::SaveParse(format!("missing <{tag}> list")))?;
    Ok(li_re
        .captures_iter(&block[1])
        .map(|cap| cap[1].trim().to_string())
        .collect())
}

fn is_official(package_id: &str) -> bool {
    OFFICIAL_PACKAGE_IDS
        .iter()
        .any(|official| official.eq_ignore_ascii_case(package_id))
}

pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

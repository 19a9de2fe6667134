use std::path::PathBuf;

use crate::commands::Patch;

/// Find the game folder in the usual Steam library locations
pub fn steam_folder_search(patch: &Patch) -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    let game = match patch {
        Patch::One => "Path of Exile",
        Patch::Two => "Path of Exile 2",
    };
    [
        home.join(".local/share/Steam/steamapps/common"),
        home.join("Library/Application Support/Steam/steamapps/common"),
        PathBuf::from("C:\\Program Files (x86)\\Steam\\steamapps\\common"),
        PathBuf::from("C:\\Program Files (x86)\\Grinding Gear Games"),
    ]
    .iter()
    .map(|p| p.join(game))
    .find(|p| p.join(crate::bundle_fs::INDEX_PATH).exists())
}

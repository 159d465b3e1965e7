//! Key bindings and the persisted calibration map.
//!
//! A calibration file is a JSON object keyed by device path. Each device holds
//! the ordered list of keys captured for it:
//!
//! ```json
//! {
//!   "/dev/input/event3": [
//!     { "keycode": 114, "action": "next-item", "fireOnRelease": true },
//!     { "keycode": 115, "action": "previous-item", "fireOnRelease": true }
//!   ]
//! }
//! ```
//!
//! Device paths are only stable for the current boot. Files written by older
//! builds (`prevItem` / `onRelease` spellings) load unchanged and are re-saved
//! in the current spelling.

use crate::error::{Error, Result};
use crate::menu::MenuAction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Default calibration file, relative to the working directory.
pub const DEFAULT_CALIBRATION_FILE: &str = "./keyCalibration.json";

/// Maps one physical key to one menu action.
///
/// Only serialized directly; loading goes through [`BindingMap::decode`] so
/// action names are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct KeyBinding {
    pub keycode: u16,
    pub action: MenuAction,
    /// Trigger on the key's release edge instead of its press edge.
    #[serde(rename = "fireOnRelease")]
    pub fire_on_release: bool,
}

impl KeyBinding {
    /// Binding as produced by the wizard: identified on press, fired on release.
    pub fn captured(keycode: u16, action: MenuAction) -> Self {
        Self {
            keycode,
            action,
            fire_on_release: true,
        }
    }
}

/// Binding as it appears on disk, before the action name is validated.
#[derive(Deserialize)]
struct StoredBinding {
    keycode: u16,
    action: String,
    #[serde(rename = "fireOnRelease", alias = "onRelease")]
    fire_on_release: bool,
}

/// Device path → bindings captured on that device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BindingMap(BTreeMap<String, Vec<KeyBinding>>);

impl BindingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `binding` to `device`'s sequence, creating it if absent.
    pub fn push(&mut self, device: &str, binding: KeyBinding) {
        self.0.entry(device.to_string()).or_default().push(binding);
    }

    pub fn get(&self, device: &str) -> Option<&[KeyBinding]> {
        self.0.get(device).map(Vec::as_slice)
    }

    /// Iterate `(device path, bindings)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[KeyBinding])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of devices with at least one binding entry.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse calibration JSON. `path` is only used for error context.
    ///
    /// Action names are validated here, so a map that loads successfully can
    /// always be activated.
    pub fn decode(path: &Path, text: &str) -> Result<Self> {
        let stored: BTreeMap<String, Vec<StoredBinding>> =
            serde_json::from_str(text).map_err(|source| Error::ParseCalibration {
                path: path.to_path_buf(),
                source,
            })?;

        let mut map = BTreeMap::new();
        for (device, bindings) in stored {
            let mut out = Vec::with_capacity(bindings.len());
            for b in bindings {
                let action = b.action.parse().map_err(|_| Error::UnknownAction {
                    device: device.clone(),
                    action: b.action.clone(),
                })?;
                out.push(KeyBinding {
                    keycode: b.keycode,
                    action,
                    fire_on_release: b.fire_on_release,
                });
            }
            map.insert(device, out);
        }
        Ok(Self(map))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ReadCalibration {
            path: path.to_path_buf(),
            source,
        })?;
        Self::decode(path, &text)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::EncodeCalibration)
    }

    /// Write the map to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let write_err = |source| Error::WriteCalibration {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, json).map_err(write_err)
    }
}

impl FromIterator<(String, Vec<KeyBinding>)> for BindingMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<KeyBinding>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample() -> BindingMap {
        let mut map = BindingMap::new();
        map.push("/dev/input/event3", KeyBinding::captured(114, MenuAction::NextItem));
        map.push("/dev/input/event3", KeyBinding::captured(115, MenuAction::PreviousItem));
        map.push("/dev/input/event0", KeyBinding::captured(330, MenuAction::SelectItem));
        map.push(
            "/dev/input/event0",
            KeyBinding {
                keycode: 28,
                action: MenuAction::SelectItem,
                fire_on_release: false,
            },
        );
        map
    }

    #[test]
    fn json_roundtrip_preserves_per_device_order() {
        let map = sample();
        let json = map.to_json().unwrap();
        let parsed = BindingMap::decode(Path::new("mem.json"), &json).unwrap();
        assert_eq!(parsed, map);

        let event3 = parsed.get("/dev/input/event3").unwrap();
        assert_eq!(event3[0].action, MenuAction::NextItem);
        assert_eq!(event3[1].action, MenuAction::PreviousItem);
    }

    #[test]
    fn writes_documented_field_names() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"fireOnRelease\": true"));
        assert!(json.contains("\"action\": \"next-item\""));
        assert!(!json.contains("onRelease\""));
    }

    #[test]
    fn legacy_spelling_loads_and_resaves_in_new_form() {
        let legacy = r#"{
            "/dev/input/event1": [
                { "keycode": 114, "action": "nextItem", "onRelease": true },
                { "keycode": 115, "action": "prevItem", "onRelease": true },
                { "keycode": 116, "action": "selectItem", "onRelease": true }
            ]
        }"#;
        let map = BindingMap::decode(Path::new("legacy.json"), legacy).unwrap();
        let bindings = map.get("/dev/input/event1").unwrap();
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings[1], KeyBinding::captured(115, MenuAction::PreviousItem));

        let resaved = map.to_json().unwrap();
        assert!(resaved.contains("previous-item"));
        assert!(!resaved.contains("prevItem"));
    }

    #[test]
    fn unknown_action_is_rejected_at_load() {
        let json = r#"{ "/dev/input/event2": [
            { "keycode": 1, "action": "doSomethingUnknown", "fireOnRelease": true }
        ] }"#;
        match BindingMap::decode(Path::new("bad.json"), json) {
            Err(Error::UnknownAction { device, action }) => {
                assert_eq!(device, "/dev/input/event2");
                assert_eq!(action, "doSomethingUnknown");
            }
            other => panic!("expected UnknownAction, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_reports_path() {
        let err = BindingMap::decode(Path::new("broken.json"), "{ not json").unwrap_err();
        match err {
            Error::ParseCalibration { path, .. } => assert_eq!(path, PathBuf::from("broken.json")),
            other => panic!("expected ParseCalibration, got {other:?}"),
        }
    }

    #[test]
    fn save_overwrites_and_load_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keyCalibration.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale contents").unwrap();

        let map = sample();
        map.save(&path).unwrap();
        assert_eq!(BindingMap::load(&path).unwrap(), map);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BindingMap::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::ReadCalibration { .. }));
    }
}

//! Well-known user places shown as navigation shortcuts

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Location {
    Home,
    Desktop,
    Documents,
    Downloads,
    Music,
    Pictures,
    Videos,
}

impl Location {
    pub const ALL: [Location; 7] = [
        Location::Home,
        Location::Desktop,
        Location::Documents,
        Location::Downloads,
        Location::Music,
        Location::Pictures,
        Location::Videos,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Location::Home => "Home",
            Location::Desktop => "Desktop",
            Location::Documents => "Documents",
            Location::Downloads => "Downloads",
            Location::Music => "Music",
            Location::Pictures => "Pictures",
            Location::Videos => "Videos",
        }
    }

    /// Platform path for this place, if the platform defines one.
    ///
    /// The directory is not guaranteed to exist.
    pub fn path(&self) -> Option<PathBuf> {
        let platform_dir = match self {
            Location::Home => return dirs::home_dir(),
            Location::Desktop => dirs::desktop_dir(),
            Location::Documents => dirs::document_dir(),
            Location::Downloads => dirs::download_dir(),
            Location::Music => dirs::audio_dir(),
            Location::Pictures => dirs::picture_dir(),
            Location::Videos => dirs::video_dir(),
        };

        // Fall back to the conventional folder under home
        platform_dir.or_else(|| dirs::home_dir().map(|home| home.join(self.label())))
    }

    /// Places whose directory currently exists
    pub fn available() -> Vec<(Location, PathBuf)> {
        Location::ALL
            .iter()
            .filter_map(|loc| loc.path().map(|p| (*loc, p)))
            .filter(|(_, p)| p.is_dir())
            .collect()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

use super::{display_name, DirectoryListing, ListingOptions};
use crate::error::{LotusError, Result};
use crate::file_opener::open_file;
use crate::locations::Location;
use log::debug;
use std::env;
use std::path::{Component, Path, PathBuf};

/// What [`NavigationController::activate`] did with the activated path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The path was a directory and is now the current directory
    Navigated,
    /// The path was handed to the default application
    Opened,
}

/// Current directory plus back/forward history.
///
/// All mutation goes through the navigation methods. Callers that share a
/// controller between threads wrap it in a single mutex.
#[derive(Debug, Clone)]
pub struct NavigationController {
    current_path: PathBuf,
    back_stack: Vec<PathBuf>,
    forward_stack: Vec<PathBuf>,
}

impl NavigationController {
    /// Creates a controller positioned at `start`, which must be an existing directory
    pub fn new(start: &Path) -> Result<Self> {
        let start = absolutize(start, None)?;
        if !start.is_dir() {
            return Err(LotusError::NotADirectory(start));
        }

        Ok(Self {
            current_path: start,
            back_stack: Vec::new(),
            forward_stack: Vec::new(),
        })
    }

    /// Creates a controller positioned at the user's home directory
    pub fn at_home() -> Result<Self> {
        let home = Location::Home
            .path()
            .ok_or_else(|| LotusError::NotFound(PathBuf::from("~")))?;
        Self::new(&home)
    }

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    /// Name of the current directory for titles and breadcrumbs
    pub fn current_display_name(&self) -> String {
        display_name(&self.current_path)
    }

    pub fn can_go_back(&self) -> bool {
        !self.back_stack.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward_stack.is_empty()
    }

    /// Back history, most recent last
    pub fn back_history(&self) -> &[PathBuf] {
        &self.back_stack
    }

    /// Forward history, most recent last
    pub fn forward_history(&self) -> &[PathBuf] {
        &self.forward_stack
    }

    /// Navigates to `path`, recording the current directory in the back history.
    ///
    /// Relative paths resolve against the current directory. Forward history is
    /// cleared on success. Navigating to the current directory is not deduplicated.
    pub fn go_to_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let target = absolutize(path.as_ref(), Some(&self.current_path))?;
        if !target.is_dir() {
            return Err(LotusError::NotADirectory(target));
        }

        debug!(
            "navigate {} -> {}",
            self.current_path.display(),
            target.display()
        );
        let previous = std::mem::replace(&mut self.current_path, target);
        self.back_stack.push(previous);
        self.forward_stack.clear();
        Ok(())
    }

    /// Returns to the most recent directory in the back history.
    ///
    /// No-op when the history is empty. If the remembered directory no longer
    /// exists, fails with `NotADirectory` and leaves all state untouched.
    pub fn navigate_back(&mut self) -> Result<()> {
        Self::step(
            &mut self.current_path,
            &mut self.back_stack,
            &mut self.forward_stack,
        )
    }

    /// Mirror image of [`NavigationController::navigate_back`]
    pub fn navigate_forward(&mut self) -> Result<()> {
        Self::step(
            &mut self.current_path,
            &mut self.forward_stack,
            &mut self.back_stack,
        )
    }

    fn step(current: &mut PathBuf, from: &mut Vec<PathBuf>, to: &mut Vec<PathBuf>) -> Result<()> {
        let Some(target) = from.last() else {
            return Ok(());
        };

        if !target.is_dir() {
            return Err(LotusError::NotADirectory(target.clone()));
        }

        if let Some(target) = from.pop() {
            debug!("history {} -> {}", current.display(), target.display());
            let previous = std::mem::replace(current, target);
            to.push(previous);
        }
        Ok(())
    }

    /// Navigates to the parent directory; no-op at the filesystem root
    pub fn navigate_up(&mut self) -> Result<()> {
        match self.current_path.parent() {
            Some(parent) => {
                let parent = parent.to_path_buf();
                self.go_to_directory(parent)
            }
            None => Ok(()),
        }
    }

    pub fn go_home(&mut self) -> Result<()> {
        self.go_to_location(Location::Home)
    }

    /// Navigates to a well-known place such as Documents or Downloads
    pub fn go_to_location(&mut self, location: Location) -> Result<()> {
        let path = location
            .path()
            .ok_or_else(|| LotusError::NotADirectory(PathBuf::from(location.label())))?;
        self.go_to_directory(path)
    }

    /// Enters `path` if it is a directory, otherwise opens it externally
    pub fn activate(&mut self, path: impl AsRef<Path>) -> Result<Activation> {
        let target = absolutize(path.as_ref(), Some(&self.current_path))?;
        if target.is_dir() {
            self.go_to_directory(target)?;
            Ok(Activation::Navigated)
        } else {
            open_file(&target)?;
            Ok(Activation::Opened)
        }
    }

    /// Lists the immediate children of the current directory
    pub fn list_current(&self, options: ListingOptions) -> Result<DirectoryListing> {
        DirectoryListing::new(&self.current_path, options)
    }
}

/// Makes `path` absolute against `base` (or the process working directory)
/// and removes `.` and `..` components lexically.
fn absolutize(path: &Path, base: Option<&Path>) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match base {
            Some(base) => base.join(path),
            None => env::current_dir()
                .map_err(|e| LotusError::from_io(path, e))?
                .join(path),
        }
    };
    Ok(normalize(&joined))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Tree {
        _temp: TempDir,
        root: PathBuf,
        a: PathBuf,
        b: PathBuf,
    }

    fn tree() -> Tree {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let a = root.join("a");
        let b = root.join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        Tree {
            _temp: temp,
            root,
            a,
            b,
        }
    }

    mod history_tests {
        use super::*;

        #[test]
        fn test_new_starts_with_empty_history() {
            let t = tree();
            let nav = NavigationController::new(&t.root).unwrap();

            assert_eq!(nav.current_path(), t.root);
            assert!(!nav.can_go_back());
            assert!(!nav.can_go_forward());
        }

        #[test]
        fn test_new_rejects_missing_directory() {
            let t = tree();
            let result = NavigationController::new(&t.root.join("missing"));
            assert!(matches!(result, Err(LotusError::NotADirectory(_))));
        }

        #[test]
        fn test_back_restores_previous_directory() {
            let t = tree();
            let mut nav = NavigationController::new(&t.root).unwrap();

            nav.go_to_directory(&t.a).unwrap();
            assert!(nav.can_go_back());

            nav.navigate_back().unwrap();
            assert_eq!(nav.current_path(), t.root);
            assert!(nav.can_go_forward());
            assert!(!nav.can_go_back());
        }

        #[test]
        fn test_forward_then_back_is_round_trip() {
            let t = tree();
            let mut nav = NavigationController::new(&t.root).unwrap();
            nav.go_to_directory(&t.a).unwrap();
            nav.go_to_directory(&t.b).unwrap();
            nav.navigate_back().unwrap();
            nav.navigate_back().unwrap();
            assert_eq!(nav.current_path(), t.root);

            nav.navigate_forward().unwrap();
            assert_eq!(nav.current_path(), t.a);
            nav.navigate_back().unwrap();
            assert_eq!(nav.current_path(), t.root);
        }

        #[test]
        fn test_go_to_directory_clears_forward_history() {
            let t = tree();
            let mut nav = NavigationController::new(&t.root).unwrap();

            nav.go_to_directory(&t.a).unwrap();
            nav.navigate_back().unwrap();
            assert!(nav.can_go_forward());

            nav.go_to_directory(&t.b).unwrap();
            assert!(!nav.can_go_forward());
            assert_eq!(nav.back_history(), &[t.root.clone()]);
        }

        #[test]
        fn test_go_to_current_directory_still_records_history() {
            let t = tree();
            let mut nav = NavigationController::new(&t.root).unwrap();

            nav.go_to_directory(&t.root).unwrap();
            assert_eq!(nav.current_path(), t.root);
            assert_eq!(nav.back_history().len(), 1);
        }

        #[test]
        fn test_go_to_file_fails_without_side_effects() {
            let t = tree();
            let file = t.root.join("note.txt");
            fs::write(&file, b"hi").unwrap();
            let mut nav = NavigationController::new(&t.root).unwrap();

            let result = nav.go_to_directory(&file);
            assert!(matches!(result, Err(LotusError::NotADirectory(_))));
            assert_eq!(nav.current_path(), t.root);
            assert!(!nav.can_go_back());
        }

        #[test]
        fn test_back_and_forward_are_noops_on_empty_history() {
            let t = tree();
            let mut nav = NavigationController::new(&t.root).unwrap();

            nav.navigate_back().unwrap();
            nav.navigate_forward().unwrap();
            assert_eq!(nav.current_path(), t.root);
        }

        #[test]
        fn test_back_into_deleted_directory_fails_and_keeps_state() {
            let t = tree();
            let mut nav = NavigationController::new(&t.a).unwrap();
            nav.go_to_directory(&t.b).unwrap();
            fs::remove_dir(&t.a).unwrap();

            let result = nav.navigate_back();
            assert!(matches!(result, Err(LotusError::NotADirectory(_))));
            assert_eq!(nav.current_path(), t.b);
            assert_eq!(nav.back_history(), &[t.a.clone()]);
            assert!(!nav.can_go_forward());
        }
    }

    mod path_tests {
        use super::*;

        #[test]
        fn test_navigate_up_goes_to_parent() {
            let t = tree();
            let mut nav = NavigationController::new(&t.a).unwrap();

            nav.navigate_up().unwrap();
            assert_eq!(nav.current_path(), t.root);
            assert_eq!(nav.back_history(), &[t.a.clone()]);
        }

        #[test]
        fn test_navigate_up_at_root_is_noop() {
            let root = Path::new("/");
            let mut nav = NavigationController::new(root).unwrap();

            nav.navigate_up().unwrap();
            assert_eq!(nav.current_path(), root);
            assert!(!nav.can_go_back());
        }

        #[test]
        fn test_relative_paths_resolve_against_current() {
            let t = tree();
            let mut nav = NavigationController::new(&t.a).unwrap();

            nav.go_to_directory("../b").unwrap();
            assert_eq!(nav.current_path(), t.b);

            nav.go_to_directory("./.").unwrap();
            assert_eq!(nav.current_path(), t.b);
        }

        #[test]
        fn test_normalize_removes_dot_components() {
            assert_eq!(
                normalize(Path::new("/one/./two/../three")),
                PathBuf::from("/one/three")
            );
            assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
        }

        #[test]
        fn test_display_name_follows_current_directory() {
            let t = tree();
            let mut nav = NavigationController::new(&t.root).unwrap();
            nav.go_to_directory(&t.a).unwrap();
            assert_eq!(nav.current_display_name(), "a");
        }

        #[test]
        fn test_activate_directory_navigates() {
            let t = tree();
            let mut nav = NavigationController::new(&t.root).unwrap();

            let activation = nav.activate("b").unwrap();
            assert_eq!(activation, Activation::Navigated);
            assert_eq!(nav.current_path(), t.b);
        }

        #[test]
        fn test_activate_missing_path_fails() {
            let t = tree();
            let mut nav = NavigationController::new(&t.root).unwrap();

            let result = nav.activate("ghost.txt");
            assert!(matches!(result, Err(LotusError::NotFound(_))));
            assert_eq!(nav.current_path(), t.root);
        }

        #[test]
        fn test_list_current_reads_current_directory() {
            let t = tree();
            fs::write(t.a.join("inside.txt"), b"x").unwrap();
            let mut nav = NavigationController::new(&t.root).unwrap();
            nav.go_to_directory(&t.a).unwrap();

            let entries = nav
                .list_current(ListingOptions::default())
                .unwrap()
                .entries()
                .unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].name, "inside.txt");
        }
    }
}

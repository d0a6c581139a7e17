//! The config module provides configuration-loading mechanism for the job board programs.

use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("user directories for {0:?} cannot be determined")]
    NoUserDirs(String),
    #[error("cannot read config file {0:?}: {1}")]
    CannotRead(PathBuf, std::io::Error),
    #[error("cannot create config file with defaults: {0}")]
    CannotCreateDefault(std::io::Error),
    #[error("cannot parse TOML config {0:?}: {1}")]
    CannotParseToml(PathBuf, toml::de::Error),
}

/// Program configuration loader.
///
/// ```no_run
/// # #[derive(serde::Deserialize)] struct Config {}
/// // uses ~/.config/jobboard-deployer dir
/// let loader = jobboard_common::config::Loader::new("jobboard-deployer")?;
///
/// // loads ~/.config/jobboard-deployer/jobboard-deployer.toml, writing the defaults first if missing
/// let config: Config = loader.load_or_create("")?;
///
/// // loads an explicit file
/// let config: Config = jobboard_common::config::load_path(std::path::Path::new("deploy.toml"))?;
/// # Ok::<(), jobboard_common::config::LoadError>(())
/// ```
pub struct Loader {
    program_name: String,
    config_dir: PathBuf,
}

impl Loader {
    /// Creates a loader for the given program.
    /// Uses the XDG user directory layout,
    /// e.g. `~/.config/<program-name>`, `~/Library/Application Support/com.jobboard.<program-name>`
    /// or `C:\Users\name\AppData\Roaming\jobboard\<program-name>\config`
    pub fn new(program_name: &str) -> Result<Self, LoadError> {
        use LoadError::*;
        let dirs = directories::ProjectDirs::from("com", "jobboard", program_name)
            .ok_or(NoUserDirs(program_name.into()))?;
        Ok(Self::new_with_dir(program_name, dirs.config_dir()))
    }

    /// Creates a loader with a specific config directory.
    pub fn new_with_dir(program_name: &str, config_dir: &Path) -> Self {
        Self { program_name: program_name.to_string(), config_dir: config_dir.into() }
    }

    /// Loads the main TOML config file, named after the program itself;
    /// if not found, creates it with the given default config.
    pub fn load_or_create<T: DeserializeOwned>(&self, default: &str) -> Result<T, LoadError> {
        use LoadError::*;
        let path = self.path_of(&self.program_name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = path.to_str(),
                    "creating config with default contents"
                );
                std::fs::create_dir_all(&self.config_dir).map_err(CannotCreateDefault)?;
                std::fs::write(&path, default).map_err(CannotCreateDefault)?;
                default.into()
            },
            Err(err) => return Err(CannotRead(path, err)),
        };
        toml::from_str::<T>(&content).map_err(|e| CannotParseToml(path, e))
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.config_dir.join(PathBuf::from(name).with_extension("toml"))
    }
}

/// Loads a TOML config file from an explicit path, bypassing the user directories.
pub fn load_path<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    use LoadError::*;
    debug!(path = path.to_str(), "loading config");
    let content = std::fs::read_to_string(path).map_err(|e| CannotRead(path.into(), e))?;
    toml::from_str::<T>(&content).map_err(|e| CannotParseToml(path.into(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    const DEFAULT: &str = "name = \"default\"\ncount = 3\n";

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("nested");
        let loader = Loader::new_with_dir("sample", &config_dir);

        let sample: Sample = loader.load_or_create(DEFAULT).unwrap();
        assert_eq!(sample, Sample { name: "default".into(), count: 3 });
        assert!(config_dir.join("sample.toml").exists());

        // a second load reads the file that was just written
        std::fs::write(config_dir.join("sample.toml"), "name = \"edited\"\ncount = 7\n").unwrap();
        let sample: Sample = loader.load_or_create(DEFAULT).unwrap();
        assert_eq!(sample, Sample { name: "edited".into(), count: 7 });
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_path::<Sample>(&dir.path().join("sample.toml")).unwrap_err();
        assert!(matches!(err, LoadError::CannotRead(..)));
    }

    #[test]
    fn test_load_path_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "name = ").unwrap();
        let err = load_path::<Sample>(&path).unwrap_err();
        assert!(matches!(err, LoadError::CannotParseToml(..)));
    }

    #[test]
    fn test_load_or_create_keeps_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sample.toml"), "count = \"three\"\n").unwrap();
        let loader = Loader::new_with_dir("sample", dir.path());
        let err = loader.load_or_create::<Sample>(DEFAULT).unwrap_err();
        assert!(matches!(err, LoadError::CannotParseToml(..)));
        let content = std::fs::read_to_string(dir.path().join("sample.toml")).unwrap();
        assert_eq!(content, "count = \"three\"\n");
    }
}

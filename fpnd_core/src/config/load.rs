use super::FpndConfig;
// Global vars
use super::CONFIG_DIR;

// Config
use std::fs;
use std::path::{Path, PathBuf};

// Error Handling
use fpnd_error::{CastError, FpndError, TomlError, WrapError};
use miette::IntoDiagnostic;
use log::{info, warn};

impl FpndConfig {
    /*
     * Get config from crate directory
     */
    fn debug_path() -> PathBuf {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("./fpnd.config.toml");
        return path;
    }
    /*
     * Get config from FHS path.
     */
    fn release_path() -> PathBuf {
        let mut path = PathBuf::new();
        path.push(CONFIG_DIR);
        path.push("config.toml");
        return path;
    }
    /// Search the config file and fall back to defaults if there is none.
    pub fn get() -> Result<Self, FpndError> {
        info!("Search config file.");

        #[cfg(debug_assertions)]
        let path = Self::debug_path();

        #[cfg(not(debug_assertions))]
        let path = Self::release_path();

        Self::get_or_default(&path)
    }
    pub fn get_or_default(path: &Path) -> Result<Self, FpndError> {
        if !path.exists() {
            warn!(
                "No config file at {}, using defaults.",
                path.display().to_string()
            );
            return Ok(Self::default());
        }
        Self::from_file(&path.display().to_string())
    }
    pub fn from_file(path: &str) -> Result<Self, FpndError> {
        let string = match fs::read_to_string(path).into_diagnostic() {
            Ok(string) => string,
            Err(e) => {
                let message = format!("Couldn't read config file {:?}", path);
                return Err(WrapError::builder()
                    .msg(&message)
                    .help("Check the file exists and is readable.")
                    .origin(e)
                    .build()
                    .into());
            }
        };
        Self::from_toml(&string)
    }
    pub fn from_toml(string: &str) -> Result<Self, FpndError> {
        let res = toml::from_str::<Self>(&string);
        let item = match res {
            Ok(res) => res,
            Err(e) => {
                let err = CastError::TomlError(TomlError::new(e, &string));
                return Err(err.into());
            }
        };
        Ok(item)
    }
}

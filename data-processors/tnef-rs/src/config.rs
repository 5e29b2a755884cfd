//! Facilities for reading runtime configuration values
use crate::options::DEFAULT_MAX_ALLOC_SIZE;
use crate::output::WriteOptions;
use crate::sanitize::SanitizeOptions;
use crate::ParseOptions;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
/// Extractor configuration
pub struct Config {
    /// Output directory
    pub directory: String,
    /// Replace existing files
    pub overwrite: bool,
    /// Save to `name.N` instead of failing when the target exists
    pub number_backups: bool,
    /// Honour directories embedded in attachment names
    pub use_paths: bool,
    /// Allow embedded absolute paths (requires `use_paths`)
    pub absolute_paths: bool,
    /// Escape non ASCII and shell metacharacters in names
    pub unix_paths: bool,
    /// Continue on attribute checksum mismatches
    pub ignore_checksum: bool,
    /// Continue on MAPI property decoding errors
    pub ignore_encoding_errors: bool,
    /// Accept a trailing `\r\n` after the last record
    pub ignore_cruft: bool,
    /// Save the message body
    pub save_body: bool,
    /// Body preference, over the letters `r`, `h` and `t`
    pub body_pref: String,
    /// Base name of the saved body
    pub body_name: String,
    /// Per allocation limit while decoding
    pub max_alloc_size: u64,
    /// Overall output size limit
    pub max_processed_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            overwrite: false,
            number_backups: false,
            use_paths: false,
            absolute_paths: false,
            unix_paths: false,
            ignore_checksum: false,
            ignore_encoding_errors: false,
            ignore_cruft: false,
            save_body: false,
            body_pref: "rht".to_string(),
            body_name: "message".to_string(),
            max_alloc_size: DEFAULT_MAX_ALLOC_SIZE,
            max_processed_size: i64::MAX as u64,
        }
    }
}

impl Config {
    /// Loads the configuration from the defaults, a `toml` file and environment
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file("tnef.toml"))
                .merge(Env::prefixed("TNEF__").split("__")),
        )
    }

    /// Extracts and validates the configuration from the given providers
    pub fn from_figment(figment: Figment) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = figment.extract().map_err(|err| {
            error!("Failed to validate configuration: {}", err);
            err
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value bounds
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.max_alloc_size > i64::MAX as u64 {
            error!(
                "Value of max_alloc_size too large (must be strictly < {})",
                i64::MAX
            );
            return Err("Value of max_alloc_size too large".into());
        }
        if self.max_processed_size > i64::MAX as u64 {
            error!(
                "Value of max_processed_size too large (must be strictly < {})",
                i64::MAX
            );
            return Err("Value of max_processed_size too large".into());
        }
        if self.body_pref.is_empty() || !self.body_pref.chars().all(|c| "rht".contains(c)) {
            error!(
                "Invalid body_pref {:?} (only the letters r, h and t are allowed)",
                self.body_pref
            );
            return Err("Invalid body_pref".into());
        }
        if self.absolute_paths && !self.use_paths {
            warn!("absolute_paths has no effect without use_paths");
        }
        Ok(())
    }

    /// Decoder policy
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            ignore_checksum: self.ignore_checksum,
            ignore_encoding_errors: self.ignore_encoding_errors,
            tolerate_cruft: self.ignore_cruft,
            max_alloc_size: self.max_alloc_size,
        }
    }

    /// Sanitizer policy
    pub fn sanitize_options(&self) -> SanitizeOptions {
        SanitizeOptions {
            use_paths: self.use_paths,
            allow_absolute: self.use_paths && self.absolute_paths,
            unix_friendly: self.unix_paths,
        }
    }

    /// Writer policy
    pub fn write_options(&self, list_only: bool) -> WriteOptions {
        WriteOptions {
            overwrite: self.overwrite,
            number_backups: self.number_backups,
            list_only,
            max_processed_size: self.max_processed_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layering() -> Result<(), Box<dyn std::error::Error>> {
        let config = Config::from_figment(
            Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(
                r#"
                directory = "/tmp/out"
                use_paths = true
                absolute_paths = true
                ignore_cruft = true
                body_pref = "ht"
                max_alloc_size = 1024
                "#,
            )),
        )?;
        assert_eq!(config.directory, "/tmp/out");
        assert_eq!(config.body_name, "message");
        let p = config.parse_options();
        assert!(p.tolerate_cruft);
        assert!(!p.ignore_checksum);
        assert_eq!(p.max_alloc_size, 1024);
        let s = config.sanitize_options();
        assert!(s.use_paths && s.allow_absolute && !s.unix_friendly);
        assert!(config.write_options(true).list_only);
        Ok(())
    }

    #[test]
    fn bounds() {
        let base = || Figment::from(Serialized::defaults(Config::default()));
        assert!(Config::from_figment(base()).is_ok());
        assert!(Config::from_figment(base().merge(Toml::string("body_pref = \"rx\""))).is_err());
        assert!(Config::from_figment(base().merge(Toml::string("body_pref = \"\""))).is_err());
        assert!(
            Config::from_figment(
                base().merge(Toml::string("max_processed_size = 18446744073709551615"))
            )
            .is_err()
        );
        assert!(Config::from_figment(base().merge(Toml::string("overwrite = \"maybe\""))).is_err());
    }
}

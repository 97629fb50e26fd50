use crate::clock::TimeProviderEnum;
use crate::errors::{self, Error, ErrorKind};
use crate::zone::{self, Zone};
use crate::color;
use homedir::my_home as get_my_home;
use rand::distributions::{Alphanumeric, DistString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::io::{Read, Write};

/// App configuration, serialized as json in $XDG_CONFIG_HOME/moment.cfg
#[derive(Clone, Serialize, Deserialize, Eq, PartialEq, Debug)]
pub struct Config {
    /// Path to config file
    pub path: String,
    /// The default zone for moments built without one. UTC when unset.
    pub timezone: Option<String>,
    /// Default output pattern for the command line, in date letters
    pub format: Option<String>,
    pub verbose: Option<bool>,
    /// Where "now" comes from, unless a test has frozen the clock
    #[serde(skip)]
    pub time_provider: TimeProviderEnum,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            path: String::new(),
            timezone: None,
            format: None,
            verbose: None,
            time_provider: TimeProviderEnum::default(),
        }
    }
}

impl Config {
    /// The default zone, resolved
    pub fn tz(&self) -> Result<Zone, Error> {
        zone::resolve_or_utc(&self.timezone)
    }

    pub fn with_timezone(self, timezone: &str) -> Config {
        Config {
            timezone: Some(timezone.to_string()),
            ..self
        }
    }

    pub fn with_format(self, format: &str) -> Config {
        Config {
            format: Some(format.to_string()),
            ..self
        }
    }

    pub fn with_time_provider(self, time_provider: TimeProviderEnum) -> Config {
        Config {
            time_provider,
            ..self
        }
    }

    pub fn create(self) -> Result<Config, Error> {
        let json = json!(self).to_string();
        let mut file = fs::File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        println!("Config successfully created in {}", &self.path);
        Ok(self)
    }

    pub fn load(path: &str) -> Result<Config, Error> {
        let mut json = String::new();

        fs::File::open(path)
            .map_err(|e| errors::new(ErrorKind::Io, "io", &format!("Could not find {path}: {e}")))?
            .read_to_string(&mut json)?;

        serde_json::from_str::<Config>(&json).map_err(|e| {
            errors::new(
                ErrorKind::Config,
                "serde_json",
                &format!("Could not parse JSON in {path}: {e}"),
            )
        })
    }

    pub fn new() -> Result<Config, Error> {
        Ok(Config {
            path: generate_path()?,
            ..Config::default()
        })
    }

    pub fn reload(&self) -> Result<Self, Error> {
        Config::load(&self.path).map(|config| Config {
            time_provider: self.time_provider,
            ..config
        })
    }

    /// Check the zone before writing it, so a typo never lands in the file
    pub fn set_timezone(self, timezone: &str) -> Result<Config, Error> {
        let tz = zone::resolve(timezone)?;
        Ok(self.with_timezone(&tz.name()))
    }

    pub fn save(&mut self) -> Result<String, Error> {
        let json = json!(self);
        let string = serde_json::to_string_pretty(&json)?;

        fs::OpenOptions::new()
            .write(true)
            .read(true)
            .truncate(true)
            .open(&self.path)?
            .write_all(string.as_bytes())?;

        Ok(color::green_string("✓"))
    }

    fn set_verbosity(self, verbose: bool) -> Config {
        match (self.verbose, verbose) {
            (_, true) | (Some(true), false) => Config {
                verbose: Some(true),
                ..self
            },
            (_, false) => Config {
                verbose: Some(false),
                ..self
            },
        }
    }
}

pub fn get_or_create(config_path: Option<String>, verbose: bool) -> Result<Config, Error> {
    let path: String = match config_path {
        None => generate_path()?,
        Some(path) => maybe_expand_homedir(path.trim())?,
    };

    match fs::File::open(&path) {
        Ok(_) => Config::load(&path),
        Err(_) => Config {
            path,
            ..Config::default()
        }
        .create(),
    }
    .map(|config| config.set_verbosity(verbose))
}

pub fn generate_path() -> Result<String, Error> {
    let config_directory = dirs::config_dir()
        .ok_or_else(|| errors::new(ErrorKind::Config, "dirs", "Could not find config directory"))?
        .to_str()
        .ok_or_else(|| {
            errors::new(
                ErrorKind::Config,
                "dirs",
                "Could not convert config directory to string",
            )
        })?
        .to_owned();
    if cfg!(test) {
        let random_string = Alphanumeric.sample_string(&mut rand::thread_rng(), 30);
        Ok(format!("tests/{random_string}.testcfg"))
    } else {
        Ok(format!("{config_directory}/moment.cfg"))
    }
}

/// Expands a leading "~" to the user's home directory
/// e.g., "~/.config/moment.cfg" --> "/home/user/.config/moment.cfg"
fn maybe_expand_homedir(config_path: &str) -> Result<String, Error> {
    match config_path.strip_prefix('~') {
        None => Ok(config_path.to_string()),
        Some(rest) => {
            let home = get_my_home()?.ok_or_else(|| {
                errors::new(ErrorKind::Config, "homedir", "Could not find home directory")
            })?;
            Ok(format!("{}{rest}", home.to_string_lossy()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedTimeProvider;
    use crate::test;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;
    use pretty_assertions::assert_eq;

    fn with_test_dir(config: Config) -> Config {
        _ = fs::create_dir_all("tests");
        config
    }

    #[test]
    fn new_should_generate_config() {
        let config = Config::new().unwrap();
        assert!(config.path.ends_with(".testcfg"));
        assert_eq!(config.timezone, None);
        assert_eq!(config.tz(), Ok(Zone::Named(Tz::UTC)));
    }

    #[test]
    fn create_load_and_save_round_trip_through_the_file() {
        let config = with_test_dir(test::fixtures::config())
            .create()
            .expect("Failed to create test config");

        let loaded = Config::load(&config.path).unwrap();
        assert_eq!(loaded, config);

        let mut changed = loaded.set_timezone("Asia/Tokyo").unwrap();
        assert_eq!(changed.save(), Ok(String::from("✓")));
        assert_eq!(changed.reload().unwrap().tz(), Ok(Zone::Named(Tz::Asia__Tokyo)));

        fs::remove_file(&config.path).unwrap();
    }

    #[test]
    fn get_or_create_makes_a_missing_file() {
        let path = with_test_dir(Config::new().unwrap()).path;
        let config = get_or_create(Some(path.clone()), true).unwrap();

        assert_eq!(config.verbose, Some(true));
        assert!(fs::metadata(&path).is_ok());
        assert_eq!(get_or_create(Some(path.clone()), false).unwrap().verbose, Some(false));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_reports_missing_and_broken_files() {
        let error = Config::load("tests/does-not-exist.testcfg").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Io);

        let path = with_test_dir(Config::new().unwrap()).path;
        fs::write(&path, "{not json").unwrap();
        assert_eq!(Config::load(&path).unwrap_err().kind, ErrorKind::Config);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn set_timezone_rejects_unknown_zones() {
        let config = test::fixtures::config();
        let error = config.set_timezone("Atlantis/Capital").unwrap_err();
        assert!(error.is_invalid_timezone());
    }

    #[test]
    fn set_timezone_stores_the_canonical_name() {
        let config = test::fixtures::config().set_timezone("GMT -7:00").unwrap();
        assert_eq!(config.timezone, Some("Etc/GMT+7".to_string()));
    }

    #[test]
    fn time_provider_is_not_serialized() {
        let instant = Utc.with_ymd_and_hms(2025, 5, 10, 10, 0, 0).unwrap();
        let config = test::fixtures::config()
            .with_time_provider(TimeProviderEnum::Fixed(FixedTimeProvider::new(instant)));

        let json = json!(config).to_string();
        assert!(!json.contains("time_provider"));

        let back = serde_json::from_str::<Config>(&json).unwrap();
        assert_eq!(back.time_provider, TimeProviderEnum::System);
    }

    #[test]
    fn expands_home_directory() {
        let expanded = maybe_expand_homedir("~/moment.cfg").unwrap();
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/moment.cfg"));
        assert_eq!(maybe_expand_homedir("/tmp/moment.cfg").unwrap(), "/tmp/moment.cfg");
    }
}

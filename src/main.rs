//! Parse, convert and format dates across timezones from the command line.
//!
//! Get started with `moment parse "first day of next month" --zone Europe/Paris`
extern crate clap;

use clap::{Parser, Subcommand};
use moment::config::{self, Config};
use moment::{clock, color, debug, Error, Moment};

const NAME: &str = "Moment";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHOR: &str = "Alan Vardy <alan@vardy.cc>";
const ABOUT: &str = "Parse, convert and format dates across timezones";

const DEFAULT_FORMAT: &str = "Y-m-d H:i:s e";

#[derive(Parser, Clone)]
#[command(name = NAME)]
#[command(version = VERSION)]
#[command(about = ABOUT, long_about = None)]
#[command(author = AUTHOR, version)]
#[command(arg_required_else_help(true))]
struct Cli {
    #[arg(short, long, default_value_t = false)]
    /// Display additional debug info while processing
    verbose: bool,

    #[arg(short, long)]
    /// Absolute path of configuration. Defaults to $XDG_CONFIG_HOME/moment.cfg
    config: Option<String>,

    #[arg(short, long)]
    /// Default timezone for this run, overriding the configuration
    timezone: Option<String>,

    #[arg(long)]
    /// Pretend "now" is this moment, e.g. "2009-09-09 09:09:09"
    frozen: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    #[clap(alias = "n")]
    /// (n) Show the current moment
    Now(Now),

    #[clap(alias = "p")]
    /// (p) Parse an absolute or relative expression
    Parse(Parse),

    #[clap(alias = "ts")]
    /// (ts) Show a Unix timestamp as a moment
    Timestamp(Timestamp),

    #[clap(alias = "cv")]
    /// (cv) Show the same instant in another timezone
    Convert(Convert),

    #[command(subcommand)]
    #[clap(alias = "c")]
    /// (c) Commands around configuration
    Config(ConfigCommands),
}

#[derive(Parser, Debug, Clone)]
struct Now {
    #[arg(short, long)]
    /// Timezone to show the moment in
    zone: Option<String>,

    #[arg(short, long)]
    /// Output pattern in date letters, e.g. "l j F Y H:i:s"
    format: Option<String>,
}

#[derive(Parser, Debug, Clone)]
struct Parse {
    /// Expression such as "2009-09-09 09:09:09", "tomorrow noon" or "first day of January 2008"
    expression: String,

    #[arg(short, long)]
    /// Timezone to read and show the moment in
    zone: Option<String>,

    #[arg(short, long)]
    /// Output pattern in date letters, e.g. "l j F Y H:i:s"
    format: Option<String>,
}

#[derive(Parser, Debug, Clone)]
struct Timestamp {
    #[arg(allow_negative_numbers = true)]
    /// Seconds since the Unix epoch
    seconds: i64,

    #[arg(short, long)]
    /// Timezone to show the moment in
    zone: Option<String>,

    #[arg(short, long)]
    /// Output pattern in date letters, e.g. "l j F Y H:i:s"
    format: Option<String>,
}

#[derive(Parser, Debug, Clone)]
struct Convert {
    /// Expression read in the default timezone
    expression: String,

    #[arg(long)]
    /// Timezone to convert to
    to: String,

    #[arg(short, long)]
    /// Output pattern in date letters, e.g. "l j F Y H:i:s"
    format: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
enum ConfigCommands {
    #[clap(alias = "s")]
    /// (s) Show the configuration in use
    Show(ConfigShow),

    #[clap(alias = "tz")]
    /// (tz) Change the default timezone in the configuration file
    SetTimezone(ConfigSetTimezone),
}

#[derive(Parser, Debug, Clone)]
struct ConfigShow {}

#[derive(Parser, Debug, Clone)]
struct ConfigSetTimezone {
    /// Zone identifier such as "America/Toronto"
    timezone: String,
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(text) => {
            println!("{text}");
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("\n\n{e}");
            std::process::exit(1);
        }
    }
}

#[cfg(not(tarpaulin_include))]
fn run(cli: &Cli) -> Result<String, Error> {
    let config = fetch_config(cli)?;

    // Held until the command has rendered its output
    let _frozen = match &cli.frozen {
        Some(expression) => {
            let frozen_at = Moment::parse(&config, expression.as_str())?;
            debug::maybe_print(&config, format!("Freezing now at {frozen_at}"));
            Some(clock::freeze(Some(&frozen_at)))
        }
        None => None,
    };

    match &cli.command {
        Commands::Now(args) => now(&config, args),
        Commands::Parse(args) => parse(&config, args),
        Commands::Timestamp(args) => timestamp(&config, args),
        Commands::Convert(args) => convert(&config, args),
        Commands::Config(ConfigCommands::Show(_)) => config_show(&config),
        Commands::Config(ConfigCommands::SetTimezone(args)) => config_set_timezone(config, args),
    }
}

#[cfg(not(tarpaulin_include))]
fn fetch_config(cli: &Cli) -> Result<Config, Error> {
    let config = config::get_or_create(cli.config.clone(), cli.verbose)?;
    let config = match &cli.timezone {
        Some(timezone) => config.with_timezone(timezone),
        None => config,
    };
    debug::maybe_print(
        &config,
        format!(
            "Config: {}\nDefault timezone: {}",
            config.path,
            config.tz()?.name()
        ),
    );
    Ok(config)
}

fn now(config: &Config, args: &Now) -> Result<String, Error> {
    let moment = match &args.zone {
        Some(zone) => Moment::now_in(config, zone)?,
        None => Moment::now(config)?,
    };
    Ok(render(config, &moment, &args.format))
}

fn parse(config: &Config, args: &Parse) -> Result<String, Error> {
    let expression = args.expression.as_str();
    let moment = match &args.zone {
        Some(zone) => Moment::parse_in(config, expression, zone)?,
        None => Moment::parse(config, expression)?,
    };
    debug::maybe_print(
        config,
        format!("Parsed {expression:?} as {}", moment.to_iso8601_string()),
    );
    Ok(render(config, &moment, &args.format))
}

fn timestamp(config: &Config, args: &Timestamp) -> Result<String, Error> {
    let moment = match &args.zone {
        Some(zone) => Moment::from_timestamp_in(args.seconds, zone)?,
        None => Moment::from_timestamp(config, args.seconds)?,
    };
    Ok(render(config, &moment, &args.format))
}

fn convert(config: &Config, args: &Convert) -> Result<String, Error> {
    let moment = Moment::parse(config, args.expression.as_str())?.with_timezone(&args.to)?;
    Ok(render(config, &moment, &args.format))
}

fn config_show(config: &Config) -> Result<String, Error> {
    Ok(format!(
        "Path: {}\nTimezone: {}\nFormat: {}",
        config.path,
        color::cyan_string(&config.tz()?.name()),
        config.format.as_deref().unwrap_or(DEFAULT_FORMAT)
    ))
}

#[cfg(not(tarpaulin_include))]
fn config_set_timezone(config: Config, args: &ConfigSetTimezone) -> Result<String, Error> {
    config.set_timezone(&args.timezone)?.save()
}

/// Pattern precedence: command line, then configuration, then the default
fn render(config: &Config, moment: &Moment, format: &Option<String>) -> String {
    let pattern = format
        .as_deref()
        .or(config.format.as_deref())
        .unwrap_or(DEFAULT_FORMAT);
    moment.format(pattern)
}

// --- TESTS ---

#[test]
fn verify_cmd() {
    use clap::CommandFactory;
    // Mostly checks that it is not going to throw an exception because of conflicting short arguments
    Cli::try_parse().err();
    Cli::command().debug_assert();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> Config {
        Config::default().with_timezone("America/Toronto")
    }

    #[test]
    fn parse_renders_with_the_default_pattern() {
        let args = Parse {
            expression: "2009-09-09 09:09:09".to_string(),
            zone: None,
            format: None,
        };
        assert_eq!(
            parse(&config(), &args).unwrap(),
            "2009-09-09 09:09:09 America/Toronto"
        );
    }

    #[test]
    fn timestamp_renders_in_the_requested_zone() {
        let args = Timestamp {
            seconds: 1367186296,
            zone: Some("UTC".to_string()),
            format: Some("l j F Y H:i:s".to_string()),
        };
        assert_eq!(
            timestamp(&config(), &args).unwrap(),
            "Sunday 28 April 2013 21:58:16"
        );
    }

    #[test]
    fn convert_keeps_the_instant() {
        let args = Convert {
            expression: "2009-09-09 09:09:09 Asia/Tokyo".to_string(),
            to: "Europe/Paris".to_string(),
            format: None,
        };
        assert_eq!(
            convert(&config(), &args).unwrap(),
            "2009-09-09 02:09:09 Europe/Paris"
        );
    }

    #[test]
    fn configured_format_is_used_when_none_is_given() {
        let config = config().with_format("D, d M Y");
        let args = Parse {
            expression: "2009-09-09".to_string(),
            zone: Some("Asia/Tokyo".to_string()),
            format: None,
        };
        assert_eq!(parse(&config, &args).unwrap(), "Wed, 09 Sep 2009");
    }

    #[test]
    fn config_show_lists_the_settings() {
        assert_eq!(
            config_show(&config()).unwrap(),
            "Path: \nTimezone: America/Toronto\nFormat: Y-m-d H:i:s e"
        );
    }

    #[test]
    fn bad_zones_are_errors() {
        let args = Now {
            zone: Some("Nowhere/Special".to_string()),
            format: None,
        };
        assert!(now(&config(), &args).unwrap_err().is_invalid_timezone());

        let args = Parse {
            expression: "now".to_string(),
            zone: Some("+1é1".to_string()),
            format: None,
        };
        assert!(parse(&config(), &args).unwrap_err().is_invalid_timezone());
    }

    #[test]
    fn offset_zones_are_accepted() {
        let args = Parse {
            expression: "2009-09-09 09:09:09 Asia/Tokyo".to_string(),
            zone: Some("+05:30".to_string()),
            format: None,
        };
        assert_eq!(parse(&config(), &args).unwrap(), "2009-09-09 05:39:09 +05:30");
    }
}

use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
pub struct Error(OpaqueError);
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum OpaqueError {
    #[snafu(display("Unable to read configuration file '{}': {}", path.display(), source))]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to parse configuration file '{}': {}", path.display(), source))]
    ConfigParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("Invalid value '{}' for configuration key '{}': {}", value, key, source))]
    ConfigValue {
        key: String,
        value: String,
        source: serde_plain::Error,
    },

    #[snafu(display("Invalid number '{}' for configuration key '{}': {}", value, key, source))]
    ConfigNumber {
        key: String,
        value: String,
        source: std::num::ParseIntError,
    },

    #[snafu(display("Unable to convert {} object: {}", what, source))]
    ObjectConversion {
        what: String,
        source: serde_json::Error,
    },

    #[snafu(display("Manifest is missing '{}'", field))]
    ManifestField { field: String },

    #[snafu(display("Unable to parse manifest: {}", source))]
    ManifestParse { source: serde_yaml::Error },
}

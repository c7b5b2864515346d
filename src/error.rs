use thiserror::Error;

/// Reasons an agency configuration cannot be turned into a pattern table.
///
/// These are the only fatal conditions in the engine. They surface from
/// `CompiledAgency::new` before any segment is looked at.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("type_keywords must name at least one category")]
    MissingCategories,

    #[error("area_aliases must list at least one built or lot unit")]
    MissingUnitAliases,

    #[error("unrecognised area unit '{0}'")]
    UnknownAreaUnit(String),

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("header_prefix must not be empty")]
    EmptyHeaderPrefix,

    #[error("bullet_leader must not be empty")]
    EmptyBulletLeader,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("YAML deserialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

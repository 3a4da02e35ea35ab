#[derive(thiserror::Error, Debug)]
pub enum ConfigErrorKind {
    #[error("failed to read the assembly document: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed assembly document: {0}")]
    Parse(#[from] serde_yaml::Error),
}

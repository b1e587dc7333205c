use std::fmt;

/// The settings input a validation failure refers to, so a UI can focus it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    BuildTarget,
    Scenes,
    BuildPath,
    RemoteName,
    Region,
    AccessKey,
    SecretKey,
    SftpUser,
    SftpPassword,
}

impl fmt::Display for SettingsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettingsField::BuildTarget => "build target",
            SettingsField::Scenes => "scenes",
            SettingsField::BuildPath => "build path",
            SettingsField::RemoteName => "bucket / remote name",
            SettingsField::Region => "region",
            SettingsField::AccessKey => "access key",
            SettingsField::SecretKey => "secret key",
            SettingsField::SftpUser => "SFTP user",
            SettingsField::SftpPassword => "SFTP password",
        };
        f.write_str(name)
    }
}

/// A precondition on user-provided settings is not met.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: SettingsField,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: SettingsField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for "`field` is required".
    pub fn missing(field: SettingsField) -> Self {
        Self::new(field, format!("{field} is required"))
    }
}

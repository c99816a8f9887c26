use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP method of an outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kodo service a command is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceDomain {
    /// Download (read-acceleration) domain
    Io,
    /// Resource management domain, used for `stat`
    Rs,
    /// Listing domain
    Rsf,
    /// Upload domain
    Up,
}

/// Logical storage operation. Each command has exactly one signing
/// strategy and one target service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    GetObjectData,
    GetObjectMeta,
    ListObjects,
    PostObject,
    MakeBlock,
    MakeFile,
    DeleteObject,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::GetObjectData,
        Command::GetObjectMeta,
        Command::ListObjects,
        Command::PostObject,
        Command::MakeBlock,
        Command::MakeFile,
        Command::DeleteObject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::GetObjectData => "get-object-data",
            Command::GetObjectMeta => "get-object-meta",
            Command::ListObjects => "list-objects",
            Command::PostObject => "post-object",
            Command::MakeBlock => "make-block",
            Command::MakeFile => "make-file",
            Command::DeleteObject => "delete-object",
        }
    }

    /// Service the signed request is sent to, or None for commands that
    /// are accepted but not supported.
    pub fn service(&self) -> Option<ServiceDomain> {
        match self {
            Command::GetObjectData => Some(ServiceDomain::Io),
            Command::GetObjectMeta => Some(ServiceDomain::Rs),
            Command::ListObjects => Some(ServiceDomain::Rsf),
            Command::MakeBlock | Command::MakeFile => Some(ServiceDomain::Up),
            Command::PostObject | Command::DeleteObject => None,
        }
    }

    /// Method used when the caller does not pick one
    pub fn default_method(&self) -> HttpMethod {
        match self {
            Command::GetObjectData | Command::GetObjectMeta | Command::ListObjects => {
                HttpMethod::Get
            }
            Command::PostObject | Command::MakeBlock | Command::MakeFile => HttpMethod::Post,
            Command::DeleteObject => HttpMethod::Delete,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .iter()
            .find(|cmd| cmd.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown command: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_round_trips_through_str() {
        for cmd in Command::ALL {
            assert_eq!(cmd.as_str().parse::<Command>().unwrap(), cmd);
        }
        assert!("rename-object".parse::<Command>().is_err());
    }

    #[test]
    fn test_unsupported_commands_have_no_service() {
        assert_eq!(Command::PostObject.service(), None);
        assert_eq!(Command::DeleteObject.service(), None);
        assert_eq!(Command::MakeFile.service(), Some(ServiceDomain::Up));
        assert_eq!(Command::ListObjects.service(), Some(ServiceDomain::Rsf));
    }
}

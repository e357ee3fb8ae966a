use anyhow::{Result, anyhow};
use std::fmt;
use std::str::FromStr;

/// A package argument: `<name>` or `<name>@<specifier>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub name: String,
    /// Requested version (empty = default branch)
    pub specifier: String,
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.specifier.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}@{}", self.name, self.specifier)
        }
    }
}

impl FromStr for PackageRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, specifier) = match s.split_once('@') {
            Some((_, "")) => {
                return Err(anyhow!(
                    "Invalid format: version after @ cannot be empty. Expected 'name@version'."
                ));
            }
            Some((name, specifier)) => (name, specifier),
            None => (s, ""),
        };

        if name.is_empty() {
            return Err(anyhow!("Invalid format: package name cannot be empty."));
        }

        Ok(PackageRef {
            name: name.to_string(),
            specifier: specifier.to_string(),
        })
    }
}

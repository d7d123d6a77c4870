use crate::error::VfsError;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Name of the variable a mount point is declared with.
pub const MOUNT_VARIABLE: &str = "mount";

/// A parsed mount manifest: `name = value value ...` lines, `#` comments.
///
/// Variables keep file order, and a name may repeat; every `mount` line
/// declares one mount point.
#[derive(Debug, Default)]
pub struct MountConfig {
    variables: Vec<Variable>,
}

/// Represents a variable in the manifest, with a name and a list of values.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Variable {
    pub name: String,
    pub values: Vec<String>,
}

impl Variable {
    pub fn new(name: String, values: Vec<String>) -> Self {
        Variable { name, values }
    }
}

/// A store to mount: its root (directory or archive path) and priority.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MountPoint {
    pub priority: i32,
    pub root: String,
}

impl MountConfig {
    pub fn new() -> Self {
        MountConfig {
            variables: Vec::new(),
        }
    }

    /// Loads a manifest from a file.
    pub fn load<P: AsRef<Path>>(file_name: P) -> Result<Self, VfsError> {
        let file = File::open(file_name)?;
        Self::parse(file)
    }

    /// Parses a manifest from any reader.
    pub fn parse<R: Read>(reader: R) -> Result<Self, VfsError> {
        let mut config = MountConfig::new();
        for line in BufReader::new(reader).lines() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((name, value)) = line.split_once('=') {
                let name = name.trim().to_string();
                let values = value.split_whitespace().map(|v| v.to_string()).collect();
                config.variables.push(Variable::new(name, values));
            }
        }
        Ok(config)
    }

    /// Retrieves the first variable with the given name, if it exists.
    pub fn get(&self, var_name: &str) -> Option<&Variable> {
        self.variables.iter().find(|var| var.name == var_name)
    }

    /// Retrieves every variable with the given name, in file order.
    pub fn get_all<'s>(&'s self, var_name: &'s str) -> impl Iterator<Item = &'s Variable> {
        self.variables.iter().filter(move |var| var.name == var_name)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Interprets every `mount = <priority> <root>` line.
    ///
    /// The root is the rest of the line, so it may contain single spaces.
    pub fn mounts(&self) -> Result<Vec<MountPoint>, VfsError> {
        self.get_all(MOUNT_VARIABLE)
            .map(|var| {
                let (priority, root) = var.values.split_first().ok_or_else(|| {
                    VfsError::InvalidData("mount: missing priority and root".to_string())
                })?;
                let priority = priority.parse::<i32>().map_err(|e| {
                    VfsError::InvalidData(format!("mount: invalid priority '{priority}': {e}"))
                })?;
                if root.is_empty() {
                    return Err(VfsError::InvalidData(format!(
                        "mount: missing root for priority {priority}"
                    )));
                }
                Ok(MountPoint {
                    priority,
                    root: root.join(" "),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\
# base game first
mount = 0 base.scs
mount = 10 mods/my mod

title = converter test
mount = 5 def
";

    #[test]
    fn test_parse_variables() {
        let config = MountConfig::parse(MANIFEST.as_bytes()).unwrap();
        assert_eq!(config.variables().len(), 4);
        assert_eq!(
            config.get("title").unwrap().values,
            vec!["converter".to_string(), "test".to_string()]
        );
        assert!(config.get("missing").is_none());
    }

    #[test]
    fn test_mounts_keep_file_order() {
        let config = MountConfig::parse(MANIFEST.as_bytes()).unwrap();
        let mounts = config.mounts().unwrap();
        assert_eq!(
            mounts,
            vec![
                MountPoint {
                    priority: 0,
                    root: "base.scs".to_string()
                },
                MountPoint {
                    priority: 10,
                    root: "mods/my mod".to_string()
                },
                MountPoint {
                    priority: 5,
                    root: "def".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_invalid_mount_lines() {
        let config = MountConfig::parse("mount = high base.scs\n".as_bytes()).unwrap();
        assert!(matches!(config.mounts(), Err(VfsError::InvalidData(_))));

        let config = MountConfig::parse("mount = 3\n".as_bytes()).unwrap();
        assert!(matches!(config.mounts(), Err(VfsError::InvalidData(_))));

        let config = MountConfig::parse("mount =\n".as_bytes()).unwrap();
        assert!(matches!(config.mounts(), Err(VfsError::InvalidData(_))));
    }
}

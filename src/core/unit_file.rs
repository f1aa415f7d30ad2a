//! Mount and automount unit rendering.
//!
//! Both units are built as a [`UnitFile`] (leading comments plus ordered
//! sections of key/value entries) and rendered by one formatter.

use crate::constants;
use crate::core::resolver::ResolvedHost;
use crate::models::request::MountRequest;
use crate::util::system::Account;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl Section {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, key: &str, value: impl Into<String>) -> Self {
        self.entries.push((key.to_string(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitFile {
    pub comments: Vec<String>,
    pub sections: Vec<Section>,
}

impl UnitFile {
    pub fn comment(mut self, line: impl Into<String>) -> Self {
        self.comments.push(line.into());
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == section)
            .and_then(|s| s.get(key))
    }

    /// Parse the subset this crate writes: comments, `[Section]`, `Key=Value`.
    pub fn parse(content: &str) -> Self {
        let mut unit = UnitFile::default();
        for line in content.lines().map(str::trim) {
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#').or_else(|| line.strip_prefix(';')) {
                if unit.sections.is_empty() {
                    unit.comments.push(comment.trim().to_string());
                }
            } else if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                unit.sections.push(Section::new(name));
            } else if let (Some((key, value)), Some(section)) =
                (line.split_once('='), unit.sections.last_mut())
            {
                section
                    .entries
                    .push((key.trim().to_string(), value.trim().to_string()));
            }
        }
        unit
    }
}

impl fmt::Display for UnitFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for comment in &self.comments {
            writeln!(f, "# {comment}")?;
        }
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 || !self.comments.is_empty() {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name)?;
            for (key, value) in &section.entries {
                writeln!(f, "{key}={value}")?;
            }
        }
        Ok(())
    }
}

/// `credentials=…,uid=…,gid=…,iocharset=utf8,vers=…,nofail,_netdev,x-systemd.automount`
pub fn mount_options(cred_path: &Path, account: Account, smb_version: &str) -> String {
    let mut options = vec![
        format!("credentials={}", cred_path.display()),
        format!("uid={}", account.uid),
        format!("gid={}", account.gid),
        format!("iocharset={}", constants::IOCHARSET),
        format!("vers={smb_version}"),
    ];
    options.extend(constants::FIXED_MOUNT_FLAGS.iter().map(|f| f.to_string()));
    options.join(",")
}

fn install_section() -> Section {
    Section::new("Install").entry("WantedBy", constants::INSTALL_TARGET)
}

pub fn build_mount_unit(
    request: &MountRequest,
    host: &ResolvedHost,
    cred_path: &Path,
    account: Account,
) -> UnitFile {
    UnitFile::default()
        .comment(format!("Managed by cifs-automount for {}", request.server))
        .comment(host.note())
        .section(
            Section::new("Unit")
                .entry("Description", format!("CIFS mount of {}", request.server))
                .entry("Wants", "network-online.target")
                .entry("After", "network-online.target"),
        )
        .section(
            Section::new("Mount")
                .entry("What", format!("//{}{}", host.address, request.server.share))
                .entry("Where", request.mountpoint.display().to_string())
                .entry("Type", constants::FS_TYPE)
                .entry(
                    "Options",
                    mount_options(cred_path, account, &request.smb_version),
                ),
        )
        .section(install_section())
}

pub fn build_automount_unit(request: &MountRequest) -> UnitFile {
    UnitFile::default()
        .comment(format!("Managed by cifs-automount for {}", request.server))
        .section(
            Section::new("Unit")
                .entry("Description", format!("Automount of {}", request.server)),
        )
        .section(
            Section::new("Automount")
                .entry("Where", request.mountpoint.display().to_string())
                .entry("TimeoutIdleSec", "0"),
        )
        .section(install_section())
}

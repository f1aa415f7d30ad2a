//! Boundary to the host: external commands and read-only system queries.
//!
//! Everything that talks to the process manager, the mount table, the
//! account database or the resolver goes through [`System`] so workflows can
//! run against a recording fake in tests.

use crate::error::{AutomountError, AutomountResult};
use std::fmt;
use std::fs;
use std::io;
use std::net::{IpAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// An external command, kept as data so it can be described and recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Short failure detail: trimmed stderr, else stdout, else the exit code.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Numeric owner of a local account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub uid: u32,
    pub gid: u32,
}

pub trait System {
    /// Invoke an external command and wait for it.
    fn run(&self, cmd: &CommandSpec) -> io::Result<CommandOutput>;

    /// Whether `path` currently appears in the mount table.
    fn is_mounted(&self, path: &Path) -> bool;

    fn lookup_user(&self, name: &str) -> AutomountResult<Option<Account>>;

    /// Forward-resolve a host name. `None` when resolution fails.
    fn lookup_host(&self, host: &str) -> Option<IpAddr>;

    fn is_root(&self) -> bool;
}

/// The real host.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSystem;

impl System for HostSystem {
    fn run(&self, cmd: &CommandSpec) -> io::Result<CommandOutput> {
        debug!(command = %cmd, "spawning");
        let output = Command::new(&cmd.program).args(&cmd.args).output()?;
        let result = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(command = %cmd, code = ?result.code, stderr = %result.stderr.trim(), "finished");
        Ok(result)
    }

    fn is_mounted(&self, path: &Path) -> bool {
        match fs::read_to_string("/proc/self/mountinfo") {
            Ok(content) => mount_points(&content).iter().any(|p| p == path),
            Err(err) => {
                debug!(error = %err, "cannot read /proc/self/mountinfo");
                false
            }
        }
    }

    fn lookup_user(&self, name: &str) -> AutomountResult<Option<Account>> {
        let user = nix::unistd::User::from_name(name).map_err(|errno| {
            AutomountError::io(format!("look up user {name}"), io::Error::from(errno))
        })?;
        Ok(user.map(|u| Account {
            uid: u.uid.as_raw(),
            gid: u.gid.as_raw(),
        }))
    }

    fn lookup_host(&self, host: &str) -> Option<IpAddr> {
        let addrs: Vec<IpAddr> = match (host, 0u16).to_socket_addrs() {
            Ok(iter) => iter.map(|a| a.ip()).collect(),
            Err(err) => {
                debug!(host, error = %err, "resolution failed");
                return None;
            }
        };
        addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
    }

    fn is_root(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }
}

/// Mount points listed in a `/proc/self/mountinfo` dump (fifth field).
pub fn mount_points(mountinfo: &str) -> Vec<PathBuf> {
    mountinfo
        .lines()
        .filter_map(|line| line.split_whitespace().nth(4))
        .map(|field| PathBuf::from(unescape_mountinfo(field)))
        .collect()
}

/// Decode the `\ooo` octal escapes the kernel uses for spaces and friends.
fn unescape_mountinfo(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    /// Records every command and simulates the systemctl/umount state it touches.
    #[derive(Default)]
    pub struct FakeSystem {
        pub commands: RefCell<Vec<CommandSpec>>,
        pub failing: HashSet<String>,
        pub active: RefCell<HashSet<String>>,
        pub enabled: RefCell<HashSet<String>>,
        pub mounted: RefCell<HashSet<PathBuf>>,
        /// Automount unit -> path whose autofs entry goes away on stop.
        pub autofs: HashMap<String, PathBuf>,
        pub users: HashMap<String, Account>,
        pub hosts: HashMap<String, IpAddr>,
        pub root: bool,
    }

    impl FakeSystem {
        pub fn new() -> Self {
            let mut users = HashMap::new();
            users.insert("alice".to_string(), Account { uid: 1000, gid: 1000 });
            Self {
                users,
                root: true,
                ..Self::default()
            }
        }

        pub fn command_lines(&self) -> Vec<String> {
            self.commands.borrow().iter().map(ToString::to_string).collect()
        }

        fn ok(success: bool) -> CommandOutput {
            CommandOutput {
                success,
                code: Some(if success { 0 } else { 1 }),
                stdout: String::new(),
                stderr: if success { String::new() } else { "simulated failure".into() },
            }
        }
    }

    impl System for FakeSystem {
        fn run(&self, cmd: &CommandSpec) -> io::Result<CommandOutput> {
            self.commands.borrow_mut().push(cmd.clone());
            let line = cmd.to_string();
            if self.failing.contains(&line) {
                return Ok(Self::ok(false));
            }
            let args: Vec<&str> = cmd.args.iter().map(String::as_str).collect();
            let success = match args.as_slice() {
                ["is-active", "--quiet", unit] => self.active.borrow().contains(*unit),
                ["is-enabled", "--quiet", unit] => self.enabled.borrow().contains(*unit),
                ["enable", "--now", unit] => {
                    self.enabled.borrow_mut().insert((*unit).to_string());
                    self.active.borrow_mut().insert((*unit).to_string());
                    true
                }
                ["stop", unit] => {
                    self.active.borrow_mut().remove(*unit);
                    if let Some(path) = self.autofs.get(*unit) {
                        self.mounted.borrow_mut().remove(path);
                    }
                    true
                }
                ["disable", unit] => {
                    self.enabled.borrow_mut().remove(*unit);
                    true
                }
                [path] if cmd.program == "umount" => {
                    self.mounted.borrow_mut().remove(Path::new(path));
                    true
                }
                _ => true,
            };
            Ok(Self::ok(success))
        }

        fn is_mounted(&self, path: &Path) -> bool {
            self.mounted.borrow().contains(path)
        }

        fn lookup_user(&self, name: &str) -> AutomountResult<Option<Account>> {
            Ok(self.users.get(name).copied())
        }

        fn lookup_host(&self, host: &str) -> Option<IpAddr> {
            host.parse().ok().or_else(|| self.hosts.get(host).copied())
        }

        fn is_root(&self) -> bool {
            self.root
        }
    }
}

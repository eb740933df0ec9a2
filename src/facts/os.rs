use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use crate::errors::FactError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsInfo {
    pub family: String,
    pub kernel: String,
    pub platform: String,
    pub version: String,
}

/// Go-style OS name: `macos` is reported as `darwin`.
pub fn family() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        os => os,
    }
}

impl OsInfo {
    #[cfg(target_os = "linux")]
    pub fn detect() -> Result<Self, FactError> {
        let kernel = read_trimmed(Path::new("/proc/sys/kernel/osrelease"))?;
        let release = read_os_release()?;
        let id = release.get("ID").map(String::as_str).unwrap_or("linux");
        let id_like = release.get("ID_LIKE").map(String::as_str).unwrap_or("");
        Ok(Self {
            family: family().to_string(),
            kernel,
            platform: platform_family(id, id_like).to_string(),
            version: release.get("VERSION_ID").cloned().unwrap_or_default(),
        })
    }

    #[cfg(target_os = "macos")]
    pub fn detect() -> Result<Self, FactError> {
        Ok(Self {
            family: family().to_string(),
            kernel: run("uname", &["-r"])?,
            platform: family().to_string(),
            version: run("sw_vers", &["-productVersion"])?,
        })
    }

    #[cfg(windows)]
    pub fn detect() -> Result<Self, FactError> {
        let out = run("cmd", &["/C", "ver"])?;
        let version = parse_ver_output(&out).ok_or(FactError::Missing("os.version"))?;
        Ok(Self {
            family: family().to_string(),
            kernel: version.clone(),
            platform: family().to_string(),
            version,
        })
    }

    #[cfg(all(unix, not(any(target_os = "linux", target_os = "macos"))))]
    pub fn detect() -> Result<Self, FactError> {
        let kernel = run("uname", &["-r"])?;
        Ok(Self {
            family: family().to_string(),
            version: kernel.clone(),
            kernel,
            platform: family().to_string(),
        })
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn read_trimmed(path: &Path) -> Result<String, FactError> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| FactError::Read {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn read_os_release() -> Result<HashMap<String, String>, FactError> {
    match read_trimmed(Path::new("/etc/os-release")) {
        Ok(text) => Ok(parse_os_release(&text)),
        Err(_) => read_trimmed(Path::new("/usr/lib/os-release")).map(|text| parse_os_release(&text)),
    }
}

#[cfg_attr(target_os = "linux", allow(dead_code))]
fn run(program: &str, args: &[&str]) -> Result<String, FactError> {
    let command = format!("{program} {}", args.join(" "));
    let out = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| FactError::Command {
            command: command.clone(),
            source,
        })?;
    if !out.status.success() {
        return Err(FactError::CommandStatus {
            command,
            status: out.status.to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

/// `KEY=value` lines of os-release(5); quotes are stripped.
pub(crate) fn parse_os_release(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                .unwrap_or(v);
            (k.trim().to_string(), v.to_string())
        })
        .collect()
}

const PLATFORM_FAMILIES: &[(&str, &[&str])] = &[
    ("redhat", &["rhel", "centos", "fedora", "amzn", "ol", "scientific", "rocky", "almalinux"]),
    ("debian", &["debian", "ubuntu", "raspbian", "linuxmint"]),
    ("suse", &["suse", "sles", "opensuse", "opensuse-leap", "opensuse-tumbleweed"]),
    ("arch", &["arch", "archarm", "manjaro"]),
    ("gentoo", &["gentoo"]),
];

/// Distribution family for an os-release `ID`/`ID_LIKE` pair, falling back to `ID`.
pub(crate) fn platform_family<'a>(id: &'a str, id_like: &str) -> &'a str {
    std::iter::once(id)
        .chain(id_like.split_whitespace())
        .find_map(|candidate| {
            PLATFORM_FAMILIES
                .iter()
                .find(|(_, members)| members.contains(&candidate))
                .map(|(family, _)| *family)
        })
        .unwrap_or(id)
}

/// Extracts `10.0.19045.3570` from `Microsoft Windows [Version 10.0.19045.3570]`.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn parse_ver_output(out: &str) -> Option<String> {
    let start = out.find("Version ")? + "Version ".len();
    let rest = &out[start..];
    let end = rest.find(']').unwrap_or(rest.len());
    Some(rest[..end].trim().to_string()).filter(|v| !v.is_empty())
}

//! Host facts used to fill asset-name templates.
//!
//! Identifiers follow the naming release pipelines conventionally use for
//! artifacts (`linux`/`darwin`/`windows`, `amd64`/`arm64`/`386`), not Rust's
//! target triple vocabulary.

use std::ffi::OsStr;
use std::path::Path;

/// Host operating system, e.g. `linux`, `darwin`, `windows`.
pub fn os() -> &'static str {
    os_name(std::env::consts::OS)
}

/// Host architecture, e.g. `amd64`, `arm64`.
pub fn arch() -> &'static str {
    arch_name(std::env::consts::ARCH, cfg!(target_endian = "little"))
}

/// Base name of the running program, from `argv[0]` or the executable path.
pub fn program_name() -> Option<String> {
    std::env::args_os()
        .next()
        .and_then(|arg| base_name(&arg))
        .or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|path| base_name(path.as_os_str()))
        })
}

pub fn os_name(os: &'static str) -> &'static str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

pub fn arch_name(arch: &'static str, little_endian: bool) -> &'static str {
    match (arch, little_endian) {
        ("x86_64", _) => "amd64",
        ("x86", _) => "386",
        ("aarch64", _) => "arm64",
        ("loongarch64", _) => "loong64",
        ("powerpc64", true) => "ppc64le",
        ("powerpc64", false) => "ppc64",
        ("mips", true) => "mipsle",
        ("mips64", true) => "mips64le",
        ("wasm32", _) => "wasm",
        (other, _) => other,
    }
}

/// File name of an invocation path without directories. The `.exe` suffix is
/// dropped on Windows only.
pub fn base_name(invocation: &OsStr) -> Option<String> {
    base_name_for(invocation, cfg!(windows))
}

pub fn base_name_for(invocation: &OsStr, windows: bool) -> Option<String> {
    let name = Path::new(invocation).file_name()?.to_str()?;
    if !windows {
        return (!name.is_empty()).then(|| name.to_string());
    }
    let name = match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".exe") => {
            &name[..cut]
        }
        _ => name,
    };
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

//! Build script for autoland - embeds version metadata for `--version`.
//!
//! Prefers `git describe --tags --always --dirty`. When no tag is reachable
//! (or git is unavailable) a pseudo-version is generated from the Cargo.toml
//! version and a timestamp so installed binaries still identify themselves.

use std::process::Command;

use chrono::Utc;

fn main() {
    ["src", "build.rs", "Cargo.toml"]
        .iter()
        .for_each(|path| println!("cargo:rerun-if-changed={path}"));

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={}", build_info());
}

/// Executes a command and returns the trimmed stdout, if any.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn git_version() -> String {
    command_output("git", &["describe", "--tags", "--always", "--dirty"])
        .filter(|desc| desc.contains('v') || desc.contains("-g"))
        .unwrap_or_else(pseudo_version)
}

/// v{version}-{timestamp}-{commit} when no tag describes HEAD.
fn pseudo_version() -> String {
    let commit = command_output("git", &["rev-parse", "--short=12", "HEAD"])
        .unwrap_or_else(|| "unknown".to_string());
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    format!("v{}-{timestamp}-{commit}", env!("CARGO_PKG_VERSION"))
}

fn build_info() -> String {
    [
        Some(env!("CARGO_PKG_VERSION").to_string()),
        Some(format!("({})", git_version())),
        command_output("rustc", &["--version"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

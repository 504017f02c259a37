//! Stamps the binary with where and when it was built
//!
//! Exposed to the crate as `GIT_HASH`, `BUILD_TIMESTAMP` and
//! `BUILD_PROFILE` for the startup log line.

use std::env;
use std::process::Command;

use chrono::{DateTime, SecondsFormat, Utc};

/// Trimmed stdout of a git command run from the crate directory
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}

/// Short commit hash, suffixed `-dirty` when the work tree has changes
fn revision() -> String {
    let Some(hash) = git(&["rev-parse", "--short=8", "HEAD"]) else {
        return "unknown".to_string();
    };
    match git(&["status", "--porcelain", "--untracked-files=no"]) {
        Some(changes) if !changes.is_empty() => format!("{}-dirty", hash),
        _ => hash,
    }
}

/// `SOURCE_DATE_EPOCH` when set (reproducible builds), else now
fn timestamp() -> String {
    let built = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);
    built.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/index");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    for (key, value) in [
        ("GIT_HASH", revision()),
        ("BUILD_TIMESTAMP", timestamp()),
        ("BUILD_PROFILE", profile),
    ] {
        println!("cargo:rustc-env={}={}", key, value);
    }
}

//! Toolchain and bridgebuild environment variable handling.

use std::env;
use std::path::{Path, PathBuf};

/// Interpret a boolean environment value ("1", "true", "yes", case-insensitive).
pub fn parse_bool(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "1" || value == "true" || value == "yes"
}

fn is_enabled(var: &str) -> bool {
    env::var(var).ok().is_some_and(|s| parse_bool(&s))
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|s| !s.trim().is_empty())
}

// Native toolchain - CC, CXX, CFLAGS, CXXFLAGS, LDFLAGS
// Same variables make, autotools and mkmf honor

/// Get C compiler override (may include leading arguments, e.g. "ccache gcc").
pub fn cc() -> Option<String> {
    non_empty("CC")
}

/// Get C++ compiler override.
pub fn cxx() -> Option<String> {
    non_empty("CXX")
}

/// Get C compiler flags.
pub fn cflags() -> Option<String> {
    non_empty("CFLAGS")
}

/// Get C++ compiler flags.
pub fn cxxflags() -> Option<String> {
    non_empty("CXXFLAGS")
}

/// Get linker flags.
pub fn ldflags() -> Option<String> {
    non_empty("LDFLAGS")
}

/// Get link-time library search directories (`LIBRARY_PATH`).
pub fn library_path() -> Option<String> {
    non_empty("LIBRARY_PATH")
}

// bridgebuild settings - BRIDGEBUILD_*

/// Get translator program override.
pub fn translator() -> Option<String> {
    non_empty("BRIDGEBUILD_TRANSLATOR")
}

/// Get build descriptor path override.
pub fn manifest() -> Option<String> {
    non_empty("BRIDGEBUILD_MANIFEST")
}

/// Get output directory override.
pub fn out_dir() -> Option<String> {
    non_empty("BRIDGEBUILD_OUT_DIR")
}

/// Get number of parallel jobs (returns None if not set or invalid).
pub fn jobs() -> Option<usize> {
    env::var("BRIDGEBUILD_JOBS")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|&n| n > 0)
}

/// Check if debug logging is requested from the environment.
pub fn debug() -> bool {
    is_enabled("BRIDGEBUILD_DEBUG")
}

/// Check if the user config file should be ignored.
pub fn ignore_config() -> bool {
    is_enabled("BRIDGEBUILD_IGNORE_CONFIG")
}

/// Split a flags string on whitespace (`CFLAGS="-O2 -g"` -> `["-O2", "-g"]`).
pub fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(str::to_string).collect()
}

/// Flags whose value is a directory, given either attached or as the next word
const DIRECTORY_FLAGS: &[&str] = &["-L", "-I", "-isystem", "-iquote", "-idirafter"];

fn anchor(base: &Path, dir: PathBuf) -> PathBuf {
    if dir.is_absolute() || dir.as_os_str().is_empty() {
        dir
    } else {
        base.join(dir)
    }
}

fn anchor_str(base: &Path, dir: &str) -> String {
    anchor(base, PathBuf::from(dir)).to_string_lossy().into_owned()
}

/// Rewrite relative directories in `-L`, `-I` and friends against `base`.
pub fn anchor_flags(base: &Path, flags: &[String]) -> Vec<String> {
    let mut anchored = Vec::with_capacity(flags.len());
    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        if DIRECTORY_FLAGS.contains(&flag.as_str()) {
            anchored.push(flag.clone());
            if let Some(dir) = iter.next() {
                anchored.push(anchor_str(base, dir));
            }
        } else if let Some((prefix, dir)) = DIRECTORY_FLAGS
            .iter()
            .find_map(|&prefix| flag.strip_prefix(prefix).map(|dir| (prefix, dir)))
        {
            anchored.push(format!("{prefix}{}", anchor_str(base, dir)));
        } else {
            anchored.push(flag.clone());
        }
    }
    anchored
}

/// Snapshot of the host environment a build reads.
///
/// Captured once before a build starts and never mutated afterwards, so
/// every worker sees the same toolchain and search path settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnvironment {
    pub cc: Option<String>,
    pub cxx: Option<String>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,
    /// `LIBRARY_PATH` entries, in order
    pub library_path: Vec<PathBuf>,
    pub translator: Option<String>,
}

impl HostEnvironment {
    /// Read the current process environment, with relative directories
    /// anchored at the current directory.
    pub fn capture() -> Self {
        let host = Self {
            cc: cc(),
            cxx: cxx(),
            cflags: cflags().as_deref().map(split_flags).unwrap_or_default(),
            cxxflags: cxxflags().as_deref().map(split_flags).unwrap_or_default(),
            ldflags: ldflags().as_deref().map(split_flags).unwrap_or_default(),
            library_path: library_path()
                .map(|paths| {
                    env::split_paths(&paths)
                        .filter(|p| !p.as_os_str().is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            translator: translator(),
        };
        match env::current_dir() {
            Ok(cwd) => host.anchored(&cwd),
            Err(_) => host,
        }
    }

    /// Make relative `LIBRARY_PATH` entries and `-L`/`-I` flag directories
    /// absolute against `base`. Tools run inside per-target work dirs, where
    /// a relative directory would name something else.
    pub fn anchored(mut self, base: &Path) -> Self {
        self.library_path = self
            .library_path
            .into_iter()
            .map(|dir| anchor(base, dir))
            .collect();
        self.cflags = anchor_flags(base, &self.cflags);
        self.cxxflags = anchor_flags(base, &self.cxxflags);
        self.ldflags = anchor_flags(base, &self.ldflags);
        self
    }

    /// Names and values of the variables that influence a build, for `env` output.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let join = |flags: &[String]| flags.join(" ");
        let mut vars = Vec::new();
        if let Some(cc) = &self.cc {
            vars.push(("CC", cc.clone()));
        }
        if let Some(cxx) = &self.cxx {
            vars.push(("CXX", cxx.clone()));
        }
        if !self.cflags.is_empty() {
            vars.push(("CFLAGS", join(&self.cflags)));
        }
        if !self.cxxflags.is_empty() {
            vars.push(("CXXFLAGS", join(&self.cxxflags)));
        }
        if !self.ldflags.is_empty() {
            vars.push(("LDFLAGS", join(&self.ldflags)));
        }
        if let Ok(joined) = env::join_paths(&self.library_path)
            && !self.library_path.is_empty()
        {
            vars.push(("LIBRARY_PATH", joined.to_string_lossy().into_owned()));
        }
        if let Some(translator) = &self.translator {
            vars.push(("BRIDGEBUILD_TRANSLATOR", translator.clone()));
        }
        vars
    }
}

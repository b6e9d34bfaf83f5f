//! External toolchain
//!
//! The bridge translator and the native compiler/linker are black boxes:
//! this module only knows how to find them, spell their command lines, and
//! capture their exit status and output.

use crate::config::Config;
use crate::descriptor::BuildSettings;
use crate::env_vars::HostEnvironment;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Placeholder for the bridge source path in translator arguments
pub const SOURCE_PLACEHOLDER: &str = "{source}";
/// Placeholder for the compilation unit path in translator arguments
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

const DEFAULT_CC: &str = "cc";
const DEFAULT_CXX: &str = "c++";

/// Language of a generated compilation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cxx,
}

impl Language {
    /// Infer the language from a unit's file extension (`c`, `cpp`, ...).
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "cpp" | "cc" | "cxx" | "c++" => Self::Cxx,
            _ => Self::C,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::C => f.write_str("C"),
            Self::Cxx => f.write_str("C++"),
        }
    }
}

/// How to turn a bridge source into a native compilation unit
///
/// ```toml
/// [translator]
/// program = "cython"
/// args = ["-3", "{source}", "-o", "{output}"]
/// output_extension = "c"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslatorSpec {
    #[serde(default = "default_translator_program")]
    pub program: String,
    #[serde(default = "default_translator_args")]
    pub args: Vec<String>,
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
}

fn default_translator_program() -> String {
    "cython".to_string()
}

fn default_translator_args() -> Vec<String> {
    vec![
        "-3".to_string(),
        SOURCE_PLACEHOLDER.to_string(),
        "-o".to_string(),
        OUTPUT_PLACEHOLDER.to_string(),
    ]
}

fn default_output_extension() -> String {
    "c".to_string()
}

impl Default for TranslatorSpec {
    fn default() -> Self {
        Self {
            program: default_translator_program(),
            args: default_translator_args(),
            output_extension: default_output_extension(),
        }
    }
}

impl TranslatorSpec {
    /// Arguments with `{source}` and `{output}` substituted.
    pub fn expand_args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        let source = source.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                OsString::from(
                    arg.replace(SOURCE_PLACEHOLDER, &source)
                        .replace(OUTPUT_PLACEHOLDER, &output),
                )
            })
            .collect()
    }

    pub fn language(&self) -> Language {
        Language::from_extension(&self.output_extension)
    }

    /// Build the translator command for one source.
    pub fn command(&self, source: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.expand_args(source, output));
        cmd
    }
}

/// A program plus leading arguments, e.g. `CC="ccache gcc"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tool {
    pub program: String,
    pub args: Vec<String>,
}

impl Tool {
    /// Parse a whitespace-separated tool spec. Returns None for blank specs.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut words = spec.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    /// A fresh command for this tool with its leading arguments applied.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Locate the program on `PATH` (or check it directly if it is a path).
    pub fn locate(&self) -> Option<PathBuf> {
        find_executable(&self.program)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Find an executable by name on `PATH`.
///
/// Names containing a path separator are checked as given.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| {
        let full = dir.join(name);
        if full.is_file() {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = full.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Exit status and combined output of one tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    /// stdout followed by stderr, lossily decoded
    pub diagnostics: String,
}

impl ToolOutput {
    /// Diagnostics, or a note about the exit status when the tool printed nothing.
    pub fn diagnostics_or_status(&self, program: &str) -> String {
        if self.diagnostics.trim().is_empty() {
            format!(
                "{program} exited with status {}",
                self.code
                    .map_or_else(|| "unknown".to_string(), |c| c.to_string())
            )
        } else {
            self.diagnostics.clone()
        }
    }
}

/// Run a command to completion, capturing its output.
pub fn run_tool(cmd: &mut Command) -> io::Result<ToolOutput> {
    crate::debug::log_command(cmd);
    let output = cmd.output()?;

    let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
    diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));

    crate::debug!(
        "{} exited with {:?}",
        cmd.get_program().to_string_lossy(),
        output.status.code()
    );

    Ok(ToolOutput {
        success: output.status.success(),
        code: output.status.code(),
        diagnostics,
    })
}

/// Fully resolved toolchain for a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toolchain {
    pub translator: TranslatorSpec,
    pub cc: Tool,
    pub cxx: Tool,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,
    /// Appended to target names to form artifact file names
    pub extension_suffix: String,
    /// Leave undefined symbols for the loading runtime to provide
    pub allow_undefined: bool,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            translator: TranslatorSpec::default(),
            cc: Tool {
                program: DEFAULT_CC.to_string(),
                args: Vec::new(),
            },
            cxx: Tool {
                program: DEFAULT_CXX.to_string(),
                args: Vec::new(),
            },
            cflags: Vec::new(),
            cxxflags: Vec::new(),
            ldflags: Vec::new(),
            extension_suffix: std::env::consts::DLL_SUFFIX.to_string(),
            allow_undefined: false,
        }
    }
}

impl Toolchain {
    /// Combine settings by priority: environment > descriptor > user config > defaults.
    pub fn resolve(
        host: &HostEnvironment,
        settings: &BuildSettings,
        descriptor_translator: Option<&TranslatorSpec>,
        config: &Config,
    ) -> Self {
        let defaults = Self::default();

        let pick_tool = |env: Option<&String>, descriptor: Option<&String>, user: Option<&String>| {
            env.or(descriptor)
                .or(user)
                .and_then(|spec| Tool::parse(spec))
        };

        let mut translator = descriptor_translator
            .or(config.translator.as_ref())
            .cloned()
            .unwrap_or_default();
        if let Some(program) = &host.translator {
            translator.program.clone_from(program);
        }

        Self {
            translator,
            cc: pick_tool(host.cc.as_ref(), settings.cc.as_ref(), config.cc.as_ref())
                .unwrap_or(defaults.cc),
            cxx: pick_tool(host.cxx.as_ref(), settings.cxx.as_ref(), config.cxx.as_ref())
                .unwrap_or(defaults.cxx),
            cflags: host.cflags.clone(),
            cxxflags: host.cxxflags.clone(),
            ldflags: host.ldflags.clone(),
            extension_suffix: settings
                .extension_suffix
                .clone()
                .unwrap_or(defaults.extension_suffix),
            allow_undefined: settings.allow_undefined,
        }
    }

    pub fn compiler_for(&self, language: Language) -> &Tool {
        match language {
            Language::C => &self.cc,
            Language::Cxx => &self.cxx,
        }
    }

    pub fn compile_flags_for(&self, language: Language) -> &[String] {
        match language {
            Language::C => &self.cflags,
            Language::Cxx => &self.cxxflags,
        }
    }

    /// Compiler used for the link step of this toolchain's units.
    pub fn linker(&self) -> &Tool {
        self.compiler_for(self.translator.language())
    }

    /// Flags controlling how undefined symbols are treated when linking.
    ///
    /// Strict by default so a symbol missing from every linked library fails
    /// the link instead of surfacing at load time.
    pub fn undefined_symbol_flags(&self) -> Vec<String> {
        let flags: &[&str] = match (self.allow_undefined, cfg!(target_os = "macos")) {
            (true, true) => &["-Wl,-undefined,dynamic_lookup"],
            (false, false) if cfg!(unix) => &["-Wl,--no-undefined"],
            _ => &[],
        };
        flags.iter().map(|f| (*f).to_string()).collect()
    }

    /// Ask the C compiler for its built-in library directories
    /// (`-print-search-dirs`). None if the compiler cannot be run.
    pub fn query_library_dirs(&self) -> Option<String> {
        let mut cmd = self.cc.command();
        cmd.arg("-print-search-dirs");
        match run_tool(&mut cmd) {
            Ok(output) if output.success => Some(output.diagnostics),
            Ok(_) | Err(_) => {
                crate::debug!("{} -print-search-dirs failed", self.cc);
                None
            }
        }
    }

    /// First line of `<tool> --version`, if the tool runs.
    pub fn version_of(program: &str) -> Option<String> {
        let output = Command::new(program).arg("--version").output().ok()?;
        if !output.status.success() {
            return None;
        }
        let text = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        String::from_utf8_lossy(&text)
            .lines()
            .next()
            .map(|line| line.trim().to_string())
    }
}

//! Init command
//!
//! Write a starter `bridgebuild.toml`

use anyhow::{Context, Result};
use bridgebuild::{BuildDescriptor, DESCRIPTOR_FILE, LibraryName, target::validate_target_name};
use std::fs;
use std::path::{Path, PathBuf};

/// Options for `init`
#[derive(Debug, Clone, Default)]
pub(crate) struct InitOptions {
    pub(crate) name: Option<String>,
    pub(crate) source: Option<String>,
    pub(crate) libraries: Vec<String>,
    pub(crate) force: bool,
}

/// Create a build descriptor in `path` (a directory, or the file to write)
pub(crate) fn run(path: Option<&Path>, options: &InitOptions) -> Result<()> {
    let (dir, descriptor_path) = match path {
        Some(p) if p.extension().is_some_and(|ext| ext == "toml") => (
            p.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
            p.to_path_buf(),
        ),
        Some(p) => (p.to_path_buf(), p.join(DESCRIPTOR_FILE)),
        None => (PathBuf::from("."), PathBuf::from(DESCRIPTOR_FILE)),
    };

    if descriptor_path.exists() && !options.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            descriptor_path.display()
        );
    }

    let name = match &options.name {
        Some(name) => name.clone(),
        None => default_name(&dir),
    };
    validate_target_name(&name)?;

    let libraries = options
        .libraries
        .iter()
        .map(|lib| LibraryName::new(lib.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    let source = options
        .source
        .clone()
        .unwrap_or_else(|| format!("src/{name}.pyx"));

    let content = render(&name, &source, &libraries);

    // Never write something we could not read back
    BuildDescriptor::parse(&content, &descriptor_path)
        .context("Generated descriptor is invalid")?;

    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    fs::write(&descriptor_path, content)
        .with_context(|| format!("Failed to write {}", descriptor_path.display()))?;

    println!("Created {}", descriptor_path.display());
    println!("  target:  {name}");
    println!("  source:  {source}");
    if !libraries.is_empty() {
        let names: Vec<_> = libraries.iter().map(LibraryName::as_str).collect();
        println!("  links:   {}", names.join(", "));
    }

    Ok(())
}

/// Target name from the project directory, made safe for file names.
fn default_name(dir: &Path) -> String {
    let base = fs::canonicalize(dir)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();

    let name: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = name.trim_start_matches(['_', '.']).to_string();

    if name.is_empty() {
        "extension".to_string()
    } else {
        name
    }
}

fn quote(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

fn render(name: &str, source: &str, libraries: &[LibraryName]) -> String {
    const HEADER: &str = "# bridgebuild build descriptor

[build]
out_dir = \"build\"

[translator]
program = \"cython\"
args = [\"-3\", \"{source}\", \"-o\", \"{output}\"]
output_extension = \"c\"

[[extension]]
";

    let libraries = libraries
        .iter()
        .map(|lib| quote(lib.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{HEADER}name = {}\nsource_path = {}\nlink_libraries = [{libraries}]\n",
        quote(name),
        quote(source)
    )
}

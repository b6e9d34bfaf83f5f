//! Env Command
//!
//! Displays the environment a build would run in: tool versions, platform,
//! relevant environment variables and the library search path with the
//! origin of each directory.

use super::{ProjectArgs, discover_search_path};
use anyhow::Result;
use bridgebuild::{BuildDescriptor, BuildSettings, Config, HostEnvironment, Toolchain};
use std::env;

/// Display environment information
pub(crate) fn run(args: &ProjectArgs) -> Result<()> {
    let config = args.load_config()?;
    let descriptor_path = args.descriptor_path();
    let descriptor = if descriptor_path.is_file() {
        Some(BuildDescriptor::from_file(&descriptor_path)?)
    } else {
        None
    };

    let host = HostEnvironment::capture();
    let default_settings = BuildSettings::default();
    let toolchain = Toolchain::resolve(
        &host,
        descriptor.as_ref().map_or(&default_settings, |d| &d.settings),
        descriptor.as_ref().and_then(|d| d.translator.as_ref()),
        &config,
    );

    println!("## Environment");
    println!();
    println!("bridgebuild {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("## Toolchain");
    println!();
    print_tool("Translator", &toolchain.translator.program, &toolchain.translator.program);
    print_tool("CC", &toolchain.cc.to_string(), &toolchain.cc.program);
    print_tool("CXX", &toolchain.cxx.to_string(), &toolchain.cxx.program);
    println!("Suffix       {}", toolchain.extension_suffix);
    println!(
        "Undefined    {}",
        if toolchain.allow_undefined {
            "allowed"
        } else {
            "error"
        }
    );
    println!();

    println!("## Platform");
    println!();
    println!("OS           {}", env::consts::OS);
    println!("Arch         {}", env::consts::ARCH);
    println!("Family       {}", env::consts::FAMILY);
    println!();

    println!("## Environment Variables");
    println!();
    let vars = host.describe();
    if vars.is_empty() {
        println!("(none set)");
    }
    for (name, value) in vars {
        println!("{name:<24} {value}");
    }
    println!();

    println!("## Configuration");
    println!();
    match &descriptor {
        Some(d) => println!(
            "Descriptor   {} ({} target(s))",
            d.path.display(),
            d.targets.len()
        ),
        None => println!("Descriptor   {} (not found)", descriptor_path.display()),
    }
    match args.config.clone().or_else(Config::user_config_path) {
        Some(path) if args.no_config => println!("User config  {} (ignored)", path.display()),
        Some(path) if path.is_file() => println!("User config  {}", path.display()),
        Some(path) => println!("User config  {} (not found)", path.display()),
        None => println!("User config  (no home directory)"),
    }
    println!();

    println!("## Library Search Path");
    println!();
    let search_path = discover_search_path(&host, &config, &toolchain);
    if search_path.is_empty() {
        println!("(empty)");
    }
    for dir in search_path.dirs() {
        println!("{:<12} {}", dir.origin.as_str(), dir.path.display());
    }

    Ok(())
}

fn print_tool(label: &str, command: &str, program: &str) {
    match Toolchain::version_of(program) {
        Some(version) => println!("{label:<12} {command} ({version})"),
        None => println!("{label:<12} {command} (not found)"),
    }
}

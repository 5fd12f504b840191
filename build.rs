// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: package name
fn package_arg() -> Arg {
    Arg::new("package").required(true).help("Package name")
}

/// Common arguments selecting a configuration
fn configuration_args() -> [Arg; 3] {
    [
        Arg::new("version")
            .long("version")
            .help("Version label (default: the preferred version)"),
        Arg::new("variant")
            .long("variant")
            .value_name("NAME=VALUE")
            .action(ArgAction::Append)
            .help("Variant assignment: name=value, +name or ~name"),
        Arg::new("compiler")
            .long("compiler")
            .help("Compiler, e.g. gcc@8.1.0"),
    ]
}

fn build_cli() -> Command {
    Command::new("hpcpkg")
        .version(env!("CARGO_PKG_VERSION"))
        .author("hpcpkg Contributors")
        .about("Package specifications and build hooks for scientific software")
        .arg(
            Arg::new("repo")
                .long("repo")
                .value_name("DIR")
                .global(true)
                .help("Recipe directory (overrides HPCPKG_REPO and the settings file)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug output"),
        )
        .subcommand(
            Command::new("info")
                .about("Show a package's declarations")
                .arg(package_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print JSON instead of text"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Validate every recipe in the repository")
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .action(ArgAction::SetTrue)
                        .help("Treat warnings as errors"),
                ),
        )
        .subcommand(
            Command::new("deps")
                .about("Show the active dependencies of a configuration")
                .arg(package_arg())
                .args(configuration_args())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the expanded configuration tree as JSON"),
                ),
        )
        .subcommand(
            Command::new("order")
                .about("Show the install order of a configuration and its dependencies")
                .arg(package_arg())
                .args(configuration_args()),
        )
        .subcommand(
            Command::new("build")
                .about("Run the build lifecycle of a package")
                .arg(package_arg())
                .args(configuration_args())
                .arg(Arg::new("prefix").long("prefix").required(true).help("Install prefix"))
                .arg(
                    Arg::new("source")
                        .long("source")
                        .required(true)
                        .help("Unpacked source directory"),
                )
                .arg(
                    Arg::new("dep_prefix")
                        .long("dep-prefix")
                        .value_name("NAME=PATH")
                        .action(ArgAction::Append)
                        .help("Install prefix of a dependency"),
                )
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help("Parallel build jobs"),
                )
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Show what would be run without running it"),
                ),
        )
        .subcommand(
            Command::new("verify")
                .about("Verify a file against a checksum")
                .arg(Arg::new("file").required(true).help("File to hash"))
                .arg(
                    Arg::new("checksum")
                        .required(true)
                        .help("Expected checksum, e.g. sha256:HEX"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("hpcpkg.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}

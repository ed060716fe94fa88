use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use floki_compiler::parser::parse_source;
use floki_compiler::{
    compile, init_logging, load_sensor_manifest, CompileOptions, CompiledProgram, Diagnostic,
    RecordCounts,
};
use fuf_contract::ChecksumLayout;
use serde::Serialize;

fn main() {
    let matches = build_cli().get_matches();

    let log_level = matches.get_one::<String>("log-level").map(String::as_str);
    let log_file = matches.get_one::<PathBuf>("log-file").map(PathBuf::as_path);
    let verbose = matches.get_count("verbose") > 0;
    if let Err(e) = init_logging(log_level, log_file, verbose) {
        eprintln!("❌ Error: {:#}", e);
        process::exit(1);
    }

    if let Err(e) = run(&matches) {
        eprintln!("❌ Error: {:#}", e);
        process::exit(1);
    }
}

fn build_cli() -> Command {
    Command::new("flokic")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compiles Floki behavior sources to FUF bytecode")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Behavior source (.floki)")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("manifest")
                .short('m')
                .long("manifest")
                .value_name("FILE")
                .help("Robot manifest listing the sensors (.yaml, .toml or .json)")
                .default_value("robot.yaml")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output bytecode file")
                .default_value("output.fuf")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("TOML file with compiler options")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("checksum")
                .long("checksum")
                .value_name("LAYOUT")
                .help("Checksum layout")
                .value_parser(["corrected", "legacy"]),
        )
        .arg(
            Arg::new("memory-size")
                .long("memory-size")
                .value_name("BYTES")
                .help("Runtime memory size written to the header")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("deny-warnings")
                .long("deny-warnings")
                .help("Fail if any warning is reported")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verify-only")
                .long("verify-only")
                .help("Compile and report, but don't write the output file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump-ast")
                .long("dump-ast")
                .help("Dump the parsed declarations for debugging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print a JSON compile report")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("FILTER")
                .help("Log filter (trace, debug, info, warn, error), overrides RUST_LOG"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("FILE")
                .help("Write logs to file as JSON lines")
                .value_parser(value_parser!(PathBuf)),
        )
}

#[derive(Debug, Serialize)]
struct CompileReport<'a> {
    input: &'a Path,
    manifest: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Path>,
    counts: RecordCounts,
    size: usize,
    memory_size: u32,
    checksum: u32,
    layout: ChecksumLayout,
    blake3: String,
    warnings: &'a [Diagnostic],
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let input = path_arg(matches, "input")?;
    let manifest = path_arg(matches, "manifest")?;
    let output = path_arg(matches, "output")?;
    let verbose = matches.get_count("verbose") > 0;
    let verify_only = matches.get_flag("verify-only");
    let json = matches.get_flag("json");

    let options = resolve_options(matches)?;

    if verbose {
        println!("🔧 flokic {}", env!("CARGO_PKG_VERSION"));
        println!("   Input: {}", input.display());
        println!("   Manifest: {}", manifest.display());
        println!("   Output: {}", output.display());
        println!(
            "   Mode: {}",
            if verify_only { "verify-only" } else { "compile" }
        );
        println!(
            "   Checksum: {}, memory size: {}",
            options.checksum, options.memory_size
        );
    }

    let source = fs::read_to_string(input)
        .with_context(|| format!("reading behavior source {}", input.display()))?;

    if matches.get_flag("dump-ast") {
        for declaration in parse_source(&source)? {
            println!("{:>4}: {:#?}", declaration.line, declaration.node);
        }
    }

    let sensors = load_sensor_manifest(manifest)?;
    if verbose {
        println!("   📖 {} sensor(s), {} source bytes", sensors.len(), source.len());
    }

    let compiled = compile(&sensors, &source, &options)
        .with_context(|| format!("compiling {}", input.display()))?;

    if !json {
        for diagnostic in &compiled.diagnostics {
            eprintln!("⚠️  {}", diagnostic);
        }
    }

    if !verify_only {
        fs::write(output, &compiled.bytecode)
            .with_context(|| format!("writing bytecode to {}", output.display()))?;
    }

    if json {
        let report = CompileReport {
            input,
            manifest,
            output: (!verify_only).then_some(output),
            counts: compiled.counts(),
            size: compiled.bytecode.len(),
            memory_size: options.memory_size,
            checksum: compiled.checksum,
            layout: compiled.layout,
            blake3: compiled.digest(),
            warnings: &compiled.diagnostics,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&compiled, output, verify_only);
    }

    Ok(())
}

/// Options file first, then flags on top.
fn resolve_options(matches: &ArgMatches) -> anyhow::Result<CompileOptions> {
    let mut options = match matches.get_one::<PathBuf>("config") {
        Some(path) => CompileOptions::from_toml_file(path)?,
        None => CompileOptions::default(),
    };
    if let Some(layout) = matches.get_one::<String>("checksum") {
        options.checksum = layout
            .parse::<ChecksumLayout>()
            .map_err(|e| anyhow!("--checksum: {}", e))?;
    }
    if let Some(&size) = matches.get_one::<u32>("memory-size") {
        options.memory_size = size;
    }
    if matches.get_flag("deny-warnings") {
        options.deny_warnings = true;
    }
    Ok(options)
}

fn print_summary(compiled: &CompiledProgram, output: &Path, verify_only: bool) {
    let counts = compiled.counts();
    if verify_only {
        println!("🎉 Verification completed successfully");
    } else {
        println!(
            "✅ Wrote {} ({} bytes)",
            output.display(),
            compiled.bytecode.len()
        );
    }
    println!(
        "   sensors: {}, states: {}, gaits: {}, events: {}",
        counts.sensors, counts.states, counts.gaits, counts.events
    );
    println!(
        "   checksum: {:#04x} ({}), warnings: {}",
        compiled.checksum,
        compiled.layout,
        compiled.diagnostics.len()
    );
}

fn path_arg<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a Path> {
    matches
        .get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .ok_or_else(|| anyhow!("missing --{}", name))
}

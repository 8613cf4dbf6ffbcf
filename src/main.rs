use std::path::PathBuf;
use std::process::ExitCode;

use tagtree::{HierarchyMode, RunOptions, io, run};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    match execute(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn execute(config: &CliConfig) -> Result<(), tagtree::PipelineError> {
    let tags = io::read_tag_rows(&config.tags)?;
    let site = io::read_site_config(&config.site)?;
    let external = match &config.templates {
        Some(path) => Some(io::read_template_definitions(path)?),
        None => None,
    };

    let options = RunOptions { mode: config.mode, ..RunOptions::default() };
    let outcome = run(&tags, &site, external.as_deref(), &options)?;

    io::write_hierarchy_csv(&config.out, &outcome.rows)?;
    println!("Hierarchy rows written: {}", config.out.display());

    if let Some(spec_out) = &config.spec_out {
        io::write_template_spec(spec_out, &outcome.coverage)?;
        println!("Template specification written: {}", spec_out.display());
    }
    if let Some(matrix_dir) = &config.matrix_dir {
        io::write_presence_matrices(matrix_dir, &outcome.coverage.matrices)?;
        println!("Presence matrices written: {}", matrix_dir.display());
    }

    println!("\n{}", outcome.report);
    for pair in &outcome.coverage.similarity {
        println!(
            "note: templates `{}` and `{}` overlap strongly ({:.0}% Jaccard) — review for duplication",
            pair.left,
            pair.right,
            pair.jaccard * 100.0
        );
    }
    Ok(())
}

struct CliConfig {
    tags: PathBuf,
    site: PathBuf,
    templates: Option<PathBuf>,
    mode: HierarchyMode,
    out: PathBuf,
    spec_out: Option<PathBuf>,
    matrix_dir: Option<PathBuf>,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut tags: Option<PathBuf> = None;
    let mut site: Option<PathBuf> = None;
    let mut templates: Option<PathBuf> = None;
    let mut mode = HierarchyMode::Standard;
    let mut out: Option<PathBuf> = None;
    let mut spec_out: Option<PathBuf> = None;
    let mut matrix_dir: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        match flag.as_str() {
            "-h" | "--help" => {
                print!("{}", help_text());
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("tagtree {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--tags" => tags = Some(PathBuf::from(flag_value(&mut args, inline, "--tags")?)),
            "--site" => site = Some(PathBuf::from(flag_value(&mut args, inline, "--site")?)),
            "--templates" => templates = Some(PathBuf::from(flag_value(&mut args, inline, "--templates")?)),
            "--out" => out = Some(PathBuf::from(flag_value(&mut args, inline, "--out")?)),
            "--spec-out" => spec_out = Some(PathBuf::from(flag_value(&mut args, inline, "--spec-out")?)),
            "--matrix-dir" => matrix_dir = Some(PathBuf::from(flag_value(&mut args, inline, "--matrix-dir")?)),
            "--mode" => {
                mode = match flag_value(&mut args, inline, "--mode")?.as_str() {
                    "standard" => HierarchyMode::Standard,
                    "filtered" => HierarchyMode::TemplateFiltered,
                    other => return Err(format!("error: unknown mode '{other}' (expected standard|filtered)")),
                };
            }
            other => return Err(format!("error: unknown option '{other}'\n\n{}", help_text())),
        }
    }

    let tags = tags.ok_or_else(|| format!("error: --tags is required\n\n{}", help_text()))?;
    let site = site.ok_or_else(|| format!("error: --site is required\n\n{}", help_text()))?;
    let out = out.unwrap_or_else(|| PathBuf::from(io::timestamped_name("hierarchy", "csv")));

    Ok(CliConfig { tags, site, templates, mode, out, spec_out, matrix_dir })
}

fn flag_value(
    args: &mut impl Iterator<Item = String>,
    inline: Option<String>,
    flag: &str,
) -> Result<String, String> {
    match inline {
        Some(value) => Ok(value),
        None => args.next().ok_or_else(|| format!("error: {flag} expects a value")),
    }
}

fn help_text() -> String {
    format!(
        "tagtree {version}

Tag-parsing, coverage-analysis and template-matching engine CLI.

Usage:
  tagtree --tags <file> --site <file> [OPTIONS]

Options:
  --tags <file>         Delimited tag list (CSV or TSV; `Name` column required).
  --site <file>         Site configuration JSON (Level-1 root + placements).
  --templates <file>    External template definitions JSON. When omitted,
                        matching uses templates derived by coverage analysis.
  --mode <mode>         standard: emit every placeable asset, Template blank.
                        filtered: emit only template-matched assets.
                        Default: standard.
  --out <file>          Hierarchy CSV output. Default: timestamped name.
  --spec-out <file>     Also write the derived template specification JSON.
  --matrix-dir <dir>    Also write per-type attribute presence matrices.
  -h, --help            Show this help message.
  -V, --version         Print version information.

Existing output files are copied to a timestamped .backup-… sibling before
being overwritten.

Exit codes:
  0  Success.
  1  Run failed (structural error; no partial output written).
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION")
    )
}

//! Subcommand implementations.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use jari_core::dsl;
use jari_core::{
    Backend, BuildRequest, BuildSpecification, DataError, NullReporter, Reporter, SubmitOutcome,
};
use serde::Serialize;
use tracing::debug;

use crate::Cli;
use crate::console::ConsoleReporter;

#[derive(Debug, Serialize)]
struct Report<'a> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a str>,
    errors: &'a [DataError],
}

fn read_config(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

fn backend(cli: &Cli) -> Backend {
    let config = cli.backend_config();
    debug!(?config, "backend configuration");
    let reporter: Arc<dyn Reporter> = if cli.quiet || cli.json {
        Arc::new(NullReporter)
    } else {
        Arc::new(ConsoleReporter)
    };
    Backend::with_reporter(config, reporter)
}

/// `jari build <file>`
pub fn build(cli: &Cli, file: &Path) -> Result<ExitCode> {
    let text = read_config(file)?;
    let output = dsl::parse_str(&text).ok().map(|r| r.output);

    let backend = backend(cli);
    let outcome = backend.submit_config(&text)?;
    finish(cli, &backend, outcome, output.as_deref())
}

/// `jari pack ...`
pub fn pack(cli: &Cli, request: BuildRequest) -> Result<ExitCode> {
    let output = request.output.clone();
    let backend = backend(cli);
    let outcome = backend.submit(request)?;
    finish(cli, &backend, outcome, Some(&output))
}

/// `jari check <file>`: parse and validate, never build.
pub fn check(cli: &Cli, file: &Path) -> Result<ExitCode> {
    let text = read_config(file)?;
    let config = cli.backend_config();

    let errors = match dsl::parse_str(&text) {
        Ok(request) => {
            let spec = BuildSpecification::new(&request, &config.repository_url);
            if spec.is_valid() && !cli.json {
                describe(&spec);
            }
            spec.errors().to_vec()
        }
        Err(errors) => errors,
    };

    print_report(cli.json, errors.is_empty(), None, &errors)?;
    Ok(exit_code(errors.is_empty()))
}

fn describe(spec: &BuildSpecification) {
    for input in spec.inputs() {
        println!("input       {input}");
    }
    if let Some(output) = spec.output() {
        println!("output      {output}");
    }
    if let Some(main) = spec.main_class() {
        println!("main class  {}", main.dotted());
    }
    println!("version     {}", jari_core::manifest::format_version(spec.version()));
    println!("compress    {}", spec.use_compression());
    for dep in spec.dependencies() {
        println!("dependency  {}", dep.coordinate());
    }
}

fn finish(
    cli: &Cli,
    backend: &Backend,
    outcome: SubmitOutcome,
    output: Option<&str>,
) -> Result<ExitCode> {
    backend.wait();
    let ok = backend.is_ok();
    let errors = backend.take_errors();
    debug!(?outcome, ok, errors = errors.len(), "build finished");

    print_report(cli.json, ok, output.filter(|_| ok), &errors)?;
    Ok(exit_code(ok))
}

fn print_report(json: bool, ok: bool, output: Option<&str>, errors: &[DataError]) -> Result<()> {
    if json {
        let report = Report { ok, output, errors };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for err in errors {
        eprintln!("error: {err}");
    }
    if ok {
        match output {
            Some(path) => println!("built {path}"),
            None => println!("ok"),
        }
    }
    Ok(())
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

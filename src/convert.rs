//! End-to-end conversion: mapping -> source table -> manual inputs ->
//! transformation engine -> exported file.

use std::path::PathBuf;

use anyhow::Result;
use log::{debug, info};

use crate::{
    cli::ConvertArgs,
    engine::{Engine, ManualInputs},
    export,
    mapping::Mapping,
    prompt::{self, ConsolePrompt, Frontend, ManualField},
    source,
};

pub fn execute(args: &ConvertArgs) -> Result<()> {
    let mut frontend = ConsolePrompt;
    execute_with_frontend(args, &mut frontend)
}

pub fn execute_with_frontend(args: &ConvertArgs, frontend: &mut dyn Frontend) -> Result<()> {
    let mapping = Mapping::load(&args.mapping)?;
    let (input, output) = resolve_paths(args, frontend)?;
    let manual = collect_manual_inputs(args, &mapping, frontend)?;

    info!("Reading MEGA export '{}'", input.display());
    let table = source::read_source(&input, args.delimiter)?;
    info!(
        "Applying mapping '{}' to {} row(s)",
        args.mapping.display(),
        table.len()
    );
    let engine = Engine::new(mapping);
    let target = engine.transform(&table, &manual)?;

    info!("Exporting CSV to '{}'", output.display());
    export::export(&target, &output, &engine.mapping().settings)?;
    info!(
        "Wrote {} row(s) across {} column(s)",
        target.len(),
        target.columns().len()
    );
    Ok(())
}

/// Command-line paths win; whichever is missing is asked for through the
/// frontend, the way the original interactive flow collected both.
fn resolve_paths(args: &ConvertArgs, frontend: &mut dyn Frontend) -> Result<(PathBuf, PathBuf)> {
    match (&args.input, &args.output) {
        (Some(input), Some(output)) => Ok((input.clone(), output.clone())),
        _ => {
            let (prompted_input, prompted_output) = frontend.file_paths()?;
            Ok((
                args.input.clone().unwrap_or(prompted_input),
                args.output.clone().unwrap_or(prompted_output),
            ))
        }
    }
}

fn collect_manual_inputs(
    args: &ConvertArgs,
    mapping: &Mapping,
    frontend: &mut dyn Frontend,
) -> Result<ManualInputs> {
    let mut manual = prompt::parse_set_values(&args.set)?;
    for name in manual.keys() {
        if mapping.columns.get(name).is_none() {
            debug!("--set names '{name}', which is not a mapped column");
        }
    }
    if args.interactive {
        let missing = mapping
            .manual_fields()
            .into_iter()
            .filter(|(name, _)| !manual.contains_key(*name))
            .map(|(name, default)| ManualField { name, default })
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            manual.extend(frontend.manual_inputs(&missing)?);
        }
    }
    Ok(manual)
}

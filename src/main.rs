use anyhow::{Context, bail};
use clap::Parser;
use std::io::{self, BufWriter, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tabixr::{
    Config, IndexedReader, Result, build_index,
    config::{Command, IndexArgs, MergeArgs, QueryArgs},
    merge_index_files,
    reader::index_path,
    write_index,
};

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match config.command {
        Command::Index(args) => index(&args),
        Command::Query(args) => query(&args),
        Command::Merge(args) => merge(&args),
        Command::List { file } => {
            let reader = IndexedReader::open(&file)?;
            let mut out = BufWriter::new(io::stdout().lock());
            for name in reader.reference_names() {
                writeln!(out, "{}", name)?;
            }
            out.flush()?;
            Ok(())
        }
    }
}

fn index(args: &IndexArgs) -> anyhow::Result<()> {
    let output = args.index_path();
    if output.exists() && !args.force {
        bail!("{:?} already exists; use --force to overwrite", output);
    }

    let options = args.options()?;
    let index = build_index(&args.file, options)?;
    write_index(&output, &index)?;

    tracing::info!("Wrote {:?}", output);
    Ok(())
}

fn query(args: &QueryArgs) -> anyhow::Result<()> {
    let reader = IndexedReader::open(&args.file)?;
    let regions = args.regions()?;
    let mut out = BufWriter::new(io::stdout().lock());

    if args.print_header {
        for line in reader.header_lines()? {
            writeln!(out, "{}", line)?;
        }
    }

    let records: Box<dyn Iterator<Item = Result<String>>> = match regions.as_slice() {
        [] => Box::new(reader.query_all()?),
        [region] => Box::new(reader.query(region)?),
        regions => Box::new(reader.query_regions(regions)?),
    };

    for record in records {
        writeln!(out, "{}", record?)?;
    }

    out.flush()?;
    Ok(())
}

fn merge(args: &MergeArgs) -> anyhow::Result<()> {
    let inputs = args
        .files
        .iter()
        .map(|file| {
            let index = index_path(file).with_context(|| format!("no tabix index found for {:?}", file))?;
            Ok((index, file.clone()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    merge_index_files(&inputs, &args.output)?;
    Ok(())
}

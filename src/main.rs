// main.rs

use anyhow::{Error, Result};
use clap::Parser;
use log::info;
use std::time::Instant;

fn main() -> Result<(), Error> {
    let total_time_start = Instant::now();
    let cli_args = cli::CliArgs::parse();

    // Initialize logger
    let log_level = cli_args
        .log_level
        .parse::<log::LevelFilter>()
        .unwrap_or_else(|_| {
            eprintln!(
                "Warning: Invalid log level '{}' provided. Defaulting to Info.",
                cli_args.log_level
            );
            log::LevelFilter::Info
        });
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_micros()
        .init();

    // Configure Rayon thread pool
    let num_threads = cli_args.threads.unwrap_or_else(num_cpus::get);
    info!("Using {} threads for parallel operations.", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    match cli_args.command {
        cli::Command::Partitions(args) => partitions_cmd::run(args)?,
        cli::Command::Grm(args) => grm_cmd::run(args)?,
        cli::Command::Summarize(args) => summarize_cmd::run(args)?,
    }

    info!(
        "genomic_cv finished successfully in {:.2?}.",
        total_time_start.elapsed()
    );
    Ok(())
}

mod cli {
    use clap::{Args, Parser, Subcommand};
    use std::path::PathBuf;

    use genomic_cv::ModelFamily;

    #[derive(Parser, Debug)]
    #[command(author, version, about = "Repeated cross-validation for genomic prediction.", long_about = None, propagate_version = true)]
    pub(crate) struct CliArgs {
        #[command(subcommand)]
        pub(crate) command: Command,

        #[arg(short = 't', long, global = true)]
        pub(crate) threads: Option<usize>,

        #[arg(long, default_value = "Info", global = true)]
        pub(crate) log_level: String,
    }

    #[derive(Subcommand, Debug)]
    pub(crate) enum Command {
        /// Emit the deterministic training/testing partitions as TSV for
        /// external model-fitting tools.
        Partitions(PartitionsArgs),

        /// Build the genomic relationship matrix from a genotype file.
        Grm(GrmArgs),

        /// Aggregate persisted outCOR_<MODEL>.tsv files into a side-by-side
        /// mean/sd table across model families.
        Summarize(SummarizeArgs),
    }

    #[derive(Args, Debug)]
    pub(crate) struct PartitionsArgs {
        /// Number of individuals. Alternative to --genotypes.
        #[arg(short = 'n', long, conflicts_with = "genotypes")]
        pub(crate) n: Option<usize>,

        /// Genotype TSV whose row count gives the number of individuals.
        #[arg(short = 'g', long)]
        pub(crate) genotypes: Option<PathBuf>,

        /// Replicate count m.
        #[arg(short = 'm', long, default_value_t = 10)]
        pub(crate) replicates: usize,

        /// Fraction of individuals held out for testing, in (0, 1).
        #[arg(long = "perc-tst", default_value_t = 0.3)]
        pub(crate) perc_tst: f64,

        /// Root seed recorded with the output for provenance.
        #[arg(short = 's', long, default_value_t = 123)]
        pub(crate) seed: u64,

        /// Output TSV path.
        #[arg(short = 'o', long = "out", required = true)]
        pub(crate) output: PathBuf,
    }

    #[derive(Args, Debug)]
    pub(crate) struct GrmArgs {
        /// Genotype TSV (header of marker IDs, sample ID in first column).
        #[arg(short = 'g', long, required = true)]
        pub(crate) genotypes: PathBuf,

        /// Output TSV path for the relationship matrix.
        #[arg(short = 'o', long = "out", required = true)]
        pub(crate) output: PathBuf,
    }

    #[derive(Args, Debug)]
    pub(crate) struct SummarizeArgs {
        /// Directory holding outCOR_<MODEL>.tsv files.
        #[arg(short = 'd', long = "dir", required = true)]
        pub(crate) results_dir: PathBuf,

        /// Model families to include (missing files are skipped with a
        /// warning). Defaults to all four.
        #[arg(long, value_delimiter = ',')]
        pub(crate) models: Option<Vec<ModelFamily>>,

        /// Optional output path; the table goes to stdout when omitted.
        #[arg(short = 'o', long = "out")]
        pub(crate) output: Option<PathBuf>,
    }
}

mod partitions_cmd {
    use super::cli::PartitionsArgs;
    use anyhow::{anyhow, Result};
    use genomic_cv::{dataset, replicate_seeds, Partition};
    use log::info;
    use std::fs::File;
    use std::io::{BufWriter, Write};

    pub(crate) fn run(args: PartitionsArgs) -> Result<()> {
        if !(args.perc_tst > 0.0 && args.perc_tst < 1.0) {
            return Err(anyhow!(
                "--perc-tst must lie strictly between 0 and 1, got {}",
                args.perc_tst
            ));
        }
        if args.replicates == 0 {
            return Err(anyhow!("--replicates must be positive"));
        }

        let n = match (&args.n, &args.genotypes) {
            (Some(n), _) => *n,
            (None, Some(path)) => {
                let (sample_ids, _, _) = dataset::load_genotypes(path)?;
                sample_ids.len()
            }
            (None, None) => {
                return Err(anyhow!("either --n or --genotypes must be given"));
            }
        };
        if n == 0 {
            return Err(anyhow!("need at least one individual"));
        }

        let seeds = replicate_seeds(args.replicates);
        info!(
            "Generating {} partitions of {} individuals ({}% testing), root seed {}",
            args.replicates,
            n,
            args.perc_tst * 100.0,
            args.seed
        );

        let mut writer = File::create(&args.output)
            .map(BufWriter::new)
            .map_err(|e| anyhow!("Failed to create output file {}: {}", args.output.display(), e))?;

        writeln!(writer, "# root_seed={} n={} perc_tst={}", args.seed, n, args.perc_tst)?;
        writeln!(writer, "replicate\tseed\tn_train\tn_test\ttesting")?;
        for (k, &seed) in seeds.iter().enumerate() {
            let p = Partition::draw(n, args.perc_tst, seed);
            // Testing indices are written 1-based for downstream R tooling.
            let testing = p
                .testing
                .iter()
                .map(|&i| (i + 1).to_string())
                .collect::<Vec<_>>()
                .join(",");
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}",
                k + 1,
                seed,
                p.training.len(),
                p.testing.len(),
                testing
            )?;
        }
        info!("Wrote partitions to {}", args.output.display());
        Ok(())
    }
}

mod grm_cmd {
    use super::cli::GrmArgs;
    use anyhow::{anyhow, Result};
    use genomic_cv::{dataset, relationship_matrix};
    use log::info;
    use std::fs::File;
    use std::io::{BufWriter, Write};

    pub(crate) fn run(args: GrmArgs) -> Result<()> {
        let (sample_ids, marker_ids, genotypes) = dataset::load_genotypes(&args.genotypes)?;
        info!(
            "Loaded {} individuals x {} markers from {}",
            sample_ids.len(),
            marker_ids.len(),
            args.genotypes.display()
        );

        let (g, used) = relationship_matrix(&genotypes)?;
        info!("Relationship matrix built from {} polymorphic markers", used);

        let mut writer = File::create(&args.output)
            .map(BufWriter::new)
            .map_err(|e| anyhow!("Failed to create output file {}: {}", args.output.display(), e))?;

        write!(writer, "ID")?;
        for id in &sample_ids {
            write!(writer, "\t{}", id)?;
        }
        writeln!(writer)?;
        for (i, id) in sample_ids.iter().enumerate() {
            write!(writer, "{}", id)?;
            for j in 0..sample_ids.len() {
                write!(writer, "\t{:.6}", g[[i, j]])?;
            }
            writeln!(writer)?;
        }
        info!("Wrote relationship matrix to {}", args.output.display());
        Ok(())
    }
}

mod summarize_cmd {
    use super::cli::SummarizeArgs;
    use anyhow::{anyhow, Result};
    use genomic_cv::results::render_summary;
    use genomic_cv::{summarize_families, ModelFamily};
    use log::info;
    use std::fs;

    pub(crate) fn run(args: SummarizeArgs) -> Result<()> {
        let families = args.models.unwrap_or_else(|| ModelFamily::ALL.to_vec());
        let summaries = summarize_families(&args.results_dir, &families)?;
        for s in &summaries {
            info!(
                "{}: {} replicates, mean accuracy {:.4}, sd {:.4}",
                s.model, s.replicates, s.mean, s.std_dev
            );
        }

        let table = render_summary(&summaries);
        match &args.output {
            Some(path) => {
                fs::write(path, &table)
                    .map_err(|e| anyhow!("Failed to write summary to {}: {}", path.display(), e))?;
                info!("Wrote summary to {}", path.display());
            }
            None => print!("{}", table),
        }
        Ok(())
    }
}

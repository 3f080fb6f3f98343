use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use zkvm_prover::archive::pack_words;
use zkvm_prover::engine::Program;
use zkvm_prover::{Config, DevEngine, Key, Proof, Prover, Sandbox};

#[derive(Parser)]
#[command(author, version, about = "Prove and verify guest programs under the development engine")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a program's identity and write it to `<program>.id`
    Id { program: PathBuf },
    /// Run a program, prove it and write the self-verified proof
    Prove {
        #[command(flatten)]
        run: RunArgs,
        /// Where to write the proof
        #[arg(long, default_value = "proof.bin")]
        proof: PathBuf,
    },
    /// Check a proof against the identity stored beside a program
    Verify { program: PathBuf, proof: PathBuf },
    /// Run a program without proving it
    Execute {
        #[command(flatten)]
        run: RunArgs,
        /// Save the execution trace (bincode)
        #[arg(long)]
        trace: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    program: PathBuf,
    /// Raw input bytes, staged as little-endian words
    #[arg(long)]
    input: Option<PathBuf>,
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Extra key as ID=HEX, may be repeated
    #[arg(long = "key", value_name = "ID=HEX")]
    keys: Vec<String>,
    /// Write the guest's output channel here
    #[arg(long)]
    output: Option<PathBuf>,
}

impl RunArgs {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        for entry in &self.keys {
            let Some((id, material)) = entry.split_once('=') else {
                bail!("key `{entry}` is not of the form ID=HEX");
            };
            Key::from_hex(material)?;
            config.prover.keys.insert(id.to_string(), material.to_string());
        }
        Ok(config)
    }

    fn input(&self) -> Result<Vec<u8>> {
        match &self.input {
            Some(path) => fs::read(path).with_context(|| format!("reading input {}", path.display())),
            None => Ok(Vec::new()),
        }
    }

    fn write_output(&self, output: &[u8]) -> Result<()> {
        if let Some(path) = &self.output {
            fs::write(path, output).with_context(|| format!("writing output {}", path.display()))?;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Id { program } => id(&program),
        Commands::Prove { run, proof } => prove(&run, &proof),
        Commands::Verify { program, proof } => verify(&program, &proof),
        Commands::Execute { run, trace } => execute(&run, trace.as_deref()),
    }
}

fn id(program: &Path) -> Result<()> {
    let code = DevEngine::default().write_code_id(program)?;
    println!("{code}");
    Ok(())
}

fn prove(args: &RunArgs, proof_path: &Path) -> Result<()> {
    let config = args.config()?;
    let engine = DevEngine::new(config.engine);
    let mut prover = Prover::with_config(engine, &args.program, config.prover)?;
    prover.write_input(&args.input()?);

    let proof = prover.run()?;
    args.write_output(prover.output())?;
    proof.save(proof_path)?;
    info!(
        "proof written to {} ({} message bytes)",
        proof_path.display(),
        proof.message().len()
    );
    println!("{}", hex::encode(proof.message()));
    Ok(())
}

fn verify(program: &Path, proof_path: &Path) -> Result<()> {
    let proof = Proof::load(proof_path)
        .with_context(|| format!("loading proof {}", proof_path.display()))?;
    proof.verify(&DevEngine::default(), program)?;
    println!("{}", hex::encode(proof.message()));
    Ok(())
}

fn execute(args: &RunArgs, trace_path: Option<&Path>) -> Result<()> {
    let config = args.config()?;
    let engine = DevEngine::new(config.engine);
    let program = Program::load(&args.program)?;
    let input = pack_words(&args.input()?);
    let key_store = config.prover.key_store()?;

    let mut output = Vec::new();
    let mut commit = Vec::new();
    let trace = {
        let mut sandbox = Sandbox::new(
            config.prover.memory,
            &input,
            &mut output,
            &mut commit,
            &key_store,
        )?;
        engine.execute(&program, &mut sandbox)?
    };
    info!(
        "executed {} cycles, {} output bytes, {} committed bytes",
        trace.num_cycles(),
        output.len(),
        commit.len()
    );

    args.write_output(&output)?;
    if let Some(path) = trace_path {
        trace.save(path)?;
        info!("trace written to {}", path.display());
    }
    println!("{}", hex::encode(&commit));
    Ok(())
}

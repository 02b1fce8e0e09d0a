use std::{
    fs::File,
    io::{self, BufWriter},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use crftagger::{ConllReader, ConllWriter, Error, Fields, Lbfgs, LbfgsParams, Reader, Result, Tagger, Writer};

#[derive(Debug, Parser)]
#[command(version, about = "Linear-chain CRF chunk tagger")]
#[command(propagate_version = true)]
struct Argv {
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train a model from a `word pos tag` corpus.
    Train {
        #[arg(short, long)]
        model: PathBuf,
        #[arg(short, long)]
        input: PathBuf,
        /// Model options after `--`, e.g. `-- --types-pos-bigrams false --train-c2 0.5`.
        #[arg(last = true)]
        options: Vec<String>,
    },
    /// Tag a `word pos` corpus with a trained model.
    Tag {
        #[arg(short, long)]
        model: PathBuf,
        /// Defaults to stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// The input carries gold tags; print an evaluation report.
        #[arg(short, long)]
        evaluate: bool,
    },
}

fn open_reader(input: Option<PathBuf>, fields: Fields) -> Result<Box<dyn Reader>> {
    match input {
        Some(path) => Ok(Box::new(ConllReader::open(path, fields)?)),
        None => Ok(Box::new(ConllReader::new("<stdin>", io::stdin().lock(), fields))),
    }
}

fn train(model: PathBuf, input: PathBuf, options: Vec<String>) -> Result<()> {
    let mut cfg = Tagger::config();
    let mut args = vec!["--model".to_string(), model.display().to_string()];
    args.extend(options);
    if !cfg.process(&args, &mut io::stdout())? {
        return Ok(());
    }

    let mut tagger = Tagger::new(&cfg)?;
    let mut reader = ConllReader::open(input, Fields::default())?;
    let mut lbfgs = Lbfgs::new(LbfgsParams::from_config(&cfg)?);
    tagger.train(&mut reader, &mut lbfgs)
}

fn tag(model: PathBuf, input: Option<PathBuf>, output: Option<PathBuf>, evaluate: bool) -> Result<()> {
    let tagger = Tagger::load(model)?;
    if evaluate {
        let mut reader = open_reader(input, Fields::default())?;
        let eval = tagger.evaluate(reader.as_mut())?;
        print!("{eval}");
        return Ok(());
    }

    let fields = Fields::WORDS | Fields::POS;
    let mut reader = open_reader(input, fields)?;
    let mut writer: Box<dyn Writer> = match output {
        Some(path) => {
            let f = File::create(&path).map_err(|e| Error::io("unable to open file for writing", &path, e))?;
            Box::new(ConllWriter::new(path, BufWriter::new(f), fields))
        }
        None => Box::new(ConllWriter::new("<stdout>", io::stdout().lock(), fields)),
    };
    tagger.run_tag(reader.as_mut(), writer.as_mut())?;
    Ok(())
}

fn main() -> ExitCode {
    let argv = Argv::parse();
    let level = match argv.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::debug!("argv: {:?}", argv);

    let ret = match argv.command {
        Command::Train { model, input, options } => train(model, input, options),
        Command::Tag { model, input, output, evaluate } => tag(model, input, output, evaluate),
    };
    match ret {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

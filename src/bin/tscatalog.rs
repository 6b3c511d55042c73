use std::ffi::OsStr;
use std::fs::{self, File};
use std::{env, io};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;

extern crate tscatalog;
use tscatalog::{Catalog, Config, Ts};

/// Where to look for a configuration file.
const YAML: &str = "tscatalog.yaml";

/// Run the program and format the output if an error occurs.
fn main() -> Result<(), String> {
    run_main().map_err(|x| x.to_string())
}

/// Read the configuration from `tscatalog.yaml` when run without arguments.
fn read_config() -> Result<Config, Box<dyn std::error::Error>> {
    let yaml = if env::args().count() <= 1 {
        fs::read_dir(env::current_dir()?)?
            .filter_map(Result::ok)
            .find(|x| x.file_name() == OsStr::new(YAML))
    } else {
        None
    };
    Ok(match yaml {
        Some(x) => serde_yaml::from_reader(File::open(x.path())?)?,
        None => Config::from_args(),
    })
}

fn init_logging(silent: bool) {
    let default = if silent { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Run the program.
fn run_main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = read_config()?;
    init_logging(cfg.silent);

    let mut ts = Ts::load(&cfg.ts)?;
    if cfg.no_obsolete {
        ts.purge_obsolete();
    }
    let mut catalog = Catalog::from_ts(ts)?.with_policy(cfg.unfinished);
    if let Some(language) = &cfg.language {
        catalog = catalog.with_language(language);
    }
    info!(
        path = %cfg.ts.display(),
        language = catalog.language().unwrap_or("?"),
        rule = %catalog.plural_rule(),
        "loaded {} message(s)",
        catalog.len()
    );

    if cfg.stats {
        println!("{}", catalog.stats());
    }
    if let Some((context, source)) = cfg.query() {
        let text = catalog.lookup(context, source, cfg.comment.as_deref(), cfg.count)?;
        match cfg.count {
            Some(n) => println!("{}", tscatalog::placeholder::substitute_count(text, n)),
            None => println!("{}", text),
        }
    }
    if let Some(output) = &cfg.output {
        catalog.save(output)?;
        info!(path = %output.display(), "wrote catalog");
    }
    Ok(())
}

use crate::catalog::UnfinishedPolicy;
use serde::Deserialize;
use std::path::PathBuf;
use structopt::StructOpt;

/// Query and normalize a Qt Linguist translation catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, StructOpt)]
#[structopt(name = "tscatalog")]
pub struct Config {
    /// Translation source (.ts) file to load
    #[structopt(long, required = true)]
    pub ts: PathBuf,
    /// Delete obsolete and vanished strings
    #[serde(default)]
    #[structopt(long)]
    pub no_obsolete: bool,
    /// What unfinished translations resolve to
    #[serde(default)]
    #[structopt(long, default_value = "source", possible_values = &["source", "translation"])]
    pub unfinished: UnfinishedPolicy,
    /// Language whose plural rule selects numerus forms, instead of the file's
    #[serde(default)]
    #[structopt(long)]
    pub language: Option<String>,
    /// Print message counts by status
    #[serde(default)]
    #[structopt(long)]
    pub stats: bool,
    /// Write the loaded catalog back out to this file
    #[serde(default)]
    #[structopt(long)]
    pub output: Option<PathBuf>,
    /// Do not explain what is being done
    #[serde(default)]
    #[structopt(long)]
    pub silent: bool,
    /// Context of the message to look up
    #[serde(default)]
    #[structopt(long, requires = "source")]
    pub context: Option<String>,
    /// Disambiguating comment of the message to look up
    #[serde(default)]
    #[structopt(long)]
    pub comment: Option<String>,
    /// Count used to pick a plural form and to fill %n
    #[serde(default)]
    #[structopt(short = "n", long)]
    pub count: Option<u64>,
    /// Source text to look up
    #[serde(default)]
    #[structopt(requires = "context")]
    pub source: Option<String>,
}

impl Config {
    /// The lookup requested on the command line, if any.
    pub fn query(&self) -> Option<(&str, &str)> {
        Some((self.context.as_deref()?, self.source.as_deref()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lookup_arguments() {
        let cfg = Config::from_iter_safe(&[
            "tscatalog",
            "--ts",
            "VirtualBox_he.ts",
            "--context",
            "UIMachineSettingsSystem",
            "-n",
            "3",
            "%n CPU(s)",
        ])
        .unwrap();
        assert_eq!(cfg.ts, PathBuf::from("VirtualBox_he.ts"));
        assert_eq!(cfg.count, Some(3));
        assert_eq!(cfg.unfinished, UnfinishedPolicy::Source);
        assert_eq!(cfg.query(), Some(("UIMachineSettingsSystem", "%n CPU(s)")));
    }

    #[test]
    fn source_requires_context() {
        assert!(Config::from_iter_safe(&["tscatalog", "--ts", "a.ts", "Name"]).is_err());
    }

    #[test]
    fn rejects_unknown_policy() {
        let args = ["tscatalog", "--ts", "a.ts", "--unfinished", "blank"];
        assert!(Config::from_iter_safe(&args).is_err());
    }

    #[test]
    fn reads_yaml() {
        let yaml = "ts: VirtualBox_he.ts\nunfinished: translation\nno_obsolete: true\nstats: true\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.unfinished, UnfinishedPolicy::Translation);
        assert!(cfg.no_obsolete);
        assert!(cfg.stats);
        assert_eq!(cfg.query(), None);
    }
}

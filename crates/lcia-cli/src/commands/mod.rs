pub mod contexts;
pub mod dataset;
pub mod lcia;
pub mod quantities;
pub mod relation;

use clap::Args;
use lcia_core::config::load_config;
use lcia_core::dataset::{builtin, load_dataset};
use lcia_core::error::LciaError;
use lcia_core::{EngineConfig, QueryOptions, TermManager};
use std::path::PathBuf;

/// Where reference data and configuration come from.
pub struct Sources {
    pub datasets: Vec<PathBuf>,
    pub presets: Vec<String>,
    pub config: Option<PathBuf>,
}

impl Sources {
    pub fn engine_config(&self) -> Result<EngineConfig, LciaError> {
        match &self.config {
            Some(path) => load_config(path),
            None => Ok(EngineConfig::default()),
        }
    }

    /// Build the sealed term manager for one command.
    pub fn open(&self) -> Result<TermManager, LciaError> {
        let config = self.engine_config()?;

        // Default to all presets if nothing was named.
        let presets: Vec<String> = if self.presets.is_empty() && self.datasets.is_empty() {
            builtin::PRESETS.iter().map(|s| s.to_string()).collect()
        } else {
            self.presets.clone()
        };

        let mut datasets = Vec::new();
        for name in &presets {
            datasets.push(builtin::load_preset(name)?);
        }
        for path in &self.datasets {
            datasets.push(load_dataset(path)?);
        }
        lcia_core::open_term_manager(&datasets, config)
    }
}

/// Per-query overrides on top of the configured defaults.
#[derive(Args)]
pub struct QueryArgs {
    /// Preferred locale for factors (default: GLO)
    #[arg(long)]
    pub locale: Option<String>,

    /// Context search distance, 0 (exact) to 3 (all ancestors)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub dist: Option<u8>,

    /// Pick among several factors: first, highest or lowest
    #[arg(long)]
    pub strategy: Option<String>,

    /// Never fall back to factors from other locales
    #[arg(long)]
    pub no_proxy: bool,
}

impl QueryArgs {
    pub fn apply(&self, base: &QueryOptions) -> Result<QueryOptions, LciaError> {
        let mut options = base.clone();
        if let Some(ref locale) = self.locale {
            options = options.with_locale(locale);
        }
        if let Some(dist) = self.dist {
            options = options.with_dist(dist);
        }
        if let Some(ref strategy) = self.strategy {
            options = options.with_strategy(strategy.parse()?);
        }
        if self.no_proxy {
            options.allow_proxy = false;
        }
        Ok(options)
    }
}

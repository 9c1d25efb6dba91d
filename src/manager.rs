use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::{Engine, TrialResult};
use anyhow::{Context, Result, bail};
use glob::glob;
use rand::prelude::*;
use rayon::prelude::*;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Trials of a single sweep value together with the settings that produced them.
#[derive(Debug, Serialize, Deserialize)]
pub struct SweepRecord {
    pub cfg: Config,
    pub seed: u64,
    pub delta: f64,
    pub trials: Vec<TrialResult>,
}

/// Sweep records keyed by their noise scale.
pub type ExperimentResult = Vec<SweepRecord>;

/// Run `n_reps` independent trials for one noise scale.
///
/// Trial `i_trial` of sweep value `i_delta` draws from stream
/// `i_delta * n_reps + i_trial` of the run seed.
pub fn run_trials(cfg: &Config, i_delta: usize, seed: u64) -> Result<Vec<TrialResult>> {
    let delta = cfg.sweep.deltas[i_delta];
    let params = cfg.params(delta)?;
    let policy = cfg.policy();
    let n_reps = cfg.trial.n_reps;

    (0..n_reps)
        .into_par_iter()
        .map(|i_trial| -> Result<TrialResult> {
            let stream = (i_delta * n_reps + i_trial) as u64;
            let mut engine = Engine::new(
                params,
                policy,
                cfg.trial.n_rounds,
                cfg.trial.window,
                seed,
                stream,
            )?;
            let res = engine
                .run()
                .with_context(|| format!("failed to run trial {i_trial}"))?;
            log::debug!("delta = {delta}, trial {i_trial}: {:?}", res.prices);
            Ok(res)
        })
        .collect()
}

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Run every sweep value that has no record yet.
    pub fn run_experiment(&self) -> Result<()> {
        let seed = match self.cfg.trial.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::rng().random();
                log::info!("drew run seed {seed}");
                seed
            }
        };

        let n_deltas = self.cfg.sweep.deltas.len();
        for (i_delta, &delta) in self.cfg.sweep.deltas.iter().enumerate() {
            let record_file = self.record_file(i_delta);
            if record_file.exists() {
                let record = load_record(&record_file)
                    .with_context(|| format!("failed to load {record_file:?}"))?;
                if record.cfg != self.cfg {
                    bail!("record config differs from the current config");
                }
                log::info!("skipping delta = {delta}, found {record_file:?}");
                continue;
            }

            let trials = run_trials(&self.cfg, i_delta, seed)
                .with_context(|| format!("failed to run trials for delta = {delta}"))?;

            let record = SweepRecord {
                cfg: self.cfg.clone(),
                seed,
                delta,
                trials,
            };
            save_record(&record, &record_file)
                .with_context(|| format!("failed to save {record_file:?}"))?;

            let progress = 100.0 * (i_delta + 1) as f64 / n_deltas as f64;
            log::info!("completed {progress:06.2}% (delta = {delta})");
        }

        Ok(())
    }

    /// Load the records of every completed sweep value, in sweep order.
    pub fn load_experiment(&self) -> Result<ExperimentResult> {
        let mut records = Vec::new();
        for i_delta in 0..self.cfg.sweep.deltas.len() {
            let record_file = self.record_file(i_delta);
            if !record_file.exists() {
                log::warn!("missing {record_file:?}");
                continue;
            }
            let record = load_record(&record_file)
                .with_context(|| format!("failed to load {record_file:?}"))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Analyze every available record and write the reports as JSON.
    pub fn run_analysis(&self) -> Result<()> {
        let mut reports = Vec::new();
        for record in self.load_experiment()? {
            let params = record.cfg.params(record.delta)?;
            let mut analyzer = Analyzer::new(&params);
            analyzer.add_trials(&record.trials);
            reports.push(analyzer.report());
        }

        let analysis_file = self.analysis_file();
        let file = File::create(&analysis_file)
            .with_context(|| format!("failed to create {analysis_file:?}"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &reports)
            .context("failed to serialize reports")?;
        writer.flush().context("failed to flush writer stream")?;
        log::info!("wrote {analysis_file:?}");

        Ok(())
    }

    /// Remove every file produced by the other commands.
    pub fn clean_sim(&self) -> Result<()> {
        let pattern = self.sim_dir.join("sweep-*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let mut files: Vec<_> = glob(pattern)
            .context("failed to glob record files")?
            .filter_map(Result::ok)
            .collect();
        files.push(self.analysis_file());

        for file in files.iter().filter(|file| file.exists()) {
            fs::remove_file(file).with_context(|| format!("failed to remove {file:?}"))?;
            log::info!("removed {file:?}");
        }

        Ok(())
    }

    fn record_file(&self, i_delta: usize) -> PathBuf {
        self.sim_dir.join(format!("sweep-{i_delta:04}.msgpack"))
    }

    fn analysis_file(&self) -> PathBuf {
        self.sim_dir.join("analysis.json")
    }
}

fn save_record<P: AsRef<Path>>(record: &SweepRecord, file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    write_record(record, file)
}

fn write_record<W: Write>(record: &SweepRecord, inner: W) -> Result<()> {
    let mut writer = BufWriter::new(inner);
    encode::write_named(&mut writer, record).context("failed to serialize record")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

fn load_record<P: AsRef<Path>>(file: P) -> Result<SweepRecord> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let record = decode::from_read(&mut reader).context("failed to deserialize record")?;
    Ok(record)
}

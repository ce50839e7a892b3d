//! Command handlers
//!
//! Thin wrappers that build a `MonitorConfig`, call into `logic` and
//! print the result. Library errors surface here through `anyhow`.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use super::cli::{Cli, Commands, LogCommands, OutputFormat, SpikeArg};
use super::engine_status;
use crate::logic::analysis::{detect_seasonality, energy_metrics, threshold_labels, EnergyMetrics};
use crate::logic::anomaly_log::AnomalyLog;
use crate::logic::config::MonitorConfig;
use crate::logic::dataset::{
    anomaly_labels, inject_record_spike, read_dataset, series, write_dataset, GeneratorConfig,
    SyntheticGenerator,
};
use crate::logic::dataset::export::to_csv;
use crate::logic::model::DetectionMethod;
use crate::logic::monitor::LiveMonitor;
use crate::logic::pipeline::MonitoringPipeline;
use crate::logic::sensor::Parameter;
use crate::logic::training::{run_training, TrainingOptions};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Environment defaults with the global flags applied
pub fn build_config(cli: &Cli) -> MonitorConfig {
    let mut config = MonitorConfig::from_env();
    if let Some(dir) = &cli.models_dir {
        config.models_dir = dir.clone();
    }
    if let Some(path) = &cli.dataset {
        config.dataset_path = path.clone();
    }
    if let Some(path) = &cli.anomaly_log {
        config.anomaly_log_path = path.clone();
    }
    config
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = build_config(&cli);
    let format = cli.format;

    match cli.command {
        Commands::Generate {
            days,
            seed,
            anomaly_probability,
            csv,
            spikes,
        } => {
            let gen_config = GeneratorConfig {
                anomaly_probability,
                seed: seed.unwrap_or(config.seed),
                voltage: config.voltage,
                maintenance: config.maintenance.clone(),
                ..GeneratorConfig::for_days(days)
            };
            generate(&config, gen_config, &spikes, csv.as_deref())
        }
        Commands::Train {
            window,
            contamination,
            sequence_epochs,
        } => {
            let mut options = TrainingOptions::from(&config);
            if let Some(w) = window {
                options.window_size = w;
            }
            if let Some(c) = contamination {
                options.contamination = c;
            }
            options.sequence_epochs = sequence_epochs;
            train(&config, &options, format)
        }
        Commands::Inspect {
            parameter,
            threshold_std,
        } => inspect(&config, parameter.as_deref(), threshold_std, format),
        Commands::Monitor {
            sensor_file,
            receiver_url,
            no_receiver,
            interval,
            ticks,
            method,
        } => {
            let mut config = config;
            if let Some(path) = sensor_file {
                config.sensor_file_path = path;
            }
            if let Some(url) = receiver_url {
                config.receiver_url = url;
            }
            if no_receiver {
                config.receiver_enabled = false;
            }
            if let Some(secs) = interval {
                config.poll_interval_secs = secs;
            }
            let method: DetectionMethod = method.parse()?;
            monitor(config, method, ticks).await
        }
        Commands::Status => status(&config, format),
        Commands::Log(cmd) => anomaly_log(&config, cmd, format),
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

fn generate(
    config: &MonitorConfig,
    gen_config: GeneratorConfig,
    spikes: &[SpikeArg],
    csv: Option<&std::path::Path>,
) -> Result<()> {
    log::info!(
        "Generating {} points from {}",
        gen_config.points,
        gen_config.start.to_rfc3339()
    );
    let mut records = SyntheticGenerator::new(gen_config).generate();
    for spike in spikes {
        inject_record_spike(&mut records, spike.index, spike.parameter, spike.value)
            .with_context(|| format!("injecting spike at {}", spike.index))?;
        log::info!("Injected {} = {} at index {}", spike.parameter, spike.value, spike.index);
    }

    let written = write_dataset(&config.dataset_path, &records)
        .with_context(|| format!("writing {}", config.dataset_path.display()))?;
    println!("Wrote {} records to {}", written, config.dataset_path.display());

    if let Some(path) = csv {
        let rows = to_csv(&records, path).with_context(|| format!("writing {}", path.display()))?;
        println!("Exported {} rows to {}", rows, path.display());
    }
    Ok(())
}

fn train(config: &MonitorConfig, options: &TrainingOptions, format: OutputFormat) -> Result<()> {
    if !(0.0..0.5).contains(&options.contamination) {
        bail!("contamination must be in [0, 0.5), got {}", options.contamination);
    }

    let records = read_dataset(&config.dataset_path)
        .with_context(|| format!("reading dataset {}", config.dataset_path.display()))?;
    let results = match run_training(&records, &config.models_dir, options) {
        Ok(results) => results,
        Err(e) if e.is_shape_error() => bail!(
            "{} ({} records, window {}): generate more data or use a smaller --window",
            e,
            records.len(),
            options.window_size
        ),
        Err(e) => return Err(e.into()),
    };

    if format == OutputFormat::Json {
        return print_json(&results);
    }

    println!("Trained on {} rows (window {})", results.rows, results.window_size);
    for (param, r) in &results.parameters {
        println!(
            "  {:<12} accuracy {:.4}  anomalies {:>6}  with maintenance {:>6}",
            param.as_str(),
            r.accuracy,
            r.anomalies,
            r.maintenance
        );
    }
    for (param, reason) in &results.skipped {
        println!("  {:<12} skipped: {}", param.as_str(), reason);
    }
    match results.maintenance_accuracy {
        Some(acc) => println!("Maintenance accuracy: {:.4}", acc),
        None => println!("Maintenance model not trained"),
    }
    for (name, importance) in &results.top_features {
        println!("  {:<22} importance {:.4}", name, importance);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ParameterSummary {
    points: usize,
    labelled_anomalies: usize,
    threshold_anomalies: usize,
    seasonality: Option<usize>,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    records: usize,
    maintenance_labels: usize,
    energy: Option<EnergyMetrics>,
    parameters: BTreeMap<Parameter, ParameterSummary>,
}

fn inspect(
    config: &MonitorConfig,
    parameter: Option<&str>,
    threshold_std: f64,
    format: OutputFormat,
) -> Result<()> {
    let records = read_dataset(&config.dataset_path)
        .with_context(|| format!("reading dataset {}", config.dataset_path.display()))?;

    let params: Vec<Parameter> = match parameter {
        Some(name) => vec![name.parse()?],
        None => Parameter::ALL.to_vec(),
    };

    let parameters = params
        .into_iter()
        .map(|p| {
            let values = series(&records, p);
            let summary = ParameterSummary {
                points: values.len(),
                labelled_anomalies: anomaly_labels(&records, p).iter().filter(|l| **l).count(),
                threshold_anomalies: threshold_labels(&values, threshold_std)
                    .iter()
                    .filter(|l| **l)
                    .count(),
                seasonality: detect_seasonality(&values, 2..25),
            };
            (p, summary)
        })
        .collect();

    let report = InspectReport {
        records: records.len(),
        maintenance_labels: records.iter().filter(|r| r.maintenance_needed).count(),
        energy: energy_metrics(&series(&records, Parameter::Current), config.voltage),
        parameters,
    };

    if format == OutputFormat::Json {
        return print_json(&report);
    }

    println!("{} records, {} maintenance labels", report.records, report.maintenance_labels);
    if let Some(e) = &report.energy {
        println!(
            "Energy: total {:.2} kWh, peak {:.1} W, average {:.1} W",
            e.total_energy, e.peak_power, e.average_power
        );
    }
    for (param, s) in &report.parameters {
        println!(
            "  {:<12} labelled {:>6}  beyond {}σ {:>6}  season {}",
            param.as_str(),
            s.labelled_anomalies,
            threshold_std,
            s.threshold_anomalies,
            s.seasonality.map_or("-".to_string(), |p| p.to_string())
        );
    }
    Ok(())
}

async fn monitor(config: MonitorConfig, method: DetectionMethod, ticks: Option<u64>) -> Result<()> {
    let pipeline = MonitoringPipeline::load(&config.models_dir, &config).with_method(method);
    let log = AnomalyLog::from_config(&config);
    let monitor = LiveMonitor::new(config, pipeline, log);

    tokio::select! {
        _ = monitor.run(ticks) => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, stopping monitor");
        }
    }

    let state = monitor.state();
    let state = state.read();
    println!(
        "{} polls, {} anomalies logged, receiver: {}",
        state.ticks,
        state.logged_anomalies,
        state.receiver.summary()
    );
    if let Some(latest) = state.cache.latest(1).first() {
        println!("{} receiver records cached, latest: {}", state.cache.len(), latest);
    }
    Ok(())
}

fn status(config: &MonitorConfig, format: OutputFormat) -> Result<()> {
    let status = engine_status::collect(config);
    if format == OutputFormat::Json {
        return print_json(&status);
    }

    println!("{} v{}", crate::constants::APP_NAME, status.app_version);
    println!(
        "Features: v{} layout {:08x} ({} per parameter, {} stacked), window {}",
        status.feature_version,
        status.layout_hash,
        status.feature_count,
        status.maintenance_feature_count,
        status.window_size
    );
    println!(
        "Models ({}): detectors [{}], sequence [{}], maintenance {}",
        status.model.models_dir,
        status.model.detectors.join(", "),
        status.model.sequence_models.join(", "),
        if status.model.maintenance_loaded { "loaded" } else { "missing" }
    );
    println!(
        "Dataset ({}): {} records, {:.2} MB",
        status.dataset.path, status.dataset.total_records, status.dataset.size_mb
    );
    println!(
        "Anomaly log ({}): {:?}, {} entries, recent activity: {}",
        status.anomaly_log.path,
        status.anomaly_log.state,
        status.anomaly_log.total_anomalies,
        status.anomaly_log.recent_activity
    );
    Ok(())
}

fn anomaly_log(config: &MonitorConfig, cmd: LogCommands, format: OutputFormat) -> Result<()> {
    let log = AnomalyLog::from_config(config);

    match cmd {
        LogCommands::Recent { limit } => {
            let entries = log.recent(limit);
            if format == OutputFormat::Json {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No anomalies logged");
            }
            for e in entries {
                println!(
                    "{}  {:<8} {:<12} {:.2} {}",
                    e.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    e.severity,
                    e.anomaly_type,
                    e.value,
                    e.unit
                );
            }
        }
        LogCommands::Stats => {
            let stats = log.stats();
            if format == OutputFormat::Json {
                return print_json(&stats);
            }
            println!("Total anomalies: {}", stats.total_anomalies);
            for (kind, count) in &stats.anomaly_types {
                println!("  {:<12} {}", kind, count);
            }
            for (severity, count) in &stats.severity_counts {
                println!("  {:<12} {}", severity, count);
            }
            println!(
                "Recent activity: {} ({} in the last 10 minutes)",
                stats.recent_activity, stats.recent_count
            );
        }
        LogCommands::Clear => {
            log.clear();
            println!("Anomaly log cleared");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_global_flags_override_config() {
        let cli = Cli::parse_from([
            "enmos",
            "--models-dir",
            "/tmp/enmos-models",
            "--dataset",
            "/tmp/enmos.jsonl",
            "log",
            "recent",
            "--limit",
            "5",
        ]);
        let config = build_config(&cli);
        assert_eq!(config.models_dir, std::path::PathBuf::from("/tmp/enmos-models"));
        assert_eq!(config.dataset_path, std::path::PathBuf::from("/tmp/enmos.jsonl"));
        assert!(matches!(cli.command, Commands::Log(LogCommands::Recent { limit: 5 })));
    }

    #[test]
    fn test_spike_argument_parsing() {
        let cli = Cli::parse_from([
            "enmos",
            "generate",
            "--days",
            "1",
            "--spike",
            "80:temperature:95.5",
        ]);
        let Commands::Generate { spikes, .. } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(
            spikes,
            vec![SpikeArg {
                index: 80,
                parameter: Parameter::Temperature,
                value: 95.5,
            }]
        );

        assert!("80:temperature".parse::<SpikeArg>().is_err());
        assert!("x:temperature:1".parse::<SpikeArg>().is_err());
        assert!("1:pressure_x:1".parse::<SpikeArg>().is_err());
        assert!("1:power:inf".parse::<SpikeArg>().is_err());
    }

    #[test]
    fn test_train_rejects_bad_contamination() {
        let config = MonitorConfig::default();
        let options = TrainingOptions {
            contamination: 0.5,
            ..Default::default()
        };
        assert!(train(&config, &options, OutputFormat::Text).is_err());
    }

    #[test]
    fn test_generate_then_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig {
            dataset_path: dir.path().join("combined.jsonl"),
            ..Default::default()
        };
        let gen_config = GeneratorConfig {
            points: 200,
            ..Default::default()
        };
        let csv = dir.path().join("combined.csv");

        let spikes = [SpikeArg {
            index: 150,
            parameter: Parameter::Humidity,
            value: 99.0,
        }];

        generate(&config, gen_config, &spikes, Some(&csv)).unwrap();
        let records = read_dataset(&config.dataset_path).unwrap();
        assert_eq!(records[150].humidity, 99.0);
        assert!(records[150].is_anomaly_humidity);
        assert!(config.dataset_path.exists());
        assert!(csv.exists());
        inspect(&config, Some("humidity"), 3.0, OutputFormat::Json).unwrap();
        assert!(inspect(&config, Some("pressure_x"), 3.0, OutputFormat::Text).is_err());
    }
}

//! ZestRack CLI - inspect installed LV2 plugins and try them at a channel
//! count.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use zestrack::audio::{AudioFrame, BlockContext, HeapPool};
use zestrack::lv2::{self, Lv2Backend};
use zestrack::plugin::InstanceManager;
use zestrack::properties::StaticParameters;
use zestrack::service::{ServiceFactory, ServiceKind};

#[derive(Parser)]
#[command(name = "zestrack")]
#[command(author, version, about = "LV2 plugins at any channel count", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List installed plugins
    List {
        /// Only plugins that can cover this many channels, with the copies
        /// each needs
        #[arg(short, long)]
        channels: Option<usize>,
    },

    /// Print the parameter metadata of a unit as JSON
    Metadata {
        /// Unit identifier, e.g. `lv2.http<//plugin.uri` or `lv2`
        id: String,

        #[arg(short, long, value_enum, default_value_t = Kind::Filter)]
        kind: Kind,
    },

    /// Run one block of an impulse through a unit and print what came out
    Probe {
        /// Unit identifier
        id: String,

        #[arg(short, long, value_enum, default_value_t = Kind::Filter)]
        kind: Kind,

        /// Rack preset for the generic unit
        #[arg(long)]
        preset: Option<String>,

        #[arg(short, long, default_value_t = 2)]
        channels: usize,

        #[arg(short, long, default_value_t = 1024)]
        samples: usize,

        #[arg(short = 'r', long, default_value_t = 48000.0)]
        sample_rate: f64,

        /// Parameter values as key=value (port index or `wetness`)
        #[arg(long = "set", value_parser = parse_key_value)]
        params: Vec<(String, f64)>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Filter,
    Producer,
}

impl From<Kind> for ServiceKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Filter => ServiceKind::Filter,
            Kind::Producer => ServiceKind::Producer,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, f64), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
    let value = value
        .parse::<f64>()
        .map_err(|e| format!("bad value for `{}`: {}", key, e))?;
    Ok((key.to_string(), value))
}

fn factory() -> ServiceFactory {
    let registry = Arc::new(lv2::discover());
    let instances = Arc::new(InstanceManager::new(Arc::new(Lv2Backend::new())));
    ServiceFactory::new(registry, instances)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let factory = factory();

    match cli.command {
        Commands::List { channels } => {
            let registry = factory.registry();
            match channels {
                Some(n) => {
                    for (desc, copies) in registry.compatible(n) {
                        println!("{:<60} {} x{}", desc.uri, desc.name, copies);
                    }
                }
                None => {
                    for desc in registry.plugins() {
                        println!(
                            "{:<60} {} ({} ch{})",
                            desc.uri,
                            desc.name,
                            desc.channels,
                            if desc.is_producer() { ", producer" } else { "" }
                        );
                    }
                }
            }
            ExitCode::SUCCESS
        }

        Commands::Metadata { id, kind } => match factory.metadata(kind.into(), &id) {
            Some(meta) => match serde_json::to_string_pretty(&meta) {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    log::error!("Failed to encode metadata: {}", e);
                    ExitCode::FAILURE
                }
            },
            None => {
                log::error!("Unknown unit: {}", id);
                ExitCode::FAILURE
            }
        },

        Commands::Probe {
            id,
            kind,
            preset,
            channels,
            samples,
            sample_rate,
            params,
        } => {
            let mut slot = match factory.create(kind.into(), &id, preset.as_deref()) {
                Ok(slot) => slot,
                Err(e) => {
                    log::error!("{}", e);
                    return ExitCode::FAILURE;
                }
            };

            let mut parameters = StaticParameters::new();
            for (key, value) in params {
                parameters.set(key, value);
            }

            let ctx = BlockContext {
                position: 0,
                length: samples as i64,
            };
            let result = match kind {
                Kind::Producer => {
                    slot.render(channels, samples, sample_rate, ctx, &parameters, &HeapPool)
                }
                Kind::Filter => {
                    let mut frame = AudioFrame::new(channels, samples);
                    for c in 0..channels {
                        if let Some(plane) = frame.channel_mut(c)
                            && let Some(first) = plane.first_mut()
                        {
                            *first = 1.0;
                        }
                    }
                    slot.process(&mut frame, sample_rate, ctx, &parameters, &HeapPool)
                        .map(|()| frame)
                }
            };

            let frame = match result {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("{}", e);
                    return ExitCode::FAILURE;
                }
            };

            println!("phase: {:?}", slot.phase());
            for c in 0..frame.channels() {
                let peak = frame
                    .channel(c)
                    .map(|plane| plane.iter().fold(0.0f32, |m, s| m.max(s.abs())))
                    .unwrap_or(0.0);
                println!("channel {}: peak {:.6}", c, peak);
            }
            let mut status: Vec<_> = slot.status().snapshot().into_iter().collect();
            status.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in status {
                println!("{} = {}", key, value);
            }
            ExitCode::SUCCESS
        }
    }
}

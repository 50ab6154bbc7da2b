use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use colored::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use scangym::{
    run_episode,
    runner::StepRecord,
    EnvConfig, EpisodeOutcome, FailureKind, NmapScanner, ReplayScanner, ScanAction,
    ScanEnvironment, Scanner,
};

fn build_cli() -> Command {
    Command::new("scangym")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run random-agent episodes against an nmap-backed scan environment")
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("Host to scan (defaults to the configured target)")
                .index(1),
        )
        .arg(
            Arg::new("episodes")
                .short('e')
                .long("episodes")
                .value_name("N")
                .help("Number of episodes to run")
                .default_value("5")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("max-steps")
                .long("max-steps")
                .value_name("N")
                .help("Stop an episode after this many steps")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("max-ports")
                .long("max-ports")
                .value_name("N")
                .help("Port slots per observation")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed for action sampling")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file (default: ~/.scangym.toml)"),
        )
        .arg(
            Arg::new("replay")
                .long("replay")
                .value_name("XML")
                .help("Replay saved `nmap -oX` reports instead of running nmap")
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print one JSON object per step")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
}

fn load_config(matches: &clap::ArgMatches) -> anyhow::Result<EnvConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => EnvConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => EnvConfig::load_default_config(),
    };

    if let Some(target) = matches.get_one::<String>("target") {
        config.target = target.clone();
    }
    if let Some(max_ports) = matches.get_one::<usize>("max-ports") {
        config.max_ports = *max_ports;
    }
    if let Some(max_steps) = matches.get_one::<usize>("max-steps") {
        config.max_episode_steps = Some(*max_steps);
    }

    config.validate()?;
    Ok(config)
}

fn print_step(episode: usize, record: &StepRecord<'_>) {
    let result = record.result;
    println!(
        "Episode: {}, Step: {}, Action: {}, Reward: {}",
        episode.to_string().bright_cyan(),
        record.step,
        record.action.to_string().bright_yellow(),
        result.reward.to_string().bright_green()
    );
    if let Some(failure) = &result.info.failure {
        let label = match result.info.failure_kind {
            Some(FailureKind::Process) => "[!] nmap failed:",
            _ => "[!] Scan failed:",
        };
        println!("  {} {}", label.bright_red(), failure);
    }
}

fn print_json_step(episode: usize, record: &StepRecord<'_>) {
    let line = json!({
        "episode": episode,
        "step": record.step,
        "action": record.action,
        "arguments": ScanAction::from_index(record.action).arguments(),
        "reward": record.result.reward,
        "done": record.result.done,
        "observation": record.result.observation,
        "info": record.result.info,
    });
    println!("{}", line);
}

fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(&matches)?;

    let scanner: Box<dyn Scanner> = match matches.get_many::<String>("replay") {
        Some(paths) => {
            let paths: Vec<&String> = paths.collect();
            Box::new(
                ReplayScanner::from_xml_files(&paths)
                    .context("Failed to load replay reports")?
                    .cycling(),
            )
        }
        None => Box::new(NmapScanner::new(config.nmap.clone())),
    };

    let episodes = matches.get_one::<usize>("episodes").copied().unwrap_or(5);
    let json_output = matches.get_flag("json");
    let mut rng = match matches.get_one::<u64>("seed") {
        Some(seed) => StdRng::seed_from_u64(*seed),
        None => StdRng::from_entropy(),
    };

    let max_steps = config.max_episode_steps;
    let mut env = ScanEnvironment::with_config(config, scanner)?;

    if !json_output {
        println!(
            "{} {} {}",
            "[~] Scanning".bright_blue(),
            env.target().bright_cyan().bold(),
            format!("via {}", env.scanner().name()).bright_blue()
        );
        println!();
    }

    for episode in 1..=episodes {
        let summary = run_episode(&mut env, &mut rng, max_steps, |record| {
            if json_output {
                print_json_step(episode, record);
            } else {
                print_step(episode, record);
            }
        });

        if json_output {
            continue;
        }

        match summary.outcome {
            EpisodeOutcome::Terminated => println!(
                "{}\n",
                format!("Episode {} finished after {} steps.", episode, summary.steps).bright_green()
            ),
            EpisodeOutcome::ScanFailed => println!(
                "{}\n",
                format!("Episode {} ended by a failed scan after {} steps.", episode, summary.steps)
                    .bright_red()
            ),
            EpisodeOutcome::StepLimit => println!(
                "{}\n",
                format!("Episode {} hit the step limit after {} steps.", episode, summary.steps)
                    .bright_yellow()
            ),
        }
        log::info!("Episode {} total reward {}", episode, summary.total_reward);
    }

    Ok(())
}

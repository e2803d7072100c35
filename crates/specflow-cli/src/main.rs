//! specflow CLI
//!
//! The `specflow` command exposes the pure planning operations of
//! `specflow-core` for inspecting specs, rule sets and flow files.
//!
//! ## Commands
//!
//! - `route`: Show the sections a consumer would receive
//! - `pack`: Pack a rule set into a consumer's budget
//! - `chunk`: Split a rule set into sequential chunks
//! - `summarize`: Condensed per-category summary of a rule set
//! - `plan`: Validate a flow file and show its execution plan

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, Level};

use specflow_core::{
    chunk_rules, summarize_rules, FlowConfig, Planner, RuleContextManager, RuleSet, SectionId,
    SectionRouter, Specification,
};

#[derive(Parser)]
#[command(name = "specflow")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Section routing, rule packing and flow planning for spec-driven agents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Output format for command results
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the sections routed to a consumer
    Route {
        /// Specification file (JSON or TOML)
        #[arg(short, long)]
        spec: PathBuf,

        /// Consumer (agent) identity
        #[arg(short, long)]
        consumer: String,

        /// Drop optional sections to fit this size budget
        #[arg(short, long)]
        budget: Option<usize>,

        /// Flow file whose section policies extend the standard table
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Pack rules into a consumer's budget
    Pack {
        /// Rule file (JSON or TOML)
        #[arg(short, long)]
        rules: PathBuf,

        /// Consumer (agent) identity
        #[arg(short, long)]
        consumer: String,

        /// Target sections; defaults to the consumer's routed sections when
        /// --spec is given, otherwise every section
        #[arg(long, value_delimiter = ',')]
        sections: Vec<SectionId>,

        /// Specification used to derive target sections
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Rule budget in estimated tokens
        #[arg(short, long, default_value_t = specflow_core::rules::DEFAULT_RULE_BUDGET)]
        budget: usize,
    },

    /// Split rules into sequential chunks
    Chunk {
        /// Rule file (JSON or TOML)
        #[arg(short, long)]
        rules: PathBuf,

        /// Maximum chunk size in estimated tokens
        #[arg(short = 'n', long, default_value = "1000")]
        size: usize,
    },

    /// Condensed summary of a rule set
    Summarize {
        /// Rule file (JSON or TOML)
        #[arg(short, long)]
        rules: PathBuf,
    },

    /// Validate a flow and print its execution plan
    Plan {
        /// Specification file (JSON or TOML)
        #[arg(short, long)]
        spec: PathBuf,

        /// Flow file (TOML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Rule file to pack for every agent
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    specflow_core::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Route {
            spec,
            consumer,
            budget,
            config,
        } => cmd_route(&spec, &consumer, budget, config.as_deref(), cli.output),
        Commands::Pack {
            rules,
            consumer,
            sections,
            spec,
            budget,
        } => cmd_pack(&rules, &consumer, sections, spec.as_deref(), budget, cli.output),
        Commands::Chunk { rules, size } => cmd_chunk(&rules, size, cli.output),
        Commands::Summarize { rules } => cmd_summarize(&rules, cli.output),
        Commands::Plan {
            spec,
            config,
            rules,
        } => cmd_plan(&spec, &config, rules.as_deref(), cli.output),
    }
}

fn load_spec(path: &Path) -> Result<Arc<Specification>> {
    let spec = Specification::load(path)
        .with_context(|| format!("Failed to load specification {}", path.display()))?;
    debug!(spec_id = %spec.info().id, sections = spec.len(), "specification loaded");
    Ok(Arc::new(spec))
}

fn load_rules(path: &Path) -> Result<RuleSet> {
    let rules = RuleSet::load(path)
        .with_context(|| format!("Failed to load rules {}", path.display()))?;
    debug!(rules = rules.len(), "rules loaded");
    Ok(rules)
}

fn load_config(path: &Path) -> Result<FlowConfig> {
    FlowConfig::load(path).with_context(|| format!("Failed to load flow file {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_route(
    spec_path: &Path,
    consumer: &str,
    budget: Option<usize>,
    config: Option<&Path>,
    output: OutputFormat,
) -> Result<()> {
    let spec = load_spec(spec_path)?;
    let router = match config {
        Some(path) => load_config(path)?.router(),
        None => SectionRouter::default(),
    };

    let routed = match budget {
        Some(budget) => router.route_within(&spec, consumer, budget),
        None => router.route(&spec, consumer),
    }
    .with_context(|| format!("Failed to route specification for {consumer}"))?;

    match output {
        OutputFormat::Json => print_json(&routed.describe()),
        OutputFormat::Text => {
            println!("{}", routed.to_prompt_context());
            if !routed.omitted().is_empty() {
                let omitted: Vec<&str> = routed.omitted().iter().map(SectionId::as_str).collect();
                println!("(omitted for budget: {})", omitted.join(", "));
            }
            Ok(())
        }
    }
}

fn cmd_pack(
    rules_path: &Path,
    consumer: &str,
    sections: Vec<SectionId>,
    spec_path: Option<&Path>,
    budget: usize,
    output: OutputFormat,
) -> Result<()> {
    let rules = load_rules(rules_path)?;

    let targets = match spec_path {
        Some(_) if !sections.is_empty() => bail!("use either --sections or --spec, not both"),
        Some(path) => {
            let spec = load_spec(path)?;
            SectionRouter::default()
                .route(&spec, consumer)
                .with_context(|| format!("Failed to route specification for {consumer}"))?
                .section_ids()
                .to_vec()
        }
        None => sections,
    };

    let pack = RuleContextManager::default().pack_rules(rules.as_slice(), &targets, consumer, budget);

    match output {
        OutputFormat::Json => print_json(&pack),
        OutputFormat::Text => {
            println!("{}", pack.to_prompt());
            println!();
            println!("{}", pack.summary);
            Ok(())
        }
    }
}

fn cmd_chunk(rules_path: &Path, size: usize, output: OutputFormat) -> Result<()> {
    if size == 0 {
        bail!("chunk size must be at least 1");
    }
    let rules = load_rules(rules_path)?;
    let chunks = chunk_rules(rules.as_slice(), size);

    let ids: Vec<Vec<&str>> = chunks
        .iter()
        .map(|chunk| chunk.iter().map(|r| r.id.as_str()).collect())
        .collect();

    match output {
        OutputFormat::Json => print_json(&ids),
        OutputFormat::Text => {
            for (i, (chunk, ids)) in chunks.iter().zip(&ids).enumerate() {
                let total: usize = chunk.iter().map(|r| r.size()).sum();
                println!("chunk {} ({} rules, size {}): {}", i + 1, chunk.len(), total, ids.join(", "));
            }
            Ok(())
        }
    }
}

fn cmd_summarize(rules_path: &Path, output: OutputFormat) -> Result<()> {
    let rules = load_rules(rules_path)?;
    let summary = summarize_rules(rules.as_slice());
    match output {
        OutputFormat::Json => print_json(&serde_json::json!({ "summary": summary })),
        OutputFormat::Text => {
            println!("{summary}");
            Ok(())
        }
    }
}

fn cmd_plan(
    spec_path: &Path,
    config_path: &Path,
    rules_path: Option<&Path>,
    output: OutputFormat,
) -> Result<()> {
    let spec = load_spec(spec_path)?;
    let config = load_config(config_path)?;
    let rules = match rules_path {
        Some(path) => load_rules(path)?.into_vec(),
        None => Vec::new(),
    };

    let specs = config.agent_specs();
    if specs.is_empty() {
        bail!("flow file defines no agents (set `template` or add [[agents]])");
    }

    let router = config.router();
    let manager = RuleContextManager::new(config.rule_budget);
    let plan = Planner {
        spec: &spec,
        router: &router,
        manager: &manager,
        rules: &rules,
        rule_budget: config.rule_budget,
        section_budget: config.section_budget,
    }
    .plan(&specs)
    .context("Invalid flow")?;

    match output {
        OutputFormat::Json => print_json(&plan.describe()),
        OutputFormat::Text => {
            println!("strategy: {}", config.strategy.as_str());
            for (i, level) in plan.levels().iter().enumerate() {
                println!("wave {}: {}", i + 1, level.join(", "));
            }
            println!();
            for agent in plan.describe().agents {
                println!(
                    "{} (priority {}): {} sections, {} rules ({} excluded)",
                    agent.name,
                    agent.priority,
                    agent.sections.len(),
                    agent.rules_included.len(),
                    agent.rules_excluded.len()
                );
            }
            Ok(())
        }
    }
}

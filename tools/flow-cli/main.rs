use clap::{Parser, Subcommand, ValueEnum};
use sigilflow::error::HostError;
use sigilflow::prelude::*;
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// An effect library that accepts every effect and prints what it would do.
struct ConsoleEffects;

impl EffectLibrary for ConsoleEffects {
    fn execute(
        &self,
        effect: &str,
        params: &EffectParams,
        _ctx: &mut FlowContext,
    ) -> std::result::Result<bool, HostError> {
        let rendered: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        println!("  -> {} {}", effect, rendered.join(" "));
        Ok(true)
    }

    fn has_effect(&self, _effect: &str) -> bool {
        true
    }
}

struct ConsoleActor;

impl Actor for ConsoleActor {
    fn name(&self) -> &str {
        "console"
    }

    fn send_diagnostic(&self, message: &str) {
        eprintln!("  !! {}", message);
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Warn,
    Info,
    Debug,
    Trace,
}

/// Validate, run and convert ability flow templates
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level for engine diagnostics
    #[arg(short, long, value_enum, default_value = "warn")]
    log: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every validation defect of a template
    Validate {
        /// Path to the template JSON file
        path: String,
    },
    /// Run one flow of a template
    Run {
        /// Path to the template JSON file
        path: String,
        /// Tier to run at
        #[arg(short, long, default_value_t = 1)]
        tier: i32,
        /// Signal to fire; the ability flow runs when omitted
        #[arg(long)]
        trigger: Option<String>,
        /// Ticks to advance the scheduler after the synchronous part
        #[arg(long, default_value_t = 200)]
        ticks: u64,
        /// Run delays instantly and print the traversal trace
        #[arg(long)]
        test_mode: bool,
    },
    /// Re-emit a template in the current schema
    Dump {
        /// Path to the template JSON file
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let level = match cli.log {
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Command::Validate { path } => run_validate(&path),
        Command::Run {
            path,
            tier,
            trigger,
            ticks,
            test_mode,
        } => run_flow(&path, tier, trigger.as_deref(), ticks, test_mode),
        Command::Dump { path } => run_dump(&path),
    }
}

fn load_template(path: &str) -> AbilityTemplate {
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read template file '{}': {}", path, e)));
    let default_id = std::path::Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("template");
    FlowSerializer::template_from_json(&json, default_id)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load template: {}", e)))
}

fn new_executor() -> (FlowExecutor, Arc<TickQueue>) {
    let queue = Arc::new(TickQueue::new());
    let executor = FlowExecutor::new(Arc::new(ConsoleEffects), queue.clone());
    (executor, queue)
}

fn run_validate(path: &str) {
    let template = load_template(path);
    println!("Template '{}' ({} flow(s), max tier {})", template.id, template.flows.len(), template.max_tier);

    let errors = template.validate();
    if errors.is_empty() {
        for flow in template.flows() {
            println!("[{}] OK ({} nodes)", flow.id(), flow.graph.node_count());
        }
        return;
    }
    for error in &errors {
        println!("{}", error);
    }
    exit_with_error(&format!("{} defect(s) found", errors.len()));
}

fn run_flow(path: &str, tier: i32, trigger: Option<&str>, ticks: u64, test_mode: bool) {
    let template = load_template(path);
    let flow = match trigger {
        Some(trigger) => template.flows_for_trigger(trigger).into_iter().next(),
        None => template.ability_flow().or_else(|| template.flows().next()),
    }
    .unwrap_or_else(|| exit_with_error("No matching flow in template"));

    let (executor, queue) = new_executor();
    let mut metadata = template.metadata_for(tier);
    if let Some(trigger) = trigger {
        metadata = metadata.with_signal(trigger);
    }
    let mut ctx = FlowContext::new(metadata).with_actor(Arc::new(ConsoleActor));
    if test_mode {
        ctx = ctx.with_test_mode();
    }

    let activation = template.resolve_activation(flow, &ctx);
    println!(
        "Running flow '{}' at tier {} (chance {}%, cooldown {}s)",
        flow.id(),
        tier,
        activation.chance,
        activation.cooldown
    );
    if !flow.conditions_pass(executor.conditions(), &ctx) {
        println!("Flow conditions not met, nothing to do.");
        return;
    }

    let start = Instant::now();
    let Some(ctx) = executor.execute_with_context(&flow.graph, ctx) else {
        exit_with_error("Flow has no start node");
    };
    let ran = queue.advance(ticks);
    let duration = start.elapsed();

    println!("\n--- Result ---");
    println!("Completed:         {}", !ctx.is_cancelled());
    if let Some(error) = ctx.error() {
        println!("Error:             {}", error);
    }
    println!("Effects executed:  {}", ctx.effects_executed());
    println!("Skip cooldown:     {}", ctx.skip_cooldown());
    println!("Continuations run: {} ({} still pending)", ran, queue.pending());
    for (name, value) in ctx.variables() {
        println!("Variable {:<10} {}", name, value);
    }
    if test_mode {
        println!("\n--- Trace ---");
        println!("{}", TraceFormatter::format_trace(ctx.trace()));
    }
    println!("\nTotal Execution:   {:?}", duration);
}

fn run_dump(path: &str) {
    let template = load_template(path);
    let json = FlowSerializer::template_to_json_pretty(&template)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to write template: {}", e)));
    println!("{}", json);
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}

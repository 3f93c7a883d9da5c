//! Daggr CLI entry point - runs a small demonstration graph

use anyhow::Result;
use clap::{Parser, ValueEnum};
use daggr::{
    all, deferred, leaf, try_leaf, Absence, Config, ImmediateScheduler, JoinPolicy, Node,
    SchedulerKind, TokioScheduler,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Run a demonstration task graph on VALUE:
/// inc -> all(double, negate, trace, sqrt) -> format
#[derive(Debug, Parser)]
#[command(name = "daggr", version)]
struct Cli {
    /// Config file (default: daggr.yml, then the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scheduler for deferred leaves
    #[arg(long, value_enum)]
    scheduler: Option<SchedulerArg>,

    /// What the group does when a branch fails
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Input to the graph
    #[arg(allow_negative_numbers = true)]
    value: i64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchedulerArg {
    Immediate,
    Tokio,
}

impl From<SchedulerArg> for SchedulerKind {
    fn from(arg: SchedulerArg) -> Self {
        match arg {
            SchedulerArg::Immediate => SchedulerKind::Immediate,
            SchedulerArg::Tokio => SchedulerKind::Tokio,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    FailFast,
    WaitForAll,
}

impl From<PolicyArg> for JoinPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::FailFast => JoinPolicy::FailFast,
            PolicyArg::WaitForAll => JoinPolicy::WaitForAll,
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::auto_load()?,
    };
    if let Some(scheduler) = cli.scheduler {
        config.scheduler = scheduler.into();
    }
    if let Some(policy) = cli.policy {
        config.join_policy = policy.into();
    }
    Ok(config)
}

/// Turns a checked arithmetic result into a failure the group can report
fn no_overflow(step: &'static str) -> impl Fn(Option<i64>) -> Result<i64, String> + Copy {
    move |value| value.ok_or_else(|| format!("{} overflows i64", step))
}

fn isqrt(n: i64) -> Result<i64, String> {
    if n < 0 {
        return Err(format!("cannot take the square root of {}", n));
    }
    Ok((n as f64).sqrt() as i64)
}

fn main() -> Result<ExitCode> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    log::info!(
        "daggr v{} using {} scheduler, {:?}",
        env!("CARGO_PKG_VERSION"),
        config.scheduler,
        config.join_policy
    );

    let graph = leaf(|x: i64| x.checked_add(1))
        .then(try_leaf(no_overflow("inc")))
        .then(
            all((
                deferred(|x: i64| x.checked_mul(2)).then(try_leaf(no_overflow("double"))),
                deferred(|x: i64| x.checked_neg()).then(try_leaf(no_overflow("negate"))),
                |x: i64| {
                    log::info!("Group input: {}", x);
                    Absence
                },
                try_leaf(isqrt),
            ))
            .with_policy(config.join_policy),
        )
        .then(|(double, negated, root): (i64, i64, i64)| {
            format!("{} {} {}", double, negated, root)
        });

    let outcome = match config.scheduler {
        SchedulerKind::Immediate => {
            daggr::call_blocking(&graph, &ImmediateScheduler::handle(), cli.value)
        }
        SchedulerKind::Tokio => {
            let threads = config.blocking_threads_for(graph.async_requirement_count());
            let runtime = TokioScheduler::build_runtime(threads)?;
            let scheduler = TokioScheduler::new(runtime.handle().clone()).into_handle();
            runtime.block_on(daggr::call_async(&graph, &scheduler, cli.value))
        }
    };

    match outcome {
        Ok(line) => {
            println!("{}", line);
            Ok(ExitCode::SUCCESS)
        }
        Err(reason) => {
            eprintln!("error: {}", reason);
            Ok(ExitCode::FAILURE)
        }
    }
}

//! Deferred CLI
//!
//! Runs small promise scenarios on an in-process event loop and prints how
//! they settled.

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use deferred::{Error, EventLoopConfig, Function, Promise, Runtime, Value, VERSION};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deferred")]
#[command(author, version, about = "Promises/A+ deferred values on an in-process event loop", long_about = None)]
struct Cli {
    /// Scenario to run
    #[arg(value_enum)]
    scenario: Scenario,

    /// JSON event loop configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print event loop statistics after the run
    #[arg(short, long)]
    stats: bool,

    /// Verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Scenario {
    /// Chain two handlers onto a resolved promise
    Chain,
    /// Resolve a promise with a promise nested three deep
    Flatten,
    /// Aggregate timers settling out of order
    All,
    /// Race a never-settling promise against a timer
    Race,
    /// Attach a cleanup callback to a rejection
    Finally,
    /// Recover from an initializer failure
    Reject,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => EventLoopConfig::load_file(path)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => EventLoopConfig::default(),
    };

    let runtime = Runtime::with_config(config);
    let promise = build_scenario(&runtime, cli.scenario);

    match runtime.block_on(&promise) {
        Ok(value) => println!("fulfilled: {:?}", value),
        Err(Error::Thrown(reason)) => println!("rejected: {:?}", reason),
        Err(e) => return Err(anyhow!("{}", e)),
    }

    for (id, reason) in runtime.event_loop().drain_unhandled_rejections() {
        eprintln!("unhandled rejection in promise {}: {}", id, reason);
    }

    if cli.stats {
        let stats = runtime.event_loop().stats();
        println!("deferred {}", VERSION);
        println!("  promises created:  {}", stats.total_promises_created);
        println!("  promises settled:  {}", stats.total_promises_settled);
        println!("  microtasks:        {}", stats.total_microtasks);
        println!("  macrotasks:        {}", stats.total_macrotasks);
        println!("  ticks:             {}", stats.total_ticks);
        println!("  virtual time (ms): {}", runtime.event_loop().current_time());
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise the level follows `-v`
fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn add(amount: f64) -> Option<Function> {
    Some(Function::unary("add", move |v| {
        Ok(Value::from(v.as_number().unwrap_or_default() + amount))
    }))
}

/// Promise settled by a timer
fn after(runtime: &Runtime, value: impl Into<Value>, delay: u64) -> Value {
    let (promise, resolver, _) = Promise::with_resolvers(runtime.scheduler());
    let value = value.into();
    runtime
        .event_loop()
        .set_timeout(move || resolver.resolve(value), delay);
    promise.into()
}

fn build_scenario(runtime: &Runtime, scenario: Scenario) -> Promise {
    match scenario {
        Scenario::Chain => runtime.resolve_with(1).then(add(1.0), None).then(add(40.0), None),
        Scenario::Flatten => {
            let innermost = runtime.resolve_with("flattened");
            let middle = runtime.promise(|resolve, _| {
                resolve.resolve(innermost);
                Ok(())
            });
            runtime.promise(|resolve, _| {
                resolve.resolve(middle);
                Ok(())
            })
        }
        Scenario::All => runtime.all(vec![
            after(runtime, "slow", 30),
            after(runtime, "fast", 10),
            Value::from("plain"),
        ]),
        Scenario::Race => {
            let (never, _, _) = Promise::with_resolvers(runtime.scheduler());
            runtime.race(vec![never.into(), after(runtime, "timer", 25)])
        }
        Scenario::Finally => {
            let counter = Rc::new(Cell::new(0));
            let cleanup = Function::new("cleanup", move |_| {
                counter.set(counter.get() + 1);
                tracing::info!(runs = counter.get(), "cleanup ran");
                Ok(Value::Undefined)
            });
            runtime.reject_with("disk full").finally(Some(cleanup))
        }
        Scenario::Reject => {
            let recover = Function::unary("recover", |reason| {
                Ok(Value::from(format!("recovered from {}", reason)))
            });
            runtime
                .promise(|_, _| Err(Error::type_error("initializer failed")))
                .catch(Some(recover))
        }
    }
}

//! Counter example binary
//!
//! Demonstrates the Async Action architecture with a counter and a log.

use async_action_runtime::{Store, metrics::MetricsExporter};
use counter::{CounterAction, CounterReducer, CounterState};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counter=debug,async_action_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut exporter = MetricsExporter::new();
    exporter.install()?;

    println!("=== Counter Example: Async Action Architecture ===\n");

    let store = Store::new(CounterState::default(), CounterReducer::new());

    let _counter = store.subscribe_to(|s| s.counter, |counter| println!("  [counter] {counter}"));
    let _plain_log = store.subscribe_to(|s| s.log.value().clone(), |log| println!("  [log] {log:?}"));
    let _passthrough_log = store.subscribe_passthrough(|s| &s.log, |log| println!("  [log write] {log:?}"));

    for action in [
        CounterAction::ResetState,
        CounterAction::ResetState,
        CounterAction::LogCount,
        CounterAction::LogCount,
        CounterAction::Increase,
        CounterAction::Increase,
    ] {
        println!("\n>>> Sending: {action:?}");
        store.send(action).await?;
    }

    println!("\n>>> Sending: IncreaseLater(50ms)");
    store.send(CounterAction::IncreaseLater(Duration::from_millis(50))).await?;
    println!("Counter right after dispatch: {}", store.state(|s| s.counter));
    store.settle(Duration::from_secs(1)).await?;
    println!("Counter after settling: {}", store.state(|s| s.counter));

    println!("\n=== Architecture Demonstration Complete ===");
    println!("\nKey concepts demonstrated:");
    println!("  • Reducer: reduce (state, action) → effect on the mutation context");
    println!("  • Async handler: run (async action) → effect, off the mutation context");
    println!("  • Effects: none, send (chain now), run (hand off)");
    println!("  • Passthrough: every log write is delivered, even repeated ones");

    if let Some(rendered) = exporter.render() {
        println!("\n=== Metrics ===\n{rendered}");
    }

    Ok(())
}

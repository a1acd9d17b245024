use anyhow::Context;
use std::io::Write;
use tally::{
    CounterStore, JsonFileCounterStore, KeyedSequenceAllocator, LockSequenceAllocator,
    SequenceAllocator, SequenceScope,
};

use crate::cli::config::{AllocatorKind, CliConfig, Command};

#[derive(Debug, Clone, Copy)]
enum Operation {
    Allocate,
    Revert,
    Current,
}

/// Runs the configured command against the counter file, writing results to
/// `out`.
pub fn run(config: CliConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let store = JsonFileCounterStore::open(&config.store_path).with_context(|| {
        format!(
            "failed to open counter store at {}",
            config.store_path.display()
        )
    })?;

    #[cfg(debug_assertions)]
    tracing::debug!(
        "Opened {} with full config: {:#?}",
        store.path().display(),
        config
    );

    let (operation, scope) = match &config.command {
        Command::List => {
            for counter in store.counters().context("failed to list counters")? {
                writeln!(out, "{} {}", counter.scope, counter.current_value)?;
            }
            return Ok(());
        }
        Command::Allocate(args) => (Operation::Allocate, SequenceScope::from(args)),
        Command::Revert(args) => (Operation::Revert, SequenceScope::from(args)),
        Command::Current(args) => (Operation::Current, SequenceScope::from(args)),
    };

    match config.allocator {
        AllocatorKind::Global => execute(
            &LockSequenceAllocator::with_floor(store, config.revert_floor),
            operation,
            &scope,
            out,
        ),
        AllocatorKind::Keyed => execute(
            &KeyedSequenceAllocator::with_floor(store, config.revert_floor),
            operation,
            &scope,
            out,
        ),
    }
}

fn execute(
    allocator: &impl SequenceAllocator,
    operation: Operation,
    scope: &SequenceScope,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match operation {
        Operation::Allocate => {
            let value = allocator
                .allocate(scope)
                .with_context(|| format!("failed to allocate for {scope}"))?;
            tracing::info!(%scope, value, "allocated");
            writeln!(out, "{value}")?;
        }
        Operation::Revert => {
            allocator
                .revert(scope)
                .with_context(|| format!("failed to revert {scope}"))?;
            tracing::info!(%scope, "reverted");
        }
        Operation::Current => {
            let current = allocator
                .current(scope)
                .with_context(|| format!("failed to read {scope}"))?;
            match current {
                Some(value) => writeln!(out, "{value}")?,
                None => writeln!(out, "none")?,
            }
        }
    }
    Ok(())
}

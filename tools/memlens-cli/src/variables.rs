//! Variables command - list what a snapshot captures

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use memlens_core::MemoryIntrospection;

use crate::show::load_snapshot;

#[derive(Args)]
pub struct VariablesArgs {
    /// Snapshot document (JSON)
    pub snapshot: PathBuf,
}

pub fn execute(args: VariablesArgs) -> Result<()> {
    let snapshot = load_snapshot(&args.snapshot)?;

    let mut rows: Vec<(String, String)> = snapshot
        .variables()
        .map(|(name, value)| {
            let type_name = snapshot
                .type_name(value.ty)
                .unwrap_or_else(|_| "?".to_string());
            (name.to_string(), type_name)
        })
        .collect();
    rows.sort();

    for (name, type_name) in rows {
        println!("{}: {}", name, type_name);
    }
    Ok(())
}

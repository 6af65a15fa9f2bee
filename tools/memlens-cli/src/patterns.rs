//! Patterns command - print the default formatter bindings

use anyhow::Result;

use memlens_core::FormatterRegistry;

pub fn execute() -> Result<()> {
    let registry = FormatterRegistry::with_defaults();
    let width = registry
        .bindings()
        .iter()
        .map(|binding| binding.pattern.to_string().len())
        .max()
        .unwrap_or(0);

    for binding in registry.bindings() {
        println!(
            "{:<width$}  {}",
            binding.pattern.to_string(),
            binding.kind.name(),
            width = width
        );
    }
    Ok(())
}

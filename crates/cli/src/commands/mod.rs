//! CLI command implementations.

pub mod geocode;
pub mod migrate;
pub mod order;
pub mod products;

use serde::Serialize;

use foodcart_dispatch::error::Result;

/// Print `value` to stdout as pretty JSON.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{output}");
    }
    Ok(())
}

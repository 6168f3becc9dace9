use super::{json_pretty, load_config, EXIT_SUCCESS};
use std::path::Path;

/// Print the merged configuration. Always JSON: it is the document format.
pub fn run(config_path: Option<&Path>) -> Result<u8, String> {
    let config = load_config(config_path)?;
    println!("{}", json_pretty(&config.redacted())?);
    Ok(EXIT_SUCCESS)
}

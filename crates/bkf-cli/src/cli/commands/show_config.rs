//! Config command: show where settings come from and what they are.

use anyhow::Result;
use bkf_core::config::BkfConfig;
use std::path::Path;

pub fn run_show_config(path: &Path, cfg: &BkfConfig) -> Result<()> {
    println!("# {}", path.display());
    print!("{}", cfg.to_toml_string()?);
    Ok(())
}

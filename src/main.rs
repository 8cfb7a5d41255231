use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = ink_smoke::config::Config::parse();
    if let Some(path) = cfg.log_file.as_deref() {
        ink_smoke::logging::init_file(path)?;
    }

    ink_smoke::app::run(cfg)
}

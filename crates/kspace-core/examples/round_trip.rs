//! Synthesize a scan, write it, inject it into a template and verify the reconstruction.
//!
//! ```text
//! cargo run -p kspace-core --example round_trip -- [config.yaml] [out.dat]
//! ```
//!
//! Without arguments the default configuration is used (two-circle phantom,
//! 192 × 96, 16 channels, 5 slices) and the scan is written to the system
//! temporary directory. `--print-config` dumps an example configuration.

use std::path::PathBuf;

use kspace_core::observe::init_logging;
use kspace_core::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--print-config") {
        print!("{}", PipelineConfig::example_yaml());
        return Ok(());
    }

    let mut config = match args.first() {
        Some(path) => PipelineConfig::load_from(PathBuf::from(path).as_path())?,
        None => PipelineConfig::load()?,
    };
    if config.output.path.is_none() {
        let out = args
            .get(1)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("kspace_round_trip.dat"));
        config.output.path = Some(out);
    }

    init_logging(&config.logging)?;

    let report = Pipeline::new(config)?.run()?;

    println!("shape:    {}", report.shape);
    if let Some(path) = &report.output {
        println!("file:     {}", path.display());
    }
    let labels: Vec<&str> = report.template_axes.iter().map(|a| a.label.as_str()).collect();
    println!("template: {}", labels.join(" x "));
    if let Some(fidelity) = &report.fidelity {
        for (s, (mse, ssim)) in fidelity
            .mse_per_slice
            .iter()
            .zip(&fidelity.ssim_per_slice)
            .enumerate()
        {
            println!("slice {}:  mse {:.3e}  ssim {:.6}", s, mse, ssim);
        }
        println!("mean:     mse {:.3e}  ssim {:.6}", fidelity.mse, fidelity.ssim);
    }
    println!("{}", if report.passed { "PASS" } else { "FAIL" });

    if !report.passed {
        std::process::exit(1);
    }
    Ok(())
}

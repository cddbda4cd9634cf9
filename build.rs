//! Copies `.env.example` into the local data directory
//! (`~/.local/share/untzine/` on Linux) so a template sits next to the
//! `.env` file the binary loads.

use std::{env, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("untzine");

    // Sandboxed builds may not be allowed to write there.
    if fs::create_dir_all(&out_dir).is_err() {
        println!(
            "cargo:warning=cannot create {}, skipping .env.example",
            out_dir.display()
        );
        return Ok(());
    }

    if env_example_path.is_file() {
        let contents = fs::read_to_string(&env_example_path)?;
        if fs::write(out_dir.join(".env.example"), contents).is_err() {
            println!("cargo:warning=cannot write .env.example to {}", out_dir.display());
        }
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
    }

    Ok(())
}

use std::fs;

use reclaim_core::config;

pub fn execute() {
    let Some(path) = config::config_path() else {
        eprintln!("error: could not determine the config directory");
        std::process::exit(1);
    };

    if path.exists() {
        println!("Config already exists at {}", path.display());
        return;
    }

    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            eprintln!("error: {}: {err}", parent.display());
            std::process::exit(1);
        }
    }

    if let Err(err) = fs::write(&path, config::default_toml()) {
        eprintln!("error: {}: {err}", path.display());
        std::process::exit(1);
    }
    println!("Created {}", path.display());
}

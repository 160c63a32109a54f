use std::path::PathBuf;

use reclaim_core::ConflictSession;
use reclaim_windows::RmService;

use super::render;

pub fn execute(files: &[PathBuf], json: bool) {
    let mut session = match ConflictSession::start(RmService::new()) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    for file in files {
        if let Err(err) = session.register_file(file) {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }

    let procs = match session.processes() {
        Ok(procs) => procs.to_vec(),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if json {
        println!("{}", render::to_json(&procs));
        return;
    }

    if procs.is_empty() {
        println!("No processes are locking the given files.");
        return;
    }

    println!("Processes locking the given files:");
    for proc in &procs {
        render::print_process(proc);
        // The facility keeps reporting processes briefly after they
        // exit on their own; flag those.
        if !reclaim_windows::process::still_running(proc.pid) {
            println!("  {:>7}  (already exited)", proc.pid);
        }
    }
}

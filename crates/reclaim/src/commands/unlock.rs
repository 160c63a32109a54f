use std::io::Write;
use std::path::PathBuf;

use reclaim_core::config::Config;
use reclaim_core::{ConflictSession, Error, ShutdownScope};
use reclaim_windows::RmService;

use super::render;

pub fn execute(files: &[PathBuf], config: &Config, all: bool, no_restart: bool) {
    let scope = if all {
        ShutdownScope::All
    } else {
        config.shutdown.scope()
    };

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

    let blockers = match session.processes() {
        Ok(procs) => procs.to_vec(),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if blockers.is_empty() {
        println!("Nothing is locking the given files.");
        return;
    }

    println!("Shutting down:");
    for proc in &blockers {
        render::print_process(proc);
    }

    let shutdown = session.shutdown(scope, print_progress);
    finish_progress_line();

    if let Err(err) = shutdown {
        eprintln!("error: {err}");
        // The fresh snapshot explains which processes refused and why.
        match session.processes() {
            Ok(procs) => {
                eprintln!("Still blocking:");
                for proc in procs {
                    render::print_process(proc);
                }
            }
            Err(err) => eprintln!("error: {err}"),
        }
        std::process::exit(1);
    }

    if no_restart {
        println!("Done. Restart skipped (--no-restart).");
        return;
    }

    if let Err(err) = session.restart(print_progress) {
        finish_progress_line();
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    finish_progress_line();

    match session.processes() {
        Ok(procs) => {
            println!("Done:");
            for proc in procs {
                render::print_process(proc);
            }
        }
        Err(err) => eprintln!("error: {err}"),
    }
}

/// Progress percentages share one console line, overwritten in place.
fn print_progress(pct: u32) {
    print!("\r  {pct:>3}%");
    let _ = std::io::stdout().flush();
}

fn finish_progress_line() {
    println!();
}

use reclaim_core::config::Config;
use reclaim_core::session_end::{SessionEndDecision, SessionEndKind, SessionEndMonitor};
use reclaim_windows::recovery;

pub fn execute(config: &Config) {
    // Declare how the OS should relaunch us if a foreign restart
    // session shuts this process down. Best-effort: a refusal is worth
    // a warning, not an abort.
    if let Err(err) = recovery::register_for_restart(&config.restart) {
        eprintln!("warning: restart registration failed: {err}");
        reclaim_core::log_warn!("restart registration failed: {err}");
    }

    // The monitor is built on the pump thread, inside the install
    // closure: subscribers live and run on the thread that owns the
    // message window.
    let started = reclaim_windows::message_window::start(|chain| {
        let mut monitor = SessionEndMonitor::new();
        monitor.subscribe(|event| {
            let round = match event.kind {
                SessionEndKind::Query => "query",
                SessionEndKind::Ending => "ending",
            };
            println!(
                "session-end [{round}] reasons={:?} terminating={}",
                event.reasons, event.session_ending
            );
            SessionEndDecision::pass()
        });
        chain.add_hook(Box::new(monitor));
    });

    let _pump = match started {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    println!("Watching for session-end notifications. Press Ctrl+C to stop.");

    // The pump thread does the work; park until the process is
    // interrupted.
    loop {
        std::thread::park();
    }
}

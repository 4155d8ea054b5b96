use std::process;

use log::error;

use serialmon::prelude::*;
use serialmon::supervisor::spawn_interrupt_watcher;
use serialmon::term;

#[tokio::main]
async fn main() {
    env_logger::init();

    let (guard, source) = match term::acquire() {
        Ok(acquired) => acquired,
        Err(err) => {
            eprintln!("Monitor: cannot take over the terminal: {err}");
            process::exit(1);
        }
    };

    let mut relay = match InputRelay::spawn(source) {
        Ok(relay) => relay,
        Err(err) => {
            guard.restore();
            eprintln!("Monitor: cannot start the input relay: {err}");
            process::exit(1);
        }
    };

    let term = guard.handle();
    spawn_interrupt_watcher(term.clone());

    let supervisor = Supervisor::new(MonitorSettings::default(), Box::new(SerialOpener));
    if let Err(err) = supervisor.run(&mut relay, &term).await {
        error!("fatal: {err}");
        relay.stop();
        guard.restore();
        eprintln!("Monitor: {err}");
        process::exit(1);
    }
}

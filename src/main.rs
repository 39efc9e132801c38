//! Demo binary running a writable stream lifecycle scenario.
//!
//! Parses CLI arguments, drives one stream to completion and prints the
//! events it emitted.

mod cli;

use std::{cell::RefCell, io, rc::Rc};

use clap::Parser;
use cli::{Cli, Scenario};
use quillstream::{ConfigError, EventKind, StreamError, StreamEvent, TaskQueue, Writable};

fn build_stream(queue: &TaskQueue, cli: &Cli) -> Result<Writable, ConfigError> {
    let deferred = queue.clone();
    let fail_at = (cli.scenario == Scenario::HandlerError).then(|| cli.chunks.saturating_sub(1));
    let mut seen = 0usize;
    Writable::builder(queue)
        .high_water_mark(cli.high_water_mark)
        .write(move |chunk, encoding, cb| {
            let index = seen;
            seen += 1;
            if fail_at == Some(index) {
                let err = io::Error::other(format!("rejected chunk {index}"));
                cb.complete(Err(StreamError::handler(err)));
            } else {
                tracing::debug!(index, bytes = chunk.len(), encoding = encoding.as_str(), "chunk written");
                cb.ok();
            }
        })
        .finalizer(move |cb| deferred.queue_microtask(move || cb.ok()))
        .build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Enable structured logging for the demo.
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let queue = TaskQueue::new();
    let stream = build_stream(&queue, &cli)?;

    let observed = Rc::new(RefCell::new(Vec::new()));
    for kind in EventKind::ALL {
        let log = Rc::clone(&observed);
        stream.on(kind, move |event| {
            match event {
                StreamEvent::Error(err) => {
                    tracing::warn!(event = %kind, error = %err, "stream event");
                }
                _ => tracing::info!(event = %kind, "stream event"),
            }
            log.borrow_mut().push(kind);
        });
    }

    for i in 0..cli.chunks {
        stream.write(format!("chunk-{i}\n"));
    }
    stream.end();
    if cli.scenario == Scenario::DestroyAfterEnd {
        stream.destroy();
    }
    let tasks = queue.run_until_idle()?;

    let names: Vec<&str> = observed.borrow().iter().map(|kind| kind.as_str()).collect();
    println!(
        "{} stream {}: events=[{}], tasks_run={tasks}",
        stream.id(),
        stream.lifecycle().as_str(),
        names.join(", ")
    );
    Ok(())
}

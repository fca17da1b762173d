// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    io::{stdin, stdout, Write as _},
    sync::Arc,
};

use midihub::{ListenerResult, MidiHub, TimeStamp};

fn main() {
    pretty_env_logger::init();
    match run() {
        Ok(()) => (),
        Err(err) => println!("Error: {err}"),
    }
}

fn log_message(ts: TimeStamp, input: &[u8]) -> ListenerResult {
    println!("{ts}: {input:02x?} (len = {input_len})", input_len = input.len());
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let hub = MidiHub::with_available_devices()?;
    if hub.num_inputs() == 0 {
        anyhow::bail!("no MIDI input port found");
    }

    println!("\nAvailable inputs:");
    for index in 0..hub.num_inputs() {
        if let Some(descriptor) = hub.input_descriptor(index) {
            println!("{index}: {descriptor}");
        }
    }
    println!("\nAvailable outputs:");
    for index in 0..hub.num_outputs() {
        if let Some(descriptor) = hub.output_descriptor(index) {
            println!("{index}: {descriptor}");
        }
    }

    if let Err(err) = hub.open_all() {
        println!("Not all devices could be opened: {err}");
    }
    hub.add_listener(Arc::new(log_message));
    for index in 0..hub.num_inputs() {
        hub.set_input_enabled(index, true)?;
    }

    print!("\nPlease select an output to route all inputs to (empty for none): ");
    stdout().flush()?;
    let mut selection = String::new();
    stdin().read_line(&mut selection)?;
    let selection = selection.trim();
    if !selection.is_empty() {
        hub.set_output_enabled(selection.parse()?, true)?;
    }

    println!("Routing MIDI messages, press ENTER to exit...");
    stdin().read_line(&mut String::new())?;

    hub.close_all()?;
    Ok(())
}

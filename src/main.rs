//! Demo driver for the audio engine: play a WAV file or an RTTTL tune,
//! or record from the (possibly simulated) microphone.

use std::process::ExitCode;
use std::sync::mpsc;

use audiocore::{
    AudioEngine, EngineConfig, I2sInPins, I2sOutPins, InputDesc, OnComplete, OutputDesc,
    StreamType,
};

const USAGE: &str = "usage: audiocore [--config <file.toml>] <command>
commands:
  play <file.wav>          play a WAV file on the serial-bus output
  ring <rtttl-string>      play an RTTTL tune on the tone generator
  record <file.wav> [ms]   record from the input (default 5000 ms)";

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let config = if args.first().map(String::as_str) == Some("--config") {
        args.remove(0);
        let path = if args.is_empty() {
            anyhow::bail!("--config needs a file argument\n{}", USAGE)
        } else {
            args.remove(0)
        };
        EngineConfig::load(path)?
    } else {
        demo_config()
    };

    let engine = AudioEngine::from_config(&config)?;

    let (tx, rx) = mpsc::channel();
    let on_complete: OnComplete = Box::new(move |result| {
        tx.send(result).ok();
    });

    let started = match args.first().map(String::as_str) {
        Some("play") if args.len() == 2 => {
            engine.play_wav(&args[1], StreamType::Music, None, Some(on_complete))
        }
        Some("ring") if args.len() == 2 => {
            engine.play_rtttl(&args[1], StreamType::Notification, None, Some(on_complete))
        }
        Some("record") if args.len() == 2 || args.len() == 3 => {
            let duration_ms = match args.get(2) {
                Some(ms) => Some(ms.parse::<u64>()?),
                None => Some(5000),
            };
            engine.record_wav(&args[1], duration_ms, None, Some(on_complete))
        }
        _ => anyhow::bail!("{}", USAGE),
    };

    anyhow::ensure!(started, "request rejected (no matching device, or the engine is busy)");

    match rx.recv()? {
        Ok(message) => {
            println!("{}", message);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Simulated single-board setup used when no config file is given.
fn demo_config() -> EngineConfig {
    EngineConfig {
        outputs: vec![
            OutputDesc::i2s("speaker", I2sOutPins { sck: 5, ws: 6, sd: 7, mck: None }),
            OutputDesc::buzzer("buzzer", 4),
        ],
        inputs: vec![InputDesc::i2s("mic", I2sInPins { sck: 5, ws: 6, sd_in: 8 })],
        ..EngineConfig::default()
    }
}

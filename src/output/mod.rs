//! Output sink
//!
//! Consumes the resolved target and produces the user-facing side effect:
//! the travel command on stdout, and optionally an audible notification
//! (behind the `sound` cargo feature).

use anyhow::Result;
use tracing::info;

use crate::config::OutputSettings;
use crate::hunt::Position;

/// Render the travel command for a target position.
pub fn travel_command(settings: &OutputSettings, target: Position) -> String {
    settings
        .travel_template
        .replace("{x}", &target.x.to_string())
        .replace("{y}", &target.y.to_string())
}

/// Announce a resolved target: print the travel command and, when enabled,
/// play the notification sample.
pub fn announce(settings: &OutputSettings, target: Position) -> Result<()> {
    let command = travel_command(settings, target);
    info!("target resolved: {target}");
    println!("{command}");

    #[cfg(feature = "sound")]
    if settings.sound_enabled {
        if let Some(path) = &settings.sound_file {
            play_notification(path)?;
        }
    }

    Ok(())
}

#[cfg(feature = "sound")]
fn play_notification(path: &std::path::Path) -> Result<()> {
    use anyhow::Context;
    use rodio::{Decoder, OutputStream, Sink};
    use std::fs::File;
    use std::io::BufReader;

    let (_stream, handle) =
        OutputStream::try_default().context("no audio output device")?;
    let sink = Sink::try_new(&handle).context("failed to open audio sink")?;

    let file = File::open(path)
        .with_context(|| format!("failed to open notification sample {}", path.display()))?;
    let source = Decoder::new(BufReader::new(file)).context("unsupported audio format")?;

    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

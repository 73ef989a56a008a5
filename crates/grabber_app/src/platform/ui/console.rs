//! Terminal front-end: line commands on stdin, activity log on stdout.

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

use grabber_core::{is_known_format, AppViewModel, Msg, Phase, QUALITY_LABELS};
use grabber_logging::grab_debug;

use super::constants::CONSOLE_POLL;
use super::log_pane::LogPane;
use crate::platform::app::AppController;

const HELP: &str = "\
Commands:
  url <URL>          set the URL
  dir <PATH>         set the output folder
  format <NAME>      default, mp3 aac m4a flac wav opus vorbis, mp4 webm mkv
  quality <LABEL>    video quality, e.g. \"720p (HD)\"
  playlist on|off    toggle playlist mode
  limit <N>          playlist scan limit (0 = all)
  start | stop | clear | show | quit
While selecting tracks:
  list | toggle <N> | rename <N> <TITLE> | all | none | ok | cancel";

/// One parsed line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Send(Msg),
    Help,
    Show,
    List,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let send = |msg: Msg| -> Result<ConsoleCommand, String> { Ok(ConsoleCommand::Send(msg)) };
    match word.to_ascii_lowercase().as_str() {
        "" | "help" | "?" => Ok(ConsoleCommand::Help),
        "show" => Ok(ConsoleCommand::Show),
        "list" => Ok(ConsoleCommand::List),
        "url" => send(Msg::UrlChanged(rest.to_string())),
        "dir" => send(Msg::OutputDirChanged(rest.to_string())),
        "format" => {
            let format = rest.to_ascii_lowercase();
            if is_known_format(&format) {
                send(Msg::FormatChanged(format))
            } else {
                Err(format!("Unknown format: {rest}"))
            }
        }
        "quality" => {
            let label = rest.trim_matches('"');
            match QUALITY_LABELS
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(label))
            {
                Some((known, _)) => send(Msg::QualityChanged((*known).to_string())),
                None => Err(format!("Unknown quality: {rest}")),
            }
        }
        "playlist" => match rest {
            "on" | "yes" | "1" => send(Msg::PlaylistToggled(true)),
            "off" | "no" | "0" => send(Msg::PlaylistToggled(false)),
            _ => Err("Usage: playlist on|off".to_string()),
        },
        "limit" => rest
            .parse::<u32>()
            .map(|n| ConsoleCommand::Send(Msg::ScanLimitChanged(n)))
            .map_err(|_| "Usage: limit <N>".to_string()),
        "start" | "download" => send(Msg::StartClicked),
        "stop" => send(Msg::StopClicked),
        "clear" => send(Msg::ClearLogClicked),
        "quit" | "exit" => send(Msg::QuitClicked),
        "toggle" => parse_index(rest).map(|index| ConsoleCommand::Send(Msg::TrackToggled { index })),
        "rename" => {
            let (index, title) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "Usage: rename <N> <TITLE>".to_string())?;
            let index = parse_index(index)?;
            send(Msg::TrackRenamed {
                index,
                title: title.trim().to_string(),
            })
        }
        "all" => send(Msg::SelectAllClicked),
        "none" => send(Msg::DeselectAllClicked),
        "ok" | "confirm" => send(Msg::SelectionConfirmed),
        "cancel" => send(Msg::SelectionCancelled),
        other => Err(format!("Unknown command: {other} (try 'help')")),
    }
}

fn parse_index(text: &str) -> Result<usize, String> {
    text.trim()
        .parse::<usize>()
        .map_err(|_| format!("Not a track number: {text}"))
}

pub fn run(mut controller: AppController) -> io::Result<()> {
    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut out = io::stdout();
    let mut log = LogPane::new();
    let mut last_status = String::new();
    let mut last_phase = Phase::Idle;
    let mut stdin_open = true;
    let mut progress_shown = false;

    writeln!(out, "{HELP}")?;
    print_form(&mut out, &controller.view())?;

    loop {
        controller.pump_wait(CONSOLE_POLL);

        loop {
            match line_rx.try_recv() {
                Ok(line) => handle_line(&mut out, &mut controller, &line)?,
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    if stdin_open {
                        grab_debug!("stdin closed");
                        stdin_open = false;
                    }
                    break;
                }
            }
        }

        if !stdin_open && controller.view().phase == Phase::Selecting {
            writeln!(out, "Input closed; downloading every listed track.")?;
            controller.dispatch(Msg::SelectionConfirmed);
        }

        let new_lines = log.sync(controller.log_since(log.last_serial()));
        if progress_shown && !new_lines.is_empty() {
            writeln!(out)?;
            progress_shown = false;
        }
        for line in new_lines {
            writeln!(out, "{line}")?;
        }

        let view = controller.view();
        if view.status != last_status {
            if progress_shown {
                writeln!(out)?;
                progress_shown = false;
            }
            writeln!(out, "== {} ==", view.status)?;
            last_status = view.status.clone();
        }
        if let Some(line) = &view.progress_line {
            if view.phase.is_active() {
                write!(out, "\r{line}   ")?;
                out.flush()?;
                progress_shown = true;
            }
        }
        if view.phase == Phase::Selecting && last_phase != Phase::Selecting {
            print_selection(&mut out, &view)?;
            writeln!(out, "Edit the selection, then 'ok' to download or 'cancel'.")?;
        }
        last_phase = view.phase;

        if controller.quit_requested() {
            break;
        }
        if !stdin_open && view.phase == Phase::Idle {
            break;
        }
    }

    controller.shutdown();
    Ok(())
}

fn handle_line(out: &mut impl Write, controller: &mut AppController, line: &str) -> io::Result<()> {
    match parse_command(line) {
        Ok(ConsoleCommand::Send(msg)) => controller.dispatch(msg),
        Ok(ConsoleCommand::Help) => writeln!(out, "{HELP}")?,
        Ok(ConsoleCommand::Show) => print_form(out, &controller.view())?,
        Ok(ConsoleCommand::List) => print_selection(out, &controller.view())?,
        Err(message) => writeln!(out, "{message}")?,
    }
    Ok(())
}

fn print_form(out: &mut impl Write, view: &AppViewModel) -> io::Result<()> {
    writeln!(out, "URL:      {}", view.url)?;
    writeln!(out, "Folder:   {}", view.output_dir)?;
    if view.quality_enabled {
        writeln!(out, "Format:   {} ({})", view.format, view.quality)?;
    } else {
        writeln!(out, "Format:   {}", view.format)?;
    }
    let limit = match view.scan_limit {
        0 => "all".to_string(),
        n => n.to_string(),
    };
    writeln!(
        out,
        "Playlist: {} (scan limit {limit})",
        if view.playlist_mode { "on" } else { "off" }
    )
}

fn print_selection(out: &mut impl Write, view: &AppViewModel) -> io::Result<()> {
    let Some(selection) = &view.selection else {
        return writeln!(out, "No track list to show.");
    };
    for row in &selection.rows {
        let mark = if row.included { 'x' } else { ' ' };
        writeln!(out, "[{mark}] {:>3}. {}", row.index, row.title)?;
    }
    writeln!(out, "{} of {} selected", selection.included, selection.rows.len())
}

//! cycle-runner: headless session driver for UnderTime.
//!
//! Usage:
//!   cycle-runner --cycles 2 --dt 0.5 --db save.db
//!   cycle-runner --ipc-mode --data-dir ./data

use anyhow::Result;
use undertime_core::{
    command::PlayerCommand,
    config::GameConfig,
    event::CycleEvent,
    hud::HudInput,
    session::{new_session_id, GameSession, SessionState},
    store::SqliteSaveStore,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Command { command: PlayerCommand },
    Quit,
}

#[derive(serde::Serialize)]
struct IpcReply<'a> {
    state:  &'a SessionState,
    events: &'a [CycleEvent],
    #[serde(skip_serializing_if = "Option::is_none")]
    error:  Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let cycles = parse_arg(&args, "--cycles", 2u32);
    let dt = parse_arg(&args, "--dt", 0.5f32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    let config = GameConfig::load(data_dir)?;
    let store = if db == ":memory:" { SqliteSaveStore::in_memory()? } else { SqliteSaveStore::open(db)? };
    store.migrate()?;

    let session_id = new_session_id();
    if !ipc_mode {
        println!("UnderTime: cycle-runner");
        println!("  session:   {session_id}");
        println!("  cycles:    {cycles}");
        println!("  dt:        {dt}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let mut session = GameSession::build(session_id, config, store);
    if session.coordinator().is_game_exists() {
        session.load_game()?;
    } else {
        session.new_game();
    }

    if ipc_mode {
        run_ipc_loop(&mut session)?;
    } else {
        run_demo(&mut session, cycles, dt)?;
        print_summary(&session)?;
    }
    Ok(())
}

fn run_ipc_loop(session: &mut GameSession<SqliteSaveStore>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let (events, error) = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => (Vec::new(), None),
            IpcCommand::Command { command } => match session.apply(command) {
                Ok(events) => (events, None),
                Err(e) => {
                    log::warn!("command failed: {e}");
                    (Vec::new(), Some(e.to_string()))
                }
            },
        };
        let state = session.state();
        let reply = IpcReply { state: &state, events: &events, error };
        writeln!(stdout, "{}", serde_json::to_string(&reply)?)?;
        stdout.flush()?;
    }
    Ok(())
}

/// Plays `cycles` cycles: pick up a clue and a contact, text the contact,
/// pull a bomb part, then let the first cycle time out and end the rest
/// by hand.
fn run_demo(session: &mut GameSession<SqliteSaveStore>, cycles: u32, dt: f32) -> Result<()> {
    let dt = if dt > 0.0 { dt } else { 0.5 };
    for n in 0..cycles {
        let cycle_id = session.controller().cycle_id();
        session.quick_unlock_clue()?;
        session.quick_unlock_contact()?;
        if let Some(contact) = session.coordinator().save_file().collected_contacts.first() {
            session.send_message(contact.id, "hi")?;
        }
        session.select("Bomb", true);
        session.apply(PlayerCommand::Input { input: HudInput::Interact })?;
        if let Some(part) = session.bomb().and_then(|b| b.live_parts().next()) {
            session.select(&format!("Bomb{part}"), true);
            session.remove_bomb_part()?;
        }
        session.apply(PlayerCommand::Input { input: HudInput::Pause })?;

        if n > 0 {
            report(&[session.end_cycle()]);
        }
        // Bounded so a stuck transition cannot spin forever.
        let max_ticks = ((session.config().cycle_length_secs + 4.0 * session.config().fade_secs) / dt) as u32 + 16;
        for _ in 0..max_ticks {
            let events = session.tick(dt);
            report(&events);
            if session.controller().is_running() && session.controller().cycle_id() != cycle_id {
                break;
            }
        }
    }
    Ok(())
}

fn report(events: &[CycleEvent]) {
    for event in events {
        match serde_json::to_string(event) {
            Ok(line) => println!("  {line}"),
            Err(e) => log::warn!("cannot print event: {e}"),
        }
    }
}

fn print_summary(session: &GameSession<SqliteSaveStore>) -> Result<()> {
    let state = session.state();
    let snapshots = session.snapshots()?;

    println!();
    println!("=== SESSION SUMMARY ===");
    println!("  session:          {}", state.session_id);
    println!("  current cycle:    {}", state.cycle_id);
    println!("  completed cycles: {}", state.completed_cycles);
    println!("  clues:            {:?}", state.collected_clues);
    println!("  contacts:         {:?}", state.collected_contacts);
    println!("  wall pins:        {:?}", state.wall_pins);
    println!("  live parts:       {:?}", state.live_parts);

    println!();
    println!("=== SAVE HISTORY (newest first) ===");
    if snapshots.is_empty() {
        println!("  (No saves yet)");
    } else {
        for s in &snapshots {
            println!(
                "  #{} | cycle {} | {} completed | {}",
                s.id,
                s.cycle_id,
                s.completed_cycles,
                s.saved_at.to_rfc3339()
            );
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

//! DisplayBrightness: brightness and night mode for every connected display.
//!
//! Without a subcommand the tray application starts. The subcommands drive
//! the same engine once from the console.

use brightness_core::config::{self, NightLightColor, Settings};
use brightness_core::control::{apply_concurrently, DisplayControl};
use brightness_core::display::NightLightControl;
use brightness_core::list::DisplayList;
use brightness_gamma::NightModeEngine;
use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;

mod app;
mod control;
mod startup;

use control::NativeControl;

#[derive(Parser)]
#[command(
    name = "display-brightness",
    version = env!("APP_VERSION"),
    about = "Brightness and night mode for every connected display",
    long_about = "Controls brightness of external monitors over DDC/CI and of internal\n\
        laptop panels through WMI, and tints displays with a warm gamma ramp\n\
        for night mode. Runs in the notification area when started without a\n\
        subcommand."
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the tray application (default)
    Run {
        /// Keep the console attached and log to it (Ctrl+C to exit)
        #[arg(long)]
        console: bool,
    },

    /// List every display found by both discovery channels
    List,

    /// Set brightness as a percentage of each display's range
    Brightness {
        /// Target level, 0-100
        #[arg(value_parser = clap::value_parser!(u32).range(0..=100))]
        percent: u32,

        /// Only this display (device name as shown by `list`)
        #[arg(short, long)]
        display: Option<String>,
    },

    /// Turn night mode on or off
    Night {
        #[arg(value_enum)]
        state: Switch,

        /// Only this display (device name as shown by `list`)
        #[arg(short, long)]
        display: Option<String>,
    },

    /// Show or change the night-light colour
    NightColor {
        /// Red factor, 0.0-1.0
        #[arg(long)]
        red: Option<f64>,

        /// Green factor, 0.0-1.0
        #[arg(long)]
        green: Option<f64>,

        /// Blue factor, 0.0-1.0
        #[arg(long)]
        blue: Option<f64>,

        /// Restore the default colour
        #[arg(long, conflicts_with_all = ["red", "green", "blue"])]
        reset: bool,

        /// Apply night mode to all displays with the resulting colour
        #[arg(long)]
        apply: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Run at startup
    Startup {
        #[command(subcommand)]
        action: StartupAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print config file path
    Path,
    /// Reset config to defaults
    Reset,
}

#[derive(Subcommand)]
enum StartupAction {
    /// Start with Windows
    Enable,
    /// Do not start with Windows
    Disable,
    /// Show whether startup is enabled
    Status,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let (tray, console) = match &cli.command {
        None => (true, false),
        Some(Commands::Run { console }) => (true, *console),
        Some(_) => (false, true),
    };

    if tray && !console {
        // Background mode: no console, log to the event log.
        winlog::init("DisplayBrightness").ok();
        unsafe {
            let _ = windows::Win32::System::Console::FreeConsole();
        }
        return app::run(false);
    }

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .format_timestamp(None)
        .init();

    match cli.command {
        None | Some(Commands::Run { .. }) => app::run(true)?,
        Some(Commands::List) => cmd_list()?,
        Some(Commands::Brightness { percent, display }) => cmd_brightness(percent, display)?,
        Some(Commands::Night { state, display }) => {
            cmd_night(matches!(state, Switch::On), display)?
        }
        Some(Commands::NightColor {
            red,
            green,
            blue,
            reset,
            apply,
        }) => cmd_night_color(red, green, blue, reset, apply)?,
        Some(Commands::Config { action }) => cmd_config(action)?,
        Some(Commands::Startup { action }) => cmd_startup(action)?,
    }

    Ok(())
}

// ============================================================================
// Command implementations
// ============================================================================

/// Fresh discovery loaded into a list.
fn discover() -> DisplayList {
    let mut list = DisplayList::new();
    list.replace(brightness_monitor::discover_all());
    list
}

fn find(list: &DisplayList, key: &str) -> Result<usize, Box<dyn Error>> {
    list.position(key)
        .ok_or_else(|| format!("No display named \"{}\" (see `list`)", key).into())
}

fn cmd_list() -> Result<(), Box<dyn Error>> {
    println!("Scanning displays...\n");
    let list = discover();
    if list.is_empty() {
        println!("No displays found.");
        return Ok(());
    }

    println!("Found {} display(s):\n", list.len());
    for (i, d) in list.displays().iter().enumerate() {
        println!("  {}. {}", i + 1, d);
        println!("     Device:     {}", d.device_name);
        if let Some(id) = &d.monitor_id {
            println!("     Monitor ID: {}", id);
        }
        if d.is_brightness_supported() {
            println!(
                "     Brightness: {} (range {}-{})",
                d.brightness, d.range.min, d.range.max
            );
        }
        println!(
            "     Night mode: {}",
            if d.is_night_light_supported() {
                "supported"
            } else {
                "unsupported"
            }
        );
    }
    Ok(())
}

fn cmd_brightness(percent: u32, display: Option<String>) -> Result<(), Box<dyn Error>> {
    let fraction = f64::from(percent) / 100.0;
    let mut list = discover();

    if let Some(key) = display {
        let index = find(&list, &key)?;
        if !list.displays()[index].is_brightness_supported() {
            println!("[SKIP] {} has no brightness control.", key);
            return Ok(());
        }
        let request = list.plan_percent(index, fraction)?;
        let value = list.set_brightness(index, request.value, &NativeControl)?;
        println!("[OK] {} brightness set to {}", key, value);
        return Ok(());
    }

    let requests = list.plan_global(fraction);
    if requests.is_empty() {
        println!("[SKIP] No display supports brightness control.");
        return Ok(());
    }

    let outcomes = apply_concurrently(&NativeControl, requests);
    let committed = list.commit_outcomes(&outcomes);
    for outcome in &outcomes {
        let name = list
            .get(outcome.request.index)
            .map(|d| d.friendly_name.as_str())
            .unwrap_or(outcome.request.device_name.as_str());
        match &outcome.result {
            Ok(()) => println!("[OK]   {} -> {}", name, outcome.request.value),
            Err(e) => println!("[FAIL] {}: {}", name, e),
        }
    }
    println!("\n[DONE] {} of {} display(s) updated.", committed, outcomes.len());
    Ok(())
}

fn cmd_night(enabled: bool, display: Option<String>) -> Result<(), Box<dyn Error>> {
    let engine = NightModeEngine::load();
    let state = if enabled { "on" } else { "off" };

    if let Some(key) = display {
        let list = discover();
        let index = find(&list, &key)?;
        // A fresh list knows nothing of earlier tints, so apply unconditionally.
        match &list.displays()[index].night_light_control {
            NightLightControl::Unsupported => {
                println!("[SKIP] {} has no night-light control.", key);
            }
            capability => {
                NativeControl.set_night_light(capability, enabled, engine.color())?;
                println!("[OK] Night mode {} for {}", state, key);
            }
        }
        return Ok(());
    }

    let applied = engine.apply_to_all(enabled);
    println!("[OK] Night mode {} on {} display(s)", state, applied);
    Ok(())
}

fn cmd_night_color(
    red: Option<f64>,
    green: Option<f64>,
    blue: Option<f64>,
    reset: bool,
    apply: bool,
) -> Result<(), Box<dyn Error>> {
    let mut engine = NightModeEngine::load();

    if reset {
        engine.reset();
    } else if red.is_some() || green.is_some() || blue.is_some() {
        let current = engine.color();
        engine.update_color(NightLightColor {
            red: red.unwrap_or(current.red),
            green: green.unwrap_or(current.green),
            blue: blue.unwrap_or(current.blue),
        });
    }

    print_color(&engine);

    if apply {
        let applied = engine.apply_to_all(true);
        println!("\n[OK] Night mode applied to {} display(s)", applied);
    }
    Ok(())
}

fn print_color(engine: &NightModeEngine) {
    let color = engine.color();
    let shown = engine.adjustment_color();
    println!("Night-light colour ({})\n", engine.path().display());
    println!("  red    = {:.2}  (adjustable from {:.2})", color.red, shown.red);
    println!("  green  = {:.2}  (adjustable from {:.2})", color.green, shown.green);
    println!("  blue   = {:.2}  (adjustable from {:.2})", color.blue, shown.blue);
}

fn cmd_config(action: Option<ConfigAction>) -> Result<(), Box<dyn Error>> {
    match action {
        None | Some(ConfigAction::Show) => {
            let settings = Settings::load();
            let color = settings.night_light();
            println!("Config file: {}\n", config::config_path().display());
            println!("── Night Light ──");
            println!("  NightLightRed   = {}", color.red);
            println!("  NightLightGreen = {}", color.green);
            println!("  NightLightBlue  = {}", color.blue);
            println!("\n── Startup ──");
            println!(
                "  run at startup  = {}",
                if startup::is_enabled() { "on" } else { "off" }
            );
        }
        Some(ConfigAction::Path) => {
            println!("{}", config::config_path().display());
        }
        Some(ConfigAction::Reset) => {
            let path = config::config_path();
            Settings::default().save_to(&path)?;
            println!("[OK] Config reset to defaults at {}", path.display());
        }
    }
    Ok(())
}

fn cmd_startup(action: StartupAction) -> Result<(), Box<dyn Error>> {
    match action {
        StartupAction::Enable => {
            startup::enable()?;
            println!("[OK] DisplayBrightness will start with Windows.");
        }
        StartupAction::Disable => {
            startup::disable()?;
            println!("[OK] DisplayBrightness will not start with Windows.");
        }
        StartupAction::Status => {
            println!(
                "Run at startup: {}",
                if startup::is_enabled() { "on" } else { "off" }
            );
        }
    }
    Ok(())
}

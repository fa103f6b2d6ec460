use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use crosstab::{
    apply_args, chart_export, open_table, AppConfig, App, AppEvent, Args, ConfigManager,
    OpenOptions, Session, EMPTY_RESULT_WARNING,
};
use log::LevelFilter;
use ratatui::DefaultTerminal;
use std::io::Write;
use std::sync::mpsc::channel;
use std::time::Duration;

fn init_logging(args: &Args) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {:<5} {}: {}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });
    if let Some(path) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    } else if !args.is_headless() {
        // stderr would draw over the terminal UI
        builder.filter_level(LevelFilter::Off);
    }
    builder.try_init()?;
    Ok(())
}

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, args: &Args, config: AppConfig) -> Result<()> {
    let poll_interval = Duration::from_millis(config.performance.event_poll_interval_ms);
    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new_with_config(tx.clone(), config);
    if args.debug {
        app.enable_debug();
    }
    app.set_pending_args(args.clone());
    render(&mut terminal, &mut app)?;
    if let Some(path) = &args.path {
        tx.send(AppEvent::Open(path.clone(), args.into()))?;
    }

    loop {
        if crossterm::event::poll(poll_interval)? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

/// Runs the pipeline once without the UI, for `--print` and `--export-chart`.
fn run_headless(args: &Args, config: &AppConfig) -> Result<()> {
    let path = args
        .path
        .as_deref()
        .ok_or_else(|| eyre!("A spreadsheet path is required"))?;
    let options: OpenOptions = args.into();
    let mut session = Session::new(open_table(path, &options)?);
    apply_args(&mut session, args)?;
    let output = session.run()?;

    if output.is_empty_result() {
        eprintln!("{}", EMPTY_RESULT_WARNING);
    }
    if args.print {
        print!("{}", output.to_text());
    }
    if let Some(target) = &args.export_chart {
        let chart = output
            .chart()
            .ok_or_else(|| eyre!("There is no chart to export: {}", EMPTY_RESULT_WARNING))?;
        chart_export::write_chart_png(target, &chart, config.export_size())?;
        eprintln!("Chart saved to {}", target.display());
    }
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(crosstab::APP_NAME) {
            Ok(manager) => match manager.write_default_config(args.force) {
                Ok(path) => {
                    println!("Configuration written to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing configuration: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    init_logging(&args)?;
    let config = AppConfig::load(crosstab::APP_NAME).unwrap_or_else(|e| {
        log::warn!("using default configuration: {}", e);
        AppConfig::default()
    });

    if args.is_headless() {
        if let Err(e) = run_headless(&args, &config) {
            eprintln!("Error: {}", crosstab::error_display::user_message(&e));
            std::process::exit(1);
        }
        return Ok(());
    }

    let terminal = ratatui::init();
    let result = run(terminal, &args, config);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstab::FileFormat;
    use std::path::PathBuf;

    #[test]
    fn test_args_to_open_options() {
        let args = Args {
            path: Some(PathBuf::from("data.txt")),
            format: Some(FileFormat::Tsv),
            delimiter: Some(b';'),
            ..Default::default()
        };
        let opts: OpenOptions = (&args).into();
        assert_eq!(opts.format, Some(FileFormat::Tsv));
        assert_eq!(opts.delimiter, Some(b';'));
    }

    #[test]
    fn test_default_args_have_no_overrides() {
        let opts: OpenOptions = (&Args::default()).into();
        assert_eq!(opts, OpenOptions::new());
    }
}

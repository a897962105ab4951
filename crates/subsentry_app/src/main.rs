use subsentry_app::app::{run, AppConfig, Command};

fn main() {
    tracing_subscriber::fmt::init();
    let config = AppConfig::from_env().unwrap_or_default();
    let command = match Command::from_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("usage: subsentry [watch|once|import]: {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(config, command) {
        eprintln!("SubSentry failed: {err:#}");
        std::process::exit(1);
    }
}

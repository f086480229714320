use clap::Parser;
use mds_shipping::config::cli::{Command, LogAction};
use mds_shipping::config::form::FormSubmission;
use mds_shipping::core::diagnostic_log::LogKind;
use mds_shipping::utils::error::ErrorSeverity;
use mds_shipping::utils::{logger, validation::Validate};
use mds_shipping::{
    CliConfig, DiagnosticLog, HttpConnector, JsonFileSettingsStore, Package, ShippingConfig,
    ShippingError, ShippingMethod,
};

fn load_config(cli: &CliConfig) -> mds_shipping::Result<ShippingConfig> {
    if cli.config.exists() {
        ShippingConfig::from_file(&cli.config)
    } else {
        Ok(ShippingConfig::default())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> mds_shipping::Result<T> {
    let data = std::fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

async fn run(cli: CliConfig, config: ShippingConfig) -> mds_shipping::Result<()> {
    let log = DiagnosticLog::new(&config.log.directory);

    if let Command::Logs { action } = &cli.command {
        match action {
            LogAction::Show { kind } => {
                let kind: LogKind = kind.parse()?;
                for entry in log.read(kind)? {
                    println!(
                        "{} [{}] {}: {}",
                        entry.timestamp,
                        kind.file_name(),
                        entry.function,
                        entry.message
                    );
                }
            }
            LogAction::Bundle => println!("{}", log.bundle()?.display()),
            LogAction::ErrorFile => match log.error_file_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No error log"),
            },
        }
        return Ok(());
    }

    let connector = HttpConnector::new(config.collivery.clone());
    let store = JsonFileSettingsStore::new(&config.store.settings_path);
    let mut method = ShippingMethod::load(connector, store, log).await?;

    match cli.command {
        Command::Services => {
            for service in method.services().await? {
                println!("{}\t{}", service.id, service.title);
            }
        }
        Command::Quote { package } => {
            let package: Package = read_json(&package)?;
            let rates = method.calculate_shipping(&package).await;
            println!("{}", serde_json::to_string_pretty(&rates)?);
        }
        Command::UpdateSettings { form } => {
            let submission: FormSubmission = read_json(&form)?;
            method.process_admin_options(&submission).await?;
            println!("✅ Settings saved");
        }
        Command::Logs { .. } => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config.display(), e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    logger::init_logger(cli.verbose, config.log.format);
    tracing::info!("Starting mds-shipping");
    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(cli, config).await {
        tracing::error!("❌ {} (Severity: {:?})", e, e.severity());
        eprintln!("❌ {}", e.user_friendly_message());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if let ShippingError::InvalidCredentials(reason) = &e {
            eprintln!("💡 {}", reason);
        }
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

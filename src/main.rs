#[cfg(target_os = "linux")]
mod cli {
    use clap::Parser;
    use log::info;
    use pca9685_servo::{Config, Controller, LinuxI2c};
    use std::error::Error;
    use std::path::PathBuf;

    /// Drive one servo on a PCA9685 channel
    #[derive(Parser, Debug)]
    #[command(version, about, long_about = None)]
    struct Args {
        /// JSON servo config
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, default_value = "servo")]
        name: String,
        /// Move to this angle and exit
        #[arg(short, long, conflicts_with = "stop")]
        angle: Option<u32>,
        /// Turn the channel off and exit
        #[arg(long)]
        stop: bool,
    }

    pub async fn run() -> Result<(), Box<dyn Error>> {
        let args = Args::parse();

        let text = tokio::fs::read_to_string(&args.config).await?;
        let config = Config::from_json(&text)?;
        config.validate(&args.config.display().to_string())?;

        let servo = Controller::new(args.name, &config, LinuxI2c).await?;

        if args.stop {
            servo.stop().await?;
            println!("{} stopped", servo.name());
            return Ok(());
        }

        if let Some(angle) = args.angle {
            servo.move_to(angle).await?;
            println!("{} position: {} degrees", servo.name(), servo.position());
            return Ok(());
        }

        info!("Holding {} at {} degrees, Ctrl-C to release", servo.name(), servo.position());
        tokio::signal::ctrl_c().await?;
        servo.stop().await?;
        info!("{} released", servo.name());
        Ok(())
    }
}

#[cfg(target_os = "linux")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    cli::run().await
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("pca9685-servo needs the Linux i2c-dev interface");
    std::process::exit(1);
}

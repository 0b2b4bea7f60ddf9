use log::*;
use saleae_socket_client::SocketClient;
use saleae_uart_logger::operator::{Operator, Terminal};
use saleae_uart_logger::{run, Outcome};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = match cli::cli() {
        Ok(v) => v,
        Err(e) => {
            println!("Error in startup: {}", e);
            std::process::exit(1);
        }
    };

    debug!("Settings: {:?}", cli.settings);

    let mut operator = Terminal::new();

    operator.say("Connecting...")?;
    let mut session = match SocketClient::connect(&cli.host, cli.port).await {
        Ok(v) => v,
        Err(e) => {
            operator.say(&format!("Error while connecting: {}", e))?;
            operator.wait_key()?;
            return Ok(());
        }
    };
    operator.say("Connected")?;
    operator.say("")?;

    match run(&mut session, &mut operator, &cli.settings).await? {
        Outcome::Completed { captures } => {
            info!("{}: Finished after {} captures", session.address(), captures)
        }
        Outcome::SampleRateUnavailable { requested } => {
            info!("{}: {} SPS is not offered", session.address(), requested)
        }
    }

    Ok(())
}

mod agents;

use agents::RosterAgent;
use clap::{Parser, ValueEnum};
use parley_core::stanza::{ChannelTransport, Jid, Stanza};
use parley_core::{
    serve, AgentConfig, Context, Dispatch, Presence, StatefulDispatcher, StatelessDispatcher,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Stateless: echoes chats, answers version and ping.
    Echo,
    /// Stateful: presence subscriptions and a roster query.
    Roster,
}

#[derive(Parser)]
#[command(name = "parley-daemon")]
#[command(about = "Parley demo agent over newline-delimited JSON stanzas")]
struct Cli {
    /// The agent's own JID.
    #[arg(short, long, default_value = "agent@localhost")]
    jid: Jid,

    #[arg(short, long, value_enum, default_value_t = Mode::Echo)]
    mode: Mode,

    /// Roster mode: only accept subscriptions from this domain.
    #[arg(long)]
    accept_domain: Option<String>,

    /// Overrides PARLEY_SUBSCRIBE_WAIT_MS.
    #[arg(long)]
    subscribe_wait_ms: Option<u64>,

    /// Stanzas buffered for stdout before sends start waiting.
    #[arg(long, env = "PARLEY_OUTBOUND_CAPACITY", default_value_t = 64)]
    outbound_capacity: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut config = AgentConfig::from_env()?;
    if let Some(ms) = cli.subscribe_wait_ms {
        config.subscribe_reply_wait_ms = ms;
    }

    info!("=== Parley Daemon [crate: parley-daemon] ===");
    info!("Agent {} in {:?} mode", cli.jid, cli.mode);

    let (transport, outbound) = ChannelTransport::bounded(cli.outbound_capacity);
    let ctx = Context::new(cli.jid, transport);
    let writer = tokio::spawn(write_outbound(outbound));
    let (inbound_tx, inbound) = async_channel::unbounded();
    tokio::spawn(async move {
        if let Err(e) = read_inbound(inbound_tx).await {
            warn!("[Daemon] stdin failed: {}", e);
        }
    });

    match cli.mode {
        Mode::Echo => {
            let dispatcher = StatelessDispatcher::new(agents::echo_handlers(), ctx);
            run(&dispatcher, inbound).await;
        }
        Mode::Roster => {
            let agent = Presence::new(RosterAgent::new(cli.accept_domain), config);
            let dispatcher = StatefulDispatcher::start(agent, ctx);
            run(&dispatcher, inbound).await;
            dispatcher.shutdown().await?;
        }
    }

    // Outbound closes once the last context clone is gone.
    writer.await??;
    info!("[Daemon] stopped");
    Ok(())
}

async fn run<D: Dispatch>(dispatcher: &D, inbound: async_channel::Receiver<Stanza>) {
    tokio::select! {
        _ = serve(dispatcher, inbound) => info!("[Daemon] input closed"),
        _ = tokio::signal::ctrl_c() => info!("[Daemon] shutdown signal received"),
    }
}

async fn read_inbound(inbound: async_channel::Sender<Stanza>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Stanza>(line) {
            Ok(stanza) => {
                if inbound.send(stanza).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!("[Daemon] skipping malformed stanza: {}", e),
        }
    }
    Ok(())
}

async fn write_outbound(outbound: async_channel::Receiver<Stanza>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Ok(stanza) = outbound.recv().await {
        let mut line = serde_json::to_vec(&stanza)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(())
}

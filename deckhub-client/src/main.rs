/**
 * DECKHUB CLIENT - Panneau headless
 *
 * RÔLE : Se connecte au kernel, garde la grille synchronisée et lit des
 * commandes sur stdin (press R C, layout RxC, page ID, show, quit).
 */

use anyhow::Result;
use deckhub_client::{ClientError, ClientSynchronizer, Command, Transport, TransportConfig};
use deckhub_contracts::{ButtonTable, Layout};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

async fn fetch_buttons(http_base: &str) -> Result<ButtonTable, ClientError> {
    let table = reqwest::get(format!("{http_base}/api/buttons"))
        .await?
        .error_for_status()?
        .json::<ButtonTable>()
        .await?;
    Ok(table)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = TransportConfig::from_env();
    let page_id = std::env::var("DECKHUB_PAGE").unwrap_or_else(|_| "page1".to_string());
    let layout = match std::env::var("DECKHUB_LAYOUT") {
        Ok(shape) => shape.parse().unwrap_or_else(|e| {
            warn!("DECKHUB_LAYOUT ignoré ({shape}): {e}");
            Layout::default()
        }),
        Err(_) => Layout::default(),
    };

    let table = match fetch_buttons(&config.http_base()).await {
        Ok(table) => table,
        Err(e) => {
            warn!("button table unavailable ({e}), using built-in table");
            ButtonTable::default()
        }
    };

    let sync = Arc::new(Mutex::new(ClientSynchronizer::new(table, page_id, layout)));
    let (tx, rx) = mpsc::channel(32);
    let transport = tokio::spawn(Transport::new(config, sync.clone()).run(rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };

        let outgoing = {
            let mut sync = sync.lock();
            match command {
                Command::Press { row, col } => {
                    let press = sync.press(row, col, Instant::now());
                    if press.is_none() {
                        info!("cell {row}-{col} is not pressable");
                    }
                    press
                }
                Command::Layout(layout) => {
                    sync.set_layout(layout);
                    None
                }
                Command::Page(id) => {
                    sync.switch_page(id);
                    None
                }
                Command::Show => {
                    println!("{}", sync.render_text(Instant::now()));
                    None
                }
                Command::Quit => break,
            }
        };

        if let Some(msg) = outgoing {
            if tx.send(msg).await.is_err() {
                warn!("transport stopped, press dropped");
            }
        }
    }

    drop(tx);
    transport.await?;
    Ok(())
}

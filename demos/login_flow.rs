//! Pair the gateway with a phone, then list recent chats
//!
//! Run with: cargo run --example login_flow [phone]
//!
//! Without a phone number a QR code link is printed; with one, a pairing code.

use std::time::Duration;

use gowa_client::api::ListChatsParams;
use gowa_client::Gowa;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let gowa = Gowa::from_env()?;

    match std::env::args().nth(1) {
        Some(phone) => {
            let code = gowa.app().login_with_code(&phone).await?;
            println!("Enter pairing code {} on {}", code.results.pair_code, phone);
        }
        None => {
            let qr = gowa.app().login().await?;
            println!(
                "Scan {} within {} seconds",
                qr.results.qr_link, qr.results.qr_duration
            );
        }
    }

    tokio::time::sleep(Duration::from_secs(30)).await;

    let devices = gowa.app().devices().await?;
    for device in &devices.results {
        println!("Linked device: {} ({})", device.name, device.device);
    }

    let params = ListChatsParams {
        limit: 10,
        ..Default::default()
    };
    let chats = gowa.chat().list(&params).await?;
    for chat in &chats.results.data {
        println!("{}  {}  last message {}", chat.jid, chat.name, chat.last_message_time);
    }

    Ok(())
}

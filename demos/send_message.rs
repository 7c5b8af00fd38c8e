//! Send a text message and a local image
//!
//! Run with:
//! GOWA_BASE_URL=http://localhost:3000 GOWA_USER=admin GOWA_PASS=admin \
//!     cargo run --example send_message -- 6289685028129 ./photo.jpg

use gowa_client::api::{ImageOptions, MediaSource, SendMessageOptions};
use gowa_client::{Gowa, GowaError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let phone = args.next().unwrap_or_else(|| "6289685028129".to_string());
    let image = args.next();

    let gowa = Gowa::from_env()?;

    match gowa
        .send()
        .message(&phone, "Hello from gowa-client", &SendMessageOptions::default())
        .await
    {
        Ok(sent) => println!("Message {} {}", sent.results.message_id, sent.results.status),
        Err(GowaError::HttpStatus { code, body }) => {
            eprintln!("Gateway said {code}: {}", String::from_utf8_lossy(&body))
        }
        Err(error) => eprintln!("send message failed: {error}"),
    }

    if let Some(image) = image {
        let options = ImageOptions {
            caption: "sent with gowa-client".to_string(),
            compress: true,
            ..Default::default()
        };
        match gowa.send().image(&phone, &MediaSource::file(image), &options).await {
            Ok(sent) => println!("Image {} {}", sent.results.message_id, sent.results.status),
            Err(error) => eprintln!("send image failed: {error}"),
        }
    }

    Ok(())
}

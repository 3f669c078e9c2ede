//! Edits a reference image with a text prompt using FLUX.1 Kontext.
//!
//! Usage: `cargo run --example edit_image -- <image.png> [prompt]`
//!
//! `SIMPLISMART_BASE_URL` must point at the Kontext generation endpoint.

use anyhow::Context;
use simplismart_http::{
    Acceleration, KontextParams, RetryPolicy, ServiceConfig, SimplismartClient,
};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let image_path = args.next().context("usage: edit_image <image.png> [prompt]")?;
    let prompt = args
        .next()
        .unwrap_or_else(|| "Change the background to the Golden Gate bridge".to_owned());

    let image = std::fs::read(&image_path).with_context(|| format!("cannot read {image_path}"))?;
    let params = KontextParams::from_image_bytes(prompt, &image)
        .with_size(1024, 1024)
        .with_acceleration(Acceleration::Low);

    let config = ServiceConfig::from_dotenv()?;
    let client = SimplismartClient::new()?;
    let result = client.edit_image(&config, &params, &RetryPolicy::default())?;

    if let Some(url) = result.first_url() {
        println!("image: {url}");
    }
    println!("request_id: {}", result.request_id.as_deref().unwrap_or("N/A"));
    println!(
        "total_time: {:.2}s",
        result.total_request_time.unwrap_or_default()
    );
    println!(
        "inference_time: {:.2}s",
        result.model_inference_time.unwrap_or_default()
    );

    Ok(())
}

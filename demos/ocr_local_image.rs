use simplismart_http::{OcrRequest, RetryPolicy, ServiceConfig, SimplismartClient};

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "samples/receipt.jpg".to_owned());

    let config = ServiceConfig::from_dotenv()?;
    let client = SimplismartClient::new()?;

    let request = OcrRequest::for_local_image(&path)?;
    let text = client.ocr(&config, &request, &RetryPolicy::default())?;

    println!("Extracted Text:");
    println!("{text}");

    Ok(())
}

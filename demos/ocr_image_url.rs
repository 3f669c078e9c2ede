use simplismart_http::{OcrRequest, RetryPolicy, ServiceConfig, SimplismartClient};

fn main() -> anyhow::Result<()> {
    let url = std::env::args().nth(1).unwrap_or_else(|| {
        "https://simplismart-public-assets.s3.ap-south-1.amazonaws.com/logos/ocr.png".to_owned()
    });

    let config = ServiceConfig::from_dotenv()?;
    let client = SimplismartClient::new()?;

    let text = client.ocr(&config, &OcrRequest::for_url(url), &RetryPolicy::default())?;
    println!("{text}");

    Ok(())
}

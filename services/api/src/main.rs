use campaign_desk_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("campaign-desk error: {err}");
        std::process::exit(1);
    }
}

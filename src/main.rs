#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = salesboard::run(args).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

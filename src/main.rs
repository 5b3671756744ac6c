#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = r3_playback_lib::run().await {
        log::error!("{}", e);
        eprintln!("r3-playback: {}", e);
        std::process::exit(1);
    }
}

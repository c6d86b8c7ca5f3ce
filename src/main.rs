use log::error;
use single_vote::config::Config;

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::load().expect("Invalid poll configuration in the environment");

    if let Err(why) = single_vote::start_server(config).await {
        error!("Server error: {}", why);
        std::process::exit(1);
    }
}

#[rocket::main]
async fn main() {
    if let Err(e) = orc_server::rocket().launch().await {
        log::error!("server exited with error: {e}");
        std::process::exit(1);
    }
}
